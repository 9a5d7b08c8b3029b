// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Plan executor
//!
//! Dispatches on the plan node kind and builds the matching `Results`
//! stream bottom-up. If opening a child fails, the children already opened
//! are closed before the error is returned. Every operator of one
//! execution shares a `CancellationToken`.

use std::sync::Arc;

use super::bind_join::BindJoinResults;
use super::cartesian::CartesianResults;
use super::hash_join::HashJoinResults;
use super::results::{
    close_all, CancelHandle, CancellableResults, CancellationToken, EmptyResults, Results,
    ResultsExecutor, SequentialResults,
};
use super::ExecutionError;
use crate::config::{ExecutorConfig, JoinStrategy};
use crate::plan::{
    Cardinality, CardinalityComparator, CardinalityEstimator, CartesianNode,
    DefaultCardinalityComparator, DefaultCardinalityEstimator, JoinNode, MultiQueryNode,
    PlanNode, QueryNode,
};

/// Side of a join node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinSide {
    Left,
    Right,
}

impl JoinSide {
    fn of<'a>(&self, join: &'a JoinNode) -> &'a Arc<PlanNode> {
        match self {
            JoinSide::Left => join.left(),
            JoinSide::Right => join.right(),
        }
    }

    fn other(&self) -> JoinSide {
        match self {
            JoinSide::Left => JoinSide::Right,
            JoinSide::Right => JoinSide::Left,
        }
    }
}

/// The algorithm picked for a join node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinChoice {
    /// Hash join indexing `build`
    Hash { build: JoinSide },
    /// Bind join driven by `driver`, binding into the other side
    Bind { driver: JoinSide },
}

/// Executes plan trees
#[derive(Clone)]
pub struct PlanExecutor {
    config: Arc<ExecutorConfig>,
    results_executor: Arc<ResultsExecutor>,
    comparator: Arc<dyn CardinalityComparator>,
    estimator: Arc<dyn CardinalityEstimator>,
}

impl PlanExecutor {
    pub fn new(config: ExecutorConfig, results_executor: Arc<ResultsExecutor>) -> Self {
        Self {
            config: Arc::new(config),
            results_executor,
            comparator: Arc::new(DefaultCardinalityComparator),
            estimator: Arc::new(DefaultCardinalityEstimator::new()),
        }
    }

    /// Executor backed by the process-wide results executor
    pub fn with_global_executor(config: ExecutorConfig) -> Self {
        Self::new(config, ResultsExecutor::global())
    }

    pub fn with_comparator(mut self, comparator: Arc<dyn CardinalityComparator>) -> Self {
        self.comparator = comparator;
        self
    }

    pub fn with_estimator(mut self, estimator: Arc<dyn CardinalityEstimator>) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn results_executor(&self) -> &Arc<ResultsExecutor> {
        &self.results_executor
    }

    /// Open a stream over the solutions of `node`
    pub fn execute(&self, node: &PlanNode) -> Result<Box<dyn Results>, ExecutionError> {
        self.execute_with(node, &CancellationToken::new())
    }

    /// Open a stream over `node` with a handle that stops it from any thread
    ///
    /// After cancellation the stream reports itself exhausted; it must
    /// still be closed by its consumer.
    pub fn execute_cancellable(
        &self,
        node: &PlanNode,
    ) -> Result<(Box<dyn Results>, CancelHandle), ExecutionError> {
        let token = CancellationToken::new();
        let results = self.execute_with(node, &token)?;
        let root: Box<dyn Results> = Box::new(CancellableResults::new(results, token.clone()));
        Ok((root, CancelHandle::new(token)))
    }

    /// Open a stream over `node` whose operators stop once `token` is cancelled
    pub fn execute_with(
        &self,
        node: &PlanNode,
        token: &CancellationToken,
    ) -> Result<Box<dyn Results>, ExecutionError> {
        match node {
            PlanNode::Query(query) => self.execute_query(query, token),
            PlanNode::MultiQuery(multi) => self.execute_multi_query(multi, token),
            PlanNode::Join(join) => self.execute_join(join, token),
            PlanNode::Cartesian(product) => self.execute_cartesian(product, token),
            PlanNode::Empty(empty) => Ok(Box::new(EmptyResults::new(empty.vars().clone()))),
        }
    }

    fn execute_query(
        &self,
        node: &QueryNode,
        token: &CancellationToken,
    ) -> Result<Box<dyn Results>, ExecutionError> {
        let results = node.source().execute(node.query())?;
        if !self.config.async_fragments || results.is_async() {
            return Ok(results);
        }
        let results = self.results_executor.spawn_results(results);
        results.cancel_on(token);
        Ok(Box::new(results))
    }

    /// Open every child in order, closing the opened ones on failure
    fn open_all<'a, I>(
        &self,
        children: I,
        token: &CancellationToken,
    ) -> Result<Vec<Box<dyn Results>>, ExecutionError>
    where
        I: IntoIterator<Item = &'a PlanNode>,
    {
        let mut opened: Vec<Box<dyn Results>> = Vec::new();
        for child in children {
            match self.execute_with(child, token) {
                Ok(results) => opened.push(results),
                Err(e) => {
                    if let Err(close_err) = close_all(opened.iter_mut()) {
                        log::warn!("Failed to close siblings of a failed child: {}", close_err);
                    }
                    return Err(e);
                }
            }
        }
        Ok(opened)
    }

    fn execute_multi_query(
        &self,
        node: &MultiQueryNode,
        token: &CancellationToken,
    ) -> Result<Box<dyn Results>, ExecutionError> {
        let mut opened: Vec<Box<dyn Results>> = Vec::with_capacity(node.alternatives().len());
        for alternative in node.alternatives() {
            match self.execute_query(alternative, token) {
                Ok(results) => opened.push(results),
                Err(e) => {
                    if let Err(close_err) = close_all(opened.iter_mut()) {
                        log::warn!("Failed to close alternatives after failure: {}", close_err);
                    }
                    return Err(e);
                }
            }
        }
        Ok(Box::new(SequentialResults::new(opened)))
    }

    fn execute_cartesian(
        &self,
        node: &CartesianNode,
        token: &CancellationToken,
    ) -> Result<Box<dyn Results>, ExecutionError> {
        let children = self.open_all(node.children().iter().map(|c| c.as_ref()), token)?;
        Ok(Box::new(
            CartesianResults::new(children)?.with_cancellation(token.clone()),
        ))
    }

    fn execute_join(
        &self,
        node: &JoinNode,
        token: &CancellationToken,
    ) -> Result<Box<dyn Results>, ExecutionError> {
        let choice = self.choose_join(node);
        log::debug!("Executing {} as {:?}", node_label(node), choice);
        match choice {
            JoinChoice::Hash { build } => {
                let mut opened = self.open_all(
                    [build.of(node).as_ref(), build.other().of(node).as_ref()],
                    token,
                )?;
                let probe = opened.pop();
                let build = opened.pop();
                match (build, probe) {
                    (Some(build), Some(probe)) => Ok(Box::new(
                        HashJoinResults::new(build, probe, node.join_vars())
                            .with_cancellation(token.clone()),
                    )),
                    _ => Err(ExecutionError::InvalidPlan("hash join lost a side".to_string())),
                }
            }
            JoinChoice::Bind { driver } => {
                let driving = self.execute_with(driver.of(node), token)?;
                let bound = Arc::clone(driver.other().of(node));
                Ok(Box::new(
                    BindJoinResults::new(driving, bound).with_cancellation(token.clone()),
                ))
            }
        }
    }

    /// Pick the algorithm for `node` under the configured strategy
    pub fn choose_join(&self, node: &JoinNode) -> JoinChoice {
        let left = self.estimator.estimate(node.left());
        let right = self.estimator.estimate(node.right());
        let smaller = if self.comparator.compare(&right, &left).is_lt() {
            JoinSide::Right
        } else {
            JoinSide::Left
        };
        let hash = JoinChoice::Hash { build: smaller };
        let bind_into = |bound: JoinSide| {
            bound
                .of(node)
                .is_bindable()
                .then_some(JoinChoice::Bind { driver: bound.other() })
        };
        let estimate_of = |side: JoinSide| match side {
            JoinSide::Left => left,
            JoinSide::Right => right,
        };

        match self.config.join_strategy {
            JoinStrategy::Hash => hash,
            JoinStrategy::Bind => bind_into(JoinSide::Right)
                .or_else(|| bind_into(JoinSide::Left))
                .unwrap_or_else(|| {
                    log::warn!(
                        "Bind join requested but neither side of {} accepts bindings, using hash join",
                        node_label(node)
                    );
                    hash
                }),
            JoinStrategy::Auto => {
                let driver_estimate: Cardinality = estimate_of(smaller);
                let small_driver = driver_estimate
                    .value()
                    .is_some_and(|v| v <= self.config.bind_join_threshold);
                let build_too_large = driver_estimate
                    .value()
                    .map_or(false, |v| v > self.config.hash_join_build_limit);
                if small_driver || build_too_large {
                    if let Some(choice) = bind_into(smaller.other()) {
                        return choice;
                    }
                }
                hash
            }
        }
    }
}

fn node_label(node: &JoinNode) -> String {
    format!(
        "join of {} and {} on {:?}",
        node.left().label(),
        node.right().label(),
        node.join_vars()
    )
}

impl std::fmt::Debug for PlanExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanExecutor")
            .field("config", &self.config)
            .field("results_executor", &self.results_executor)
            .finish()
    }
}
