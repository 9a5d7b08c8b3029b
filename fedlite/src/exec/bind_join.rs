// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Bind join
//!
//! For every solution of the driving side, the bindable side is
//! re-executed with the shared variables substituted, and its answers are
//! merged with that solution. Nothing is buffered beyond the current inner
//! stream; the cost is one source execution per driving solution.

use std::sync::Arc;

use crate::exec::results::{close_all, CancellationToken, Results, SequentialResults};
use crate::exec::ExecutionError;
use crate::model::{Solution, VarSet};
use crate::plan::PlanNode;

/// Execute `node` with `binding` substituted into its queries
///
/// Runs synchronously on the calling thread.
pub fn execute_bound(node: &PlanNode, binding: &Solution) -> Result<Box<dyn Results>, ExecutionError> {
    match node {
        PlanNode::Query(query) => query.source().execute(&query.query().bind(binding)),
        PlanNode::MultiQuery(multi) => {
            let mut opened: Vec<Box<dyn Results>> = Vec::with_capacity(multi.alternatives().len());
            for alternative in multi.alternatives() {
                match alternative.source().execute(&alternative.query().bind(binding)) {
                    Ok(results) => opened.push(results),
                    Err(e) => {
                        if let Err(close_err) = close_all(opened.iter_mut()) {
                            log::warn!("Closing bound alternatives after failure: {}", close_err);
                        }
                        return Err(e);
                    }
                }
            }
            Ok(Box::new(SequentialResults::new(opened)))
        }
        other => Err(ExecutionError::InvalidPlan(format!(
            "{} node cannot receive bindings",
            other.kind()
        ))),
    }
}

/// Bind join driven by `driver`, re-executing `bound` per solution
pub struct BindJoinResults {
    driver: Box<dyn Results>,
    bound: Arc<PlanNode>,
    /// Driving solution and the inner stream answering it
    current: Option<(Solution, Box<dyn Results>)>,
    pending: Option<Solution>,
    vars: VarSet,
    executions: u64,
    cancel: CancellationToken,
    closed: bool,
    name: Option<String>,
}

impl BindJoinResults {
    pub fn new(driver: Box<dyn Results>, bound: Arc<PlanNode>) -> Self {
        let vars = driver.vars().union(bound.vars()).cloned().collect();
        Self {
            driver,
            bound,
            current: None,
            pending: None,
            vars,
            executions: 0,
            cancel: CancellationToken::new(),
            closed: false,
            name: None,
        }
    }

    /// Stop issuing bound executions once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Bound executions issued so far
    pub fn executions(&self) -> u64 {
        self.executions
    }

    fn close_current(&mut self) -> Result<(), ExecutionError> {
        match self.current.take() {
            Some((_, mut inner)) => inner.close(),
            None => Ok(()),
        }
    }
}

impl Results for BindJoinResults {
    fn has_next(&mut self) -> Result<bool, ExecutionError> {
        if self.closed {
            return Ok(false);
        }
        while self.pending.is_none() {
            if self.cancel.is_cancelled() {
                return Ok(false);
            }
            if let Some((binding, inner)) = &mut self.current {
                if inner.has_next()? {
                    let answer = inner.next()?;
                    self.pending = binding.merge(&answer);
                    continue;
                }
                self.close_current()?;
            }
            if !self.driver.has_next()? {
                return Ok(false);
            }
            let binding = self.driver.next()?;
            let inner = execute_bound(&self.bound, &binding)?;
            self.executions += 1;
            self.current = Some((binding, inner));
        }
        Ok(true)
    }

    fn next(&mut self) -> Result<Solution, ExecutionError> {
        if !self.has_next()? {
            return Err(ExecutionError::NoSuchElement(self.name.clone()));
        }
        self.pending
            .take()
            .ok_or_else(|| ExecutionError::NoSuchElement(self.name.clone()))
    }

    fn close(&mut self) -> Result<(), ExecutionError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.pending = None;
        let mut streams: Vec<&mut Box<dyn Results>> = vec![&mut self.driver];
        if let Some((_, inner)) = &mut self.current {
            streams.push(inner);
        }
        let result = close_all(streams);
        self.current = None;
        result
    }

    fn vars(&self) -> &VarSet {
        &self.vars
    }

    fn ready_count(&self) -> usize {
        match (&self.pending, &self.current) {
            (Some(_), Some((_, inner))) => 1 + inner.ready_count(),
            (Some(_), None) => 1,
            (None, Some((_, inner))) => inner.ready_count(),
            (None, None) => 0,
        }
    }

    fn is_async(&self) -> bool {
        self.driver.is_async()
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn set_name(&mut self, name: String) {
        self.name = Some(name);
    }
}
