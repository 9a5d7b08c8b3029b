// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Greedy, cost-guided join planner
//!
//! Each step joins the pair of adjacent partial plans with the cheapest
//! estimated result. Partial plans are kept as sets of fragment indices;
//! two partials are adjacent when any of their fragments share a join
//! graph edge. When no adjacent pair is left, the two cheapest partials
//! are combined under a Cartesian node (if allowed).
//!
//! Ties are broken by fragment index: partials are ordered by their lowest
//! fragment index and the first minimal pair in that order wins, so the
//! same input always yields the same plan.

use std::cmp::Ordering;
use std::sync::Arc;

use super::cardinality::Cardinality;
use super::comparator::{CardinalityComparator, DefaultCardinalityComparator};
use super::error::PlanningError;
use super::estimator::{CardinalityEstimator, DefaultCardinalityEstimator};
use super::node::PlanNode;
use crate::config::PlannerConfig;
use crate::graph::JoinGraph;
use crate::model::{CQuery, VarSet};

/// A subtree built so far, with the fragments it covers
#[derive(Debug, Clone)]
struct Partial {
    /// Fragment indices, ascending
    members: Vec<usize>,
    node: Arc<PlanNode>,
    estimate: Cardinality,
}

impl Partial {
    fn first(&self) -> usize {
        self.members[0]
    }

    fn merged_members(&self, other: &Partial) -> Vec<usize> {
        let mut members: Vec<usize> = self.members.iter().chain(&other.members).copied().collect();
        members.sort_unstable();
        members
    }
}

/// Turns a fragment collection into a single plan tree
#[derive(Debug, Clone)]
pub struct GreedyJoinPlanner {
    config: PlannerConfig,
    estimator: Arc<dyn CardinalityEstimator>,
    comparator: Arc<dyn CardinalityComparator>,
}

impl GreedyJoinPlanner {
    pub fn new(config: PlannerConfig) -> Self {
        Self {
            config,
            estimator: Arc::new(DefaultCardinalityEstimator::new()),
            comparator: Arc::new(DefaultCardinalityComparator),
        }
    }

    pub fn with_estimator(mut self, estimator: Arc<dyn CardinalityEstimator>) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn with_comparator(mut self, comparator: Arc<dyn CardinalityComparator>) -> Self {
        self.comparator = comparator;
        self
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Plan `fragments` after checking that they cover every triple of `query`
    pub fn plan_query(
        &self,
        query: &CQuery,
        fragments: Vec<Arc<PlanNode>>,
    ) -> Result<Arc<PlanNode>, PlanningError> {
        let uncovered: Vec<String> = query
            .triples()
            .iter()
            .filter(|triple| !fragments.iter().any(|f| f.triples().contains(triple)))
            .map(|triple| triple.to_string())
            .collect();
        if !uncovered.is_empty() {
            return Err(PlanningError::UncoveredTriples(uncovered));
        }
        self.plan(fragments)
    }

    /// Build one root spanning all `fragments`
    pub fn plan(&self, fragments: Vec<Arc<PlanNode>>) -> Result<Arc<PlanNode>, PlanningError> {
        let graph = JoinGraph::new(fragments)?;
        if graph.len() == 1 {
            return Ok(Arc::clone(graph.node(0)));
        }

        let components = graph.components().len();
        log::debug!(
            "Planning {} fragments in {} join-connected components",
            graph.len(),
            components
        );
        if components > 1 && !self.config.allow_join_disconnected {
            return Err(PlanningError::DisconnectedJoin { components });
        }

        let all_vars: VarSet = graph
            .nodes()
            .iter()
            .flat_map(|node| node.vars().iter().cloned())
            .collect();
        if graph.nodes().iter().any(|node| node.is_empty()) {
            log::debug!("Empty fragment in input, planning an Empty root");
            return Ok(Arc::new(PlanNode::empty(all_vars)));
        }

        let mut partials: Vec<Partial> = graph
            .nodes()
            .iter()
            .enumerate()
            .map(|(i, node)| Partial {
                members: vec![i],
                node: Arc::clone(node),
                estimate: self.estimator.estimate(node),
            })
            .collect();

        if self.config.short_circuit_empty {
            if let Some(empty) = partials.iter().find(|p| p.estimate.is_empty()) {
                log::debug!(
                    "Fragment {} is estimated empty, planning an Empty root",
                    empty.node.label()
                );
                return Ok(Arc::new(PlanNode::empty(all_vars)));
            }
        }

        let mut step = 0;
        while partials.len() > 1 {
            step += 1;
            let merged = match self.cheapest_join(&graph, &partials) {
                Some((i, j, estimate)) => self.join(&partials[i], &partials[j], estimate)?,
                None => {
                    let (i, j) = self.cheapest_pair(&partials);
                    self.cartesian(&partials[i], &partials[j])?
                }
            };
            log::debug!(
                "Step {}: {} over fragments {:?}, estimate {}",
                step,
                merged.node.kind(),
                merged.members,
                merged.estimate
            );
            partials.retain(|p| !merged.members.contains(&p.first()));
            let at = partials
                .iter()
                .position(|p| p.first() > merged.first())
                .unwrap_or(partials.len());
            partials.insert(at, merged);
        }

        let root = partials.remove(0).node;
        log::debug!("Plan:\n{}", root);
        Ok(root)
    }

    fn adjacent(graph: &JoinGraph, a: &Partial, b: &Partial) -> bool {
        a.members
            .iter()
            .any(|&u| b.members.iter().any(|&v| graph.has_edge(u, v)))
    }

    /// Adjacent pair `(i, j)`, `i < j`, with the cheapest join estimate
    fn cheapest_join(
        &self,
        graph: &JoinGraph,
        partials: &[Partial],
    ) -> Option<(usize, usize, Cardinality)> {
        let mut best: Option<(usize, usize, Cardinality)> = None;
        for i in 0..partials.len() {
            for j in (i + 1)..partials.len() {
                if !Self::adjacent(graph, &partials[i], &partials[j]) {
                    continue;
                }
                let estimate = self
                    .estimator
                    .estimate_join(partials[i].estimate, partials[j].estimate);
                let better = match &best {
                    None => true,
                    Some((_, _, current)) => {
                        self.comparator.compare(&estimate, current) == Ordering::Less
                    }
                };
                if better {
                    best = Some((i, j, estimate));
                }
            }
        }
        best
    }

    /// The two cheapest partials, cheaper first
    fn cheapest_pair(&self, partials: &[Partial]) -> (usize, usize) {
        let mut order: Vec<usize> = (0..partials.len()).collect();
        order.sort_by(|&a, &b| {
            self.comparator
                .compare(&partials[a].estimate, &partials[b].estimate)
                .then(a.cmp(&b))
        });
        (order[0], order[1])
    }

    /// Join two partials, cheaper side on the left
    fn join(&self, a: &Partial, b: &Partial, estimate: Cardinality) -> Result<Partial, PlanningError> {
        let (left, right) = match self.comparator.compare(&b.estimate, &a.estimate) {
            Ordering::Less => (b, a),
            _ => (a, b),
        };
        let node = PlanNode::join(Arc::clone(&left.node), Arc::clone(&right.node))?;
        Ok(Partial {
            members: a.merged_members(b),
            node: Arc::new(node),
            estimate,
        })
    }

    /// Cartesian product of two partials, flattening planner-built products
    fn cartesian(&self, a: &Partial, b: &Partial) -> Result<Partial, PlanningError> {
        let mut children: Vec<Arc<PlanNode>> = Vec::new();
        for partial in [a, b] {
            match partial.node.as_ref() {
                PlanNode::Cartesian(product) if partial.members.len() > 1 => {
                    children.extend(product.children().iter().cloned())
                }
                _ => children.push(Arc::clone(&partial.node)),
            }
        }
        let mut estimated: Vec<(Cardinality, Arc<PlanNode>)> = children
            .into_iter()
            .map(|child| (self.estimator.estimate(&child), child))
            .collect();
        // stable sort keeps earlier fragments outer-most on ties
        estimated.sort_by(|x, y| self.comparator.compare(&x.0, &y.0));
        let estimates: Vec<Cardinality> = estimated.iter().map(|(e, _)| *e).collect();
        let children = estimated.into_iter().map(|(_, child)| child).collect();
        let node = PlanNode::cartesian(children)?;
        Ok(Partial {
            members: a.merged_members(b),
            node: Arc::new(node),
            estimate: self.estimator.estimate_product(&estimates),
        })
    }
}

impl Default for GreedyJoinPlanner {
    fn default() -> Self {
        Self::new(PlannerConfig::default())
    }
}
