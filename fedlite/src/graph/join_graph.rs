// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Join graph over plan fragments

use std::sync::Arc;

use petgraph::dot::Dot;
use petgraph::graph::UnGraph;

use super::irreflexive::UndirectedIrreflexiveGraph;
use crate::model::VarSet;
use crate::plan::{PlanNode, PlanningError};

/// Join metadata for a pair of fragments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinInfo {
    /// Variables bound by both sides
    pub shared_vars: VarSet,
    /// Variables bound by the join result
    pub result_vars: VarSet,
    /// Every variable of the right side also appears on the left
    pub left_subsumes_right: bool,
    pub right_subsumes_left: bool,
    valid: bool,
}

impl JoinInfo {
    pub fn between(left: &PlanNode, right: &PlanNode) -> JoinInfo {
        let shared_vars: VarSet = left.vars().intersection(right.vars()).cloned().collect();
        let result_vars = left.vars().union(right.vars()).cloned().collect();
        let valid = !shared_vars.is_empty() && !left.is_empty() && !right.is_empty();
        JoinInfo {
            left_subsumes_right: right.vars().is_subset(left.vars()),
            right_subsumes_left: left.vars().is_subset(right.vars()),
            shared_vars,
            result_vars,
            valid,
        }
    }

    /// A join is valid when the sides share a variable and neither is empty
    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

type Weigher = fn(&Arc<PlanNode>, &Arc<PlanNode>) -> Option<JoinInfo>;

fn weigh(left: &Arc<PlanNode>, right: &Arc<PlanNode>) -> Option<JoinInfo> {
    let info = JoinInfo::between(left, right);
    info.is_valid().then_some(info)
}

/// Undirected join graph over a frozen fragment arena
///
/// Fragment `i` keeps index `i` for the lifetime of the graph. Edges are
/// weighed on first access and cached.
pub struct JoinGraph {
    graph: UndirectedIrreflexiveGraph<Arc<PlanNode>, JoinInfo, Weigher>,
}

impl JoinGraph {
    pub fn new(fragments: Vec<Arc<PlanNode>>) -> Result<Self, PlanningError> {
        if fragments.is_empty() {
            return Err(PlanningError::EmptyFragments);
        }
        for (i, fragment) in fragments.iter().enumerate() {
            if let Some(dup) = fragments[..i]
                .iter()
                .find(|other| Arc::ptr_eq(other, fragment) || other.as_ref() == fragment.as_ref())
            {
                return Err(PlanningError::DuplicateFragment(dup.label()));
            }
        }
        Ok(Self {
            graph: UndirectedIrreflexiveGraph::new(fragments, weigh as Weigher),
        })
    }

    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    pub fn nodes(&self) -> &[Arc<PlanNode>] {
        self.graph.nodes()
    }

    /// # Panics
    ///
    /// Panics if `index` is outside the fragment set.
    pub fn node(&self, index: usize) -> &Arc<PlanNode> {
        self.graph.node(index)
    }

    /// Join metadata for `(u, v)`, `None` when the pair cannot be joined
    ///
    /// # Panics
    ///
    /// Panics if `u == v` or either index is outside the fragment set.
    pub fn edge(&self, u: usize, v: usize) -> Option<&JoinInfo> {
        self.graph.weight(u, v)
    }

    pub fn has_edge(&self, u: usize, v: usize) -> bool {
        self.graph.has_edge(u, v)
    }

    pub fn neighbors(&self, u: usize) -> Vec<usize> {
        self.graph.neighbors(u)
    }

    /// Join-connected components, each sorted, ordered by lowest index
    pub fn components(&self) -> Vec<Vec<usize>> {
        self.graph.components()
    }

    pub fn is_connected(&self) -> bool {
        self.graph.is_connected()
    }

    /// Number of pairs weighed so far
    pub fn evaluations(&self) -> usize {
        self.graph.evaluations()
    }

    /// Graphviz rendering, edges labelled with their shared variables
    pub fn to_dot(&self) -> String {
        let mut rendered: UnGraph<String, String> = UnGraph::new_undirected();
        let indices: Vec<_> = self
            .nodes()
            .iter()
            .enumerate()
            .map(|(i, node)| rendered.add_node(format!("{}: {}", i, node.label())))
            .collect();
        for (u, v, info) in self.graph.edges() {
            let label: Vec<&str> = info.shared_vars.iter().map(String::as_str).collect();
            rendered.add_edge(indices[u], indices[v], label.join(", "));
        }
        format!("{}", Dot::new(&rendered))
    }
}

impl std::fmt::Debug for JoinGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JoinGraph")
            .field("nodes", &self.len())
            .field("evaluations", &self.evaluations())
            .finish()
    }
}
