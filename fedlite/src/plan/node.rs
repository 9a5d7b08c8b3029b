// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Plan tree nodes
//!
//! A closed sum type over the five node kinds. Constructors validate the
//! variable invariants (join children share a variable, cartesian children
//! share none, MultiQuery alternatives agree), so a `PlanNode` that exists
//! is well formed.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use super::error::PlanningError;
use crate::model::{CQuery, TriplePattern, VarSet};
use crate::source::{Capability, Source};

/// A fragment answered by a single source
#[derive(Debug, Clone)]
pub struct QueryNode {
    query: CQuery,
    source: Arc<dyn Source>,
}

impl QueryNode {
    pub fn new(query: CQuery, source: Arc<dyn Source>) -> Result<Self, PlanningError> {
        if query.is_empty() {
            return Err(PlanningError::InvalidFragment(format!(
                "empty query for source {}",
                source.name()
            )));
        }
        Ok(Self { query, source })
    }

    pub fn query(&self) -> &CQuery {
        &self.query
    }

    pub fn source(&self) -> &Arc<dyn Source> {
        &self.source
    }

    pub fn vars(&self) -> &VarSet {
        self.query.vars()
    }
}

impl PartialEq for QueryNode {
    fn eq(&self, other: &Self) -> bool {
        self.query == other.query && self.source.name() == other.source.name()
    }
}

impl Eq for QueryNode {}

/// Alternatives for the same fragment, one per source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiQueryNode {
    alternatives: Vec<QueryNode>,
}

impl MultiQueryNode {
    pub fn new(alternatives: Vec<QueryNode>) -> Result<Self, PlanningError> {
        let first = alternatives.first().ok_or_else(|| {
            PlanningError::InvalidFragment("MultiQuery without alternatives".to_string())
        })?;
        let expected = first.vars();
        if let Some(bad) = alternatives.iter().find(|alt| alt.vars() != expected) {
            return Err(PlanningError::MismatchedAlternatives {
                expected: expected.iter().cloned().collect(),
                found: bad.vars().iter().cloned().collect(),
            });
        }
        Ok(Self { alternatives })
    }

    pub fn alternatives(&self) -> &[QueryNode] {
        &self.alternatives
    }

    pub fn vars(&self) -> &VarSet {
        self.alternatives[0].vars()
    }
}

/// Two children joined on their shared variables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinNode {
    left: Arc<PlanNode>,
    right: Arc<PlanNode>,
    join_vars: VarSet,
    vars: VarSet,
}

impl JoinNode {
    pub fn new(left: Arc<PlanNode>, right: Arc<PlanNode>) -> Result<Self, PlanningError> {
        let join_vars: VarSet = left.vars().intersection(right.vars()).cloned().collect();
        if join_vars.is_empty() {
            return Err(PlanningError::NoSharedVariables(format!(
                "{} and {}",
                left.label(),
                right.label()
            )));
        }
        let vars = left.vars().union(right.vars()).cloned().collect();
        Ok(Self {
            left,
            right,
            join_vars,
            vars,
        })
    }

    pub fn left(&self) -> &Arc<PlanNode> {
        &self.left
    }

    pub fn right(&self) -> &Arc<PlanNode> {
        &self.right
    }

    /// Variables shared by both children
    pub fn join_vars(&self) -> &VarSet {
        &self.join_vars
    }

    pub fn vars(&self) -> &VarSet {
        &self.vars
    }

    /// Same join with the children swapped
    pub fn swapped(&self) -> JoinNode {
        JoinNode {
            left: Arc::clone(&self.right),
            right: Arc::clone(&self.left),
            join_vars: self.join_vars.clone(),
            vars: self.vars.clone(),
        }
    }
}

/// Cross product of two or more variable-disjoint children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartesianNode {
    children: Vec<Arc<PlanNode>>,
    vars: VarSet,
}

impl CartesianNode {
    pub fn new(children: Vec<Arc<PlanNode>>) -> Result<Self, PlanningError> {
        if children.len() < 2 {
            return Err(PlanningError::CartesianArity(children.len()));
        }
        let mut vars = VarSet::new();
        let mut overlap = BTreeSet::new();
        for child in &children {
            for var in child.vars() {
                if !vars.insert(var.clone()) {
                    overlap.insert(var.clone());
                }
            }
        }
        if !overlap.is_empty() {
            return Err(PlanningError::CartesianOverlap(overlap.into_iter().collect()));
        }
        Ok(Self { children, vars })
    }

    pub fn children(&self) -> &[Arc<PlanNode>] {
        &self.children
    }

    pub fn vars(&self) -> &VarSet {
        &self.vars
    }
}

/// Statically known to produce nothing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmptyNode {
    vars: VarSet,
}

impl EmptyNode {
    pub fn new(vars: VarSet) -> Self {
        Self { vars }
    }

    pub fn vars(&self) -> &VarSet {
        &self.vars
    }
}

/// Plan tree node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanNode {
    Query(QueryNode),
    MultiQuery(MultiQueryNode),
    Join(JoinNode),
    Cartesian(CartesianNode),
    Empty(EmptyNode),
}

impl PlanNode {
    pub fn query(query: CQuery, source: Arc<dyn Source>) -> Result<PlanNode, PlanningError> {
        QueryNode::new(query, source).map(PlanNode::Query)
    }

    /// A MultiQuery node, or a plain Query node for a single alternative
    pub fn multi_query(alternatives: Vec<QueryNode>) -> Result<PlanNode, PlanningError> {
        let mut node = MultiQueryNode::new(alternatives)?;
        if node.alternatives.len() == 1 {
            return Ok(PlanNode::Query(node.alternatives.remove(0)));
        }
        Ok(PlanNode::MultiQuery(node))
    }

    pub fn join(left: Arc<PlanNode>, right: Arc<PlanNode>) -> Result<PlanNode, PlanningError> {
        JoinNode::new(left, right).map(PlanNode::Join)
    }

    pub fn cartesian(children: Vec<Arc<PlanNode>>) -> Result<PlanNode, PlanningError> {
        CartesianNode::new(children).map(PlanNode::Cartesian)
    }

    pub fn empty(vars: VarSet) -> PlanNode {
        PlanNode::Empty(EmptyNode::new(vars))
    }

    pub fn vars(&self) -> &VarSet {
        match self {
            PlanNode::Query(node) => node.vars(),
            PlanNode::MultiQuery(node) => node.vars(),
            PlanNode::Join(node) => node.vars(),
            PlanNode::Cartesian(node) => node.vars(),
            PlanNode::Empty(node) => node.vars(),
        }
    }

    pub fn children(&self) -> Vec<&Arc<PlanNode>> {
        match self {
            PlanNode::Join(node) => vec![&node.left, &node.right],
            PlanNode::Cartesian(node) => node.children.iter().collect(),
            PlanNode::Query(_) | PlanNode::MultiQuery(_) | PlanNode::Empty(_) => Vec::new(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PlanNode::Query(_) => "Query",
            PlanNode::MultiQuery(_) => "MultiQuery",
            PlanNode::Join(_) => "Join",
            PlanNode::Cartesian(_) => "Cartesian",
            PlanNode::Empty(_) => "Empty",
        }
    }

    /// Query and MultiQuery nodes are the fragments planning starts from
    pub fn is_fragment(&self) -> bool {
        matches!(self, PlanNode::Query(_) | PlanNode::MultiQuery(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, PlanNode::Empty(_))
    }

    /// Whether a bind join can push bound sub-queries into this node
    pub fn is_bindable(&self) -> bool {
        match self {
            PlanNode::Query(node) => node.source.has_capability(Capability::BindJoin),
            PlanNode::MultiQuery(node) => node
                .alternatives
                .iter()
                .all(|alt| alt.source.has_capability(Capability::BindJoin)),
            _ => false,
        }
    }

    /// Triple patterns answered anywhere in this subtree
    pub fn triples(&self) -> BTreeSet<&TriplePattern> {
        let mut triples = BTreeSet::new();
        self.collect_triples(&mut triples);
        triples
    }

    fn collect_triples<'a>(&'a self, out: &mut BTreeSet<&'a TriplePattern>) {
        match self {
            PlanNode::Query(node) => out.extend(node.query.triples()),
            PlanNode::MultiQuery(node) => {
                for alt in &node.alternatives {
                    out.extend(alt.query.triples());
                }
            }
            PlanNode::Join(node) => {
                node.left.collect_triples(out);
                node.right.collect_triples(out);
            }
            PlanNode::Cartesian(node) => {
                for child in &node.children {
                    child.collect_triples(out);
                }
            }
            PlanNode::Empty(_) => {}
        }
    }

    /// Number of nodes in this subtree
    pub fn size(&self) -> usize {
        1 + self.children().iter().map(|c| c.size()).sum::<usize>()
    }

    /// One-line description used in logs and errors
    pub fn label(&self) -> String {
        match self {
            PlanNode::Query(node) => format!("{}@{}", node.query, node.source.name()),
            PlanNode::MultiQuery(node) => {
                let sources: Vec<&str> = node.alternatives.iter().map(|a| a.source.name()).collect();
                format!("{}@[{}]", node.alternatives[0].query, sources.join(", "))
            }
            PlanNode::Join(node) => format!("Join on {:?}", node.join_vars),
            PlanNode::Cartesian(node) => format!("Cartesian x{}", node.children.len()),
            PlanNode::Empty(node) => format!("Empty {:?}", node.vars),
        }
    }

    fn fmt_tree(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        writeln!(f, "{:indent$}{}", "", self.label(), indent = depth * 2)?;
        for child in self.children() {
            child.fmt_tree(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for PlanNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_tree(f, 0)
    }
}
