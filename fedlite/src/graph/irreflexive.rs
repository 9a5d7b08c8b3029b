// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Undirected, irreflexive, lazily weighted graph over a fixed node arena
//!
//! Weights live in a triangular array with one slot per unordered pair, so
//! `(u, v)` and `(v, u)` share a slot and a pair is weighed at most once,
//! whether or not it turned out to be an edge. The weigher always receives
//! the lower-index node first, which makes weights symmetric by
//! construction.

use std::cell::Cell;

use once_cell::unsync::OnceCell;
use petgraph::unionfind::UnionFind;

/// Graph over `nodes` where `weigher(a, b)` returning `Some` means an edge
pub struct UndirectedIrreflexiveGraph<N, W, F>
where
    F: Fn(&N, &N) -> Option<W>,
{
    nodes: Vec<N>,
    weights: Vec<OnceCell<Option<W>>>,
    weigher: F,
    evaluations: Cell<usize>,
}

impl<N, W, F> UndirectedIrreflexiveGraph<N, W, F>
where
    F: Fn(&N, &N) -> Option<W>,
{
    pub fn new(nodes: Vec<N>, weigher: F) -> Self {
        let n = nodes.len();
        let slots = n * n.saturating_sub(1) / 2;
        let mut weights = Vec::with_capacity(slots);
        weights.resize_with(slots, OnceCell::new);
        Self {
            nodes,
            weights,
            weigher,
            evaluations: Cell::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[N] {
        &self.nodes
    }

    /// # Panics
    ///
    /// Panics if `index` is outside the node set.
    pub fn node(&self, index: usize) -> &N {
        assert!(
            index < self.nodes.len(),
            "node index {} outside graph of {} nodes",
            index,
            self.nodes.len()
        );
        &self.nodes[index]
    }

    /// Number of times the weigher has run
    pub fn evaluations(&self) -> usize {
        self.evaluations.get()
    }

    fn slot(&self, u: usize, v: usize) -> (usize, usize, usize) {
        assert!(u != v, "irreflexive graph: no weight for self pair ({}, {})", u, v);
        let n = self.nodes.len();
        assert!(
            u < n && v < n,
            "pair ({}, {}) outside graph of {} nodes",
            u,
            v,
            n
        );
        let (lo, hi) = if u < v { (u, v) } else { (v, u) };
        (hi * (hi - 1) / 2 + lo, lo, hi)
    }

    /// The weight of edge `{u, v}`, computing and caching it on first use
    ///
    /// # Panics
    ///
    /// Panics if `u == v` or either index is outside the node set.
    pub fn weight(&self, u: usize, v: usize) -> Option<&W> {
        let (slot, lo, hi) = self.slot(u, v);
        self.weights[slot]
            .get_or_init(|| {
                self.evaluations.set(self.evaluations.get() + 1);
                (self.weigher)(&self.nodes[lo], &self.nodes[hi])
            })
            .as_ref()
    }

    pub fn has_edge(&self, u: usize, v: usize) -> bool {
        self.weight(u, v).is_some()
    }

    /// Indices adjacent to `u`, ascending
    pub fn neighbors(&self, u: usize) -> Vec<usize> {
        (0..self.nodes.len())
            .filter(|&v| v != u && self.has_edge(u, v))
            .collect()
    }

    /// Every edge as `(lo, hi, weight)`, weighing all pairs
    pub fn edges(&self) -> Vec<(usize, usize, &W)> {
        let mut edges = Vec::new();
        for hi in 1..self.nodes.len() {
            for lo in 0..hi {
                if let Some(w) = self.weight(lo, hi) {
                    edges.push((lo, hi, w));
                }
            }
        }
        edges
    }

    /// Connected components, each sorted, ordered by smallest member
    pub fn components(&self) -> Vec<Vec<usize>> {
        let n = self.nodes.len();
        let mut uf = UnionFind::<usize>::new(n);
        for (lo, hi, _) in self.edges() {
            uf.union(lo, hi);
        }
        let labels = uf.into_labeling();
        let mut components: Vec<Vec<usize>> = Vec::new();
        let mut by_label: Vec<Option<usize>> = vec![None; n];
        for (node, &label) in labels.iter().enumerate() {
            match by_label[label] {
                Some(c) => components[c].push(node),
                None => {
                    by_label[label] = Some(components.len());
                    components.push(vec![node]);
                }
            }
        }
        components
    }

    pub fn is_connected(&self) -> bool {
        self.components().len() <= 1
    }
}
