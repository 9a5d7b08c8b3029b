// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Cardinality estimation for plan nodes

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;

use super::cardinality::{Cardinality, Reliability};
use super::node::{PlanNode, QueryNode};
use crate::model::CQuery;

/// Reliability of a value derived from two estimates
fn combine(left: Reliability, right: Reliability) -> Reliability {
    use Reliability::*;
    match (left, right) {
        (l, r) if l == r => l,
        (Exact, other) | (other, Exact) => other,
        (NonEmpty | LowerBound, NonEmpty | LowerBound) => LowerBound,
        _ => Guess,
    }
}

/// Sums estimates of union branches
pub trait CardinalityAdder: Send + Sync + fmt::Debug {
    fn add(&self, left: Cardinality, right: Cardinality) -> Cardinality;

    /// Sum of all `values`; `EMPTY` for none
    fn sum(&self, values: &[Cardinality]) -> Cardinality {
        values
            .iter()
            .copied()
            .reduce(|acc, value| self.add(acc, value))
            .unwrap_or(Cardinality::EMPTY)
    }
}

/// Unsupported absorbs; otherwise values add and reliability weakens
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCardinalityAdder;

impl CardinalityAdder for DefaultCardinalityAdder {
    fn add(&self, left: Cardinality, right: Cardinality) -> Cardinality {
        let (Some(l), Some(r)) = (left.value(), right.value()) else {
            return Cardinality::UNSUPPORTED;
        };
        let reliability = match combine(left.reliability(), right.reliability()) {
            Reliability::NonEmpty => Reliability::LowerBound,
            other => other,
        };
        Cardinality::new(reliability, l.saturating_add(r))
    }
}

/// Estimates joins and cartesian products from their children
pub trait JoinCardinalityEstimator: Send + Sync + fmt::Debug {
    fn estimate_join(&self, left: Cardinality, right: Cardinality) -> Cardinality;

    fn estimate_product(&self, children: &[Cardinality]) -> Cardinality;
}

/// Joins guess `min(left, right)`, products multiply
///
/// A provably empty child makes the whole result empty, even when the
/// other side is unsupported.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultJoinCardinalityEstimator;

impl JoinCardinalityEstimator for DefaultJoinCardinalityEstimator {
    fn estimate_join(&self, left: Cardinality, right: Cardinality) -> Cardinality {
        if left.is_empty() || right.is_empty() {
            return Cardinality::EMPTY;
        }
        match (left.value(), right.value()) {
            (Some(l), Some(r)) => Cardinality::guess(l.min(r)),
            _ => Cardinality::UNSUPPORTED,
        }
    }

    fn estimate_product(&self, children: &[Cardinality]) -> Cardinality {
        if children.iter().any(Cardinality::is_empty) {
            return Cardinality::EMPTY;
        }
        let mut value: u64 = 1;
        let mut reliability = Reliability::Exact;
        for child in children {
            let Some(v) = child.value() else {
                return Cardinality::UNSUPPORTED;
            };
            value = value.saturating_mul(v);
            reliability = combine(reliability, child.reliability());
        }
        if reliability == Reliability::NonEmpty {
            reliability = Reliability::LowerBound;
        }
        Cardinality::new(reliability, value)
    }
}

/// Estimates the result size of a plan node
pub trait CardinalityEstimator: Send + Sync + fmt::Debug {
    fn estimate(&self, node: &PlanNode) -> Cardinality;

    fn estimate_join(&self, left: Cardinality, right: Cardinality) -> Cardinality {
        DefaultJoinCardinalityEstimator.estimate_join(left, right)
    }

    fn estimate_product(&self, children: &[Cardinality]) -> Cardinality {
        DefaultJoinCardinalityEstimator.estimate_product(children)
    }
}

/// Default number of source estimates kept by [`DefaultCardinalityEstimator`]
pub const DEFAULT_ESTIMATE_CACHE_CAPACITY: usize = 1024;

/// Asks sources for fragment estimates and combines them up the tree
///
/// Source answers are memoized per (source, query), since planning asks
/// for the same fragments many times. The memo is a bounded LRU; entries
/// for a source whose data changed are dropped with
/// [`invalidate_source`](Self::invalidate_source).
#[derive(Debug)]
pub struct DefaultCardinalityEstimator {
    adder: Arc<dyn CardinalityAdder>,
    join: Arc<dyn JoinCardinalityEstimator>,
    cache: Mutex<LruCache<(String, CQuery), Cardinality>>,
}

impl DefaultCardinalityEstimator {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_ESTIMATE_CACHE_CAPACITY)
    }

    /// Keep at most `capacity` source estimates (at least one)
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_parts(
            Arc::new(DefaultCardinalityAdder),
            Arc::new(DefaultJoinCardinalityEstimator),
            capacity,
        )
    }

    pub fn with_parts(
        adder: Arc<dyn CardinalityAdder>,
        join: Arc<dyn JoinCardinalityEstimator>,
        capacity: usize,
    ) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            adder,
            join,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Number of memoized source estimates
    pub fn cached(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn capacity(&self) -> usize {
        self.cache.lock().cap().get()
    }

    /// Forget every estimate obtained from `source`
    pub fn invalidate_source(&self, source: &str) -> usize {
        let mut cache = self.cache.lock();
        let stale: Vec<(String, CQuery)> = cache
            .iter()
            .filter(|((name, _), _)| name == source)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &stale {
            cache.pop(key);
        }
        if !stale.is_empty() {
            log::debug!("Dropped {} cached estimates of source {}", stale.len(), source);
        }
        stale.len()
    }

    pub fn clear(&self) {
        self.cache.lock().clear();
    }

    fn estimate_query(&self, node: &QueryNode) -> Cardinality {
        let key = (node.source().name().to_string(), node.query().clone());
        if let Some(cached) = self.cache.lock().get(&key) {
            return *cached;
        }
        let estimate = node.source().estimate(node.query());
        self.cache.lock().put(key, estimate);
        estimate
    }
}

impl Default for DefaultCardinalityEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl CardinalityEstimator for DefaultCardinalityEstimator {
    fn estimate(&self, node: &PlanNode) -> Cardinality {
        match node {
            PlanNode::Query(query) => self.estimate_query(query),
            PlanNode::MultiQuery(multi) => {
                let values: Vec<Cardinality> = multi
                    .alternatives()
                    .iter()
                    .map(|alt| self.estimate_query(alt))
                    .collect();
                self.adder.sum(&values)
            }
            PlanNode::Join(join) => self
                .join
                .estimate_join(self.estimate(join.left()), self.estimate(join.right())),
            PlanNode::Cartesian(product) => {
                let values: Vec<Cardinality> =
                    product.children().iter().map(|c| self.estimate(c)).collect();
                self.join.estimate_product(&values)
            }
            PlanNode::Empty(_) => Cardinality::EMPTY,
        }
    }

    fn estimate_join(&self, left: Cardinality, right: Cardinality) -> Cardinality {
        self.join.estimate_join(left, right)
    }

    fn estimate_product(&self, children: &[Cardinality]) -> Cardinality {
        self.join.estimate_product(children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Term, TriplePattern};
    use crate::source::{MemorySource, Source};

    #[test]
    fn test_adder() {
        let adder = DefaultCardinalityAdder;
        assert_eq!(adder.add(Cardinality::exact(2), Cardinality::exact(3)), Cardinality::exact(5));
        assert_eq!(adder.add(Cardinality::exact(2), Cardinality::guess(3)), Cardinality::guess(5));
        assert_eq!(
            adder.add(Cardinality::upper_bound(2), Cardinality::lower_bound(3)),
            Cardinality::guess(5)
        );
        assert_eq!(
            adder.add(Cardinality::NON_EMPTY, Cardinality::exact(4)),
            Cardinality::lower_bound(5)
        );
        assert_eq!(
            adder.add(Cardinality::UNSUPPORTED, Cardinality::exact(4)),
            Cardinality::UNSUPPORTED
        );
        assert_eq!(adder.sum(&[]), Cardinality::EMPTY);
    }

    #[test]
    fn test_join_estimates() {
        let join = DefaultJoinCardinalityEstimator;
        assert_eq!(join.estimate_join(Cardinality::exact(2), Cardinality::exact(9)), Cardinality::guess(2));
        assert_eq!(join.estimate_join(Cardinality::EMPTY, Cardinality::UNSUPPORTED), Cardinality::EMPTY);
        assert_eq!(
            join.estimate_join(Cardinality::guess(3), Cardinality::UNSUPPORTED),
            Cardinality::UNSUPPORTED
        );
        assert_eq!(
            join.estimate_product(&[Cardinality::exact(2), Cardinality::exact(3)]),
            Cardinality::exact(6)
        );
        assert_eq!(
            join.estimate_product(&[Cardinality::exact(u64::MAX), Cardinality::guess(3)]),
            Cardinality::guess(u64::MAX)
        );
    }

    #[test]
    fn test_estimator_walks_tree_and_caches() {
        let source: Arc<dyn Source> = Arc::new(
            MemorySource::new("s")
                .with_triple(Term::iri("a"), Term::iri("name"), Term::literal("A"))
                .with_triple(Term::iri("b"), Term::iri("name"), Term::literal("B"))
                .with_triple(Term::iri("a"), Term::iri("age"), Term::integer(3)),
        );
        let name = Arc::new(
            PlanNode::query(CQuery::single(TriplePattern::new("?x", "name", "?n")), Arc::clone(&source)).unwrap(),
        );
        let age = Arc::new(
            PlanNode::query(CQuery::single(TriplePattern::new("?x", "age", "?a")), source).unwrap(),
        );
        let estimator = DefaultCardinalityEstimator::new();
        assert_eq!(estimator.estimate(&name), Cardinality::exact(2));

        let join = PlanNode::join(name, age).unwrap();
        assert_eq!(estimator.estimate(&join), Cardinality::guess(1));
        assert_eq!(estimator.cached(), 2);
        assert_eq!(estimator.estimate(&PlanNode::empty(Default::default())), Cardinality::EMPTY);
    }

    #[test]
    fn test_estimate_cache_is_bounded() {
        let mut memory = MemorySource::new("s");
        for i in 0..50 {
            memory.add(Term::iri(format!("s{}", i)), Term::iri(format!("p{}", i)), Term::integer(i));
        }
        let source: Arc<dyn Source> = Arc::new(memory);
        let estimator = DefaultCardinalityEstimator::with_capacity(8);
        for i in 0..50 {
            let fragment = PlanNode::query(
                CQuery::single(TriplePattern::new("?x", format!("p{}", i).as_str(), "?o")),
                Arc::clone(&source),
            )
            .unwrap();
            assert_eq!(estimator.estimate(&fragment), Cardinality::exact(1));
            assert!(estimator.cached() <= 8);
        }
        assert_eq!(estimator.cached(), 8);
        assert_eq!(estimator.capacity(), 8);
        assert_eq!(DefaultCardinalityEstimator::with_capacity(0).capacity(), 1);
    }

    #[test]
    fn test_invalidate_source_drops_stale_estimates() {
        let names = |n: usize| {
            let mut memory = MemorySource::new("s");
            for i in 0..n {
                memory.add(Term::iri(format!("a{}", i)), Term::iri("name"), Term::literal("A"));
            }
            Arc::new(memory) as Arc<dyn Source>
        };
        let other: Arc<dyn Source> = Arc::new(MemorySource::new("t"));
        let query = CQuery::single(TriplePattern::new("?x", "name", "?n"));
        let estimator = DefaultCardinalityEstimator::new();

        let before = PlanNode::query(query.clone(), names(1)).unwrap();
        assert_eq!(estimator.estimate(&before), Cardinality::exact(1));
        estimator.estimate(&PlanNode::query(query.clone(), other).unwrap());

        // Same source name, grown data: still the memoized answer
        let after = PlanNode::query(query, names(3)).unwrap();
        assert_eq!(estimator.estimate(&after), Cardinality::exact(1));

        assert_eq!(estimator.invalidate_source("s"), 1);
        assert_eq!(estimator.cached(), 1);
        assert_eq!(estimator.estimate(&after), Cardinality::exact(3));
    }
}
