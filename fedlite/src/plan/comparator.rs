// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Total orders over cardinality estimates

use std::cmp::Ordering;
use std::fmt;

use super::cardinality::Cardinality;

/// Orders estimates from cheapest to most expensive
///
/// Implementations must be a total order (antisymmetric, transitive) and
/// must treat `Cardinality::UNSUPPORTED` as a known value rather than an
/// error, so planning stays deterministic with missing estimates.
pub trait CardinalityComparator: Send + Sync + fmt::Debug {
    fn compare(&self, left: &Cardinality, right: &Cardinality) -> Ordering;

    /// The cheaper estimate; `left` on ties
    fn min(&self, left: Cardinality, right: Cardinality) -> Cardinality {
        if self.compare(&left, &right) == Ordering::Greater {
            right
        } else {
            left
        }
    }

    /// The more expensive estimate; `left` on ties
    fn max(&self, left: Cardinality, right: Cardinality) -> Cardinality {
        if self.compare(&left, &right) == Ordering::Less {
            right
        } else {
            left
        }
    }
}

/// `UNSUPPORTED` is the worst; otherwise smaller values first, and on
/// equal values the more reliable estimate first
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCardinalityComparator;

impl CardinalityComparator for DefaultCardinalityComparator {
    fn compare(&self, left: &Cardinality, right: &Cardinality) -> Ordering {
        match (left.value(), right.value()) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(l), Some(r)) => l
                .cmp(&r)
                .then_with(|| right.reliability().cmp(&left.reliability())),
        }
    }
}

/// Estimates within `threshold` of each other compare equal
///
/// Useful when sources report noisy guesses: a join order should not flip
/// on small differences. Values are bucketed by `value / threshold`, so the
/// order stays transitive.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdCardinalityComparator {
    threshold: u64,
}

impl ThresholdCardinalityComparator {
    pub fn new(threshold: u64) -> Self {
        Self {
            threshold: threshold.max(1),
        }
    }
}

impl CardinalityComparator for ThresholdCardinalityComparator {
    fn compare(&self, left: &Cardinality, right: &Cardinality) -> Ordering {
        match (left.value(), right.value()) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(l), Some(r)) => (l / self.threshold)
                .cmp(&(r / self.threshold))
                .then_with(|| right.reliability().cmp(&left.reliability())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_is_worst() {
        let cmp = DefaultCardinalityComparator;
        assert_eq!(
            cmp.compare(&Cardinality::UNSUPPORTED, &Cardinality::exact(u64::MAX)),
            Ordering::Greater
        );
        assert_eq!(
            cmp.compare(&Cardinality::UNSUPPORTED, &Cardinality::UNSUPPORTED),
            Ordering::Equal
        );
        assert_eq!(
            cmp.min(Cardinality::UNSUPPORTED, Cardinality::guess(10)),
            Cardinality::guess(10)
        );
        assert_eq!(
            cmp.max(Cardinality::UNSUPPORTED, Cardinality::guess(10)),
            Cardinality::UNSUPPORTED
        );
    }

    #[test]
    fn test_reliability_breaks_value_ties() {
        let cmp = DefaultCardinalityComparator;
        assert_eq!(
            cmp.compare(&Cardinality::exact(5), &Cardinality::guess(5)),
            Ordering::Less
        );
        assert_eq!(
            cmp.compare(&Cardinality::guess(4), &Cardinality::exact(5)),
            Ordering::Less
        );
    }

    #[test]
    fn test_total_order_is_consistent() {
        let cmp = DefaultCardinalityComparator;
        let values = [
            Cardinality::UNSUPPORTED,
            Cardinality::EMPTY,
            Cardinality::NON_EMPTY,
            Cardinality::exact(1),
            Cardinality::guess(1),
            Cardinality::upper_bound(7),
            Cardinality::lower_bound(7),
        ];
        for a in &values {
            for b in &values {
                assert_eq!(cmp.compare(a, b), cmp.compare(b, a).reverse());
                for c in &values {
                    if cmp.compare(a, b) != Ordering::Greater && cmp.compare(b, c) != Ordering::Greater {
                        assert_ne!(cmp.compare(a, c), Ordering::Greater);
                    }
                }
            }
        }
    }

    #[test]
    fn test_threshold_buckets() {
        let cmp = ThresholdCardinalityComparator::new(100);
        assert_eq!(
            cmp.compare(&Cardinality::guess(110), &Cardinality::guess(150)),
            Ordering::Equal
        );
        assert_eq!(
            cmp.compare(&Cardinality::guess(99), &Cardinality::guess(150)),
            Ordering::Less
        );
    }
}
