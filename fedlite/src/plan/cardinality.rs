// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Cardinality estimates with an explicit reliability level

use std::fmt;

use serde::{Deserialize, Serialize};

/// How much an estimate can be trusted, from least to most reliable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Reliability {
    /// No estimate available
    Unsupported,
    /// At least one result, size unknown
    NonEmpty,
    /// The true size is at least `value`
    LowerBound,
    /// A heuristic guess
    Guess,
    /// The true size is at most `value`
    UpperBound,
    Exact,
}

/// An estimate of a result-set size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cardinality {
    reliability: Reliability,
    value: u64,
}

impl Cardinality {
    pub const UNSUPPORTED: Cardinality = Cardinality {
        reliability: Reliability::Unsupported,
        value: 0,
    };

    pub const EMPTY: Cardinality = Cardinality {
        reliability: Reliability::Exact,
        value: 0,
    };

    pub const NON_EMPTY: Cardinality = Cardinality {
        reliability: Reliability::NonEmpty,
        value: 1,
    };

    pub fn new(reliability: Reliability, value: u64) -> Self {
        match reliability {
            Reliability::Unsupported => Self::UNSUPPORTED,
            Reliability::NonEmpty => Self::NON_EMPTY,
            _ => Self { reliability, value },
        }
    }

    pub fn exact(value: u64) -> Self {
        Self::new(Reliability::Exact, value)
    }

    pub fn guess(value: u64) -> Self {
        Self::new(Reliability::Guess, value)
    }

    pub fn upper_bound(value: u64) -> Self {
        Self::new(Reliability::UpperBound, value)
    }

    pub fn lower_bound(value: u64) -> Self {
        Self::new(Reliability::LowerBound, value)
    }

    pub fn reliability(&self) -> Reliability {
        self.reliability
    }

    /// The estimated size, `None` when unsupported
    pub fn value(&self) -> Option<u64> {
        self.is_supported().then_some(self.value)
    }

    pub fn value_or(&self, fallback: u64) -> u64 {
        self.value().unwrap_or(fallback)
    }

    pub fn is_supported(&self) -> bool {
        self.reliability != Reliability::Unsupported
    }

    /// Provably no results
    pub fn is_empty(&self) -> bool {
        self.value == 0
            && matches!(self.reliability, Reliability::Exact | Reliability::UpperBound)
    }
}

impl Default for Cardinality {
    fn default() -> Self {
        Self::UNSUPPORTED
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reliability {
            Reliability::Unsupported => write!(f, "UNSUPPORTED"),
            Reliability::NonEmpty => write!(f, "NON_EMPTY"),
            Reliability::LowerBound => write!(f, ">={}", self.value),
            Reliability::Guess => write!(f, "~{}", self.value),
            Reliability::UpperBound => write!(f, "<={}", self.value),
            Reliability::Exact => write!(f, "{}", self.value),
        }
    }
}
