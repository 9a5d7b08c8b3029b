// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Source endpoints and fragment matching
//!
//! Endpoint protocols (SPARQL, SQL, REST) live outside this crate; the
//! planner and executors only see the [`Source`] contract. Missing
//! estimates and missing capabilities are graceful-degradation signals.

pub mod matcher;
pub mod memory;

pub use matcher::{EachTripleMatcher, ExclusiveGroupMatcher, FragmentMatcher};
pub use memory::MemorySource;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::exec::results::Results;
use crate::exec::ExecutionError;
use crate::model::{CQuery, TriplePattern};
use crate::plan::Cardinality;

/// Named capabilities a source may advertise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    /// Answers conjunctive queries with several triple patterns
    Conjunctive,
    /// Provides cardinality estimates
    Cardinality,
    /// Accepts bound sub-queries, one per left solution of a bind join
    BindJoin,
}

/// A data source able to answer query fragments
pub trait Source: Send + Sync + fmt::Debug {
    /// Stable, unique name used in logs and fragment identity
    fn name(&self) -> &str;

    /// Execute a (possibly bound) conjunctive query
    fn execute(&self, query: &CQuery) -> Result<Box<dyn Results>, ExecutionError>;

    /// Estimate the result size of `query`
    fn estimate(&self, _query: &CQuery) -> Cardinality {
        Cardinality::UNSUPPORTED
    }

    fn has_capability(&self, _capability: Capability) -> bool {
        false
    }

    /// Whether this source can answer `triple` at all
    fn can_answer(&self, _triple: &TriplePattern) -> bool {
        true
    }
}
