// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! fedlite - federated conjunctive query planning and execution
//!
//! Given a conjunctive query and a set of independent sources, fedlite
//! decides which source answers which fragment, joins the fragments into a
//! plan tree guided by cardinality estimates, and executes that plan as a
//! pull-based stream of solutions.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use fedlite::{CQuery, FederationConfig, FederationEngine, MemorySource, Term, TriplePattern};
//!
//! # fn main() -> Result<(), fedlite::FederationError> {
//! let names = MemorySource::new("names")
//!     .with_triple(Term::integer(1), Term::iri("name"), Term::literal("a"));
//! let ages = MemorySource::new("ages")
//!     .with_triple(Term::integer(1), Term::iri("age"), Term::integer(22));
//!
//! let engine = FederationEngine::new(FederationConfig::default())?
//!     .with_source(Arc::new(names))?
//!     .with_source(Arc::new(ages))?;
//!
//! let query = CQuery::new(vec![
//!     TriplePattern::new("?x", "name", "?n"),
//!     TriplePattern::new("?x", "age", "?a"),
//! ]);
//! println!("{}", engine.explain(&query)?);
//! for solution in engine.query(&query)? {
//!     println!("{}", solution);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! ```text
//! CQuery --FragmentMatcher--> fragments --JoinGraph--> GreedyJoinPlanner
//!                                                          |
//!                                                      PlanNode tree
//!                                                          |
//!                                PlanExecutor --> Results (hash join, bind join,
//!                                                 cartesian, union, empty)
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod exec;
pub mod graph;
pub mod model;
pub mod plan;
pub mod source;

pub use config::{ConfigError, ExecutorConfig, FederationConfig, JoinStrategy, PlannerConfig};
pub use engine::FederationEngine;
pub use error::FederationError;
pub use exec::results::{
    AsyncResults, CancelHandle, CancellationToken, CollectionResults, EmptyResults, Results,
    ResultsExecutor, ResultsExt, SequentialResults,
};
pub use exec::{ExecutionError, PlanExecutor};
pub use graph::{JoinGraph, JoinInfo};
pub use model::{CQuery, Solution, Term, TermPattern, TriplePattern, VarSet};
pub use plan::{
    Cardinality, CardinalityComparator, CardinalityEstimator, GreedyJoinPlanner, PlanNode,
    PlanningError, Reliability,
};
pub use source::{Capability, EachTripleMatcher, ExclusiveGroupMatcher, FragmentMatcher, MemorySource, Source};
