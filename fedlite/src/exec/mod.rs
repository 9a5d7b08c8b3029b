// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Plan execution
//!
//! Turns a plan tree into a pull-based pipeline of `Results` streams,
//! one executor strategy per node kind.

pub mod bind_join;
pub mod cartesian;
pub mod error;
pub mod hash_join;
pub mod plan_executor;
pub mod results;

// Re-export the main types for convenience
pub use bind_join::{execute_bound, BindJoinResults};
pub use cartesian::CartesianResults;
pub use error::ExecutionError;
pub use hash_join::HashJoinResults;
pub use plan_executor::{JoinChoice, JoinSide, PlanExecutor};
pub use results::{Results, ResultsExecutor, ResultsExt};
