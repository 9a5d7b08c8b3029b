// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Term and solution model consumed by the planner and executors
//!
//! This module provides:
//! - Opaque terms (IRIs, literals, blank nodes) compared only by equality/hash
//! - Solutions: variable to term bindings with compatible merge
//! - Triple patterns and conjunctive queries with variable binding

pub mod cquery;
pub mod solution;
pub mod term;
pub mod triple;

pub use cquery::CQuery;
pub use solution::{Solution, VarSet};
pub use term::Term;
pub use triple::{TermPattern, TriplePattern};
