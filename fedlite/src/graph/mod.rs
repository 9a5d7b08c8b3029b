// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Graphs over query fragments
//!
//! - `UndirectedIrreflexiveGraph`: fixed node arena with lazily computed,
//!   memoized edge weights addressed by stable indices
//! - `JoinGraph`: the join graph over plan fragments, weighted by `JoinInfo`

pub mod irreflexive;
pub mod join_graph;

pub use irreflexive::UndirectedIrreflexiveGraph;
pub use join_graph::{JoinGraph, JoinInfo};
