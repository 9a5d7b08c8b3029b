// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query planning
//!
//! Fragments go in, a single plan tree comes out:
//! - `node`: the plan tree (Query, MultiQuery, Join, Cartesian, Empty)
//! - `cardinality`, `comparator`, `estimator`: the cost model
//! - `planner`: greedy join-graph reduction

pub mod cardinality;
pub mod comparator;
pub mod error;
pub mod estimator;
pub mod node;
pub mod planner;

pub use cardinality::{Cardinality, Reliability};
pub use comparator::{
    CardinalityComparator, DefaultCardinalityComparator, ThresholdCardinalityComparator,
};
pub use error::PlanningError;
pub use estimator::{
    CardinalityAdder, CardinalityEstimator, DefaultCardinalityAdder, DefaultCardinalityEstimator,
    DefaultJoinCardinalityEstimator, JoinCardinalityEstimator, DEFAULT_ESTIMATE_CACHE_CAPACITY,
};
pub use node::{CartesianNode, EmptyNode, JoinNode, MultiQueryNode, PlanNode, QueryNode};
pub use planner::GreedyJoinPlanner;
