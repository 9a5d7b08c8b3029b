// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Planning errors

use thiserror::Error;

/// Planning errors
///
/// Every variant except `DisconnectedJoin` is a contract violation raised
/// at the call that violated it; planning aborts before any execution.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanningError {
    #[error("Cannot plan an empty fragment collection")]
    EmptyFragments,

    #[error("Duplicate fragment: {0}")]
    DuplicateFragment(String),

    #[error("Invalid fragment: {0}")]
    InvalidFragment(String),

    #[error("MultiQuery alternatives disagree on variables: expected {expected:?}, found {found:?}")]
    MismatchedAlternatives {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Join children share no variable: {0}")]
    NoSharedVariables(String),

    #[error("Cartesian children share variables {0:?}")]
    CartesianOverlap(Vec<String>),

    #[error("Cartesian node needs at least two children, got {0}")]
    CartesianArity(usize),

    #[error("Query is join-disconnected into {components} components and disconnected joins are not allowed")]
    DisconnectedJoin { components: usize },

    #[error("Triples not covered by any fragment: {0:?}")]
    UncoveredTriples(Vec<String>),
}
