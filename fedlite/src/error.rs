// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Top-level error type for the federation engine

use thiserror::Error;

use crate::config::ConfigError;
use crate::exec::ExecutionError;
use crate::plan::PlanningError;

#[derive(Error, Debug)]
pub enum FederationError {
    #[error("Planning error: {0}")]
    Planning(#[from] PlanningError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("A source named '{0}' is already registered")]
    DuplicateSource(String),

    #[error("No sources registered")]
    NoSources,
}
