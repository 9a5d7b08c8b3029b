// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Planner and executor configuration
//!
//! Strategy selection is explicit: the engine is built from a
//! [`FederationConfig`], which may be loaded from JSON.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::exec::results::{DEFAULT_BUFFER_CAPACITY, DEFAULT_MAX_WORKERS};
use crate::plan::DEFAULT_ESTIMATE_CACHE_CAPACITY;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config value for {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

/// How join nodes are executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinStrategy {
    /// Always hash join
    Hash,
    /// Bind join whenever one side accepts bound sub-queries
    Bind,
    /// Decide per join from cardinality estimates
    #[default]
    Auto,
}

/// Planner options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Combine join-disconnected components with cartesian products
    /// instead of failing
    pub allow_join_disconnected: bool,
    /// Plan an Empty root when some fragment is known to be empty
    pub short_circuit_empty: bool,
    /// Source estimates kept between queries by the engine
    pub estimate_cache_capacity: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            allow_join_disconnected: true,
            short_circuit_empty: true,
            estimate_cache_capacity: DEFAULT_ESTIMATE_CACHE_CAPACITY,
        }
    }
}

impl PlannerConfig {
    pub fn with_allow_join_disconnected(mut self, allow: bool) -> Self {
        self.allow_join_disconnected = allow;
        self
    }

    pub fn with_short_circuit_empty(mut self, enabled: bool) -> Self {
        self.short_circuit_empty = enabled;
        self
    }

    pub fn with_estimate_cache_capacity(mut self, capacity: usize) -> Self {
        self.estimate_cache_capacity = capacity;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.estimate_cache_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "estimate_cache_capacity",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Executor options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    pub join_strategy: JoinStrategy,
    /// `Auto` bind-joins when the smaller side is estimated at most this
    pub bind_join_threshold: u64,
    /// `Auto` avoids hash joins whose build side is estimated above this
    pub hash_join_build_limit: u64,
    /// Run leaf fragments on background workers
    pub async_fragments: bool,
    /// Worker threads of the results executor
    pub max_workers: usize,
    /// Per-stream buffer of background workers
    pub buffer_capacity: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            join_strategy: JoinStrategy::Auto,
            bind_join_threshold: 64,
            hash_join_build_limit: 1_000_000,
            async_fragments: false,
            max_workers: DEFAULT_MAX_WORKERS,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

impl ExecutorConfig {
    pub fn with_join_strategy(mut self, strategy: JoinStrategy) -> Self {
        self.join_strategy = strategy;
        self
    }

    pub fn with_bind_join_threshold(mut self, threshold: u64) -> Self {
        self.bind_join_threshold = threshold;
        self
    }

    pub fn with_hash_join_build_limit(mut self, limit: u64) -> Self {
        self.hash_join_build_limit = limit;
        self
    }

    pub fn with_async_fragments(mut self, enabled: bool) -> Self {
        self.async_fragments = enabled;
        self
    }

    pub fn with_max_workers(mut self, workers: usize) -> Self {
        self.max_workers = workers;
        self
    }

    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_workers == 0 {
            return Err(ConfigError::Invalid {
                field: "max_workers",
                message: "must be at least 1".to_string(),
            });
        }
        if self.buffer_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "buffer_capacity",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FederationConfig {
    pub planner: PlannerConfig,
    pub executor: ExecutorConfig,
}

impl FederationConfig {
    pub fn with_planner(mut self, planner: PlannerConfig) -> Self {
        self.planner = planner;
        self
    }

    pub fn with_executor(mut self, executor: ExecutorConfig) -> Self {
        self.executor = executor;
        self
    }

    /// Parse and validate a JSON document; missing fields take defaults
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: FederationConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        log::debug!("Loading federation config from {}", path.as_ref().display());
        Self::from_json_str(&contents)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.planner.validate()?;
        self.executor.validate()
    }
}
