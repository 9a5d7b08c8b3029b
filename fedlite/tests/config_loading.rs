// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Engines built from JSON configuration files

#[path = "testutils/mod.rs"]
mod testutils;

use std::io::Write;
use std::sync::Arc;

use fedlite::{
    CQuery, ConfigError, FederationConfig, FederationEngine, FederationError, JoinStrategy,
    PlanNode, TriplePattern,
};
use tempfile::NamedTempFile;
use testutils::*;

fn write_config(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(json.as_bytes()).expect("write config");
    file
}

#[test]
fn test_engine_from_config_file() {
    init_logging();
    let file = write_config(
        r#"{
            "planner": { "allow_join_disconnected": false },
            "executor": { "join_strategy": "hash", "max_workers": 2, "buffer_capacity": 8, "async_fragments": true }
        }"#,
    );
    let config = FederationConfig::from_file(file.path()).unwrap();
    assert_eq!(config.executor.join_strategy, JoinStrategy::Hash);
    assert_eq!(config.executor.max_workers, 2);

    let engine = FederationEngine::new(config)
        .unwrap()
        .with_source(Arc::new(names_source()))
        .unwrap()
        .with_source(Arc::new(ages_source()))
        .unwrap();
    assert_eq!(engine.executor().results_executor().max_workers(), 2);

    let query = CQuery::new(vec![
        TriplePattern::new("?x", "name", "?n"),
        TriplePattern::new("?x", "age", "?a"),
    ]);
    let plan = engine.plan(&query).unwrap();
    assert!(matches!(plan.as_ref(), PlanNode::Join(_)));
    let solutions = engine.query(&query).unwrap();
    assert_eq!(solutions.len(), 1);

    let disconnected = CQuery::new(vec![
        TriplePattern::new("?x", "name", "?n"),
        TriplePattern::new("?y", "age", "?a"),
    ]);
    assert!(matches!(
        engine.plan(&disconnected),
        Err(FederationError::Planning(_))
    ));
}

#[test]
fn test_invalid_config_file_is_rejected() {
    let file = write_config(r#"{ "executor": { "buffer_capacity": 0 } }"#);
    assert!(matches!(
        FederationConfig::from_file(file.path()),
        Err(ConfigError::Invalid { field: "buffer_capacity", .. })
    ));

    let file = write_config(r#"{ "executor": { "join_strategy": "merge" } }"#);
    assert!(matches!(
        FederationConfig::from_file(file.path()),
        Err(ConfigError::Parse(_))
    ));

    let mut config = FederationConfig::default();
    config.executor.max_workers = 0;
    assert!(matches!(
        FederationEngine::new(config),
        Err(FederationError::Config(_))
    ));
}
