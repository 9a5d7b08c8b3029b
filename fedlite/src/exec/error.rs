// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Execution error types

use thiserror::Error;

/// Errors surfaced by Results streams and plan executors
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// A source endpoint failed to answer a fragment
    #[error("Source '{endpoint}' failed: {message}")]
    Source { endpoint: String, message: String },

    /// `next()` called on an exhausted or closed stream
    #[error("No such element: results stream{} is exhausted", .0.as_deref().map(|n| format!(" '{}'", n)).unwrap_or_default())]
    NoSuchElement(Option<String>),

    /// Closing an underlying resource failed
    #[error("Failed to close '{resource}': {message}")]
    Close { resource: String, message: String },

    /// Several children failed to close; every failure is kept
    #[error("{} resources failed to close: [{}]", .0.len(), .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    CloseFailed(Vec<ExecutionError>),

    /// A plan node cannot be executed by the chosen strategy
    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    /// The background worker pool could not be created
    #[error("Worker pool error: {0}")]
    WorkerPool(String),

    /// The inner stream panicked while a background worker drove it
    #[error("Background worker panicked: {0}")]
    WorkerPanicked(String),
}

impl ExecutionError {
    pub fn source_failure(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        ExecutionError::Source {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Collapse close failures: `None` for no failure, the failure itself
    /// for one, and `CloseFailed` when several resources failed
    ///
    /// Nested `CloseFailed` lists are flattened into one level.
    pub fn aggregate(errors: Vec<ExecutionError>) -> Option<ExecutionError> {
        let mut errors: Vec<ExecutionError> =
            errors.into_iter().flat_map(ExecutionError::into_failures).collect();
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(ExecutionError::CloseFailed(errors)),
        }
    }

    /// The individual failures behind this error
    pub fn into_failures(self) -> Vec<ExecutionError> {
        match self {
            ExecutionError::CloseFailed(errors) => errors
                .into_iter()
                .flat_map(ExecutionError::into_failures)
                .collect(),
            other => vec![other],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate() {
        assert!(ExecutionError::aggregate(vec![]).is_none());

        let single = ExecutionError::aggregate(vec![ExecutionError::source_failure("s1", "down")]);
        assert!(matches!(single, Some(ExecutionError::Source { .. })));

        let many = ExecutionError::aggregate(vec![
            ExecutionError::source_failure("s1", "down"),
            ExecutionError::source_failure("s2", "down"),
        ])
        .unwrap();
        match &many {
            ExecutionError::CloseFailed(errors) => assert_eq!(errors.len(), 2),
            other => panic!("unexpected error {:?}", other),
        }
        assert!(many.to_string().starts_with("2 resources failed to close"));
    }

    #[test]
    fn test_aggregate_flattens_nested_failures() {
        let nested = ExecutionError::CloseFailed(vec![
            ExecutionError::source_failure("s1", "down"),
            ExecutionError::source_failure("s2", "down"),
        ]);
        let flat = ExecutionError::aggregate(vec![
            ExecutionError::source_failure("s0", "down"),
            nested,
        ])
        .unwrap();
        match flat {
            ExecutionError::CloseFailed(errors) => {
                assert_eq!(errors.len(), 3);
                assert!(errors.iter().all(|e| matches!(e, ExecutionError::Source { .. })));
            }
            other => panic!("unexpected error {:?}", other),
        }

        let single = ExecutionError::aggregate(vec![ExecutionError::CloseFailed(vec![
            ExecutionError::source_failure("s1", "down"),
        ])]);
        assert!(matches!(single, Some(ExecutionError::Source { .. })));
    }

    #[test]
    fn test_no_such_element_message() {
        assert_eq!(
            ExecutionError::NoSuchElement(Some("S1".to_string())).to_string(),
            "No such element: results stream 'S1' is exhausted"
        );
        assert_eq!(
            ExecutionError::NoSuchElement(None).to_string(),
            "No such element: results stream is exhausted"
        );
    }
}
