// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Sequential concatenation of alternative streams (MultiQuery union)

use super::{close_all, Results};
use crate::exec::ExecutionError;
use crate::model::{Solution, VarSet};

/// Yields every solution of the first child, then the second, and so on
///
/// No deduplication is performed. Children that are exhausted are closed
/// eagerly; the rest are closed by `close()`, which also reports failures
/// from the eager closes.
pub struct SequentialResults {
    children: Vec<Box<dyn Results>>,
    current: usize,
    vars: VarSet,
    name: Option<String>,
    closed: bool,
    deferred_errors: Vec<ExecutionError>,
}

impl SequentialResults {
    pub fn new(children: Vec<Box<dyn Results>>) -> Self {
        let vars = children.iter().flat_map(|c| c.vars().iter().cloned()).collect();
        Self {
            children,
            current: 0,
            vars,
            name: None,
            closed: false,
            deferred_errors: Vec::new(),
        }
    }
}

impl Results for SequentialResults {
    fn has_next(&mut self) -> Result<bool, ExecutionError> {
        if self.closed {
            return Ok(false);
        }
        while self.current < self.children.len() {
            if self.children[self.current].has_next()? {
                return Ok(true);
            }
            if let Err(e) = self.children[self.current].close() {
                log::warn!(
                    "Failed to close exhausted alternative {} of {}: {}",
                    self.current,
                    self.name.as_deref().unwrap_or("union"),
                    e
                );
                self.deferred_errors.push(e);
            }
            self.current += 1;
        }
        Ok(false)
    }

    fn next(&mut self) -> Result<Solution, ExecutionError> {
        if !self.has_next()? {
            return Err(ExecutionError::NoSuchElement(self.name.clone()));
        }
        self.children[self.current].next()
    }

    fn close(&mut self) -> Result<(), ExecutionError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let mut errors = std::mem::take(&mut self.deferred_errors);
        if let Err(e) = close_all(self.children.iter_mut()) {
            errors.extend(e.into_failures());
        }
        match ExecutionError::aggregate(errors) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn vars(&self) -> &VarSet {
        &self.vars
    }

    fn ready_count(&self) -> usize {
        if self.closed {
            return 0;
        }
        self.children
            .get(self.current)
            .map_or(0, |child| child.ready_count())
    }

    fn is_async(&self) -> bool {
        self.children.iter().any(|c| c.is_async())
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn set_name(&mut self, name: String) {
        self.name = Some(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::results::{CollectionResults, ResultsExt};
    use crate::model::Term;

    fn child(prefix: &str, n: usize) -> Box<dyn Results> {
        Box::new(CollectionResults::new(
            (0..n)
                .map(|i| Solution::from_pairs([("x", Term::literal(format!("{}{}", prefix, i)))]))
                .collect(),
        ))
    }

    #[test]
    fn test_alternative_then_internal_order() {
        let mut results = SequentialResults::new(vec![child("a", 2), child("b", 3)]);
        let got: Vec<String> = results
            .collect_then_close()
            .unwrap()
            .iter()
            .map(|s| s.get("x").unwrap().to_string())
            .collect();
        assert_eq!(
            got,
            vec!["\"a0\"", "\"a1\"", "\"b0\"", "\"b1\"", "\"b2\""]
        );
    }

    #[test]
    fn test_ready_count_tracks_current_child() {
        let mut results = SequentialResults::new(vec![child("a", 1), child("b", 3)]);
        assert_eq!(results.ready_count(), 1);
        results.next().unwrap();
        assert!(results.has_next().unwrap());
        assert_eq!(results.ready_count(), 3);
        assert!(!results.is_async());
    }

    /// Fails its first close only, like a resource released once
    struct FailingClose {
        vars: VarSet,
        closed: bool,
    }

    impl Results for FailingClose {
        fn has_next(&mut self) -> Result<bool, ExecutionError> {
            Ok(false)
        }

        fn next(&mut self) -> Result<Solution, ExecutionError> {
            Err(ExecutionError::NoSuchElement(None))
        }

        fn close(&mut self) -> Result<(), ExecutionError> {
            if self.closed {
                return Ok(());
            }
            self.closed = true;
            Err(ExecutionError::source_failure("failing", "close"))
        }

        fn vars(&self) -> &VarSet {
            &self.vars
        }
    }

    fn failing() -> Box<dyn Results> {
        Box::new(FailingClose {
            vars: ["x".to_string()].into_iter().collect(),
            closed: false,
        })
    }

    #[test]
    fn test_close_reports_every_failure_at_one_level() {
        let mut results = SequentialResults::new(vec![failing(), child("a", 1), failing(), failing()]);
        // Exhausting the first child closes it eagerly and defers its failure
        assert!(results.has_next().unwrap());
        match results.close().unwrap_err() {
            ExecutionError::CloseFailed(errors) => {
                assert_eq!(errors.len(), 3);
                assert!(errors
                    .iter()
                    .all(|e| matches!(e, ExecutionError::Source { .. })));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_skips_empty_children() {
        let mut results = SequentialResults::new(vec![child("a", 0), child("b", 0), child("c", 1)]);
        assert_eq!(results.collect_then_close().unwrap().len(), 1);
    }
}
