// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Results streaming protocol
//!
//! Every executor produces and consumes `Results`: a pull-based,
//! single-consumer stream of solutions with an explicit lifecycle:
//!
//! ```text
//! Open --has_next()==true--> next() --> Open
//!  |                                     |
//!  +--has_next()==false (terminal)       +--close()--> Closed
//! ```
//!
//! `close()` is idempotent and must release any background worker or
//! source connection held by the stream, including those of children.

pub mod async_results;
pub mod cancel;
pub mod collection;
pub mod empty;
pub mod executor;
pub mod sequential;

pub use async_results::AsyncResults;
pub use cancel::{CancelHandle, CancellableResults, CancellationToken};
pub use collection::{CollectionResults, IteratorResults};
pub use empty::EmptyResults;
pub use executor::{ResultsExecutor, DEFAULT_BUFFER_CAPACITY, DEFAULT_MAX_WORKERS};
pub use sequential::SequentialResults;

use crate::exec::ExecutionError;
use crate::model::{Solution, VarSet};

/// A stream of solutions
pub trait Results: Send {
    /// Whether another solution is available, blocking until it is known
    fn has_next(&mut self) -> Result<bool, ExecutionError>;

    /// The next solution
    ///
    /// Fails with `ExecutionError::NoSuchElement` when the stream is
    /// exhausted or closed.
    fn next(&mut self) -> Result<Solution, ExecutionError>;

    /// Release the stream and everything it owns. Safe to call repeatedly.
    fn close(&mut self) -> Result<(), ExecutionError>;

    /// Variables this stream may bind
    fn vars(&self) -> &VarSet;

    /// Number of solutions available without further delay. Never blocks.
    fn ready_count(&self) -> usize {
        0
    }

    /// Whether a background producer feeds this stream
    fn is_async(&self) -> bool {
        false
    }

    /// Optional debug name
    fn name(&self) -> Option<&str> {
        None
    }

    fn set_name(&mut self, _name: String) {}
}

impl<R: Results + ?Sized> Results for Box<R> {
    fn has_next(&mut self) -> Result<bool, ExecutionError> {
        (**self).has_next()
    }

    fn next(&mut self) -> Result<Solution, ExecutionError> {
        (**self).next()
    }

    fn close(&mut self) -> Result<(), ExecutionError> {
        (**self).close()
    }

    fn vars(&self) -> &VarSet {
        (**self).vars()
    }

    fn ready_count(&self) -> usize {
        (**self).ready_count()
    }

    fn is_async(&self) -> bool {
        (**self).is_async()
    }

    fn name(&self) -> Option<&str> {
        (**self).name()
    }

    fn set_name(&mut self, name: String) {
        (**self).set_name(name)
    }
}

/// Consumption helpers available on every stream
pub trait ResultsExt: Results {
    /// Feed every remaining solution to `action`, then close the stream
    ///
    /// The stream is closed even when `action` or the stream fails partway;
    /// the first failure is returned and a later close failure is logged.
    fn for_each_remaining_then_close<F>(&mut self, mut action: F) -> Result<(), ExecutionError>
    where
        F: FnMut(Solution) -> Result<(), ExecutionError>,
    {
        let outcome: Result<(), ExecutionError> = (|| {
            while self.has_next()? {
                action(self.next()?)?;
            }
            Ok(())
        })();
        let closed = self.close();
        match (outcome, closed) {
            (Err(e), Err(close_err)) => {
                log::warn!(
                    "Closing {} after failure also failed: {}",
                    self.name().unwrap_or("results"),
                    close_err
                );
                Err(e)
            }
            (Err(e), Ok(())) => Err(e),
            (Ok(()), closed) => closed,
        }
    }

    /// Drain the stream into a vector and close it
    fn collect_then_close(&mut self) -> Result<Vec<Solution>, ExecutionError> {
        let mut solutions = Vec::new();
        self.for_each_remaining_then_close(|s| {
            solutions.push(s);
            Ok(())
        })?;
        Ok(solutions)
    }
}

impl<R: Results + ?Sized> ResultsExt for R {}

/// Close every stream, even when some fail, and aggregate the failures
pub fn close_all<'a, I>(streams: I) -> Result<(), ExecutionError>
where
    I: IntoIterator<Item = &'a mut Box<dyn Results>>,
{
    let mut errors = Vec::new();
    for stream in streams {
        if let Err(e) = stream.close() {
            log::warn!(
                "Failed to close {}: {}",
                stream.name().unwrap_or("results"),
                e
            );
            errors.push(e);
        }
    }
    match ExecutionError::aggregate(errors) {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Term;

    struct FailingClose {
        vars: VarSet,
        closes: usize,
    }

    impl Results for FailingClose {
        fn has_next(&mut self) -> Result<bool, ExecutionError> {
            Ok(false)
        }

        fn next(&mut self) -> Result<Solution, ExecutionError> {
            Err(ExecutionError::NoSuchElement(None))
        }

        fn close(&mut self) -> Result<(), ExecutionError> {
            self.closes += 1;
            Err(ExecutionError::Close {
                resource: "failing".to_string(),
                message: "boom".to_string(),
            })
        }

        fn vars(&self) -> &VarSet {
            &self.vars
        }
    }

    fn solutions(n: usize) -> Vec<Solution> {
        (0..n)
            .map(|i| Solution::from_pairs([("x", Term::integer(i as i64))]))
            .collect()
    }

    #[test]
    fn test_for_each_remaining_counts() {
        let mut results = CollectionResults::new(solutions(3));
        results.next().unwrap();
        let mut seen = 0;
        results
            .for_each_remaining_then_close(|_| {
                seen += 1;
                Ok(())
            })
            .unwrap();
        assert_eq!(seen, 2);
        assert!(!results.has_next().unwrap());
    }

    #[test]
    fn test_for_each_remaining_closes_on_action_failure() {
        let mut results = CollectionResults::new(solutions(5));
        let mut seen = 0;
        let err = results
            .for_each_remaining_then_close(|_| {
                seen += 1;
                if seen == 2 {
                    Err(ExecutionError::InvalidPlan("stop".to_string()))
                } else {
                    Ok(())
                }
            })
            .unwrap_err();
        assert!(matches!(err, ExecutionError::InvalidPlan(_)));
        assert_eq!(seen, 2);
        assert!(results.is_closed());
        assert!(!results.has_next().unwrap());
    }

    #[test]
    fn test_close_all_aggregates_and_closes_siblings() {
        let mut streams: Vec<Box<dyn Results>> = vec![
            Box::new(FailingClose {
                vars: VarSet::new(),
                closes: 0,
            }),
            Box::new(CollectionResults::new(solutions(1))),
            Box::new(FailingClose {
                vars: VarSet::new(),
                closes: 0,
            }),
        ];
        let err = close_all(streams.iter_mut()).unwrap_err();
        match err {
            ExecutionError::CloseFailed(errors) => assert_eq!(errors.len(), 2),
            other => panic!("unexpected error {:?}", other),
        }
        assert!(!streams[1].has_next().unwrap());
    }
}
