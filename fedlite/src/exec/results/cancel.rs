// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Cooperative cancellation of running executions
//!
//! One [`CancellationToken`] is shared by every operator of an execution.
//! Operators check it before pulling from a child, and a cancelled stream
//! reports itself exhausted. Background streams register a hook on the
//! token so that a blocked consumer wakes up. A [`CancelHandle`] is the
//! side handed to watchdog threads.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::Results;
use crate::exec::ExecutionError;
use crate::model::{Solution, VarSet};

type CancelHook = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct TokenState {
    cancelled: AtomicBool,
    hooks: Mutex<Vec<CancelHook>>,
}

/// Shared cancellation flag of one execution
#[derive(Clone, Default)]
pub struct CancellationToken {
    state: Arc<TokenState>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flag the execution as cancelled and run the registered hooks
    ///
    /// Returns `false` when it was already cancelled.
    pub fn cancel(&self) -> bool {
        if self.state.cancelled.swap(true, Ordering::AcqRel) {
            return false;
        }
        let hooks = std::mem::take(&mut *self.state.hooks.lock());
        log::debug!("Cancelling execution, running {} hooks", hooks.len());
        for hook in hooks {
            hook();
        }
        true
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::Acquire)
    }

    /// Run `hook` once on cancellation, or right away if already cancelled
    pub fn on_cancel<F>(&self, hook: F)
    where
        F: FnOnce() + Send + 'static,
    {
        {
            let mut hooks = self.state.hooks.lock();
            if !self.is_cancelled() {
                hooks.push(Box::new(hook));
                return;
            }
        }
        hook();
    }
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Cancels an execution from any thread
///
/// Safe to use while the consumer is inside `has_next()` or `next()`: the
/// stream stops at its next check and then reports itself exhausted.
/// Resources are still released by the consumer's `close()`, which also
/// reports close failures.
#[derive(Clone, Debug)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    pub fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

/// Root stream of a cancellable execution
pub struct CancellableResults {
    inner: Box<dyn Results>,
    token: CancellationToken,
}

impl CancellableResults {
    pub fn new(inner: Box<dyn Results>, token: CancellationToken) -> Self {
        Self { inner, token }
    }
}

impl Results for CancellableResults {
    fn has_next(&mut self) -> Result<bool, ExecutionError> {
        if self.token.is_cancelled() {
            return Ok(false);
        }
        let more = self.inner.has_next()?;
        Ok(more && !self.token.is_cancelled())
    }

    fn next(&mut self) -> Result<Solution, ExecutionError> {
        if !self.has_next()? {
            return Err(ExecutionError::NoSuchElement(
                self.inner.name().map(str::to_string),
            ));
        }
        self.inner.next()
    }

    fn close(&mut self) -> Result<(), ExecutionError> {
        self.inner.close()
    }

    fn vars(&self) -> &VarSet {
        self.inner.vars()
    }

    fn ready_count(&self) -> usize {
        if self.token.is_cancelled() {
            0
        } else {
            self.inner.ready_count()
        }
    }

    fn is_async(&self) -> bool {
        self.inner.is_async()
    }

    fn name(&self) -> Option<&str> {
        self.inner.name()
    }

    fn set_name(&mut self, name: String) {
        self.inner.set_name(name)
    }
}
