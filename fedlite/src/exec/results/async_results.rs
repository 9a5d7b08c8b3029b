// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Background-accelerated Results
//!
//! An [`AsyncResults`] buffers solutions produced by a pool worker into a
//! bounded queue. The inner stream is only ever driven by one party at a
//! time, tracked by [`Driver`]:
//!
//! - a pool worker drives it until the buffer is full, then parks by
//!   returning to the pool; the consumer reschedules it after draining
//! - when no worker holds the stream (not yet started because the pool
//!   is saturated, or parked), a consumer that finds the buffer empty
//!   drives the stream inline, so nested async streams cannot starve
//!   the pool
//!
//! Whoever holds the inner stream when the stream is closed closes it.

use std::any::Any;
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex, MutexGuard};

use super::cancel::{CancelHandle, CancellationToken};
use super::executor::ResultsExecutor;
use super::Results;
use crate::exec::ExecutionError;
use crate::model::{Solution, VarSet};

/// Who currently owns the inner stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Driver {
    Idle,
    Scheduled,
    Worker,
    Consumer,
    Closing,
}

struct State {
    queue: VecDeque<Solution>,
    inner: Option<Box<dyn Results>>,
    driver: Driver,
    exhausted: bool,
    failure: Option<ExecutionError>,
    closed: bool,
    close_errors: Vec<ExecutionError>,
}

struct Shared {
    state: Mutex<State>,
    cond: Condvar,
    /// Mirror of `queue.len()` so `ready_count()` never takes the lock
    ready: AtomicUsize,
    capacity: usize,
    label: String,
}

impl Shared {
    /// Pull one solution from the inner stream with the lock released
    ///
    /// The caller must hold the driver role.
    fn step(&self, st: &mut MutexGuard<'_, State>) {
        let Some(mut inner) = st.inner.take() else {
            st.exhausted = true;
            return;
        };
        let outcome = MutexGuard::unlocked(st, || guarded_fetch(&mut inner));
        st.inner = Some(inner);
        match outcome {
            Ok(Some(solution)) => st.queue.push_back(solution),
            Ok(None) => st.exhausted = true,
            Err(e) => {
                log::debug!("Async stream {} failed: {}", self.label, e);
                st.failure = Some(e);
                st.exhausted = true;
            }
        }
        self.ready.store(st.queue.len(), Ordering::Release);
        if st.exhausted || st.closed {
            self.release_inner(st);
        }
    }

    /// Stop the stream from any thread, waking a waiting consumer
    ///
    /// The inner stream is released here only when no party drives it;
    /// otherwise the driver releases it at its next step.
    fn cancel(&self) {
        let mut st = self.state.lock();
        if st.closed {
            return;
        }
        st.closed = true;
        log::debug!("Cancelling async stream {}", self.label);
        if matches!(st.driver, Driver::Idle | Driver::Scheduled) {
            st.driver = Driver::Closing;
            self.release_inner(&mut st);
            st.driver = Driver::Idle;
        }
        self.cond.notify_all();
    }

    /// Close the inner stream, if still held, recording any failure
    fn release_inner(&self, st: &mut MutexGuard<'_, State>) {
        if let Some(mut inner) = st.inner.take() {
            let outcome = MutexGuard::unlocked(st, || inner.close());
            if let Err(e) = outcome {
                log::warn!("Failed to close inner stream of {}: {}", self.label, e);
                st.close_errors.push(e);
            }
        }
    }
}

fn fetch(inner: &mut Box<dyn Results>) -> Result<Option<Solution>, ExecutionError> {
    if inner.has_next()? {
        inner.next().map(Some)
    } else {
        Ok(None)
    }
}

fn guarded_fetch(inner: &mut Box<dyn Results>) -> Result<Option<Solution>, ExecutionError> {
    match catch_unwind(AssertUnwindSafe(|| fetch(inner))) {
        Ok(outcome) => outcome,
        Err(payload) => Err(ExecutionError::WorkerPanicked(panic_message(payload))),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Pool job: drive the stream until the buffer fills, it ends or closes
fn run_worker(shared: Arc<Shared>, executor: Arc<ResultsExecutor>) {
    let mut st = shared.state.lock();
    if st.driver != Driver::Scheduled {
        // The consumer took over or the stream was closed first
        return;
    }
    st.driver = Driver::Worker;
    executor.worker_started();
    log::trace!("Worker started on {}", shared.label);

    loop {
        if st.closed {
            shared.release_inner(&mut st);
            break;
        }
        if st.exhausted || st.queue.len() >= shared.capacity {
            break;
        }
        shared.step(&mut st);
        shared.cond.notify_all();
    }

    executor.worker_finished();
    st.driver = Driver::Idle;
    shared.cond.notify_all();
    log::trace!("Worker parked on {} with {} buffered", shared.label, st.queue.len());
}

/// A Results stream fed by a background worker
pub struct AsyncResults {
    shared: Arc<Shared>,
    executor: Arc<ResultsExecutor>,
    vars: VarSet,
    name: Option<String>,
    closed: bool,
}

impl AsyncResults {
    pub(crate) fn start(
        inner: Box<dyn Results>,
        executor: Arc<ResultsExecutor>,
        capacity: usize,
    ) -> Self {
        let vars = inner.vars().clone();
        let name = inner.name().map(str::to_string);
        let label = name.clone().unwrap_or_else(|| "anonymous".to_string());
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                queue: VecDeque::with_capacity(capacity.min(1024)),
                inner: Some(inner),
                driver: Driver::Idle,
                exhausted: false,
                failure: None,
                closed: false,
                close_errors: Vec::new(),
            }),
            cond: Condvar::new(),
            ready: AtomicUsize::new(0),
            capacity: capacity.max(1),
            label,
        });
        let results = Self {
            shared,
            executor,
            vars,
            name,
            closed: false,
        };
        {
            let mut st = results.shared.state.lock();
            results.schedule(&mut st);
        }
        results
    }

    fn schedule(&self, st: &mut MutexGuard<'_, State>) {
        if st.driver != Driver::Idle || st.exhausted || st.closed {
            return;
        }
        st.driver = Driver::Scheduled;
        let shared = Arc::clone(&self.shared);
        let executor = Arc::clone(&self.executor);
        if !self.executor.spawn(move || run_worker(shared, executor)) {
            st.driver = Driver::Idle;
        }
    }

    /// A handle that can close this stream from another thread
    ///
    /// Close failures caused by a cancellation are reported by the
    /// consumer's own `close()`.
    pub fn cancel_handle(&self) -> CancelHandle {
        let token = CancellationToken::new();
        self.cancel_on(&token);
        CancelHandle::new(token)
    }

    /// Stop this stream when `token` is cancelled
    pub fn cancel_on(&self, token: &CancellationToken) {
        let shared = Arc::clone(&self.shared);
        token.on_cancel(move || shared.cancel());
    }
}

impl Results for AsyncResults {
    fn has_next(&mut self) -> Result<bool, ExecutionError> {
        if self.closed {
            return Ok(false);
        }
        let shared = &self.shared;
        let mut st = shared.state.lock();
        loop {
            if !st.queue.is_empty() {
                return Ok(true);
            }
            if let Some(e) = st.failure.take() {
                return Err(e);
            }
            if st.closed || st.exhausted {
                return Ok(false);
            }
            match st.driver {
                Driver::Worker | Driver::Consumer | Driver::Closing => shared.cond.wait(&mut st),
                Driver::Idle | Driver::Scheduled => {
                    st.driver = Driver::Consumer;
                    shared.step(&mut st);
                    st.driver = Driver::Idle;
                    shared.cond.notify_all();
                }
            }
        }
    }

    fn next(&mut self) -> Result<Solution, ExecutionError> {
        if !self.has_next()? {
            return Err(ExecutionError::NoSuchElement(self.name.clone()));
        }
        let mut st = self.shared.state.lock();
        let solution = st
            .queue
            .pop_front()
            .ok_or_else(|| ExecutionError::NoSuchElement(self.name.clone()))?;
        self.shared.ready.store(st.queue.len(), Ordering::Release);
        if st.queue.len() <= self.shared.capacity / 2 {
            self.schedule(&mut st);
        }
        Ok(solution)
    }

    fn close(&mut self) -> Result<(), ExecutionError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let shared = &self.shared;
        let mut st = shared.state.lock();
        st.closed = true;
        shared.cond.notify_all();
        while matches!(st.driver, Driver::Worker | Driver::Consumer | Driver::Closing) {
            shared.cond.wait(&mut st);
        }
        // A pending pool job sees a non-Scheduled driver and returns
        st.driver = Driver::Closing;
        shared.release_inner(&mut st);
        st.driver = Driver::Idle;
        st.queue.clear();
        shared.ready.store(0, Ordering::Release);
        shared.cond.notify_all();
        let errors = std::mem::take(&mut st.close_errors);
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
            0
        } else {
            self.shared.ready.load(Ordering::Acquire)
        }
    }

    fn is_async(&self) -> bool {
        true
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn set_name(&mut self, name: String) {
        self.name = Some(name);
    }
}

impl Drop for AsyncResults {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = self.close() {
                log::warn!(
                    "Error closing dropped async stream {}: {}",
                    self.shared.label,
                    e
                );
            }
        }
    }
}
