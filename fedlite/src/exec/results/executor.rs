// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Shared background executor for Results streams
//!
//! The executor owns a bounded worker pool. Streams wrapped by
//! [`ResultsExecutor::spawn_results`] are driven ahead of their consumer by
//! pool workers, buffering up to `buffer_capacity` solutions each.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use once_cell::sync::Lazy;
use rayon::{ThreadPool, ThreadPoolBuilder};

use super::async_results::AsyncResults;
use super::Results;
use crate::exec::ExecutionError;

/// Default number of background workers
pub const DEFAULT_MAX_WORKERS: usize = 8;

/// Default per-stream buffer capacity
pub const DEFAULT_BUFFER_CAPACITY: usize = 256;

static GLOBAL: Lazy<Arc<ResultsExecutor>> = Lazy::new(|| {
    match ResultsExecutor::new(DEFAULT_MAX_WORKERS, DEFAULT_BUFFER_CAPACITY) {
        Ok(executor) => Arc::new(executor),
        Err(e) => {
            log::error!("Falling back to inline results executor: {}", e);
            Arc::new(ResultsExecutor::inline(DEFAULT_BUFFER_CAPACITY))
        }
    }
});

/// Bounded pool of background producers for async Results
pub struct ResultsExecutor {
    /// `None` for an inline executor: consumers drive every stream themselves
    pool: Option<ThreadPool>,
    max_workers: usize,
    buffer_capacity: usize,
    active_workers: AtomicUsize,
    jobs_spawned: AtomicU64,
    streams_opened: AtomicU64,
}

impl ResultsExecutor {
    /// Create an executor with `max_workers` pool threads
    pub fn new(max_workers: usize, buffer_capacity: usize) -> Result<Self, ExecutionError> {
        if max_workers == 0 || buffer_capacity == 0 {
            return Err(ExecutionError::WorkerPool(format!(
                "max_workers ({}) and buffer_capacity ({}) must be positive",
                max_workers, buffer_capacity
            )));
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(max_workers)
            .thread_name(|i| format!("fedlite-results-{}", i))
            .panic_handler(|_| log::error!("Results worker panicked outside a guarded step"))
            .build()
            .map_err(|e| ExecutionError::WorkerPool(e.to_string()))?;

        log::debug!(
            "Created results executor with {} workers, buffer capacity {}",
            max_workers,
            buffer_capacity
        );

        Ok(Self {
            pool: Some(pool),
            max_workers,
            buffer_capacity,
            active_workers: AtomicUsize::new(0),
            jobs_spawned: AtomicU64::new(0),
            streams_opened: AtomicU64::new(0),
        })
    }

    /// An executor without workers
    ///
    /// Async streams still buffer, but only their consumer drives them.
    pub fn inline(buffer_capacity: usize) -> Self {
        Self {
            pool: None,
            max_workers: 0,
            buffer_capacity: buffer_capacity.max(1),
            active_workers: AtomicUsize::new(0),
            jobs_spawned: AtomicU64::new(0),
            streams_opened: AtomicU64::new(0),
        }
    }

    /// Process-wide default executor
    pub fn global() -> Arc<ResultsExecutor> {
        Arc::clone(&GLOBAL)
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    pub fn buffer_capacity(&self) -> usize {
        self.buffer_capacity
    }

    /// Workers currently driving a stream
    pub fn active_workers(&self) -> usize {
        self.active_workers.load(Ordering::SeqCst)
    }

    /// Total background jobs handed to the pool
    pub fn jobs_spawned(&self) -> u64 {
        self.jobs_spawned.load(Ordering::Relaxed)
    }

    /// Total streams wrapped by this executor
    pub fn streams_opened(&self) -> u64 {
        self.streams_opened.load(Ordering::Relaxed)
    }

    pub fn has_workers(&self) -> bool {
        self.pool.is_some()
    }

    /// Wrap `inner` in an [`AsyncResults`] and start its background producer
    pub fn spawn_results(self: &Arc<Self>, inner: Box<dyn Results>) -> AsyncResults {
        self.streams_opened.fetch_add(1, Ordering::Relaxed);
        AsyncResults::start(inner, Arc::clone(self), self.buffer_capacity)
    }

    /// Hand a job to the pool; `false` when this executor has no workers
    pub(crate) fn spawn<F>(&self, job: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        match &self.pool {
            Some(pool) => {
                self.jobs_spawned.fetch_add(1, Ordering::Relaxed);
                pool.spawn(job);
                true
            }
            None => false,
        }
    }

    pub(crate) fn worker_started(&self) {
        self.active_workers.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn worker_finished(&self) {
        self.active_workers.fetch_sub(1, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for ResultsExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultsExecutor")
            .field("max_workers", &self.max_workers)
            .field("buffer_capacity", &self.buffer_capacity)
            .field("active_workers", &self.active_workers())
            .finish()
    }
}
