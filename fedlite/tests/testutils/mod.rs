// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use fedlite::{
    CQuery, Capability, ExecutionError, MemorySource, Results, Solution, Source, Term, VarSet,
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// `S1 = [{x=1, n="a"}]`
pub fn names_source() -> MemorySource {
    MemorySource::new("S1").with_triple(Term::integer(1), Term::iri("name"), Term::literal("a"))
}

/// `S2 = [{x=1, a=22}, {x=2, a=30}]`
pub fn ages_source() -> MemorySource {
    MemorySource::new("S2")
        .with_triple(Term::integer(1), Term::iri("age"), Term::integer(22))
        .with_triple(Term::integer(2), Term::iri("age"), Term::integer(30))
}

/// `count` triples `(i, predicate, i * 10)` for `i` in `0..count`
pub fn numbered_source(name: &str, predicate: &str, count: i64) -> MemorySource {
    let mut source = MemorySource::new(name);
    for i in 0..count {
        source.add(Term::integer(i), Term::iri(predicate), Term::integer(i * 10));
    }
    source
}

pub fn solution(pairs: &[(&str, Term)]) -> Solution {
    Solution::from_pairs(pairs.iter().cloned())
}

pub fn as_set(solutions: Vec<Solution>) -> BTreeSet<Solution> {
    solutions.into_iter().collect()
}

/// A source whose result streams fail to close
#[derive(Debug)]
pub struct LeakySource {
    pub inner: MemorySource,
    pub close_attempts: Arc<AtomicUsize>,
}

impl LeakySource {
    pub fn new(inner: MemorySource) -> Self {
        Self {
            inner,
            close_attempts: Arc::new(AtomicUsize::new(0)),
        }
    }
}

struct LeakyResults {
    inner: Box<dyn Results>,
    endpoint: String,
    close_attempts: Arc<AtomicUsize>,
}

impl Results for LeakyResults {
    fn has_next(&mut self) -> Result<bool, ExecutionError> {
        self.inner.has_next()
    }

    fn next(&mut self) -> Result<Solution, ExecutionError> {
        self.inner.next()
    }

    fn close(&mut self) -> Result<(), ExecutionError> {
        self.close_attempts.fetch_add(1, Ordering::SeqCst);
        self.inner.close()?;
        Err(ExecutionError::Close {
            resource: self.endpoint.clone(),
            message: "connection reset".to_string(),
        })
    }

    fn vars(&self) -> &VarSet {
        self.inner.vars()
    }
}

impl Source for LeakySource {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn execute(&self, query: &CQuery) -> Result<Box<dyn Results>, ExecutionError> {
        Ok(Box::new(LeakyResults {
            inner: self.inner.execute(query)?,
            endpoint: self.inner.name().to_string(),
            close_attempts: Arc::clone(&self.close_attempts),
        }))
    }

    fn estimate(&self, query: &CQuery) -> fedlite::Cardinality {
        self.inner.estimate(query)
    }

    fn has_capability(&self, capability: Capability) -> bool {
        self.inner.has_capability(capability)
    }
}
