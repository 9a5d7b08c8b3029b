// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Hash join
//!
//! The build side is drained into an index keyed by the join variables on
//! the first `has_next()`, then closed. The probe side is streamed; all
//! matches for one probe solution are emitted before the next probe
//! solution is read. Solutions that leave a join variable unbound cannot
//! be keyed and are matched by compatibility instead.

use std::collections::{HashMap, VecDeque};

use crate::exec::results::{close_all, CancellationToken, Results};
use crate::exec::ExecutionError;
use crate::model::{Solution, Term, VarSet};

#[derive(Debug, Default)]
struct BuildIndex {
    keyed: HashMap<Vec<Term>, Vec<Solution>>,
    /// Build solutions missing a join variable
    unkeyed: Vec<Solution>,
    size: usize,
}

impl BuildIndex {
    fn insert(&mut self, solution: Solution, join_vars: &[String]) {
        self.size += 1;
        match solution.project(join_vars) {
            Some(key) => self.keyed.entry(key).or_default().push(solution),
            None => self.unkeyed.push(solution),
        }
    }

    fn probe(&self, probe: &Solution, join_vars: &[String], out: &mut VecDeque<Solution>) {
        let keyed: Box<dyn Iterator<Item = &Solution> + '_> = match probe.project(join_vars) {
            Some(key) => Box::new(self.keyed.get(&key).into_iter().flatten()),
            None => Box::new(self.keyed.values().flatten()),
        };
        for candidate in keyed.chain(&self.unkeyed) {
            if let Some(merged) = probe.merge(candidate) {
                out.push_back(merged);
            }
        }
    }
}

/// Hash join of two child streams
pub struct HashJoinResults {
    build: Option<Box<dyn Results>>,
    probe: Box<dyn Results>,
    join_vars: Vec<String>,
    vars: VarSet,
    index: Option<BuildIndex>,
    pending: VecDeque<Solution>,
    cancel: CancellationToken,
    closed: bool,
    name: Option<String>,
}

impl HashJoinResults {
    pub fn new(build: Box<dyn Results>, probe: Box<dyn Results>, join_vars: &VarSet) -> Self {
        let vars = build.vars().union(probe.vars()).cloned().collect();
        Self {
            build: Some(build),
            probe,
            join_vars: join_vars.iter().cloned().collect(),
            vars,
            index: None,
            pending: VecDeque::new(),
            cancel: CancellationToken::new(),
            closed: false,
            name: None,
        }
    }

    /// Stop building and probing once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Solutions held by the build index, once built
    pub fn build_size(&self) -> Option<usize> {
        self.index.as_ref().map(|index| index.size)
    }

    fn ensure_built(&mut self) -> Result<(), ExecutionError> {
        if self.index.is_some() {
            return Ok(());
        }
        let mut index = BuildIndex::default();
        if let Some(mut build) = self.build.take() {
            let drained: Result<(), ExecutionError> = (|| {
                while !self.cancel.is_cancelled() && build.has_next()? {
                    index.insert(build.next()?, &self.join_vars);
                }
                Ok(())
            })();
            let closed = build.close();
            drained?;
            closed?;
        }
        log::debug!(
            "Hash join built {} solutions on {:?}",
            index.size,
            self.join_vars
        );
        self.index = Some(index);
        Ok(())
    }
}

impl Results for HashJoinResults {
    fn has_next(&mut self) -> Result<bool, ExecutionError> {
        if self.closed || self.cancel.is_cancelled() {
            return Ok(false);
        }
        self.ensure_built()?;
        while self.pending.is_empty() {
            if self.cancel.is_cancelled() || !self.probe.has_next()? {
                return Ok(false);
            }
            let probe = self.probe.next()?;
            if let Some(index) = &self.index {
                index.probe(&probe, &self.join_vars, &mut self.pending);
            }
        }
        Ok(true)
    }

    fn next(&mut self) -> Result<Solution, ExecutionError> {
        if !self.has_next()? {
            return Err(ExecutionError::NoSuchElement(self.name.clone()));
        }
        self.pending
            .pop_front()
            .ok_or_else(|| ExecutionError::NoSuchElement(self.name.clone()))
    }

    fn close(&mut self) -> Result<(), ExecutionError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.pending.clear();
        close_all(self.build.iter_mut().chain(std::iter::once(&mut self.probe)))
    }

    fn vars(&self) -> &VarSet {
        &self.vars
    }

    fn ready_count(&self) -> usize {
        self.pending.len()
    }

    fn is_async(&self) -> bool {
        self.probe.is_async()
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn set_name(&mut self, name: String) {
        self.name = Some(name);
    }
}
