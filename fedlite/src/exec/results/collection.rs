// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! In-memory and iterator-backed Results

use std::collections::VecDeque;

use super::Results;
use crate::exec::ExecutionError;
use crate::model::{Solution, VarSet};

/// Results over an already materialized collection
///
/// Every remaining solution is ready, so `ready_count()` is the number of
/// solutions left.
#[derive(Debug)]
pub struct CollectionResults {
    solutions: VecDeque<Solution>,
    vars: VarSet,
    name: Option<String>,
    closed: bool,
}

impl CollectionResults {
    /// Variables are inferred from the solutions
    pub fn new(solutions: Vec<Solution>) -> Self {
        let vars = solutions.iter().flat_map(|s| s.vars()).collect();
        Self::with_vars(solutions, vars)
    }

    pub fn with_vars(solutions: Vec<Solution>, vars: VarSet) -> Self {
        Self {
            solutions: solutions.into(),
            vars,
            name: None,
            closed: false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Results for CollectionResults {
    fn has_next(&mut self) -> Result<bool, ExecutionError> {
        Ok(!self.closed && !self.solutions.is_empty())
    }

    fn next(&mut self) -> Result<Solution, ExecutionError> {
        if self.closed {
            return Err(ExecutionError::NoSuchElement(self.name.clone()));
        }
        self.solutions
            .pop_front()
            .ok_or_else(|| ExecutionError::NoSuchElement(self.name.clone()))
    }

    fn close(&mut self) -> Result<(), ExecutionError> {
        self.closed = true;
        self.solutions.clear();
        Ok(())
    }

    fn vars(&self) -> &VarSet {
        &self.vars
    }

    fn ready_count(&self) -> usize {
        if self.closed {
            0
        } else {
            self.solutions.len()
        }
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn set_name(&mut self, name: String) {
        self.name = Some(name);
    }
}

/// Results pulling lazily from an iterator of fallible solutions
pub struct IteratorResults<I> {
    iter: Option<I>,
    current: Option<Solution>,
    vars: VarSet,
    name: Option<String>,
}

impl<I> IteratorResults<I>
where
    I: Iterator<Item = Result<Solution, ExecutionError>> + Send,
{
    pub fn new(iter: I, vars: VarSet) -> Self {
        Self {
            iter: Some(iter),
            current: None,
            vars,
            name: None,
        }
    }
}

impl<I> Results for IteratorResults<I>
where
    I: Iterator<Item = Result<Solution, ExecutionError>> + Send,
{
    fn has_next(&mut self) -> Result<bool, ExecutionError> {
        if self.current.is_some() {
            return Ok(true);
        }
        let Some(iter) = self.iter.as_mut() else {
            return Ok(false);
        };
        match iter.next() {
            Some(Ok(solution)) => {
                self.current = Some(solution);
                Ok(true)
            }
            Some(Err(e)) => Err(e),
            None => {
                self.iter = None;
                Ok(false)
            }
        }
    }

    fn next(&mut self) -> Result<Solution, ExecutionError> {
        if !self.has_next()? {
            return Err(ExecutionError::NoSuchElement(self.name.clone()));
        }
        self.current
            .take()
            .ok_or_else(|| ExecutionError::NoSuchElement(self.name.clone()))
    }

    fn close(&mut self) -> Result<(), ExecutionError> {
        self.iter = None;
        self.current = None;
        Ok(())
    }

    fn vars(&self) -> &VarSet {
        &self.vars
    }

    fn ready_count(&self) -> usize {
        usize::from(self.current.is_some())
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn set_name(&mut self, name: String) {
        self.name = Some(name);
    }
}
