// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Cartesian product
//!
//! The first child is streamed and becomes the outer-most loop; the other
//! children are drained into memory on the first `has_next()` and iterated
//! like an odometer, last child fastest.

use crate::exec::results::{close_all, CancellationToken, Results};
use crate::exec::ExecutionError;
use crate::model::{Solution, VarSet};

pub struct CartesianResults {
    children: Vec<Box<dyn Results>>,
    /// Solutions of children `1..`, once drained
    inner: Option<Vec<Vec<Solution>>>,
    outer: Option<Solution>,
    odometer: Vec<usize>,
    vars: VarSet,
    cancel: CancellationToken,
    closed: bool,
    name: Option<String>,
}

impl CartesianResults {
    /// # Errors
    ///
    /// `InvalidPlan` when given fewer than two children.
    pub fn new(children: Vec<Box<dyn Results>>) -> Result<Self, ExecutionError> {
        if children.len() < 2 {
            return Err(ExecutionError::InvalidPlan(format!(
                "cartesian product of {} children",
                children.len()
            )));
        }
        let vars = children
            .iter()
            .flat_map(|c| c.vars().iter().cloned())
            .collect();
        Ok(Self {
            odometer: vec![0; children.len() - 1],
            children,
            inner: None,
            outer: None,
            vars,
            cancel: CancellationToken::new(),
            closed: false,
            name: None,
        })
    }

    /// Stop materializing and iterating once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    fn materialize(&mut self) -> Result<(), ExecutionError> {
        if self.inner.is_some() {
            return Ok(());
        }
        let mut inner = Vec::with_capacity(self.children.len() - 1);
        for child in self.children.iter_mut().skip(1) {
            let mut solutions = Vec::new();
            while !self.cancel.is_cancelled() && child.has_next()? {
                solutions.push(child.next()?);
            }
            inner.push(solutions);
        }
        let closed = close_all(self.children.iter_mut().skip(1));
        log::trace!(
            "Cartesian materialized {:?} inner solutions",
            inner.iter().map(Vec::len).collect::<Vec<_>>()
        );
        self.inner = Some(inner);
        closed
    }

    fn advance(&mut self, inner: &[Vec<Solution>]) {
        for k in (0..self.odometer.len()).rev() {
            self.odometer[k] += 1;
            if self.odometer[k] < inner[k].len() {
                return;
            }
            self.odometer[k] = 0;
        }
        self.outer = None;
    }
}

impl Results for CartesianResults {
    fn has_next(&mut self) -> Result<bool, ExecutionError> {
        if self.closed || self.cancel.is_cancelled() {
            return Ok(false);
        }
        self.materialize()?;
        if self.cancel.is_cancelled() {
            return Ok(false);
        }
        if self.outer.is_some() {
            return Ok(true);
        }
        let empty_inner = self
            .inner
            .as_ref()
            .map_or(true, |inner| inner.iter().any(Vec::is_empty));
        if empty_inner || !self.children[0].has_next()? {
            return Ok(false);
        }
        self.outer = Some(self.children[0].next()?);
        self.odometer.iter_mut().for_each(|i| *i = 0);
        Ok(true)
    }

    fn next(&mut self) -> Result<Solution, ExecutionError> {
        if !self.has_next()? {
            return Err(ExecutionError::NoSuchElement(self.name.clone()));
        }
        let (Some(outer), Some(inner)) = (&self.outer, self.inner.take()) else {
            return Err(ExecutionError::NoSuchElement(self.name.clone()));
        };
        let mut solution = outer.clone();
        for (k, &i) in self.odometer.iter().enumerate() {
            for (var, term) in &inner[k][i] {
                solution.insert(var.clone(), term.clone());
            }
        }
        self.advance(&inner);
        self.inner = Some(inner);
        Ok(solution)
    }

    fn close(&mut self) -> Result<(), ExecutionError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.outer = None;
        self.inner = None;
        close_all(self.children.iter_mut())
    }

    fn vars(&self) -> &VarSet {
        &self.vars
    }

    /// Combinations left for the current outer solution
    fn ready_count(&self) -> usize {
        let (Some(_), Some(inner)) = (&self.outer, &self.inner) else {
            return 0;
        };
        let mut remaining = 0usize;
        let mut stride = 1usize;
        for k in (0..self.odometer.len()).rev() {
            remaining = remaining.saturating_add((inner[k].len() - 1 - self.odometer[k]).saturating_mul(stride));
            stride = stride.saturating_mul(inner[k].len());
        }
        remaining.saturating_add(1)
    }

    fn is_async(&self) -> bool {
        self.children[0].is_async()
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn set_name(&mut self, name: String) {
        self.name = Some(name);
    }
}
