// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Constant empty Results

use super::Results;
use crate::exec::ExecutionError;
use crate::model::{Solution, VarSet};

/// A pre-closed stream that never yields
#[derive(Debug, Clone, Default)]
pub struct EmptyResults {
    vars: VarSet,
    name: Option<String>,
}

impl EmptyResults {
    pub fn new(vars: VarSet) -> Self {
        Self { vars, name: None }
    }
}

impl Results for EmptyResults {
    fn has_next(&mut self) -> Result<bool, ExecutionError> {
        Ok(false)
    }

    fn next(&mut self) -> Result<Solution, ExecutionError> {
        Err(ExecutionError::NoSuchElement(self.name.clone()))
    }

    fn close(&mut self) -> Result<(), ExecutionError> {
        Ok(())
    }

    fn vars(&self) -> &VarSet {
        &self.vars
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn set_name(&mut self, name: String) {
        self.name = Some(name);
    }
}
