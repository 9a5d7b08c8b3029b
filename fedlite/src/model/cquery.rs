// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Conjunctive queries: sets of triple patterns with shared variables

use std::fmt;

use super::solution::{Solution, VarSet};
use super::triple::TriplePattern;

/// An ordered conjunction of triple patterns
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CQuery {
    triples: Vec<TriplePattern>,
    vars: VarSet,
}

impl CQuery {
    pub fn new(triples: Vec<TriplePattern>) -> Self {
        let vars = triples.iter().flat_map(|t| t.vars()).collect();
        Self { triples, vars }
    }

    pub fn single(triple: TriplePattern) -> Self {
        Self::new(vec![triple])
    }

    pub fn triples(&self) -> &[TriplePattern] {
        &self.triples
    }

    pub fn vars(&self) -> &VarSet {
        &self.vars
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    pub fn contains(&self, triple: &TriplePattern) -> bool {
        self.triples.contains(triple)
    }

    /// Substitute every variable bound in `solution`
    ///
    /// This is the specialized sub-query issued by a bind join.
    pub fn bind(&self, solution: &Solution) -> CQuery {
        CQuery::new(self.triples.iter().map(|t| t.bind(solution)).collect())
    }
}

impl FromIterator<TriplePattern> for CQuery {
    fn from_iter<T: IntoIterator<Item = TriplePattern>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl fmt::Display for CQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, t) in self.triples.iter().enumerate() {
            if i > 0 {
                write!(f, " .")?;
            }
            write!(f, " {}", t)?;
        }
        write!(f, " }}")
    }
}
