// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Triple patterns over terms and variables

use std::fmt;

use super::solution::{Solution, VarSet};
use super::term::Term;

/// One position of a triple pattern
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TermPattern {
    Var(String),
    Term(Term),
}

impl TermPattern {
    pub fn var(name: impl Into<String>) -> Self {
        TermPattern::Var(name.into())
    }

    pub fn as_var(&self) -> Option<&str> {
        match self {
            TermPattern::Var(name) => Some(name),
            TermPattern::Term(_) => None,
        }
    }

    /// Replace the variable with its binding in `solution`, if bound
    pub fn bind(&self, solution: &Solution) -> TermPattern {
        match self {
            TermPattern::Var(name) => match solution.get(name) {
                Some(term) => TermPattern::Term(term.clone()),
                None => self.clone(),
            },
            TermPattern::Term(_) => self.clone(),
        }
    }
}

impl From<Term> for TermPattern {
    fn from(term: Term) -> Self {
        TermPattern::Term(term)
    }
}

impl fmt::Display for TermPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TermPattern::Var(name) => write!(f, "?{}", name),
            TermPattern::Term(term) => write!(f, "{}", term),
        }
    }
}

/// A subject/predicate/object pattern
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TriplePattern {
    pub subject: TermPattern,
    pub predicate: TermPattern,
    pub object: TermPattern,
}

impl TriplePattern {
    pub fn new(
        subject: impl Into<TermPattern>,
        predicate: impl Into<TermPattern>,
        object: impl Into<TermPattern>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }

    pub fn positions(&self) -> [&TermPattern; 3] {
        [&self.subject, &self.predicate, &self.object]
    }

    pub fn vars(&self) -> VarSet {
        self.positions()
            .iter()
            .filter_map(|p| p.as_var())
            .map(str::to_string)
            .collect()
    }

    pub fn bind(&self, solution: &Solution) -> TriplePattern {
        TriplePattern {
            subject: self.subject.bind(solution),
            predicate: self.predicate.bind(solution),
            object: self.object.bind(solution),
        }
    }

    /// Match a ground triple against this pattern
    ///
    /// Returns the bindings produced by the match, honouring repeated
    /// variables (`?x :p ?x` only matches when subject equals object).
    pub fn matches(&self, triple: &[Term; 3]) -> Option<Solution> {
        let mut solution = Solution::new();
        for (pattern, term) in self.positions().into_iter().zip(triple.iter()) {
            match pattern {
                TermPattern::Term(expected) => {
                    if expected != term {
                        return None;
                    }
                }
                TermPattern::Var(name) => {
                    if let Some(previous) = solution.insert(name.clone(), term.clone()) {
                        if &previous != term {
                            return None;
                        }
                    }
                }
            }
        }
        Some(solution)
    }
}

impl From<&str> for TermPattern {
    /// `?name` is a variable, anything else an IRI
    fn from(value: &str) -> Self {
        match value.strip_prefix('?') {
            Some(name) => TermPattern::Var(name.to_string()),
            None => TermPattern::Term(Term::iri(value)),
        }
    }
}

impl fmt::Display for TriplePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)
    }
}
