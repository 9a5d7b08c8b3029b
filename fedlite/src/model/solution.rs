// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Variable bindings produced and consumed by every Results stream

use std::collections::btree_map::{self, BTreeMap};
use std::collections::BTreeSet;
use std::fmt;

use super::term::Term;

/// Ordered set of variable names
///
/// Ordering keeps join keys and plan renderings deterministic.
pub type VarSet = BTreeSet<String>;

/// A mapping from variable names to bound terms
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Solution {
    bindings: BTreeMap<String, Term>,
}

impl Solution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a solution from `(variable, term)` pairs
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, Term)>,
        S: Into<String>,
    {
        Self {
            bindings: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn get(&self, var: &str) -> Option<&Term> {
        self.bindings.get(var)
    }

    /// Bind `var`, returning the previous binding if any
    pub fn insert(&mut self, var: impl Into<String>, term: Term) -> Option<Term> {
        self.bindings.insert(var.into(), term)
    }

    pub fn contains(&self, var: &str) -> bool {
        self.bindings.contains_key(var)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn vars(&self) -> VarSet {
        self.bindings.keys().cloned().collect()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Term> {
        self.bindings.iter()
    }

    /// Project the solution onto `vars`, in order
    ///
    /// Returns `None` when any of the variables is unbound, which makes the
    /// result usable as a hash-join key.
    pub fn project(&self, vars: &[String]) -> Option<Vec<Term>> {
        vars.iter().map(|v| self.bindings.get(v).cloned()).collect()
    }

    /// Keep only the bindings of `vars`
    pub fn restrict(&self, vars: &VarSet) -> Solution {
        Solution {
            bindings: self
                .bindings
                .iter()
                .filter(|(k, _)| vars.contains(*k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    /// Whether every variable bound in both solutions has the same term
    pub fn is_compatible(&self, other: &Solution) -> bool {
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        small
            .bindings
            .iter()
            .all(|(k, v)| large.bindings.get(k).map_or(true, |o| o == v))
    }

    /// Union of two compatible solutions, or `None` on a conflicting binding
    pub fn merge(&self, other: &Solution) -> Option<Solution> {
        if !self.is_compatible(other) {
            return None;
        }
        let mut merged = self.clone();
        for (k, v) in &other.bindings {
            merged.bindings.entry(k.clone()).or_insert_with(|| v.clone());
        }
        Some(merged)
    }
}

impl FromIterator<(String, Term)> for Solution {
    fn from_iter<T: IntoIterator<Item = (String, Term)>>(iter: T) -> Self {
        Self {
            bindings: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Solution {
    type Item = (&'a String, &'a Term);
    type IntoIter = btree_map::Iter<'a, String, Term>;

    fn into_iter(self) -> Self::IntoIter {
        self.bindings.iter()
    }
}

impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (k, v)) in self.bindings.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "?{}={}", k, v)?;
        }
        write!(f, "}}")
    }
}
