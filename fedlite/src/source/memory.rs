// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! In-memory triple source
//!
//! Evaluates conjunctive queries by pattern matching over a triple list.
//! Used by tests and benchmarks as a stand-in for remote endpoints.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use super::{Capability, Source};
use crate::exec::results::{CollectionResults, Results};
use crate::exec::ExecutionError;
use crate::model::{CQuery, Solution, Term, TriplePattern};
use crate::plan::Cardinality;

/// A source backed by an in-memory list of triples
#[derive(Debug)]
pub struct MemorySource {
    name: String,
    triples: Vec<[Term; 3]>,
    capabilities: HashSet<Capability>,
    /// Predicates this source holds; `None` answers every predicate
    predicates: Option<HashSet<Term>>,
    failure: Option<String>,
    executions: AtomicU64,
}

impl MemorySource {
    /// A source with every capability enabled
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            triples: Vec::new(),
            capabilities: [
                Capability::Conjunctive,
                Capability::Cardinality,
                Capability::BindJoin,
            ]
            .into_iter()
            .collect(),
            predicates: None,
            failure: None,
            executions: AtomicU64::new(0),
        }
    }

    pub fn add(&mut self, subject: Term, predicate: Term, object: Term) {
        self.triples.push([subject, predicate, object]);
    }

    /// Builder form of [`MemorySource::add`]
    pub fn with_triple(mut self, subject: Term, predicate: Term, object: Term) -> Self {
        self.add(subject, predicate, object);
        self
    }

    pub fn with_capabilities(mut self, capabilities: &[Capability]) -> Self {
        self.capabilities = capabilities.iter().copied().collect();
        self
    }

    /// Only claim triples whose predicate is one of the predicates stored
    pub fn restrict_to_own_predicates(mut self) -> Self {
        self.predicates = Some(self.triples.iter().map(|t| t[1].clone()).collect());
        self
    }

    /// Make every execution fail with `message`
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    /// Number of `execute` calls served so far
    pub fn executions(&self) -> u64 {
        self.executions.load(Ordering::Relaxed)
    }

    /// Evaluate `query` eagerly
    pub fn evaluate(&self, query: &CQuery) -> Vec<Solution> {
        let mut partial = vec![Solution::new()];
        for pattern in query.triples() {
            let mut next = Vec::new();
            for solution in &partial {
                let bound = pattern.bind(solution);
                for triple in &self.triples {
                    if let Some(matched) = bound.matches(triple) {
                        if let Some(merged) = solution.merge(&matched) {
                            next.push(merged);
                        }
                    }
                }
            }
            if next.is_empty() {
                return next;
            }
            partial = next;
        }
        partial
    }
}

impl Source for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, query: &CQuery) -> Result<Box<dyn Results>, ExecutionError> {
        self.executions.fetch_add(1, Ordering::Relaxed);
        if let Some(message) = &self.failure {
            return Err(ExecutionError::source_failure(&self.name, message.clone()));
        }
        if query.len() > 1 && !self.has_capability(Capability::Conjunctive) {
            return Err(ExecutionError::source_failure(
                &self.name,
                "conjunctive queries are not supported",
            ));
        }
        let solutions = self.evaluate(query);
        log::trace!("{} answered {} with {} solutions", self.name, query, solutions.len());
        let mut results = CollectionResults::with_vars(solutions, query.vars().clone());
        results.set_name(format!("{}@{}", query, self.name));
        Ok(Box::new(results))
    }

    fn estimate(&self, query: &CQuery) -> Cardinality {
        if !self.has_capability(Capability::Cardinality) {
            return Cardinality::UNSUPPORTED;
        }
        Cardinality::exact(self.evaluate(query).len() as u64)
    }

    fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    fn can_answer(&self, triple: &TriplePattern) -> bool {
        match (&self.predicates, &triple.predicate) {
            (Some(predicates), crate::model::TermPattern::Term(p)) => predicates.contains(p),
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::results::ResultsExt;

    fn people() -> MemorySource {
        MemorySource::new("people")
            .with_triple(Term::iri("alice"), Term::iri("name"), Term::literal("Alice"))
            .with_triple(Term::iri("alice"), Term::iri("age"), Term::integer(30))
            .with_triple(Term::iri("bob"), Term::iri("name"), Term::literal("Bob"))
    }

    #[test]
    fn test_evaluate_conjunction() {
        let source = people();
        let query = CQuery::new(vec![
            TriplePattern::new("?p", "name", "?n"),
            TriplePattern::new("?p", "age", "?a"),
        ]);
        let solutions = source.evaluate(&query);
        assert_eq!(solutions.len(), 1);
        assert_eq!(solutions[0].get("n"), Some(&Term::literal("Alice")));
        assert_eq!(source.estimate(&query), Cardinality::exact(1));
    }

    #[test]
    fn test_execute_counts_and_names() {
        let source = people();
        let mut results = source
            .execute(&CQuery::single(TriplePattern::new("?p", "name", "?n")))
            .unwrap();
        assert!(results.name().unwrap().ends_with("@people"));
        assert_eq!(results.collect_then_close().unwrap().len(), 2);
        assert_eq!(source.executions(), 1);
    }

    #[test]
    fn test_degraded_capabilities() {
        let source = people().with_capabilities(&[]);
        let query = CQuery::new(vec![
            TriplePattern::new("?p", "name", "?n"),
            TriplePattern::new("?p", "age", "?a"),
        ]);
        assert_eq!(source.estimate(&query), Cardinality::UNSUPPORTED);
        assert!(source.execute(&query).is_err());
    }

    #[test]
    fn test_restricted_predicates() {
        let source = people().restrict_to_own_predicates();
        assert!(source.can_answer(&TriplePattern::new("?p", "name", "?n")));
        assert!(!source.can_answer(&TriplePattern::new("?p", "knows", "?o")));
        assert!(source.can_answer(&TriplePattern::new("?p", "?pred", "?o")));
    }
}
