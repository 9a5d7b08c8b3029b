// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Fragment matching: which sources answer which parts of a query

use std::fmt;
use std::sync::Arc;

use super::{Capability, Source};
use crate::model::{CQuery, TriplePattern};
use crate::plan::{PlanNode, PlanningError, QueryNode};

/// Splits a query into fragments assigned to sources
pub trait FragmentMatcher: Send + Sync + fmt::Debug {
    fn match_fragments(
        &self,
        query: &CQuery,
        sources: &[Arc<dyn Source>],
    ) -> Result<Vec<Arc<PlanNode>>, PlanningError>;
}

/// Sources able to answer each distinct triple, in query order
fn candidates<'a>(
    query: &'a CQuery,
    sources: &[Arc<dyn Source>],
) -> Result<Vec<(&'a TriplePattern, Vec<Arc<dyn Source>>)>, PlanningError> {
    let mut matched: Vec<(&TriplePattern, Vec<Arc<dyn Source>>)> = Vec::new();
    let mut uncovered = Vec::new();
    for triple in query.triples() {
        if matched.iter().any(|(t, _)| *t == triple) {
            continue;
        }
        let able: Vec<Arc<dyn Source>> = sources
            .iter()
            .filter(|s| s.can_answer(triple))
            .cloned()
            .collect();
        if able.is_empty() {
            uncovered.push(triple.to_string());
        } else {
            matched.push((triple, able));
        }
    }
    if !uncovered.is_empty() {
        return Err(PlanningError::UncoveredTriples(uncovered));
    }
    Ok(matched)
}

fn fragment(query: CQuery, sources: &[Arc<dyn Source>]) -> Result<Arc<PlanNode>, PlanningError> {
    let alternatives = sources
        .iter()
        .map(|source| QueryNode::new(query.clone(), Arc::clone(source)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Arc::new(PlanNode::multi_query(alternatives)?))
}

/// One fragment per triple pattern
///
/// A triple answerable by several sources becomes a MultiQuery over all
/// of them.
#[derive(Debug, Clone, Copy, Default)]
pub struct EachTripleMatcher;

impl FragmentMatcher for EachTripleMatcher {
    fn match_fragments(
        &self,
        query: &CQuery,
        sources: &[Arc<dyn Source>],
    ) -> Result<Vec<Arc<PlanNode>>, PlanningError> {
        candidates(query, sources)?
            .into_iter()
            .map(|(triple, able)| fragment(CQuery::single(triple.clone()), &able))
            .collect()
    }
}

/// Groups triples that only one source can answer
///
/// All triples exclusive to the same conjunctive source are sent to it as
/// a single fragment; every other triple is matched as by
/// [`EachTripleMatcher`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ExclusiveGroupMatcher;

impl FragmentMatcher for ExclusiveGroupMatcher {
    fn match_fragments(
        &self,
        query: &CQuery,
        sources: &[Arc<dyn Source>],
    ) -> Result<Vec<Arc<PlanNode>>, PlanningError> {
        let mut groups: Vec<(Arc<dyn Source>, Vec<TriplePattern>)> = Vec::new();
        let mut fragments = Vec::new();
        for (triple, able) in candidates(query, sources)? {
            match able.as_slice() {
                [only] if only.has_capability(Capability::Conjunctive) => {
                    match groups.iter_mut().find(|(s, _)| s.name() == only.name()) {
                        Some((_, triples)) => triples.push(triple.clone()),
                        None => groups.push((Arc::clone(only), vec![triple.clone()])),
                    }
                }
                _ => fragments.push(fragment(CQuery::single(triple.clone()), &able)?),
            }
        }
        for (source, triples) in groups {
            log::debug!("Exclusive group of {} triples for {}", triples.len(), source.name());
            fragments.push(Arc::new(PlanNode::query(CQuery::new(triples), source)?));
        }
        Ok(fragments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Term;
    use crate::source::MemorySource;

    fn sources() -> Vec<Arc<dyn Source>> {
        let people = MemorySource::new("people")
            .with_triple(Term::iri("alice"), Term::iri("name"), Term::literal("Alice"))
            .with_triple(Term::iri("alice"), Term::iri("age"), Term::integer(30))
            .restrict_to_own_predicates();
        let social = MemorySource::new("social")
            .with_triple(Term::iri("alice"), Term::iri("knows"), Term::iri("bob"))
            .with_triple(Term::iri("bob"), Term::iri("name"), Term::literal("Bob"))
            .restrict_to_own_predicates();
        vec![Arc::new(people), Arc::new(social)]
    }

    fn query() -> CQuery {
        CQuery::new(vec![
            TriplePattern::new("?p", "name", "?n"),
            TriplePattern::new("?p", "age", "?a"),
            TriplePattern::new("?p", "knows", "?f"),
            TriplePattern::new("?p", "name", "?n"),
        ])
    }

    #[test]
    fn test_each_triple() {
        let fragments = EachTripleMatcher.match_fragments(&query(), &sources()).unwrap();
        let kinds: Vec<&str> = fragments.iter().map(|f| f.kind()).collect();
        assert_eq!(kinds, vec!["MultiQuery", "Query", "Query"]);
    }

    #[test]
    fn test_uncovered() {
        let query = CQuery::single(TriplePattern::new("?p", "email", "?e"));
        assert!(matches!(
            EachTripleMatcher.match_fragments(&query, &sources()),
            Err(PlanningError::UncoveredTriples(_))
        ));
    }

    #[test]
    fn test_exclusive_groups() {
        let query = CQuery::new(vec![
            TriplePattern::new("?p", "name", "?n"),
            TriplePattern::new("?p", "age", "?a"),
            TriplePattern::new("?p", "knows", "?f"),
            TriplePattern::new("?f", "age", "?fa"),
        ]);
        let fragments = ExclusiveGroupMatcher.match_fragments(&query, &sources()).unwrap();
        assert_eq!(fragments.len(), 3);
        assert_eq!(fragments[0].kind(), "MultiQuery");
        let PlanNode::Query(group) = fragments[1].as_ref() else {
            panic!("expected a grouped query");
        };
        assert_eq!(group.source().name(), "people");
        assert_eq!(group.query().len(), 2);
    }
}
