// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! End-to-end planning and execution over in-memory sources

#[path = "testutils/mod.rs"]
mod testutils;

use std::sync::Arc;

use fedlite::plan::QueryNode;
use fedlite::{
    CQuery, ExecutorConfig, FederationConfig, FederationEngine, FederationError, GreedyJoinPlanner,
    PlanExecutor, PlanNode, PlannerConfig, PlanningError, ResultsExecutor, ResultsExt, Source,
    Term, TriplePattern, VarSet,
};
use testutils::*;

fn engine(config: FederationConfig, sources: Vec<Arc<dyn Source>>) -> FederationEngine {
    let mut engine =
        FederationEngine::with_results_executor(config, Arc::new(ResultsExecutor::inline(16)))
            .expect("valid config");
    for source in sources {
        engine.add_source(source).expect("unique source");
    }
    engine
}

fn name_age_query() -> CQuery {
    CQuery::new(vec![
        TriplePattern::new("?x", "name", "?n"),
        TriplePattern::new("?x", "age", "?a"),
    ])
}

#[test]
fn test_join_on_shared_variable() {
    init_logging();
    let s1: Arc<dyn Source> = Arc::new(names_source().restrict_to_own_predicates());
    let s2: Arc<dyn Source> = Arc::new(ages_source().restrict_to_own_predicates());
    let engine = engine(FederationConfig::default(), vec![s1, s2]);

    let plan = engine.plan(&name_age_query()).unwrap();
    let PlanNode::Join(join) = plan.as_ref() else {
        panic!("expected a join, got:\n{}", plan);
    };
    assert_eq!(join.join_vars().iter().collect::<Vec<_>>(), vec!["x"]);
    let mut sources: Vec<String> = plan
        .children()
        .iter()
        .map(|c| match c.as_ref() {
            PlanNode::Query(q) => q.source().name().to_string(),
            other => panic!("unexpected {}", other.kind()),
        })
        .collect();
    sources.sort();
    assert_eq!(sources, vec!["S1", "S2"]);

    let solutions = engine.query(&name_age_query()).unwrap();
    assert_eq!(
        solutions,
        vec![solution(&[
            ("x", Term::integer(1)),
            ("n", Term::literal("a")),
            ("a", Term::integer(22)),
        ])]
    );
}

#[test]
fn test_disconnected_fragments() {
    init_logging();
    let s1 = Arc::new(names_source().restrict_to_own_predicates());
    let s2 = Arc::new(ages_source().restrict_to_own_predicates());
    let sources = || vec![s1.clone() as Arc<dyn Source>, s2.clone() as Arc<dyn Source>];
    let query = CQuery::new(vec![
        TriplePattern::new("?x", "name", "?n"),
        TriplePattern::new("?y", "age", "?a"),
    ]);

    let strict = engine(
        FederationConfig::default()
            .with_planner(PlannerConfig::default().with_allow_join_disconnected(false)),
        sources(),
    );
    assert!(matches!(
        strict.execute(&query),
        Err(FederationError::Planning(PlanningError::DisconnectedJoin { components: 2 }))
    ));
    assert_eq!(s1.executions() + s2.executions(), 0);

    let lenient = engine(FederationConfig::default(), sources());
    let plan = lenient.plan(&query).unwrap();
    assert_eq!(plan.kind(), "Cartesian");
    let solutions = lenient.query(&query).unwrap();
    assert_eq!(solutions.len(), 2);
    assert!(solutions.iter().all(|s| s.len() == 4));
}

#[test]
fn test_disconnected_policy_holds_with_an_empty_source() {
    let s1: Arc<dyn Source> = Arc::new(names_source().restrict_to_own_predicates());
    let s2: Arc<dyn Source> = Arc::new(fedlite::MemorySource::new("S2"));
    let query = CQuery::new(vec![
        TriplePattern::new("?x", "name", "?n"),
        TriplePattern::new("?y", "age", "?a"),
    ]);

    let strict = engine(
        FederationConfig::default()
            .with_planner(PlannerConfig::default().with_allow_join_disconnected(false)),
        vec![Arc::clone(&s1), Arc::clone(&s2)],
    );
    assert!(matches!(
        strict.plan(&query),
        Err(FederationError::Planning(PlanningError::DisconnectedJoin { components: 2 }))
    ));

    let lenient = engine(FederationConfig::default(), vec![s1, s2]);
    assert!(lenient.plan(&query).unwrap().is_empty());
    assert!(lenient.query(&query).unwrap().is_empty());
}

#[test]
fn test_multi_query_concatenates_alternatives() {
    init_logging();
    let first: Arc<dyn Source> = Arc::new(numbered_source("first", "p", 2));
    let second: Arc<dyn Source> = Arc::new(
        numbered_source("second", "p", 3)
            .with_triple(Term::integer(7), Term::iri("q"), Term::integer(0)),
    );
    let query = CQuery::single(TriplePattern::new("?s", "p", "?o"));
    let node = PlanNode::multi_query(vec![
        QueryNode::new(query.clone(), first).unwrap(),
        QueryNode::new(query, second).unwrap(),
    ])
    .unwrap();

    let executor = PlanExecutor::new(ExecutorConfig::default(), Arc::new(ResultsExecutor::inline(4)));
    let solutions = executor.execute(&node).unwrap().collect_then_close().unwrap();
    let subjects: Vec<Term> = solutions.iter().map(|s| s.get("s").unwrap().clone()).collect();
    assert_eq!(
        subjects,
        vec![
            Term::integer(0),
            Term::integer(1),
            Term::integer(0),
            Term::integer(1),
            Term::integer(2),
        ]
    );
}

#[test]
fn test_root_vars_are_union_of_fragments() {
    let source: Arc<dyn Source> = Arc::new(numbered_source("s", "p", 3));
    let patterns = [
        ("?a", "p", "?b"),
        ("?b", "p", "?c"),
        ("?d", "p", "?e"),
        ("?c", "p", "?f"),
        ("?g", "p", "?h"),
    ];
    for n in 1..=patterns.len() {
        let fragments: Vec<Arc<PlanNode>> = patterns[..n]
            .iter()
            .map(|(s, p, o)| {
                Arc::new(
                    PlanNode::query(CQuery::single(TriplePattern::new(*s, *p, *o)), Arc::clone(&source))
                        .unwrap(),
                )
            })
            .collect();
        let expected: VarSet = fragments.iter().flat_map(|f| f.vars().iter().cloned()).collect();
        let planner =
            GreedyJoinPlanner::new(PlannerConfig::default().with_short_circuit_empty(false));
        let root = planner.plan(fragments).unwrap();
        assert_eq!(root.vars(), &expected, "plan of {} fragments:\n{}", n, root);
        assert_eq!(root.triples().len(), n);
    }
}

#[test]
fn test_planning_is_reproducible() {
    let source: Arc<dyn Source> = Arc::new(numbered_source("s", "p", 4));
    let query: CQuery = (0..6)
        .map(|i| TriplePattern::new(format!("?v{}", i).as_str(), "p", format!("?v{}", i + 1).as_str()))
        .collect();
    let engine = engine(FederationConfig::default(), vec![source]);
    let first = engine.explain(&query).unwrap();
    for _ in 0..5 {
        assert_eq!(engine.explain(&query).unwrap(), first);
    }
}

#[test]
fn test_uncovered_triple_aborts_before_execution() {
    let s1 = Arc::new(names_source().restrict_to_own_predicates());
    let engine = engine(FederationConfig::default(), vec![s1.clone() as Arc<dyn Source>]);
    assert!(matches!(
        engine.execute(&name_age_query()),
        Err(FederationError::Planning(PlanningError::UncoveredTriples(_)))
    ));
    assert_eq!(s1.executions(), 0);
}
