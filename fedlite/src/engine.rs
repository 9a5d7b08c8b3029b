// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Federation engine facade: match, plan, execute

use std::sync::Arc;

use uuid::Uuid;

use crate::config::FederationConfig;
use crate::error::FederationError;
use crate::exec::results::{CancelHandle, Results, ResultsExecutor, ResultsExt};
use crate::exec::PlanExecutor;
use crate::model::{CQuery, Solution};
use crate::plan::{
    CardinalityComparator, CardinalityEstimator, DefaultCardinalityComparator,
    DefaultCardinalityEstimator, GreedyJoinPlanner, PlanNode,
};
use crate::source::{EachTripleMatcher, FragmentMatcher, Source};

/// Answers conjunctive queries over a set of sources
///
/// Queries are split into fragments by the matcher, planned by the greedy
/// join planner and executed as a stream. The planner and executor share
/// one cardinality estimator so source estimates are requested once. Its
/// memo holds at most `planner.estimate_cache_capacity` entries.
pub struct FederationEngine {
    config: FederationConfig,
    sources: Vec<Arc<dyn Source>>,
    matcher: Arc<dyn FragmentMatcher>,
    estimator: Arc<DefaultCardinalityEstimator>,
    planner: GreedyJoinPlanner,
    executor: PlanExecutor,
}

impl FederationEngine {
    /// Engine with its own results executor sized from `config`
    pub fn new(config: FederationConfig) -> Result<Self, FederationError> {
        config.validate()?;
        let results_executor = Arc::new(ResultsExecutor::new(
            config.executor.max_workers,
            config.executor.buffer_capacity,
        )?);
        Self::with_results_executor(config, results_executor)
    }

    /// Engine sharing an existing results executor
    pub fn with_results_executor(
        config: FederationConfig,
        results_executor: Arc<ResultsExecutor>,
    ) -> Result<Self, FederationError> {
        config.validate()?;
        let estimator = Arc::new(DefaultCardinalityEstimator::with_capacity(
            config.planner.estimate_cache_capacity,
        ));
        let shared: Arc<dyn CardinalityEstimator> = estimator.clone();
        let comparator: Arc<dyn CardinalityComparator> = Arc::new(DefaultCardinalityComparator);
        let planner = GreedyJoinPlanner::new(config.planner.clone())
            .with_estimator(Arc::clone(&shared))
            .with_comparator(Arc::clone(&comparator));
        let executor = PlanExecutor::new(config.executor.clone(), results_executor)
            .with_estimator(shared)
            .with_comparator(comparator);
        Ok(Self {
            config,
            sources: Vec::new(),
            matcher: Arc::new(EachTripleMatcher),
            estimator,
            planner,
            executor,
        })
    }

    pub fn with_matcher(mut self, matcher: Arc<dyn FragmentMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    /// Builder form of [`FederationEngine::add_source`]
    pub fn with_source(mut self, source: Arc<dyn Source>) -> Result<Self, FederationError> {
        self.add_source(source)?;
        Ok(self)
    }

    /// Register a source; names must be unique
    pub fn add_source(&mut self, source: Arc<dyn Source>) -> Result<(), FederationError> {
        if self.sources.iter().any(|s| s.name() == source.name()) {
            return Err(FederationError::DuplicateSource(source.name().to_string()));
        }
        log::debug!("Registered source {}", source.name());
        self.sources.push(source);
        Ok(())
    }

    pub fn sources(&self) -> &[Arc<dyn Source>] {
        &self.sources
    }

    pub fn config(&self) -> &FederationConfig {
        &self.config
    }

    pub fn executor(&self) -> &PlanExecutor {
        &self.executor
    }

    pub fn estimator(&self) -> &DefaultCardinalityEstimator {
        &self.estimator
    }

    /// Drop memoized estimates of `source` after its data changed
    pub fn invalidate_estimates(&self, source: &str) -> usize {
        self.estimator.invalidate_source(source)
    }

    /// Plan `query` without executing it
    pub fn plan(&self, query: &CQuery) -> Result<Arc<PlanNode>, FederationError> {
        if self.sources.is_empty() {
            return Err(FederationError::NoSources);
        }
        let fragments = self.matcher.match_fragments(query, &self.sources)?;
        Ok(self.planner.plan_query(query, fragments)?)
    }

    /// The plan of `query` rendered as an indented tree
    pub fn explain(&self, query: &CQuery) -> Result<String, FederationError> {
        Ok(self.plan(query)?.to_string())
    }

    /// Plan and open a stream of solutions for `query`
    pub fn execute(&self, query: &CQuery) -> Result<Box<dyn Results>, FederationError> {
        let (results, _) = self.execute_cancellable(query)?;
        Ok(results)
    }

    /// Like [`FederationEngine::execute`], with a handle a watchdog thread
    /// can use to stop the execution
    pub fn execute_cancellable(
        &self,
        query: &CQuery,
    ) -> Result<(Box<dyn Results>, CancelHandle), FederationError> {
        let id = Uuid::new_v4();
        log::debug!("Execution {} started for {}", id, query);
        let plan = self.plan(query)?;
        let (mut results, handle) = self.executor.execute_cancellable(&plan)?;
        results.set_name(format!("execution-{}", id));
        Ok((results, handle))
    }

    pub fn execute_plan(&self, plan: &PlanNode) -> Result<Box<dyn Results>, FederationError> {
        Ok(self.executor.execute(plan)?)
    }

    /// Execute `query` and collect every solution
    pub fn query(&self, query: &CQuery) -> Result<Vec<Solution>, FederationError> {
        let mut results = self.execute(query)?;
        Ok(results.collect_then_close()?)
    }
}

impl std::fmt::Debug for FederationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FederationEngine")
            .field("sources", &self.sources.len())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Term, TriplePattern};
    use crate::source::MemorySource;

    fn engine() -> FederationEngine {
        FederationEngine::with_results_executor(
            FederationConfig::default(),
            Arc::new(ResultsExecutor::inline(8)),
        )
        .unwrap()
    }

    #[test]
    fn test_duplicate_source_rejected() {
        let mut engine = engine();
        engine.add_source(Arc::new(MemorySource::new("s"))).unwrap();
        assert!(matches!(
            engine.add_source(Arc::new(MemorySource::new("s"))),
            Err(FederationError::DuplicateSource(name)) if name == "s"
        ));
    }

    #[test]
    fn test_no_sources() {
        let query = CQuery::single(TriplePattern::new("?x", "p", "?y"));
        assert!(matches!(engine().plan(&query), Err(FederationError::NoSources)));
    }

    #[test]
    fn test_query_names_stream() {
        let source = MemorySource::new("s").with_triple(Term::iri("a"), Term::iri("p"), Term::iri("b"));
        let engine = engine().with_source(Arc::new(source)).unwrap();
        let query = CQuery::single(TriplePattern::new("?x", "p", "?y"));
        let mut results = engine.execute(&query).unwrap();
        assert!(results.name().unwrap().starts_with("execution-"));
        assert_eq!(results.collect_then_close().unwrap().len(), 1);
        assert!(engine.explain(&query).unwrap().contains("@s"));
    }

    #[test]
    fn test_estimate_memo_stays_bounded() {
        let mut memory = MemorySource::new("s");
        for i in 0..40 {
            memory.add(Term::iri("a"), Term::iri(format!("p{}", i)), Term::integer(i));
        }
        let config = FederationConfig::default().with_planner(
            crate::config::PlannerConfig::default().with_estimate_cache_capacity(16),
        );
        let engine = FederationEngine::with_results_executor(config, Arc::new(ResultsExecutor::inline(8)))
            .unwrap()
            .with_source(Arc::new(memory))
            .unwrap();
        for i in 0..39 {
            let query = CQuery::new(vec![
                TriplePattern::new("?x", format!("p{}", i).as_str(), "?a"),
                TriplePattern::new("?x", format!("p{}", i + 1).as_str(), "?b"),
            ]);
            assert_eq!(engine.query(&query).unwrap().len(), 1);
            assert!(engine.estimator().cached() <= 16);
        }
        assert_eq!(engine.estimator().cached(), 16);
        assert_eq!(engine.invalidate_estimates("s"), 16);
        assert_eq!(engine.estimator().cached(), 0);
    }

    #[test]
    fn test_execution_can_be_cancelled() {
        let mut memory = MemorySource::new("s");
        for i in 0..100 {
            memory.add(Term::integer(i), Term::iri("name"), Term::literal(format!("n{}", i)));
            memory.add(Term::integer(i), Term::iri("age"), Term::integer(i));
        }
        let engine = engine().with_source(Arc::new(memory)).unwrap();
        let query = CQuery::new(vec![
            TriplePattern::new("?x", "name", "?n"),
            TriplePattern::new("?x", "age", "?a"),
        ]);
        let (mut results, handle) = engine.execute_cancellable(&query).unwrap();
        assert!(results.name().unwrap().starts_with("execution-"));
        results.next().unwrap();
        handle.cancel();
        assert!(!results.has_next().unwrap());
        results.close().unwrap();
    }

    #[test]
    fn test_empty_query_is_a_planning_error() {
        let engine = engine().with_source(Arc::new(MemorySource::new("s"))).unwrap();
        assert!(matches!(
            engine.plan(&CQuery::new(Vec::new())),
            Err(FederationError::Planning(crate::plan::PlanningError::EmptyFragments))
        ));
    }
}
