//! Tool insight pipeline facade.
//!
//! Wires the four services around one shared [`AnalyticsStore`]:
//!
//! ```text
//! UsageTracker → OutcomeEvaluator → PatternAnalyzer → RecommendationEngine
//! ```
//!
//! Callers record invocations and outcomes as they happen; pattern analysis
//! runs as a periodic batch pass; recommendations are answered synchronously
//! from the latest published snapshot.

use super::analyze_patterns::PatternAnalyzer;
use super::evaluate_outcome::OutcomeEvaluator;
use super::hooks::{
    TOOL_EXECUTION_HOOK, TOOL_OUTCOME_HOOK, TOOL_SELECTION_HOOK, ToolExecutionHook,
    ToolOutcomeHook, ToolSelectionHook, complete_invocation,
};
use super::recommend_tool::RecommendationEngine;
use super::track_usage::UsageTracker;
use crate::config::AnalyticsConfig;
use crate::ports::confidence_provider::ConfidenceProvider;
use crate::ports::hook_registry::HookRegistry;
use crate::ports::insight_observer::InsightObserver;
use crate::ports::snapshot_store::SnapshotStore;
use crate::store::AnalyticsStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use toolwise_domain::{InvocationFeedback, InvocationOutcome, OutcomeEvaluation, PatternSnapshot};
use tracing::{debug, error, info, warn};

/// Builder for [`ToolInsightPipeline`].
pub struct PipelineBuilder {
    config: AnalyticsConfig,
    observers: Vec<Arc<dyn InsightObserver>>,
    confidence_provider: Option<Arc<dyn ConfidenceProvider>>,
}

impl PipelineBuilder {
    pub fn with_observer(mut self, observer: Arc<dyn InsightObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn with_confidence_provider(mut self, provider: Arc<dyn ConfidenceProvider>) -> Self {
        self.confidence_provider = Some(provider);
        self
    }

    pub fn build(self) -> ToolInsightPipeline {
        let store = AnalyticsStore::shared(self.config);

        if self.observers.is_empty() {
            warn!("No insight observer configured; pattern insights will not be forwarded");
        }
        let analyzer = self
            .observers
            .into_iter()
            .fold(PatternAnalyzer::new(Arc::clone(&store)), |analyzer, observer| {
                analyzer.with_observer(observer)
            });

        let mut recommender = RecommendationEngine::new(Arc::clone(&store));
        match self.confidence_provider {
            Some(provider) => recommender = recommender.with_confidence_provider(provider),
            None => debug!("No confidence provider configured; adaptive thresholds are authoritative"),
        }

        ToolInsightPipeline {
            tracker: Arc::new(UsageTracker::new(Arc::clone(&store))),
            evaluator: Arc::new(OutcomeEvaluator::new(Arc::clone(&store))),
            analyzer: Arc::new(analyzer),
            recommender: Arc::new(recommender),
            store,
        }
    }
}

/// Facade owning the store and the four pipeline services.
pub struct ToolInsightPipeline {
    store: Arc<AnalyticsStore>,
    tracker: Arc<UsageTracker>,
    evaluator: Arc<OutcomeEvaluator>,
    analyzer: Arc<PatternAnalyzer>,
    recommender: Arc<RecommendationEngine>,
}

impl ToolInsightPipeline {
    pub fn builder(config: AnalyticsConfig) -> PipelineBuilder {
        PipelineBuilder {
            config,
            observers: Vec::new(),
            confidence_provider: None,
        }
    }

    pub fn new(config: AnalyticsConfig) -> Self {
        Self::builder(config).build()
    }

    pub fn config(&self) -> &AnalyticsConfig {
        self.store.config()
    }

    pub fn store(&self) -> &Arc<AnalyticsStore> {
        &self.store
    }

    pub fn tracker(&self) -> &UsageTracker {
        &self.tracker
    }

    pub fn evaluator(&self) -> &OutcomeEvaluator {
        &self.evaluator
    }

    pub fn analyzer(&self) -> &PatternAnalyzer {
        &self.analyzer
    }

    pub fn recommender(&self) -> &RecommendationEngine {
        &self.recommender
    }

    // ==================== Invocation flow ====================

    /// Evaluate a registered invocation by id.
    pub fn evaluate_invocation(&self, invocation_id: &str) -> Option<OutcomeEvaluation> {
        let record = self.tracker.get_invocation(invocation_id);
        self.evaluator.evaluate_outcome(invocation_id, record.as_ref())
    }

    /// Attach an outcome to a registered invocation, evaluate and track it.
    pub fn complete_invocation(
        &self,
        invocation_id: &str,
        outcome: InvocationOutcome,
        feedback: Option<InvocationFeedback>,
    ) -> Option<OutcomeEvaluation> {
        complete_invocation(&self.tracker, &self.evaluator, invocation_id, outcome, feedback)
    }

    /// Register the selection, execution and outcome hook handlers.
    pub fn register_hooks(&self, registry: &dyn HookRegistry) {
        registry.register(
            TOOL_SELECTION_HOOK,
            Arc::new(ToolSelectionHook::new(Arc::clone(&self.tracker))),
        );
        registry.register(
            TOOL_EXECUTION_HOOK,
            Arc::new(ToolExecutionHook::new(Arc::clone(&self.tracker))),
        );
        registry.register(
            TOOL_OUTCOME_HOOK,
            Arc::new(ToolOutcomeHook::new(
                Arc::clone(&self.tracker),
                Arc::clone(&self.evaluator),
            )),
        );
        info!(
            "Registered hooks: {}, {}, {}",
            TOOL_SELECTION_HOOK, TOOL_EXECUTION_HOOK, TOOL_OUTCOME_HOOK
        );
    }

    // ==================== Analysis ====================

    /// Run one full analysis pass off the current data, bounded by the
    /// configured timeout.
    ///
    /// Returns `None` and keeps the previous snapshot when the pass times out.
    pub async fn run_analysis(&self) -> Option<Arc<PatternSnapshot>> {
        run_bounded_analysis(&self.analyzer, self.config().analyzer.analysis_timeout).await
    }

    /// Spawn the periodic analysis loop; it stops when `token` is cancelled.
    pub fn spawn_periodic_analysis(&self, token: CancellationToken) -> JoinHandle<()> {
        let analyzer = Arc::clone(&self.analyzer);
        let params = self.config().analyzer.clone();
        let period = params.analysis_interval.max(Duration::from_millis(1));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!("Periodic analysis every {:?}", period);
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        debug!("Periodic analysis cancelled");
                        break;
                    }
                    _ = ticker.tick() => {
                        run_bounded_analysis(&analyzer, params.analysis_timeout).await;
                    }
                }
            }
        })
    }

    // ==================== Persistence ====================

    /// Persist every component; `true` only if all succeeded.
    pub async fn persist_data(&self, store: &dyn SnapshotStore) -> bool {
        let usage = self.tracker.persist_data(store).await;
        let evaluations = self.evaluator.persist_data(store).await;
        let patterns = self.analyzer.persist_data(store).await;
        let recommendations = self.recommender.persist_data(store).await;
        usage && evaluations && patterns && recommendations
    }

    /// Load every component; `true` only if all succeeded.
    ///
    /// A component whose snapshot fails to load keeps its current state.
    pub async fn load_data(&self, store: &dyn SnapshotStore) -> bool {
        let usage = self.tracker.load_data(store).await;
        let evaluations = self.evaluator.load_data(store).await;
        let patterns = self.analyzer.load_data(store).await;
        let recommendations = self.recommender.load_data(store).await;
        usage && evaluations && patterns && recommendations
    }
}

async fn run_bounded_analysis(
    analyzer: &PatternAnalyzer,
    timeout: Duration,
) -> Option<Arc<PatternSnapshot>> {
    let pass = analyzer.prepare_pass();
    match tokio::time::timeout(timeout, tokio::task::spawn_blocking(move || pass.run())).await {
        Ok(Ok(snapshot)) => Some(analyzer.publish(snapshot)),
        Ok(Err(e)) => {
            error!("Analysis pass failed: {}", e);
            None
        }
        Err(_) => {
            warn!(
                "Analysis pass exceeded {:?}; keeping previous patterns",
                timeout
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalyzerParams;
    use crate::ports::hook_registry::LocalHookRegistry;
    use crate::ports::snapshot_store::MemorySnapshotStore;
    use serde_json::json;
    use toolwise_domain::Context;

    fn fast_config() -> AnalyticsConfig {
        AnalyticsConfig::default().with_analyzer(
            AnalyzerParams::default()
                .with_analysis_interval(Duration::from_millis(10))
                .with_analysis_timeout(Duration::from_secs(5)),
        )
    }

    #[tokio::test]
    async fn test_registered_hooks_drive_the_pipeline() {
        let pipeline = ToolInsightPipeline::new(fast_config());
        let registry = LocalHookRegistry::new();
        pipeline.register_hooks(&registry);
        assert_eq!(
            registry.names(),
            vec!["tool_execution", "tool_outcome", "tool_selection"]
        );

        for _ in 0..3 {
            let reply = registry
                .dispatch(
                    TOOL_SELECTION_HOOK,
                    &json!({"toolId": "search_web", "context": {"task": "research"}}),
                )
                .unwrap();
            let id = reply["invocationId"].as_str().unwrap().to_string();
            registry.dispatch(
                TOOL_OUTCOME_HOOK,
                &json!({"invocationId": id, "outcome": {"status": "success"}}),
            );
        }

        let snapshot = pipeline.run_analysis().await.unwrap();
        assert_eq!(snapshot.correlations.strong_correlations.len(), 1);

        let rec = pipeline
            .recommender()
            .recommend_tool_for_context(&Context::new().with("task", "research"), &[])
            .unwrap();
        assert_eq!(rec.tool, "search_web");
    }

    #[tokio::test]
    async fn test_evaluate_invocation_by_id() {
        let pipeline = ToolInsightPipeline::new(AnalyticsConfig::default());
        let id = pipeline
            .tracker()
            .record_invocation("read_file", Context::new(), Context::new());
        assert!(pipeline.evaluate_invocation(&id).is_none());
        pipeline
            .tracker()
            .attach_outcome(&id, InvocationOutcome::success(), None);
        assert!(pipeline.evaluate_invocation(&id).unwrap().success);
        assert!(pipeline.evaluate_invocation("missing").is_none());
    }

    #[tokio::test]
    async fn test_periodic_analysis_publishes_until_cancelled() {
        let pipeline = ToolInsightPipeline::new(fast_config());
        pipeline.tracker().track_tool_usage(
            "a",
            &Context::new(),
            &InvocationOutcome::success(),
        );
        let token = CancellationToken::new();
        let handle = pipeline.spawn_periodic_analysis(token.clone());

        tokio::time::sleep(Duration::from_millis(100)).await;
        token.cancel();
        handle.await.unwrap();
        assert!(pipeline.analyzer().get_patterns().analyzed_at.is_some());
    }

    #[tokio::test]
    async fn test_persist_and_load_all_components() {
        let snapshots = MemorySnapshotStore::new();
        let pipeline = ToolInsightPipeline::new(AnalyticsConfig::default());
        let id = pipeline
            .tracker()
            .record_invocation("a", Context::new(), Context::new());
        pipeline.complete_invocation(&id, InvocationOutcome::failure("TIMEOUT", "slow"), None);
        pipeline.run_analysis().await;
        assert!(pipeline.persist_data(&snapshots).await);

        let restored = ToolInsightPipeline::new(AnalyticsConfig::default());
        assert!(restored.load_data(&snapshots).await);
        assert_eq!(restored.evaluator().get_evaluations(None).len(), 1);
        assert_eq!(
            restored.tracker().get_tool_usage_stats("a").unwrap().usage_count(),
            1
        );
        assert!(restored.tracker().get_invocation(&id).is_some());
    }
}
