//! Pattern analysis use case.
//!
//! [`PatternAnalyzer`] mines the usage statistics and context history into
//! performance tiers, tool transition tables and context correlations.
//!
//! Passes never run against live tables: [`PatternAnalyzer::prepare_pass`]
//! copies stats and history under a short read lock, the resulting
//! [`AnalysisPass`] computes off that copy, and the finished
//! [`PatternSnapshot`] is swapped in whole. Readers holding the previous
//! snapshot keep a consistent view.

use super::persistence::{Loaded, load_logged, persist_logged};
use crate::config::AnalyzerParams;
use crate::ports::insight_observer::InsightObserver;
use crate::ports::snapshot_store::{SnapshotComponent, SnapshotStore};
use crate::store::AnalyticsStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use toolwise_domain::patterns::{
    classify_tool_performance, mine_correlations, mine_sequences, predict_from_correlations,
};
use toolwise_domain::{
    Context, ContextHistoryEntry, CorrelationAnalysis, CorrelationPrediction, CorrelationRecord,
    MiningParams, PatternSnapshot, PerformanceTiers, SequenceAnalysis, ToolUsageStats,
};
use tracing::{debug, info};

/// Persisted pattern analyzer snapshot.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PatternDocument {
    patterns: StoredPatterns,
    correlations: CorrelationAnalysis,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredPatterns {
    usage: PerformanceTiers,
    sequences: SequenceAnalysis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    analyzed_at: Option<DateTime<Utc>>,
}

/// A detached copy of the inputs of one analysis pass.
///
/// Owns everything it needs, so it can be moved to a blocking thread.
#[derive(Debug, Clone)]
pub struct AnalysisPass {
    params: MiningParams,
    stats: Vec<ToolUsageStats>,
    history: Vec<ContextHistoryEntry>,
}

impl AnalysisPass {
    pub fn new(
        params: MiningParams,
        stats: Vec<ToolUsageStats>,
        history: Vec<ContextHistoryEntry>,
    ) -> Self {
        Self {
            params,
            stats,
            history,
        }
    }

    pub fn usage_patterns(&self) -> PerformanceTiers {
        classify_tool_performance(&self.stats, &self.params)
    }

    pub fn sequences(&self) -> SequenceAnalysis {
        mine_sequences(&self.history, &self.params)
    }

    pub fn correlations(&self) -> CorrelationAnalysis {
        mine_correlations(&self.history, &self.params)
    }

    /// Run all three passes.
    pub fn run(self) -> PatternSnapshot {
        PatternSnapshot {
            usage: self.usage_patterns(),
            sequences: self.sequences(),
            correlations: self.correlations(),
            analyzed_at: Some(Utc::now()),
        }
    }
}

/// Mines usage data into derived patterns and publishes snapshots.
pub struct PatternAnalyzer {
    store: Arc<AnalyticsStore>,
    observers: Vec<Arc<dyn InsightObserver>>,
}

impl PatternAnalyzer {
    pub fn new(store: Arc<AnalyticsStore>) -> Self {
        Self {
            store,
            observers: Vec::new(),
        }
    }

    /// Register an observer notified after every full publication.
    pub fn with_observer(mut self, observer: Arc<dyn InsightObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    fn params(&self) -> &AnalyzerParams {
        &self.store.config().analyzer
    }

    /// Copy the current stats and history for a detached pass.
    pub fn prepare_pass(&self) -> AnalysisPass {
        let (stats, history) = self.store.usage_snapshot();
        AnalysisPass::new(self.params().mining_params(), stats, history)
    }

    // ==================== Individual passes ====================

    /// Classify tools into high and low performers and publish the result.
    ///
    /// Below `min_sample_size` total invocations nothing is classified.
    pub fn analyze_tool_usage_patterns(&self) -> PerformanceTiers {
        let tiers = self.prepare_pass().usage_patterns();
        if !tiers.analyzed {
            debug!(
                "Skipping usage classification: {} samples below minimum {}",
                tiers.total_samples,
                self.params().min_sample_size
            );
        }
        self.update(|snapshot| snapshot.usage = tiers.clone());
        tiers
    }

    /// Build the transition table and frequent sequences and publish them.
    pub fn analyze_tool_sequences(&self) -> SequenceAnalysis {
        let sequences = self.prepare_pass().sequences();
        self.update(|snapshot| snapshot.sequences = sequences.clone());
        sequences
    }

    /// Count tool choices per context factor and publish the correlations.
    pub fn analyze_context_correlations(&self) -> CorrelationAnalysis {
        let correlations = self.prepare_pass().correlations();
        self.update(|snapshot| snapshot.correlations = correlations.clone());
        correlations
    }

    /// Apply one pass's result to the published snapshot.
    ///
    /// Mining already happened off a copy; only the merge runs under the lock.
    fn update(&self, apply: impl FnOnce(&mut PatternSnapshot)) {
        self.store.update_patterns(|snapshot| {
            apply(snapshot);
            snapshot.analyzed_at = Some(Utc::now());
        });
    }

    // ==================== Full analysis ====================

    /// Run all passes off one consistent copy and publish atomically.
    pub fn run_full_analysis(&self) -> Arc<PatternSnapshot> {
        let snapshot = self.prepare_pass().run();
        self.publish(snapshot)
    }

    /// Swap in a computed snapshot and notify observers.
    pub fn publish(&self, snapshot: PatternSnapshot) -> Arc<PatternSnapshot> {
        let snapshot = Arc::new(snapshot);
        self.store.publish_patterns(Arc::clone(&snapshot));
        info!(
            "Published patterns: {} high / {} low performers, {} transitions, {} strong correlations",
            snapshot.usage.high_performing_tools.len(),
            snapshot.usage.low_performing_tools.len(),
            snapshot.sequences.common_sequences.len(),
            snapshot.correlations.strong_correlations.len()
        );
        for observer in &self.observers {
            debug!("Notifying insight observer {}", observer.name());
            observer.on_patterns_published(&snapshot);
        }
        snapshot
    }

    // ==================== Queries ====================

    /// Point-in-time snapshot of all derived structures.
    pub fn get_patterns(&self) -> Arc<PatternSnapshot> {
        self.store.patterns()
    }

    /// Correlation buckets, optionally restricted to one context factor.
    pub fn get_correlations(&self, factor: Option<&str>) -> Vec<CorrelationRecord> {
        let patterns = self.store.patterns();
        patterns
            .correlations
            .correlations
            .iter()
            .filter(|c| factor.is_none_or(|f| c.context_factor == f))
            .cloned()
            .collect()
    }

    /// Tools the correlation model predicts for `context`, best first.
    pub fn predict_tool(&self, context: &Context) -> Vec<CorrelationPrediction> {
        predict_from_correlations(context, &self.store.patterns().correlations)
    }

    // ==================== Persistence ====================

    pub async fn persist_data(&self, store: &dyn SnapshotStore) -> bool {
        let snapshot = self.store.patterns();
        let document = PatternDocument {
            patterns: StoredPatterns {
                usage: snapshot.usage.clone(),
                sequences: snapshot.sequences.clone(),
                analyzed_at: snapshot.analyzed_at,
            },
            correlations: snapshot.correlations.clone(),
        };
        persist_logged(store, SnapshotComponent::Patterns, &document).await
    }

    /// Restore the last persisted snapshot without notifying observers.
    pub async fn load_data(&self, store: &dyn SnapshotStore) -> bool {
        let document: PatternDocument = match load_logged(store, SnapshotComponent::Patterns).await
        {
            Loaded::Document(document) => document,
            Loaded::Missing => return true,
            Loaded::Failed => return false,
        };
        info!(
            "Loaded pattern snapshot: {} correlation buckets",
            document.correlations.correlations.len()
        );
        self.store.publish_patterns(Arc::new(PatternSnapshot {
            usage: document.patterns.usage,
            sequences: document.patterns.sequences,
            correlations: document.correlations,
            analyzed_at: document.patterns.analyzed_at,
        }));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalyticsConfig;
    use crate::ports::snapshot_store::MemorySnapshotStore;
    use crate::use_cases::track_usage::UsageTracker;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use toolwise_domain::{InvocationOutcome, SequencePattern};

    fn setup() -> (PatternAnalyzer, UsageTracker) {
        let store = AnalyticsStore::shared(AnalyticsConfig::default());
        (
            PatternAnalyzer::new(Arc::clone(&store)),
            UsageTracker::new(store),
        )
    }

    fn track(tracker: &UsageTracker, tool: &str, context: &Context, success: bool) {
        let outcome = if success {
            InvocationOutcome::success()
        } else {
            InvocationOutcome::failure("TIMEOUT", "slow")
        };
        tracker.track_tool_usage(tool, context, &outcome);
    }

    #[test]
    fn test_sequences_count_repeated_pairs() {
        let (analyzer, tracker) = setup();
        let start = Utc::now();
        for i in 0..5i64 {
            for (j, tool) in ["search_web", "browser_navigate"].iter().enumerate() {
                tracker.track_tool_usage_at(
                    tool,
                    &Context::new(),
                    &InvocationOutcome::success(),
                    start + chrono::Duration::seconds(i * 2 + j as i64),
                );
            }
        }

        let sequences = analyzer.analyze_tool_sequences();
        assert!(
            sequences
                .common_sequences
                .contains(&SequencePattern::new(["search_web", "browser_navigate"], 5))
        );
        assert_eq!(analyzer.get_patterns().sequences, sequences);
    }

    #[test]
    fn test_empty_history_yields_empty_structures() {
        let (analyzer, _) = setup();
        assert_eq!(analyzer.analyze_tool_sequences(), SequenceAnalysis::default());
        assert_eq!(analyzer.analyze_context_correlations(), CorrelationAnalysis::default());
        assert!(!analyzer.analyze_tool_usage_patterns().analyzed);
    }

    #[test]
    fn test_concurrent_passes_keep_both_results() {
        let (analyzer, tracker) = setup();
        let analyzer = Arc::new(analyzer);
        let ctx = Context::new().with("task", "research");
        for _ in 0..4 {
            track(&tracker, "search_web", &ctx, true);
            track(&tracker, "browser_navigate", &ctx, true);
        }
        let expected_sequences = analyzer.prepare_pass().sequences();
        let expected_correlations = analyzer.prepare_pass().correlations();
        assert!(!expected_sequences.common_sequences.is_empty());
        assert!(!expected_correlations.correlations.is_empty());

        for _ in 0..200 {
            analyzer.store.publish_patterns(Arc::new(PatternSnapshot::default()));
            let barrier = Arc::new(std::sync::Barrier::new(2));
            let sequences = {
                let analyzer = Arc::clone(&analyzer);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    analyzer.analyze_tool_sequences();
                })
            };
            let correlations = {
                let analyzer = Arc::clone(&analyzer);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    analyzer.analyze_context_correlations();
                })
            };
            sequences.join().unwrap();
            correlations.join().unwrap();

            let patterns = analyzer.get_patterns();
            assert_eq!(patterns.sequences, expected_sequences);
            assert_eq!(patterns.correlations, expected_correlations);
        }
    }

    #[test]
    fn test_usage_patterns_classify_tools() {
        let (analyzer, tracker) = setup();
        for i in 0..6 {
            track(&tracker, "solid", &Context::new(), true);
            track(&tracker, "flaky", &Context::new(), i == 0);
        }
        let tiers = analyzer.analyze_tool_usage_patterns();
        assert!(tiers.analyzed);
        assert!(tiers.is_high_performer("solid"));
        assert!(tiers.is_low_performer("flaky"));
    }

    #[test]
    fn test_nested_correlations_and_prediction() {
        let (analyzer, tracker) = setup();
        let research = Context::new().with("task", Context::new().with("type", "research"));
        for _ in 0..4 {
            track(&tracker, "search_web", &research, true);
        }
        track(&tracker, "read_file", &Context::new().with("task", Context::new().with("type", "coding")), true);

        let analysis = analyzer.analyze_context_correlations();
        let strong = &analysis.strong_correlations[0];
        assert_eq!(strong.context_factor, "task.type");
        assert_eq!(strong.tool, "search_web");

        assert_eq!(analyzer.get_correlations(Some("task.type")).len(), 2);
        assert!(analyzer.get_correlations(Some("missing")).is_empty());

        let predictions = analyzer.predict_tool(&research);
        assert_eq!(predictions[0].tool, "search_web");
        assert_eq!(predictions[0].confidence, 1.0);
    }

    #[test]
    fn test_full_analysis_is_idempotent() {
        let (analyzer, tracker) = setup();
        for i in 0..12 {
            let ctx = Context::new().with("mode", if i % 2 == 0 { "a" } else { "b" });
            track(&tracker, if i % 3 == 0 { "x" } else { "y" }, &ctx, i % 4 != 0);
        }
        let first = analyzer.run_full_analysis();
        let second = analyzer.run_full_analysis();
        assert!(first.same_patterns(&second));
    }

    struct CountingObserver(AtomicUsize);

    impl InsightObserver for CountingObserver {
        fn name(&self) -> &str {
            "counting"
        }

        fn on_patterns_published(&self, _snapshot: &Arc<PatternSnapshot>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_observers_notified_on_full_analysis() {
        let store = AnalyticsStore::shared(AnalyticsConfig::default());
        let observer = Arc::new(CountingObserver(AtomicUsize::new(0)));
        let analyzer = PatternAnalyzer::new(store).with_observer(observer.clone());
        analyzer.run_full_analysis();
        analyzer.analyze_tool_sequences();
        assert_eq!(observer.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_keeps_patterns() {
        let (analyzer, tracker) = setup();
        for _ in 0..3 {
            track(&tracker, "search_web", &Context::new().with("k", "v"), true);
        }
        analyzer.run_full_analysis();
        let before = analyzer.get_patterns();

        let snapshots = MemorySnapshotStore::new();
        snapshots.insert(SnapshotComponent::Patterns, serde_json::json!("garbage"));
        assert!(!analyzer.load_data(&snapshots).await);
        assert!(Arc::ptr_eq(&before, &analyzer.get_patterns()));
        assert_eq!(analyzer.get_correlations(None).len(), 1);
    }

    #[tokio::test]
    async fn test_persist_and_load_round_trip() {
        let (analyzer, tracker) = setup();
        for _ in 0..3 {
            track(&tracker, "search_web", &Context::new().with("k", "v"), true);
        }
        let published = analyzer.run_full_analysis();

        let snapshots = MemorySnapshotStore::new();
        assert!(analyzer.persist_data(&snapshots).await);
        let (restored, _) = setup();
        assert!(restored.load_data(&snapshots).await);
        assert!(restored.get_patterns().same_patterns(&published));
    }
}
