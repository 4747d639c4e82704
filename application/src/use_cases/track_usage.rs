//! Usage tracking use case.
//!
//! [`UsageTracker`] records every tool invocation with its context and
//! outcome, maintains per-tool [`ToolUsageStats`] and the bounded context
//! history the other components mine.

use super::persistence::{Loaded, load_logged, persist_logged};
use crate::ports::snapshot_store::{SnapshotComponent, SnapshotStore};
use crate::store::AnalyticsStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use toolwise_domain::{
    BoundedBuffer, Context, ContextHistoryEntry, InvocationFeedback, InvocationOutcome,
    ToolInvocationRecord, ToolUsageStats, context_similarity,
};
use tracing::{debug, info, warn};

/// Persisted usage tracker snapshot.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageDocument {
    tool_usage: BTreeMap<String, ToolUsageStats>,
    context_history: Vec<ContextHistoryEntry>,
    #[serde(default)]
    invocations: Vec<ToolInvocationRecord>,
}

/// Result of [`UsageTracker::attach_outcome`].
#[derive(Debug, Clone, PartialEq)]
pub enum OutcomeAttachment {
    /// The outcome was stored; the updated record
    Attached(ToolInvocationRecord),
    /// The invocation already had an outcome; the stored record, unchanged
    AlreadyCompleted(ToolInvocationRecord),
    /// No such invocation is registered
    Unknown,
}

/// Records invocations and maintains per-tool usage statistics.
pub struct UsageTracker {
    store: Arc<AnalyticsStore>,
}

impl UsageTracker {
    pub fn new(store: Arc<AnalyticsStore>) -> Self {
        Self { store }
    }

    // ==================== Invocation lifecycle ====================

    /// Register a new invocation and return its id.
    ///
    /// The registry is bounded; the oldest invocation is forgotten first.
    pub fn record_invocation(
        &self,
        tool_id: impl Into<String>,
        parameters: Context,
        context: Context,
    ) -> String {
        let record = ToolInvocationRecord::new(tool_id, parameters, context);
        let id = record.id.clone();
        debug!("Recorded invocation {} of {}", id, record.tool_id);

        let mut usage = self.store.usage_mut();
        if let Some(evicted) = usage.invocation_order.push(id.clone()) {
            usage.invocations.remove(&evicted);
        }
        if usage.invocation_order.capacity() > 0 {
            usage.invocations.insert(id.clone(), record);
        }
        id
    }

    /// Attach measured execution time; `false` for an unknown invocation.
    pub fn record_execution(&self, invocation_id: &str, execution_time_ms: u64) -> bool {
        let mut usage = self.store.usage_mut();
        match usage.invocations.get_mut(invocation_id) {
            Some(record) => {
                record.execution_time_ms = Some(execution_time_ms);
                true
            }
            None => {
                warn!("Execution reported for unknown invocation {}", invocation_id);
                false
            }
        }
    }

    /// Attach the terminal outcome, and the caller's feedback if any.
    ///
    /// The check and the write happen under one lock, so of several
    /// concurrent reports for the same invocation exactly one is
    /// [`OutcomeAttachment::Attached`]. An outcome already set is never
    /// overwritten.
    pub fn attach_outcome(
        &self,
        invocation_id: &str,
        outcome: InvocationOutcome,
        feedback: Option<InvocationFeedback>,
    ) -> OutcomeAttachment {
        let mut usage = self.store.usage_mut();
        let Some(record) = usage.invocations.get_mut(invocation_id) else {
            warn!("Outcome reported for unknown invocation {}", invocation_id);
            return OutcomeAttachment::Unknown;
        };
        if record.outcome.is_some() {
            debug!("Invocation {} already completed", invocation_id);
            return OutcomeAttachment::AlreadyCompleted(record.clone());
        }
        record.outcome = Some(outcome);
        if let Some(feedback) = feedback {
            record.feedback = Some(feedback);
        }
        OutcomeAttachment::Attached(record.clone())
    }

    /// Attach explicit feedback; `false` for an unknown invocation.
    pub fn attach_feedback(&self, invocation_id: &str, feedback: InvocationFeedback) -> bool {
        let mut usage = self.store.usage_mut();
        match usage.invocations.get_mut(invocation_id) {
            Some(record) => {
                record.feedback = Some(feedback);
                true
            }
            None => {
                warn!("Feedback reported for unknown invocation {}", invocation_id);
                false
            }
        }
    }

    pub fn get_invocation(&self, invocation_id: &str) -> Option<ToolInvocationRecord> {
        self.store.usage().invocations.get(invocation_id).cloned()
    }

    // ==================== Usage statistics ====================

    /// Fold one invocation into the tool's statistics and the context history.
    pub fn track_tool_usage(&self, tool_id: &str, context: &Context, outcome: &InvocationOutcome) {
        self.track_tool_usage_at(tool_id, context, outcome, Utc::now());
    }

    /// [`track_tool_usage`](Self::track_tool_usage) with an explicit timestamp.
    pub fn track_tool_usage_at(
        &self,
        tool_id: &str,
        context: &Context,
        outcome: &InvocationOutcome,
        at: DateTime<Utc>,
    ) {
        if tool_id.trim().is_empty() {
            warn!("Ignoring usage with empty tool id");
            return;
        }
        let limits = self.store.config().tracker.usage_limits();

        let mut usage = self.store.usage_mut();
        usage
            .stats
            .entry(tool_id.to_string())
            .or_insert_with(|| ToolUsageStats::new(tool_id, limits))
            .record(context, outcome, at);
        usage
            .history
            .push(ContextHistoryEntry::new(tool_id, context.clone(), outcome.status).at(at));
    }

    /// Statistics for one tool; `None` if it was never used.
    pub fn get_tool_usage_stats(&self, tool_id: &str) -> Option<ToolUsageStats> {
        self.store.usage().stats.get(tool_id).cloned()
    }

    pub fn get_all_tool_usage_stats(&self) -> BTreeMap<String, ToolUsageStats> {
        self.store
            .usage()
            .stats
            .iter()
            .map(|(tool, stats)| (tool.clone(), stats.clone()))
            .collect()
    }

    // ==================== Context history ====================

    /// History in arrival order, optionally restricted to one tool.
    pub fn get_context_history(&self, tool_id: Option<&str>) -> Vec<ContextHistoryEntry> {
        let usage = self.store.usage();
        usage
            .history
            .iter()
            .filter(|entry| tool_id.is_none_or(|tool| entry.tool == tool))
            .cloned()
            .collect()
    }

    /// Structural similarity of two contexts in `[0, 1]`.
    pub fn get_context_similarity(&self, a: &Context, b: &Context) -> f64 {
        context_similarity(a, b, self.store.config().tracker.similarity_weights())
    }

    /// History entries at least `threshold` similar to `context`, in history order.
    pub fn find_similar_contexts(&self, context: &Context, threshold: f64) -> Vec<ContextHistoryEntry> {
        let weights = self.store.config().tracker.similarity_weights();
        let history = self.store.usage().history.to_vec();
        history
            .into_iter()
            .filter(|entry| context_similarity(context, &entry.context, weights) >= threshold)
            .collect()
    }

    // ==================== Persistence ====================

    pub async fn persist_data(&self, store: &dyn SnapshotStore) -> bool {
        let document = {
            let usage = self.store.usage();
            UsageDocument {
                tool_usage: usage
                    .stats
                    .iter()
                    .map(|(tool, stats)| (tool.clone(), stats.clone()))
                    .collect(),
                context_history: usage.history.to_vec(),
                invocations: usage
                    .invocation_order
                    .iter()
                    .filter_map(|id| usage.invocations.get(id).cloned())
                    .collect(),
            }
        };
        persist_logged(store, SnapshotComponent::Usage, &document).await
    }

    /// Replace in-memory usage state with the stored snapshot.
    ///
    /// A missing snapshot keeps the current state and reports success; a
    /// corrupt one keeps the current state and reports failure.
    pub async fn load_data(&self, store: &dyn SnapshotStore) -> bool {
        let document: UsageDocument = match load_logged(store, SnapshotComponent::Usage).await {
            Loaded::Document(document) => document,
            Loaded::Missing => return true,
            Loaded::Failed => return false,
        };

        let config = &self.store.config().tracker;
        let limits = config.usage_limits();

        let stats: HashMap<String, ToolUsageStats> = document
            .tool_usage
            .into_iter()
            .map(|(tool, mut stats)| {
                stats.apply_limits(limits);
                (tool, stats)
            })
            .collect();

        let mut history = BoundedBuffer::new(config.max_history_items);
        history.extend(document.context_history);

        let mut invocation_order = BoundedBuffer::new(config.max_invocations);
        let mut invocations = HashMap::new();
        for record in document.invocations {
            if let Some(evicted) = invocation_order.push(record.id.clone()) {
                invocations.remove(&evicted);
            }
            invocations.insert(record.id.clone(), record);
        }
        if invocation_order.capacity() == 0 {
            invocations.clear();
        }

        let mut usage = self.store.usage_mut();
        info!(
            "Loaded usage snapshot: {} tools, {} history entries",
            stats.len(),
            history.len()
        );
        usage.stats = stats;
        usage.history = history;
        usage.invocations = invocations;
        usage.invocation_order = invocation_order;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AnalyticsConfig, TrackerParams};
    use crate::ports::snapshot_store::MemorySnapshotStore;
    use proptest::prelude::*;
    use std::sync::Barrier;
    use std::thread;
    use toolwise_domain::OutcomeStatus;

    fn tracker_with(params: TrackerParams) -> UsageTracker {
        UsageTracker::new(AnalyticsStore::shared(
            AnalyticsConfig::default().with_tracker(params),
        ))
    }

    fn tracker() -> UsageTracker {
        tracker_with(TrackerParams::default())
    }

    #[test]
    fn test_success_rate_and_running_mean() {
        let tracker = tracker();
        let ctx = Context::new().with("task", "research");
        for i in 0..10u64 {
            let outcome = if i < 8 {
                InvocationOutcome::success()
            } else {
                InvocationOutcome::failure("TIMEOUT", "took too long")
            };
            tracker.track_tool_usage("search_web", &ctx, &outcome.with_duration(100 * (i + 1)));
        }

        let stats = tracker.get_tool_usage_stats("search_web").unwrap();
        assert_eq!(stats.usage_count(), 10);
        assert_eq!(stats.success_rate(), Some(0.8));
        assert!((stats.failure_rate().unwrap() - 0.2).abs() < 1e-9);
        assert!((stats.avg_duration_ms() - 550.0).abs() < 1e-9);
        assert_eq!(stats.failure_reasons().len(), 2);
    }

    #[test]
    fn test_unknown_tool_reads_are_empty() {
        let tracker = tracker();
        assert!(tracker.get_tool_usage_stats("nope").is_none());
        assert!(tracker.get_context_history(Some("nope")).is_empty());
        assert!(tracker.get_all_tool_usage_stats().is_empty());
    }

    #[test]
    fn test_history_evicts_oldest_first() {
        let tracker = tracker_with(TrackerParams::default().with_max_history_items(3));
        for i in 0..5 {
            tracker.track_tool_usage(
                &format!("tool_{i}"),
                &Context::new(),
                &InvocationOutcome::success(),
            );
        }
        let tools: Vec<String> = tracker
            .get_context_history(None)
            .into_iter()
            .map(|e| e.tool)
            .collect();
        assert_eq!(tools, vec!["tool_2", "tool_3", "tool_4"]);
    }

    #[test]
    fn test_history_filter_preserves_order() {
        let tracker = tracker();
        for (tool, n) in [("a", 1), ("b", 2), ("a", 3)] {
            tracker.track_tool_usage(tool, &Context::new().with("n", n as i64), &InvocationOutcome::success());
        }
        let a: Vec<_> = tracker.get_context_history(Some("a"));
        assert_eq!(a.len(), 2);
        assert_eq!(a[0].context.get("n"), Some(&1i64.into()));
        assert_eq!(a[1].context.get("n"), Some(&3i64.into()));
    }

    #[test]
    fn test_empty_tool_id_is_ignored() {
        let tracker = tracker();
        tracker.track_tool_usage("  ", &Context::new(), &InvocationOutcome::success());
        assert!(tracker.get_context_history(None).is_empty());
    }

    #[test]
    fn test_find_similar_contexts() {
        let tracker = tracker();
        let research = Context::new().with("task", "research").with("lang", "en");
        let coding = Context::new().with("task", "coding").with("lang", "rust");
        tracker.track_tool_usage("search_web", &research, &InvocationOutcome::success());
        tracker.track_tool_usage("edit_file", &coding, &InvocationOutcome::success());

        let similar = tracker.find_similar_contexts(&research, 0.9);
        assert_eq!(similar.len(), 1);
        assert_eq!(similar[0].tool, "search_web");
        assert_eq!(tracker.get_context_similarity(&research, &research), 1.0);
    }

    #[test]
    fn test_invocation_lifecycle() {
        let tracker = tracker();
        let id = tracker.record_invocation("read_file", Context::new().with("path", "a.rs"), Context::new());
        assert!(tracker.record_execution(&id, 42));
        let OutcomeAttachment::Attached(record) = tracker.attach_outcome(
            &id,
            InvocationOutcome::success(),
            Some(InvocationFeedback::rated(0.9)),
        ) else {
            panic!("first outcome should attach");
        };
        assert_eq!(record.execution_time_ms, Some(42));
        assert_eq!(record.feedback.and_then(|f| f.rating), Some(0.9));

        assert!(!tracker.record_execution("missing", 1));
        assert_eq!(
            tracker.attach_outcome("missing", InvocationOutcome::success(), None),
            OutcomeAttachment::Unknown
        );
    }

    #[test]
    fn test_second_outcome_does_not_overwrite_the_first() {
        let tracker = tracker();
        let id = tracker.record_invocation("read_file", Context::new(), Context::new());
        tracker.attach_outcome(&id, InvocationOutcome::success(), None);

        let second = tracker.attach_outcome(
            &id,
            InvocationOutcome::failure("TIMEOUT", "late report"),
            Some(InvocationFeedback::rated(0.1)),
        );
        let OutcomeAttachment::AlreadyCompleted(record) = second else {
            panic!("expected AlreadyCompleted, got {:?}", second);
        };
        assert!(record.outcome.as_ref().is_some_and(|o| o.is_success()));
        assert!(record.feedback.is_none());
        assert_eq!(tracker.get_invocation(&id), Some(record));
    }

    #[test]
    fn test_concurrent_tracking_counts_every_call() {
        const THREADS: usize = 8;
        const CALLS: usize = 250;

        let tracker = Arc::new(tracker_with(
            TrackerParams::default().with_max_history_items(THREADS * CALLS),
        ));
        let barrier = Arc::new(Barrier::new(THREADS));
        let workers: Vec<_> = (0..THREADS)
            .map(|t| {
                let tracker = Arc::clone(&tracker);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let ctx = Context::new().with("worker", t as i64);
                    barrier.wait();
                    for i in 0..CALLS {
                        let outcome = if i % 2 == 0 {
                            InvocationOutcome::success()
                        } else {
                            InvocationOutcome::failure("TIMEOUT", "slow")
                        };
                        tracker.track_tool_usage("search_web", &ctx, &outcome.with_duration(10));
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let stats = tracker.get_tool_usage_stats("search_web").unwrap();
        assert_eq!(stats.usage_count(), (THREADS * CALLS) as u64);
        assert_eq!(stats.success_count(), (THREADS * CALLS / 2) as u64);
        assert_eq!(stats.avg_duration_ms(), 10.0);
        assert_eq!(tracker.get_context_history(None).len(), THREADS * CALLS);
    }

    #[test]
    fn test_concurrent_outcomes_attach_exactly_once() {
        let tracker = Arc::new(tracker());
        for _ in 0..200 {
            let id = tracker.record_invocation("read_file", Context::new(), Context::new());
            let barrier = Arc::new(Barrier::new(2));
            let workers: Vec<_> = (0..2)
                .map(|_| {
                    let tracker = Arc::clone(&tracker);
                    let barrier = Arc::clone(&barrier);
                    let id = id.clone();
                    thread::spawn(move || {
                        barrier.wait();
                        tracker.attach_outcome(&id, InvocationOutcome::success(), None)
                    })
                })
                .collect();
            let attached = workers
                .into_iter()
                .map(|w| w.join().unwrap())
                .filter(|r| matches!(r, OutcomeAttachment::Attached(_)))
                .count();
            assert_eq!(attached, 1);
        }
    }

    #[test]
    fn test_invocation_registry_is_bounded() {
        let tracker = tracker_with(TrackerParams::default().with_max_invocations(2));
        let first = tracker.record_invocation("a", Context::new(), Context::new());
        let second = tracker.record_invocation("b", Context::new(), Context::new());
        let third = tracker.record_invocation("c", Context::new(), Context::new());
        assert!(tracker.get_invocation(&first).is_none());
        assert!(tracker.get_invocation(&second).is_some());
        assert!(tracker.get_invocation(&third).is_some());
    }

    #[tokio::test]
    async fn test_persist_and_load_round_trip() {
        let snapshots = MemorySnapshotStore::new();
        let tracker = tracker();
        tracker.track_tool_usage("a", &Context::new().with("k", "v"), &InvocationOutcome::success());
        tracker.record_invocation("a", Context::new(), Context::new());
        assert!(tracker.persist_data(&snapshots).await);

        let restored = tracker_with(TrackerParams::default());
        assert!(restored.load_data(&snapshots).await);
        assert_eq!(restored.get_all_tool_usage_stats(), tracker.get_all_tool_usage_stats());
        assert_eq!(restored.get_context_history(None), tracker.get_context_history(None));
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_keeps_state() {
        let snapshots = MemorySnapshotStore::new();
        snapshots.insert(SnapshotComponent::Usage, serde_json::json!({"toolUsage": 7}));
        let tracker = tracker();
        tracker.track_tool_usage("a", &Context::new(), &InvocationOutcome::success());

        assert!(!tracker.load_data(&snapshots).await);
        assert_eq!(tracker.get_tool_usage_stats("a").unwrap().usage_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_snapshot_keeps_state() {
        let tracker = tracker();
        tracker.track_tool_usage("a", &Context::new(), &InvocationOutcome::success());
        assert!(tracker.load_data(&MemorySnapshotStore::new()).await);
        assert!(tracker.get_tool_usage_stats("a").is_some());
    }

    proptest! {
        #[test]
        fn prop_success_count_bounded(outcomes in proptest::collection::vec(any::<bool>(), 0..50)) {
            let tracker = tracker_with(TrackerParams::default().with_max_history_items(10));
            for success in &outcomes {
                let outcome = if *success {
                    InvocationOutcome::success()
                } else {
                    InvocationOutcome::new(OutcomeStatus::Failure)
                };
                tracker.track_tool_usage("t", &Context::new(), &outcome);
            }
            if let Some(stats) = tracker.get_tool_usage_stats("t") {
                prop_assert!(stats.success_count() <= stats.usage_count());
                prop_assert_eq!(stats.usage_count(), outcomes.len() as u64);
            }
            prop_assert!(tracker.get_context_history(None).len() <= 10);
        }
    }
}
