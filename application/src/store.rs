//! Shared analytics state.
//!
//! [`AnalyticsStore`] owns every mutable aggregate of the pipeline and is
//! handed to each service behind an `Arc`. State is split into four tables,
//! each behind its own lock:
//!
//! | Table | Written by | Read by |
//! |---|---|---|
//! | usage | `UsageTracker` | evaluator, analyzer, recommender |
//! | evaluations | `OutcomeEvaluator` | reporting |
//! | patterns | `PatternAnalyzer` (RCU swap) | recommender |
//! | recommendations | `RecommendationEngine` | reporting |
//!
//! Lock discipline: a caller never holds two table locks at once. Anything
//! needed from a second table is copied out first and the first guard dropped.
//! The patterns table holds an `Arc<PatternSnapshot>`; readers clone the
//! `Arc` and release the lock immediately, the analyzer replaces it whole.

use crate::config::AnalyticsConfig;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use toolwise_domain::{
    BoundedBuffer, ConfidenceThresholds, ContextHistoryEntry, FailurePattern, FeedbackRecord,
    OutcomeEvaluation, PatternSnapshot, Recommendation, ToolInvocationRecord, ToolUsageStats,
};

// ==================== Tables ====================

/// Usage tracker state.
#[derive(Debug)]
pub(crate) struct UsageTables {
    pub stats: HashMap<String, ToolUsageStats>,
    pub history: BoundedBuffer<ContextHistoryEntry>,
    pub invocations: HashMap<String, ToolInvocationRecord>,
    /// Invocation ids in arrival order, bounding `invocations`
    pub invocation_order: BoundedBuffer<String>,
}

impl UsageTables {
    fn new(config: &AnalyticsConfig) -> Self {
        Self {
            stats: HashMap::new(),
            history: BoundedBuffer::new(config.tracker.max_history_items),
            invocations: HashMap::new(),
            invocation_order: BoundedBuffer::new(config.tracker.max_invocations),
        }
    }
}

/// Outcome evaluator state.
#[derive(Debug)]
pub(crate) struct EvaluationTables {
    pub evaluations: BoundedBuffer<OutcomeEvaluation>,
    /// Failure patterns per tool, one entry per error category
    pub failure_patterns: HashMap<String, Vec<FailurePattern>>,
}

impl EvaluationTables {
    fn new(config: &AnalyticsConfig) -> Self {
        Self {
            evaluations: BoundedBuffer::new(config.evaluator.max_evaluations),
            failure_patterns: HashMap::new(),
        }
    }
}

/// Recommendation engine state.
#[derive(Debug)]
pub(crate) struct RecommendationTables {
    /// Every recommendation served, oldest first
    pub served: BoundedBuffer<Recommendation>,
    pub feedback: BoundedBuffer<FeedbackRecord>,
    pub thresholds: ConfidenceThresholds,
}

impl RecommendationTables {
    fn new(config: &AnalyticsConfig) -> Self {
        Self {
            served: BoundedBuffer::new(config.recommender.max_served_history),
            feedback: BoundedBuffer::new(config.recommender.max_feedback_history),
            thresholds: ConfidenceThresholds::new(config.recommender.default_confidence_threshold),
        }
    }
}

// ==================== Store ====================

/// Explicitly owned pipeline state, shared by all four services.
#[derive(Debug)]
pub struct AnalyticsStore {
    config: AnalyticsConfig,
    usage: RwLock<UsageTables>,
    evaluations: RwLock<EvaluationTables>,
    patterns: RwLock<Arc<PatternSnapshot>>,
    recommendations: RwLock<RecommendationTables>,
}

impl AnalyticsStore {
    pub fn new(config: AnalyticsConfig) -> Self {
        Self {
            usage: RwLock::new(UsageTables::new(&config)),
            evaluations: RwLock::new(EvaluationTables::new(&config)),
            patterns: RwLock::new(Arc::new(PatternSnapshot::default())),
            recommendations: RwLock::new(RecommendationTables::new(&config)),
            config,
        }
    }

    pub fn shared(config: AnalyticsConfig) -> Arc<Self> {
        Arc::new(Self::new(config))
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    pub(crate) fn usage(&self) -> RwLockReadGuard<'_, UsageTables> {
        self.usage.read().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn usage_mut(&self) -> RwLockWriteGuard<'_, UsageTables> {
        self.usage.write().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn evaluations(&self) -> RwLockReadGuard<'_, EvaluationTables> {
        self.evaluations.read().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn evaluations_mut(&self) -> RwLockWriteGuard<'_, EvaluationTables> {
        self.evaluations.write().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn recommendations(&self) -> RwLockReadGuard<'_, RecommendationTables> {
        self.recommendations.read().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn recommendations_mut(&self) -> RwLockWriteGuard<'_, RecommendationTables> {
        self.recommendations
            .write()
            .unwrap_or_else(|e| e.into_inner())
    }

    /// Latest published pattern snapshot.
    pub fn patterns(&self) -> Arc<PatternSnapshot> {
        Arc::clone(&self.patterns.read().unwrap_or_else(|e| e.into_inner()))
    }

    /// Replace the published snapshot, returning the previous one.
    pub(crate) fn publish_patterns(&self, snapshot: Arc<PatternSnapshot>) -> Arc<PatternSnapshot> {
        let mut guard = self.patterns.write().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *guard, snapshot)
    }

    /// Copy the published snapshot, modify the copy and swap it in, all under
    /// one write lock.
    pub(crate) fn update_patterns(
        &self,
        apply: impl FnOnce(&mut PatternSnapshot),
    ) -> Arc<PatternSnapshot> {
        let mut guard = self.patterns.write().unwrap_or_else(|e| e.into_inner());
        let mut next = PatternSnapshot::clone(&guard);
        apply(&mut next);
        *guard = Arc::new(next);
        Arc::clone(&guard)
    }

    /// Consistent copy of stats and history for an analysis pass.
    pub(crate) fn usage_snapshot(&self) -> (Vec<ToolUsageStats>, Vec<ContextHistoryEntry>) {
        let usage = self.usage();
        let mut stats: Vec<ToolUsageStats> = usage.stats.values().cloned().collect();
        stats.sort_by(|a, b| a.tool_id().cmp(b.tool_id()));
        (stats, usage.history.to_vec())
    }
}

impl Default for AnalyticsStore {
    fn default() -> Self {
        Self::new(AnalyticsConfig::default())
    }
}
