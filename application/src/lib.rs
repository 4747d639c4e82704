//! Application layer for toolwise
//!
//! This crate contains the shared analytics store, the four pipeline
//! services, port definitions and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod store;
pub mod use_cases;

// Re-export commonly used types
pub use config::{AnalyticsConfig, AnalyzerParams, EvaluatorParams, RecommenderParams, TrackerParams};
pub use ports::{
    confidence_provider::{ConfidenceProvider, ConfidenceRequest, PassThroughConfidence},
    hook_registry::{HookHandler, HookRegistry, LocalHookRegistry},
    insight_observer::{InsightObserver, NoInsightObserver},
    snapshot_store::{
        MemorySnapshotStore, NoSnapshotStore, SnapshotComponent, SnapshotStore, SnapshotStoreError,
    },
};
pub use store::AnalyticsStore;
pub use use_cases::analyze_patterns::{AnalysisPass, PatternAnalyzer};
pub use use_cases::evaluate_outcome::OutcomeEvaluator;
pub use use_cases::hooks::{
    TOOL_EXECUTION_HOOK, TOOL_OUTCOME_HOOK, TOOL_SELECTION_HOOK, ToolExecutionHook,
    ToolOutcomeHook, ToolSelectionHook,
};
pub use use_cases::persistence::PersistenceError;
pub use use_cases::pipeline::{PipelineBuilder, ToolInsightPipeline};
pub use use_cases::recommend_tool::RecommendationEngine;
pub use use_cases::track_usage::{OutcomeAttachment, UsageTracker};
