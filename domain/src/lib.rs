//! Domain layer for toolwise
//!
//! This crate contains the core types and pure algorithms of the tool
//! intelligence pipeline. It has no dependencies on infrastructure,
//! locking or logging concerns.
//!
//! # Core Concepts
//!
//! ## Usage
//!
//! Every tool invocation is recorded as a [`ToolInvocationRecord`] and folded
//! into per-tool [`ToolUsageStats`]; a bounded [`ContextHistoryEntry`] log
//! keeps the raw stream for mining.
//!
//! ## Evaluation
//!
//! Terminal outcomes become [`OutcomeEvaluation`]s. Failures are classified
//! into a fixed [`ErrorCategory`] taxonomy and accumulated as
//! [`FailurePattern`]s.
//!
//! ## Patterns
//!
//! Mining passes derive [`PerformanceTiers`], tool transition tables and
//! context correlations. They are pure and idempotent.
//!
//! ## Recommendation
//!
//! A [`Recommendation`] names a tool with a confidence and a rationale;
//! [`FeedbackRecord`]s drive [`ConfidenceThresholds`] recalibration.

pub mod context;
pub mod core;
pub mod evaluation;
pub mod patterns;
pub mod recommendation;
pub mod usage;

// Re-export commonly used types
pub use context::{Context, ContextValue, SimilarityWeights, context_similarity};
pub use core::{bounded::BoundedBuffer, error::DomainError};
pub use evaluation::{
    ErrorCategory, ExportFormat, FailureAnalysis, FailureExample, FailurePattern,
    OutcomeComparison, OutcomeEvaluation, ReliabilityMetrics, ScoringParams, Severity,
    ToolOutcomeSummary,
};
pub use patterns::{
    CorrelationAnalysis, CorrelationPrediction, CorrelationRecord, MiningParams, PatternSnapshot,
    PerformanceTiers, SequenceAnalysis, SequencePattern, StrongCorrelation, ToolPerformance,
    ToolTransitions,
};
pub use recommendation::{
    AlternativeRecommendation, ConfidenceThresholds, FeedbackRecord, Recommendation,
    RecommendationFeedback, RecommendationPerformanceReport, RecommendationSource,
    ThresholdAdjustment, ThresholdParams, ToolRecommendationStats,
};
pub use usage::{
    ContextHistoryEntry, InvocationFeedback, InvocationOutcome, OutcomeStatus,
    ToolInvocationRecord, ToolUsageStats, UsageLimits,
};
