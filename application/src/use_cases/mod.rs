//! Use cases (application services)
//!
//! - [`track_usage`]: `UsageTracker`
//! - [`evaluate_outcome`]: `OutcomeEvaluator`
//! - [`analyze_patterns`]: `PatternAnalyzer`
//! - [`recommend_tool`]: `RecommendationEngine`
//! - [`hooks`]: hook handlers for an external hook manager
//! - [`pipeline`]: `ToolInsightPipeline` facade wiring all of the above

pub mod analyze_patterns;
pub mod evaluate_outcome;
pub mod hooks;
pub mod persistence;
pub mod pipeline;
pub mod recommend_tool;
pub mod track_usage;
