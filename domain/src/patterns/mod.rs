//! Pattern subdomain: performance tiers, tool sequences and context correlations.

pub mod entities;
pub mod mining;

pub use entities::{
    CorrelationAnalysis, CorrelationPrediction, CorrelationRecord, PatternSnapshot,
    PerformanceTiers, SequenceAnalysis, SequencePattern, StrongCorrelation, ToolPerformance,
    ToolTransitions,
};
pub use mining::{
    MiningParams, classify_tool_performance, describe_factor, mine_correlations, mine_sequences,
    predict_from_correlations,
};
