//! Output formatter trait

use toolwise_domain::{
    ContextHistoryEntry, CorrelationRecord, FailurePattern, OutcomeComparison, PatternSnapshot,
    Recommendation, RecommendationPerformanceReport, ReliabilityMetrics, ThresholdAdjustment,
    ToolUsageStats,
};

/// Trait for rendering pipeline results
pub trait OutputFormatter {
    /// Usage statistics, one entry per tool
    fn format_stats(&self, stats: &[ToolUsageStats]) -> String;

    /// Context history entries, oldest first
    fn format_history(&self, entries: &[ContextHistoryEntry]) -> String;

    fn format_failures(&self, tool: &str, patterns: &[FailurePattern]) -> String;

    fn format_reliability(&self, metrics: &ReliabilityMetrics) -> String;

    fn format_comparison(&self, comparison: &OutcomeComparison) -> String;

    /// A published pattern snapshot
    fn format_patterns(&self, snapshot: &PatternSnapshot) -> String;

    fn format_correlations(&self, records: &[CorrelationRecord]) -> String;

    /// `None` when no recommendation could be made
    fn format_recommendation(&self, recommendation: Option<&Recommendation>) -> String;

    /// Performance report plus any threshold adjustments just applied
    fn format_performance(
        &self,
        report: &RecommendationPerformanceReport,
        adjustments: &[ThresholdAdjustment],
    ) -> String;
}
