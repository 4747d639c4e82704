//! JSON output for `--json`

use crate::output::formatter::OutputFormatter;
use serde::Serialize;
use serde_json::json;
use toolwise_domain::{
    ContextHistoryEntry, CorrelationRecord, FailurePattern, OutcomeComparison, PatternSnapshot,
    Recommendation, RecommendationPerformanceReport, ReliabilityMetrics, ThresholdAdjustment,
    ToolUsageStats,
};

/// Formats pipeline results as pretty-printed JSON
pub struct JsonFormatter;

impl JsonFormatter {
    fn pretty<T: Serialize + ?Sized>(value: &T) -> String {
        serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_stats(&self, stats: &[ToolUsageStats]) -> String {
        Self::pretty(stats)
    }

    fn format_history(&self, entries: &[ContextHistoryEntry]) -> String {
        Self::pretty(entries)
    }

    fn format_failures(&self, tool: &str, patterns: &[FailurePattern]) -> String {
        Self::pretty(&json!({ "toolId": tool, "failurePatterns": patterns }))
    }

    fn format_reliability(&self, metrics: &ReliabilityMetrics) -> String {
        Self::pretty(metrics)
    }

    fn format_comparison(&self, comparison: &OutcomeComparison) -> String {
        Self::pretty(comparison)
    }

    fn format_patterns(&self, snapshot: &PatternSnapshot) -> String {
        Self::pretty(snapshot)
    }

    fn format_correlations(&self, records: &[CorrelationRecord]) -> String {
        Self::pretty(records)
    }

    fn format_recommendation(&self, recommendation: Option<&Recommendation>) -> String {
        Self::pretty(&recommendation)
    }

    fn format_performance(
        &self,
        report: &RecommendationPerformanceReport,
        adjustments: &[ThresholdAdjustment],
    ) -> String {
        Self::pretty(&json!({ "report": report, "adjustments": adjustments }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_missing_recommendation_is_null() {
        assert_eq!(JsonFormatter.format_recommendation(None), "null");
    }

    #[test]
    fn test_performance_wraps_report_and_adjustments() {
        let output = JsonFormatter.format_performance(
            &RecommendationPerformanceReport::default(),
            &[ThresholdAdjustment {
                tool: "search_web".to_string(),
                previous: 0.5,
                current: 0.42,
                success_rate: 0.7,
                sample_size: 6,
            }],
        );
        let value: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["report"]["totalRecommendations"], 0);
        assert_eq!(value["adjustments"][0]["tool"], "search_web");
    }

    #[test]
    fn test_empty_stats_is_empty_array() {
        let value: Value = serde_json::from_str(&JsonFormatter.format_stats(&[])).unwrap();
        assert_eq!(value, json!([]));
    }
}
