//! Recommendation entities and feedback

use crate::context::Context;
use crate::usage::InvocationOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which model produced a candidate tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationSource {
    /// Strong correlation between context attributes and the tool
    Correlation,
    /// Most frequent successor of the previously used tool
    Sequence,
}

impl RecommendationSource {
    pub fn as_str(&self) -> &str {
        match self {
            RecommendationSource::Correlation => "correlation",
            RecommendationSource::Sequence => "sequence",
        }
    }
}

impl std::fmt::Display for RecommendationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A ranked runner-up to the primary recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlternativeRecommendation {
    pub tool: String,
    pub confidence: f64,
    pub reasoning: String,
    pub source: RecommendationSource,
}

/// A confidence-scored tool recommendation with its rationale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub id: String,
    pub tool: String,
    /// In `[0, 1]`
    pub confidence: f64,
    pub reasoning: String,
    pub source: RecommendationSource,
    #[serde(default)]
    pub alternatives: Vec<AlternativeRecommendation>,
    pub created_at: DateTime<Utc>,
}

impl Recommendation {
    pub fn new(
        tool: impl Into<String>,
        confidence: f64,
        reasoning: impl Into<String>,
        source: RecommendationSource,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tool: tool.into(),
            confidence: confidence.clamp(0.0, 1.0),
            reasoning: reasoning.into(),
            source,
            alternatives: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_alternatives(mut self, alternatives: Vec<AlternativeRecommendation>) -> Self {
        self.alternatives = alternatives;
        self
    }
}

/// Caller feedback on a served recommendation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationFeedback {
    pub used: bool,
    pub helpful: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
}

impl RecommendationFeedback {
    pub fn new(used: bool, helpful: bool) -> Self {
        Self {
            used,
            helpful,
            comments: None,
        }
    }

    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = Some(comments.into());
        self
    }
}

/// One entry of the bounded feedback history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRecord {
    pub recommendation: Recommendation,
    pub context: Context,
    pub outcome: InvocationOutcome,
    pub feedback: RecommendationFeedback,
    pub timestamp: DateTime<Utc>,
}

impl FeedbackRecord {
    pub fn new(
        recommendation: Recommendation,
        context: Context,
        outcome: InvocationOutcome,
        feedback: RecommendationFeedback,
    ) -> Self {
        Self {
            recommendation,
            context,
            outcome,
            feedback,
            timestamp: Utc::now(),
        }
    }

    pub fn tool(&self) -> &str {
        &self.recommendation.tool
    }

    /// The recommendation was followed and the tool succeeded.
    pub fn succeeded(&self) -> bool {
        self.feedback.used && self.outcome.is_success()
    }
}

/// Per-tool aggregate over the feedback history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolRecommendationStats {
    pub recommendation_count: u64,
    pub used_count: u64,
    pub success_count: u64,
    /// Successes among used recommendations
    pub success_rate: f64,
    pub avg_confidence: f64,
}

/// How well served recommendations have performed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationPerformanceReport {
    pub total_recommendations: u64,
    pub used_count: u64,
    pub usage_rate: f64,
    /// Successes among used recommendations
    pub overall_accuracy: f64,
    pub tool_stats: BTreeMap<String, ToolRecommendationStats>,
    /// Pearson correlation between confidence and success over used
    /// recommendations; `0.0` when undefined
    pub confidence_correlation: f64,
}

impl RecommendationPerformanceReport {
    pub fn from_feedback<'a>(records: impl IntoIterator<Item = &'a FeedbackRecord>) -> Self {
        let mut report = Self::default();
        let mut confidence_sums: BTreeMap<String, f64> = BTreeMap::new();
        let mut used_pairs: Vec<(f64, f64)> = Vec::new();
        let mut successes = 0u64;

        for record in records {
            report.total_recommendations += 1;
            let stats = report.tool_stats.entry(record.tool().to_string()).or_default();
            stats.recommendation_count += 1;
            *confidence_sums.entry(record.tool().to_string()).or_insert(0.0) +=
                record.recommendation.confidence;

            if record.feedback.used {
                report.used_count += 1;
                stats.used_count += 1;
                let success = record.succeeded();
                if success {
                    successes += 1;
                    stats.success_count += 1;
                }
                used_pairs.push((
                    record.recommendation.confidence,
                    if success { 1.0 } else { 0.0 },
                ));
            }
        }

        for (tool, stats) in report.tool_stats.iter_mut() {
            stats.success_rate = ratio(stats.success_count, stats.used_count);
            stats.avg_confidence = confidence_sums.get(tool).copied().unwrap_or(0.0)
                / stats.recommendation_count.max(1) as f64;
        }

        report.usage_rate = ratio(report.used_count, report.total_recommendations);
        report.overall_accuracy = ratio(successes, report.used_count);
        report.confidence_correlation = pearson(&used_pairs).unwrap_or(0.0);
        report
    }
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let (cov, var_x, var_y) = pairs.iter().fold((0.0, 0.0, 0.0), |(c, vx, vy), (x, y)| {
        let dx = x - mean_x;
        let dy = y - mean_y;
        (c + dx * dy, vx + dx * dx, vy + dy * dy)
    });

    let denominator = (var_x * var_y).sqrt();
    if denominator == 0.0 || !denominator.is_finite() {
        return None;
    }
    Some((cov / denominator).clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usage::OutcomeStatus;

    fn record(tool: &str, confidence: f64, used: bool, success: bool) -> FeedbackRecord {
        let outcome = if success {
            InvocationOutcome::success()
        } else {
            InvocationOutcome::new(OutcomeStatus::Failure)
        };
        FeedbackRecord::new(
            Recommendation::new(tool, confidence, "test", RecommendationSource::Correlation),
            Context::new(),
            outcome,
            RecommendationFeedback::new(used, success),
        )
    }

    #[test]
    fn test_empty_report_is_all_zero() {
        let report = RecommendationPerformanceReport::from_feedback(std::iter::empty());
        assert_eq!(report, RecommendationPerformanceReport::default());
    }

    #[test]
    fn test_report_aggregates_per_tool() {
        let records = vec![
            record("a", 0.9, true, true),
            record("a", 0.8, true, false),
            record("a", 0.7, false, false),
            record("b", 0.6, true, true),
        ];
        let report = RecommendationPerformanceReport::from_feedback(&records);
        assert_eq!(report.total_recommendations, 4);
        assert_eq!(report.used_count, 3);
        assert!((report.usage_rate - 0.75).abs() < 1e-9);
        assert!((report.overall_accuracy - 2.0 / 3.0).abs() < 1e-9);

        let a = &report.tool_stats["a"];
        assert_eq!(a.recommendation_count, 3);
        assert_eq!(a.used_count, 2);
        assert_eq!(a.success_count, 1);
        assert!((a.success_rate - 0.5).abs() < 1e-9);
        assert!((a.avg_confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_confidence_correlation_sign() {
        let aligned = vec![
            record("a", 0.9, true, true),
            record("a", 0.8, true, true),
            record("a", 0.3, true, false),
            record("a", 0.2, true, false),
        ];
        let report = RecommendationPerformanceReport::from_feedback(&aligned);
        assert!(report.confidence_correlation > 0.9);

        let constant = vec![record("a", 0.5, true, true), record("a", 0.5, true, false)];
        let report = RecommendationPerformanceReport::from_feedback(&constant);
        assert_eq!(report.confidence_correlation, 0.0);
    }

    #[test]
    fn test_unused_success_does_not_count() {
        let rec = record("a", 0.9, false, true);
        assert!(!rec.succeeded());
    }

    #[test]
    fn test_confidence_is_clamped() {
        let rec = Recommendation::new("a", 1.4, "", RecommendationSource::Sequence);
        assert_eq!(rec.confidence, 1.0);
    }
}
