//! Outcome evaluation entities

use super::scoring::{self, ScoringParams, mean};
use super::taxonomy::{ErrorCategory, FailureAnalysis};
use crate::context::Context;
use crate::core::bounded::BoundedBuffer;
use crate::usage::ToolInvocationRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Immutable evaluation of one invocation's terminal outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeEvaluation {
    pub id: String,
    pub invocation_id: String,
    pub tool_id: String,
    pub tool_type: String,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub efficiency: f64,
    pub quality_score: f64,
    pub context_relevance: f64,
    #[serde(default)]
    pub context: Context,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_analysis: Option<FailureAnalysis>,
}

impl OutcomeEvaluation {
    /// Evaluate a record, or `None` if no outcome is attached yet.
    pub fn from_record(
        record: &ToolInvocationRecord,
        params: &ScoringParams,
        context_relevance: f64,
    ) -> Option<Self> {
        let outcome = record.outcome.as_ref()?;
        let success = outcome.is_success();

        let failure_analysis = (!success).then(|| {
            FailureAnalysis::analyze(outcome.error_code.as_deref(), outcome.error_message.as_deref())
        });

        Some(Self {
            id: uuid::Uuid::new_v4().to_string(),
            invocation_id: record.id.clone(),
            tool_id: record.tool_id.clone(),
            tool_type: scoring::infer_tool_type(&record.tool_id),
            timestamp: Utc::now(),
            success,
            efficiency: scoring::efficiency(record.effective_duration_ms(), params),
            quality_score: scoring::quality_score(success, record.feedback.as_ref(), params),
            context_relevance: context_relevance.clamp(0.0, 1.0),
            context: record.context.clone(),
            failure_analysis,
        })
    }

    pub fn error_category(&self) -> Option<ErrorCategory> {
        self.failure_analysis.as_ref().map(|f| f.error_category)
    }
}

/// A concrete failure kept as an example on a [`FailurePattern`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureExample {
    pub invocation_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Accumulated failures of one category for one tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailurePattern {
    pub error_category: ErrorCategory,
    pub frequency: u64,
    examples: BoundedBuffer<FailureExample>,
    pub first_occurrence: DateTime<Utc>,
    pub last_occurrence: DateTime<Utc>,
}

impl FailurePattern {
    pub fn new(error_category: ErrorCategory, max_examples: usize, example: FailureExample) -> Self {
        let at = example.timestamp;
        let mut examples = BoundedBuffer::new(max_examples);
        examples.push(example);
        Self {
            error_category,
            frequency: 1,
            examples,
            first_occurrence: at,
            last_occurrence: at,
        }
    }

    /// Count another occurrence, evicting the oldest example when full.
    pub fn record(&mut self, example: FailureExample) {
        self.frequency += 1;
        self.last_occurrence = example.timestamp.max(self.last_occurrence);
        self.examples.push(example);
    }

    /// Examples, most recent first.
    pub fn examples(&self) -> Vec<&FailureExample> {
        self.examples.iter_recent().collect()
    }

    pub fn set_max_examples(&mut self, max_examples: usize) {
        self.examples.set_capacity(max_examples);
    }
}

/// Success/efficiency summary of one tool's evaluations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolOutcomeSummary {
    pub tool_id: String,
    pub success_rate: Option<f64>,
    pub avg_efficiency: Option<f64>,
    pub sample_size: usize,
}

impl ToolOutcomeSummary {
    pub fn from_evaluations<'a>(
        tool_id: impl Into<String>,
        evaluations: impl IntoIterator<Item = &'a OutcomeEvaluation>,
    ) -> Self {
        let evaluations: Vec<&OutcomeEvaluation> = evaluations.into_iter().collect();
        Self {
            tool_id: tool_id.into(),
            success_rate: mean(evaluations.iter().map(|e| if e.success { 1.0 } else { 0.0 })),
            avg_efficiency: mean(evaluations.iter().map(|e| e.efficiency)),
            sample_size: evaluations.len(),
        }
    }
}

/// Side-by-side comparison of two tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeComparison {
    pub tool_a: ToolOutcomeSummary,
    pub tool_b: ToolOutcomeSummary,
    /// `tool_a.success_rate - tool_b.success_rate`
    pub success_rate_difference: Option<f64>,
    /// `tool_a.avg_efficiency - tool_b.avg_efficiency`
    pub efficiency_difference: Option<f64>,
    /// Tool with the higher success rate, efficiency breaking ties
    pub preferred_tool: Option<String>,
}

impl OutcomeComparison {
    pub fn new(tool_a: ToolOutcomeSummary, tool_b: ToolOutcomeSummary) -> Self {
        let success_rate_difference = diff(tool_a.success_rate, tool_b.success_rate);
        let efficiency_difference = diff(tool_a.avg_efficiency, tool_b.avg_efficiency);

        let preferred_tool = match (success_rate_difference, efficiency_difference) {
            (Some(d), _) if d > 0.0 => Some(tool_a.tool_id.clone()),
            (Some(d), _) if d < 0.0 => Some(tool_b.tool_id.clone()),
            (Some(_), Some(e)) if e > 0.0 => Some(tool_a.tool_id.clone()),
            (Some(_), Some(e)) if e < 0.0 => Some(tool_b.tool_id.clone()),
            _ => None,
        };

        Self {
            tool_a,
            tool_b,
            success_rate_difference,
            efficiency_difference,
            preferred_tool,
        }
    }
}

fn diff(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    Some(a? - b?)
}

/// Reliability metrics for one tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReliabilityMetrics {
    pub tool_id: String,
    pub sample_size: usize,
    pub success_rate: Option<f64>,
    pub avg_efficiency: Option<f64>,
    pub avg_quality: Option<f64>,
    pub reliability_score: Option<f64>,
    /// How much the sample size supports the score, in `[0, 1]`
    pub confidence: f64,
    pub failure_patterns: Vec<FailurePattern>,
}

impl ReliabilityMetrics {
    /// Shape reported for a tool with no evaluations.
    pub fn empty(tool_id: impl Into<String>) -> Self {
        Self {
            tool_id: tool_id.into(),
            sample_size: 0,
            success_rate: None,
            avg_efficiency: None,
            avg_quality: None,
            reliability_score: None,
            confidence: 0.0,
            failure_patterns: Vec::new(),
        }
    }

    pub fn from_evaluations<'a>(
        tool_id: impl Into<String>,
        evaluations: impl IntoIterator<Item = &'a OutcomeEvaluation>,
        failure_patterns: Vec<FailurePattern>,
        reliable_sample_size: usize,
    ) -> Self {
        let evaluations: Vec<&OutcomeEvaluation> = evaluations.into_iter().collect();
        let tool_id = tool_id.into();
        if evaluations.is_empty() {
            return Self {
                failure_patterns,
                ..Self::empty(tool_id)
            };
        }

        let success_rate = mean(evaluations.iter().map(|e| if e.success { 1.0 } else { 0.0 }));
        let avg_efficiency = mean(evaluations.iter().map(|e| e.efficiency));
        let avg_quality = mean(evaluations.iter().map(|e| e.quality_score));
        let reliability_score = match (success_rate, avg_efficiency, avg_quality) {
            (Some(s), Some(e), Some(q)) => Some(scoring::reliability_score(s, e, q)),
            _ => None,
        };
        let confidence = if reliable_sample_size == 0 {
            1.0
        } else {
            (evaluations.len() as f64 / reliable_sample_size as f64).min(1.0)
        };

        Self {
            tool_id,
            sample_size: evaluations.len(),
            success_rate,
            avg_efficiency,
            avg_quality,
            reliability_score,
            confidence,
            failure_patterns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::taxonomy::Severity;
    use crate::usage::{InvocationFeedback, InvocationOutcome};

    fn record(outcome: Option<InvocationOutcome>) -> ToolInvocationRecord {
        let mut record = ToolInvocationRecord::new(
            "tool-1",
            Context::new(),
            Context::new().with("task", "deploy"),
        )
        .with_id("inv-1");
        record.outcome = outcome;
        record
    }

    #[test]
    fn test_no_outcome_is_not_evaluable() {
        assert!(OutcomeEvaluation::from_record(&record(None), &ScoringParams::default(), 0.5).is_none());
    }

    #[test]
    fn test_successful_evaluation() {
        let rec = record(Some(InvocationOutcome::success())).with_execution_time(1000);
        let eval = OutcomeEvaluation::from_record(&rec, &ScoringParams::default(), 0.8).unwrap();
        assert!(eval.success);
        assert_eq!(eval.invocation_id, "inv-1");
        assert_eq!(eval.tool_type, "tool");
        assert_eq!(eval.efficiency, 0.5);
        assert_eq!(eval.quality_score, 0.7);
        assert_eq!(eval.context_relevance, 0.8);
        assert!(eval.failure_analysis.is_none());
    }

    #[test]
    fn test_failed_evaluation_has_analysis() {
        let rec = record(Some(InvocationOutcome::failure("PERMISSION_DENIED", "no access")));
        let eval = OutcomeEvaluation::from_record(&rec, &ScoringParams::default(), 0.5).unwrap();
        assert!(!eval.success);
        assert_eq!(eval.quality_score, 0.2);
        let analysis = eval.failure_analysis.unwrap();
        assert_eq!(analysis.error_category, ErrorCategory::Permission);
        assert_eq!(analysis.severity, Severity::High);
    }

    #[test]
    fn test_feedback_rating_overrides_quality() {
        let rec = record(Some(InvocationOutcome::success()))
            .with_feedback(InvocationFeedback::rated(0.9));
        let eval = OutcomeEvaluation::from_record(&rec, &ScoringParams::default(), 0.5).unwrap();
        assert_eq!(eval.quality_score, 0.9);
    }

    fn example(id: &str) -> FailureExample {
        FailureExample {
            invocation_id: id.to_string(),
            error_code: Some("TIMEOUT".to_string()),
            error_message: None,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_failure_pattern_examples_capped_most_recent_first() {
        let mut pattern = FailurePattern::new(ErrorCategory::Timeout, 2, example("a"));
        pattern.record(example("b"));
        pattern.record(example("c"));
        assert_eq!(pattern.frequency, 3);
        let ids: Vec<_> = pattern.examples().iter().map(|e| e.invocation_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b"]);
        assert!(pattern.last_occurrence >= pattern.first_occurrence);
    }

    #[test]
    fn test_comparison_prefers_higher_success_rate() {
        let a = ToolOutcomeSummary {
            tool_id: "a".into(),
            success_rate: Some(0.9),
            avg_efficiency: Some(0.4),
            sample_size: 10,
        };
        let b = ToolOutcomeSummary {
            tool_id: "b".into(),
            success_rate: Some(0.6),
            avg_efficiency: Some(0.8),
            sample_size: 5,
        };
        let cmp = OutcomeComparison::new(a, b);
        assert!((cmp.success_rate_difference.unwrap() - 0.3).abs() < 1e-9);
        assert!((cmp.efficiency_difference.unwrap() + 0.4).abs() < 1e-9);
        assert_eq!(cmp.preferred_tool.as_deref(), Some("a"));
    }

    #[test]
    fn test_comparison_with_missing_side() {
        let a = ToolOutcomeSummary::from_evaluations("a", std::iter::empty());
        let b = ToolOutcomeSummary::from_evaluations("b", std::iter::empty());
        let cmp = OutcomeComparison::new(a, b);
        assert_eq!(cmp.success_rate_difference, None);
        assert_eq!(cmp.preferred_tool, None);
    }

    #[test]
    fn test_empty_reliability_shape() {
        let metrics = ReliabilityMetrics::from_evaluations("ghost", std::iter::empty(), Vec::new(), 10);
        assert_eq!(metrics, ReliabilityMetrics::empty("ghost"));
    }
}
