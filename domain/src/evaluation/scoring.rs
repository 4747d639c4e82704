//! Evaluation sub-scores.

use crate::usage::InvocationFeedback;

/// Weights for the derived reliability score.
const RELIABILITY_SUCCESS_WEIGHT: f64 = 0.6;
const RELIABILITY_EFFICIENCY_WEIGHT: f64 = 0.2;
const RELIABILITY_QUALITY_WEIGHT: f64 = 0.2;

/// Scoring constants for an evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringParams {
    /// Execution time that maps to an efficiency of exactly 0.5.
    pub efficiency_reference_ms: f64,
    /// Efficiency reported when no execution time is known.
    pub default_efficiency: f64,
    /// Quality assigned to a failed outcome without feedback.
    pub failure_quality: f64,
    /// Quality assigned to a successful outcome without feedback.
    pub success_quality: f64,
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self {
            efficiency_reference_ms: 1000.0,
            default_efficiency: 0.5,
            failure_quality: 0.2,
            success_quality: 0.7,
        }
    }
}

/// Efficiency in `(0, 1]`: `reference / (reference + t)`.
///
/// Faster executions score higher; an unknown time yields the default.
pub fn efficiency(execution_time_ms: Option<u64>, params: &ScoringParams) -> f64 {
    match execution_time_ms {
        Some(t) if params.efficiency_reference_ms > 0.0 => {
            params.efficiency_reference_ms / (params.efficiency_reference_ms + t as f64)
        }
        _ => params.default_efficiency,
    }
}

/// Quality score: an explicit rating wins, otherwise a conservative default.
pub fn quality_score(
    success: bool,
    feedback: Option<&InvocationFeedback>,
    params: &ScoringParams,
) -> f64 {
    if let Some(rating) = feedback.and_then(|f| f.rating) {
        return rating.clamp(0.0, 1.0);
    }
    if success {
        params.success_quality
    } else {
        params.failure_quality
    }
}

/// Weighted reliability score in `[0, 1]`.
pub fn reliability_score(success_rate: f64, avg_efficiency: f64, avg_quality: f64) -> f64 {
    (success_rate * RELIABILITY_SUCCESS_WEIGHT
        + avg_efficiency * RELIABILITY_EFFICIENCY_WEIGHT
        + avg_quality * RELIABILITY_QUALITY_WEIGHT)
        .clamp(0.0, 1.0)
}

/// Tool family inferred from the leading segment of the tool id.
///
/// `search_web` → `search`, `browser.navigate` → `browser`.
pub fn infer_tool_type(tool_id: &str) -> String {
    tool_id
        .split(['_', '.', ':', '-'])
        .find(|segment| !segment.is_empty())
        .map(str::to_lowercase)
        .unwrap_or_else(|| "unknown".to_string())
}

pub fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}
