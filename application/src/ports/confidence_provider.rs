//! External confidence scoring port
//!
//! The recommendation engine can delegate confidence scoring to an external
//! module. When one is configured its score replaces the engine's blended
//! confidence and the adaptive threshold gate is skipped.

use toolwise_domain::{Context, RecommendationSource};

/// A candidate offered to an external confidence scorer.
#[derive(Debug, Clone)]
pub struct ConfidenceRequest<'a> {
    pub tool: &'a str,
    pub context: &'a Context,
    pub previous_tools: &'a [String],
    pub source: RecommendationSource,
    /// The engine's own confidence for the candidate
    pub base_confidence: f64,
}

/// Scores recommendation candidates.
pub trait ConfidenceProvider: Send + Sync {
    /// Confidence in `[0, 1]`, or `None` to reject the candidate.
    fn score(&self, request: &ConfidenceRequest<'_>) -> Option<f64>;
}

/// Provider that passes the engine's own confidence through.
pub struct PassThroughConfidence;

impl ConfidenceProvider for PassThroughConfidence {
    fn score(&self, request: &ConfidenceRequest<'_>) -> Option<f64> {
        Some(request.base_confidence)
    }
}
