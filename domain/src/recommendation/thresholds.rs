//! Adaptive per-tool confidence thresholds.
//!
//! A tool whose recommendations keep succeeding needs less confidence to be
//! surfaced; one whose recommendations keep failing needs more. Thresholds
//! are recomputed from the feedback window each time, so recalibrating
//! twice on the same feedback is a no-op.

use super::entities::FeedbackRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Bounds and sensitivity for threshold recalibration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdParams {
    pub default_threshold: f64,
    pub min_threshold: f64,
    pub max_threshold: f64,
    /// Threshold shift per unit of success rate away from 0.5
    pub sensitivity: f64,
    /// Used recommendations required before a tool's threshold moves
    pub min_feedback: usize,
}

impl Default for ThresholdParams {
    fn default() -> Self {
        Self {
            default_threshold: 0.5,
            min_threshold: 0.3,
            max_threshold: 0.9,
            sensitivity: 0.4,
            min_feedback: 5,
        }
    }
}

impl ThresholdParams {
    /// `default - (success_rate - 0.5) * sensitivity`, bounded to `[min, max]`.
    ///
    /// Never panics: with inverted bounds `max` wins, and a NaN bound is
    /// ignored.
    pub fn threshold_for(&self, success_rate: f64) -> f64 {
        (self.default_threshold - (success_rate - 0.5) * self.sensitivity)
            .max(self.min_threshold)
            .min(self.max_threshold)
    }
}

/// A threshold change applied during recalibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdAdjustment {
    pub tool: String,
    pub previous: f64,
    pub current: f64,
    pub success_rate: f64,
    pub sample_size: usize,
}

/// Per-tool minimum confidence, falling back to a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfidenceThresholds {
    default_threshold: f64,
    thresholds: BTreeMap<String, f64>,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self::new(ThresholdParams::default().default_threshold)
    }
}

impl ConfidenceThresholds {
    pub fn new(default_threshold: f64) -> Self {
        Self {
            default_threshold,
            thresholds: BTreeMap::new(),
        }
    }

    pub fn get(&self, tool: &str) -> f64 {
        self.thresholds
            .get(tool)
            .copied()
            .unwrap_or(self.default_threshold)
    }

    pub fn set(&mut self, tool: impl Into<String>, threshold: f64) {
        self.thresholds.insert(tool.into(), threshold);
    }

    pub fn default_threshold(&self) -> f64 {
        self.default_threshold
    }

    pub fn all(&self) -> &BTreeMap<String, f64> {
        &self.thresholds
    }

    /// Recompute thresholds from feedback, returning the changes made.
    ///
    /// Tools with fewer than `min_feedback` used recommendations keep their
    /// current threshold.
    pub fn recalibrate<'a>(
        &mut self,
        feedback: impl IntoIterator<Item = &'a FeedbackRecord>,
        params: &ThresholdParams,
    ) -> Vec<ThresholdAdjustment> {
        let mut samples: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
        for record in feedback.into_iter().filter(|r| r.feedback.used) {
            let entry = samples.entry(record.tool()).or_insert((0, 0));
            entry.0 += 1;
            if record.succeeded() {
                entry.1 += 1;
            }
        }

        let mut adjustments = Vec::new();
        for (tool, (used, succeeded)) in samples {
            if used < params.min_feedback.max(1) {
                continue;
            }
            let success_rate = succeeded as f64 / used as f64;
            let previous = self.get(tool);
            let current = params.threshold_for(success_rate);
            if (current - previous).abs() > f64::EPSILON {
                self.set(tool, current);
                adjustments.push(ThresholdAdjustment {
                    tool: tool.to_string(),
                    previous,
                    current,
                    success_rate,
                    sample_size: used,
                });
            }
        }
        adjustments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::recommendation::entities::{
        Recommendation, RecommendationFeedback, RecommendationSource,
    };
    use crate::usage::{InvocationOutcome, OutcomeStatus};

    fn feedback(tool: &str, success: bool) -> FeedbackRecord {
        FeedbackRecord::new(
            Recommendation::new(tool, 0.8, "", RecommendationSource::Correlation),
            Context::new(),
            if success {
                InvocationOutcome::success()
            } else {
                InvocationOutcome::new(OutcomeStatus::Error)
            },
            RecommendationFeedback::new(true, success),
        )
    }

    #[test]
    fn test_threshold_moves_opposite_to_success() {
        let params = ThresholdParams::default();
        assert!(params.threshold_for(1.0) < params.default_threshold);
        assert!(params.threshold_for(0.0) > params.default_threshold);
        assert_eq!(params.threshold_for(0.5), params.default_threshold);
    }

    #[test]
    fn test_misconfigured_bounds_do_not_panic() {
        let inverted = ThresholdParams {
            min_threshold: 0.9,
            max_threshold: 0.3,
            ..Default::default()
        };
        assert_eq!(inverted.threshold_for(0.5), 0.3);

        let nan_bounds = ThresholdParams {
            min_threshold: f64::NAN,
            max_threshold: f64::NAN,
            ..Default::default()
        };
        assert_eq!(nan_bounds.threshold_for(0.5), 0.5);
    }

    #[test]
    fn test_threshold_is_clamped() {
        let params = ThresholdParams {
            sensitivity: 10.0,
            ..Default::default()
        };
        assert_eq!(params.threshold_for(1.0), params.min_threshold);
        assert_eq!(params.threshold_for(0.0), params.max_threshold);
    }

    #[test]
    fn test_insufficient_feedback_leaves_thresholds_untouched() {
        let mut thresholds = ConfidenceThresholds::default();
        let records: Vec<_> = (0..4).map(|_| feedback("a", true)).collect();
        let adjustments = thresholds.recalibrate(&records, &ThresholdParams::default());
        assert!(adjustments.is_empty());
        assert_eq!(thresholds.get("a"), 0.5);
    }

    #[test]
    fn test_recalibration_is_idempotent() {
        let mut thresholds = ConfidenceThresholds::default();
        let mut records: Vec<_> = (0..5).map(|_| feedback("good", true)).collect();
        records.extend((0..5).map(|_| feedback("bad", false)));

        let params = ThresholdParams::default();
        let first = thresholds.recalibrate(&records, &params);
        assert_eq!(first.len(), 2);
        assert!(thresholds.get("good") < 0.5);
        assert!(thresholds.get("bad") > 0.5);

        let second = thresholds.recalibrate(&records, &params);
        assert!(second.is_empty());
    }

    #[test]
    fn test_unused_feedback_is_ignored() {
        let mut thresholds = ConfidenceThresholds::default();
        let mut records: Vec<_> = (0..10).map(|_| feedback("a", true)).collect();
        for r in records.iter_mut() {
            r.feedback.used = false;
        }
        assert!(thresholds.recalibrate(&records, &ThresholdParams::default()).is_empty());
    }
}
