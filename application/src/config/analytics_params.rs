//! Analytics parameters: tuning knobs for the four pipeline components.
//!
//! Every constant the pipeline uses to decide "enough data", "strong enough"
//! or "too slow" lives here so deployments can tune it instead of the code
//! guessing a correct value.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use toolwise_domain::{MiningParams, ScoringParams, SimilarityWeights, ThresholdParams, UsageLimits};

/// Usage tracker capacities and similarity weighting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerParams {
    /// Capacity of the context-history ring buffer.
    pub max_history_items: usize,
    /// Failure reasons kept per tool.
    pub max_failure_reasons: usize,
    /// Recent contexts kept per tool.
    pub max_contexts_per_tool: usize,
    /// Invocation records kept for later outcome/feedback updates.
    pub max_invocations: usize,
    /// Credit given to partially overlapping strings in similarity.
    pub partial_string_weight: f64,
}

impl Default for TrackerParams {
    fn default() -> Self {
        Self {
            max_history_items: 1000,
            max_failure_reasons: 50,
            max_contexts_per_tool: 20,
            max_invocations: 1000,
            partial_string_weight: 0.5,
        }
    }
}

impl TrackerParams {
    pub fn with_max_history_items(mut self, max: usize) -> Self {
        self.max_history_items = max;
        self
    }

    pub fn with_max_invocations(mut self, max: usize) -> Self {
        self.max_invocations = max;
        self
    }

    pub fn usage_limits(&self) -> UsageLimits {
        UsageLimits {
            max_failure_reasons: self.max_failure_reasons,
            max_contexts: self.max_contexts_per_tool,
        }
    }

    pub fn similarity_weights(&self) -> SimilarityWeights {
        SimilarityWeights {
            partial_string_weight: self.partial_string_weight,
        }
    }
}

/// Outcome evaluator scoring constants and capacities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatorParams {
    /// Examples kept per failure pattern.
    pub max_failure_examples: usize,
    /// Evaluations kept in the log.
    pub max_evaluations: usize,
    /// Execution time (ms) that maps to an efficiency of 0.5.
    pub efficiency_reference_ms: f64,
    pub default_efficiency: f64,
    pub failure_quality: f64,
    pub success_quality: f64,
    /// Recent successful history entries compared for context relevance.
    pub relevance_window: usize,
    /// Sample size at which reliability confidence reaches 1.0.
    pub reliable_sample_size: usize,
}

impl Default for EvaluatorParams {
    fn default() -> Self {
        let scoring = ScoringParams::default();
        Self {
            max_failure_examples: 5,
            max_evaluations: 5000,
            efficiency_reference_ms: scoring.efficiency_reference_ms,
            default_efficiency: scoring.default_efficiency,
            failure_quality: scoring.failure_quality,
            success_quality: scoring.success_quality,
            relevance_window: 20,
            reliable_sample_size: 10,
        }
    }
}

impl EvaluatorParams {
    pub fn with_max_failure_examples(mut self, max: usize) -> Self {
        self.max_failure_examples = max;
        self
    }

    pub fn scoring_params(&self) -> ScoringParams {
        ScoringParams {
            efficiency_reference_ms: self.efficiency_reference_ms,
            default_efficiency: self.default_efficiency,
            failure_quality: self.failure_quality,
            success_quality: self.success_quality,
        }
    }
}

/// Pattern analyzer thresholds and batch scheduling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerParams {
    pub min_sample_size: u64,
    pub min_tool_usage: u64,
    pub high_success_threshold: f64,
    pub low_success_threshold: f64,
    pub strong_correlation_threshold: f64,
    pub min_correlation_occurrences: u64,
    pub max_common_sequences: usize,
    pub max_sequence_length: usize,
    pub min_sequence_support: u64,
    /// Period of the background analysis pass.
    pub analysis_interval: Duration,
    /// A pass exceeding this is abandoned and its result not published.
    pub analysis_timeout: Duration,
}

impl Default for AnalyzerParams {
    fn default() -> Self {
        let mining = MiningParams::default();
        Self {
            min_sample_size: mining.min_sample_size,
            min_tool_usage: mining.min_tool_usage,
            high_success_threshold: mining.high_success_threshold,
            low_success_threshold: mining.low_success_threshold,
            strong_correlation_threshold: mining.strong_correlation_threshold,
            min_correlation_occurrences: mining.min_correlation_occurrences,
            max_common_sequences: mining.max_common_sequences,
            max_sequence_length: mining.max_sequence_length,
            min_sequence_support: mining.min_sequence_support,
            analysis_interval: Duration::from_secs(300),
            analysis_timeout: Duration::from_secs(30),
        }
    }
}

impl AnalyzerParams {
    pub fn with_min_sample_size(mut self, min: u64) -> Self {
        self.min_sample_size = min;
        self
    }

    pub fn with_min_tool_usage(mut self, min: u64) -> Self {
        self.min_tool_usage = min;
        self
    }

    pub fn with_strong_correlation_threshold(mut self, threshold: f64) -> Self {
        self.strong_correlation_threshold = threshold;
        self
    }

    pub fn with_analysis_interval(mut self, interval: Duration) -> Self {
        self.analysis_interval = interval;
        self
    }

    pub fn with_analysis_timeout(mut self, timeout: Duration) -> Self {
        self.analysis_timeout = timeout;
        self
    }

    pub fn mining_params(&self) -> MiningParams {
        MiningParams {
            min_sample_size: self.min_sample_size,
            min_tool_usage: self.min_tool_usage,
            high_success_threshold: self.high_success_threshold,
            low_success_threshold: self.low_success_threshold,
            strong_correlation_threshold: self.strong_correlation_threshold,
            min_correlation_occurrences: self.min_correlation_occurrences,
            max_common_sequences: self.max_common_sequences,
            max_sequence_length: self.max_sequence_length,
            min_sequence_support: self.min_sequence_support,
        }
    }
}

/// Recommendation engine capacities and threshold adaptation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommenderParams {
    pub max_feedback_history: usize,
    pub max_served_history: usize,
    pub max_alternatives: usize,
    pub default_confidence_threshold: f64,
    pub min_confidence_threshold: f64,
    pub max_confidence_threshold: f64,
    pub threshold_sensitivity: f64,
    pub min_feedback_for_adjustment: usize,
    /// Weight of the live success rate blended into a candidate's confidence.
    pub live_success_weight: f64,
}

impl Default for RecommenderParams {
    fn default() -> Self {
        let thresholds = ThresholdParams::default();
        Self {
            max_feedback_history: 1000,
            max_served_history: 500,
            max_alternatives: 3,
            default_confidence_threshold: thresholds.default_threshold,
            min_confidence_threshold: thresholds.min_threshold,
            max_confidence_threshold: thresholds.max_threshold,
            threshold_sensitivity: thresholds.sensitivity,
            min_feedback_for_adjustment: thresholds.min_feedback,
            live_success_weight: 0.3,
        }
    }
}

impl RecommenderParams {
    pub fn with_max_feedback_history(mut self, max: usize) -> Self {
        self.max_feedback_history = max;
        self
    }

    pub fn with_max_alternatives(mut self, max: usize) -> Self {
        self.max_alternatives = max;
        self
    }

    pub fn with_default_confidence_threshold(mut self, threshold: f64) -> Self {
        self.default_confidence_threshold = threshold;
        self
    }

    pub fn with_live_success_weight(mut self, weight: f64) -> Self {
        self.live_success_weight = weight;
        self
    }

    pub fn threshold_params(&self) -> ThresholdParams {
        ThresholdParams {
            default_threshold: self.default_confidence_threshold,
            min_threshold: self.min_confidence_threshold,
            max_threshold: self.max_confidence_threshold,
            sensitivity: self.threshold_sensitivity,
            min_feedback: self.min_feedback_for_adjustment,
        }
    }
}

/// Container for all component parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    pub tracker: TrackerParams,
    pub evaluator: EvaluatorParams,
    pub analyzer: AnalyzerParams,
    pub recommender: RecommenderParams,
}

impl AnalyticsConfig {
    pub fn with_tracker(mut self, tracker: TrackerParams) -> Self {
        self.tracker = tracker;
        self
    }

    pub fn with_evaluator(mut self, evaluator: EvaluatorParams) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn with_analyzer(mut self, analyzer: AnalyzerParams) -> Self {
        self.analyzer = analyzer;
        self
    }

    pub fn with_recommender(mut self, recommender: RecommenderParams) -> Self {
        self.recommender = recommender;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let config = AnalyticsConfig::default();
        assert_eq!(config.tracker.max_history_items, 1000);
        assert_eq!(config.evaluator.max_failure_examples, 5);
        assert_eq!(config.analyzer.min_sample_size, 10);
        assert_eq!(config.recommender.max_alternatives, 3);
    }

    #[test]
    fn test_builder() {
        let config = AnalyticsConfig::default()
            .with_tracker(TrackerParams::default().with_max_history_items(5))
            .with_analyzer(AnalyzerParams::default().with_min_sample_size(2))
            .with_recommender(RecommenderParams::default().with_max_alternatives(1));

        assert_eq!(config.tracker.max_history_items, 5);
        assert_eq!(config.analyzer.mining_params().min_sample_size, 2);
        assert_eq!(config.recommender.max_alternatives, 1);
    }

    #[test]
    fn test_derived_params_mirror_fields() {
        let recommender = RecommenderParams::default().with_default_confidence_threshold(0.6);
        assert_eq!(recommender.threshold_params().default_threshold, 0.6);

        let evaluator = EvaluatorParams::default();
        assert_eq!(evaluator.scoring_params(), ScoringParams::default());
    }
}
