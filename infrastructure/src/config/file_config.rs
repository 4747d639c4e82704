//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! Every field is optional; unset fields fall back to the application's
//! built-in [`AnalyticsConfig`] defaults when the file is converted.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use toolwise_application::{
    AnalyticsConfig, AnalyzerParams, EvaluatorParams, RecommenderParams, TrackerParams,
};

/// Configuration validation errors
#[derive(Debug, Error, PartialEq)]
pub enum ConfigValidationError {
    #[error("{0} cannot be 0")]
    ZeroCapacity(&'static str),

    #[error("{0} cannot be 0 seconds")]
    ZeroDuration(&'static str),

    #[error("{name} must be between 0 and 1, got {value}")]
    OutOfUnitRange { name: &'static str, value: f64 },

    #[error("{low_name} ({low}) must not exceed {high_name} ({high})")]
    InvertedThresholds {
        low_name: &'static str,
        low: f64,
        high_name: &'static str,
        high: f64,
    },
}

/// Raw `[tracker]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileTrackerConfig {
    pub max_history_items: Option<usize>,
    pub max_failure_reasons: Option<usize>,
    pub max_contexts_per_tool: Option<usize>,
    pub max_invocations: Option<usize>,
    pub partial_string_weight: Option<f64>,
}

/// Raw `[evaluator]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileEvaluatorConfig {
    pub max_failure_examples: Option<usize>,
    pub max_evaluations: Option<usize>,
    pub efficiency_reference_ms: Option<f64>,
    pub default_efficiency: Option<f64>,
    pub failure_quality: Option<f64>,
    pub success_quality: Option<f64>,
    pub relevance_window: Option<usize>,
    pub reliable_sample_size: Option<usize>,
}

/// Raw `[analyzer]` section. Durations are in seconds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAnalyzerConfig {
    pub min_sample_size: Option<u64>,
    pub min_tool_usage: Option<u64>,
    pub high_success_threshold: Option<f64>,
    pub low_success_threshold: Option<f64>,
    pub strong_correlation_threshold: Option<f64>,
    pub min_correlation_occurrences: Option<u64>,
    pub max_common_sequences: Option<usize>,
    pub max_sequence_length: Option<usize>,
    pub min_sequence_support: Option<u64>,
    pub analysis_interval_seconds: Option<u64>,
    pub analysis_timeout_seconds: Option<u64>,
}

/// Raw `[recommender]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRecommenderConfig {
    pub max_feedback_history: Option<usize>,
    pub max_served_history: Option<usize>,
    pub max_alternatives: Option<usize>,
    pub default_confidence_threshold: Option<f64>,
    pub min_confidence_threshold: Option<f64>,
    pub max_confidence_threshold: Option<f64>,
    pub threshold_sensitivity: Option<f64>,
    pub min_feedback_for_adjustment: Option<usize>,
    pub live_success_weight: Option<f64>,
}

/// Raw `[storage]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStorageConfig {
    /// Directory holding the snapshot files (defaults to the XDG data dir)
    pub data_dir: Option<PathBuf>,
    /// Append published insights to this JSONL file
    pub insight_log: Option<PathBuf>,
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub tracker: FileTrackerConfig,
    pub evaluator: FileEvaluatorConfig,
    pub analyzer: FileAnalyzerConfig,
    pub recommender: FileRecommenderConfig,
    pub storage: FileStorageConfig,
}

fn apply<T: Copy>(target: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *target = v;
    }
}

impl FileConfig {
    /// Overlay the file's values on the built-in defaults.
    pub fn analytics_config(&self) -> AnalyticsConfig {
        let mut tracker = TrackerParams::default();
        let t = &self.tracker;
        apply(&mut tracker.max_history_items, t.max_history_items);
        apply(&mut tracker.max_failure_reasons, t.max_failure_reasons);
        apply(&mut tracker.max_contexts_per_tool, t.max_contexts_per_tool);
        apply(&mut tracker.max_invocations, t.max_invocations);
        apply(&mut tracker.partial_string_weight, t.partial_string_weight);

        let mut evaluator = EvaluatorParams::default();
        let e = &self.evaluator;
        apply(&mut evaluator.max_failure_examples, e.max_failure_examples);
        apply(&mut evaluator.max_evaluations, e.max_evaluations);
        apply(&mut evaluator.efficiency_reference_ms, e.efficiency_reference_ms);
        apply(&mut evaluator.default_efficiency, e.default_efficiency);
        apply(&mut evaluator.failure_quality, e.failure_quality);
        apply(&mut evaluator.success_quality, e.success_quality);
        apply(&mut evaluator.relevance_window, e.relevance_window);
        apply(&mut evaluator.reliable_sample_size, e.reliable_sample_size);

        let mut analyzer = AnalyzerParams::default();
        let a = &self.analyzer;
        apply(&mut analyzer.min_sample_size, a.min_sample_size);
        apply(&mut analyzer.min_tool_usage, a.min_tool_usage);
        apply(&mut analyzer.high_success_threshold, a.high_success_threshold);
        apply(&mut analyzer.low_success_threshold, a.low_success_threshold);
        apply(
            &mut analyzer.strong_correlation_threshold,
            a.strong_correlation_threshold,
        );
        apply(
            &mut analyzer.min_correlation_occurrences,
            a.min_correlation_occurrences,
        );
        apply(&mut analyzer.max_common_sequences, a.max_common_sequences);
        apply(&mut analyzer.max_sequence_length, a.max_sequence_length);
        apply(&mut analyzer.min_sequence_support, a.min_sequence_support);
        apply(
            &mut analyzer.analysis_interval,
            a.analysis_interval_seconds.map(Duration::from_secs),
        );
        apply(
            &mut analyzer.analysis_timeout,
            a.analysis_timeout_seconds.map(Duration::from_secs),
        );

        let mut recommender = RecommenderParams::default();
        let r = &self.recommender;
        apply(&mut recommender.max_feedback_history, r.max_feedback_history);
        apply(&mut recommender.max_served_history, r.max_served_history);
        apply(&mut recommender.max_alternatives, r.max_alternatives);
        apply(
            &mut recommender.default_confidence_threshold,
            r.default_confidence_threshold,
        );
        apply(
            &mut recommender.min_confidence_threshold,
            r.min_confidence_threshold,
        );
        apply(
            &mut recommender.max_confidence_threshold,
            r.max_confidence_threshold,
        );
        apply(&mut recommender.threshold_sensitivity, r.threshold_sensitivity);
        apply(
            &mut recommender.min_feedback_for_adjustment,
            r.min_feedback_for_adjustment,
        );
        apply(&mut recommender.live_success_weight, r.live_success_weight);

        AnalyticsConfig::default()
            .with_tracker(tracker)
            .with_evaluator(evaluator)
            .with_analyzer(analyzer)
            .with_recommender(recommender)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let config = self.analytics_config();
        let t = &config.tracker;
        let e = &config.evaluator;
        let a = &config.analyzer;
        let r = &config.recommender;

        for (name, value) in [
            ("tracker.max_history_items", t.max_history_items),
            ("tracker.max_failure_reasons", t.max_failure_reasons),
            ("tracker.max_contexts_per_tool", t.max_contexts_per_tool),
            ("tracker.max_invocations", t.max_invocations),
            ("evaluator.max_failure_examples", e.max_failure_examples),
            ("evaluator.max_evaluations", e.max_evaluations),
            ("evaluator.relevance_window", e.relevance_window),
            ("evaluator.reliable_sample_size", e.reliable_sample_size),
            ("analyzer.max_common_sequences", a.max_common_sequences),
            ("recommender.max_feedback_history", r.max_feedback_history),
            ("recommender.max_served_history", r.max_served_history),
        ] {
            if value == 0 {
                return Err(ConfigValidationError::ZeroCapacity(name));
            }
        }

        if a.analysis_interval.is_zero() {
            return Err(ConfigValidationError::ZeroDuration(
                "analyzer.analysis_interval_seconds",
            ));
        }
        if a.analysis_timeout.is_zero() {
            return Err(ConfigValidationError::ZeroDuration(
                "analyzer.analysis_timeout_seconds",
            ));
        }

        for (name, value) in [
            ("tracker.partial_string_weight", t.partial_string_weight),
            ("evaluator.default_efficiency", e.default_efficiency),
            ("evaluator.failure_quality", e.failure_quality),
            ("evaluator.success_quality", e.success_quality),
            ("analyzer.high_success_threshold", a.high_success_threshold),
            ("analyzer.low_success_threshold", a.low_success_threshold),
            (
                "analyzer.strong_correlation_threshold",
                a.strong_correlation_threshold,
            ),
            (
                "recommender.default_confidence_threshold",
                r.default_confidence_threshold,
            ),
            (
                "recommender.min_confidence_threshold",
                r.min_confidence_threshold,
            ),
            (
                "recommender.max_confidence_threshold",
                r.max_confidence_threshold,
            ),
            ("recommender.live_success_weight", r.live_success_weight),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigValidationError::OutOfUnitRange { name, value });
            }
        }

        for (low_name, low, high_name, high) in [
            (
                "analyzer.low_success_threshold",
                a.low_success_threshold,
                "analyzer.high_success_threshold",
                a.high_success_threshold,
            ),
            (
                "recommender.min_confidence_threshold",
                r.min_confidence_threshold,
                "recommender.default_confidence_threshold",
                r.default_confidence_threshold,
            ),
            (
                "recommender.default_confidence_threshold",
                r.default_confidence_threshold,
                "recommender.max_confidence_threshold",
                r.max_confidence_threshold,
            ),
        ] {
            if low > high {
                return Err(ConfigValidationError::InvertedThresholds {
                    low_name,
                    low,
                    high_name,
                    high,
                });
            }
        }

        Ok(())
    }
}
