//! Application-level configuration.
//!
//! - [`AnalyticsConfig`]: container of per-component parameters
//! - [`TrackerParams`], [`EvaluatorParams`], [`AnalyzerParams`], [`RecommenderParams`]

pub mod analytics_params;

pub use analytics_params::{
    AnalyticsConfig, AnalyzerParams, EvaluatorParams, RecommenderParams, TrackerParams,
};
