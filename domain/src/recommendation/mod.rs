//! Recommendation subdomain: served recommendations, feedback and adaptive thresholds.

pub mod entities;
pub mod thresholds;

pub use entities::{
    AlternativeRecommendation, FeedbackRecord, Recommendation, RecommendationFeedback,
    RecommendationPerformanceReport, RecommendationSource, ToolRecommendationStats,
};
pub use thresholds::{ConfidenceThresholds, ThresholdAdjustment, ThresholdParams};
