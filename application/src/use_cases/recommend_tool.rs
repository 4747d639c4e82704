//! Tool recommendation use case.
//!
//! [`RecommendationEngine`] answers "which tool next?" from the analyzer's
//! latest snapshot plus live usage statistics, and closes the loop by
//! recording feedback and recalibrating per-tool confidence thresholds.
//!
//! Per query the engine moves through
//! `CorrelationLookup → SequenceLookup → LowPerformerFilter → ThresholdGate`
//! and ends in either a served [`Recommendation`] or `None`. Finding no
//! candidate is a valid outcome, not an error.

use super::persistence::{Loaded, load_logged, persist_logged};
use crate::ports::confidence_provider::{ConfidenceProvider, ConfidenceRequest};
use crate::ports::snapshot_store::{SnapshotComponent, SnapshotStore};
use crate::store::AnalyticsStore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use toolwise_domain::patterns::{describe_factor, predict_from_correlations};
use toolwise_domain::{
    AlternativeRecommendation, BoundedBuffer, ConfidenceThresholds, Context, FeedbackRecord,
    InvocationOutcome, PatternSnapshot, Recommendation, RecommendationFeedback,
    RecommendationPerformanceReport, RecommendationSource, ThresholdAdjustment,
};
use tracing::{debug, info};

/// Persisted recommendation engine snapshot.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecommendationDocument {
    recommendations: Vec<Recommendation>,
    feedback_history: Vec<FeedbackRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thresholds: Option<ConfidenceThresholds>,
}

/// A tool proposed by one of the two models, before scoring.
#[derive(Debug, Clone)]
struct Candidate {
    tool: String,
    base_confidence: f64,
    source: RecommendationSource,
    reasoning: String,
}

/// Produces confidence-scored tool recommendations and learns from feedback.
pub struct RecommendationEngine {
    store: Arc<AnalyticsStore>,
    confidence_provider: Option<Arc<dyn ConfidenceProvider>>,
}

impl RecommendationEngine {
    pub fn new(store: Arc<AnalyticsStore>) -> Self {
        Self {
            store,
            confidence_provider: None,
        }
    }

    /// Delegate confidence scoring to an external provider.
    ///
    /// With a provider configured its score is authoritative and the
    /// adaptive threshold gate is skipped.
    pub fn with_confidence_provider(mut self, provider: Arc<dyn ConfidenceProvider>) -> Self {
        self.confidence_provider = Some(provider);
        self
    }

    pub fn has_confidence_provider(&self) -> bool {
        self.confidence_provider.is_some()
    }

    // ==================== Recommendation ====================

    /// Recommend the next tool for `context`, given the tools used so far.
    pub fn recommend_tool_for_context(
        &self,
        context: &Context,
        previous_tools: &[String],
    ) -> Option<Recommendation> {
        let patterns = self.store.patterns();
        let correlation = correlation_candidates(context, &patterns);
        let sequence = sequence_candidates(previous_tools, &patterns);

        let Some(primary) = correlation.first().or_else(|| sequence.first()).cloned() else {
            debug!("No candidate tool for context");
            return None;
        };
        if patterns.usage.is_low_performer(&primary.tool) {
            info!(
                "Rejecting {} recommendation for {}: tool is a low performer",
                primary.source, primary.tool
            );
            return None;
        }

        let live_rates = self.live_success_rates();
        let Some(confidence) = self.score(&primary, context, previous_tools, &live_rates) else {
            debug!("Confidence provider rejected {}", primary.tool);
            return None;
        };

        if self.confidence_provider.is_none() {
            let threshold = self.store.recommendations().thresholds.get(&primary.tool);
            if confidence < threshold {
                debug!(
                    "Confidence {:.2} for {} below threshold {:.2}",
                    confidence, primary.tool, threshold
                );
                return None;
            }
        }

        let alternatives = self.alternatives(
            &primary.tool,
            correlation.iter().chain(sequence.iter()),
            &patterns,
            context,
            previous_tools,
            &live_rates,
        );

        let recommendation =
            Recommendation::new(&primary.tool, confidence, primary.reasoning, primary.source)
                .with_alternatives(alternatives);

        self.store
            .recommendations_mut()
            .served
            .push(recommendation.clone());
        debug!(
            "Recommended {} ({:.2}) via {}",
            recommendation.tool, recommendation.confidence, recommendation.source
        );
        Some(recommendation)
    }

    /// Current success rate per tool with at least one recorded use.
    fn live_success_rates(&self) -> HashMap<String, f64> {
        self.store
            .usage()
            .stats
            .iter()
            .filter_map(|(tool, stats)| Some((tool.clone(), stats.success_rate()?)))
            .collect()
    }

    /// Blend the model confidence with live success, or ask the provider.
    fn score(
        &self,
        candidate: &Candidate,
        context: &Context,
        previous_tools: &[String],
        live_rates: &HashMap<String, f64>,
    ) -> Option<f64> {
        let weight = self
            .store
            .config()
            .recommender
            .live_success_weight
            .clamp(0.0, 1.0);
        let blended = match live_rates.get(&candidate.tool) {
            Some(rate) => (1.0 - weight) * candidate.base_confidence + weight * rate,
            None => candidate.base_confidence,
        };

        match &self.confidence_provider {
            Some(provider) => provider
                .score(&ConfidenceRequest {
                    tool: &candidate.tool,
                    context,
                    previous_tools,
                    source: candidate.source,
                    base_confidence: blended,
                })
                .map(|c| c.clamp(0.0, 1.0)),
            None => Some(blended.clamp(0.0, 1.0)),
        }
    }

    fn alternatives<'a>(
        &self,
        primary: &str,
        candidates: impl Iterator<Item = &'a Candidate>,
        patterns: &PatternSnapshot,
        context: &Context,
        previous_tools: &[String],
        live_rates: &HashMap<String, f64>,
    ) -> Vec<AlternativeRecommendation> {
        let mut seen = vec![primary.to_string()];
        let mut alternatives: Vec<AlternativeRecommendation> = Vec::new();
        for candidate in candidates {
            if seen.contains(&candidate.tool) || patterns.usage.is_low_performer(&candidate.tool) {
                continue;
            }
            seen.push(candidate.tool.clone());
            if let Some(confidence) = self.score(candidate, context, previous_tools, live_rates) {
                alternatives.push(AlternativeRecommendation {
                    tool: candidate.tool.clone(),
                    confidence,
                    reasoning: candidate.reasoning.clone(),
                    source: candidate.source,
                });
            }
        }
        alternatives.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then_with(|| a.tool.cmp(&b.tool))
        });
        alternatives.truncate(self.store.config().recommender.max_alternatives);
        alternatives
    }

    /// Served recommendations, oldest first, optionally for one tool.
    pub fn get_served_recommendations(&self, tool: Option<&str>) -> Vec<Recommendation> {
        self.store
            .recommendations()
            .served
            .iter()
            .filter(|r| tool.is_none_or(|t| r.tool == t))
            .cloned()
            .collect()
    }

    /// Most recently served recommendation of `tool`.
    pub fn latest_served_for(&self, tool: &str) -> Option<Recommendation> {
        self.store
            .recommendations()
            .served
            .iter_recent()
            .find(|r| r.tool == tool)
            .cloned()
    }

    // ==================== Feedback ====================

    /// Append feedback to the bounded history, evicting the oldest entry.
    pub fn record_recommendation_feedback(
        &self,
        recommendation: Recommendation,
        context: Context,
        outcome: InvocationOutcome,
        feedback: RecommendationFeedback,
    ) {
        debug!(
            "Feedback for {}: used={}, helpful={}",
            recommendation.tool, feedback.used, feedback.helpful
        );
        let record = FeedbackRecord::new(recommendation, context, outcome, feedback);
        self.store.recommendations_mut().feedback.push(record);
    }

    /// Feedback history, oldest first, optionally for one tool.
    pub fn get_recommendation_history(&self, tool: Option<&str>) -> Vec<FeedbackRecord> {
        self.store
            .recommendations()
            .feedback
            .iter()
            .filter(|r| tool.is_none_or(|t| r.tool() == t))
            .cloned()
            .collect()
    }

    pub fn analyze_recommendation_performance(&self) -> RecommendationPerformanceReport {
        RecommendationPerformanceReport::from_feedback(self.store.recommendations().feedback.iter())
    }

    /// Recalibrate per-tool thresholds from feedback, returning the changes.
    ///
    /// Tools without enough used recommendations keep their threshold.
    pub fn adjust_confidence_thresholds(&self) -> Vec<ThresholdAdjustment> {
        let params = self.store.config().recommender.threshold_params();
        let mut tables = self.store.recommendations_mut();
        let tables = &mut *tables;
        let adjustments = tables.thresholds.recalibrate(tables.feedback.iter(), &params);
        for adjustment in &adjustments {
            info!(
                "Confidence threshold for {}: {:.2} -> {:.2} (success rate {:.2} over {})",
                adjustment.tool,
                adjustment.previous,
                adjustment.current,
                adjustment.success_rate,
                adjustment.sample_size
            );
        }
        adjustments
    }

    pub fn get_confidence_threshold(&self, tool: &str) -> f64 {
        self.store.recommendations().thresholds.get(tool)
    }

    pub fn get_confidence_thresholds(&self) -> ConfidenceThresholds {
        self.store.recommendations().thresholds.clone()
    }

    // ==================== Persistence ====================

    pub async fn persist_data(&self, store: &dyn SnapshotStore) -> bool {
        let document = {
            let tables = self.store.recommendations();
            RecommendationDocument {
                recommendations: tables.served.to_vec(),
                feedback_history: tables.feedback.to_vec(),
                thresholds: Some(tables.thresholds.clone()),
            }
        };
        persist_logged(store, SnapshotComponent::Recommendations, &document).await
    }

    pub async fn load_data(&self, store: &dyn SnapshotStore) -> bool {
        let document: RecommendationDocument =
            match load_logged(store, SnapshotComponent::Recommendations).await {
                Loaded::Document(document) => document,
                Loaded::Missing => return true,
                Loaded::Failed => return false,
            };

        let config = &self.store.config().recommender;
        let mut served = BoundedBuffer::new(config.max_served_history);
        served.extend(document.recommendations);
        let mut feedback = BoundedBuffer::new(config.max_feedback_history);
        feedback.extend(document.feedback_history);

        let mut tables = self.store.recommendations_mut();
        info!(
            "Loaded recommendation snapshot: {} served, {} feedback records",
            served.len(),
            feedback.len()
        );
        tables.served = served;
        tables.feedback = feedback;
        if let Some(thresholds) = document.thresholds {
            tables.thresholds = thresholds;
        }
        true
    }
}

// ==================== Candidate generation ====================

fn correlation_candidates(context: &Context, patterns: &PatternSnapshot) -> Vec<Candidate> {
    predict_from_correlations(context, &patterns.correlations)
        .into_iter()
        .map(|prediction| {
            let reasoning = match prediction.supporting.first() {
                Some(top) => format!(
                    "Context correlation: {} selected {} in {:.0}% of {} observations{}",
                    describe_factor(&top.context_factor, &top.context_value),
                    prediction.tool,
                    top.confidence * 100.0,
                    top.occurrences,
                    match prediction.supporting.len() {
                        1 => String::new(),
                        n => format!(" ({} matching factors)", n),
                    }
                ),
                None => format!("Context correlation with {}", prediction.tool),
            };
            Candidate {
                tool: prediction.tool,
                base_confidence: prediction.confidence,
                source: RecommendationSource::Correlation,
                reasoning,
            }
        })
        .collect()
}

fn sequence_candidates(previous_tools: &[String], patterns: &PatternSnapshot) -> Vec<Candidate> {
    let Some(last) = previous_tools.last() else {
        return Vec::new();
    };
    let Some(transitions) = patterns.sequences.transitions_from(last) else {
        return Vec::new();
    };

    let mut successors: Vec<(&String, u64)> = transitions
        .next_tools
        .iter()
        .map(|(tool, count)| (tool, *count))
        .collect();
    successors.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    successors
        .into_iter()
        .map(|(tool, count)| Candidate {
            tool: tool.clone(),
            base_confidence: transitions.share(tool),
            source: RecommendationSource::Sequence,
            reasoning: format!(
                "Sequence pattern: {} followed {} in {} of {} transitions",
                tool, last, count, transitions.total
            ),
        })
        .collect()
}
