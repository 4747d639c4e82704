//! Outcome evaluation use case.
//!
//! [`OutcomeEvaluator`] turns invocation records with a terminal outcome into
//! immutable [`OutcomeEvaluation`]s, classifies failures and accumulates
//! per-tool [`FailurePattern`]s.

use super::persistence::{Loaded, load_logged, persist_logged};
use crate::ports::snapshot_store::{SnapshotComponent, SnapshotStore};
use crate::store::{AnalyticsStore, EvaluationTables};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use toolwise_domain::evaluation::export_evaluations;
use toolwise_domain::{
    BoundedBuffer, Context, DomainError, ExportFormat, FailureExample, FailurePattern,
    OutcomeComparison, OutcomeEvaluation, ReliabilityMetrics, ToolInvocationRecord,
    ToolOutcomeSummary, context_similarity,
};
use tracing::{debug, info, warn};

/// Relevance reported when the tool has no successful history to compare with.
const DEFAULT_CONTEXT_RELEVANCE: f64 = 0.5;

/// Persisted outcome evaluator snapshot.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EvaluationDocument {
    evaluations: Vec<OutcomeEvaluation>,
    failure_patterns: BTreeMap<String, Vec<FailurePattern>>,
}

/// Evaluates invocation outcomes and tracks failure patterns.
pub struct OutcomeEvaluator {
    store: Arc<AnalyticsStore>,
}

impl OutcomeEvaluator {
    pub fn new(store: Arc<AnalyticsStore>) -> Self {
        Self { store }
    }

    /// Evaluate an invocation's terminal outcome.
    ///
    /// Returns `None` when the record is missing (logged as a warning) or has
    /// no outcome yet. Evaluating the same invocation twice returns the
    /// stored evaluation.
    pub fn evaluate_outcome(
        &self,
        invocation_id: &str,
        record: Option<&ToolInvocationRecord>,
    ) -> Option<OutcomeEvaluation> {
        let Some(record) = record else {
            warn!("Cannot evaluate invocation {}: record not found", invocation_id);
            return None;
        };
        if record.outcome.is_none() {
            debug!("Invocation {} has no outcome yet", invocation_id);
            return None;
        }
        if let Some(existing) = self.find_evaluation(invocation_id) {
            return Some(existing);
        }

        let relevance = self.context_relevance(record);
        let params = self.store.config().evaluator.scoring_params();
        let mut evaluation = OutcomeEvaluation::from_record(record, &params, relevance)?;
        evaluation.invocation_id = invocation_id.to_string();

        let mut tables = self.store.evaluations_mut();
        if let Some(existing) = tables
            .evaluations
            .iter()
            .find(|e| e.invocation_id == invocation_id)
        {
            return Some(existing.clone());
        }
        if !evaluation.success {
            let max_examples = self.store.config().evaluator.max_failure_examples;
            update_failure_patterns(&mut tables, &evaluation, record, max_examples);
        }
        tables.evaluations.push(evaluation.clone());

        debug!(
            "Evaluated {} ({}): success={}, efficiency={:.2}",
            invocation_id, evaluation.tool_id, evaluation.success, evaluation.efficiency
        );
        Some(evaluation)
    }

    fn find_evaluation(&self, invocation_id: &str) -> Option<OutcomeEvaluation> {
        self.store
            .evaluations()
            .evaluations
            .iter()
            .find(|e| e.invocation_id == invocation_id)
            .cloned()
    }

    /// Best similarity between the record's context and the tool's recent
    /// successful contexts.
    fn context_relevance(&self, record: &ToolInvocationRecord) -> f64 {
        let config = self.store.config();
        let window = config.evaluator.relevance_window;
        let contexts: Vec<Context> = {
            let usage = self.store.usage();
            usage
                .history
                .iter_recent()
                .filter(|entry| entry.tool == record.tool_id && entry.is_success())
                .take(window)
                .map(|entry| entry.context.clone())
                .collect()
        };
        if contexts.is_empty() {
            return DEFAULT_CONTEXT_RELEVANCE;
        }
        let weights = config.tracker.similarity_weights();
        contexts
            .iter()
            .map(|c| context_similarity(&record.context, c, weights))
            .fold(0.0, f64::max)
    }

    // ==================== Queries ====================

    /// Evaluations in creation order, optionally restricted to one tool.
    pub fn get_evaluations(&self, tool_id: Option<&str>) -> Vec<OutcomeEvaluation> {
        self.store
            .evaluations()
            .evaluations
            .iter()
            .filter(|e| tool_id.is_none_or(|tool| e.tool_id == tool))
            .cloned()
            .collect()
    }

    fn matching(&self, tool_id: &str, filter: Option<&Context>) -> Vec<OutcomeEvaluation> {
        self.store
            .evaluations()
            .evaluations
            .iter()
            .filter(|e| e.tool_id == tool_id)
            .filter(|e| filter.is_none_or(|f| e.context.matches(f)))
            .cloned()
            .collect()
    }

    /// Share of successful evaluations; `None` when nothing matches.
    pub fn calculate_success_rate(&self, tool_id: &str, filter: Option<&Context>) -> Option<f64> {
        ToolOutcomeSummary::from_evaluations(tool_id, &self.matching(tool_id, filter)).success_rate
    }

    /// Failure patterns for a tool, most frequent first.
    pub fn identify_failure_patterns(&self, tool_id: &str) -> Vec<FailurePattern> {
        let mut patterns = self
            .store
            .evaluations()
            .failure_patterns
            .get(tool_id)
            .cloned()
            .unwrap_or_default();
        patterns.sort_by(|a, b| {
            b.frequency
                .cmp(&a.frequency)
                .then_with(|| b.last_occurrence.cmp(&a.last_occurrence))
        });
        patterns
    }

    pub fn compare_outcomes(
        &self,
        tool_a: &str,
        tool_b: &str,
        filter: Option<&Context>,
    ) -> OutcomeComparison {
        let a = ToolOutcomeSummary::from_evaluations(tool_a, &self.matching(tool_a, filter));
        let b = ToolOutcomeSummary::from_evaluations(tool_b, &self.matching(tool_b, filter));
        OutcomeComparison::new(a, b)
    }

    /// Reliability metrics; the empty shape for tools never evaluated.
    pub fn get_tool_reliability_metrics(&self, tool_id: &str) -> ReliabilityMetrics {
        let evaluations = self.matching(tool_id, None);
        let patterns = self.identify_failure_patterns(tool_id);
        ReliabilityMetrics::from_evaluations(
            tool_id,
            &evaluations,
            patterns,
            self.store.config().evaluator.reliable_sample_size,
        )
    }

    /// Export all evaluations as `json` or `csv`.
    ///
    /// Any other format is an [`DomainError::UnsupportedFormat`] error.
    pub fn export_evaluation_data(&self, format: &str) -> Result<String, DomainError> {
        let format: ExportFormat = format.parse()?;
        let evaluations = self.get_evaluations(None);
        export_evaluations(&evaluations, format)
    }

    // ==================== Persistence ====================

    pub async fn persist_data(&self, store: &dyn SnapshotStore) -> bool {
        let document = {
            let tables = self.store.evaluations();
            EvaluationDocument {
                evaluations: tables.evaluations.to_vec(),
                failure_patterns: tables
                    .failure_patterns
                    .iter()
                    .map(|(tool, patterns)| (tool.clone(), patterns.clone()))
                    .collect(),
            }
        };
        persist_logged(store, SnapshotComponent::Evaluations, &document).await
    }

    pub async fn load_data(&self, store: &dyn SnapshotStore) -> bool {
        let document: EvaluationDocument =
            match load_logged(store, SnapshotComponent::Evaluations).await {
                Loaded::Document(document) => document,
                Loaded::Missing => return true,
                Loaded::Failed => return false,
            };

        let config = &self.store.config().evaluator;
        let mut evaluations = BoundedBuffer::new(config.max_evaluations);
        evaluations.extend(document.evaluations);
        let failure_patterns: HashMap<String, Vec<FailurePattern>> = document
            .failure_patterns
            .into_iter()
            .map(|(tool, mut patterns)| {
                for pattern in patterns.iter_mut() {
                    pattern.set_max_examples(config.max_failure_examples);
                }
                (tool, patterns)
            })
            .collect();

        let mut tables = self.store.evaluations_mut();
        info!(
            "Loaded evaluation snapshot: {} evaluations, {} tools with failures",
            evaluations.len(),
            failure_patterns.len()
        );
        tables.evaluations = evaluations;
        tables.failure_patterns = failure_patterns;
        true
    }
}

/// Count a failing evaluation against its `(tool, category)` pattern.
fn update_failure_patterns(
    tables: &mut EvaluationTables,
    evaluation: &OutcomeEvaluation,
    record: &ToolInvocationRecord,
    max_examples: usize,
) {
    let Some(category) = evaluation.error_category() else {
        return;
    };
    let outcome = record.outcome.as_ref();
    let example = FailureExample {
        invocation_id: evaluation.invocation_id.clone(),
        error_code: outcome.and_then(|o| o.error_code.clone()),
        error_message: outcome.and_then(|o| o.error_message.clone()),
        timestamp: evaluation.timestamp,
    };

    let patterns = tables
        .failure_patterns
        .entry(evaluation.tool_id.clone())
        .or_default();
    match patterns.iter_mut().find(|p| p.error_category == category) {
        Some(pattern) => pattern.record(example),
        None => patterns.push(FailurePattern::new(category, max_examples, example)),
    }
}
