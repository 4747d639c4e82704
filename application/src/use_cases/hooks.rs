//! Hook handlers feeding the pipeline from an external hook manager.
//!
//! | Hook | Payload | Reply |
//! |---|---|---|
//! | `tool_selection` | `{toolId, parameters?, context?}` | `{invocationId}` |
//! | `tool_execution` | `{invocationId, executionTime}` | `{recorded}` |
//! | `tool_outcome` | `{invocationId, outcome, feedback?}` | evaluation or `null` |
//!
//! Null or malformed payloads are ignored with a warning; handlers never
//! fail the hook manager.

use super::evaluate_outcome::OutcomeEvaluator;
use super::track_usage::{OutcomeAttachment, UsageTracker};
use crate::ports::hook_registry::HookHandler;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use toolwise_domain::{
    Context, InvocationFeedback, InvocationOutcome, OutcomeEvaluation,
};
use tracing::warn;

pub const TOOL_SELECTION_HOOK: &str = "tool_selection";
pub const TOOL_EXECUTION_HOOK: &str = "tool_execution";
pub const TOOL_OUTCOME_HOOK: &str = "tool_outcome";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SelectionPayload {
    tool_id: String,
    #[serde(default)]
    parameters: Option<Value>,
    #[serde(default)]
    context: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecutionPayload {
    invocation_id: String,
    execution_time: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OutcomePayload {
    invocation_id: String,
    outcome: InvocationOutcome,
    #[serde(default)]
    feedback: Option<InvocationFeedback>,
}

fn parse<T: DeserializeOwned>(hook: &str, payload: &Value) -> Option<T> {
    if !payload.is_object() {
        warn!("Ignoring {} hook: payload is not an object", hook);
        return None;
    }
    match serde_json::from_value(payload.clone()) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!("Ignoring malformed {} hook payload: {}", hook, e);
            None
        }
    }
}

/// Optional JSON object as a context; `None` for a non-object value.
fn optional_context(value: Option<&Value>) -> Option<Context> {
    match value {
        None | Some(Value::Null) => Some(Context::new()),
        Some(v) => Context::from_json(v),
    }
}

// ==================== Handlers ====================

/// Registers a new invocation when the agent selects a tool.
pub struct ToolSelectionHook {
    tracker: Arc<UsageTracker>,
}

impl ToolSelectionHook {
    pub fn new(tracker: Arc<UsageTracker>) -> Self {
        Self { tracker }
    }
}

impl HookHandler for ToolSelectionHook {
    fn handle(&self, payload: &Value) -> Option<Value> {
        let payload: SelectionPayload = parse(TOOL_SELECTION_HOOK, payload)?;
        if payload.tool_id.trim().is_empty() {
            warn!("Ignoring {} hook: empty toolId", TOOL_SELECTION_HOOK);
            return None;
        }
        let (Some(parameters), Some(context)) = (
            optional_context(payload.parameters.as_ref()),
            optional_context(payload.context.as_ref()),
        ) else {
            warn!(
                "Ignoring {} hook: parameters and context must be objects",
                TOOL_SELECTION_HOOK
            );
            return None;
        };
        let id = self
            .tracker
            .record_invocation(payload.tool_id, parameters, context);
        Some(json!({ "invocationId": id }))
    }
}

/// Attaches measured execution time to an invocation.
pub struct ToolExecutionHook {
    tracker: Arc<UsageTracker>,
}

impl ToolExecutionHook {
    pub fn new(tracker: Arc<UsageTracker>) -> Self {
        Self { tracker }
    }
}

impl HookHandler for ToolExecutionHook {
    fn handle(&self, payload: &Value) -> Option<Value> {
        let payload: ExecutionPayload = parse(TOOL_EXECUTION_HOOK, payload)?;
        if !payload.execution_time.is_finite() || payload.execution_time < 0.0 {
            warn!(
                "Ignoring {} hook: invalid executionTime {}",
                TOOL_EXECUTION_HOOK, payload.execution_time
            );
            return None;
        }
        let recorded = self
            .tracker
            .record_execution(&payload.invocation_id, payload.execution_time.round() as u64);
        Some(json!({ "recorded": recorded }))
    }
}

/// Attaches the outcome, evaluates it and folds it into usage statistics.
pub struct ToolOutcomeHook {
    tracker: Arc<UsageTracker>,
    evaluator: Arc<OutcomeEvaluator>,
}

impl ToolOutcomeHook {
    pub fn new(tracker: Arc<UsageTracker>, evaluator: Arc<OutcomeEvaluator>) -> Self {
        Self { tracker, evaluator }
    }
}

impl HookHandler for ToolOutcomeHook {
    fn handle(&self, payload: &Value) -> Option<Value> {
        let payload: OutcomePayload = parse(TOOL_OUTCOME_HOOK, payload)?;
        let evaluation = complete_invocation(
            &self.tracker,
            &self.evaluator,
            &payload.invocation_id,
            payload.outcome,
            payload.feedback,
        );
        Some(
            evaluation
                .and_then(|e| serde_json::to_value(e).ok())
                .unwrap_or(Value::Null),
        )
    }
}

/// Attach an outcome to a registered invocation, evaluate it, then track it.
///
/// Evaluation runs before tracking so context relevance is measured against
/// prior history only. Only the report that attaches the outcome is tracked;
/// later reports for the same invocation get the stored evaluation.
pub(crate) fn complete_invocation(
    tracker: &UsageTracker,
    evaluator: &OutcomeEvaluator,
    invocation_id: &str,
    outcome: InvocationOutcome,
    feedback: Option<InvocationFeedback>,
) -> Option<OutcomeEvaluation> {
    let record = match tracker.attach_outcome(invocation_id, outcome, feedback) {
        OutcomeAttachment::Attached(record) => record,
        OutcomeAttachment::AlreadyCompleted(existing) => {
            return evaluator.evaluate_outcome(invocation_id, Some(&existing));
        }
        OutcomeAttachment::Unknown => return None,
    };
    let evaluation = evaluator.evaluate_outcome(invocation_id, Some(&record));

    let mut tracked = record.outcome.clone().unwrap_or_default();
    tracked.duration_ms = record.effective_duration_ms();
    tracker.track_tool_usage(&record.tool_id, &record.context, &tracked);
    evaluation
}
