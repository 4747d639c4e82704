//! JSONL invocation ingestion.
//!
//! Each line is one completed invocation:
//!
//! ```json
//! {"toolId": "search_web", "context": {"task": "research"}, "executionTime": 240,
//!  "outcome": {"status": "success"}, "feedback": {"rating": 0.9}}
//! ```
//!
//! Lines are replayed through the registered selection, execution and outcome
//! hooks in file order, exactly as a live hook manager would deliver them.

use serde_json::{Map, Value, json};
use std::io::BufRead;
use toolwise_application::{
    LocalHookRegistry, TOOL_EXECUTION_HOOK, TOOL_OUTCOME_HOOK, TOOL_SELECTION_HOOK,
    ToolInsightPipeline,
};
use tracing::{debug, warn};

/// Counts from one ingestion run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub lines: usize,
    pub evaluated: usize,
    pub skipped: usize,
}

/// Replay every event in `reader` through the pipeline's hooks.
pub fn ingest(pipeline: &ToolInsightPipeline, reader: impl BufRead) -> std::io::Result<IngestSummary> {
    let registry = LocalHookRegistry::new();
    pipeline.register_hooks(&registry);

    let mut summary = IngestSummary::default();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        summary.lines += 1;

        let line_no = index + 1;
        let event = match serde_json::from_str::<Value>(&line) {
            Ok(Value::Object(event)) => event,
            Ok(_) => {
                warn!("Line {}: event is not a JSON object", line_no);
                summary.skipped += 1;
                continue;
            }
            Err(e) => {
                warn!("Line {}: invalid JSON: {}", line_no, e);
                summary.skipped += 1;
                continue;
            }
        };

        if replay(&registry, &event) {
            summary.evaluated += 1;
        } else {
            debug!("Line {} was not evaluated", line_no);
            summary.skipped += 1;
        }
    }
    Ok(summary)
}

fn field(event: &Map<String, Value>, key: &str) -> Value {
    event.get(key).cloned().unwrap_or(Value::Null)
}

fn replay(registry: &LocalHookRegistry, event: &Map<String, Value>) -> bool {
    let selection = json!({
        "toolId": field(event, "toolId"),
        "parameters": field(event, "parameters"),
        "context": field(event, "context"),
    });
    let Some(invocation_id) = registry
        .dispatch(TOOL_SELECTION_HOOK, &selection)
        .and_then(|reply| reply["invocationId"].as_str().map(str::to_string))
    else {
        return false;
    };

    if let Some(execution_time) = event.get("executionTime") {
        registry.dispatch(
            TOOL_EXECUTION_HOOK,
            &json!({ "invocationId": invocation_id, "executionTime": execution_time }),
        );
    }

    let mut outcome = json!({
        "invocationId": invocation_id,
        "outcome": field(event, "outcome"),
    });
    if let Some(feedback) = event.get("feedback") {
        outcome["feedback"] = feedback.clone();
    }
    registry
        .dispatch(TOOL_OUTCOME_HOOK, &outcome)
        .is_some_and(|reply| !reply.is_null())
}
