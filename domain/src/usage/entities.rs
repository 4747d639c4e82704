//! Tool usage entities: invocation records, outcomes and per-tool aggregates

use crate::context::Context;
use crate::core::bounded::BoundedBuffer;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Terminal status reported for a tool invocation.
///
/// Only [`OutcomeStatus::Success`] counts as a success; every other status,
/// including ones this crate does not recognise, is treated as a failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Success,
    Failure,
    Error,
    #[default]
    #[serde(other)]
    Unknown,
}

impl OutcomeStatus {
    pub fn as_str(&self) -> &str {
        match self {
            OutcomeStatus::Success => "success",
            OutcomeStatus::Failure => "failure",
            OutcomeStatus::Error => "error",
            OutcomeStatus::Unknown => "unknown",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, OutcomeStatus::Success)
    }
}

impl From<&str> for OutcomeStatus {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "success" => OutcomeStatus::Success,
            "failure" => OutcomeStatus::Failure,
            "error" => OutcomeStatus::Error,
            _ => OutcomeStatus::Unknown,
        }
    }
}

impl std::fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome attached to an invocation once the tool has finished.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationOutcome {
    pub status: OutcomeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Wall-clock duration reported with the outcome
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl InvocationOutcome {
    pub fn new(status: OutcomeStatus) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }

    pub fn success() -> Self {
        Self::new(OutcomeStatus::Success)
    }

    pub fn failure(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: OutcomeStatus::Failure,
            error_code: Some(code.into()),
            error_message: Some(message.into()),
            duration_ms: None,
        }
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_error_code(mut self, code: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self
    }

    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Short human-readable reason for a failed outcome.
    pub fn failure_reason(&self) -> String {
        self.error_message
            .clone()
            .or_else(|| self.error_code.clone())
            .unwrap_or_else(|| self.status.to_string())
    }
}

/// Explicit feedback on a single invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationFeedback {
    /// Quality rating in `[0, 1]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
}

impl InvocationFeedback {
    pub fn rated(rating: f64) -> Self {
        Self {
            rating: Some(rating),
            comments: None,
        }
    }
}

/// A single recorded use of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInvocationRecord {
    pub id: String,
    pub tool_id: String,
    #[serde(default)]
    pub parameters: Context,
    #[serde(default)]
    pub context: Context,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<InvocationOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<InvocationFeedback>,
}

impl ToolInvocationRecord {
    pub fn new(tool_id: impl Into<String>, parameters: Context, context: Context) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tool_id: tool_id.into(),
            parameters,
            context,
            timestamp: Utc::now(),
            execution_time_ms: None,
            outcome: None,
            feedback: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_outcome(mut self, outcome: InvocationOutcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    pub fn with_execution_time(mut self, execution_time_ms: u64) -> Self {
        self.execution_time_ms = Some(execution_time_ms);
        self
    }

    pub fn with_feedback(mut self, feedback: InvocationFeedback) -> Self {
        self.feedback = Some(feedback);
        self
    }

    /// Measured execution time, falling back to the outcome's reported duration.
    pub fn effective_duration_ms(&self) -> Option<u64> {
        self.execution_time_ms
            .or_else(|| self.outcome.as_ref().and_then(|o| o.duration_ms))
    }
}

/// One entry in the tracker's append-only context history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextHistoryEntry {
    pub tool: String,
    pub context: Context,
    pub outcome: OutcomeStatus,
    pub timestamp: DateTime<Utc>,
}

impl ContextHistoryEntry {
    pub fn new(tool: impl Into<String>, context: Context, outcome: OutcomeStatus) -> Self {
        Self {
            tool: tool.into(),
            context,
            outcome,
            timestamp: Utc::now(),
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}

/// Caps applied to the bounded lists inside [`ToolUsageStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageLimits {
    pub max_failure_reasons: usize,
    pub max_contexts: usize,
}

impl Default for UsageLimits {
    fn default() -> Self {
        Self {
            max_failure_reasons: 50,
            max_contexts: 20,
        }
    }
}

/// Aggregate usage statistics for one tool.
///
/// Invariant: `success_count <= usage_count`. The average duration is a
/// running mean over the invocations that reported a duration and is never
/// recomputed from history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolUsageStats {
    tool_id: String,
    usage_count: u64,
    success_count: u64,
    avg_duration_ms: f64,
    timed_count: u64,
    failure_reasons: BoundedBuffer<String>,
    contexts: BoundedBuffer<Context>,
    first_used: Option<DateTime<Utc>>,
    last_used: Option<DateTime<Utc>>,
}

impl ToolUsageStats {
    pub fn new(tool_id: impl Into<String>, limits: UsageLimits) -> Self {
        Self {
            tool_id: tool_id.into(),
            usage_count: 0,
            success_count: 0,
            avg_duration_ms: 0.0,
            timed_count: 0,
            failure_reasons: BoundedBuffer::new(limits.max_failure_reasons),
            contexts: BoundedBuffer::new(limits.max_contexts),
            first_used: None,
            last_used: None,
        }
    }

    /// Fold one invocation into the aggregate.
    pub fn record(&mut self, context: &Context, outcome: &InvocationOutcome, at: DateTime<Utc>) {
        self.usage_count += 1;
        if outcome.is_success() {
            self.success_count += 1;
        } else {
            self.failure_reasons.push(outcome.failure_reason());
        }

        if let Some(duration) = outcome.duration_ms {
            let old_count = self.timed_count as f64;
            self.timed_count += 1;
            self.avg_duration_ms =
                (self.avg_duration_ms * old_count + duration as f64) / self.timed_count as f64;
        }

        self.contexts.push(context.clone());
        self.first_used.get_or_insert(at);
        self.last_used = Some(at);
    }

    /// Re-apply list caps after a configuration change or snapshot load.
    pub fn apply_limits(&mut self, limits: UsageLimits) {
        self.failure_reasons.set_capacity(limits.max_failure_reasons);
        self.contexts.set_capacity(limits.max_contexts);
        self.success_count = self.success_count.min(self.usage_count);
    }

    pub fn tool_id(&self) -> &str {
        &self.tool_id
    }

    pub fn usage_count(&self) -> u64 {
        self.usage_count
    }

    pub fn success_count(&self) -> u64 {
        self.success_count
    }

    pub fn failure_count(&self) -> u64 {
        self.usage_count - self.success_count
    }

    pub fn avg_duration_ms(&self) -> f64 {
        self.avg_duration_ms
    }

    pub fn failure_reasons(&self) -> &BoundedBuffer<String> {
        &self.failure_reasons
    }

    pub fn contexts(&self) -> &BoundedBuffer<Context> {
        &self.contexts
    }

    pub fn first_used(&self) -> Option<DateTime<Utc>> {
        self.first_used
    }

    pub fn last_used(&self) -> Option<DateTime<Utc>> {
        self.last_used
    }

    /// `None` until the tool has been used at least once.
    pub fn success_rate(&self) -> Option<f64> {
        if self.usage_count == 0 {
            None
        } else {
            Some(self.success_count as f64 / self.usage_count as f64)
        }
    }

    pub fn failure_rate(&self) -> Option<f64> {
        self.success_rate().map(|rate| 1.0 - rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_outcome_status_parsing() {
        assert_eq!(OutcomeStatus::from("success"), OutcomeStatus::Success);
        assert_eq!(OutcomeStatus::from("FAILURE"), OutcomeStatus::Failure);
        assert_eq!(OutcomeStatus::from("pending"), OutcomeStatus::Unknown);
        assert!(!OutcomeStatus::Unknown.is_success());
    }

    #[test]
    fn test_unknown_status_deserializes_as_failure() {
        let outcome: InvocationOutcome =
            serde_json::from_str(r#"{"status":"partial"}"#).unwrap();
        assert_eq!(outcome.status, OutcomeStatus::Unknown);
        assert!(!outcome.is_success());
    }

    #[test]
    fn test_running_average_duration() {
        let mut stats = ToolUsageStats::new("search_web", UsageLimits::default());
        let ctx = Context::new();
        for duration in [100, 200, 300] {
            stats.record(&ctx, &InvocationOutcome::success().with_duration(duration), Utc::now());
        }
        assert!((stats.avg_duration_ms() - 200.0).abs() < 1e-9);
        // An outcome without a duration does not drag the mean down.
        stats.record(&ctx, &InvocationOutcome::success(), Utc::now());
        assert!((stats.avg_duration_ms() - 200.0).abs() < 1e-9);
        assert_eq!(stats.usage_count(), 4);
    }

    #[test]
    fn test_success_rate_none_when_unused() {
        let stats = ToolUsageStats::new("idle", UsageLimits::default());
        assert_eq!(stats.success_rate(), None);
        assert_eq!(stats.failure_rate(), None);
    }

    #[test]
    fn test_failure_reasons_capped() {
        let limits = UsageLimits {
            max_failure_reasons: 2,
            max_contexts: 1,
        };
        let mut stats = ToolUsageStats::new("flaky", limits);
        for i in 0..4 {
            stats.record(
                &Context::new().with("i", i),
                &InvocationOutcome::failure("TIMEOUT", format!("attempt {}", i)),
                Utc::now(),
            );
        }
        assert_eq!(
            stats.failure_reasons().to_vec(),
            vec!["attempt 2".to_string(), "attempt 3".to_string()]
        );
        assert_eq!(stats.contexts().len(), 1);
        assert_eq!(stats.failure_count(), 4);
    }

    #[test]
    fn test_failure_reason_fallbacks() {
        assert_eq!(InvocationOutcome::new(OutcomeStatus::Error).failure_reason(), "error");
        assert_eq!(
            InvocationOutcome::new(OutcomeStatus::Failure)
                .with_error_code("NOT_FOUND")
                .failure_reason(),
            "NOT_FOUND"
        );
    }

    #[test]
    fn test_effective_duration_prefers_execution_time() {
        let record = ToolInvocationRecord::new("t", Context::new(), Context::new())
            .with_outcome(InvocationOutcome::success().with_duration(50));
        assert_eq!(record.effective_duration_ms(), Some(50));
        assert_eq!(record.with_execution_time(20).effective_duration_ms(), Some(20));
    }

    proptest! {
        #[test]
        fn success_count_never_exceeds_usage(outcomes in proptest::collection::vec(any::<bool>(), 0..64)) {
            let mut stats = ToolUsageStats::new("tool", UsageLimits::default());
            for ok in outcomes {
                let outcome = if ok {
                    InvocationOutcome::success()
                } else {
                    InvocationOutcome::new(OutcomeStatus::Error)
                };
                stats.record(&Context::new(), &outcome, Utc::now());
                prop_assert!(stats.success_count() <= stats.usage_count());
            }
        }
    }
}
