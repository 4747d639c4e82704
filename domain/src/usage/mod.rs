//! Tool usage subdomain: invocation records and per-tool aggregates.

pub mod entities;

pub use entities::{
    ContextHistoryEntry, InvocationFeedback, InvocationOutcome, OutcomeStatus,
    ToolInvocationRecord, ToolUsageStats, UsageLimits,
};
