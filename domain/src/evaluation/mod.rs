//! Outcome evaluation subdomain.
//!
//! - [`taxonomy`]: failure categories, severities and remediation hints
//! - [`scoring`]: efficiency, quality and reliability sub-scores
//! - [`entities`]: evaluations, failure patterns, comparisons and reliability metrics
//! - [`export`]: JSON / CSV export of evaluation data

pub mod entities;
pub mod export;
pub mod scoring;
pub mod taxonomy;

pub use entities::{
    FailureExample, FailurePattern, OutcomeComparison, OutcomeEvaluation, ReliabilityMetrics,
    ToolOutcomeSummary,
};
pub use export::{CSV_HEADER, ExportFormat, export_evaluations};
pub use scoring::ScoringParams;
pub use taxonomy::{ErrorCategory, FailureAnalysis, Severity, classify_failure};
