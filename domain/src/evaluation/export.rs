//! Evaluation data export (JSON / CSV).

use super::entities::OutcomeEvaluation;
use crate::core::error::DomainError;
use chrono::SecondsFormat;
use std::str::FromStr;

/// Column header of the CSV export.
pub const CSV_HEADER: &str = "id,invocationId,toolId,toolType,timestamp,success,efficiency,qualityScore";

/// Supported export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl FromStr for ExportFormat {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(DomainError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Render evaluations in the requested format.
pub fn export_evaluations(
    evaluations: &[OutcomeEvaluation],
    format: ExportFormat,
) -> Result<String, DomainError> {
    match format {
        ExportFormat::Json => Ok(serde_json::to_string_pretty(evaluations)?),
        ExportFormat::Csv => Ok(to_csv(evaluations)),
    }
}

fn to_csv(evaluations: &[OutcomeEvaluation]) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for e in evaluations {
        let row = [
            csv_field(&e.id),
            csv_field(&e.invocation_id),
            csv_field(&e.tool_id),
            csv_field(&e.tool_type),
            e.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            e.success.to_string(),
            e.efficiency.to_string(),
            e.quality_score.to_string(),
        ];
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
