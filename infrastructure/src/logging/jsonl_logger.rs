//! JSONL file writer for published pattern insights.
//!
//! Each published [`PatternSnapshot`] becomes a single JSON line with a
//! `type` field, a `timestamp` and a compact summary of the snapshot,
//! appended to the file via a buffered writer.

use serde_json::{Value, json};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use toolwise_application::InsightObserver;
use toolwise_domain::PatternSnapshot;
use tracing::warn;

const PATTERNS_PUBLISHED: &str = "patterns_published";

/// Correlations and sequences listed per line.
const SUMMARY_TOP_N: usize = 5;

/// JSONL insight logger that writes one JSON object per published snapshot.
///
/// Thread-safe via `Mutex<BufWriter<File>>`. Flushes on `Drop`.
pub struct JsonlInsightLogger {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl JsonlInsightLogger {
    /// Create a logger appending to the given path.
    ///
    /// Creates the file (and parent directories) if they don't exist.
    /// Returns `None` if the file cannot be opened.
    pub fn new(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!(
                "Could not create insight log directory {}: {}",
                parent.display(),
                e
            );
            return None;
        }

        let file = match OpenOptions::new().create(true).append(true).open(path) {
            Ok(f) => f,
            Err(e) => {
                warn!("Could not open insight log file {}: {}", path.display(), e);
                return None;
            }
        };

        Some(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }

    /// Get the path to the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn summarize(snapshot: &PatternSnapshot) -> Value {
        let tool_ids = |tools: &[toolwise_domain::ToolPerformance]| -> Vec<String> {
            tools.iter().map(|t| t.tool_id.clone()).collect()
        };

        json!({
            "analyzedAt": snapshot.analyzed_at,
            "usage": {
                "analyzed": snapshot.usage.analyzed,
                "totalSamples": snapshot.usage.total_samples,
                "highPerformingTools": tool_ids(&snapshot.usage.high_performing_tools),
                "lowPerformingTools": tool_ids(&snapshot.usage.low_performing_tools),
            },
            "sequences": {
                "trackedTools": snapshot.sequences.tool_sequences.len(),
                "commonSequences": snapshot
                    .sequences
                    .common_sequences
                    .iter()
                    .take(SUMMARY_TOP_N)
                    .collect::<Vec<_>>(),
                "frequentSequenceCount": snapshot.sequences.frequent_sequences.len(),
            },
            "correlations": {
                "buckets": snapshot.correlations.correlations.len(),
                "strongCorrelations": snapshot
                    .correlations
                    .strong_correlations
                    .iter()
                    .take(SUMMARY_TOP_N)
                    .collect::<Vec<_>>(),
            },
        })
    }

    fn write_record(&self, event_type: &str, payload: Value) {
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);

        let record = if let Value::Object(mut map) = payload {
            map.insert("type".to_string(), Value::String(event_type.to_string()));
            map.insert("timestamp".to_string(), Value::String(timestamp));
            Value::Object(map)
        } else {
            json!({
                "type": event_type,
                "timestamp": timestamp,
                "data": payload,
            })
        };

        let line = match serde_json::to_string(&record) {
            Ok(line) => line,
            Err(e) => {
                warn!("Could not encode {} insight record: {}", event_type, e);
                return;
            }
        };

        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        if let Err(e) = writeln!(writer, "{}", line).and_then(|_| writer.flush()) {
            warn!("Could not write insight log {}: {}", self.path.display(), e);
        }
    }
}

impl InsightObserver for JsonlInsightLogger {
    fn name(&self) -> &str {
        "jsonl-insight-log"
    }

    fn on_patterns_published(&self, snapshot: &Arc<PatternSnapshot>) {
        self.write_record(PATTERNS_PUBLISHED, Self::summarize(snapshot));
    }
}

impl Drop for JsonlInsightLogger {
    fn drop(&mut self) {
        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        if let Err(e) = writer.flush() {
            warn!("Could not flush insight log {}: {}", self.path.display(), e);
        }
    }
}
