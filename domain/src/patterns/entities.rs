//! Derived pattern structures.
//!
//! Everything here is recomputed from scratch by the mining functions in
//! [`super::mining`]; none of it is updated incrementally.

use crate::context::ContextValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A tool's standing in the usage-performance classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolPerformance {
    pub tool_id: String,
    pub success_rate: f64,
    pub usage_count: u64,
}

/// High/low performer labels derived from usage statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceTiers {
    /// `false` when the sample was too small to classify anything
    pub analyzed: bool,
    pub total_samples: u64,
    pub high_performing_tools: Vec<ToolPerformance>,
    pub low_performing_tools: Vec<ToolPerformance>,
}

impl PerformanceTiers {
    pub fn is_low_performer(&self, tool_id: &str) -> bool {
        self.low_performing_tools.iter().any(|t| t.tool_id == tool_id)
    }

    pub fn is_high_performer(&self, tool_id: &str) -> bool {
        self.high_performing_tools.iter().any(|t| t.tool_id == tool_id)
    }
}

/// Outgoing transition counts from one tool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolTransitions {
    pub next_tools: BTreeMap<String, u64>,
    pub total: u64,
}

impl ToolTransitions {
    pub fn record(&mut self, next_tool: &str) {
        *self.next_tools.entry(next_tool.to_string()).or_insert(0) += 1;
        self.total += 1;
    }

    /// Most frequent successor; ties go to the lexicographically smallest id.
    pub fn most_frequent(&self) -> Option<(&str, u64)> {
        self.next_tools
            .iter()
            .fold(None, |best: Option<(&str, u64)>, (tool, count)| match best {
                Some((_, best_count)) if best_count >= *count => best,
                _ => Some((tool.as_str(), *count)),
            })
    }

    /// Share of transitions that went to `next_tool`.
    pub fn share(&self, next_tool: &str) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.next_tools.get(next_tool).copied().unwrap_or(0) as f64 / self.total as f64
    }
}

/// A contiguous tool subsequence and how often it occurred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequencePattern {
    pub sequence: Vec<String>,
    pub count: u64,
}

impl SequencePattern {
    pub fn new<S: Into<String>>(sequence: impl IntoIterator<Item = S>, count: u64) -> Self {
        Self {
            sequence: sequence.into_iter().map(Into::into).collect(),
            count,
        }
    }
}

/// Output of the sequence pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceAnalysis {
    pub tool_sequences: BTreeMap<String, ToolTransitions>,
    /// Adjacent pairs, most frequent first
    pub common_sequences: Vec<SequencePattern>,
    /// Longer n-grams meeting the support floor, most frequent first
    pub frequent_sequences: Vec<SequencePattern>,
}

impl SequenceAnalysis {
    pub fn transitions_from(&self, tool_id: &str) -> Option<&ToolTransitions> {
        self.tool_sequences.get(tool_id)
    }
}

/// Tool counts for one `(context factor, value)` bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationRecord {
    /// Dotted path into the context, e.g. `task.type`
    pub context_factor: String,
    pub context_value: ContextValue,
    pub tools: BTreeMap<String, u64>,
    pub total_occurrences: u64,
}

impl CorrelationRecord {
    pub fn new(context_factor: impl Into<String>, context_value: ContextValue) -> Self {
        Self {
            context_factor: context_factor.into(),
            context_value,
            tools: BTreeMap::new(),
            total_occurrences: 0,
        }
    }

    pub fn record(&mut self, tool: &str) {
        *self.tools.entry(tool.to_string()).or_insert(0) += 1;
        self.total_occurrences += 1;
    }

    /// Dominant tool and its share; ties go to the lexicographically smallest id.
    pub fn dominant_tool(&self) -> Option<(&str, f64)> {
        if self.total_occurrences == 0 {
            return None;
        }
        self.tools
            .iter()
            .fold(None, |best: Option<(&str, u64)>, (tool, count)| match best {
                Some((_, best_count)) if best_count >= *count => best,
                _ => Some((tool.as_str(), *count)),
            })
            .map(|(tool, count)| (tool, count as f64 / self.total_occurrences as f64))
    }
}

/// A bucket where one tool dominates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrongCorrelation {
    pub context_factor: String,
    pub context_value: ContextValue,
    pub tool: String,
    /// Dominant tool's share of the bucket's occurrences
    pub confidence: f64,
    pub occurrences: u64,
}

/// Output of the context-correlation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationAnalysis {
    /// All buckets, ordered by factor then value
    pub correlations: Vec<CorrelationRecord>,
    /// Dominated buckets, strongest first
    pub strong_correlations: Vec<StrongCorrelation>,
}

impl CorrelationAnalysis {
    pub fn for_factor(&self, factor: &str) -> impl Iterator<Item = &CorrelationRecord> {
        self.correlations
            .iter()
            .filter(move |c| c.context_factor == factor)
    }
}

/// A tool predicted for a context from its strong correlations.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationPrediction {
    pub tool: String,
    pub confidence: f64,
    /// Matching correlations, strongest first
    pub supporting: Vec<StrongCorrelation>,
}

/// Point-in-time view of every derived structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternSnapshot {
    pub usage: PerformanceTiers,
    pub sequences: SequenceAnalysis,
    pub correlations: CorrelationAnalysis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyzed_at: Option<DateTime<Utc>>,
}

impl PatternSnapshot {
    /// Derived structures equal, ignoring when they were computed.
    pub fn same_patterns(&self, other: &PatternSnapshot) -> bool {
        self.usage == other.usage
            && self.sequences == other.sequences
            && self.correlations == other.correlations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_most_frequent_successor_tie_break() {
        let mut transitions = ToolTransitions::default();
        transitions.record("write_file");
        transitions.record("read_file");
        assert_eq!(transitions.most_frequent(), Some(("read_file", 1)));
        transitions.record("write_file");
        assert_eq!(transitions.most_frequent(), Some(("write_file", 2)));
        assert!((transitions.share("write_file") - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_dominant_tool_share() {
        let mut record = CorrelationRecord::new("task.type", ContextValue::from("research"));
        assert_eq!(record.dominant_tool(), None);
        for tool in ["search_web", "search_web", "search_web", "read_file"] {
            record.record(tool);
        }
        assert_eq!(record.dominant_tool(), Some(("search_web", 0.75)));
    }

    #[test]
    fn test_low_performer_lookup() {
        let tiers = PerformanceTiers {
            analyzed: true,
            total_samples: 20,
            high_performing_tools: vec![],
            low_performing_tools: vec![ToolPerformance {
                tool_id: "flaky".into(),
                success_rate: 0.2,
                usage_count: 10,
            }],
        };
        assert!(tiers.is_low_performer("flaky"));
        assert!(!tiers.is_low_performer("solid"));
    }
}
