//! Pattern mining over usage statistics and context history.
//!
//! All passes are pure functions of their inputs: the same stats and history
//! always produce the same derived structures, regardless of which pass runs
//! first or how often.

use super::entities::{
    CorrelationAnalysis, CorrelationPrediction, CorrelationRecord, PerformanceTiers,
    SequenceAnalysis, SequencePattern, StrongCorrelation, ToolPerformance, ToolTransitions,
};
use crate::context::{Context, ContextValue};
use crate::usage::{ContextHistoryEntry, ToolUsageStats};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Thresholds controlling the mining passes.
#[derive(Debug, Clone, PartialEq)]
pub struct MiningParams {
    /// Minimum total invocations before any tool is classified
    pub min_sample_size: u64,
    /// Minimum invocations of a single tool before it is classified
    pub min_tool_usage: u64,
    pub high_success_threshold: f64,
    pub low_success_threshold: f64,
    /// Dominant-tool share required for a strong correlation
    pub strong_correlation_threshold: f64,
    pub min_correlation_occurrences: u64,
    pub max_common_sequences: usize,
    pub max_sequence_length: usize,
    pub min_sequence_support: u64,
}

impl Default for MiningParams {
    fn default() -> Self {
        Self {
            min_sample_size: 10,
            min_tool_usage: 3,
            high_success_threshold: 0.8,
            low_success_threshold: 0.5,
            strong_correlation_threshold: 0.7,
            min_correlation_occurrences: 3,
            max_common_sequences: 10,
            max_sequence_length: 3,
            min_sequence_support: 2,
        }
    }
}

/// Label tools as high or low performers by success rate.
pub fn classify_tool_performance<'a>(
    stats: impl IntoIterator<Item = &'a ToolUsageStats>,
    params: &MiningParams,
) -> PerformanceTiers {
    let stats: Vec<&ToolUsageStats> = stats.into_iter().collect();
    let total_samples: u64 = stats.iter().map(|s| s.usage_count()).sum();

    if total_samples < params.min_sample_size {
        return PerformanceTiers {
            analyzed: false,
            total_samples,
            ..Default::default()
        };
    }

    let mut high = Vec::new();
    let mut low = Vec::new();
    for s in stats.iter().filter(|s| s.usage_count() >= params.min_tool_usage) {
        let Some(rate) = s.success_rate() else {
            continue;
        };
        let performance = ToolPerformance {
            tool_id: s.tool_id().to_string(),
            success_rate: rate,
            usage_count: s.usage_count(),
        };
        if rate >= params.high_success_threshold {
            high.push(performance);
        } else if rate < params.low_success_threshold {
            low.push(performance);
        }
    }

    high.sort_by(|a, b| {
        b.success_rate
            .total_cmp(&a.success_rate)
            .then_with(|| a.tool_id.cmp(&b.tool_id))
    });
    low.sort_by(|a, b| {
        a.success_rate
            .total_cmp(&b.success_rate)
            .then_with(|| a.tool_id.cmp(&b.tool_id))
    });

    PerformanceTiers {
        analyzed: true,
        total_samples,
        high_performing_tools: high,
        low_performing_tools: low,
    }
}

/// Mine adjacent transitions and frequent contiguous sequences.
pub fn mine_sequences(history: &[ContextHistoryEntry], params: &MiningParams) -> SequenceAnalysis {
    let mut ordered: Vec<&ContextHistoryEntry> = history.iter().collect();
    // Stable: entries sharing a timestamp keep arrival order.
    ordered.sort_by_key(|e| e.timestamp);
    let tools: Vec<&str> = ordered.iter().map(|e| e.tool.as_str()).collect();

    let mut tool_sequences: BTreeMap<String, ToolTransitions> = BTreeMap::new();
    for pair in tools.windows(2) {
        tool_sequences
            .entry(pair[0].to_string())
            .or_default()
            .record(pair[1]);
    }

    let common_sequences = ranked(
        tool_sequences
            .iter()
            .flat_map(|(from, t)| {
                t.next_tools
                    .iter()
                    .map(move |(to, count)| SequencePattern::new([from.as_str(), to.as_str()], *count))
            })
            .collect(),
        params.max_common_sequences,
    );

    let mut ngrams: BTreeMap<Vec<&str>, u64> = BTreeMap::new();
    for len in 3..=params.max_sequence_length {
        for window in tools.windows(len) {
            *ngrams.entry(window.to_vec()).or_insert(0) += 1;
        }
    }
    let frequent_sequences = ranked(
        ngrams
            .into_iter()
            .filter(|(_, count)| *count >= params.min_sequence_support)
            .map(|(seq, count)| SequencePattern::new(seq, count))
            .collect(),
        params.max_common_sequences,
    );

    SequenceAnalysis {
        tool_sequences,
        common_sequences,
        frequent_sequences,
    }
}

fn ranked(mut patterns: Vec<SequencePattern>, limit: usize) -> Vec<SequencePattern> {
    patterns.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.sequence.cmp(&b.sequence)));
    patterns.truncate(limit);
    patterns
}

/// Count tool choices per flattened `(factor, value)` bucket and extract
/// the buckets one tool dominates.
pub fn mine_correlations(
    history: &[ContextHistoryEntry],
    params: &MiningParams,
) -> CorrelationAnalysis {
    let mut buckets: BTreeMap<(String, String), CorrelationRecord> = BTreeMap::new();

    for entry in history {
        let mut seen = HashSet::new();
        for (factor, value) in entry.context.flatten() {
            let key = (factor, value.to_key());
            if !seen.insert(key.clone()) {
                continue;
            }
            buckets
                .entry(key)
                .or_insert_with_key(|(factor, _)| CorrelationRecord::new(factor.clone(), value))
                .record(&entry.tool);
        }
    }

    let mut strong_correlations: Vec<StrongCorrelation> = buckets
        .values()
        .filter(|record| record.total_occurrences >= params.min_correlation_occurrences)
        .filter_map(|record| {
            let (tool, share) = record.dominant_tool()?;
            (share >= params.strong_correlation_threshold).then(|| StrongCorrelation {
                context_factor: record.context_factor.clone(),
                context_value: record.context_value.clone(),
                tool: tool.to_string(),
                confidence: share,
                occurrences: record.total_occurrences,
            })
        })
        .collect();

    strong_correlations.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| b.occurrences.cmp(&a.occurrences))
            .then_with(|| a.context_factor.cmp(&b.context_factor))
            .then_with(|| a.context_value.to_key().cmp(&b.context_value.to_key()))
    });

    CorrelationAnalysis {
        correlations: buckets.into_values().collect(),
        strong_correlations,
    }
}

/// Predict tools for a context from the strong correlations it matches.
///
/// Candidates are ranked by their best matching confidence, then by the
/// number of supporting factors.
pub fn predict_from_correlations(
    context: &Context,
    analysis: &CorrelationAnalysis,
) -> Vec<CorrelationPrediction> {
    let pairs: BTreeSet<(String, String)> = context
        .flatten()
        .into_iter()
        .map(|(factor, value)| (factor, value.to_key()))
        .collect();

    let mut by_tool: BTreeMap<&str, Vec<&StrongCorrelation>> = BTreeMap::new();
    for correlation in &analysis.strong_correlations {
        let key = (
            correlation.context_factor.clone(),
            correlation.context_value.to_key(),
        );
        if pairs.contains(&key) {
            by_tool.entry(&correlation.tool).or_default().push(correlation);
        }
    }

    let mut predictions: Vec<CorrelationPrediction> = by_tool
        .into_iter()
        .map(|(tool, supporting)| CorrelationPrediction {
            tool: tool.to_string(),
            confidence: supporting
                .iter()
                .map(|c| c.confidence)
                .fold(0.0, f64::max),
            supporting: supporting.into_iter().cloned().collect(),
        })
        .collect();

    predictions.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| b.supporting.len().cmp(&a.supporting.len()))
            .then_with(|| a.tool.cmp(&b.tool))
    });
    predictions
}

/// Render a context value for human-readable rationales.
pub fn describe_factor(factor: &str, value: &ContextValue) -> String {
    format!("{} = {}", factor, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usage::{InvocationOutcome, OutcomeStatus, UsageLimits};
    use chrono::{Duration, Utc};
    use proptest::prelude::*;

    fn history(tools: &[&str]) -> Vec<ContextHistoryEntry> {
        let start = Utc::now();
        tools
            .iter()
            .enumerate()
            .map(|(i, tool)| {
                ContextHistoryEntry::new(*tool, Context::new(), OutcomeStatus::Success)
                    .at(start + Duration::seconds(i as i64))
            })
            .collect()
    }

    fn stats(tool: &str, successes: u64, failures: u64) -> ToolUsageStats {
        let mut s = ToolUsageStats::new(tool, UsageLimits::default());
        for _ in 0..successes {
            s.record(&Context::new(), &InvocationOutcome::success(), Utc::now());
        }
        for _ in 0..failures {
            s.record(&Context::new(), &InvocationOutcome::failure("E", "e"), Utc::now());
        }
        s
    }

    #[test]
    fn test_small_sample_is_not_classified() {
        let all = [stats("a", 2, 0), stats("b", 0, 2)];
        let tiers = classify_tool_performance(&all, &MiningParams::default());
        assert!(!tiers.analyzed);
        assert_eq!(tiers.total_samples, 4);
        assert!(tiers.high_performing_tools.is_empty());
        assert!(tiers.low_performing_tools.is_empty());
    }

    #[test]
    fn test_tools_split_by_success_rate() {
        let all = [stats("good", 9, 1), stats("bad", 1, 4), stats("meh", 3, 2), stats("rare", 0, 1)];
        let tiers = classify_tool_performance(&all, &MiningParams::default());
        assert!(tiers.analyzed);
        assert!(tiers.is_high_performer("good"));
        assert!(tiers.is_low_performer("bad"));
        assert!(!tiers.is_high_performer("meh") && !tiers.is_low_performer("meh"));
        // below min_tool_usage
        assert!(!tiers.is_low_performer("rare"));
    }

    #[test]
    fn test_repeated_pair_is_common_sequence() {
        let tools: Vec<&str> = ["search_web", "browser_navigate"].repeat(5);
        let analysis = mine_sequences(&history(&tools), &MiningParams::default());
        assert!(analysis
            .common_sequences
            .contains(&SequencePattern::new(["search_web", "browser_navigate"], 5)));
        assert_eq!(analysis.common_sequences[0].count, 5);
        let transitions = analysis.transitions_from("search_web").unwrap();
        assert_eq!(transitions.most_frequent(), Some(("browser_navigate", 5)));
        assert!(analysis
            .frequent_sequences
            .contains(&SequencePattern::new(["search_web", "browser_navigate", "search_web"], 4)));
    }

    #[test]
    fn test_empty_history_yields_empty_structures() {
        let analysis = mine_sequences(&[], &MiningParams::default());
        assert_eq!(analysis, SequenceAnalysis::default());
        let correlations = mine_correlations(&[], &MiningParams::default());
        assert_eq!(correlations, CorrelationAnalysis::default());
    }

    #[test]
    fn test_sequences_follow_timestamps_not_arrival() {
        let mut entries = history(&["a", "b", "c"]);
        entries.swap(0, 2);
        let analysis = mine_sequences(&entries, &MiningParams::default());
        assert_eq!(analysis.transitions_from("a").unwrap().most_frequent(), Some(("b", 1)));
        assert_eq!(analysis.transitions_from("b").unwrap().most_frequent(), Some(("c", 1)));
    }

    fn entry(tool: &str, context: Context) -> ContextHistoryEntry {
        ContextHistoryEntry::new(tool, context, OutcomeStatus::Success)
    }

    #[test]
    fn test_nested_strong_correlation() {
        let research = || Context::new().with("task", Context::new().with("type", "research"));
        let mut entries: Vec<_> = (0..4).map(|_| entry("search_web", research())).collect();
        entries.push(entry("read_file", research()));
        entries.push(entry("read_file", Context::new().with("task", Context::new().with("type", "edit"))));

        let analysis = mine_correlations(&entries, &MiningParams::default());
        let strong = &analysis.strong_correlations;
        assert_eq!(strong.len(), 1);
        assert_eq!(strong[0].context_factor, "task.type");
        assert_eq!(strong[0].tool, "search_web");
        assert!((strong[0].confidence - 0.8).abs() < 1e-9);
        assert_eq!(strong[0].occurrences, 5);
        // "edit" bucket exists but is below the occurrence floor
        assert_eq!(analysis.for_factor("task.type").count(), 2);
    }

    #[test]
    fn test_list_duplicates_count_once_per_entry() {
        let ctx = Context::new().with("tags", vec![ContextValue::from("x"), ContextValue::from("x")]);
        let analysis = mine_correlations(&[entry("t", ctx)], &MiningParams::default());
        assert_eq!(analysis.correlations[0].total_occurrences, 1);
    }

    #[test]
    fn test_prediction_ranks_by_confidence() {
        let mut entries = Vec::new();
        for _ in 0..3 {
            entries.push(entry("search_web", Context::new().with("intent", "lookup").with("lang", "en")));
        }
        for _ in 0..3 {
            entries.push(entry("translate", Context::new().with("lang", "fr")));
        }
        let analysis = mine_correlations(&entries, &MiningParams::default());

        let predictions = predict_from_correlations(
            &Context::new().with("intent", "lookup").with("lang", "en"),
            &analysis,
        );
        assert_eq!(predictions.len(), 1);
        assert_eq!(predictions[0].tool, "search_web");
        assert_eq!(predictions[0].supporting.len(), 2);

        assert!(predict_from_correlations(&Context::new().with("lang", "de"), &analysis).is_empty());
    }

    proptest! {
        #[test]
        fn mining_is_idempotent(tools in proptest::collection::vec("[a-d]", 0..40)) {
            let refs: Vec<&str> = tools.iter().map(String::as_str).collect();
            let entries: Vec<_> = history(&refs)
                .into_iter()
                .enumerate()
                .map(|(i, mut e)| {
                    e.context = Context::new().with("slot", (i % 3) as i32);
                    e
                })
                .collect();
            let params = MiningParams::default();
            prop_assert_eq!(mine_sequences(&entries, &params), mine_sequences(&entries, &params));
            prop_assert_eq!(mine_correlations(&entries, &params), mine_correlations(&entries, &params));
        }
    }
}
