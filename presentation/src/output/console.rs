//! Console output formatter for pipeline results

use crate::output::formatter::OutputFormatter;
use colored::Colorize;
use toolwise_domain::{
    Context, ContextHistoryEntry, CorrelationRecord, FailurePattern, OutcomeComparison,
    PatternSnapshot, Recommendation, RecommendationPerformanceReport, ReliabilityMetrics,
    SequencePattern, ThresholdAdjustment, ToolOutcomeSummary, ToolUsageStats,
};

/// Formats pipeline results for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}\n", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn label(name: &str) -> String {
        format!("{:<22}", format!("{}:", name)).dimmed().to_string()
    }

    /// `0.8` as `80.0%`, `n/a` when there is no data
    pub fn percent(rate: Option<f64>) -> String {
        rate.map(|r| format!("{:.1}%", r * 100.0))
            .unwrap_or_else(|| "n/a".to_string())
    }

    /// Flattened `key=value` pairs, `{}` for an empty context
    pub fn context(context: &Context) -> String {
        let pairs = context.flatten();
        if pairs.is_empty() {
            return "{}".to_string();
        }
        pairs
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn sequence(pattern: &SequencePattern) -> String {
        format!("{} (x{})", pattern.sequence.join(" -> "), pattern.count)
    }

    fn summary(summary: &ToolOutcomeSummary) -> String {
        format!(
            "{:<24} success {:>7}  efficiency {:>7}  samples {}",
            summary.tool_id.bold(),
            Self::percent(summary.success_rate),
            Self::percent(summary.avg_efficiency),
            summary.sample_size
        )
    }

    fn empty(message: &str) -> String {
        format!("{}\n", message.dimmed())
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format_stats(&self, stats: &[ToolUsageStats]) -> String {
        if stats.is_empty() {
            return Self::empty("No tool usage recorded yet.");
        }

        let mut output = Self::header("Tool Usage");
        for s in stats {
            let rate = s.success_rate();
            let rate_text = Self::percent(rate);
            let rate_text = match rate {
                Some(r) if r >= 0.8 => rate_text.green(),
                Some(r) if r < 0.5 => rate_text.red(),
                _ => rate_text.yellow(),
            };
            output.push_str(&format!(
                "\n{}\n  {} {} ({} ok / {} failed)\n  {} {:.0} ms\n",
                format!("── {} ──", s.tool_id()).yellow().bold(),
                Self::label("Success rate"),
                rate_text,
                s.success_count(),
                s.failure_count(),
                Self::label("Avg duration"),
                s.avg_duration_ms()
            ));
            if let (Some(first), Some(last)) = (s.first_used(), s.last_used()) {
                output.push_str(&format!(
                    "  {} {} .. {}\n",
                    Self::label("Used"),
                    first.format("%Y-%m-%d %H:%M:%S"),
                    last.format("%Y-%m-%d %H:%M:%S")
                ));
            }
            if let Some(reason) = s.failure_reasons().iter_recent().next() {
                output.push_str(&format!("  {} {}\n", Self::label("Last failure"), reason));
            }
        }
        output
    }

    fn format_history(&self, entries: &[ContextHistoryEntry]) -> String {
        if entries.is_empty() {
            return Self::empty("No matching history entries.");
        }

        let mut output = String::new();
        for entry in entries {
            let status = if entry.is_success() {
                entry.outcome.to_string().green()
            } else {
                entry.outcome.to_string().red()
            };
            output.push_str(&format!(
                "{} {:<24} {:<8} {}\n",
                entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
                entry.tool,
                status,
                Self::context(&entry.context)
            ));
        }
        output
    }

    fn format_failures(&self, tool: &str, patterns: &[FailurePattern]) -> String {
        if patterns.is_empty() {
            return Self::empty(&format!("No failures recorded for {}.", tool));
        }

        let mut output = Self::header(&format!("Failure Patterns: {}", tool));
        for pattern in patterns {
            let category = pattern.error_category;
            output.push_str(&format!(
                "\n{} {}\n  {} {}\n  {} {} .. {}\n  {} {}\n",
                format!("── {} ──", category).red().bold(),
                format!("[{}]", category.severity()).dimmed(),
                Self::label("Occurrences"),
                pattern.frequency,
                Self::label("Seen"),
                pattern.first_occurrence.format("%Y-%m-%d %H:%M"),
                pattern.last_occurrence.format("%Y-%m-%d %H:%M"),
                Self::label("Remediation"),
                category.remediation()
            ));
            for example in pattern.examples() {
                output.push_str(&format!(
                    "    * {} {}\n",
                    example.error_code.as_deref().unwrap_or("-").bold(),
                    example.error_message.as_deref().unwrap_or("")
                ));
            }
        }
        output
    }

    fn format_reliability(&self, metrics: &ReliabilityMetrics) -> String {
        let mut output = Self::header(&format!("Reliability: {}", metrics.tool_id));
        let score = metrics
            .reliability_score
            .map(|s| format!("{:.2}", s))
            .unwrap_or_else(|| "n/a".to_string());
        output.push_str(&format!(
            "{} {}\n{} {:.0}% ({} evaluations)\n{} {}\n{} {}\n{} {}\n",
            Self::label("Reliability score"),
            score.bold(),
            Self::label("Confidence"),
            metrics.confidence * 100.0,
            metrics.sample_size,
            Self::label("Success rate"),
            Self::percent(metrics.success_rate),
            Self::label("Avg efficiency"),
            Self::percent(metrics.avg_efficiency),
            Self::label("Avg quality"),
            Self::percent(metrics.avg_quality)
        ));
        if !metrics.failure_patterns.is_empty() {
            output.push_str(&Self::section_header("Failure patterns"));
            for pattern in &metrics.failure_patterns {
                output.push_str(&format!(
                    "  * {} x{}\n",
                    pattern.error_category, pattern.frequency
                ));
            }
        }
        output
    }

    fn format_comparison(&self, comparison: &OutcomeComparison) -> String {
        let mut output = Self::header("Outcome Comparison");
        output.push_str(&format!(
            "{}\n{}\n",
            Self::summary(&comparison.tool_a),
            Self::summary(&comparison.tool_b)
        ));
        if let Some(diff) = comparison.success_rate_difference {
            output.push_str(&format!(
                "\n{} {:+.1} pts\n",
                Self::label("Success difference"),
                diff * 100.0
            ));
        }
        if let Some(diff) = comparison.efficiency_difference {
            output.push_str(&format!(
                "{} {:+.3}\n",
                Self::label("Efficiency diff"),
                diff
            ));
        }
        match &comparison.preferred_tool {
            Some(tool) => output.push_str(&format!(
                "{} {}\n",
                Self::label("Preferred"),
                tool.green().bold()
            )),
            None => output.push_str(&format!(
                "{} {}\n",
                Self::label("Preferred"),
                "not enough data".dimmed()
            )),
        }
        output
    }

    fn format_patterns(&self, snapshot: &PatternSnapshot) -> String {
        let mut output = Self::header("Pattern Analysis");
        if let Some(at) = snapshot.analyzed_at {
            output.push_str(&format!(
                "{} {}\n",
                Self::label("Analyzed at"),
                at.format("%Y-%m-%d %H:%M:%S")
            ));
        }

        output.push_str(&Self::section_header("Tool performance"));
        let usage = &snapshot.usage;
        if !usage.analyzed {
            output.push_str(&Self::empty(&format!(
                "Not enough samples yet ({} recorded).",
                usage.total_samples
            )));
        } else {
            for tool in &usage.high_performing_tools {
                output.push_str(&format!(
                    "  {} {:<24} {} over {} uses\n",
                    "▲".green(),
                    tool.tool_id,
                    Self::percent(Some(tool.success_rate)),
                    tool.usage_count
                ));
            }
            for tool in &usage.low_performing_tools {
                output.push_str(&format!(
                    "  {} {:<24} {} over {} uses\n",
                    "▼".red(),
                    tool.tool_id,
                    Self::percent(Some(tool.success_rate)),
                    tool.usage_count
                ));
            }
            if usage.high_performing_tools.is_empty() && usage.low_performing_tools.is_empty() {
                output.push_str(&Self::empty("No tool stands out yet."));
            }
        }

        output.push_str(&Self::section_header("Common sequences"));
        let sequences = &snapshot.sequences;
        if sequences.common_sequences.is_empty() && sequences.frequent_sequences.is_empty() {
            output.push_str(&Self::empty("No repeated sequences."));
        }
        for pattern in sequences
            .common_sequences
            .iter()
            .chain(&sequences.frequent_sequences)
        {
            output.push_str(&format!("  * {}\n", Self::sequence(pattern)));
        }

        output.push_str(&Self::section_header("Strong context correlations"));
        if snapshot.correlations.strong_correlations.is_empty() {
            output.push_str(&Self::empty("No strong correlations."));
        }
        for c in &snapshot.correlations.strong_correlations {
            output.push_str(&format!(
                "  * {}={} -> {} ({} of {} observations)\n",
                c.context_factor,
                c.context_value,
                c.tool.bold(),
                Self::percent(Some(c.confidence)),
                c.occurrences
            ));
        }

        output
    }

    fn format_correlations(&self, records: &[CorrelationRecord]) -> String {
        if records.is_empty() {
            return Self::empty("No correlations recorded. Run `toolwise analyze` first.");
        }

        let mut output = String::new();
        for record in records {
            output.push_str(&format!(
                "{} {}\n",
                format!("{}={}", record.context_factor, record.context_value).bold(),
                format!("({} occurrences)", record.total_occurrences).dimmed()
            ));
            for (tool, count) in &record.tools {
                output.push_str(&format!("    {:<24} {}\n", tool, count));
            }
        }
        output
    }

    fn format_recommendation(&self, recommendation: Option<&Recommendation>) -> String {
        let Some(rec) = recommendation else {
            return Self::empty("No confident recommendation for this context.");
        };

        let mut output = format!(
            "{} {} {}\n  {}\n",
            "Recommended:".cyan().bold(),
            rec.tool.green().bold(),
            format!(
                "(confidence {:.0}%, {})",
                rec.confidence * 100.0,
                rec.source
            )
            .dimmed(),
            rec.reasoning
        );
        if !rec.alternatives.is_empty() {
            output.push_str(&format!("\n{}\n", "Alternatives:".cyan()));
            for alt in &rec.alternatives {
                output.push_str(&format!(
                    "  * {:<24} {:.0}%  {}\n",
                    alt.tool,
                    alt.confidence * 100.0,
                    alt.reasoning.dimmed()
                ));
            }
        }
        output
    }

    fn format_performance(
        &self,
        report: &RecommendationPerformanceReport,
        adjustments: &[ThresholdAdjustment],
    ) -> String {
        let mut output = Self::header("Recommendation Performance");
        output.push_str(&format!(
            "{} {}\n{} {} ({})\n{} {}\n{} {:+.2}\n",
            Self::label("Recommendations"),
            report.total_recommendations,
            Self::label("Used"),
            report.used_count,
            Self::percent(Some(report.usage_rate)),
            Self::label("Accuracy"),
            Self::percent(Some(report.overall_accuracy)),
            Self::label("Confidence corr."),
            report.confidence_correlation
        ));

        if !report.tool_stats.is_empty() {
            output.push_str(&Self::section_header("Per tool"));
            for (tool, stats) in &report.tool_stats {
                output.push_str(&format!(
                    "  {:<24} {} recommended, {} used, {} succeeded ({}), avg confidence {:.2}\n",
                    tool.bold(),
                    stats.recommendation_count,
                    stats.used_count,
                    stats.success_count,
                    Self::percent(Some(stats.success_rate)),
                    stats.avg_confidence
                ));
            }
        }

        if !adjustments.is_empty() {
            output.push_str(&Self::section_header("Threshold adjustments"));
            for adj in adjustments {
                output.push_str(&format!(
                    "  {:<24} {:.2} -> {:.2} ({} success over {} samples)\n",
                    adj.tool,
                    adj.previous,
                    adj.current,
                    Self::percent(Some(adj.success_rate)),
                    adj.sample_size
                ));
            }
        }
        output
    }
}
