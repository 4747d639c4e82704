//! CLI command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI arguments for toolwise
#[derive(Parser, Debug)]
#[command(name = "toolwise")]
#[command(author, version, about = "Tool usage intelligence - track, evaluate, mine and recommend")]
#[command(long_about = r#"
toolwise learns which tools work, in which contexts, from a stream of tool
invocations.

The pipeline has four stages:
1. Usage tracking: per-tool statistics and a bounded context history
2. Outcome evaluation: success, efficiency and failure classification
3. Pattern analysis: performance tiers, tool sequences, context correlations
4. Recommendation: the best next tool for a context, with feedback loop

State is kept as JSON snapshots in the data directory and reloaded on every run.

Configuration files are loaded from (in priority order):
1. TOOLWISE_* environment variables (e.g. TOOLWISE_ANALYZER__MIN_SAMPLE_SIZE=5)
2. --config <path>     Explicit config file
3. ./toolwise.toml     Project-level config
4. ~/.config/toolwise/config.toml   Global config

Example:
  toolwise ingest invocations.jsonl
  toolwise analyze
  toolwise recommend --context '{"task": "research"}' --previous search_web
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Directory holding the snapshot files
    #[arg(long, value_name = "DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long, value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Feed invocation events from a JSONL file (one event per line)
    Ingest {
        /// File of `{toolId, context?, parameters?, executionTime?, outcome, feedback?}` lines
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Run the full pattern analysis and show the result
    Analyze,

    /// Show usage statistics
    Stats {
        /// Limit to one tool
        tool: Option<String>,
    },

    /// Show the recorded context history, oldest first
    History {
        #[arg(long)]
        tool: Option<String>,
    },

    /// Find history entries with a context similar to the given one
    Similar {
        /// Context as a JSON object
        #[arg(long, value_name = "JSON")]
        context: String,

        #[arg(long, default_value_t = 0.7)]
        threshold: f64,
    },

    /// Show failure patterns for a tool, most frequent first
    Failures { tool: String },

    /// Show reliability metrics for a tool
    Reliability { tool: String },

    /// Compare the outcomes of two tools
    Compare {
        tool_a: String,
        tool_b: String,

        /// Only compare evaluations whose context matches this JSON object
        #[arg(long, value_name = "JSON")]
        context: Option<String>,
    },

    /// Show context correlations from the last analysis
    Correlations {
        /// Dotted context factor, e.g. `task.type`
        #[arg(long)]
        factor: Option<String>,
    },

    /// Recommend a tool for a context
    Recommend {
        /// Context as a JSON object
        #[arg(long, value_name = "JSON")]
        context: String,

        /// Previously used tools, oldest first (repeatable)
        #[arg(long, value_name = "TOOL")]
        previous: Vec<String>,
    },

    /// Record feedback on the latest recommendation of a tool
    Feedback {
        tool: String,

        /// The recommendation was acted upon
        #[arg(long)]
        used: bool,

        /// The recommended tool succeeded
        #[arg(long)]
        success: bool,

        /// The recommendation was helpful
        #[arg(long)]
        helpful: bool,

        #[arg(long)]
        comments: Option<String>,

        /// Context the recommendation was made for, as a JSON object
        #[arg(long, value_name = "JSON")]
        context: Option<String>,
    },

    /// Show recommendation performance
    Performance {
        /// Recalibrate confidence thresholds from the feedback history
        #[arg(long)]
        adjust: bool,
    },

    /// Export evaluation data
    Export {
        /// `json` or `csv`
        #[arg(long, default_value = "json")]
        format: String,

        /// Write to a file instead of stdout
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Show configuration sources and the effective configuration
    Config,
}

impl Command {
    /// Whether the command changes persisted state.
    pub fn mutates_state(&self) -> bool {
        match self {
            Command::Ingest { .. } | Command::Analyze | Command::Recommend { .. } => true,
            Command::Feedback { .. } => true,
            Command::Performance { adjust } => *adjust,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_recommend_with_previous_tools() {
        let cli = Cli::parse_from([
            "toolwise",
            "recommend",
            "--context",
            r#"{"task":"research"}"#,
            "--previous",
            "search_web",
            "--previous",
            "read_file",
            "--json",
        ]);
        assert!(cli.json);
        match cli.command {
            Command::Recommend { context, previous } => {
                assert_eq!(context, r#"{"task":"research"}"#);
                assert_eq!(previous, vec!["search_web", "read_file"]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["toolwise", "stats", "-vv", "--data-dir", "/tmp/tw"]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/tw")));
        assert!(!cli.command.mutates_state());
    }

    #[test]
    fn test_feedback_flags() {
        let cli = Cli::parse_from(["toolwise", "feedback", "search_web", "--used", "--success"]);
        match cli.command {
            Command::Feedback {
                tool,
                used,
                success,
                helpful,
                comments,
                context,
            } => {
                assert_eq!(tool, "search_web");
                assert!(used && success && !helpful);
                assert!(comments.is_none() && context.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_mutating_commands() {
        let adjust = Cli::parse_from(["toolwise", "performance", "--adjust"]);
        assert!(adjust.command.mutates_state());
        let report = Cli::parse_from(["toolwise", "performance"]);
        assert!(!report.command.mutates_state());
        let analyze = Cli::parse_from(["toolwise", "analyze"]);
        assert!(analyze.command.mutates_state());
    }

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
