//! CLI entrypoint for toolwise
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

mod ingest;

use anyhow::{Context as _, Result, bail};
use clap::Parser;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use toolwise_application::ToolInsightPipeline;
use toolwise_domain::{Context, InvocationOutcome, RecommendationFeedback};
use toolwise_infrastructure::{ConfigLoader, FileConfig, JsonFileSnapshotStore, JsonlInsightLogger};
use toolwise_presentation::{Cli, Command, ConsoleFormatter, JsonFormatter, OutputFormatter};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const INSIGHT_LOG_FILE: &str = "insights.jsonl";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Keep the guard alive so the file writer flushes on exit
    let _log_guard = init_logging(cli.verbose, cli.log_file.as_deref())?;

    info!("Starting toolwise");

    // === Configuration ===
    let file_config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_deref()).context("Failed to load configuration")?
    };
    file_config.validate().context("Invalid configuration")?;

    let data_dir = resolve_data_dir(&cli, &file_config);

    if let Command::Config = cli.command {
        return show_config(&cli, &file_config, &data_dir);
    }

    // === Dependency Injection ===
    let store = JsonFileSnapshotStore::new(&data_dir);
    let insight_log = file_config
        .storage
        .insight_log
        .clone()
        .unwrap_or_else(|| data_dir.join(INSIGHT_LOG_FILE));

    let mut builder = ToolInsightPipeline::builder(file_config.analytics_config());
    if let Some(logger) = JsonlInsightLogger::new(&insight_log) {
        builder = builder.with_observer(Arc::new(logger));
    }
    let pipeline = builder.build();

    if !pipeline.load_data(&store).await {
        warn!(
            "Some snapshots in {} could not be loaded; continuing with partial state",
            data_dir.display()
        );
    }

    let formatter: Box<dyn OutputFormatter> = if cli.json {
        Box::new(JsonFormatter)
    } else {
        Box::new(ConsoleFormatter)
    };

    run_command(&cli.command, &pipeline, formatter.as_ref()).await?;

    if cli.command.mutates_state() && !pipeline.persist_data(&store).await {
        bail!("Failed to save snapshots to {}", data_dir.display());
    }

    Ok(())
}

async fn run_command(
    command: &Command,
    pipeline: &ToolInsightPipeline,
    formatter: &dyn OutputFormatter,
) -> Result<()> {
    match command {
        Command::Ingest { file } => {
            let reader = BufReader::new(
                File::open(file).with_context(|| format!("Cannot open {}", file.display()))?,
            );
            let summary = ingest::ingest(pipeline, reader)
                .with_context(|| format!("Failed reading {}", file.display()))?;
            println!(
                "Ingested {} events: {} evaluated, {} skipped",
                summary.lines, summary.evaluated, summary.skipped
            );
        }

        Command::Analyze => match pipeline.run_analysis().await {
            Some(snapshot) => println!("{}", formatter.format_patterns(&snapshot)),
            None => bail!("Analysis did not complete; previous patterns are unchanged"),
        },

        Command::Stats { tool } => {
            let stats: Vec<_> = match tool {
                Some(tool) => pipeline.tracker().get_tool_usage_stats(tool).into_iter().collect(),
                None => pipeline
                    .tracker()
                    .get_all_tool_usage_stats()
                    .into_values()
                    .collect(),
            };
            println!("{}", formatter.format_stats(&stats));
        }

        Command::History { tool } => {
            let entries = pipeline.tracker().get_context_history(tool.as_deref());
            println!("{}", formatter.format_history(&entries));
        }

        Command::Similar { context, threshold } => {
            let context = parse_context(context)?;
            let entries = pipeline.tracker().find_similar_contexts(&context, *threshold);
            println!("{}", formatter.format_history(&entries));
        }

        Command::Failures { tool } => {
            let patterns = pipeline.evaluator().identify_failure_patterns(tool);
            println!("{}", formatter.format_failures(tool, &patterns));
        }

        Command::Reliability { tool } => {
            let metrics = pipeline.evaluator().get_tool_reliability_metrics(tool);
            println!("{}", formatter.format_reliability(&metrics));
        }

        Command::Compare {
            tool_a,
            tool_b,
            context,
        } => {
            let filter = context.as_deref().map(parse_context).transpose()?;
            let comparison = pipeline
                .evaluator()
                .compare_outcomes(tool_a, tool_b, filter.as_ref());
            println!("{}", formatter.format_comparison(&comparison));
        }

        Command::Correlations { factor } => {
            let records = pipeline.analyzer().get_correlations(factor.as_deref());
            println!("{}", formatter.format_correlations(&records));
        }

        Command::Recommend { context, previous } => {
            let context = parse_context(context)?;
            let recommendation = pipeline
                .recommender()
                .recommend_tool_for_context(&context, previous);
            println!("{}", formatter.format_recommendation(recommendation.as_ref()));
        }

        Command::Feedback {
            tool,
            used,
            success,
            helpful,
            comments,
            context,
        } => {
            let Some(recommendation) = pipeline.recommender().latest_served_for(tool) else {
                bail!("No recommendation for {} has been served yet", tool);
            };
            let context = match context {
                Some(json) => parse_context(json)?,
                None => Context::new(),
            };
            let outcome = if *success {
                InvocationOutcome::success()
            } else {
                InvocationOutcome::failure("REPORTED_FAILURE", "reported through feedback")
            };
            let mut feedback = RecommendationFeedback::new(*used, *helpful);
            if let Some(comments) = comments {
                feedback = feedback.with_comments(comments);
            }
            pipeline
                .recommender()
                .record_recommendation_feedback(recommendation, context, outcome, feedback);
            println!("Recorded feedback for {}", tool);
        }

        Command::Performance { adjust } => {
            let adjustments = if *adjust {
                pipeline.recommender().adjust_confidence_thresholds()
            } else {
                Vec::new()
            };
            let report = pipeline.recommender().analyze_recommendation_performance();
            println!("{}", formatter.format_performance(&report, &adjustments));
        }

        Command::Export { format, output } => {
            let data = pipeline.evaluator().export_evaluation_data(format)?;
            match output {
                Some(path) => {
                    std::fs::write(path, data)
                        .with_context(|| format!("Cannot write {}", path.display()))?;
                    println!("Exported evaluations to {}", path.display());
                }
                None => println!("{}", data),
            }
        }

        // Handled before the pipeline is built
        Command::Config => {}
    }
    Ok(())
}

fn init_logging(verbose: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    // RUST_LOG wins over -v when set
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let file_name = path
                .file_name()
                .with_context(|| format!("--log-file {} does not name a file", path.display()))?;
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Cannot create log directory {}", dir.display()))?;

            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(file_layer)
        .init();

    Ok(guard)
}

/// `--data-dir` > `[storage] data_dir` > platform data dir > `./.toolwise`
fn resolve_data_dir(cli: &Cli, config: &FileConfig) -> PathBuf {
    cli.data_dir
        .clone()
        .or_else(|| config.storage.data_dir.clone())
        .or_else(JsonFileSnapshotStore::default_dir)
        .unwrap_or_else(|| PathBuf::from(".toolwise"))
}

fn parse_context(json: &str) -> Result<Context> {
    let value: serde_json::Value =
        serde_json::from_str(json).with_context(|| format!("Invalid context JSON: {}", json))?;
    match Context::from_json(&value) {
        Some(context) => Ok(context),
        None => bail!("Context must be a JSON object, got: {}", json),
    }
}

fn show_config(cli: &Cli, config: &FileConfig, data_dir: &Path) -> Result<()> {
    let analytics = config.analytics_config();
    if cli.json {
        let dump = serde_json::json!({
            "dataDir": data_dir,
            "analytics": analytics,
        });
        println!("{}", serde_json::to_string_pretty(&dump)?);
        return Ok(());
    }

    println!("Configuration sources (in priority order):");
    if cli.no_config {
        println!("  (configuration files disabled by --no-config)");
    } else {
        for source in ConfigLoader::config_sources(cli.config.as_deref()) {
            println!("  {}", source);
        }
    }
    println!();
    println!("Data directory: {}", data_dir.display());
    println!();
    println!("{}", serde_json::to_string_pretty(&analytics)?);
    Ok(())
}
