//! dq - docsqueeze command-line entry point
//!
//! Rewrites a local file or a GitHub repository path into a compact output
//! document, or shows the chunk/batch plan for a file.

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info};

use docsqueeze::cli::{Cli, Command, OutputFormat, RewriteArgs};
use docsqueeze::config::{Config, Overrides};
use docsqueeze::llm::create_client;
use docsqueeze::{
    Dispatcher, DocumentSource, FileSink, GithubSource, LocalFileSource, Pipeline, Rewriter, RunSummary,
};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    // stdout carries plan output, so logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .try_init()
        .map_err(|e| eyre::eyre!("Failed to install log subscriber: {}", e))?;

    debug!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());

    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Github {
            url,
            extensions,
            rewrite,
        } => {
            let extensions = (!extensions.is_empty()).then_some(extensions);
            apply(&mut config, rewrite, extensions)?;
            let source = GithubSource::from_config(&url, &config.github).context("Invalid GitHub source")?;
            cmd_rewrite(&config, Box::new(source)).await
        }
        Command::File { path, rewrite } => {
            apply(&mut config, rewrite, None)?;
            cmd_rewrite(&config, Box::new(LocalFileSource::new(path))).await
        }
        Command::Plan {
            path,
            target_words,
            mode,
            format,
        } => {
            config.apply(Overrides {
                target_words,
                mode,
                ..Overrides::default()
            });
            config.validate().context("Invalid configuration")?;
            cmd_plan(&config, LocalFileSource::new(path), format).await
        }
    }
}

fn apply(config: &mut Config, rewrite: RewriteArgs, extensions: Option<Vec<String>>) -> Result<()> {
    config.apply(rewrite.into_overrides(extensions)?);
    config.validate().context("Invalid configuration")
}

/// Run the full pipeline from `source` into the configured output file
async fn cmd_rewrite(config: &Config, source: Box<dyn DocumentSource>) -> Result<()> {
    debug!(source = %source.describe(), "cmd_rewrite: called");
    let llm = create_client(&config.llm).context("Failed to create LLM client")?;
    let rewriter = Rewriter::from_config(llm, config);
    let dispatcher = Dispatcher::new(rewriter, config.rewrite.target_words);
    let pipeline = Pipeline::new(source, dispatcher, config.rewrite.mode);

    info!(
        model = %config.rewrite.model,
        target_words = config.rewrite.target_words,
        output = %config.output.file.display(),
        "Rewriting"
    );
    let mut sink = FileSink::new(&config.output.file);
    let summary = pipeline.run(&mut sink).await.context("Rewrite failed")?;

    print_summary(&summary, &sink);
    if !summary.is_success() {
        return Err(eyre::eyre!(
            "{} of {} documents failed",
            summary.failures.len(),
            summary.documents()
        ));
    }
    Ok(())
}

fn print_summary(summary: &RunSummary, sink: &FileSink) {
    for report in &summary.reports {
        println!(
            "{} {} ({} batches, {} -> {} words)",
            "✓".green(),
            report.id,
            report.batches,
            report.words_in,
            report.words_out
        );
    }
    for failure in &summary.failures {
        println!("{} {}: {}", "✗".red(), failure.id, failure.error);
    }

    if sink.bytes_written() > 0 {
        println!(
            "{} {} documents, {} batches, {} -> {} words, written to {}",
            "Done:".bold(),
            summary.reports.len(),
            summary.batches(),
            summary.words_in(),
            summary.words_out(),
            sink.path().display().to_string().cyan()
        );
    } else {
        println!("{} no output written", "Done:".bold());
    }
}

/// Print the chunk and batch plan for a local file
async fn cmd_plan(config: &Config, source: LocalFileSource, format: OutputFormat) -> Result<()> {
    debug!(path = %source.path().display(), %format, "cmd_plan: called");
    let ids = source.list().await?;
    for id in ids {
        let document = source.fetch(&id).await?;
        let plan = docsqueeze::plan(&document, config.rewrite.mode, config.rewrite.target_words);

        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
            OutputFormat::Text => {
                println!(
                    "{} ({} mode, {} words, target {})",
                    plan.id.bold(),
                    plan.mode,
                    plan.words,
                    plan.target
                );
                println!("  {} chunks, {} batches", plan.chunks.len(), plan.batches.len());
                for batch in &plan.batches {
                    let marker = if batch.is_oversized(plan.target) {
                        format!("{} words (oversized)", batch.words).yellow()
                    } else {
                        format!("{} words", batch.words).normal()
                    };
                    println!("  batch {:>3}: {:>2} chunks, {}  {}", batch.index, batch.chunks, marker, preview(&batch.text));
                }
            }
        }
    }
    Ok(())
}

/// First line of a batch, shortened for display
fn preview(text: &str) -> String {
    const MAX: usize = 60;
    let line = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("").trim();
    if line.chars().count() > MAX {
        format!("{}...", line.chars().take(MAX).collect::<String>())
    } else {
        line.to_string()
    }
}
