//! CLI command definitions and subcommands

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

use crate::chunker::ChunkMode;
use crate::config::Overrides;
use crate::llm::Model;

/// docsqueeze - rewrite long documents into compact prompt material
#[derive(Parser)]
#[command(
    name = "dq",
    about = "Chunk documents and rewrite them batch by batch through a chat model",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Rewrite every matching file under a GitHub repository path
    Github {
        /// Repository URL, e.g. https://github.com/owner/repo/tree/main/docs
        url: String,

        /// File extension to include (repeatable, replaces the configured list)
        #[arg(long = "ext", value_name = "EXT")]
        extensions: Vec<String>,

        #[command(flatten)]
        rewrite: RewriteArgs,
    },

    /// Rewrite one local file
    File {
        /// Path to the document
        path: PathBuf,

        #[command(flatten)]
        rewrite: RewriteArgs,
    },

    /// Show how a local file would be chunked and batched, without rewriting
    Plan {
        /// Path to the document
        path: PathBuf,

        /// Words per chunk and per batch
        #[arg(short, long)]
        target_words: Option<usize>,

        /// Chunking mode (auto, plain, markdown)
        #[arg(short, long)]
        mode: Option<ChunkMode>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

/// Flags shared by the rewriting commands
#[derive(Debug, Clone, Default, Args)]
pub struct RewriteArgs {
    /// Model (gpt-4, gpt-4-32k, gpt-3.5-turbo)
    #[arg(long)]
    pub model: Option<Model>,

    /// Words per chunk and per batch
    #[arg(short, long)]
    pub target_words: Option<usize>,

    /// Chunking mode (auto, plain, markdown)
    #[arg(short, long)]
    pub mode: Option<ChunkMode>,

    /// File the rewritten text is appended to
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Log every prompt and response
    #[arg(long)]
    pub debug: bool,

    /// Read the system instruction from a file
    #[arg(long, value_name = "FILE")]
    pub system_instruction_file: Option<PathBuf>,
}

impl RewriteArgs {
    /// Turn the flags into config overrides, reading the instruction file
    pub fn into_overrides(self, extensions: Option<Vec<String>>) -> eyre::Result<Overrides> {
        debug!(?self, "RewriteArgs::into_overrides: called");
        let system_instruction = match &self.system_instruction_file {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .map_err(|e| eyre::eyre!("Failed to read system instruction {}: {}", path.display(), e))?;
                Some(text.trim().to_string())
            }
            None => None,
        };

        Ok(Overrides {
            model: self.model,
            target_words: self.target_words,
            mode: self.mode,
            system_instruction,
            debug: self.debug,
            output: self.output,
            extensions,
        })
    }
}

/// Output format for the plan command
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}
