//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific
//! modules.

mod ask;
mod extract_cmd;
mod ingest_cmd;
mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::load_settings;

#[derive(Parser)]
#[command(name = "mindex")]
#[command(about = "Personal document ingestion and research system")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Extract text from documents into cached artifacts
    Extract {
        /// File or directory to extract (defaults to the configured input dir)
        path: Option<PathBuf>,
        /// Artifact output directory (overrides config)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Force CPU recognition even if a GPU is available
        #[arg(long)]
        force_cpu: bool,
        /// Override the OCR worker cap
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Chunk extracted artifacts and add them to the vector store
    Ingest {
        /// Re-chunk sources that already have chunks
        #[arg(long)]
        force: bool,
    },

    /// Ask a question over the ingested corpus
    Ask {
        /// The question to answer
        question: Vec<String>,
        /// How many chunks to retrieve as context
        #[arg(short = 'k', long, default_value = "5")]
        top_k: usize,
        /// Maximum tokens in the generated answer
        #[arg(long, default_value = "512")]
        max_tokens: u32,
    },

    /// Check external tool and service availability
    Status,
}

/// Parse arguments and run the selected command.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut settings = load_settings(cli.config.as_deref())?;

    match cli.command {
        Commands::Extract {
            path,
            output,
            force_cpu,
            workers,
        } => {
            if force_cpu {
                settings.ocr.force_cpu = true;
            }
            if let Some(workers) = workers {
                settings.ocr.max_workers = workers;
            }
            if let Some(output) = output {
                settings.paths.output_dir = output;
            }
            extract_cmd::run(&settings, path.as_deref()).await
        }
        Commands::Ingest { force } => ingest_cmd::run(&settings, force),
        Commands::Ask {
            question,
            top_k,
            max_tokens,
        } => ask::run(&settings, &question.join(" "), top_k, max_tokens).await,
        Commands::Status => status::run(&settings).await,
    }
}
