//! # Mnemograph CLI Module
//!
//! ## Available Commands
//!
//! - `call` - Run one JSON request and print the response
//! - `serve` - Answer line-delimited JSON requests on stdin
//! - `stats` - Print graph statistics
//! - `export` - Export the graph as JSON, CSV or GraphML

mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand};
use mnemograph::config::{Settings, migrate_legacy_file};
use mnemograph_core::Timestamp;
use std::path::PathBuf;
use std::process::ExitCode;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Mnemograph - a durable, queryable knowledge graph in one JSONL file.
#[derive(Parser, Debug)]
#[command(name = "mnemograph")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the backing file
    #[arg(short, long, global = true, env = "MNEMOGRAPH_FILE_PATH")]
    pub file: Option<PathBuf>,

    /// Path to a TOML config file (default: ./mnemograph.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one request, e.g. '{"operation":"read_graph"}'; "-" reads stdin
    Call {
        /// Request JSON, or "-" for stdin
        request: String,
    },

    /// Answer one JSON request per stdin line with one JSON response per line
    Serve,

    /// Print graph statistics
    Stats,

    /// Export the graph
    Export {
        /// Export format (json, csv, graphml)
        #[arg(short = 't', long, default_value = "json")]
        format: String,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Only entities modified at or after this RFC 3339 instant
        #[arg(long)]
        start: Option<Timestamp>,

        /// Only entities modified at or before this RFC 3339 instant
        #[arg(long)]
        end: Option<Timestamp>,

        /// Only entities of this type
        #[arg(long)]
        entity_type: Option<String>,

        /// Only entities carrying one of these tags (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> anyhow::Result<ExitCode> {
    let working_dir = std::env::current_dir().context("Cannot determine working directory")?;
    let settings = Settings::resolve(cli.file, cli.config.as_deref(), &working_dir)?;
    migrate_legacy_file(&settings.file_path)?;
    tracing::debug!(file = %settings.file_path.display(), "Resolved backing file");

    let session = settings.open_session();

    match cli.command {
        Commands::Call { request } => cmd_call(&session, &request),
        Commands::Serve => cmd_serve(&session),
        Commands::Stats => cmd_stats(&session),
        Commands::Export {
            format,
            output,
            start,
            end,
            entity_type,
            tags,
        } => cmd_export(
            &session,
            &format,
            output.as_deref(),
            ExportArgs {
                start,
                end,
                entity_type,
                tags,
            },
        ),
    }
}
