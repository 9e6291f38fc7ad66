//! # Mnemograph
//!
//! Command-line front end for the mnemograph knowledge graph store.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │              apps/mnemograph (THE BINARY)            │
//! │                                                      │
//! │  ┌────────────┐   ┌──────────────┐   ┌────────────┐  │
//! │  │    CLI     │──▶│   dispatch   │◀──│   config   │  │
//! │  │  (clap)    │   │ (JSON lines) │   │   (TOML)   │  │
//! │  └────────────┘   └──────┬───────┘   └────────────┘  │
//! │                          ▼                           │
//! │                 ┌──────────────────┐                 │
//! │                 │ mnemograph-core  │                 │
//! │                 │   (THE STORE)    │                 │
//! │                 └──────────────────┘                 │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! mnemograph call '{"operation":"read_graph"}'
//! mnemograph --file ./graph.jsonl serve < requests.jsonl
//! mnemograph export --format csv --tag work --output work.csv
//! ```
//!
//! Logging goes to stderr; stdout carries only responses and exports.

mod cli;

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    init_tracing(cli.verbose);

    match cli::execute(cli) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// MNEMOGRAPH_LOG overrides the filter; MNEMOGRAPH_LOG_FORMAT=json switches
/// to machine-parseable output.
fn init_tracing(verbose: bool) {
    let default_level = if verbose {
        "mnemograph=debug"
    } else {
        "mnemograph=info"
    };
    let filter = EnvFilter::try_from_env("MNEMOGRAPH_LOG").unwrap_or_else(|_| default_level.into());
    let log_format = std::env::var("MNEMOGRAPH_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
