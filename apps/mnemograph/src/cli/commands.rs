//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use anyhow::Context;
use mnemograph::dispatch::{Response, handle_line};
use mnemograph_core::{ExportFilter, JsonlStore, Session, Timestamp};
use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::path::Path;
use std::process::ExitCode;

// =============================================================================
// CALL COMMAND
// =============================================================================

/// Run one request and print its response. Fails the process exit code when
/// the response is an error.
pub fn cmd_call(session: &Session<JsonlStore>, request: &str) -> anyhow::Result<ExitCode> {
    let text = if request == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Cannot read request from stdin")?;
        buffer
    } else {
        request.to_string()
    };

    let response = handle_line(session, text.trim());
    print_response(&mut io::stdout().lock(), &response)?;
    Ok(if response.ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

// =============================================================================
// SERVE COMMAND
// =============================================================================

/// Answer requests until stdin closes. Blank lines are skipped.
pub fn cmd_serve(session: &Session<JsonlStore>) -> anyhow::Result<ExitCode> {
    tracing::info!(
        file = %session.store().path().display(),
        "Serving requests on stdin"
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    let mut served = 0usize;
    for line in stdin.lock().lines() {
        let line = line.context("Cannot read request line")?;
        if line.trim().is_empty() {
            continue;
        }
        let response = handle_line(session, &line);
        print_response(&mut stdout, &response)?;
        served += 1;
    }

    tracing::info!(served, "Input closed, shutting down");
    Ok(ExitCode::SUCCESS)
}

fn print_response(out: &mut impl Write, response: &Response) -> anyhow::Result<()> {
    let line = serde_json::to_string(response).context("Cannot encode response")?;
    writeln!(out, "{}", line)?;
    out.flush()?;
    Ok(())
}

// =============================================================================
// STATS COMMAND
// =============================================================================

/// Print statistics as pretty JSON.
pub fn cmd_stats(session: &Session<JsonlStore>) -> anyhow::Result<ExitCode> {
    let stats = session.stats()?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(ExitCode::SUCCESS)
}

// =============================================================================
// EXPORT COMMAND
// =============================================================================

/// Filter flags of the `export` command.
#[derive(Debug, Clone, Default)]
pub struct ExportArgs {
    pub start: Option<Timestamp>,
    pub end: Option<Timestamp>,
    pub entity_type: Option<String>,
    pub tags: Vec<String>,
}

impl From<ExportArgs> for ExportFilter {
    fn from(args: ExportArgs) -> Self {
        Self {
            start_date: args.start,
            end_date: args.end,
            entity_type: args.entity_type,
            tags: (!args.tags.is_empty()).then_some(args.tags),
        }
    }
}

/// Export to `output`, or to stdout when no output path is given.
pub fn cmd_export(
    session: &Session<JsonlStore>,
    format: &str,
    output: Option<&Path>,
    args: ExportArgs,
) -> anyhow::Result<ExitCode> {
    let filter = ExportFilter::from(args);
    let rendered = session.export_graph(format, &filter)?;

    match output {
        Some(path) => {
            fs::write(path, &rendered)
                .with_context(|| format!("Cannot write export to {}", path.display()))?;
            tracing::info!(
                format,
                output = %path.display(),
                bytes = rendered.len(),
                "Export written"
            );
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(rendered.as_bytes())?;
            if !rendered.ends_with('\n') {
                writeln!(stdout)?;
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
