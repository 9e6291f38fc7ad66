//! # Export Module
//!
//! Render a graph (or a date-range-filtered slice of it) as JSON, CSV or
//! GraphML.
//!
//! - JSON is pretty-printed and re-importable: each object plus a `type`
//!   tag is a valid backing-file record.
//! - CSV has an entities section and a relations section.
//! - GraphML declares typed keys for every entity and relation attribute.

mod csv;
mod graphml;

use crate::GraphError;
use crate::graph::Graph;
use crate::query::DateRangeQuery;
use std::fmt;
use std::str::FromStr;

pub use csv::to_csv;
pub use graphml::to_graphml;

/// Narrowing applied before export. Same fields and rules as the
/// date-range search; an unbounded filter exports the whole graph.
pub type ExportFilter = DateRangeQuery;

// =============================================================================
// FORMAT
// =============================================================================

/// Supported export encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Json,
    Csv,
    GraphMl,
}

impl ExportFormat {
    /// Canonical lowercase identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::GraphMl => "graphml",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = GraphError;

    /// Case-insensitive; `xml` is accepted for GraphML.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "graphml" | "xml" => Ok(Self::GraphMl),
            _ => Err(GraphError::UnsupportedFormat(s.to_string())),
        }
    }
}

// =============================================================================
// ENCODING
// =============================================================================

/// Encode `graph` in `format`.
pub fn encode(graph: &Graph, format: ExportFormat) -> Result<String, GraphError> {
    match format {
        ExportFormat::Json => to_json(graph),
        ExportFormat::Csv => Ok(to_csv(graph)),
        ExportFormat::GraphMl => Ok(to_graphml(graph)),
    }
}

/// Pretty-printed `{"entities": [...], "relations": [...]}`.
pub fn to_json(graph: &Graph) -> Result<String, GraphError> {
    serde_json::to_string_pretty(graph).map_err(|e| GraphError::Serialization(e.to_string()))
}

// =============================================================================
// TESTS
// =============================================================================
