//! # mnemograph-core
//!
//! A small, durable, queryable graph of named entities and typed relations,
//! persisted as one line-delimited JSON file.
//!
//! ## Layout
//!
//! - `types`: entities, relations, timestamps, request and result values,
//!   `GraphError`
//! - `formats`: one backing-file line ↔ one tagged record
//! - `graph`: the in-memory `Graph` and the `GraphStore` seam
//! - `storage`: `JsonlStore`, the file-backed store with atomic rewrite and
//!   a lock file
//! - `mutation`: pure transforms that keep the data-model invariants
//! - `query` / `system`: read-only projections and statistics
//! - `export`: JSON, CSV and GraphML encoders
//! - `session`: the handle that runs load → transform → save per call
//!
//! ## Constraints
//!
//! - No global state: a `Session` is built from a store and a `Clock`
//! - Sync only, no async runtime
//! - Every operation reads the whole file; mutations rewrite it whole

// =============================================================================
// MODULES
// =============================================================================

pub mod clock;
pub mod export;
pub mod formats;
pub mod graph;
pub mod mutation;
pub mod primitives;
pub mod query;
pub mod session;
pub mod storage;
pub mod system;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    AddedObservations, Entity, ErrorKind, GraphError, ImportanceSet, NewEntity, NewRelation,
    ObservationAddition, ObservationDeletion, Relation, RelationKey, TagsAdded, TagsRemoved,
    Timestamp,
};

// =============================================================================
// RE-EXPORTS: Graph Engine
// =============================================================================

pub use clock::{Clock, ManualClock, SystemClock};
pub use export::{ExportFilter, ExportFormat};
pub use graph::{Graph, GraphStore, InMemoryStore};
pub use mutation::{EndpointStamping, MutationEngine, Removed};
pub use query::{DateRangeQuery, QueryEngine, SearchQuery};
pub use session::Session;
pub use storage::{JsonlStore, StoreLock, StoreOptions};

// =============================================================================
// RE-EXPORTS: Formats (from formats module)
// =============================================================================

pub use formats::{Record, graph_from_text, graph_to_text};

// =============================================================================
// RE-EXPORTS: System (from system module)
// =============================================================================

pub use system::{DateRange, EntityMarker, GraphStats, RelationMarker};
