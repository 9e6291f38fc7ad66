//! # Storage Module
//!
//! File-backed implementation of `GraphStore`.
//!
//! - `JsonlStore`: one record per line, atomic temp-file-and-rename rewrite,
//!   bounded retries on transient I/O errors
//! - `StoreLock`: a lock file held across one load→save window, so that two
//!   processes sharing a backing file cannot interleave their rewrites

mod jsonl_store;
mod lock;

pub use jsonl_store::{JsonlStore, StoreOptions};
pub use lock::StoreLock;
