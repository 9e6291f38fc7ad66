//! # System Module
//!
//! Derived, never-persisted views over the whole graph.

mod stats;

pub use stats::*;
