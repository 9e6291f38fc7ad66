//! # Formats Module
//!
//! The on-disk record format. File I/O lives in `storage`; everything here
//! is a pure transformation between text and in-memory values.

mod record;

pub use record::*;
