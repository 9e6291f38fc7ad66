//! # mnemograph
//!
//! The binary's library half: configuration resolution and the JSON request
//! dispatcher. The CLI in `main.rs` is a thin shell over these.

pub mod config;
pub mod dispatch;
