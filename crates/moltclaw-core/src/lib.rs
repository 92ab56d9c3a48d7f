//! Core types, config, and errors for moltclaw.

pub mod config;
pub mod error;
pub mod types;
