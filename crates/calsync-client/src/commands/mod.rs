//! Subcommand implementations.

pub mod config;
pub mod infer;
pub mod mapping;
pub mod sync;
