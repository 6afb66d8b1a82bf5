//! Subcommand implementations.

pub mod analyze;
pub mod config;
pub mod modules;
