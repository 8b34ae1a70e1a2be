//! Command-line interface for quiz_forge.
//!
//! Provides one command per coordinator operation: create, advance, run,
//! status and results.

mod commands;

pub use commands::{parse_cli, run, run_with_cli, Cli, Commands};
