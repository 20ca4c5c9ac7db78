//! Command-line interface for tuneforge.
//!
//! Provides commands for schema migration, batch import, labeling, and
//! dataset export.

mod commands;

pub use commands::{parse_cli, run, run_with_cli};
