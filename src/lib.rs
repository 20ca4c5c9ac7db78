//! tuneforge: labeling and training-dataset export for generated documents.
//!
//! This library persists generation batches, runs the label-and-promote
//! curation workflow, and exports labeled results as SFT/DPO JSONL
//! datasets for fine-tuning.

// Core modules
pub mod cli;
pub mod config;
pub mod curation;
pub mod error;
pub mod export;
pub mod model;
pub mod storage;

// Re-export commonly used error types
pub use config::ConfigError;
pub use error::{ErrorKind, PipelineError};
pub use storage::MigrationError;
