//! Curation workflows over stored generation batches.

pub mod service;

pub use service::CurationService;
