//! Label-based selection over fetched results.
//!
//! Pure functions with no storage access. Input order is preserved, so
//! callers that fetch in creation order emit in creation order.

use crate::model::{GenerationResult, Label};

/// Results labeled as good examples, in input order.
pub fn select_positive(results: &[GenerationResult]) -> Vec<&GenerationResult> {
    results
        .iter()
        .filter(|r| r.label == Label::Positive)
        .collect()
}

/// Results labeled as bad examples, in input order.
pub fn select_negative(results: &[GenerationResult]) -> Vec<&GenerationResult> {
    results
        .iter()
        .filter(|r| r.label == Label::Negative)
        .collect()
}
