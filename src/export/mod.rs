//! Training-dataset export.
//!
//! Turns labeled generation results into SFT and DPO JSONL, one record
//! per line. Sampling and record building are pure; the orchestrator
//! owns storage access and skip handling.

pub mod orchestrator;
pub mod records;
pub mod sampling;

pub use orchestrator::{DatasetExporter, MAX_NEGATIVES_PER_POSITIVE};
pub use records::{
    build_dpo_record, build_sft_record, DpoMessage, DpoRecord, SftRecord, TrainingMessage,
    THINKING_MARKER,
};
pub use sampling::{select_negative, select_positive};
