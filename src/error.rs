//! Error types for curation pipeline operations.
//!
//! A single closed taxonomy covers every fallible pipeline operation
//! (batch save, labeling, promotion, export). Each variant maps to exactly
//! one [`ErrorKind`], the classification callers switch on when deciding
//! how to surface a failure. Matching on error message strings is never
//! necessary.

use thiserror::Error;
use uuid::Uuid;

use crate::model::{GENERATION_COUNT_MAX, GENERATION_COUNT_MIN};

/// Closed classification of pipeline errors.
///
/// `Validation` failures have no partial effect. `NotFound` and
/// `Permission` are deliberately distinct so callers can map them to
/// different responses. `Internal` covers repository and serialization
/// failures that abort the whole operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller-supplied input violated a domain invariant.
    Validation,
    /// A referenced entity does not exist in the caller's scope.
    NotFound,
    /// The entity exists but belongs to a different user.
    Permission,
    /// Repository, serialization, or other infrastructure failure.
    Internal,
}

/// Errors produced by the curation pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Label value outside the {-1, 0, 1} domain.
    #[error("invalid label {0}: must be -1 (negative), 0 (unlabeled) or 1 (positive)")]
    InvalidLabel(i16),

    /// Generation count outside the permitted range.
    #[error("invalid generation count {0}: must be between {GENERATION_COUNT_MIN} and {GENERATION_COUNT_MAX}")]
    InvalidGenerationCount(i16),

    /// Unknown generation strategy discriminant.
    #[error("invalid generation strategy {0}: must be 1 (parallel diversified) or 2 (single-call diverse)")]
    InvalidStrategy(i16),

    /// Batch input text was empty after normalization.
    #[error("batch input text must not be empty")]
    EmptyInput,

    /// Export window with start after end.
    #[error("invalid date window: start {start} is after end {end}")]
    InvalidDateRange {
        start: chrono::DateTime<chrono::Utc>,
        end: chrono::DateTime<chrono::Utc>,
    },

    /// Conversation too short to form a training exchange.
    #[error("conversation '{conversation_id}' has {count} message(s); a training record needs at least 2")]
    InsufficientMessages {
        conversation_id: String,
        count: usize,
    },

    /// Artifact payload failed the typed decode.
    #[error("malformed artifact payload: {0}")]
    MalformedArtifact(String),

    /// No batch row for the given identifier.
    #[error("batch '{0}' not found")]
    BatchNotFound(String),

    /// No result row for the given identifier.
    #[error("result '{0}' not found")]
    ResultNotFound(String),

    /// No conversation for the given identifier in the user's scope.
    #[error("conversation '{0}' not found")]
    ConversationNotFound(String),

    /// Entity exists but is owned by a different user.
    #[error("batch '{batch_id}' does not belong to user {user_id}")]
    PermissionDenied { batch_id: String, user_id: Uuid },

    /// A unique-key conflict aborted the whole unit of work.
    #[error("duplicate key: {0}")]
    Conflict(String),

    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// JSON encode/decode failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PipelineError {
    /// Returns the closed classification for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::InvalidLabel(_)
            | PipelineError::InvalidGenerationCount(_)
            | PipelineError::InvalidStrategy(_)
            | PipelineError::EmptyInput
            | PipelineError::InvalidDateRange { .. }
            | PipelineError::InsufficientMessages { .. }
            | PipelineError::MalformedArtifact(_) => ErrorKind::Validation,
            PipelineError::BatchNotFound(_)
            | PipelineError::ResultNotFound(_)
            | PipelineError::ConversationNotFound(_) => ErrorKind::NotFound,
            PipelineError::PermissionDenied { .. } => ErrorKind::Permission,
            PipelineError::Conflict(_)
            | PipelineError::Database(_)
            | PipelineError::Serialization(_) => ErrorKind::Internal,
        }
    }
}
