//! Storage contracts consumed by the curation and export layers.
//!
//! All collaborators are injected behind these traits, so the pipeline
//! logic runs unchanged against PostgreSQL or the in-memory store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::PipelineError;
use crate::model::{Conversation, GenerationBatch, GenerationResult, Label, PromotedDocument};

/// Hard cap on the page size any implementation will serve.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Optional inclusive time window over result creation time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateWindow {
    /// Earliest creation time to include.
    pub start: Option<DateTime<Utc>>,

    /// Latest creation time to include.
    pub end: Option<DateTime<Utc>>,
}

impl DateWindow {
    /// Unbounded window.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Window bounded on both sides.
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// Rejects windows whose start lies after their end.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start > end {
                return Err(PipelineError::InvalidDateRange { start, end });
            }
        }
        Ok(())
    }

    /// Whether a timestamp falls inside the window (bounds inclusive).
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        if let Some(start) = self.start {
            if at < start {
                return false;
            }
        }
        if let Some(end) = self.end {
            if at > end {
                return false;
            }
        }
        true
    }
}

/// Per-item report of a bulk conversation save.
///
/// Individual failures are part of the outcome, not a top-level error.
#[derive(Debug, Clone, Default)]
pub struct BulkSaveOutcome {
    /// Conversation ids that were persisted.
    pub saved: Vec<String>,

    /// Conversation ids that failed, with the failure message.
    pub failed: Vec<(String, String)>,
}

impl BulkSaveOutcome {
    /// Whether every item was persisted.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Persistence contract for generation batches and their results.
#[async_trait]
pub trait BatchRepository: Send + Sync {
    /// Persists a new batch.
    async fn create_batch(&self, batch: &GenerationBatch) -> Result<(), PipelineError>;

    /// Fetches one batch, scoped to its owner.
    ///
    /// A missing batch is `BatchNotFound`; an existing batch owned by a
    /// different user is `PermissionDenied`.
    async fn get_batch(
        &self,
        batch_id: &str,
        user_id: Uuid,
    ) -> Result<GenerationBatch, PipelineError>;

    /// Lists a user's batches, newest first, with the total count.
    ///
    /// `page` is 1-based. Out-of-range paging inputs are clamped, not
    /// rejected.
    async fn list_batches(
        &self,
        user_id: Uuid,
        page: u32,
        page_size: u32,
    ) -> Result<(Vec<GenerationBatch>, u64), PipelineError>;

    /// Persists a set of results in one statement.
    async fn bulk_create_results(&self, results: &[GenerationResult]) -> Result<(), PipelineError>;

    /// All results of a batch, ascending by creation time.
    async fn get_results_by_batch(
        &self,
        batch_id: &str,
    ) -> Result<Vec<GenerationResult>, PipelineError>;

    /// Fetches one result.
    async fn get_result(&self, result_id: &str) -> Result<GenerationResult, PipelineError>;

    /// Writes a label in a single update that also maintains `labeled_at`
    /// (set iff the label is not `Unlabeled`). Returns the affected row
    /// count; zero means the result does not exist.
    async fn update_result_label(
        &self,
        result_id: &str,
        label: Label,
    ) -> Result<u64, PipelineError>;

    /// Labeled results of a user inside a window, ascending by creation
    /// time. Scoping goes through the owning batch.
    async fn get_labeled_results(
        &self,
        user_id: Uuid,
        window: &DateWindow,
    ) -> Result<Vec<GenerationResult>, PipelineError>;

    /// Saves a batch, its conversations, and its results as one atomic
    /// unit.
    ///
    /// An individual conversation failure is tolerated and skipped; a
    /// batch or result failure aborts and rolls back everything.
    async fn transactional_save_batch(
        &self,
        batch: &GenerationBatch,
        results: &[GenerationResult],
        conversations: &[Conversation],
    ) -> Result<(), PipelineError>;
}

/// Persistence contract for conversation transcripts.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Fetches one conversation, scoped to its owner.
    async fn get(&self, conversation_id: &str, user_id: Uuid)
        -> Result<Conversation, PipelineError>;

    /// Saves many conversations, reporting per-item outcomes.
    async fn bulk_save(
        &self,
        conversations: &[Conversation],
    ) -> Result<BulkSaveOutcome, PipelineError>;
}

/// Persistence contract for promoted documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Persists a new document.
    async fn create_document(&self, document: &PromotedDocument) -> Result<(), PipelineError>;
}
