//! Batch intake and the label-and-promote workflow.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::error::PipelineError;
use crate::model::{
    ArtifactPayload, Conversation, GenerationBatch, GenerationResult, Label, PromotedDocument,
};
use crate::storage::{BatchRepository, DocumentStore};

/// Entry point for persisting generation batches and labeling their
/// results.
///
/// Stores are injected at construction so the service runs identically
/// over PostgreSQL and the in-memory store.
pub struct CurationService {
    batches: Arc<dyn BatchRepository>,
    documents: Arc<dyn DocumentStore>,
}

impl CurationService {
    pub fn new(batches: Arc<dyn BatchRepository>, documents: Arc<dyn DocumentStore>) -> Self {
        Self { batches, documents }
    }

    /// Persists a batch with its results and conversations as one unit.
    ///
    /// The batch is validated before anything is written. Individual
    /// conversation failures inside the unit are tolerated by the
    /// store; a batch or result failure aborts the whole save.
    pub async fn save_batch(
        &self,
        batch: &GenerationBatch,
        results: &[GenerationResult],
        conversations: &[Conversation],
    ) -> Result<(), PipelineError> {
        batch.validate()?;
        self.batches
            .transactional_save_batch(batch, results, conversations)
            .await?;
        info!(
            batch_id = %batch.batch_id,
            user_id = %batch.user_id,
            results = results.len(),
            conversations = conversations.len(),
            "saved generation batch"
        );
        Ok(())
    }

    /// Writes a label and, for a positive label, promotes the result's
    /// artifact to a document.
    ///
    /// Returns the promoted document id when one is created. The label
    /// write is atomic and keeps `labeled_at` in step; a later
    /// promotion failure fails the call without rolling the label
    /// back.
    pub async fn label_result(
        &self,
        user_id: Uuid,
        result_id: &str,
        label_value: i16,
    ) -> Result<Option<String>, PipelineError> {
        let label = Label::try_from(label_value)?;

        let affected = self.batches.update_result_label(result_id, label).await?;
        if affected == 0 {
            return Err(PipelineError::ResultNotFound(result_id.to_string()));
        }
        info!(result_id = %result_id, label = label.as_i16(), "label written");

        if label != Label::Positive {
            return Ok(None);
        }

        let result = self.batches.get_result(result_id).await?;
        let batch = self.batches.get_batch(&result.batch_id, user_id).await?;
        let payload = ArtifactPayload::decode(&result.artifact_payload)?;
        let document = PromotedDocument::from_payload(user_id, &batch.batch_id, &payload)?;
        self.documents.create_document(&document).await?;

        info!(
            document_id = %document.document_id,
            result_id = %result_id,
            batch_id = %batch.batch_id,
            "promoted labeled result to document"
        );
        Ok(Some(document.document_id))
    }
}
