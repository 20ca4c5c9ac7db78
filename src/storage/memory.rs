//! In-memory store for tests and local runs.
//!
//! Implements the same contracts as the PostgreSQL client, with the same
//! observable behavior: duplicate-key inserts fail the way unique
//! violations do, the batch save is all-or-nothing, and listings come
//! back in stable creation order.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

use crate::error::PipelineError;
use crate::model::{Conversation, GenerationBatch, GenerationResult, Label, PromotedDocument};

use super::contract::{
    BatchRepository, BulkSaveOutcome, ConversationStore, DateWindow, DocumentStore, MAX_PAGE_SIZE,
};

#[derive(Default)]
struct MemoryInner {
    batches: HashMap<String, GenerationBatch>,
    results: HashMap<String, GenerationResult>,
    conversations: HashMap<String, Conversation>,
    documents: HashMap<String, PromotedDocument>,
    /// Insertion order, used to break creation-time ties deterministically.
    arrival: HashMap<String, u64>,
    next_seq: u64,
}

impl MemoryInner {
    fn stamp(&mut self, id: &str) {
        self.arrival.insert(id.to_string(), self.next_seq);
        self.next_seq += 1;
    }

    fn seq(&self, id: &str) -> u64 {
        self.arrival.get(id).copied().unwrap_or(u64::MAX)
    }
}

/// Map-backed implementation of all three storage contracts.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// All promoted documents, in creation order. Inspection helper for
    /// tests and local tooling.
    pub async fn documents(&self) -> Vec<PromotedDocument> {
        let inner = self.inner.lock().await;
        let mut docs: Vec<&PromotedDocument> = inner.documents.values().collect();
        docs.sort_by_key(|d| inner.seq(&d.document_id));
        docs.into_iter().cloned().collect()
    }

    /// Number of stored conversations. Inspection helper.
    pub async fn conversation_count(&self) -> usize {
        self.inner.lock().await.conversations.len()
    }
}

#[async_trait]
impl BatchRepository for MemoryStore {
    async fn create_batch(&self, batch: &GenerationBatch) -> Result<(), PipelineError> {
        let mut inner = self.inner.lock().await;
        if inner.batches.contains_key(&batch.batch_id) {
            return Err(PipelineError::Conflict(format!(
                "batch {} already exists",
                batch.batch_id
            )));
        }
        inner.stamp(&batch.batch_id);
        inner.batches.insert(batch.batch_id.clone(), batch.clone());
        Ok(())
    }

    async fn get_batch(
        &self,
        batch_id: &str,
        user_id: Uuid,
    ) -> Result<GenerationBatch, PipelineError> {
        let inner = self.inner.lock().await;
        let batch = inner
            .batches
            .get(batch_id)
            .ok_or_else(|| PipelineError::BatchNotFound(batch_id.to_string()))?;

        if batch.user_id != user_id {
            return Err(PipelineError::PermissionDenied {
                batch_id: batch_id.to_string(),
                user_id,
            });
        }

        Ok(batch.clone())
    }

    async fn list_batches(
        &self,
        user_id: Uuid,
        page: u32,
        page_size: u32,
    ) -> Result<(Vec<GenerationBatch>, u64), PipelineError> {
        let page = page.max(1);
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);

        let inner = self.inner.lock().await;
        let mut owned: Vec<&GenerationBatch> = inner
            .batches
            .values()
            .filter(|b| b.user_id == user_id)
            .collect();
        // Newest first, arrival order breaking ties.
        owned.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| inner.seq(&b.batch_id).cmp(&inner.seq(&a.batch_id)))
        });

        let total = owned.len() as u64;
        let offset = (page as usize - 1) * page_size as usize;
        let items = owned
            .into_iter()
            .skip(offset)
            .take(page_size as usize)
            .cloned()
            .collect();

        Ok((items, total))
    }

    async fn bulk_create_results(&self, results: &[GenerationResult]) -> Result<(), PipelineError> {
        let mut inner = self.inner.lock().await;
        check_result_conflicts(&inner, results)?;
        for result in results {
            inner.stamp(&result.result_id);
            inner.results.insert(result.result_id.clone(), result.clone());
        }
        Ok(())
    }

    async fn get_results_by_batch(
        &self,
        batch_id: &str,
    ) -> Result<Vec<GenerationResult>, PipelineError> {
        let inner = self.inner.lock().await;
        let mut results: Vec<&GenerationResult> = inner
            .results
            .values()
            .filter(|r| r.batch_id == batch_id)
            .collect();
        results.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| inner.seq(&a.result_id).cmp(&inner.seq(&b.result_id)))
        });
        Ok(results.into_iter().cloned().collect())
    }

    async fn get_result(&self, result_id: &str) -> Result<GenerationResult, PipelineError> {
        let inner = self.inner.lock().await;
        inner
            .results
            .get(result_id)
            .cloned()
            .ok_or_else(|| PipelineError::ResultNotFound(result_id.to_string()))
    }

    async fn update_result_label(
        &self,
        result_id: &str,
        label: Label,
    ) -> Result<u64, PipelineError> {
        let mut inner = self.inner.lock().await;
        match inner.results.get_mut(result_id) {
            Some(result) => {
                result.apply_label(label, chrono::Utc::now());
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn get_labeled_results(
        &self,
        user_id: Uuid,
        window: &DateWindow,
    ) -> Result<Vec<GenerationResult>, PipelineError> {
        window.validate()?;

        let inner = self.inner.lock().await;
        let mut results: Vec<&GenerationResult> = inner
            .results
            .values()
            .filter(|r| {
                r.label.is_labeled()
                    && window.contains(r.created_at)
                    && inner
                        .batches
                        .get(&r.batch_id)
                        .is_some_and(|b| b.user_id == user_id)
            })
            .collect();
        results.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| inner.seq(&a.result_id).cmp(&inner.seq(&b.result_id)))
        });
        Ok(results.into_iter().cloned().collect())
    }

    async fn transactional_save_batch(
        &self,
        batch: &GenerationBatch,
        results: &[GenerationResult],
        conversations: &[Conversation],
    ) -> Result<(), PipelineError> {
        let mut inner = self.inner.lock().await;

        // Conflicts that would abort the unit are checked up front, so a
        // failure leaves nothing behind.
        if inner.batches.contains_key(&batch.batch_id) {
            return Err(PipelineError::Conflict(format!(
                "batch {} already exists",
                batch.batch_id
            )));
        }
        check_result_conflicts(&inner, results)?;

        inner.stamp(&batch.batch_id);
        inner.batches.insert(batch.batch_id.clone(), batch.clone());

        for conversation in conversations {
            if inner
                .conversations
                .contains_key(&conversation.conversation_id)
            {
                warn!(
                    conversation_id = %conversation.conversation_id,
                    batch_id = %batch.batch_id,
                    "skipping conversation that already exists"
                );
                continue;
            }
            inner.stamp(&conversation.conversation_id);
            inner
                .conversations
                .insert(conversation.conversation_id.clone(), conversation.clone());
        }

        for result in results {
            inner.stamp(&result.result_id);
            inner.results.insert(result.result_id.clone(), result.clone());
        }

        Ok(())
    }
}

/// Rejects result sets that repeat an id, either against stored rows or
/// within the set itself, the way a multi-row insert would.
fn check_result_conflicts(
    inner: &MemoryInner,
    results: &[GenerationResult],
) -> Result<(), PipelineError> {
    let mut seen = HashSet::new();
    for result in results {
        if inner.results.contains_key(&result.result_id) || !seen.insert(&result.result_id) {
            return Err(PipelineError::Conflict(format!(
                "result {} already exists",
                result.result_id
            )));
        }
    }
    Ok(())
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn get(
        &self,
        conversation_id: &str,
        user_id: Uuid,
    ) -> Result<Conversation, PipelineError> {
        let inner = self.inner.lock().await;
        inner
            .conversations
            .get(conversation_id)
            .filter(|c| c.user_id == user_id)
            .cloned()
            .ok_or_else(|| PipelineError::ConversationNotFound(conversation_id.to_string()))
    }

    async fn bulk_save(
        &self,
        conversations: &[Conversation],
    ) -> Result<BulkSaveOutcome, PipelineError> {
        let mut inner = self.inner.lock().await;
        let mut outcome = BulkSaveOutcome::default();

        for conversation in conversations {
            if inner
                .conversations
                .contains_key(&conversation.conversation_id)
            {
                outcome.failed.push((
                    conversation.conversation_id.clone(),
                    "conversation already exists".to_string(),
                ));
                continue;
            }
            inner.stamp(&conversation.conversation_id);
            inner
                .conversations
                .insert(conversation.conversation_id.clone(), conversation.clone());
            outcome.saved.push(conversation.conversation_id.clone());
        }

        Ok(outcome)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create_document(&self, document: &PromotedDocument) -> Result<(), PipelineError> {
        let mut inner = self.inner.lock().await;
        if inner.documents.contains_key(&document.document_id) {
            return Err(PipelineError::Conflict(format!(
                "document {} already exists",
                document.document_id
            )));
        }
        inner.stamp(&document.document_id);
        inner
            .documents
            .insert(document.document_id.clone(), document.clone());
        Ok(())
    }
}
