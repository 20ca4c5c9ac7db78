//! Export orchestration: fetch labeled results, build records, emit JSONL.
//!
//! Exports are read-only over storage. A result that cannot become a
//! record (missing conversation, too few messages) is logged and
//! skipped; it never fails the export.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::error::PipelineError;
use crate::storage::{BatchRepository, ConversationStore, DateWindow};

use super::records::{build_dpo_record, build_sft_record};
use super::sampling::{select_negative, select_positive};

/// Most negatives any single positive is paired against in a DPO export.
pub const MAX_NEGATIVES_PER_POSITIVE: usize = 3;

/// Builds SFT and DPO datasets from a user's labeled results.
pub struct DatasetExporter {
    batches: Arc<dyn BatchRepository>,
    conversations: Arc<dyn ConversationStore>,
}

impl DatasetExporter {
    /// Creates an exporter over the given stores.
    pub fn new(
        batches: Arc<dyn BatchRepository>,
        conversations: Arc<dyn ConversationStore>,
    ) -> Self {
        Self {
            batches,
            conversations,
        }
    }

    /// Exports the user's positively labeled results as SFT JSONL.
    ///
    /// Only positives export; one line per exportable result, in result
    /// creation order. An empty window of labeled results yields an
    /// empty string.
    pub async fn export_sft(
        &self,
        user_id: Uuid,
        window: &DateWindow,
    ) -> Result<String, PipelineError> {
        let results = self.batches.get_labeled_results(user_id, window).await?;
        if results.is_empty() {
            info!(user_id = %user_id, "no labeled results to export");
            return Ok(String::new());
        }

        let positives = select_positive(&results);
        let mut lines = Vec::with_capacity(positives.len());
        let mut skipped = 0usize;

        for result in positives {
            let conversation = match self
                .conversations
                .get(&result.conversation_id, user_id)
                .await
            {
                Ok(conversation) => conversation,
                Err(e) => {
                    warn!(
                        result_id = %result.result_id,
                        conversation_id = %result.conversation_id,
                        error = %e,
                        "skipping result without conversation"
                    );
                    skipped += 1;
                    continue;
                }
            };

            let record = match build_sft_record(&conversation, result.label) {
                Ok(record) => record,
                Err(e) => {
                    warn!(
                        result_id = %result.result_id,
                        error = %e,
                        "skipping result that cannot form a record"
                    );
                    skipped += 1;
                    continue;
                }
            };

            lines.push(serde_json::to_string(&record)?);
        }

        info!(
            user_id = %user_id,
            records = lines.len(),
            skipped = skipped,
            "SFT export complete"
        );
        Ok(lines.join("\n"))
    }

    /// Exports the user's labeled results as DPO JSONL.
    ///
    /// Results are grouped by batch in first-seen order; inside a batch
    /// every positive is paired against that batch's negatives, capped
    /// at [`MAX_NEGATIVES_PER_POSITIVE`] pairs per positive. A positive
    /// whose conversation cannot be loaded loses its pairs, nothing
    /// else.
    pub async fn export_dpo(
        &self,
        user_id: Uuid,
        window: &DateWindow,
    ) -> Result<String, PipelineError> {
        let results = self.batches.get_labeled_results(user_id, window).await?;
        if results.is_empty() {
            info!(user_id = %user_id, "no labeled results to export");
            return Ok(String::new());
        }

        let mut order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, Vec<crate::model::GenerationResult>> = HashMap::new();
        for result in results {
            if !groups.contains_key(&result.batch_id) {
                order.push(result.batch_id.clone());
            }
            groups.entry(result.batch_id.clone()).or_default().push(result);
        }

        let mut lines = Vec::new();
        let mut skipped_positives = 0usize;

        for batch_id in &order {
            let group = &groups[batch_id];
            let positives = select_positive(group);
            let negatives = select_negative(group);

            if positives.is_empty() || negatives.is_empty() {
                continue;
            }

            for positive in positives {
                let conversation = match self
                    .conversations
                    .get(&positive.conversation_id, user_id)
                    .await
                {
                    Ok(conversation) => conversation,
                    Err(e) => {
                        warn!(
                            result_id = %positive.result_id,
                            conversation_id = %positive.conversation_id,
                            error = %e,
                            "skipping positive without conversation"
                        );
                        skipped_positives += 1;
                        continue;
                    }
                };

                for negative in negatives.iter().take(MAX_NEGATIVES_PER_POSITIVE) {
                    let record = build_dpo_record(&conversation, positive, negative);
                    lines.push(serde_json::to_string(&record)?);
                }
            }
        }

        info!(
            user_id = %user_id,
            pairs = lines.len(),
            skipped_positives = skipped_positives,
            "DPO export complete"
        );
        Ok(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::records::{DpoMessage, DpoRecord, SftRecord};
    use crate::model::{
        Conversation, GenerationBatch, GenerationResult, GenerationStrategy, Label, Message,
    };
    use crate::storage::MemoryStore;
    use chrono::{Duration, Utc};
    use serde_json::json;

    struct Fixture {
        store: Arc<MemoryStore>,
        exporter: DatasetExporter,
        user: Uuid,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let exporter = DatasetExporter::new(store.clone(), store.clone());
        Fixture {
            store,
            exporter,
            user: Uuid::new_v4(),
        }
    }

    fn transcript(turns: &[(&str, &str)], user: Uuid) -> Conversation {
        let mut conversation = Conversation::new(user);
        for (role, content) in turns {
            conversation = conversation.with_message(Message::text(*role, *content));
        }
        conversation
    }

    /// Saves one batch whose n-th result carries `labels[n]` and a
    /// payload naming its position. `with_conversation[n]` controls
    /// whether the matching conversation is persisted.
    async fn seed_batch(
        fx: &Fixture,
        turns: &[(&str, &str)],
        labels: &[Label],
        with_conversation: &[bool],
        base_time: chrono::DateTime<Utc>,
    ) -> (GenerationBatch, Vec<GenerationResult>) {
        let batch = GenerationBatch::new(
            fx.user,
            "seed input",
            3,
            GenerationStrategy::ParallelDiversified,
        );

        let mut conversations = Vec::new();
        let mut results = Vec::new();
        for (i, label) in labels.iter().enumerate() {
            let conversation = transcript(turns, fx.user);
            let mut result = GenerationResult::new(
                &batch.batch_id,
                &conversation.conversation_id,
                json!({"root": {"text": format!("candidate {}", i)}}),
            );
            result.created_at = base_time + Duration::seconds(i as i64);
            result.apply_label(*label, result.created_at);

            if with_conversation[i] {
                conversations.push(conversation);
            }
            results.push(result);
        }

        fx.store
            .transactional_save_batch(&batch, &results, &conversations)
            .await
            .unwrap();

        (batch, results)
    }

    fn all_present(n: usize) -> Vec<bool> {
        vec![true; n]
    }

    #[tokio::test]
    async fn test_sft_export_with_nothing_labeled_is_empty() {
        let fx = fixture();
        seed_batch(
            &fx,
            &[("user", "q"), ("assistant", "a")],
            &[Label::Unlabeled, Label::Unlabeled, Label::Unlabeled],
            &all_present(3),
            Utc::now(),
        )
        .await;

        let output = fx
            .exporter
            .export_sft(fx.user, &DateWindow::unbounded())
            .await
            .unwrap();
        assert!(output.is_empty());

        let output = fx
            .exporter
            .export_dpo(fx.user, &DateWindow::unbounded())
            .await
            .unwrap();
        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn test_sft_export_emits_positive_results_in_order() {
        let fx = fixture();
        seed_batch(
            &fx,
            &[("user", "draft a note"), ("assistant", "here it is")],
            &[Label::Positive, Label::Unlabeled, Label::Positive],
            &all_present(3),
            Utc::now(),
        )
        .await;

        let output = fx
            .exporter
            .export_sft(fx.user, &DateWindow::unbounded())
            .await
            .unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);

        for line in lines {
            let record: SftRecord = serde_json::from_str(line).unwrap();
            assert_eq!(record.messages.len(), 2);
            assert_eq!(record.messages[1].loss_weight, Some(1.0));
            assert_eq!(record.thinking, "disabled");
        }
    }

    #[tokio::test]
    async fn test_sft_export_excludes_negative_results() {
        let fx = fixture();
        seed_batch(
            &fx,
            &[("user", "q"), ("assistant", "a")],
            &[Label::Positive, Label::Negative],
            &all_present(2),
            Utc::now(),
        )
        .await;

        let output = fx
            .exporter
            .export_sft(fx.user, &DateWindow::unbounded())
            .await
            .unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 1);

        let record: SftRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(record.messages[1].loss_weight, Some(1.0));
    }

    #[tokio::test]
    async fn test_sft_export_with_only_negatives_is_empty() {
        let fx = fixture();
        seed_batch(
            &fx,
            &[("user", "q"), ("assistant", "a")],
            &[Label::Negative, Label::Negative],
            &all_present(2),
            Utc::now(),
        )
        .await;

        let output = fx
            .exporter
            .export_sft(fx.user, &DateWindow::unbounded())
            .await
            .unwrap();
        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn test_sft_export_skips_missing_conversation() {
        let fx = fixture();
        seed_batch(
            &fx,
            &[("user", "q"), ("assistant", "a")],
            &[Label::Positive, Label::Positive],
            &[true, false],
            Utc::now(),
        )
        .await;

        let output = fx
            .exporter
            .export_sft(fx.user, &DateWindow::unbounded())
            .await
            .unwrap();
        assert_eq!(output.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_sft_export_skips_short_conversations() {
        let fx = fixture();
        // One-turn transcript cannot form a record.
        seed_batch(
            &fx,
            &[("assistant", "only output")],
            &[Label::Positive, Label::Negative],
            &all_present(2),
            Utc::now(),
        )
        .await;

        let output = fx
            .exporter
            .export_sft(fx.user, &DateWindow::unbounded())
            .await
            .unwrap();
        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn test_sft_export_respects_window() {
        let fx = fixture();
        let old = Utc::now() - Duration::days(30);
        seed_batch(
            &fx,
            &[("user", "q"), ("assistant", "a")],
            &[Label::Positive],
            &all_present(1),
            old,
        )
        .await;
        seed_batch(
            &fx,
            &[("user", "q"), ("assistant", "a")],
            &[Label::Positive],
            &all_present(1),
            Utc::now(),
        )
        .await;

        let window = DateWindow {
            start: Some(Utc::now() - Duration::days(1)),
            end: None,
        };
        let output = fx.exporter.export_sft(fx.user, &window).await.unwrap();
        assert_eq!(output.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_dpo_export_pairs_within_batch() {
        let fx = fixture();
        seed_batch(
            &fx,
            &[
                ("system", "you draft documents"),
                ("user", "make a plan"),
                ("assistant", "the draft"),
            ],
            &[Label::Positive, Label::Negative, Label::Negative],
            &all_present(3),
            Utc::now(),
        )
        .await;

        let output = fx
            .exporter
            .export_dpo(fx.user, &DateWindow::unbounded())
            .await
            .unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);

        for (i, line) in lines.iter().enumerate() {
            let record: DpoRecord = serde_json::from_str(line).unwrap();
            // system + user context, assistant turn replaced by the contrast
            assert_eq!(record.messages.len(), 3);
            match &record.messages[2] {
                DpoMessage::Contrast {
                    role,
                    chosen,
                    rejected,
                } => {
                    assert_eq!(role, "assistant");
                    assert_eq!(chosen, &json!({"root": {"text": "candidate 0"}}));
                    assert_eq!(
                        rejected,
                        &json!({"root": {"text": format!("candidate {}", i + 1)}})
                    );
                }
                other => panic!("expected contrast turn, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_dpo_pairs_every_positive_with_every_negative_under_cap() {
        let fx = fixture();
        seed_batch(
            &fx,
            &[("user", "q"), ("assistant", "a")],
            &[
                Label::Positive,
                Label::Positive,
                Label::Negative,
                Label::Negative,
            ],
            &all_present(4),
            Utc::now(),
        )
        .await;

        let output = fx
            .exporter
            .export_dpo(fx.user, &DateWindow::unbounded())
            .await
            .unwrap();
        let lines: Vec<&str> = output.lines().collect();
        // 2 positives x 2 negatives, all under the per-positive cap.
        assert_eq!(lines.len(), 4);

        let chosen_of = |line: &str| -> serde_json::Value {
            let record: DpoRecord = serde_json::from_str(line).unwrap();
            match record.messages.last().unwrap() {
                DpoMessage::Contrast { chosen, .. } => chosen.clone(),
                other => panic!("expected contrast turn, got {:?}", other),
            }
        };
        // Pairs come out grouped by positive, in fetch order.
        assert_eq!(chosen_of(lines[0]), json!({"root": {"text": "candidate 0"}}));
        assert_eq!(chosen_of(lines[1]), json!({"root": {"text": "candidate 0"}}));
        assert_eq!(chosen_of(lines[2]), json!({"root": {"text": "candidate 1"}}));
        assert_eq!(chosen_of(lines[3]), json!({"root": {"text": "candidate 1"}}));
    }

    #[tokio::test]
    async fn test_dpo_caps_pairs_per_positive() {
        let fx = fixture();
        seed_batch(
            &fx,
            &[("user", "q"), ("assistant", "a")],
            &[
                Label::Positive,
                Label::Negative,
                Label::Negative,
                Label::Negative,
                Label::Negative,
                Label::Negative,
            ],
            &all_present(6),
            Utc::now(),
        )
        .await;

        let output = fx
            .exporter
            .export_dpo(fx.user, &DateWindow::unbounded())
            .await
            .unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), MAX_NEGATIVES_PER_POSITIVE);

        // The earliest negatives win the pairing.
        let record: DpoRecord = serde_json::from_str(lines[0]).unwrap();
        match record.messages.last().unwrap() {
            DpoMessage::Contrast { rejected, .. } => {
                assert_eq!(rejected, &json!({"root": {"text": "candidate 1"}}));
            }
            other => panic!("expected contrast turn, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dpo_never_pairs_across_batches() {
        let fx = fixture();
        let base = Utc::now();
        seed_batch(
            &fx,
            &[("user", "q"), ("assistant", "a")],
            &[Label::Positive, Label::Negative],
            &all_present(2),
            base,
        )
        .await;
        seed_batch(
            &fx,
            &[("user", "q"), ("assistant", "a")],
            &[Label::Positive, Label::Negative],
            &all_present(2),
            base + Duration::minutes(1),
        )
        .await;

        let output = fx
            .exporter
            .export_dpo(fx.user, &DateWindow::unbounded())
            .await
            .unwrap();
        // One pair per batch, never two-by-two across them.
        assert_eq!(output.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_dpo_batch_without_negatives_contributes_nothing() {
        let fx = fixture();
        seed_batch(
            &fx,
            &[("user", "q"), ("assistant", "a")],
            &[Label::Positive, Label::Positive],
            &all_present(2),
            Utc::now(),
        )
        .await;

        let output = fx
            .exporter
            .export_dpo(fx.user, &DateWindow::unbounded())
            .await
            .unwrap();
        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn test_dpo_skips_positive_without_conversation() {
        let fx = fixture();
        seed_batch(
            &fx,
            &[("user", "q"), ("assistant", "a")],
            &[Label::Positive, Label::Positive, Label::Negative],
            &[false, true, true],
            Utc::now(),
        )
        .await;

        let output = fx
            .exporter
            .export_dpo(fx.user, &DateWindow::unbounded())
            .await
            .unwrap();
        // The first positive loses its pair; the second still exports.
        assert_eq!(output.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_exports_do_not_mutate_storage() {
        let fx = fixture();
        let (batch, _) = seed_batch(
            &fx,
            &[("user", "q"), ("assistant", "a")],
            &[Label::Positive, Label::Negative],
            &all_present(2),
            Utc::now(),
        )
        .await;

        fx.exporter
            .export_sft(fx.user, &DateWindow::unbounded())
            .await
            .unwrap();
        fx.exporter
            .export_dpo(fx.user, &DateWindow::unbounded())
            .await
            .unwrap();

        let results = fx.store.get_results_by_batch(&batch.batch_id).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].label, Label::Positive);
        assert_eq!(results[1].label, Label::Negative);
    }
}
