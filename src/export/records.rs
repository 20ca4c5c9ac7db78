//! Training record formats and the builders that produce them.
//!
//! Both builders are pure transformations over already-loaded data.
//! Fetching and skipping policy live in the orchestrator.

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::model::{Conversation, GenerationResult, Label};

/// Value of the `thinking` marker on every SFT record.
pub const THINKING_MARKER: &str = "disabled";

/// One turn of an SFT training example.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMessage {
    /// Speaker role, always lower case.
    pub role: String,

    /// Content carried over verbatim from the conversation.
    pub content: serde_json::Value,

    /// Training weight of this turn. Present on the final message only,
    /// and only when that message is an assistant turn with a labeled
    /// result behind it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loss_weight: Option<f64>,
}

/// One line of an SFT JSONL export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SftRecord {
    /// Full transcript, oldest turn first.
    pub messages: Vec<TrainingMessage>,

    /// Fixed marker telling the trainer that thinking traces are off.
    pub thinking: String,
}

/// One turn of a DPO training example.
///
/// Ordinary context turns carry `content`; the single synthetic
/// assistant turn at the end carries the `chosen`/`rejected` pair
/// instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DpoMessage {
    Contrast {
        role: String,
        chosen: serde_json::Value,
        rejected: serde_json::Value,
    },
    Context {
        role: String,
        content: serde_json::Value,
    },
}

/// One line of a DPO JSONL export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DpoRecord {
    /// Non-assistant context followed by exactly one contrast turn.
    pub messages: Vec<DpoMessage>,
}

/// Builds an SFT record from a conversation and the label of the result
/// it produced.
///
/// The final message gets a loss weight only when it is an assistant
/// turn: 1.0 for a positive label, 0.0 for a negative one, and none at
/// all when the result is unlabeled. Conversations with fewer than two
/// messages cannot form a training example.
pub fn build_sft_record(
    conversation: &Conversation,
    label: Label,
) -> Result<SftRecord, PipelineError> {
    if conversation.messages.len() < 2 {
        return Err(PipelineError::InsufficientMessages {
            conversation_id: conversation.conversation_id.clone(),
            count: conversation.messages.len(),
        });
    }

    let last_idx = conversation.messages.len() - 1;
    let messages = conversation
        .messages
        .iter()
        .enumerate()
        .map(|(idx, message)| {
            let loss_weight = if idx == last_idx && message.is_assistant() {
                match label {
                    Label::Positive => Some(1.0),
                    Label::Negative => Some(0.0),
                    Label::Unlabeled => None,
                }
            } else {
                None
            };

            TrainingMessage {
                role: message.role.to_lowercase(),
                content: message.content.clone(),
                loss_weight,
            }
        })
        .collect();

    Ok(SftRecord {
        messages,
        thinking: THINKING_MARKER.to_string(),
    })
}

/// Builds a DPO record pairing one positive result against one negative.
///
/// The context is every non-assistant turn of the positive's
/// conversation, in order; the assistant turns are replaced by a single
/// synthetic final turn carrying both artifact payloads.
pub fn build_dpo_record(
    conversation: &Conversation,
    positive: &GenerationResult,
    negative: &GenerationResult,
) -> DpoRecord {
    let mut messages: Vec<DpoMessage> = conversation
        .messages
        .iter()
        .filter(|m| !m.is_assistant())
        .map(|m| DpoMessage::Context {
            role: m.role.to_lowercase(),
            content: m.content.clone(),
        })
        .collect();

    messages.push(DpoMessage::Contrast {
        role: "assistant".to_string(),
        chosen: positive.artifact_payload.clone(),
        rejected: negative.artifact_payload.clone(),
    });

    DpoRecord { messages }
}
