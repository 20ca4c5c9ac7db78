//! Generation result: one candidate artifact inside a batch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PipelineError;

/// Tri-state curation label attached to a generation result.
///
/// Every result starts unlabeled. Labeling is a cheap metadata write and
/// may flip between any two states at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i16", into = "i16")]
pub enum Label {
    /// Marked as a bad example.
    Negative = -1,

    /// Not reviewed yet (the initial state).
    Unlabeled = 0,

    /// Marked as a good example.
    Positive = 1,
}

impl Label {
    /// Wire/database representation of this label.
    pub fn as_i16(self) -> i16 {
        self as i16
    }

    /// Whether the result has been reviewed at all.
    pub fn is_labeled(self) -> bool {
        self != Label::Unlabeled
    }
}

impl TryFrom<i16> for Label {
    type Error = PipelineError;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Label::Negative),
            0 => Ok(Label::Unlabeled),
            1 => Ok(Label::Positive),
            other => Err(PipelineError::InvalidLabel(other)),
        }
    }
}

impl From<Label> for i16 {
    fn from(value: Label) -> Self {
        value.as_i16()
    }
}

/// One candidate artifact produced for a batch, plus its curation state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Opaque unique identifier.
    pub result_id: String,

    /// Batch this result belongs to.
    pub batch_id: String,

    /// Conversation that produced this artifact.
    pub conversation_id: String,

    /// The generated artifact as raw JSON. Decoded only at promotion time.
    pub artifact_payload: serde_json::Value,

    /// Current curation label.
    pub label: Label,

    /// Set iff the result is currently labeled (positive or negative).
    pub labeled_at: Option<DateTime<Utc>>,

    /// Strategy recorded on the individual result, when the generation
    /// layer reports a per-candidate override.
    pub strategy: Option<i16>,

    /// Failure detail captured when generation of this candidate degraded.
    pub error_message: Option<String>,

    /// When the result was created.
    pub created_at: DateTime<Utc>,
}

impl GenerationResult {
    /// Creates a fresh unlabeled result with a generated identifier.
    pub fn new(
        batch_id: impl Into<String>,
        conversation_id: impl Into<String>,
        artifact_payload: serde_json::Value,
    ) -> Self {
        Self {
            result_id: Uuid::new_v4().to_string(),
            batch_id: batch_id.into(),
            conversation_id: conversation_id.into(),
            artifact_payload,
            label: Label::Unlabeled,
            labeled_at: None,
            strategy: None,
            error_message: None,
            created_at: Utc::now(),
        }
    }

    /// Records a per-result strategy override.
    pub fn with_strategy(mut self, strategy: i16) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Records a generation failure message for this candidate.
    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    /// Applies a label, keeping `labeled_at` consistent with it: a
    /// timestamp is present exactly when the label is not `Unlabeled`.
    pub fn apply_label(&mut self, label: Label, at: DateTime<Utc>) {
        self.label = label;
        self.labeled_at = if label.is_labeled() { Some(at) } else { None };
    }
}
