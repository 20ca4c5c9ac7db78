//! Durable document created by promoting a positively labeled result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::artifact::ArtifactPayload;

/// Layout used when the promoted artifact does not name one.
pub const DEFAULT_DOCUMENT_LAYOUT: &str = "standard";

/// Description stamped on every promoted document.
pub const DEFAULT_DOCUMENT_DESCRIPTION: &str = "Promoted from a labeled generation batch";

/// A first-class document in the user's library, produced from a
/// positively labeled generation result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromotedDocument {
    /// Opaque unique identifier.
    pub document_id: String,

    /// Owning user.
    pub user_id: Uuid,

    /// Document title.
    pub title: String,

    /// Rendering layout hint.
    pub layout: String,

    /// Human-readable provenance note.
    pub description: String,

    /// Normalized content tree, serialized back to JSON for storage.
    pub content: serde_json::Value,

    /// When the document was created.
    pub created_at: DateTime<Utc>,

    /// When the document was last written.
    pub updated_at: DateTime<Utc>,
}

impl PromotedDocument {
    /// Builds a document from a decoded artifact.
    ///
    /// Missing title falls back to one derived from the batch id, missing
    /// layout falls back to [`DEFAULT_DOCUMENT_LAYOUT`]. Content is the
    /// normalized root tree.
    pub fn from_payload(
        user_id: Uuid,
        batch_id: &str,
        payload: &ArtifactPayload,
    ) -> Result<Self, serde_json::Error> {
        let now = Utc::now();
        let title = payload
            .title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| format!("Generated document {batch_id}"));
        let layout = payload
            .layout
            .clone()
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DOCUMENT_LAYOUT.to_string());

        Ok(Self {
            document_id: Uuid::new_v4().to_string(),
            user_id,
            title,
            layout,
            description: DEFAULT_DOCUMENT_DESCRIPTION.to_string(),
            content: serde_json::to_value(payload.root.normalized())?,
            created_at: now,
            updated_at: now,
        })
    }
}
