//! Conversation transcript backing a generation result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One turn in a conversation transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Speaker role, e.g. "system", "user", "assistant". Stored verbatim;
    /// comparisons are case-insensitive.
    pub role: String,

    /// Message content. Kept as raw JSON so both plain strings and
    /// structured payloads survive storage unchanged.
    pub content: serde_json::Value,

    /// When the turn was recorded, when the producer reported it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Message {
    /// Creates a message with a plain-text body.
    pub fn text(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: serde_json::Value::String(content.into()),
            timestamp: None,
        }
    }

    /// Whether this turn was spoken by the assistant, ignoring case.
    pub fn is_assistant(&self) -> bool {
        self.role.eq_ignore_ascii_case("assistant")
    }
}

/// Full transcript of one generation attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Opaque unique identifier.
    pub conversation_id: String,

    /// Owning user.
    pub user_id: Uuid,

    /// Ordered transcript, oldest first.
    pub messages: Vec<Message>,

    /// When the conversation was created.
    pub created_at: DateTime<Utc>,

    /// When the conversation was last written.
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Creates an empty conversation with a generated identifier.
    pub fn new(user_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            conversation_id: Uuid::new_v4().to_string(),
            user_id,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Appends a turn to the transcript.
    pub fn with_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }
}
