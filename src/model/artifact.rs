//! Typed view over the JSON artifact a generation produces.
//!
//! Results carry their artifact as raw JSON and it stays raw until a
//! positive label promotes it. Promotion decodes the payload through
//! these types, so a malformed artifact fails loudly at the one place
//! that actually depends on its shape.

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// One node of the artifact's content tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtifactNode {
    /// Text carried by this node.
    #[serde(default)]
    pub text: String,

    /// Child nodes, in document order.
    #[serde(default)]
    pub children: Vec<ArtifactNode>,
}

impl ArtifactNode {
    /// Returns a copy with surrounding whitespace trimmed at every level.
    pub fn normalized(&self) -> ArtifactNode {
        ArtifactNode {
            text: self.text.trim().to_string(),
            children: self.children.iter().map(ArtifactNode::normalized).collect(),
        }
    }
}

/// The generated artifact as promotion understands it.
///
/// `title` and `layout` are optional hints; `root` is the content tree
/// and must be present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,

    pub root: ArtifactNode,
}

impl ArtifactPayload {
    /// Decodes a stored artifact payload.
    ///
    /// A payload missing the mandatory `root` tree, or one whose fields
    /// carry the wrong JSON types, is reported as a malformed artifact.
    pub fn decode(value: &serde_json::Value) -> Result<Self, PipelineError> {
        serde_json::from_value(value.clone())
            .map_err(|e| PipelineError::MalformedArtifact(e.to_string()))
    }
}
