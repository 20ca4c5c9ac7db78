//! Domain types for the curation pipeline.
//!
//! A [`GenerationBatch`] is one request that produced several candidate
//! artifacts from a single input text; each candidate is a
//! [`GenerationResult`] carrying an opaque JSON artifact payload and a
//! tri-state human [`Label`]. Results reference the [`Conversation`] that
//! produced them. A positive label promotes the artifact into a
//! [`PromotedDocument`] with an independent lifecycle.

pub mod artifact;
pub mod batch;
pub mod conversation;
pub mod document;
pub mod result;

pub use artifact::{ArtifactNode, ArtifactPayload};
pub use batch::{
    GenerationBatch, GenerationStrategy, GENERATION_COUNT_MAX, GENERATION_COUNT_MIN,
};
pub use conversation::{Conversation, Message};
pub use document::{PromotedDocument, DEFAULT_DOCUMENT_DESCRIPTION, DEFAULT_DOCUMENT_LAYOUT};
pub use result::{GenerationResult, Label};
