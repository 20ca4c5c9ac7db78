//! Generation batch: one request producing several candidate artifacts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PipelineError;

/// Smallest number of candidates a batch may request.
pub const GENERATION_COUNT_MIN: i16 = 3;

/// Largest number of candidates a batch may request.
pub const GENERATION_COUNT_MAX: i16 = 5;

/// How the candidates of a batch were generated.
///
/// The discriminants are wire values shared with the generation layer and
/// the database; anything outside {1, 2} is rejected at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i16", into = "i16")]
pub enum GenerationStrategy {
    /// N parallel model calls, each with a diversification hint.
    ParallelDiversified = 1,

    /// One model call asked to produce N diverse candidates.
    SingleCallDiverse = 2,
}

impl GenerationStrategy {
    /// Wire/database representation of this strategy.
    pub fn as_i16(self) -> i16 {
        self as i16
    }
}

impl TryFrom<i16> for GenerationStrategy {
    type Error = PipelineError;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(GenerationStrategy::ParallelDiversified),
            2 => Ok(GenerationStrategy::SingleCallDiverse),
            other => Err(PipelineError::InvalidStrategy(other)),
        }
    }
}

impl From<GenerationStrategy> for i16 {
    fn from(value: GenerationStrategy) -> Self {
        value.as_i16()
    }
}

/// One generation request: N candidate artifacts from one input text.
///
/// Batches are created exactly once, atomically together with their
/// results and conversations, and are never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationBatch {
    /// Opaque unique identifier.
    pub batch_id: String,

    /// Owning user; every operation on the batch is scoped to this identity.
    pub user_id: Uuid,

    /// Normalized input text the candidates were generated from.
    pub input_text: String,

    /// Number of candidates requested, in [GENERATION_COUNT_MIN, GENERATION_COUNT_MAX].
    pub generation_count: i16,

    /// Strategy used to produce the candidates.
    pub generation_strategy: GenerationStrategy,

    /// When the batch was created.
    pub created_at: DateTime<Utc>,

    /// When the batch row was last written.
    pub updated_at: DateTime<Utc>,
}

impl GenerationBatch {
    /// Creates a new batch with a generated identifier and current timestamps.
    pub fn new(
        user_id: Uuid,
        input_text: impl Into<String>,
        generation_count: i16,
        generation_strategy: GenerationStrategy,
    ) -> Self {
        let now = Utc::now();
        Self {
            batch_id: Uuid::new_v4().to_string(),
            user_id,
            input_text: input_text.into(),
            generation_count,
            generation_strategy,
            created_at: now,
            updated_at: now,
        }
    }

    /// Checks the batch invariants: non-empty input and a count in range.
    ///
    /// The strategy is typed and cannot hold an invalid discriminant.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.input_text.trim().is_empty() {
            return Err(PipelineError::EmptyInput);
        }

        if !(GENERATION_COUNT_MIN..=GENERATION_COUNT_MAX).contains(&self.generation_count) {
            return Err(PipelineError::InvalidGenerationCount(self.generation_count));
        }

        Ok(())
    }
}
