//! Core type definitions for the confab turn-taking engine.
//!
//! All types are serializable; identifiers are plain integers handed out by
//! an injected [`IdAllocator`](crate::participant::IdAllocator) so that tests
//! and multi-engine hosts control identity explicitly.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ConfabError, Result};

// ---------------------------------------------------------------------------
// Identity Types
// ---------------------------------------------------------------------------

/// Unique identifier for a conversation participant (human or agent).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParticipantId(pub u64);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// Unique identifier for a mental object (memory or thought).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MentalObjectId(pub u64);

impl fmt::Display for MentalObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Kinds
// ---------------------------------------------------------------------------

/// What a mental object is: a stored memory or a generated thought.
///
/// Long-term memories seed an agent before the conversation; short-term
/// memories accumulate from observed events. System-1 thoughts are fast
/// reflexive reactions, System-2 thoughts are deliberate and built on
/// retrieved context (Kahneman's dual-process terminology).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MentalObjectKind {
    /// Persistent knowledge the agent brings into the conversation.
    MemoryLongTerm,
    /// An observed conversational event, kept as transcript memory.
    MemoryShortTerm,
    /// A fast, reflexive thought.
    ThoughtSystem1,
    /// A deliberate thought grounded in retrieved memories and thoughts.
    ThoughtSystem2,
}

impl MentalObjectKind {
    /// True for the two memory kinds.
    #[must_use]
    pub fn is_memory(self) -> bool {
        matches!(self, Self::MemoryLongTerm | Self::MemoryShortTerm)
    }

    /// True for the two thought kinds.
    #[must_use]
    pub fn is_thought(self) -> bool {
        matches!(self, Self::ThoughtSystem1 | Self::ThoughtSystem2)
    }
}

impl fmt::Display for MentalObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::MemoryLongTerm => "long_term_memory",
            Self::MemoryShortTerm => "short_term_memory",
            Self::ThoughtSystem1 => "system1_thought",
            Self::ThoughtSystem2 => "system2_thought",
        };
        f.write_str(s)
    }
}

/// Whether a participant is driven by a person or by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParticipantKind {
    /// A person typing; the engine never speaks for them.
    Human,
    /// An engine-driven agent with memories, thoughts, and proactivity.
    Agent,
}

// ---------------------------------------------------------------------------
// Turn Prediction
// ---------------------------------------------------------------------------

/// Who the latest speaker appears to expect next, as judged by the
/// turn predictor. Annotated onto the event after it is recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnPrediction {
    /// The floor is open; nobody in particular was addressed.
    Anyone,
    /// A specific participant (by name) was addressed or cued.
    Named(String),
}

impl TurnPrediction {
    /// True when the floor is open to all.
    #[must_use]
    pub fn is_anyone(&self) -> bool {
        matches!(self, Self::Anyone)
    }

    /// True when the prediction names this exact participant.
    #[must_use]
    pub fn names(&self, participant_name: &str) -> bool {
        matches!(self, Self::Named(n) if n == participant_name)
    }
}

impl fmt::Display for TurnPrediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anyone => f.write_str("anyone"),
            Self::Named(n) => f.write_str(n),
        }
    }
}

// ---------------------------------------------------------------------------
// Embedding Vector
// ---------------------------------------------------------------------------

/// A dense vector embedding for semantic similarity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding(pub Vec<f32>);

impl Embedding {
    /// Cosine similarity between two embeddings.
    ///
    /// # Errors
    ///
    /// Saliency must never silently zero out on bad inputs, so unlike the
    /// usual lenient implementations this one refuses degenerate vectors:
    /// [`ConfabError::EmbeddingDimensionMismatch`] when the lengths differ,
    /// [`ConfabError::DegenerateEmbedding`] when either vector has
    /// (near-)zero norm and the quotient is undefined.
    pub fn cosine_similarity(&self, other: &Self) -> Result<f32> {
        if self.0.len() != other.0.len() {
            return Err(ConfabError::EmbeddingDimensionMismatch {
                left: self.0.len(),
                right: other.0.len(),
            });
        }
        let (mut dot, mut norm_a, mut norm_b) = (0.0_f32, 0.0_f32, 0.0_f32);
        for (a, b) in self.0.iter().zip(other.0.iter()) {
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }
        let denom = norm_a.sqrt() * norm_b.sqrt();
        if denom < f32::EPSILON {
            return Err(ConfabError::DegenerateEmbedding { norm: denom });
        }
        Ok(dot / denom)
    }

    /// Dimensionality of the embedding.
    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.0.len()
    }

    /// True when every component is zero (or the vector is empty).
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|v| *v == 0.0)
    }
}

// ---------------------------------------------------------------------------
// Motivation Score
// ---------------------------------------------------------------------------

/// Totally-ordered wrapper for intrinsic-motivation scores, used wherever
/// thoughts are ranked or a winner is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MotivationScore(pub OrderedFloat<f32>);

impl MotivationScore {
    /// Wrap a raw f32 score.
    #[must_use]
    pub fn new(score: f32) -> Self {
        Self(OrderedFloat(score))
    }

    /// Get the raw score value.
    #[must_use]
    pub fn value(self) -> f32 {
        self.0.into_inner()
    }
}
