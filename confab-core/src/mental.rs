//! Mental objects — what an agent knows and what it is currently thinking.
//!
//! Memories and thoughts share one representation (content + embedding +
//! access bookkeeping + saliency); a [`Thought`] layers intrinsic motivation
//! and stimulus provenance on top. Modeled after the inner-thoughts framing
//! of Liu et al., "Proactive Conversational Agents with Inner Thoughts"
//! (CHI 2025).

use serde::{Deserialize, Serialize};

use crate::types::{Embedding, MentalObjectId, MentalObjectKind, ParticipantId};

// ---------------------------------------------------------------------------
// Stimulus provenance
// ---------------------------------------------------------------------------

/// A reference to whatever triggered a thought: a conversational event
/// (by turn number) or another mental object (by id). Order is meaningful
/// and preserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StimulusRef {
    /// A conversation event, keyed by its turn number.
    Event(u64),
    /// A memory or prior thought in the same agent's stores.
    Mental(MentalObjectId),
}

// ---------------------------------------------------------------------------
// Mental object
// ---------------------------------------------------------------------------

/// A single mental object: one memory or the base of one thought.
///
/// Mental objects are owned exclusively by one participant and never shared
/// across agents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MentalObject {
    /// Unique identifier within the owning agent's stores.
    pub id: MentalObjectId,
    /// The participant this object belongs to.
    pub owner: ParticipantId,
    /// Memory or thought kind.
    pub kind: MentalObjectKind,
    /// Natural-language content.
    pub content: String,
    /// Dense embedding of `content`.
    pub embedding: Embedding,
    /// Turn number at creation.
    pub created_turn: u64,
    /// Turn number of the last retrieval into a generation context.
    /// Only ever advances.
    pub last_accessed_turn: u64,
    /// How many times this object has been retrieved for generation.
    pub retrieval_count: u32,
    /// Importance multiplier (>= 0) applied inside the saliency formula.
    pub weight: f32,
    /// Current saliency relative to the latest utterance. Recomputed by
    /// recalibration; 0.0 until the first pass.
    pub saliency: f32,
}

impl MentalObject {
    /// Create a mental object at `turn` with weight 1.0 and zero saliency.
    /// Negative weights are clamped to 0.
    #[must_use]
    pub fn new(
        id: MentalObjectId,
        owner: ParticipantId,
        kind: MentalObjectKind,
        content: impl Into<String>,
        embedding: Embedding,
        turn: u64,
    ) -> Self {
        Self {
            id,
            owner,
            kind,
            content: content.into(),
            embedding,
            created_turn: turn,
            last_accessed_turn: turn,
            retrieval_count: 0,
            weight: 1.0,
            saliency: 0.0,
        }
    }

    /// Override the importance weight (clamped to >= 0).
    #[must_use]
    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight.max(0.0);
        self
    }

    /// Record a retrieval into a generation context. `last_accessed_turn`
    /// never moves backwards, even when fed a stale turn number.
    pub fn record_access(&mut self, turn: u64) {
        self.retrieval_count += 1;
        self.last_accessed_turn = self.last_accessed_turn.max(turn);
    }
}

/// Uniform access to the [`MentalObject`] inside reservoir items, so the
/// reservoir and the saliency pass work over memories and thoughts alike.
pub trait AsMentalObject {
    /// Borrow the underlying mental object.
    fn mental(&self) -> &MentalObject;
    /// Mutably borrow the underlying mental object.
    fn mental_mut(&mut self) -> &mut MentalObject;
}

impl AsMentalObject for MentalObject {
    fn mental(&self) -> &MentalObject {
        self
    }

    fn mental_mut(&mut self) -> &mut MentalObject {
        self
    }
}

// ---------------------------------------------------------------------------
// Intrinsic motivation
// ---------------------------------------------------------------------------

/// How much an agent wants to say a thought out loud, with the evaluator's
/// reasoning. Scores live in `[0, 1]`; [`IntrinsicMotivation::UNEVALUATED`]
/// marks a thought the evaluator has not scored (or failed to score).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntrinsicMotivation {
    /// The evaluator's free-text justification.
    pub reasoning: String,
    /// Normalized motivation score, or the unevaluated sentinel.
    pub score: f32,
}

impl IntrinsicMotivation {
    /// Sentinel score for a thought that has not been evaluated.
    pub const UNEVALUATED: f32 = -1.0;

    /// A fresh, unevaluated motivation.
    #[must_use]
    pub fn unevaluated() -> Self {
        Self {
            reasoning: String::new(),
            score: Self::UNEVALUATED,
        }
    }

    /// An evaluated motivation.
    #[must_use]
    pub fn new(reasoning: impl Into<String>, score: f32) -> Self {
        Self {
            reasoning: reasoning.into(),
            score,
        }
    }

    /// True once a real score has been assigned.
    #[must_use]
    pub fn is_evaluated(&self) -> bool {
        self.score >= 0.0
    }
}

impl Default for IntrinsicMotivation {
    fn default() -> Self {
        Self::unevaluated()
    }
}

// ---------------------------------------------------------------------------
// Thought
// ---------------------------------------------------------------------------

/// A generated thought: a mental object of a thought kind, plus motivation
/// and the stimuli that triggered it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thought {
    /// The underlying mental object. `object.kind` is always one of the
    /// thought kinds.
    pub object: MentalObject,
    /// Evaluated intrinsic motivation (sentinel until evaluation).
    pub motivation: IntrinsicMotivation,
    /// Ordered provenance: which events/memories/thoughts triggered this.
    pub stimuli: Vec<StimulusRef>,
}

impl Thought {
    /// Wrap a mental object as an unevaluated thought.
    #[must_use]
    pub fn new(object: MentalObject, stimuli: Vec<StimulusRef>) -> Self {
        debug_assert!(
            object.kind.is_thought(),
            "thoughts must carry a thought kind, got {}",
            object.kind
        );
        Self {
            object,
            motivation: IntrinsicMotivation::unevaluated(),
            stimuli,
        }
    }

    /// Overwrite the motivation. Evaluation is idempotent: calling this
    /// twice leaves the later value.
    pub fn set_motivation(&mut self, motivation: IntrinsicMotivation) {
        self.motivation = motivation;
    }

    /// The motivation score (sentinel when unevaluated).
    #[must_use]
    pub fn score(&self) -> f32 {
        self.motivation.score
    }

    /// True once the evaluator has scored this thought.
    #[must_use]
    pub fn is_evaluated(&self) -> bool {
        self.motivation.is_evaluated()
    }

    /// True for fast System-1 thoughts.
    #[must_use]
    pub fn is_system1(&self) -> bool {
        self.object.kind == crate::types::MentalObjectKind::ThoughtSystem1
    }
}

impl AsMentalObject for Thought {
    fn mental(&self) -> &MentalObject {
        &self.object
    }

    fn mental_mut(&mut self) -> &mut MentalObject {
        &mut self.object
    }
}
