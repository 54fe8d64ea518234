//! Error types for the confab core library.
//!
//! The taxonomy separates programming-contract violations (degenerate
//! embeddings, reservoir misuse, event-log misuse) from external-collaborator
//! failures. Contract violations surface to the caller; external failures
//! are absorbed at the per-agent pipeline boundary and degrade a turn, never
//! abort it. "Nobody wants the floor" is not an error at all — it is a
//! silent [`TurnOutcome`](crate::coordinator::TurnOutcome).

use thiserror::Error;

use crate::types::{MentalObjectId, ParticipantId};

/// Top-level error type for all confab core operations.
#[derive(Error, Debug)]
pub enum ConfabError {
    /// Cosine similarity was asked to compare a (near-)zero-norm vector.
    /// Always a provider or caller bug; saliency must never silently zero.
    #[error("degenerate embedding: vector norm {norm} is below f32::EPSILON")]
    DegenerateEmbedding {
        /// The offending norm product.
        norm: f32,
    },

    /// Two embeddings of different dimensionality were compared.
    #[error("embedding dimension mismatch: {left} vs {right}")]
    EmbeddingDimensionMismatch {
        /// Dimensions of the left-hand vector.
        left: usize,
        /// Dimensions of the right-hand vector.
        right: usize,
    },

    /// A mental object with this id is already present in the reservoir.
    #[error("duplicate mental object id: {0}")]
    DuplicateId(MentalObjectId),

    /// No mental object with this id exists in the reservoir.
    #[error("mental object not found: {0}")]
    NotFound(MentalObjectId),

    /// A participant with this id is already registered.
    #[error("participant already registered: {0}")]
    DuplicateParticipant(ParticipantId),

    /// No participant with this id is registered.
    #[error("unknown participant: {0}")]
    UnknownParticipant(ParticipantId),

    /// An event was recorded out of turn order.
    #[error("non-monotonic event turn {turn} (conversation is at turn {current})")]
    NonMonotonicTurn {
        /// Turn number carried by the rejected event.
        turn: u64,
        /// The conversation's current turn number.
        current: u64,
    },

    /// A turn was requested before any event exists to react to.
    #[error("conversation has no events to react to")]
    EmptyConversation,

    /// A turn was requested on a conversation with no participants left.
    #[error("conversation is closed (no participants remain)")]
    ConversationClosed,

    /// An external collaborator (completion or embedding service) failed,
    /// timed out, or returned something unusable.
    #[error("external call to {service} failed: {reason}")]
    ExternalCall {
        /// Which collaborator failed ("reasoning", "embedding", ...).
        service: &'static str,
        /// Human-readable failure description.
        reason: String,
    },

    /// Configuration could not be parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// Generic I/O error (config file loading).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfabError {
    /// Shorthand for an external-collaborator failure.
    #[must_use]
    pub fn external(service: &'static str, reason: impl Into<String>) -> Self {
        Self::ExternalCall {
            service,
            reason: reason.into(),
        }
    }

    /// True for failures of an external collaborator (including timeouts),
    /// which per-agent pipelines absorb rather than propagate.
    #[must_use]
    pub fn is_external(&self) -> bool {
        matches!(self, Self::ExternalCall { .. })
    }
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, ConfabError>;
