//! Reasoning provider seam — generation, evaluation, articulation,
//! prediction.
//!
//! The engine supplies structured excerpts (who said what, which memories
//! and thoughts are salient, the agent's persona); turning those into
//! prompts and parsing model output is entirely the provider's business.
//! The coordinator treats every call as fallible and slow: each is wrapped
//! in a timeout, and failures degrade the calling agent's turn instead of
//! propagating.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::mental::{StimulusRef, Thought};
use crate::types::{MentalObjectId, MentalObjectKind, TurnPrediction};

// ---------------------------------------------------------------------------
// Context excerpts
// ---------------------------------------------------------------------------

/// One event, flattened for prompt rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventExcerpt {
    /// Turn number (also the id stimuli use to refer back to it).
    pub turn: u64,
    /// Speaker display name.
    pub speaker: String,
    /// Utterance text.
    pub content: String,
}

/// One memory or prior thought, flattened for prompt rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MentalExcerpt {
    /// Id stimuli use to refer back to it.
    pub id: MentalObjectId,
    /// Content text.
    pub content: String,
}

/// Everything one agent's think pass hands to the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThinkContext {
    /// Scene description shared by the whole conversation.
    pub scene: String,
    /// This agent's display name.
    pub agent_name: String,
    /// This agent's persona.
    pub persona: String,
    /// The turn number of the event being reacted to.
    pub turn_number: u64,
    /// Trailing window of the transcript, oldest first.
    pub recent_events: Vec<EventExcerpt>,
    /// All participant display names, roster order. Providers mention the
    /// cast in evaluation and articulation prompts.
    pub participant_names: Vec<String>,
    /// Most salient long-term memories, most salient first.
    pub salient_memories: Vec<MentalExcerpt>,
    /// Most salient prior System-2 thoughts, most salient first.
    pub salient_thoughts: Vec<MentalExcerpt>,
    /// Long-term memories for the evaluation rubric. A wider excerpt than
    /// `salient_memories`; the rater weighs objectives and interests the
    /// generator never saw.
    pub evaluation_memories: Vec<MentalExcerpt>,
    /// Turns since this agent last spoke.
    pub turns_silent: u64,
    /// How many deliberate System-2 thoughts to request.
    pub system2_count: usize,
}

/// What the turn predictor sees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictContext {
    /// Scene description.
    pub scene: String,
    /// Trailing window of the transcript, oldest first.
    pub recent_events: Vec<EventExcerpt>,
    /// Display name of the latest speaker.
    pub speaker_name: String,
    /// All participant names; predictions outside this set are invalid.
    pub participant_names: Vec<String>,
}

// ---------------------------------------------------------------------------
// Generation output
// ---------------------------------------------------------------------------

/// A thought as the provider proposes it, before the engine embeds it and
/// assigns an id. `kind` is one of the two thought kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateThought {
    /// `ThoughtSystem1` or `ThoughtSystem2`.
    pub kind: MentalObjectKind,
    /// The thought text.
    pub content: String,
    /// Ordered provenance references. The engine drops any that don't
    /// resolve against the agent's stores or the event log.
    pub stimuli: Vec<StimulusRef>,
}

// ---------------------------------------------------------------------------
// Provider trait
// ---------------------------------------------------------------------------

/// The external completion service, seen from the engine.
#[async_trait]
pub trait ReasoningProvider: Send + Sync {
    /// Propose candidate thoughts (System-1 and System-2) for one agent.
    async fn generate_thoughts(&self, ctx: &ThinkContext) -> Result<Vec<CandidateThought>>;

    /// Score one thought's intrinsic motivation in `[0, 1]`, with reasoning.
    async fn evaluate_motivation(
        &self,
        ctx: &ThinkContext,
        thought: &Thought,
    ) -> Result<crate::mental::IntrinsicMotivation>;

    /// Turn the winning thought into utterance text in the agent's voice.
    async fn articulate(&self, ctx: &ThinkContext, thought: &Thought) -> Result<String>;

    /// Judge who the latest speaker expects next. Implementations return
    /// whatever the model said; the coordinator validates names against the
    /// roster and degrades unknown ones to [`TurnPrediction::Anyone`].
    async fn predict_next_turn(&self, ctx: &PredictContext) -> Result<TurnPrediction>;
}
