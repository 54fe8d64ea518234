//! Thought selection — does this agent want the floor, and with which
//! thought?
//!
//! After a think pass, each agent holds a batch of freshly evaluated
//! thoughts. The selector turns that batch plus the predicted floor state
//! into at most one nomination:
//!
//!   - floor open ("anyone"): volunteer the top thought if it clears
//!     `im_threshold`; otherwise roll `system1_prob` for a reflexive
//!     System-1 interjection.
//!   - floor granted (this agent was named): speak the top thought,
//!     no threshold.
//!   - floor claimed (someone else was named): interrupt only above
//!     `interrupt_threshold`.
//!
//! Randomness is injected so replays and tests are deterministic under a
//! seeded RNG. Reference: Liu et al., "Proactive Conversational Agents with
//! Inner Thoughts" (CHI 2025), §5 "Thought Evaluation".

use rand::Rng;
use std::cmp::Reverse;
use tracing::debug;

use crate::config::ProactivityConfig;
use crate::mental::Thought;
use crate::types::{MotivationScore, TurnPrediction};

// ---------------------------------------------------------------------------
// Floor state
// ---------------------------------------------------------------------------

/// The predicted floor state, resolved from one agent's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloorStatus {
    /// Nobody in particular was addressed.
    Open,
    /// This agent was named as the expected next speaker.
    Granted,
    /// Another participant was named.
    Claimed,
}

impl FloorStatus {
    /// Resolve a prediction against this agent's name. An absent prediction
    /// (the predictor failed or never ran) reads as an open floor.
    #[must_use]
    pub fn resolve(prediction: Option<&TurnPrediction>, agent_name: &str) -> Self {
        match prediction {
            None | Some(TurnPrediction::Anyone) => Self::Open,
            Some(TurnPrediction::Named(name)) if name == agent_name => Self::Granted,
            Some(TurnPrediction::Named(_)) => Self::Claimed,
        }
    }
}

// ---------------------------------------------------------------------------
// Selector
// ---------------------------------------------------------------------------

/// Per-agent selection policy over one turn's evaluated thoughts.
#[derive(Debug, Clone, Copy)]
pub struct ProactivitySelector {
    config: ProactivityConfig,
}

impl ProactivitySelector {
    /// Build a selector with the given thresholds. The config is sanitized
    /// on the way in, so a hand-built struct with out-of-range or NaN
    /// fields cannot poison the interjection roll.
    #[must_use]
    pub fn new(config: ProactivityConfig) -> Self {
        Self {
            config: config.sanitized(),
        }
    }

    /// Pick at most one thought from `batch` to nominate for the floor.
    ///
    /// Unevaluated thoughts (sentinel score) are invisible to the policy.
    /// Sorting is stable and descending by score, so exact ties keep batch
    /// order and every "top thought" rule favors earlier thoughts.
    pub fn select<'a, R: Rng + ?Sized>(
        &self,
        batch: &[&'a Thought],
        floor: FloorStatus,
        rng: &mut R,
    ) -> Option<&'a Thought> {
        let mut evaluated: Vec<&Thought> =
            batch.iter().copied().filter(|t| t.is_evaluated()).collect();
        if evaluated.is_empty() {
            return None;
        }
        evaluated.sort_by_key(|t| Reverse(MotivationScore::new(t.score())));
        let top = evaluated[0];

        let picked = match floor {
            FloorStatus::Granted => Some(top),
            FloorStatus::Claimed => {
                (top.score() >= self.config.interrupt_threshold).then_some(top)
            }
            FloorStatus::Open => {
                if top.score() >= self.config.im_threshold {
                    Some(top)
                } else if rng.gen_bool(f64::from(self.config.system1_prob).clamp(0.0, 1.0)) {
                    // Reflexive interjection: the best System-1 thought, if any.
                    evaluated.iter().copied().find(|t| t.is_system1())
                } else {
                    None
                }
            }
        };

        if let Some(thought) = picked {
            debug!(
                thought = %thought.object.id,
                score = thought.score(),
                ?floor,
                "Thought nominated"
            );
        }
        picked
    }
}
