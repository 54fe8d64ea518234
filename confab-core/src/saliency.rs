//! Saliency Recalibration — how relevant is each mental object right now?
//!
//! Every new utterance re-scores an agent's memories and thoughts:
//!
//!   saliency = max(b·sim_interp, c·sim_text) × weight × decay
//!   decay    = decay_factor ^ turns_elapsed
//!
//! Where:
//!   sim_interp = cosine(item, utterance interpretation — or the utterance
//!                itself when no interpretation exists)
//!   sim_text   = cosine(item, utterance text)
//!   turns_elapsed = turns since the item was last accessed (never negative)
//!
//! `decay_factor` of 1.0 disables decay exactly: the pass returns 1.0 without
//! going through `powf`, so no float drift accumulates over long
//! conversations.
//!
//! Reference: Liu et al., "Proactive Conversational Agents with Inner
//! Thoughts" (CHI 2025), §4 "Thought Retention".

use crate::config::SaliencyParams;
use crate::conversation::Event;
use crate::error::Result;
use crate::mental::{AsMentalObject, MentalObject};

/// Per-turn exponential decay: `decay_factor ^ elapsed_turns`, with the
/// exact-1.0 shortcut for the no-decay configuration.
#[must_use]
pub fn turn_decay(decay_factor: f32, elapsed_turns: u64) -> f32 {
    if (decay_factor - 1.0).abs() < f32::EPSILON {
        return 1.0;
    }
    decay_factor.powf(elapsed_turns as f32)
}

/// Compute the saliency of one mental object against an utterance.
///
/// Does not mutate the item; recalibration passes write the result back via
/// [`recalibrate_all`].
///
/// # Errors
/// Propagates [`ConfabError::DegenerateEmbedding`](crate::ConfabError) /
/// dimension mismatches from the similarity computation — a zero-norm
/// embedding anywhere in a store is a bug worth surfacing, not a 0.0 score.
pub fn compute_saliency(
    item: &MentalObject,
    utterance: &Event,
    params: &SaliencyParams,
) -> Result<f32> {
    let sim_text = item.embedding.cosine_similarity(&utterance.embedding)?;
    let sim_interp = match &utterance.interpretation {
        Some(interp) => item.embedding.cosine_similarity(&interp.embedding)?,
        None => sim_text,
    };

    let elapsed = utterance.turn_number.saturating_sub(item.last_accessed_turn);
    let decay = turn_decay(params.decay_factor, elapsed);

    let relevance = (params.interpretation_weight * sim_interp)
        .max(params.text_weight * sim_text);

    Ok(relevance * item.weight * decay)
}

/// Recalibrate a batch of items in place against `utterance`.
///
/// Items whose `last_accessed_turn` is newer than the utterance are skipped
/// untouched — a stale utterance has nothing to say about their current
/// relevance. Items are independent; the pass is order-independent.
///
/// # Errors
/// Stops at the first degenerate-embedding or dimension-mismatch error.
pub fn recalibrate_all<'a, T>(
    items: impl IntoIterator<Item = &'a mut T>,
    utterance: &Event,
    params: &SaliencyParams,
) -> Result<()>
where
    T: AsMentalObject + 'a,
{
    for item in items {
        let mental = item.mental_mut();
        if utterance.turn_number < mental.last_accessed_turn {
            continue;
        }
        mental.saliency = compute_saliency(mental, utterance, params)?;
    }
    Ok(())
}
