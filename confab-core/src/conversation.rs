//! Conversation state: the append-only event log and the participant roster.
//!
//! The conversation is deliberately passive — it validates and stores. All
//! orchestration (broadcast → think → arbitrate → articulate) lives in the
//! [`TurnCoordinator`](crate::coordinator::TurnCoordinator), which is the
//! only writer of the event log during a turn.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfabError, Result};
use crate::participant::Participant;
use crate::types::{Embedding, ParticipantId, TurnPrediction};

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// A contextual paraphrase of an utterance ("Alice is asking Bob whether…"),
/// with its own embedding. Optional; saliency falls back to the raw text
/// embedding when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interpretation {
    /// The paraphrase text.
    pub text: String,
    /// Embedding of the paraphrase.
    pub embedding: Embedding,
}

/// One utterance in the conversation.
///
/// Immutable once recorded, except for `predicted_next_turn`, which the turn
/// predictor annotates late (after the event already exists).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Who spoke.
    pub participant: ParticipantId,
    /// Position in the conversation; unique and monotonically increasing.
    pub turn_number: u64,
    /// The utterance text.
    pub content: String,
    /// Embedding of `content`.
    pub embedding: Embedding,
    /// Optional contextual paraphrase.
    pub interpretation: Option<Interpretation>,
    /// Who the speaker appears to expect next; `None` until predicted.
    pub predicted_next_turn: Option<TurnPrediction>,
}

impl Event {
    /// Create an event with no interpretation and no prediction yet.
    #[must_use]
    pub fn new(
        participant: ParticipantId,
        turn_number: u64,
        content: impl Into<String>,
        embedding: Embedding,
    ) -> Self {
        Self {
            participant,
            turn_number,
            content: content.into(),
            embedding,
            interpretation: None,
            predicted_next_turn: None,
        }
    }

    /// Attach a contextual interpretation.
    #[must_use]
    pub fn with_interpretation(mut self, text: impl Into<String>, embedding: Embedding) -> Self {
        self.interpretation = Some(Interpretation {
            text: text.into(),
            embedding,
        });
        self
    }

    /// Late-bound annotation from the turn predictor.
    pub fn set_predicted_next_turn(&mut self, prediction: TurnPrediction) {
        self.predicted_next_turn = Some(prediction);
    }
}

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

/// A multi-party conversation: shared context, an ordered roster, and the
/// append-only event history.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Conversation {
    /// Free-text scene description shared by all participants.
    pub context: String,
    participants: Vec<Participant>,
    events: Vec<Event>,
    turn_number: u64,
}

impl Conversation {
    /// Start an empty conversation at turn 0.
    #[must_use]
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            participants: Vec::new(),
            events: Vec::new(),
            turn_number: 0,
        }
    }

    // -- roster -------------------------------------------------------------

    /// Register a participant. Registration order is meaningful: arbitration
    /// ties break toward earlier-registered participants.
    ///
    /// # Errors
    /// [`ConfabError::DuplicateParticipant`] if the id is already registered.
    pub fn add_participant(&mut self, participant: Participant) -> Result<()> {
        if self.participants.iter().any(|p| p.id == participant.id) {
            return Err(ConfabError::DuplicateParticipant(participant.id));
        }
        debug!(id = %participant.id, name = %participant.name, "Participant joined");
        self.participants.push(participant);
        Ok(())
    }

    /// Remove and return a participant. A conversation whose last
    /// participant leaves is closed.
    ///
    /// # Errors
    /// [`ConfabError::UnknownParticipant`] if the id is not registered.
    pub fn remove_participant(&mut self, id: ParticipantId) -> Result<Participant> {
        match self.participants.iter().position(|p| p.id == id) {
            Some(idx) => {
                let removed = self.participants.remove(idx);
                debug!(id = %removed.id, name = %removed.name, "Participant left");
                Ok(removed)
            }
            None => Err(ConfabError::UnknownParticipant(id)),
        }
    }

    /// The roster in registration order.
    #[must_use]
    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    /// Mutable roster access, registration order preserved.
    pub fn participants_mut(&mut self) -> &mut [Participant] {
        &mut self.participants
    }

    /// Look up a participant by id.
    #[must_use]
    pub fn participant(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    /// Mutable lookup by id.
    pub fn participant_mut(&mut self, id: ParticipantId) -> Option<&mut Participant> {
        self.participants.iter_mut().find(|p| p.id == id)
    }

    /// Look up a participant by exact name.
    #[must_use]
    pub fn participant_by_name(&self, name: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.name == name)
    }

    /// All participant names, in registration order.
    #[must_use]
    pub fn participant_names(&self) -> Vec<String> {
        self.participants.iter().map(|p| p.name.clone()).collect()
    }

    /// True when no participants remain (terminal state).
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.participants.is_empty()
    }

    // -- event log ----------------------------------------------------------

    /// The turn number of the latest recorded event (0 before any event).
    #[must_use]
    pub fn turn_number(&self) -> u64 {
        self.turn_number
    }

    /// The turn number the next event must carry.
    #[must_use]
    pub fn next_turn_number(&self) -> u64 {
        self.turn_number + 1
    }

    /// Append an event to the log.
    ///
    /// # Errors
    /// [`ConfabError::NonMonotonicTurn`] unless the event carries exactly
    /// the next turn number.
    pub fn record_event(&mut self, event: Event) -> Result<()> {
        if event.turn_number != self.turn_number + 1 {
            return Err(ConfabError::NonMonotonicTurn {
                turn: event.turn_number,
                current: self.turn_number,
            });
        }
        debug!(
            turn = event.turn_number,
            speaker = %event.participant,
            "Event recorded"
        );
        self.turn_number = event.turn_number;
        self.events.push(event);
        Ok(())
    }

    /// Notify every participant of the newest event. Notification only:
    /// agents note the seen turn; all heavier reactions happen in the think
    /// phase.
    ///
    /// # Errors
    /// [`ConfabError::EmptyConversation`] if no events exist yet.
    pub fn broadcast_latest(&mut self) -> Result<()> {
        let Some(event) = self.events.last() else {
            return Err(ConfabError::EmptyConversation);
        };
        for participant in &mut self.participants {
            participant.observe(event);
        }
        Ok(())
    }

    /// The whole event history, oldest first.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// The trailing `n` events (all of them when fewer exist).
    #[must_use]
    pub fn last_n_events(&self, n: usize) -> &[Event] {
        let start = self.events.len().saturating_sub(n);
        &self.events[start..]
    }

    /// Look up an event by turn number.
    #[must_use]
    pub fn event(&self, turn_number: u64) -> Option<&Event> {
        self.events.iter().find(|e| e.turn_number == turn_number)
    }

    /// The newest event, if any.
    #[must_use]
    pub fn latest_event(&self) -> Option<&Event> {
        self.events.last()
    }

    /// Mutable access to the newest event, for the predictor's late-bound
    /// annotation.
    pub fn latest_event_mut(&mut self) -> Option<&mut Event> {
        self.events.last_mut()
    }
}
