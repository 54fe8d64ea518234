//! Participants: humans and engine-driven agents, plus identity allocation.
//!
//! Only agents carry a mind (memory store, thought reservoir, proactivity
//! thresholds); humans are roster entries the engine never speaks for.
//! Identity comes from an [`IdAllocator`] the host constructs and injects,
//! so tests and multi-engine processes control the id space — there is no
//! hidden global counter.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::config::ProactivityConfig;
use crate::conversation::Event;
use crate::reservoir::{MemoryStore, ThoughtReservoir};
use crate::types::{MentalObjectId, ParticipantId, ParticipantKind};

// ---------------------------------------------------------------------------
// Identity allocation
// ---------------------------------------------------------------------------

/// Monotonic id source shared by participants and mental objects.
///
/// Typically wrapped in an `Arc` and handed to the coordinator and to
/// whatever host code constructs participants.
#[derive(Debug)]
pub struct IdAllocator {
    next: AtomicU64,
}

impl IdAllocator {
    /// An allocator starting at 1 (0 reads as "unset" in logs).
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// An allocator starting at an arbitrary value, for hosts that partition
    /// the id space between engines.
    #[must_use]
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    /// Hand out the next raw id.
    pub fn allocate(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// Hand out a participant id.
    pub fn participant_id(&self) -> ParticipantId {
        ParticipantId(self.allocate())
    }

    /// Hand out a mental-object id.
    pub fn mental_object_id(&self) -> MentalObjectId {
        MentalObjectId(self.allocate())
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Agent mind
// ---------------------------------------------------------------------------

/// Everything an agent brings to the table: a persona for the prompt layer,
/// its memory stores, and its proactivity thresholds.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AgentMind {
    /// Free-text persona fed to the reasoning layer.
    pub persona: String,
    /// Long- and short-term memories.
    pub memories: MemoryStore,
    /// Generated thoughts, across all turns.
    pub thoughts: ThoughtReservoir,
    /// When this agent volunteers, interjects, or interrupts.
    pub proactivity: ProactivityConfig,
    /// The newest turn this agent has been notified of.
    pub last_seen_turn: Option<u64>,
}

impl AgentMind {
    /// A fresh mind with empty stores.
    #[must_use]
    pub fn new(persona: impl Into<String>, proactivity: ProactivityConfig) -> Self {
        Self {
            persona: persona.into(),
            memories: MemoryStore::new(),
            thoughts: ThoughtReservoir::new(),
            proactivity,
            last_seen_turn: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Participant
// ---------------------------------------------------------------------------

/// What drives a participant.
#[derive(Debug, Serialize, Deserialize)]
pub enum ParticipantRole {
    /// A person typing. The engine records their events but never thinks or
    /// speaks for them.
    Human,
    /// An engine-driven agent. Boxed: minds are large relative to roster
    /// entries and most rosters mix humans in.
    Agent(Box<AgentMind>),
}

/// One entry in the conversation roster.
#[derive(Debug, Serialize, Deserialize)]
pub struct Participant {
    /// Unique, allocator-assigned identity.
    pub id: ParticipantId,
    /// Display name; turn predictions refer to participants by name.
    pub name: String,
    /// Turn number of this participant's latest utterance; `None` until
    /// they first speak.
    pub last_spoken_turn: Option<u64>,
    /// Human or agent.
    pub role: ParticipantRole,
}

impl Participant {
    /// A human roster entry.
    #[must_use]
    pub fn human(id: ParticipantId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            last_spoken_turn: None,
            role: ParticipantRole::Human,
        }
    }

    /// An agent roster entry.
    #[must_use]
    pub fn agent(id: ParticipantId, name: impl Into<String>, mind: AgentMind) -> Self {
        Self {
            id,
            name: name.into(),
            last_spoken_turn: None,
            role: ParticipantRole::Agent(Box::new(mind)),
        }
    }

    /// Human or agent.
    #[must_use]
    pub fn kind(&self) -> ParticipantKind {
        match self.role {
            ParticipantRole::Human => ParticipantKind::Human,
            ParticipantRole::Agent(_) => ParticipantKind::Agent,
        }
    }

    /// The agent mind, when this participant has one.
    #[must_use]
    pub fn mind(&self) -> Option<&AgentMind> {
        match &self.role {
            ParticipantRole::Human => None,
            ParticipantRole::Agent(mind) => Some(mind),
        }
    }

    /// Mutable access to the agent mind, when this participant has one.
    pub fn mind_mut(&mut self) -> Option<&mut AgentMind> {
        match &mut self.role {
            ParticipantRole::Human => None,
            ParticipantRole::Agent(mind) => Some(mind),
        }
    }

    /// Receive a broadcast notification. Agents note the turn; humans are
    /// assumed to be watching the transcript themselves.
    pub fn observe(&mut self, event: &Event) {
        if let Some(mind) = self.mind_mut() {
            let seen = mind.last_seen_turn.unwrap_or(0);
            mind.last_seen_turn = Some(seen.max(event.turn_number));
        }
    }

    /// Turns of silence since this participant last spoke, as of `turn`.
    /// A participant who has never spoken has been silent the whole
    /// conversation.
    #[must_use]
    pub fn turns_silent(&self, turn: u64) -> u64 {
        match self.last_spoken_turn {
            Some(spoke) => turn.saturating_sub(spoke),
            None => turn,
        }
    }
}
