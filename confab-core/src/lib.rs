//! # Confab Core
//!
//! Turn-taking engine for multi-party conversations in which LLM-backed
//! agents decide for themselves when to speak.
//!
//! The model follows Liu et al., "Proactive Conversational Agents with Inner
//! Thoughts" (CHI 2025): instead of replying whenever addressed, each agent
//! continuously forms covert [`Thought`](mental::Thought)s, scores its own
//! intrinsic motivation to say them aloud, and competes for the floor only
//! when that motivation clears its proactivity thresholds.
//!
//! One turn of a [`Conversation`] runs through the [`TurnCoordinator`]:
//!
//! - **Broadcast**: the newest event reaches every participant
//! - **Predict**: who did the speaker leave the floor to?
//! - **Think**: each agent concurrently recalibrates saliency, remembers the
//!   event, generates candidate thoughts, and evaluates them
//! - **Arbitrate**: the highest-motivation nomination wins the floor
//! - **Articulate**: the winning thought becomes the next utterance
//!
//! Silence is a first-class outcome. When nobody's motivation clears a
//! threshold, no event is appended and the turn ends quietly.
//!
//! The engine holds no network dependencies of its own: model access happens
//! behind the [`ReasoningProvider`](reasoning::ReasoningProvider) and
//! [`EmbeddingProvider`](embedding::EmbeddingProvider) traits, implemented
//! over HTTP in the companion `confab-llm` crate and by deterministic
//! in-process providers for tests.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod conversation;
pub mod coordinator;
pub mod embedding;
pub mod error;
pub mod mental;
pub mod participant;
pub mod reasoning;
pub mod reservoir;
pub mod saliency;
pub mod selector;
pub mod types;

pub use config::ConfabConfig;
pub use conversation::{Conversation, Event};
pub use coordinator::{TurnCoordinator, TurnOutcome, TurnPhase};
pub use error::{ConfabError, Result};
pub use participant::{AgentMind, IdAllocator, Participant};
pub use types::*;
