//! # confab-llm — Completion-Backed Reasoning for Confab
//!
//! Implements the engine's [`ReasoningProvider`](confab_core::reasoning::ReasoningProvider)
//! seam over a real completion API:
//!   - **OpenAI-compatible** chat endpoints (OpenAI, Together, vLLM,
//!     llama.cpp server)
//!   - **Ollama** (local)
//!   - **Disabled** (every call fails; the engine degrades to silence)
//!
//! All model traffic for a conversation goes through this crate, ensuring:
//!   - Structured output enforcement (JSON mode)
//!   - Timeout and retry management per call
//!   - Versioned, testable prompt templates with TOML overrides
//!   - Probability-weighted motivation ratings when the backend reports
//!     log-probabilities
//!
//! The prompts encode a fixed context grammar: transcript lines render as
//! `Name: content`, and citable context lines carry `CON#<turn>`,
//! `MEM#<id>`, and `THO#<id>` markers that generated thoughts reference
//! back as stimuli.

pub mod client;
pub mod error;
pub mod prompt;
pub mod provider;
pub mod types;

pub use client::{CompletionBackend, CompletionClient};
pub use error::LlmError;
pub use prompt::{PromptId, PromptLibrary};
pub use provider::{FALLBACK_UTTERANCE, LlmReasoningProvider};
pub use types::{CompletionRequest, CompletionResponse, ResponseFormat};
