//! Core types for completion requests and responses.

use serde::{Deserialize, Serialize};

/// How the backend should shape its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    /// Free-form text.
    #[default]
    Text,
    /// Strict JSON object (the backend's JSON mode).
    JsonObject,
}

/// A request to the completion backend.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    /// System prompt (role, scene, persona, output rules).
    pub system: String,
    /// User prompt (context, instructions).
    pub user: String,
    /// Sampling temperature (0.0 = deterministic).
    pub temperature: f32,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Output shaping.
    pub response_format: ResponseFormat,
    /// Whether to request per-token log-probabilities.
    pub want_logprobs: bool,
    /// How many alternatives per token position (only sent when
    /// `want_logprobs` is set).
    pub top_logprobs: u8,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl CompletionRequest {
    /// Create a request with the default knobs (temperature 0.7, 300 tokens,
    /// free-form text, 30s timeout).
    #[must_use]
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            temperature: 0.7,
            max_tokens: 300,
            response_format: ResponseFormat::Text,
            want_logprobs: false,
            top_logprobs: 0,
            timeout_ms: 30_000,
        }
    }

    /// Ask for a strict JSON object.
    #[must_use]
    pub fn json(mut self) -> Self {
        self.response_format = ResponseFormat::JsonObject;
        self
    }

    /// Set the sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the output token budget.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Request log-probabilities with `top_n` alternatives per position.
    #[must_use]
    pub fn with_logprobs(mut self, top_n: u8) -> Self {
        self.want_logprobs = true;
        self.top_logprobs = top_n;
        self
    }

    /// Set the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

/// A response from the completion backend.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionResponse {
    /// The generated text.
    pub text: String,
    /// Per-token log-probabilities, when requested and supported.
    pub logprobs: Option<CompletionLogProbs>,
}

/// Log-probabilities for a completion, one entry per generated token.
///
/// Mirrors the OpenAI chat `logprobs.content[]` shape so the backend payload
/// deserializes straight into it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionLogProbs {
    /// One entry per generated token, in generation order.
    pub content: Vec<TokenLogProb>,
}

/// The chosen token at one position, with its alternatives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenLogProb {
    /// The token text as the backend tokenized it (often space-prefixed).
    pub token: String,
    /// Natural-log probability of the chosen token.
    pub logprob: f32,
    /// The highest-probability alternatives at this position.
    #[serde(default)]
    pub top_logprobs: Vec<TopLogProb>,
}

/// One alternative token at a position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopLogProb {
    /// The alternative token text.
    pub token: String,
    /// Its natural-log probability.
    pub logprob: f32,
}

// ---------------------------------------------------------------------------
// Structured payloads — the JSON shapes the prompts ask for
// ---------------------------------------------------------------------------

/// System-1 generation output: one quick reaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SingleThoughtPayload {
    /// The generated thought text.
    #[serde(default)]
    pub thought: String,
}

/// System-2 generation output: a batch of deliberate thoughts with
/// provenance tags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThoughtBatchPayload {
    /// The generated thoughts, in the order the model produced them.
    #[serde(default)]
    pub thoughts: Vec<ThoughtEntry>,
}

/// One thought in a System-2 batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThoughtEntry {
    /// The thought text.
    #[serde(default)]
    pub content: String,
    /// Provenance tags (`CON#<turn>`, `MEM#<id>`, `THO#<id>`).
    #[serde(default)]
    pub stimuli: Vec<String>,
}

/// Motivation evaluation output. The rating key carries its scale in the
/// name; serde maps it onto a plain field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationPayload {
    /// The evaluator's free-text justification.
    #[serde(default)]
    pub reasoning: String,
    /// The 1-to-5 rating, as written by the model.
    #[serde(rename = "rating (1-5)")]
    pub rating: f32,
}

/// Articulation output: the utterance text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticulationPayload {
    /// What the agent says out loud.
    #[serde(default)]
    pub articulation: String,
}

// Custom serialization for ResponseFormat since it rides along in
// CompletionRequest serialization.
impl Serialize for ResponseFormat {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            ResponseFormat::Text => serializer.serialize_str("text"),
            ResponseFormat::JsonObject => serializer.serialize_str("json_object"),
        }
    }
}
