//! Completion-layer error types.

use thiserror::Error;

/// Errors that can occur while talking to a completion backend.
#[derive(Debug, Error)]
pub enum LlmError {
    /// HTTP request failed.
    #[error("completion request failed: {0}")]
    RequestFailed(String),

    /// Response body was not the JSON shape we asked for.
    #[error("failed to parse completion response: {0}")]
    ParseError(String),

    /// Request timed out.
    #[error("completion request timed out after {0}ms")]
    Timeout(u64),

    /// Backend could not be reached.
    #[error("completion backend unavailable: {0}")]
    Unavailable(String),

    /// All retry attempts exhausted.
    #[error("all completion retries exhausted after {attempts} tries: {last_error}")]
    RetriesExhausted {
        /// How many attempts were made (retries + the first try).
        attempts: u32,
        /// The failure the final attempt reported.
        last_error: String,
    },

    /// The client was constructed with no backend.
    #[error("no completion backend configured")]
    Disabled,

    /// Bad configuration (missing prompt template, malformed template file).
    #[error("completion configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout(0)
        } else if err.is_connect() {
            LlmError::Unavailable(err.to_string())
        } else {
            LlmError::RequestFailed(err.to_string())
        }
    }
}
