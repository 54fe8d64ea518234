//! Completion client — unified interface over OpenAI-compatible and Ollama
//! backends.

use std::time::Duration;

use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

use crate::error::LlmError;
use crate::types::{CompletionLogProbs, CompletionRequest, CompletionResponse, ResponseFormat};

/// Which completion backend to talk to.
#[derive(Debug, Clone)]
pub enum CompletionBackend {
    /// OpenAI-compatible chat API (OpenAI, Together, vLLM, llama.cpp server).
    OpenAiCompatible {
        /// Base URL, without the `/v1/chat/completions` suffix.
        base_url: String,
        /// Bearer token.
        api_key: String,
    },
    /// Ollama running locally.
    Ollama {
        /// Base URL, without the `/api/generate` suffix.
        base_url: String,
    },
    /// No backend; every call fails with [`LlmError::Disabled`].
    Disabled,
}

/// HTTP client that routes completion requests to the configured backend.
pub struct CompletionClient {
    backend: CompletionBackend,
    http: Client,
    model: String,
    max_retries: u32,
}

impl CompletionClient {
    /// Create a new completion client.
    #[must_use]
    pub fn new(backend: CompletionBackend, model: impl Into<String>, max_retries: u32) -> Self {
        Self {
            backend,
            http: Client::new(),
            model: model.into(),
            max_retries,
        }
    }

    /// Create a client with no backend. Every call errors, which the
    /// reasoning provider surfaces and the engine degrades around.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            backend: CompletionBackend::Disabled,
            http: Client::new(),
            model: String::new(),
            max_retries: 0,
        }
    }

    /// The configured model name.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Whether a real backend is configured.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !matches!(self.backend, CompletionBackend::Disabled)
    }

    /// Run one completion against the configured backend.
    ///
    /// # Errors
    ///
    /// [`LlmError::Disabled`] without a backend; otherwise the final
    /// failure after `max_retries + 1` attempts.
    pub async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        match &self.backend {
            CompletionBackend::Disabled => Err(LlmError::Disabled),
            CompletionBackend::Ollama { base_url } => self.complete_ollama(base_url, request).await,
            CompletionBackend::OpenAiCompatible { base_url, api_key } => {
                self.complete_openai(base_url, api_key, request).await
            }
        }
    }

    /// Complete via an OpenAI-compatible chat endpoint.
    async fn complete_openai(
        &self,
        base_url: &str,
        api_key: &str,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, LlmError> {
        let url = format!("{base_url}/v1/chat/completions");
        let body = openai_body(request, &self.model);

        let mut last_error = String::new();
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                debug!(
                    "Retrying completion call (attempt {}/{})",
                    attempt + 1,
                    self.max_retries + 1
                );
            }

            let result = self
                .http
                .post(&url)
                .header("Authorization", format!("Bearer {api_key}"))
                .json(&body)
                .timeout(Duration::from_millis(request.timeout_ms))
                .send()
                .await;

            match result {
                Ok(resp) => {
                    if resp.status().is_success() {
                        let mut json: serde_json::Value = resp
                            .json()
                            .await
                            .map_err(|e| LlmError::ParseError(e.to_string()))?;

                        let text = json["choices"][0]["message"]["content"]
                            .as_str()
                            .unwrap_or("")
                            .to_string();

                        let logprobs = match json["choices"][0]["logprobs"].take() {
                            serde_json::Value::Null => None,
                            value => match serde_json::from_value::<CompletionLogProbs>(value) {
                                Ok(probs) => Some(probs),
                                Err(e) => {
                                    debug!("Discarding unparseable logprobs section: {e}");
                                    None
                                }
                            },
                        };

                        return Ok(CompletionResponse { text, logprobs });
                    }
                    last_error = format!("HTTP {}", resp.status());
                    warn!("Completion endpoint returned error: {}", last_error);
                }
                Err(e) => {
                    last_error = e.to_string();
                    if e.is_timeout() {
                        warn!("Completion request timed out after {}ms", request.timeout_ms);
                    } else {
                        warn!("Completion request failed: {}", last_error);
                    }
                }
            }
        }

        Err(LlmError::RetriesExhausted {
            attempts: self.max_retries + 1,
            last_error,
        })
    }

    /// Complete via Ollama's generate endpoint. Ollama reports no
    /// log-probabilities, so `logprobs` is always `None` here.
    async fn complete_ollama(
        &self,
        base_url: &str,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, LlmError> {
        let url = format!("{base_url}/api/generate");
        let body = ollama_body(request, &self.model);

        let mut last_error = String::new();
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                debug!(
                    "Retrying completion call (attempt {}/{})",
                    attempt + 1,
                    self.max_retries + 1
                );
            }

            let result = self
                .http
                .post(&url)
                .json(&body)
                .timeout(Duration::from_millis(request.timeout_ms))
                .send()
                .await;

            match result {
                Ok(resp) => {
                    if resp.status().is_success() {
                        let json: serde_json::Value = resp
                            .json()
                            .await
                            .map_err(|e| LlmError::ParseError(e.to_string()))?;

                        let text = json["response"].as_str().unwrap_or("").to_string();
                        return Ok(CompletionResponse { text, logprobs: None });
                    }
                    last_error = format!(
                        "HTTP {}: {}",
                        resp.status(),
                        resp.text().await.unwrap_or_default()
                    );
                    warn!("Ollama returned error: {}", last_error);
                }
                Err(e) => {
                    last_error = e.to_string();
                    if e.is_timeout() {
                        warn!("Ollama request timed out after {}ms", request.timeout_ms);
                    } else {
                        warn!("Ollama request failed: {}", last_error);
                    }
                }
            }
        }

        Err(LlmError::RetriesExhausted {
            attempts: self.max_retries + 1,
            last_error,
        })
    }

    /// Parse a completion's text as structured JSON.
    ///
    /// # Errors
    ///
    /// [`LlmError::ParseError`] carrying the raw text, so degraded prompts
    /// show up in logs verbatim.
    pub fn parse_structured<T: serde::de::DeserializeOwned>(
        &self,
        response: &CompletionResponse,
    ) -> Result<T, LlmError> {
        serde_json::from_str(&response.text).map_err(|e| {
            LlmError::ParseError(format!("{e}; raw text: '{}'", response.text))
        })
    }
}

/// Request body for the OpenAI-compatible chat endpoint.
fn openai_body(request: &CompletionRequest, model: &str) -> serde_json::Value {
    let mut body = json!({
        "model": model,
        "messages": [
            { "role": "system", "content": request.system },
            { "role": "user", "content": request.user },
        ],
        "max_tokens": request.max_tokens,
        "temperature": request.temperature,
    });

    if request.response_format == ResponseFormat::JsonObject {
        body["response_format"] = json!({ "type": "json_object" });
    }
    if request.want_logprobs {
        body["logprobs"] = json!(true);
        body["top_logprobs"] = json!(request.top_logprobs);
    }

    body
}

/// Request body for Ollama's generate endpoint. System and user prompts are
/// concatenated; Ollama's JSON mode uses the top-level `format` key.
fn ollama_body(request: &CompletionRequest, model: &str) -> serde_json::Value {
    let mut body = json!({
        "model": model,
        "prompt": format!("{}\n\n{}", request.system, request.user),
        "stream": false,
        "options": {
            "temperature": request.temperature,
            "num_predict": request.max_tokens,
        }
    });

    if request.response_format == ResponseFormat::JsonObject {
        body["format"] = json!("json");
    }

    body
}
