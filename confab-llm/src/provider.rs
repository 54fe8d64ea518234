//! The completion-backed reasoning provider.
//!
//! Implements the engine's [`ReasoningProvider`] seam over a
//! [`CompletionClient`]: renders prompts from a [`PromptLibrary`], calls the
//! backend, and parses structured output back into engine types.
//!
//! Evaluation deserves a note. The rubric asks for an integer rating 1-5,
//! but a single sampled integer is noisy, so when the backend reports
//! log-probabilities the provider reads the alternatives at the rating
//! token's position and takes the probability-weighted mean over the digit
//! candidates. The result is then multiplied by a small bonus for agents
//! that have stayed quiet (`1.01 ^ turns_silent`), clamped back to `[1, 5]`,
//! and mapped onto the selector's `[0, 1]` domain as `(rating - 1) / 4`.

use async_trait::async_trait;
use tracing::{debug, warn};

use confab_core::error::{ConfabError, Result};
use confab_core::mental::{IntrinsicMotivation, StimulusRef, Thought};
use confab_core::reasoning::{CandidateThought, PredictContext, ReasoningProvider, ThinkContext};
use confab_core::types::{MentalObjectKind, TurnPrediction};

use crate::client::CompletionClient;
use crate::error::LlmError;
use crate::prompt::{self, PromptId, PromptLibrary};
use crate::types::{
    ArticulationPayload, CompletionLogProbs, CompletionRequest, EvaluationPayload,
    SingleThoughtPayload, ThoughtBatchPayload,
};

/// Fixed utterance used when articulation output cannot be parsed or comes
/// back empty. The turn still completes; the agent just says something flat.
pub const FALLBACK_UTTERANCE: &str = "I'm not sure what to say about that.";

/// Alternatives requested per token position during evaluation.
const EVALUATION_TOP_LOGPROBS: u8 = 5;

/// Per-turn multiplier favoring agents that have stayed quiet.
const SILENCE_BONUS_BASE: f32 = 1.01;

/// [`ReasoningProvider`] backed by a completion API.
pub struct LlmReasoningProvider {
    client: CompletionClient,
    prompts: PromptLibrary,
}

impl LlmReasoningProvider {
    /// Wrap a client with the built-in prompt set.
    #[must_use]
    pub fn new(client: CompletionClient) -> Self {
        Self {
            client,
            prompts: PromptLibrary::builtin(),
        }
    }

    /// Swap in a custom prompt library (for example one loaded with
    /// [`PromptLibrary::from_directory`]).
    #[must_use]
    pub fn with_prompts(mut self, prompts: PromptLibrary) -> Self {
        self.prompts = prompts;
        self
    }

    /// Render a template into a request carrying the template's sampling
    /// knobs.
    fn build_request(
        &self,
        id: PromptId,
        vars: &[(&str, &str)],
    ) -> std::result::Result<CompletionRequest, LlmError> {
        let tpl = self
            .prompts
            .get(id)
            .ok_or_else(|| LlmError::Config(format!("prompt template '{id}' not loaded")))?;
        Ok(CompletionRequest::new(
            prompt::render_template(&tpl.system, vars),
            prompt::render_template(&tpl.user, vars),
        )
        .with_temperature(tpl.temperature)
        .with_max_tokens(tpl.max_tokens))
    }

    /// One quick System-1 reaction. A malformed or empty response loses only
    /// this reaction, never the whole pass.
    async fn system1(
        &self,
        ctx: &ThinkContext,
    ) -> std::result::Result<Option<CandidateThought>, LlmError> {
        let history = prompt::format_history(&ctx.recent_events);
        let request = self
            .build_request(
                PromptId::System1Generation,
                &[
                    ("agent_name", ctx.agent_name.as_str()),
                    ("scene", ctx.scene.as_str()),
                    ("persona", ctx.persona.as_str()),
                    ("history", history.as_str()),
                ],
            )?
            .json();

        let response = self.client.complete(&request).await?;
        let payload: SingleThoughtPayload = match self.client.parse_structured(&response) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(agent = %ctx.agent_name, "Discarding unparseable System-1 output: {e}");
                return Ok(None);
            }
        };

        let content = payload.thought.trim();
        if content.is_empty() {
            return Ok(None);
        }

        // A reflexive reaction reacts to the transcript itself.
        let stimuli: Vec<StimulusRef> = ctx
            .recent_events
            .iter()
            .map(|e| StimulusRef::Event(e.turn))
            .collect();
        Ok(Some(CandidateThought {
            kind: MentalObjectKind::ThoughtSystem1,
            content: content.to_string(),
            stimuli,
        }))
    }

    /// Up to `ctx.system2_count` deliberate System-2 thoughts with parsed
    /// provenance tags.
    async fn system2(
        &self,
        ctx: &ThinkContext,
    ) -> std::result::Result<Vec<CandidateThought>, LlmError> {
        let count = ctx.system2_count.to_string();
        let tagged_history = prompt::format_tagged_history(&ctx.recent_events);
        let memories = prompt::format_memories(&ctx.salient_memories);
        let prior_thoughts = prompt::format_thoughts(&ctx.salient_thoughts);

        let request = self
            .build_request(
                PromptId::System2Generation,
                &[
                    ("agent_name", ctx.agent_name.as_str()),
                    ("scene", ctx.scene.as_str()),
                    ("persona", ctx.persona.as_str()),
                    ("count", count.as_str()),
                    ("tagged_history", tagged_history.as_str()),
                    ("memories", memories.as_str()),
                    ("prior_thoughts", prior_thoughts.as_str()),
                ],
            )?
            .json();

        let response = self.client.complete(&request).await?;
        let payload: ThoughtBatchPayload = self.client.parse_structured(&response)?;

        let mut thoughts = Vec::new();
        for entry in payload.thoughts.into_iter().take(ctx.system2_count) {
            let content = entry.content.trim();
            if content.is_empty() {
                debug!(agent = %ctx.agent_name, "Skipping empty System-2 thought");
                continue;
            }
            let stimuli: Vec<StimulusRef> = entry
                .stimuli
                .iter()
                .filter_map(|tag| {
                    let parsed = prompt::parse_stimulus_tag(tag);
                    if parsed.is_none() {
                        debug!(agent = %ctx.agent_name, tag = %tag, "Dropping malformed stimulus tag");
                    }
                    parsed
                })
                .collect();
            thoughts.push(CandidateThought {
                kind: MentalObjectKind::ThoughtSystem2,
                content: content.to_string(),
                stimuli,
            });
        }
        Ok(thoughts)
    }
}

#[async_trait]
impl ReasoningProvider for LlmReasoningProvider {
    async fn generate_thoughts(&self, ctx: &ThinkContext) -> Result<Vec<CandidateThought>> {
        let (system1, system2) = tokio::join!(self.system1(ctx), self.system2(ctx));

        // System-2 carries the substance; its failure fails the pass and the
        // engine degrades this agent's turn. A broken System-1 response only
        // loses the reflexive reaction.
        let mut thoughts = Vec::new();
        match system1 {
            Ok(Some(thought)) => thoughts.push(thought),
            Ok(None) => {}
            Err(e) => warn!(agent = %ctx.agent_name, "System-1 generation failed: {e}"),
        }
        thoughts.extend(system2.map_err(external)?);
        Ok(thoughts)
    }

    async fn evaluate_motivation(
        &self,
        ctx: &ThinkContext,
        thought: &Thought,
    ) -> Result<IntrinsicMotivation> {
        let participants = prompt::format_name_list(&ctx.participant_names);
        let history = prompt::format_history(&ctx.recent_events);
        let long_term_memories = prompt::format_bullet_list(&ctx.evaluation_memories);

        let request = self
            .build_request(
                PromptId::MotivationEvaluation,
                &[
                    ("agent_name", ctx.agent_name.as_str()),
                    ("participants", participants.as_str()),
                    ("history", history.as_str()),
                    ("long_term_memories", long_term_memories.as_str()),
                    ("thought", thought.object.content.as_str()),
                ],
            )
            .map_err(external)?
            .json()
            .with_logprobs(EVALUATION_TOP_LOGPROBS);

        let response = self.client.complete(&request).await.map_err(external)?;
        let payload: EvaluationPayload =
            self.client.parse_structured(&response).map_err(external)?;

        let base = payload.rating;
        let weighted = response
            .logprobs
            .as_ref()
            .map_or(base, |probs| weighted_rating(probs, base));
        let adjusted = apply_silence_bonus(weighted, ctx.turns_silent);
        let score = normalize_rating(adjusted);

        debug!(
            agent = %ctx.agent_name,
            base_rating = base,
            weighted_rating = weighted,
            score,
            "Evaluated thought"
        );

        Ok(IntrinsicMotivation::new(payload.reasoning, score))
    }

    async fn articulate(&self, ctx: &ThinkContext, thought: &Thought) -> Result<String> {
        let participants = prompt::format_name_list(&ctx.participant_names);
        let request = self
            .build_request(
                PromptId::Articulation,
                &[
                    ("agent_name", ctx.agent_name.as_str()),
                    ("participants", participants.as_str()),
                    ("scene", ctx.scene.as_str()),
                    ("persona", ctx.persona.as_str()),
                    ("thought", thought.object.content.as_str()),
                ],
            )
            .map_err(external)?
            .json();

        let response = self.client.complete(&request).await.map_err(external)?;
        let text = match self.client.parse_structured::<ArticulationPayload>(&response) {
            Ok(payload) => payload.articulation.trim().to_string(),
            Err(e) => {
                warn!(agent = %ctx.agent_name, "Articulation output unusable, using the fallback line: {e}");
                String::new()
            }
        };

        if text.is_empty() {
            return Ok(FALLBACK_UTTERANCE.to_string());
        }
        Ok(text)
    }

    async fn predict_next_turn(&self, ctx: &PredictContext) -> Result<TurnPrediction> {
        let speaker_count = ctx.participant_names.len().to_string();
        let participants = prompt::format_name_list(&ctx.participant_names);
        let history = prompt::format_history(&ctx.recent_events);

        let request = self
            .build_request(
                PromptId::TurnPrediction,
                &[
                    ("speaker_count", speaker_count.as_str()),
                    ("participants", participants.as_str()),
                    ("history", history.as_str()),
                ],
            )
            .map_err(external)?;

        let response = self.client.complete(&request).await.map_err(external)?;
        Ok(parse_prediction(&response.text))
    }
}

/// Map a completion-layer failure onto the engine's external-call error.
fn external(err: LlmError) -> ConfabError {
    ConfabError::external("completion", err.to_string())
}

/// Parse a (possibly space-prefixed) token as a rating digit 1-5.
fn digit_rating(token: &str) -> Option<u8> {
    let digit: u8 = token.trim().parse().ok()?;
    (1..=5).contains(&digit).then_some(digit)
}

/// Probability-weighted rating. The rating digit is the last digit token in
/// the completion (the rubric key also contains digits, so the scan runs
/// from the end); the alternatives at that position are averaged with
/// weights `exp(logprob)`. Falls back to `base` when no digit token or no
/// digit alternatives exist.
fn weighted_rating(logprobs: &CompletionLogProbs, base: f32) -> f32 {
    let Some(rating_token) = logprobs
        .content
        .iter()
        .rev()
        .find(|t| digit_rating(&t.token).is_some())
    else {
        return base;
    };

    let mut weighted_sum = 0.0_f32;
    let mut probability_sum = 0.0_f32;
    for alt in &rating_token.top_logprobs {
        if let Some(digit) = digit_rating(&alt.token) {
            let probability = alt.logprob.exp();
            weighted_sum += f32::from(digit) * probability;
            probability_sum += probability;
        }
    }

    if probability_sum > 0.0 {
        weighted_sum / probability_sum
    } else {
        base
    }
}

/// Boost ratings for agents that have stayed quiet, then clamp back to the
/// scale: `rating * 1.01 ^ turns_silent`, clamped to `[1, 5]`.
fn apply_silence_bonus(rating: f32, turns_silent: u64) -> f32 {
    let bonus = SILENCE_BONUS_BASE.powf(turns_silent as f32);
    (rating * bonus).clamp(1.0, 5.0)
}

/// Map the adjusted 1-5 rating onto the selector's `[0, 1]` domain.
fn normalize_rating(rating: f32) -> f32 {
    (rating.clamp(1.0, 5.0) - 1.0) / 4.0
}

/// Normalize the predictor's raw reply. Name validation against the roster
/// happens upstream in the coordinator; this only strips quoting and
/// catches the explicit open-floor answer.
fn parse_prediction(text: &str) -> TurnPrediction {
    let name = text.trim().trim_matches('"').trim();
    if name.is_empty() || name.eq_ignore_ascii_case("anyone") {
        TurnPrediction::Anyone
    } else {
        TurnPrediction::Named(name.to_string())
    }
}
