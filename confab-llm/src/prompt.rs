//! Prompt templates for the reasoning provider.
//!
//! Every prompt is a versioned, testable artifact. The built-in constants
//! below ship with the crate; deployments that want to iterate on wording
//! load overrides from a directory of TOML files via
//! [`PromptLibrary::from_directory`].
//!
//! Context sections follow a fixed line grammar the models are told about:
//! transcript lines render as `Name: content`, and provenance-tagged context
//! lines lead with `CON#<turn>`, `MEM#<id>`, or `THO#<id>` markers that
//! generated thoughts cite back as stimuli.

use confab_core::mental::StimulusRef;
use confab_core::reasoning::{EventExcerpt, MentalExcerpt};
use confab_core::types::MentalObjectId;

use crate::error::LlmError;

/// Shared system prompt for both thought-generation passes.
pub const GENERATION_SYSTEM: &str = r"You are playing a role as a participant in a multi-party conversation. Your name in the conversation is {agent_name}.
The scene: {scene}
Your persona: {persona}
You will generate thoughts in JSON format.";

/// System-1 generation: one quick, automatic reaction.
pub const SYSTEM1_USER: &str = r#"You are simulating the process of forming a thought in parallel with the conversation. Use System 1 thinking: quick, automatic responses rather than deep reasoning or recalled memories.
For example: backchanneling, expressing acknowledgement, expressing surprise, showing interest, a spontaneous reaction to a joke, or a reflexive response to a question.
Form ONE thought that reflects a generic and intuitive reaction to the ongoing conversation. It should be succinct, less than 15 words.

Below are the previous utterances in the conversation:
{history}

Respond with a JSON object in the following format:
{"thought": "Your generated thought here"}"#;

/// System-2 generation: a batch of deliberate thoughts with provenance tags.
pub const SYSTEM2_USER: &str = r#"You are simulating the process of forming thoughts in parallel with the conversation.
You are provided contexts including the conversation history, your salient memories, and your previous thoughts. Leverage or be inspired by whichever contexts are most likely to come up at this point.

Form {count} thought(s) that you would most likely have at this point in the conversation, given the context.
Each thought should be as succinct as possible, less than 15 words.
Ensure the thoughts are diverse and distinct: no thought may repeat another in the same batch, and all must stay consistent with the provided contexts.

For each thought, provide the stimuli from the contexts that triggered it. Stimuli can be:
- Conversation history: CON#id
- Salient memories: MEM#id
- Previous thoughts: THO#id
where id is the number in the context line, for example MEM#3, THO#2, CON#14. A thought can have MORE THAN ONE stimulus.

Below are the contexts of the given conversation:
Conversation history:
{tagged_history}
Salient memories:
{memories}
Previous thoughts:
{prior_thoughts}

Respond with a JSON object in the following format:
{"thoughts": [{"content": "The thought content here", "stimuli": ["CON#0", "MEM#1", "THO#2"]}]}"#;

/// Motivation evaluation system prompt.
pub const EVALUATION_SYSTEM: &str = r"You are an assistant helping to evaluate a thought in a conversation.
You will provide your evaluation in JSON format.";

/// Motivation evaluation rubric. Asks for an integer rating so the
/// probability mass concentrates on single digit tokens.
pub const EVALUATION_USER: &str = r#"<Instruction>
You will be given:
(1) A conversation between {participants}.
(2) A thought formed by {agent_name} at this moment of the conversation.
(3) The salient long-term memories of {agent_name}: objectives, knowledge, interests.

Your task is to rate the thought on one metric.

<Evaluation Criteria>
Intrinsic Motivation to Engage (1-5): if you were {agent_name}, how strongly and likely would you want to express this thought and participate in the conversation at this moment?
- 1 (Very Low): unlikely to express it, even after a long pause or an invitation to speak.
- 2 (Low): would only consider speaking after a noticeable pause, if no one else takes the turn.
- 3 (Neutral): fine with either expressing the thought or staying silent and letting others speak.
- 4 (High): strong desire to participate immediately after the current speaker finishes.
- 5 (Very High): would even interrupt the current speaker to say it.

<Evaluation Steps>
1. Read the previous conversation and the thought formed by {agent_name} carefully.
2. Read the long-term memory of {agent_name} carefully.
3. Weigh the internal factors (relevance to memory, information gap, new information, expected impact, urgency) against the external social factors (coherence with the last utterance, originality, balance of participation, whether someone else clearly holds the floor).
4. In the reasoning, first name the strongest factors for expressing the thought, then the strongest factors against.
5. Rate the thought on the 1-5 scale according to the Evaluation Criteria.

<Context>
Conversation history:
{history}
Long-term memory:
{long_term_memories}
Thought: {thought}

Respond with a JSON object in the following format:
{"reasoning": "Your reasoning here", "rating (1-5)": 3}

Note: the rating must be an integer between 1 and 5."#;

/// Articulation system prompt.
pub const ARTICULATION_SYSTEM: &str = r"You are playing a role as a participant in a multi-party conversation with {participants}. Your name in the conversation is {agent_name}.
The scene: {scene}
Your persona: {persona}";

/// Articulation instructions: turn the winning thought into one short line.
pub const ARTICULATION_USER: &str = r#"Articulate what you would say based on the current thought you have, as if you were to speak next in the conversation.
Be as concise and succinct as possible, in under 15 words. Do not try to be too clever or too verbose.
Keep it in ONE single sentence as much as possible and leave room for others to respond.
Do not mention another participant's name in your response unless absolutely necessary.
Do not be repetitive or repeat what previous speakers have said.
Make the response sound human-like and natural, something one would say in an online chat. The occasional typo or colloquialism is fine, but keep it easy to understand.

Current thought: {thought}

Respond with a JSON object in the following format:
{"articulation": "The text here"}"#;

/// Turn-prediction system prompt. Plain text out; the reply is a bare name.
pub const PREDICTION_SYSTEM: &str = r#"This is a conversation between {speaker_count} speakers. The speakers are: {participants}. Predict who the next speaker will be based on the most recent utterances. Return ONLY the speaker name. If the next turn is not clearly allocated to a specific speaker and any speaker could take the floor, return "anyone"."#;

/// Turn-prediction task body.
pub const PREDICTION_USER: &str = r"<Task>Most recent utterances:
{history}
Prediction: ";

/// Simple template interpolation: replaces `{key}` with the matching value.
/// Unknown placeholders are left untouched.
#[must_use]
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{key}}}"), value);
    }
    result
}

// ---------------------------------------------------------------------------
// Context renderers — the fixed line grammar the prompts describe
// ---------------------------------------------------------------------------

/// Transcript lines, `Name: content`, oldest first, one per line.
#[must_use]
pub fn format_history(events: &[EventExcerpt]) -> String {
    events
        .iter()
        .map(|e| format!("{}: {}\n", e.speaker, e.content))
        .collect()
}

/// Transcript lines with citable turn markers: `CON#<turn>: Name: content`.
#[must_use]
pub fn format_tagged_history(events: &[EventExcerpt]) -> String {
    events
        .iter()
        .map(|e| format!("CON#{}: {}: {}\n", e.turn, e.speaker, e.content))
        .collect()
}

/// Memory lines with citable id markers: `MEM#<id>: content`.
#[must_use]
pub fn format_memories(memories: &[MentalExcerpt]) -> String {
    memories
        .iter()
        .map(|m| format!("MEM#{}: {}\n", m.id.0, m.content))
        .collect()
}

/// Prior-thought lines with citable id markers: `THO#<id>: content`.
#[must_use]
pub fn format_thoughts(thoughts: &[MentalExcerpt]) -> String {
    thoughts
        .iter()
        .map(|t| format!("THO#{}: {}\n", t.id.0, t.content))
        .collect()
}

/// Untagged bullet list, `- content`, for the evaluation rubric's memory
/// section.
#[must_use]
pub fn format_bullet_list(items: &[MentalExcerpt]) -> String {
    items.iter().map(|m| format!("- {}\n", m.content)).collect()
}

/// Comma-joined name list for "conversation between ..." clauses.
#[must_use]
pub fn format_name_list(names: &[String]) -> String {
    names.join(", ")
}

/// Parse one stimulus tag back into a [`StimulusRef`].
///
/// `CON#<turn>` cites an event; `MEM#<id>` and `THO#<id>` both cite a mental
/// object (memories and thoughts share one id namespace). Whitespace around
/// the tag is tolerated; anything else returns `None` and the tag is
/// dropped.
#[must_use]
pub fn parse_stimulus_tag(tag: &str) -> Option<StimulusRef> {
    let tag = tag.trim();
    if let Some(turn) = tag.strip_prefix("CON#") {
        return turn.trim().parse().ok().map(StimulusRef::Event);
    }
    let id = tag.strip_prefix("MEM#").or_else(|| tag.strip_prefix("THO#"))?;
    id.trim()
        .parse()
        .ok()
        .map(|n| StimulusRef::Mental(MentalObjectId(n)))
}

// ---------------------------------------------------------------------------
// PromptLibrary — versioned TOML template loading
// ---------------------------------------------------------------------------

use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Identifies a prompt template by the operation it drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptId {
    /// One quick System-1 reaction.
    System1Generation,
    /// A batch of deliberate System-2 thoughts.
    System2Generation,
    /// Intrinsic-motivation rating of one thought.
    MotivationEvaluation,
    /// Winning thought to utterance text.
    Articulation,
    /// Next-speaker prediction.
    TurnPrediction,
}

impl PromptId {
    /// The TOML filename (without path) holding an override for this prompt.
    #[must_use]
    pub fn filename(self) -> &'static str {
        match self {
            Self::System1Generation => "system1_generation.toml",
            Self::System2Generation => "system2_generation.toml",
            Self::MotivationEvaluation => "motivation_evaluation.toml",
            Self::Articulation => "articulation.toml",
            Self::TurnPrediction => "turn_prediction.toml",
        }
    }

    /// All prompt IDs.
    #[must_use]
    pub fn all() -> &'static [PromptId] {
        &[
            Self::System1Generation,
            Self::System2Generation,
            Self::MotivationEvaluation,
            Self::Articulation,
            Self::TurnPrediction,
        ]
    }
}

impl fmt::Display for PromptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::System1Generation => "system1_generation",
            Self::System2Generation => "system2_generation",
            Self::MotivationEvaluation => "motivation_evaluation",
            Self::Articulation => "articulation",
            Self::TurnPrediction => "turn_prediction",
        };
        write!(f, "{name}")
    }
}

impl FromStr for PromptId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system1_generation" => Ok(Self::System1Generation),
            "system2_generation" => Ok(Self::System2Generation),
            "motivation_evaluation" => Ok(Self::MotivationEvaluation),
            "articulation" => Ok(Self::Articulation),
            "turn_prediction" => Ok(Self::TurnPrediction),
            _ => Err(format!("unknown prompt id: '{s}'")),
        }
    }
}

/// On-disk shape of a template override file.
#[derive(Debug, Clone, Deserialize)]
struct TomlPromptFile {
    prompt: TomlPromptData,
}

/// Inner `[prompt]` section of a TOML file.
#[derive(Debug, Clone, Deserialize)]
struct TomlPromptData {
    version: String,
    temperature: f32,
    max_tokens: u32,
    system: String,
    user: String,
}

/// A loaded, ready-to-render prompt template.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// Prompt version string ("builtin" for the compiled-in set).
    pub version: String,
    /// Sampling temperature for this operation.
    pub temperature: f32,
    /// Output token budget for this operation.
    pub max_tokens: u32,
    /// System prompt template (contains `{key}` placeholders).
    pub system: String,
    /// User prompt template (contains `{key}` placeholders).
    pub user: String,
}

/// The full set of prompt templates the provider renders from.
#[derive(Debug, Clone)]
pub struct PromptLibrary {
    templates: HashMap<PromptId, PromptTemplate>,
}

impl PromptLibrary {
    /// The compiled-in templates. Always covers every [`PromptId`].
    #[must_use]
    pub fn builtin() -> Self {
        let mut templates = HashMap::new();

        templates.insert(
            PromptId::System1Generation,
            PromptTemplate {
                version: "builtin".into(),
                temperature: 0.7,
                max_tokens: 150,
                system: GENERATION_SYSTEM.into(),
                user: SYSTEM1_USER.into(),
            },
        );

        templates.insert(
            PromptId::System2Generation,
            PromptTemplate {
                version: "builtin".into(),
                temperature: 0.7,
                max_tokens: 400,
                system: GENERATION_SYSTEM.into(),
                user: SYSTEM2_USER.into(),
            },
        );

        // Low temperature keeps ratings stable across repeated evaluations.
        templates.insert(
            PromptId::MotivationEvaluation,
            PromptTemplate {
                version: "builtin".into(),
                temperature: 0.3,
                max_tokens: 400,
                system: EVALUATION_SYSTEM.into(),
                user: EVALUATION_USER.into(),
            },
        );

        templates.insert(
            PromptId::Articulation,
            PromptTemplate {
                version: "builtin".into(),
                temperature: 0.7,
                max_tokens: 100,
                system: ARTICULATION_SYSTEM.into(),
                user: ARTICULATION_USER.into(),
            },
        );

        templates.insert(
            PromptId::TurnPrediction,
            PromptTemplate {
                version: "builtin".into(),
                temperature: 0.7,
                max_tokens: 10,
                system: PREDICTION_SYSTEM.into(),
                user: PREDICTION_USER.into(),
            },
        );

        Self { templates }
    }

    /// Load template overrides from a directory of TOML files.
    ///
    /// Starts from [`PromptLibrary::builtin`] and replaces any template whose
    /// [`PromptId::filename`] exists in the directory; prompts without an
    /// override file keep the builtin. Unrecognized files are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Config`] if a matching file cannot be read or
    /// parsed, or if the directory contains no recognized template at all.
    pub fn from_directory(dir: impl AsRef<Path>) -> Result<Self, LlmError> {
        let dir = dir.as_ref();
        let mut library = Self::builtin();
        let mut found = 0_usize;

        for id in PromptId::all() {
            let path: PathBuf = dir.join(id.filename());
            if path.exists() {
                let content = std::fs::read_to_string(&path).map_err(|e| {
                    LlmError::Config(format!("failed to read {}: {e}", path.display()))
                })?;
                let parsed: TomlPromptFile = toml::from_str(&content).map_err(|e| {
                    LlmError::Config(format!("failed to parse {}: {e}", path.display()))
                })?;

                let d = parsed.prompt;
                library.templates.insert(
                    *id,
                    PromptTemplate {
                        version: d.version,
                        temperature: d.temperature,
                        max_tokens: d.max_tokens,
                        system: d.system,
                        user: d.user,
                    },
                );
                found += 1;
            }
        }

        if found == 0 {
            return Err(LlmError::Config(format!(
                "no prompt templates found in directory: {}",
                dir.display()
            )));
        }

        Ok(library)
    }

    /// Get a template by ID.
    #[must_use]
    pub fn get(&self, id: PromptId) -> Option<&PromptTemplate> {
        self.templates.get(&id)
    }

    /// Render both system and user prompts for an ID.
    ///
    /// Returns `(system_prompt, user_prompt)` with all `{key}` placeholders
    /// replaced.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Config`] if the ID has no loaded template.
    pub fn render(
        &self,
        id: PromptId,
        vars: &[(&str, &str)],
    ) -> Result<(String, String), LlmError> {
        let tpl = self
            .get(id)
            .ok_or_else(|| LlmError::Config(format!("prompt template '{id}' not loaded")))?;

        let system = render_template(&tpl.system, vars);
        let user = render_template(&tpl.user, vars);
        Ok((system, user))
    }

    /// Number of loaded templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether no templates are loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl Default for PromptLibrary {
    fn default() -> Self {
        Self::builtin()
    }
}
