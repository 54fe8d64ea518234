//! Configuration for the confab turn-taking engine.
//!
//! Maps directly to `confab.toml`. Every field has a documented default;
//! unknown keys are ignored so hosts can keep engine settings inside a
//! larger config file.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top level
// ---------------------------------------------------------------------------

/// Top-level engine configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfabConfig {
    /// Saliency recalibration parameters.
    #[serde(default)]
    pub saliency: SaliencyParams,
    /// Default proactivity thresholds for agents that don't override them.
    #[serde(default)]
    pub proactivity: ProactivityConfig,
    /// Turn-cycle orchestration settings.
    #[serde(default)]
    pub turn: TurnConfig,
}

impl ConfabConfig {
    /// Load configuration from a TOML string. Probability fields are
    /// clamped into `[0, 1]` after parsing; non-finite floats (TOML accepts
    /// `nan` and `inf` literals) take the documented defaults.
    ///
    /// # Errors
    /// Returns `ConfabError::Config` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> crate::error::Result<Self> {
        let parsed: Self =
            toml::from_str(toml_str).map_err(|e| crate::ConfabError::Config(e.to_string()))?;
        Ok(parsed.sanitized())
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Clamp all probability-domain fields into their legal ranges and
    /// replace non-finite floats with their defaults.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        self.saliency = self.saliency.sanitized();
        self.proactivity = self.proactivity.sanitized();
        self.turn.memory_threshold = unit_or(self.turn.memory_threshold, 0.3);
        self.turn.thought_threshold = unit_or(self.turn.thought_threshold, 0.3);
        self
    }
}

// ---------------------------------------------------------------------------
// Saliency
// ---------------------------------------------------------------------------

/// Parameters of the saliency formula.
///
/// With every field at its default of 1.0 the formula reduces to a pure
/// max-similarity score with no decay, which is the behavior conversational
/// (rather than long-horizon) deployments want.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SaliencyParams {
    /// Per-turn exponential decay base. 1.0 disables decay exactly.
    #[serde(default = "default_1_0")]
    pub decay_factor: f32,
    /// Weight `b` applied to interpretation similarity.
    #[serde(default = "default_1_0")]
    pub interpretation_weight: f32,
    /// Weight `c` applied to raw-text similarity.
    #[serde(default = "default_1_0")]
    pub text_weight: f32,
}

impl SaliencyParams {
    /// Replace non-finite fields with their default of 1.0. The weights are
    /// otherwise unconstrained; `saliency::compute_saliency` takes any
    /// finite multiplier.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        self.decay_factor = finite_or(self.decay_factor, 1.0);
        self.interpretation_weight = finite_or(self.interpretation_weight, 1.0);
        self.text_weight = finite_or(self.text_weight, 1.0);
        self
    }
}

impl Default for SaliencyParams {
    fn default() -> Self {
        Self {
            decay_factor: 1.0,
            interpretation_weight: 1.0,
            text_weight: 1.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Proactivity
// ---------------------------------------------------------------------------

/// Per-agent thresholds governing when a thought is worth the floor.
/// All fields live in `[0, 1]` and are clamped at construction; non-finite
/// values fall back to the defaults.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ProactivityConfig {
    /// Minimum intrinsic motivation to volunteer when the floor is open.
    #[serde(default = "default_0_7")]
    pub im_threshold: f32,
    /// Probability of a reflexive System-1 interjection when nothing
    /// clears `im_threshold`.
    #[serde(default = "default_0_3")]
    pub system1_prob: f32,
    /// Minimum intrinsic motivation to interrupt when the floor is
    /// predicted for someone else.
    #[serde(default = "default_0_85")]
    pub interrupt_threshold: f32,
}

impl ProactivityConfig {
    /// Create a config, clamping every field into `[0, 1]`.
    #[must_use]
    pub fn new(im_threshold: f32, system1_prob: f32, interrupt_threshold: f32) -> Self {
        Self {
            im_threshold,
            system1_prob,
            interrupt_threshold,
        }
        .sanitized()
    }

    /// Clamp all fields into `[0, 1]`; non-finite values take the defaults.
    /// `f32::clamp` passes NaN through, and `system1_prob` ends up in a
    /// `gen_bool` call that panics on NaN.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        self.im_threshold = unit_or(self.im_threshold, 0.7);
        self.system1_prob = unit_or(self.system1_prob, 0.3);
        self.interrupt_threshold = unit_or(self.interrupt_threshold, 0.85);
        self
    }
}

impl Default for ProactivityConfig {
    fn default() -> Self {
        Self {
            im_threshold: 0.7,
            system1_prob: 0.3,
            interrupt_threshold: 0.85,
        }
    }
}

// ---------------------------------------------------------------------------
// Turn cycle
// ---------------------------------------------------------------------------

/// Orchestration settings for the turn coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnConfig {
    /// How many trailing events go into a generation context.
    #[serde(default = "default_5_usize")]
    pub history_window: usize,
    /// Top-k long-term memories retrieved per think pass.
    #[serde(default = "default_5_usize")]
    pub memory_top_k: usize,
    /// Top-k long-term memories handed to motivation evaluation. The
    /// evaluator reads a wider excerpt than the generator.
    #[serde(default = "default_10_usize")]
    pub evaluation_top_k: usize,
    /// Saliency floor for memory retrieval.
    #[serde(default = "default_0_3")]
    pub memory_threshold: f32,
    /// Top-k prior System-2 thoughts retrieved per think pass.
    #[serde(default = "default_3_usize")]
    pub thought_top_k: usize,
    /// Saliency floor for thought retrieval.
    #[serde(default = "default_0_3")]
    pub thought_threshold: f32,
    /// How many deliberate System-2 thoughts to request per turn.
    #[serde(default = "default_2_usize")]
    pub system2_thoughts: usize,
    /// Hard timeout for any single external call in milliseconds.
    #[serde(default = "default_30000")]
    pub call_timeout_ms: u64,
    /// Seed for the coordinator's RNG; `None` seeds from entropy.
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            history_window: 5,
            memory_top_k: 5,
            evaluation_top_k: 10,
            memory_threshold: 0.3,
            thought_top_k: 3,
            thought_threshold: 0.3,
            system2_thoughts: 2,
            call_timeout_ms: 30_000,
            rng_seed: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_0_3() -> f32 { 0.3 }
fn default_0_7() -> f32 { 0.7 }
fn default_0_85() -> f32 { 0.85 }
fn default_1_0() -> f32 { 1.0 }
fn default_2_usize() -> usize { 2 }
fn default_3_usize() -> usize { 3 }
fn default_5_usize() -> usize { 5 }
fn default_10_usize() -> usize { 10 }
fn default_30000() -> u64 { 30_000 }

/// Clamp into `[0, 1]`, with non-finite values taking `default`.
fn unit_or(value: f32, default: f32) -> f32 {
    if value.is_finite() { value.clamp(0.0, 1.0) } else { default }
}

/// Pass finite values through; non-finite values take `default`.
fn finite_or(value: f32, default: f32) -> f32 {
    if value.is_finite() { value } else { default }
}
