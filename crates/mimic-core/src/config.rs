//! Workspace configuration model.
//!
//! Every field carries a default so that a missing or partial `config.toml`
//! still yields a complete configuration. Durations are milliseconds.

use crate::error::Result;
use crate::lexicon::{self, EMOTIONAL_KEYWORDS, FILLER_MESSAGES, SALIENCE_KEYWORDS};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root of `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MimicConfig {
    pub sampler: SamplerConfig,
    pub pipeline: PipelineConfig,
    pub generation: GenerationConfig,
    pub timing: TimingConfig,
}

impl MimicConfig {
    /// Parses a TOML document. An empty document yields defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Token-budgeted sampler settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Global token ceiling for the sampled corpus
    pub target_tokens: usize,
    /// Characters per token for the estimation heuristic
    pub chars_per_token: f64,
    /// Messages reserved from the chronological start
    pub anchor_start_count: usize,
    /// Messages reserved from the chronological end
    pub anchor_end_count: usize,
    /// Maximum share of the target each anchor side may use
    pub anchor_token_share: f64,
    /// Number of longest messages considered
    pub longest_count: usize,
    /// Share of the post-anchor budget for the longest-messages strategy
    pub longest_share: f64,
    /// Share of the post-anchor budget for the emotional strategy
    pub emotional_share: f64,
    /// Share of the post-anchor budget for the stratified strategy
    pub stratified_share: f64,
    /// Number of equal-width strata over the middle of the timeline
    pub strata_count: usize,
    /// Seed for tie-breaking shuffles
    pub seed: u64,
    pub importance: ImportanceWeights,
    pub emotional_keywords: Vec<String>,
    pub filler_messages: Vec<String>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            target_tokens: 400_000,
            chars_per_token: crate::token::DEFAULT_CHARS_PER_TOKEN,
            anchor_start_count: 200,
            anchor_end_count: 300,
            anchor_token_share: 0.15,
            longest_count: 500,
            longest_share: 0.25,
            emotional_share: 0.35,
            stratified_share: 0.40,
            strata_count: 10,
            seed: 42,
            importance: ImportanceWeights::default(),
            emotional_keywords: lexicon::to_owned_list(EMOTIONAL_KEYWORDS),
            filler_messages: lexicon::to_owned_list(FILLER_MESSAGES),
        }
    }
}

/// Weights of the composite importance score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportanceWeights {
    /// Score awarded to a message at or above `length_saturation_chars`
    pub length_weight: f64,
    pub length_saturation_chars: usize,
    /// Score per keyword hit
    pub keyword_weight: f64,
    /// Hits beyond this count add nothing
    pub max_keyword_hits: usize,
    /// Bonus for messages in the first or last `edge_fraction` of the corpus
    pub position_boost: f64,
    pub edge_fraction: f64,
}

impl Default for ImportanceWeights {
    fn default() -> Self {
        Self {
            length_weight: 2.0,
            length_saturation_chars: 200,
            keyword_weight: 1.0,
            max_keyword_hits: 3,
            position_boost: 1.5,
            edge_fraction: 0.1,
        }
    }
}

/// Orchestrator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Minimum number of messages from the subject in the export
    pub min_subject_messages: usize,
    /// Constant spacing between consecutive service calls
    pub call_spacing_ms: u64,
    /// Ceiling for one service call
    pub call_timeout_ms: u64,
    /// Attempts per stage, first call included
    pub max_attempts: u32,
    /// Linear backoff step: the n-th retry waits n × step
    pub backoff_step_ms: u64,
    /// Input sub-budget per stage
    pub stage_token_budget: usize,
    /// Input sub-budget for the family stage
    pub family_token_budget: usize,
    /// Optional deadline for the entire run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_timeout_secs: Option<u64>,
    /// Exemplar exchanges embedded in the persona prompt
    pub exemplar_count: usize,
}

impl PipelineConfig {
    pub fn call_spacing(&self) -> Duration {
        Duration::from_millis(self.call_spacing_ms)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn backoff_step(&self) -> Duration {
        Duration::from_millis(self.backoff_step_ms)
    }

    pub fn overall_timeout(&self) -> Option<Duration> {
        self.overall_timeout_secs.map(Duration::from_secs)
    }

    /// Worst-case wall-clock time of one stage, used for the termination bound.
    pub fn stage_ceiling(&self) -> Duration {
        let attempts = self.max_attempts.max(1) as u64;
        let calls = attempts * (self.call_timeout_ms + self.call_spacing_ms);
        // Σ n × step for n in 1..attempts
        let backoff = self.backoff_step_ms * attempts * (attempts - 1) / 2;
        Duration::from_millis(calls + backoff)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_subject_messages: 50,
            call_spacing_ms: 2_000,
            call_timeout_ms: 60_000,
            max_attempts: 3,
            backoff_step_ms: 5_000,
            stage_token_budget: 120_000,
            family_token_budget: 60_000,
            overall_timeout_secs: None,
            exemplar_count: 30,
        }
    }
}

/// Parameters forwarded to the text-generation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Model override; the service adapter picks its default when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub extraction_temperature: f32,
    pub extraction_max_output_tokens: u32,
    pub reply_temperature: f32,
    pub reply_max_output_tokens: u32,
    /// Conversation turns sent along with a reply request
    pub history_turns: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: None,
            extraction_temperature: 0.3,
            extraction_max_output_tokens: 8_192,
            reply_temperature: 0.9,
            reply_max_output_tokens: 1_024,
            history_turns: 20,
        }
    }
}

/// Fragmentation and typing-delay simulator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Replies shorter than this are sent as one fragment without delay
    pub single_fragment_max_chars: usize,
    /// Adjacent segments are grouped until a fragment reaches this length
    pub min_fragment_chars: usize,
    pub max_fragments: usize,
    pub fragment_base_ms: u64,
    pub per_char_ms: u64,
    pub fragment_min_ms: u64,
    pub fragment_max_ms: u64,
    /// Relative jitter: factors are drawn from `[1 - jitter, 1 + jitter]`
    pub fragment_jitter: f64,
    pub initial_base_ms: u64,
    pub initial_min_ms: u64,
    pub initial_max_ms: u64,
    pub initial_jitter: f64,
    pub salience_keywords: Vec<String>,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            single_fragment_max_chars: 50,
            min_fragment_chars: 25,
            max_fragments: 5,
            fragment_base_ms: 800,
            per_char_ms: 35,
            fragment_min_ms: 600,
            fragment_max_ms: 6_000,
            fragment_jitter: 0.2,
            initial_base_ms: 3_000,
            initial_min_ms: 1_000,
            initial_max_ms: 30_000,
            initial_jitter: 0.25,
            salience_keywords: lexicon::to_owned_list(SALIENCE_KEYWORDS),
        }
    }
}
