//! Reply fragmentation and typing-delay simulation.
//!
//! Generated replies are split into a few chat-sized fragments, each with a
//! simulated typing delay, and an initial "thinking" delay is derived from the
//! incoming message. Everything here is a pure function of its inputs and the
//! injected RNG; waiting happens in the delivery layer.

use crate::config::TimingConfig;
use crate::lexicon::KeywordMatcher;
use crate::profile::{AttachmentStyle, PersonaProfile, SCORE_DEFAULT, SCORE_MAX, SCORE_MIN};
use rand::Rng;
use serde::{Deserialize, Serialize};

const SENTENCE_TERMINATORS: &[char] = &['.', '!', '?', '…'];
const CLAUSE_TERMINATORS: &[char] = &[',', ';', ':'];

/// One chat bubble and the typing time before it is sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageFragment {
    pub text: String,
    pub delay_ms: u64,
}

/// Persona traits that shape timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleParams {
    pub attachment: AttachmentStyle,
    /// 1 (warm) to 10 (cold)
    pub coldness: u8,
}

impl Default for StyleParams {
    fn default() -> Self {
        Self {
            attachment: AttachmentStyle::Secure,
            coldness: SCORE_DEFAULT,
        }
    }
}

impl StyleParams {
    pub fn new(attachment: AttachmentStyle, coldness: u8) -> Self {
        Self {
            attachment,
            coldness: coldness.clamp(SCORE_MIN, SCORE_MAX),
        }
    }

    /// Coldness is the mean of avoidance and inverted agreeableness.
    pub fn from_profile(profile: &PersonaProfile) -> Self {
        let avoidance = profile.attachment.avoidance_score as f64;
        let distance = (SCORE_MAX + SCORE_MIN).saturating_sub(profile.personality.agreeableness) as f64;
        let coldness = ((avoidance + distance) / 2.0).round() as u8;
        Self::new(profile.attachment.style, coldness)
    }

    fn typing_multiplier(&self) -> f64 {
        match self.attachment {
            AttachmentStyle::Secure => 1.0,
            AttachmentStyle::Anxious => 0.75,
            AttachmentStyle::Avoidant => 1.4,
            AttachmentStyle::FearfulAvoidant => 1.2,
        }
    }

    fn response_multiplier(&self) -> f64 {
        match self.attachment {
            AttachmentStyle::Secure => 1.0,
            AttachmentStyle::Anxious => 0.5,
            AttachmentStyle::Avoidant => 1.8,
            AttachmentStyle::FearfulAvoidant => 1.3,
        }
    }

    /// Factor applied when the incoming message is emotionally loaded.
    fn salience_factor(&self) -> f64 {
        match self.attachment {
            AttachmentStyle::Secure => 0.8,
            AttachmentStyle::Anxious => 0.6,
            AttachmentStyle::Avoidant => 1.5,
            AttachmentStyle::FearfulAvoidant => 1.2,
        }
    }

    /// 0.6 for the warmest persona, 1.5 for the coldest.
    fn tone_modifier(&self) -> f64 {
        0.5 + self.coldness.clamp(SCORE_MIN, SCORE_MAX) as f64 * 0.1
    }
}

/// Splits `reply` into delayed fragments.
///
/// Concatenating the fragment texts reproduces `reply` exactly; surrounding
/// whitespace stays attached to the first and last fragment.
pub fn fragment<R: Rng + ?Sized>(
    reply: &str,
    style: &StyleParams,
    config: &TimingConfig,
    rng: &mut R,
) -> Vec<MessageFragment> {
    if reply.trim().chars().count() < config.single_fragment_max_chars {
        return vec![MessageFragment {
            text: reply.to_string(),
            delay_ms: 0,
        }];
    }

    let mut segments = split_after(reply, SENTENCE_TERMINATORS);
    if segments.len() < 2 {
        segments = split_after(reply, CLAUSE_TERMINATORS);
    }
    let groups = group_segments(segments, config.min_fragment_chars, config.max_fragments.max(1));

    groups
        .into_iter()
        .map(|text| {
            let delay_ms = typing_delay(&text, style, config, rng);
            MessageFragment { text, delay_ms }
        })
        .collect()
}

/// "Thinking" time before the first fragment of a reply to `incoming`.
pub fn initial_delay<R: Rng + ?Sized>(
    incoming: &str,
    style: &StyleParams,
    config: &TimingConfig,
    rng: &mut R,
) -> u64 {
    let load = if is_salient(incoming, config) {
        style.salience_factor()
    } else {
        1.0
    };
    let raw = config.initial_base_ms as f64
        * style.response_multiplier()
        * load
        * style.tone_modifier()
        * jitter(config.initial_jitter, rng);
    clamp_ms(raw, config.initial_min_ms, config.initial_max_ms)
}

/// Whether a message contains any of the configured salience keywords.
pub fn is_salient(text: &str, config: &TimingConfig) -> bool {
    KeywordMatcher::new(&config.salience_keywords).matches(text)
}

fn typing_delay<R: Rng + ?Sized>(
    text: &str,
    style: &StyleParams,
    config: &TimingConfig,
    rng: &mut R,
) -> u64 {
    let chars = text.trim().chars().count() as f64;
    let raw = (config.fragment_base_ms as f64 + config.per_char_ms as f64 * chars)
        * style.typing_multiplier()
        * jitter(config.fragment_jitter, rng);
    clamp_ms(raw, config.fragment_min_ms, config.fragment_max_ms)
}

fn jitter<R: Rng + ?Sized>(amount: f64, rng: &mut R) -> f64 {
    let amount = if amount.is_finite() {
        amount.clamp(0.0, 0.9)
    } else {
        0.0
    };
    rng.gen_range(1.0 - amount..=1.0 + amount)
}

fn clamp_ms(raw: f64, min: u64, max: u64) -> u64 {
    let (lo, hi) = (min.min(max), min.max(max));
    if !raw.is_finite() {
        return lo;
    }
    (raw.round().max(0.0) as u64).clamp(lo, hi)
}

/// Cuts `text` after each run of `terminators` that is followed by whitespace
/// or the end, and after each newline. Trailing whitespace stays with the
/// segment before the cut.
fn split_after(text: &str, terminators: &[char]) -> Vec<String> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut segments = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i].1;
        let is_break = if c == '\n' {
            true
        } else if terminators.contains(&c) {
            while i + 1 < chars.len() && terminators.contains(&chars[i + 1].1) {
                i += 1;
            }
            i + 1 == chars.len() || chars[i + 1].1.is_whitespace()
        } else {
            false
        };

        i += 1;
        if is_break {
            while i < chars.len() && chars[i].1.is_whitespace() {
                i += 1;
            }
            let end = chars.get(i).map_or(text.len(), |(offset, _)| *offset);
            segments.push(text[start..end].to_string());
            start = end;
        }
    }
    if start < text.len() {
        segments.push(text[start..].to_string());
    }

    // Leading whitespace-only segments join their successor.
    let mut merged: Vec<String> = Vec::with_capacity(segments.len());
    let mut pending = String::new();
    for segment in segments {
        if segment.trim().is_empty() {
            pending.push_str(&segment);
            continue;
        }
        merged.push(std::mem::take(&mut pending) + &segment);
    }
    match merged.last_mut() {
        Some(last) => last.push_str(&pending),
        None if !pending.is_empty() => merged.push(pending),
        None => {}
    }
    merged
}

fn visible_len(text: &str) -> usize {
    text.trim().chars().count()
}

/// Greedily groups segments until each reaches `min_chars`, merges a short
/// tail into its predecessor, then merges the smallest adjacent pair until at
/// most `max` groups remain.
fn group_segments(segments: Vec<String>, min_chars: usize, max: usize) -> Vec<String> {
    let mut groups: Vec<String> = Vec::new();
    let mut current = String::new();
    for segment in segments {
        current.push_str(&segment);
        if visible_len(&current) >= min_chars {
            groups.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        match groups.last_mut() {
            Some(last) => last.push_str(&current),
            None => groups.push(current),
        }
    }

    while groups.len() > max {
        let pair = (0..groups.len() - 1)
            .min_by_key(|&i| visible_len(&groups[i]) + visible_len(&groups[i + 1]))
            .unwrap_or(0);
        let next = groups.remove(pair + 1);
        groups[pair].push_str(&next);
    }
    groups
}
