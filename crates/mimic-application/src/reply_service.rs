//! Conversation-time replies as the persona.
//!
//! Builds the request from a stored record and recent history, computes the
//! thinking delay, fragments the generated reply and optionally delivers the
//! fragments with real waits.

use mimic_core::config::{GenerationConfig, TimingConfig};
use mimic_core::error::Result;
use mimic_core::fragment::{MessageFragment, fragment, initial_delay};
use mimic_core::generation::{GenerationRequest, TextGenerator};
use mimic_core::record::PersonaRecord;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Who wrote a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    User,
    Persona,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub speaker: Speaker,
    pub text: String,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
        }
    }

    pub fn persona(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Persona,
            text: text.into(),
        }
    }
}

/// A reply ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedReply {
    pub initial_delay_ms: u64,
    pub fragments: Vec<MessageFragment>,
    /// Reply text as generated, before fragmentation
    pub text: String,
}

impl PlannedReply {
    /// Total simulated time from receiving the message to the last fragment.
    pub fn total_delay(&self) -> Duration {
        let typing: u64 = self.fragments.iter().map(|f| f.delay_ms).sum();
        Duration::from_millis(self.initial_delay_ms + typing)
    }
}

/// Generates persona replies.
pub struct ReplyService {
    generator: Arc<dyn TextGenerator>,
    generation: GenerationConfig,
    timing: TimingConfig,
}

impl ReplyService {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        generation: GenerationConfig,
        timing: TimingConfig,
    ) -> Self {
        Self {
            generator,
            generation,
            timing,
        }
    }

    /// Request for the next reply. Only the last `history_turns` turns are sent.
    pub fn build_request(
        &self,
        record: &PersonaRecord,
        history: &[ConversationTurn],
        incoming: &str,
    ) -> GenerationRequest {
        let skip = history.len().saturating_sub(self.generation.history_turns);
        let mut prompt = String::new();
        for turn in &history[skip..] {
            let who = match turn.speaker {
                Speaker::User => "Them",
                Speaker::Persona => "You",
            };
            prompt.push_str(&format!("{who}: {}\n", turn.text));
        }
        prompt.push_str(&format!("Them: {incoming}\nYou:"));

        GenerationRequest::new(prompt)
            .with_system_instruction(record.system_instruction())
            .with_temperature(self.generation.reply_temperature)
            .with_max_output_tokens(self.generation.reply_max_output_tokens)
    }

    /// Generates and fragments a reply without waiting.
    pub async fn plan_reply(
        &self,
        record: &PersonaRecord,
        history: &[ConversationTurn],
        incoming: &str,
        rng: &mut StdRng,
    ) -> Result<PlannedReply> {
        let initial_delay_ms = initial_delay(incoming, &record.style, &self.timing, rng);
        let request = self.build_request(record, history, incoming);
        let raw = self.generator.generate(&request).await?;
        let text = clean_reply(&raw);
        let fragments = fragment(&text, &record.style, &self.timing, rng);

        tracing::debug!(
            "Planned reply for {}: {} fragments after {}ms",
            record.subject_id,
            fragments.len(),
            initial_delay_ms
        );
        Ok(PlannedReply {
            initial_delay_ms,
            fragments,
            text,
        })
    }

    /// Waits out the planned delays, handing each fragment to `deliver` when
    /// it is due.
    pub async fn deliver<F>(plan: &PlannedReply, mut deliver: F)
    where
        F: FnMut(&MessageFragment),
    {
        tokio::time::sleep(Duration::from_millis(plan.initial_delay_ms)).await;
        for fragment in &plan.fragments {
            tokio::time::sleep(Duration::from_millis(fragment.delay_ms)).await;
            deliver(fragment);
        }
    }
}

/// Drops a speaker label the model sometimes echoes ("You: ...").
fn clean_reply(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix("You:")
        .map(str::trim_start)
        .unwrap_or(trimmed)
        .to_string()
}
