//! Learning new facts about a subject from later conversations.

use crate::extractor::{ANALYST_SYSTEM_INSTRUCTION, extract_json_object};
use chrono::Utc;
use mimic_core::config::GenerationConfig;
use mimic_core::error::Result;
use mimic_core::generation::{GenerationRequest, TextGenerator};
use mimic_core::message::{Message, transcript};
use mimic_core::record::LearnedFact;
use serde_json::Value;
use std::sync::Arc;

/// Upper bound on facts kept from one transcript.
pub const MAX_FACTS_PER_RUN: usize = 20;

const LEARN_PROMPT: &str = "Read the conversation below and list new, durable facts about \
{subject}: plans, life events, preferences, people they mention. Skip small talk and anything \
temporary. Rate your confidence in each fact from 0.0 to 1.0.\n\n\
Return exactly this JSON structure:\n\
{\"facts\": [{\"fact\": \"\", \"confidence\": 0.0}]}\n\n\
Conversation:\n";

/// Extracts [`LearnedFact`]s through the text-generation service.
pub struct FactLearner {
    generator: Arc<dyn TextGenerator>,
    generation: GenerationConfig,
}

impl FactLearner {
    pub fn new(generator: Arc<dyn TextGenerator>, generation: GenerationConfig) -> Self {
        Self {
            generator,
            generation,
        }
    }

    /// Returns the facts found in `conversation`.
    ///
    /// A response without usable JSON yields an empty list; only service
    /// failures are errors.
    pub async fn learn(&self, subject: &str, conversation: &[Message]) -> Result<Vec<LearnedFact>> {
        if conversation.is_empty() {
            return Ok(Vec::new());
        }
        let prompt = format!(
            "{}{}",
            LEARN_PROMPT.replace("{subject}", subject),
            transcript(conversation)
        );
        let request = GenerationRequest::new(prompt)
            .with_system_instruction(ANALYST_SYSTEM_INSTRUCTION)
            .with_temperature(self.generation.extraction_temperature)
            .with_max_output_tokens(self.generation.extraction_max_output_tokens)
            .expect_json();

        let raw = self.generator.generate(&request).await?;
        let run_id = uuid::Uuid::new_v4().to_string();
        let facts = parse_facts(&raw, &run_id);
        if facts.is_empty() {
            tracing::warn!("No facts recovered from the learning response");
        } else {
            tracing::info!("Learned {} facts about {}", facts.len(), subject);
        }
        Ok(facts)
    }
}

fn parse_facts(raw: &str, run_id: &str) -> Vec<LearnedFact> {
    let Some(value) = extract_json_object(raw) else {
        return Vec::new();
    };
    let Some(items) = value.get("facts").and_then(Value::as_array) else {
        return Vec::new();
    };
    let learned_at = Utc::now();

    items
        .iter()
        .filter_map(|item| {
            let (fact, confidence) = match item {
                Value::String(text) => (text.trim().to_string(), 0.5),
                Value::Object(obj) => (
                    obj.get("fact")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .trim()
                        .to_string(),
                    obj.get("confidence")
                        .and_then(Value::as_f64)
                        .unwrap_or(0.5),
                ),
                _ => return None,
            };
            (!fact.is_empty()).then(|| LearnedFact {
                fact,
                confidence: if confidence.is_finite() {
                    confidence.clamp(0.0, 1.0)
                } else {
                    0.5
                },
                source_run_id: run_id.to_string(),
                learned_at,
            })
        })
        .take(MAX_FACTS_PER_RUN)
        .collect()
}
