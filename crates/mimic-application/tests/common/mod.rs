#![allow(dead_code)]

use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use mimic_core::config::MimicConfig;
use mimic_core::generation::{GenerationError, GenerationRequest, TextGenerator};
use mimic_core::message::Message;
use mimic_core::record::{LearnedFact, PersonaRecord, PersonaRecordRepository};
use mimic_core::{MimicError, Result};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Answer that fills at least one key of every facet.
pub const FULL_PROFILE_JSON: &str = r#"```json
{
  "name": "Sam", "nickname": "Sammy", "occupation": "nurse",
  "languages": ["English"], "interests": ["climbing", "baking"],
  "openness": 8, "conscientiousness": 4, "extraversion": 7, "agreeableness": 9, "neuroticism": 3,
  "summary": "Warm and a little chaotic.",
  "style": "anxious", "anxiety_score": 8, "avoidance_score": 2, "evidence": ["double texts when ignored"],
  "tone": "playful", "formality": "casual", "emoji_usage": "heavy", "typical_phrases": ["no way"],
  "message_length": "short",
  "positive_triggers": ["surprises"], "negative_triggers": ["being ignored"],
  "role": "the planner", "conflict_style": "confronts quickly",
  "family_members": ["Ana (sister)"], "family_dynamics": "close and loud",
  "happy": "sends voice notes", "sad": "goes quiet"
}
```"#;

#[derive(Clone)]
pub enum Step {
    Reply(String),
    Fail(GenerationError),
    /// Replies after the given (virtual) delay
    Slow(Duration, String),
}

pub fn reply(text: &str) -> Step {
    Step::Reply(text.to_string())
}

/// In-memory generator that plays back a script, then repeats a fallback.
pub struct ScriptedGenerator {
    script: Mutex<VecDeque<Step>>,
    fallback: Step,
    calls: Mutex<Vec<(Instant, GenerationRequest)>>,
    preflight_error: Option<GenerationError>,
}

impl ScriptedGenerator {
    pub fn always(step: Step) -> Self {
        Self::scripted(Vec::new(), step)
    }

    pub fn scripted(steps: Vec<Step>, fallback: Step) -> Self {
        Self {
            script: Mutex::new(steps.into()),
            fallback,
            calls: Mutex::new(Vec::new()),
            preflight_error: None,
        }
    }

    pub fn with_preflight_error(mut self, error: GenerationError) -> Self {
        self.preflight_error = Some(error);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(t, _)| *t).collect()
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.calls.lock().unwrap().iter().map(|(_, r)| r.clone()).collect()
    }
}

#[async_trait::async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> std::result::Result<String, GenerationError> {
        self.calls
            .lock()
            .unwrap()
            .push((Instant::now(), request.clone()));
        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        match step {
            Step::Reply(text) => Ok(text),
            Step::Fail(error) => Err(error),
            Step::Slow(delay, text) => {
                tokio::time::sleep(delay).await;
                Ok(text)
            }
        }
    }

    async fn preflight(&self) -> std::result::Result<(), GenerationError> {
        match &self.preflight_error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Two-person chat with `per_sender` messages from each side.
pub fn chat(per_sender: usize) -> Vec<Message> {
    let start = Utc.with_ymd_and_hms(2022, 2, 1, 18, 0, 0).unwrap();
    let sam_lines = [
        "omg my mom just called again",
        "ok",
        "can't wait for saturday, the climbing gym opens at 9",
        "I miss you, when are you back?",
        "sorry I fell asleep lol",
        "my sister Ana says hi",
    ];
    let alex_lines = ["how was work?", "haha", "dinner tonight?", "did you see the game"];

    (0..per_sender * 2)
        .map(|i| {
            let when = start + ChronoDuration::minutes(i as i64 * 37);
            if i % 2 == 0 {
                Message::new(when, "Alex", format!("{} {i}", alex_lines[i / 2 % alex_lines.len()]))
            } else {
                Message::new(when, "Sam", format!("{} {i}", sam_lines[i / 2 % sam_lines.len()]))
            }
        })
        .collect()
}

/// Configuration with short, test-friendly timings.
pub fn fast_config() -> MimicConfig {
    let mut config = MimicConfig::default();
    config.pipeline.call_spacing_ms = 100;
    config.pipeline.call_timeout_ms = 1_000;
    config.pipeline.backoff_step_ms = 500;
    config.pipeline.max_attempts = 3;
    config.pipeline.min_subject_messages = 20;
    config
}

/// Repository kept in memory for use-case tests.
#[derive(Default)]
pub struct MemoryRepository {
    records: Mutex<BTreeMap<(String, u32), PersonaRecord>>,
}

#[async_trait::async_trait]
impl PersonaRecordRepository for MemoryRepository {
    async fn save(&self, record: &PersonaRecord) -> Result<()> {
        let mut records = self.records.lock().unwrap();
        let key = (record.subject_id.clone(), record.version);
        if records.contains_key(&key) {
            return Err(MimicError::internal("version exists"));
        }
        records.insert(key, record.clone());
        Ok(())
    }

    async fn latest(&self, subject_id: &str) -> Result<Option<PersonaRecord>> {
        Ok(self.list_versions(subject_id).await?.pop())
    }

    async fn get(&self, subject_id: &str, version: u32) -> Result<Option<PersonaRecord>> {
        let records = self.records.lock().unwrap();
        Ok(records.get(&(subject_id.to_string(), version)).cloned())
    }

    async fn list_versions(&self, subject_id: &str) -> Result<Vec<PersonaRecord>> {
        let records = self.records.lock().unwrap();
        Ok(records
            .values()
            .filter(|r| r.subject_id == subject_id)
            .cloned()
            .collect())
    }

    async fn append_facts(&self, subject_id: &str, facts: Vec<LearnedFact>) -> Result<PersonaRecord> {
        let latest = self
            .latest(subject_id)
            .await?
            .ok_or_else(|| MimicError::not_found("persona", subject_id))?;
        let next = latest.with_facts(facts);
        self.save(&next).await?;
        Ok(next)
    }
}
