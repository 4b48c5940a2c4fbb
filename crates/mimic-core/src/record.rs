//! Persisted persona records.
//!
//! A record is one version of a subject's persona prompt. Records are never
//! edited in place: learning new facts writes the next version.

use crate::error::Result;
use crate::fragment::StyleParams;
use crate::prompt::PersonaPrompt;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A fact picked up from a later conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnedFact {
    pub fact: String,
    /// 0.0–1.0
    pub confidence: f64,
    /// Run that produced the fact
    pub source_run_id: String,
    pub learned_at: DateTime<Utc>,
}

/// One stored version of a persona.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaRecord {
    pub subject_id: String,
    pub prompt_text: String,
    pub token_count: usize,
    /// Starts at 1
    pub version: u32,
    pub analysis_duration_seconds: f64,
    pub categories_analyzed: BTreeMap<String, bool>,
    /// Timing traits derived from the analysed profile
    #[serde(default)]
    pub style: StyleParams,
    #[serde(default)]
    pub learned_facts: Vec<LearnedFact>,
    pub created_at: DateTime<Utc>,
}

impl PersonaRecord {
    /// First version of a record built from an assembled prompt.
    pub fn from_prompt(
        subject_id: impl Into<String>,
        prompt: PersonaPrompt,
        analysis_duration_seconds: f64,
        style: StyleParams,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            prompt_text: prompt.text,
            token_count: prompt.token_count,
            version: 1,
            analysis_duration_seconds,
            categories_analyzed: prompt.categories_analyzed,
            style,
            learned_facts: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Next version carrying `facts` in addition to the existing ones. The
    /// prompt text is copied unchanged.
    pub fn with_facts(&self, facts: Vec<LearnedFact>) -> Self {
        let mut learned_facts = self.learned_facts.clone();
        learned_facts.extend(facts);
        Self {
            version: self.version + 1,
            learned_facts,
            created_at: Utc::now(),
            ..self.clone()
        }
    }

    /// Prompt text followed by the learned facts, as sent to the service.
    pub fn system_instruction(&self) -> String {
        if self.learned_facts.is_empty() {
            return self.prompt_text.clone();
        }
        let facts = self
            .learned_facts
            .iter()
            .map(|f| format!("- {}", f.fact))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "{}\n\n## Things you learned recently\n{}",
            self.prompt_text, facts
        )
    }
}

/// Storage for persona records.
#[async_trait::async_trait]
pub trait PersonaRecordRepository: Send + Sync {
    /// Stores `record` as a new version. Fails if that version already exists.
    async fn save(&self, record: &PersonaRecord) -> Result<()>;

    /// Latest version for `subject_id`, if any.
    async fn latest(&self, subject_id: &str) -> Result<Option<PersonaRecord>>;

    /// A specific version.
    async fn get(&self, subject_id: &str, version: u32) -> Result<Option<PersonaRecord>>;

    /// All versions, oldest first.
    async fn list_versions(&self, subject_id: &str) -> Result<Vec<PersonaRecord>>;

    /// Writes the next version of the latest record with `facts` appended.
    async fn append_facts(&self, subject_id: &str, facts: Vec<LearnedFact>)
    -> Result<PersonaRecord>;
}
