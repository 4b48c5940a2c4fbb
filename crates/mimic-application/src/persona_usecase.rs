//! Persona use cases.
//!
//! Coordinates the pipeline, fact learner and reply service with the record
//! repository, so every analysis or learning run ends up as a new stored
//! version.

use crate::fact_learner::FactLearner;
use crate::pipeline::{AnalysisPipeline, AnalysisRequest, PipelineOutcome};
use crate::reply_service::{ConversationTurn, PlannedReply, ReplyService};
use mimic_core::config::MimicConfig;
use mimic_core::error::{MimicError, Result};
use mimic_core::generation::TextGenerator;
use mimic_core::message::Message;
use mimic_core::progress::ProgressCallback;
use mimic_core::record::{PersonaRecord, PersonaRecordRepository};
use rand::rngs::StdRng;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Entry point for analysing, learning and replying.
pub struct PersonaUseCase {
    generator: Arc<dyn TextGenerator>,
    repository: Arc<dyn PersonaRecordRepository>,
    config: MimicConfig,
}

impl PersonaUseCase {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        repository: Arc<dyn PersonaRecordRepository>,
        config: MimicConfig,
    ) -> Self {
        Self {
            generator,
            repository,
            config,
        }
    }

    /// Runs a full analysis and stores the result as the subject's next version.
    ///
    /// Learned facts of the previous version are carried over.
    pub async fn analyze(
        &self,
        subject_id: &str,
        request: AnalysisRequest,
        progress: Option<ProgressCallback>,
        cancel: CancellationToken,
    ) -> Result<(PersonaRecord, PipelineOutcome)> {
        let mut pipeline = AnalysisPipeline::new(self.generator.clone(), self.config.clone())
            .with_cancellation(cancel);
        if let Some(callback) = progress {
            pipeline = pipeline.with_progress(callback);
        }
        let outcome = pipeline.run(request).await?;

        let previous = self.repository.latest(subject_id).await?;
        let mut record = PersonaRecord::from_prompt(
            subject_id,
            outcome.prompt.clone(),
            outcome.duration.as_secs_f64(),
            outcome.style,
        );
        if let Some(previous) = previous {
            record.version = previous.version + 1;
            record.learned_facts = previous.learned_facts;
        }
        self.repository.save(&record).await?;

        tracing::info!(
            "Stored persona {} v{} ({} tokens)",
            record.subject_id,
            record.version,
            record.token_count
        );
        Ok((record, outcome))
    }

    /// Learns facts from a conversation and stores them as a new version.
    ///
    /// Returns `None` when nothing new was learned; no version is written then.
    pub async fn learn(
        &self,
        subject_id: &str,
        subject_name: &str,
        conversation: &[Message],
    ) -> Result<Option<PersonaRecord>> {
        self.require_latest(subject_id).await?;
        let learner = FactLearner::new(self.generator.clone(), self.config.generation.clone());
        let facts = learner.learn(subject_name, conversation).await?;
        if facts.is_empty() {
            return Ok(None);
        }
        let record = self.repository.append_facts(subject_id, facts).await?;
        Ok(Some(record))
    }

    /// Plans a reply from the latest stored version.
    pub async fn reply(
        &self,
        subject_id: &str,
        history: &[ConversationTurn],
        incoming: &str,
        rng: &mut StdRng,
    ) -> Result<PlannedReply> {
        let record = self.require_latest(subject_id).await?;
        let service = ReplyService::new(
            self.generator.clone(),
            self.config.generation.clone(),
            self.config.timing.clone(),
        );
        service.plan_reply(&record, history, incoming, rng).await
    }

    pub async fn history(&self, subject_id: &str) -> Result<Vec<PersonaRecord>> {
        self.repository.list_versions(subject_id).await
    }

    async fn require_latest(&self, subject_id: &str) -> Result<PersonaRecord> {
        self.repository
            .latest(subject_id)
            .await?
            .ok_or_else(|| MimicError::not_found("persona", subject_id))
    }
}
