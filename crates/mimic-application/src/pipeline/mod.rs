//! Staged analysis pipeline.
//!
//! Runs as an explicit state machine:
//!
//! ```text
//! Idle -> Sampling -> Stage(identity) -> ... -> Stage(response_patterns) -> Assembling -> Complete
//! ```
//!
//! `Failed` is terminal and reached only on fatal errors: the service
//! preflight (in `Idle`), too few subject messages (in `Sampling`), an
//! authentication rejection, cancellation or the overall deadline. A stage
//! that fails in any other way degrades to its default facet and the run
//! moves on.

mod pacer;

use crate::extractor::{StageDefinition, StageExtractor, stage_definitions};
use mimic_core::config::MimicConfig;
use mimic_core::error::{MimicError, Result};
use mimic_core::fragment::StyleParams;
use mimic_core::generation::{GenerationRequest, InlineAttachment, TextGenerator};
use mimic_core::message::{Message, count_from};
use mimic_core::profile::{DegradeReason, FacetResult, PersonaProfile, StageKind};
use mimic_core::progress::{ProgressCallback, ProgressTracker};
use mimic_core::prompt::{PersonaPrompt, PromptAssembler, select_exemplars};
use mimic_core::sampler::{Sampler, SamplingStats};
use mimic_core::stats::CorpusStats;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

pub use pacer::Pacer;

const SAMPLING_DONE_PERCENT: u8 = 10;
const STAGES_DONE_PERCENT: u8 = 90;
const ASSEMBLED_PERCENT: u8 = 95;

/// Where a pipeline run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "stage", rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Sampling,
    Stage(StageKind),
    Assembling,
    Complete,
    Failed,
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineState::Stage(kind) => write!(f, "stage:{kind}"),
            other => write!(f, "{}", format!("{other:?}").to_lowercase()),
        }
    }
}

/// Input of one analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub subject: String,
    /// Full parsed corpus, in chronological order
    pub messages: Vec<Message>,
    /// Optional photo for the identity stage
    pub identity_attachment: Option<InlineAttachment>,
}

/// What happened in one stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageReport {
    pub kind: StageKind,
    pub succeeded: bool,
    pub degraded: Option<DegradeReason>,
    pub attempts: u32,
    pub messages_sent: usize,
    pub duration: Duration,
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub profile: PersonaProfile,
    pub prompt: PersonaPrompt,
    pub style: StyleParams,
    pub sampling: SamplingStats,
    pub stages: Vec<StageReport>,
    pub duration: Duration,
}

/// Outcome of calling the service for one stage.
enum CallOutcome {
    Text(String),
    Degraded(DegradeReason),
}

/// Orchestrates sampling, the extraction stages and prompt assembly.
pub struct AnalysisPipeline {
    generator: Arc<dyn TextGenerator>,
    config: MimicConfig,
    progress: ProgressTracker,
    cancel: CancellationToken,
    state: PipelineState,
    pacer: Pacer,
    started: Option<Instant>,
}

impl AnalysisPipeline {
    pub fn new(generator: Arc<dyn TextGenerator>, config: MimicConfig) -> Self {
        let pacer = Pacer::new(config.pipeline.call_spacing());
        Self {
            generator,
            config,
            progress: ProgressTracker::default(),
            cancel: CancellationToken::new(),
            state: PipelineState::Idle,
            pacer,
            started: None,
        }
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = ProgressTracker::new(Some(callback));
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Runs the whole pipeline once. A pipeline that has left `Idle` cannot be
    /// run again.
    pub async fn run(&mut self, request: AnalysisRequest) -> Result<PipelineOutcome> {
        if self.state != PipelineState::Idle {
            return Err(MimicError::internal(format!(
                "pipeline already ran (state {})",
                self.state
            )));
        }
        let started = Instant::now();
        self.started = Some(started);

        match self.execute(request, started).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                tracing::error!(target: "pipeline", "Analysis failed in state {}: {}", self.state, err);
                self.state = PipelineState::Failed;
                Err(err)
            }
        }
    }

    async fn execute(&mut self, request: AnalysisRequest, started: Instant) -> Result<PipelineOutcome> {
        let AnalysisRequest {
            subject,
            messages,
            identity_attachment,
        } = request;

        self.progress.report(0, "Checking text-generation service", None);
        if let Err(err) = self.generator.preflight().await {
            return Err(MimicError::service_unavailable(err.message));
        }

        self.transition(PipelineState::Sampling);
        let found = count_from(&messages, &subject);
        let required = self.config.pipeline.min_subject_messages;
        if found < required {
            return Err(MimicError::InsufficientData {
                subject,
                found,
                required,
            });
        }
        self.progress.report(2, format!("Sampling {} messages", messages.len()), None);
        let sampler = Sampler::new(self.config.sampler.clone());
        let sample = sampler.sample(&messages);
        self.progress.report(
            SAMPLING_DONE_PERCENT,
            format!(
                "Sampled {} of {} messages",
                sample.stats.messages_included, sample.stats.total_messages
            ),
            None,
        );

        let extractor = StageExtractor::new(sampler.estimator(), self.config.generation.clone());
        let definitions = stage_definitions(&self.config.pipeline);
        let mut profile = PersonaProfile::new(subject.clone());
        let mut reports = Vec::with_capacity(definitions.len());

        for (index, definition) in definitions.iter().enumerate() {
            self.transition(PipelineState::Stage(definition.kind));
            let stage_started = Instant::now();
            let slice = extractor.select_slice(definition, &sample.messages);
            let request = extractor.build_request(
                definition,
                &subject,
                &slice,
                identity_attachment.as_ref(),
            );

            let (outcome, attempts) = self.call_with_retry(definition, &request).await?;
            let result = match outcome {
                CallOutcome::Text(text) => match extractor.parse_response(definition.kind, &text) {
                    Some(facet) => FacetResult::success(facet),
                    None => FacetResult::degraded(definition.kind, DegradeReason::InvalidResponse),
                },
                CallOutcome::Degraded(reason) => FacetResult::degraded(definition.kind, reason),
            };

            if let Some(reason) = result.degraded {
                tracing::warn!(target: "pipeline", "Stage {} degraded: {}", definition.kind, reason);
            } else {
                tracing::info!(target: "pipeline", "Stage {} complete", definition.kind);
            }
            reports.push(StageReport {
                kind: definition.kind,
                succeeded: result.succeeded,
                degraded: result.degraded,
                attempts,
                messages_sent: slice.len(),
                duration: stage_started.elapsed(),
            });
            profile.apply(result);

            let done = index + 1;
            let span = (STAGES_DONE_PERCENT - SAMPLING_DONE_PERCENT) as usize;
            let percent = SAMPLING_DONE_PERCENT as usize + span * done / definitions.len();
            let remaining = estimate_remaining(started, done, definitions.len());
            self.progress.report(
                percent as u8,
                format!("{} analysed ({done}/{})", definition.kind.label(), definitions.len()),
                Some(remaining),
            );
        }
        profile.fill_missing();

        self.transition(PipelineState::Assembling);
        let assembler = PromptAssembler::new(sampler.estimator())?;
        let exemplars = select_exemplars(
            &sample.messages,
            &subject,
            self.config.pipeline.exemplar_count,
        );
        let stats = CorpusStats::compute(&messages);
        let prompt = assembler.assemble(&profile, &exemplars, stats.sender(&subject))?;
        self.progress.report(ASSEMBLED_PERCENT, "Persona prompt assembled", None);

        self.transition(PipelineState::Complete);
        let duration = started.elapsed();
        self.progress.report(
            100,
            format!(
                "Analysis complete: {}/{} categories",
                profile.analyzed_count(),
                StageKind::ALL.len()
            ),
            Some(Duration::ZERO),
        );

        Ok(PipelineOutcome {
            style: StyleParams::from_profile(&profile),
            profile,
            prompt,
            sampling: sample.stats,
            stages: reports,
            duration,
        })
    }

    /// Calls the service for one stage with pacing, timeout and linear backoff.
    ///
    /// Returns the outcome and the number of attempts made. Only fatal
    /// conditions are errors.
    async fn call_with_retry(
        &mut self,
        definition: &StageDefinition,
        request: &GenerationRequest,
    ) -> Result<(CallOutcome, u32)> {
        let pipeline = &self.config.pipeline;
        let max_attempts = pipeline.max_attempts.max(1);
        let call_timeout = pipeline.call_timeout();
        let backoff_step = pipeline.backoff_step();
        let mut last_failure = DegradeReason::CallFailed;

        for attempt in 1..=max_attempts {
            self.checkpoint()?;
            self.pacer.wait_turn().await;
            self.checkpoint()?;

            tracing::debug!(
                target: "pipeline",
                "Stage {} attempt {}/{} via {}",
                definition.kind,
                attempt,
                max_attempts,
                self.generator.name()
            );
            match tokio::time::timeout(call_timeout, self.generator.generate(request)).await {
                Ok(Ok(text)) => return Ok((CallOutcome::Text(text), attempt)),
                Ok(Err(err)) if err.is_auth() => {
                    return Err(MimicError::service_unavailable(err.message));
                }
                Ok(Err(err)) if !err.is_retryable => {
                    tracing::warn!(
                        target: "pipeline",
                        "Stage {} failed with a non-retryable error: {}",
                        definition.kind,
                        err
                    );
                    return Ok((CallOutcome::Degraded(DegradeReason::CallFailed), attempt));
                }
                Ok(Err(err)) => {
                    tracing::warn!(
                        target: "pipeline",
                        "Stage {} attempt {} failed: {} (retry after {:?})",
                        definition.kind,
                        attempt,
                        err,
                        err.retry_after
                    );
                    last_failure = DegradeReason::CallFailed;
                }
                Err(_) => {
                    tracing::warn!(
                        target: "pipeline",
                        "Stage {} attempt {} timed out after {:?}",
                        definition.kind,
                        attempt,
                        call_timeout
                    );
                    last_failure = DegradeReason::TimedOut;
                }
            }

            if attempt < max_attempts {
                tokio::time::sleep(backoff_step * attempt).await;
            }
        }

        Ok((CallOutcome::Degraded(last_failure), max_attempts))
    }

    /// Fails the run when it was cancelled or ran past its overall deadline.
    fn checkpoint(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(MimicError::Cancelled);
        }
        if let (Some(limit), Some(started)) = (self.config.pipeline.overall_timeout(), self.started) {
            if started.elapsed() >= limit {
                return Err(MimicError::TimedOut {
                    seconds: limit.as_secs(),
                });
            }
        }
        Ok(())
    }

    fn transition(&mut self, next: PipelineState) {
        tracing::debug!(target: "pipeline", "{} -> {}", self.state, next);
        self.state = next;
    }
}

fn estimate_remaining(started: Instant, done: usize, total: usize) -> Duration {
    if done == 0 || done >= total {
        return Duration::ZERO;
    }
    let per_stage = started.elapsed() / done as u32;
    per_stage * (total - done) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(PipelineState::Idle.to_string(), "idle");
        assert_eq!(
            PipelineState::Stage(StageKind::EmotionalTriggers).to_string(),
            "stage:emotional_triggers"
        );
    }

    #[test]
    fn test_remaining_estimate_edges() {
        let now = Instant::now();
        assert_eq!(estimate_remaining(now, 0, 8), Duration::ZERO);
        assert_eq!(estimate_remaining(now, 8, 8), Duration::ZERO);
    }
}
