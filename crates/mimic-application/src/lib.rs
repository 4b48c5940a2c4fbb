//! Application layer for MIMIC.
//!
//! This crate provides the use cases that coordinate the domain types in
//! `mimic-core` with a text-generation service and a record repository.

pub mod extractor;
pub mod fact_learner;
pub mod persona_usecase;
pub mod pipeline;
pub mod reply_service;

pub use fact_learner::FactLearner;
pub use persona_usecase::PersonaUseCase;
pub use pipeline::{AnalysisPipeline, AnalysisRequest, PipelineOutcome, PipelineState};
pub use reply_service::{ConversationTurn, PlannedReply, ReplyService, Speaker};
