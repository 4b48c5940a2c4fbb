pub mod config;
pub mod error;
pub mod fragment;
pub mod generation;
pub mod lexicon;
pub mod message;
pub mod parser;
pub mod profile;
pub mod progress;
pub mod prompt;
pub mod record;
pub mod sampler;
pub mod secret;
pub mod stats;
pub mod token;

// Re-export common types
pub use config::MimicConfig;
pub use error::{MimicError, Result};
pub use generation::{GenerationError, GenerationRequest, TextGenerator};
pub use message::Message;
pub use profile::PersonaProfile;
pub use prompt::PersonaPrompt;
pub use sampler::{SampledCorpus, Sampler};
pub use token::TokenEstimator;
