//! Text-generation service contract.
//!
//! The pipeline, reply service and fact learner depend only on
//! [`TextGenerator`]; concrete HTTP clients live in `mimic-interaction`.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Binary payload sent inline with a request (e.g. a profile photo).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineAttachment {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// One request to the generation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub system_instruction: Option<String>,
    pub attachment: Option<InlineAttachment>,
    pub temperature: f32,
    pub max_output_tokens: u32,
    /// Ask the service to answer with a JSON document
    pub json_response: bool,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_instruction: None,
            attachment: None,
            temperature: 0.7,
            max_output_tokens: 2_048,
            json_response: false,
        }
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn with_attachment(mut self, attachment: InlineAttachment) -> Self {
        self.attachment = Some(attachment);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }

    pub fn expect_json(mut self) -> Self {
        self.json_response = true;
        self
    }
}

/// Failure reported by a generation service.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct GenerationError {
    /// HTTP status, when the failure came from a response
    pub status_code: Option<u16>,
    pub message: String,
    pub is_retryable: bool,
    /// Server-suggested wait before retrying
    pub retry_after: Option<Duration>,
}

impl GenerationError {
    pub fn new(message: impl Into<String>, is_retryable: bool) -> Self {
        Self {
            status_code: None,
            message: message.into(),
            is_retryable,
            retry_after: None,
        }
    }

    /// Error derived from an HTTP status. 429 and 5xx are retryable.
    pub fn http(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            status_code: Some(status_code),
            message: message.into(),
            is_retryable: status_code == 429 || (500..600).contains(&status_code),
            retry_after: None,
        }
    }

    /// Network-level failure (connection refused, reset, DNS).
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(message, true)
    }

    pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
        self.retry_after = retry_after;
        self
    }

    /// Credentials were rejected; retrying cannot help.
    pub fn is_auth(&self) -> bool {
        matches!(self.status_code, Some(401) | Some(403))
    }
}

/// Black-box text generation.
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generates a completion for `request`.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;

    /// Reports missing credentials or configuration before any call is made.
    ///
    /// The default implementation accepts.
    async fn preflight(&self) -> Result<(), GenerationError> {
        Ok(())
    }

    /// Name used in logs.
    fn name(&self) -> &str {
        "generator"
    }
}
