//! Error types for the Mimic workspace.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the entire Mimic workspace.
///
/// Fatal analysis failures are kept distinguishable so a caller can tell
/// "not enough data" from "service unreachable" from "analysis timed out".
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum MimicError {
    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", etc.
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Export could not be parsed at all
    #[error("Parse error: {0}")]
    Parse(String),

    /// Not enough messages from the subject to build a persona
    #[error(
        "Not enough data: found {found} messages from '{subject}', at least {required} are needed"
    )]
    InsufficientData {
        subject: String,
        found: usize,
        required: usize,
    },

    /// The text-generation service rejects every call
    #[error("Service unreachable: {0}")]
    ServiceUnavailable(String),

    /// The whole analysis exceeded its deadline
    #[error("Analysis timed out overall after {seconds}s")]
    TimedOut { seconds: u64 },

    /// The caller cancelled the run between two service calls
    #[error("Analysis cancelled")]
    Cancelled,

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl MimicError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates a Parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    /// Creates a ServiceUnavailable error
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a serialization error
    pub fn is_serialization(&self) -> bool {
        matches!(self, Self::Serialization { .. })
    }

    /// Check if the run failed because the corpus was too small
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, Self::InsufficientData { .. })
    }

    /// Check if the run failed because the service could not be used
    pub fn is_service_unavailable(&self) -> bool {
        matches!(self, Self::ServiceUnavailable(_))
    }

    /// Check if the run exceeded its overall deadline
    pub fn is_timed_out(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }

    /// One-line explanation suitable for end users.
    pub fn user_message(&self) -> String {
        match self {
            Self::InsufficientData {
                subject,
                found,
                required,
            } => format!(
                "Not enough data: the export contains {found} messages from {subject}, \
                 but at least {required} are needed to build a persona."
            ),
            Self::ServiceUnavailable(_) => {
                "The text-generation service is unreachable. Check your API key and network."
                    .to_string()
            }
            Self::TimedOut { seconds } => {
                format!("The analysis timed out overall after {seconds} seconds.")
            }
            Self::Cancelled => "The analysis was cancelled.".to_string(),
            other => other.to_string(),
        }
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for MimicError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for MimicError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for MimicError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for MimicError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<minijinja::Error> for MimicError {
    fn from(err: minijinja::Error) -> Self {
        Self::Internal(format!("template error: {err}"))
    }
}

impl From<crate::generation::GenerationError> for MimicError {
    fn from(err: crate::generation::GenerationError) -> Self {
        Self::ServiceUnavailable(err.message)
    }
}

impl From<anyhow::Error> for MimicError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<String> for MimicError {
    fn from(err: String) -> Self {
        Self::Internal(err)
    }
}

/// A type alias for `Result<T, MimicError>`.
pub type Result<T> = std::result::Result<T, MimicError>;
