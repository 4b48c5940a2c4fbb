//! Chat export parsing.
//!
//! Converts raw exports into a normalized, order-preserving sequence of
//! [`Message`]s. Records that do not match a known pattern are skipped.

mod json;
mod line;
mod media;
pub mod timestamp;

use crate::error::Result;
use crate::message::Message;
use serde::{Deserialize, Serialize};

pub use json::parse_json;
pub use line::parse_lines;
pub use media::is_placeholder as is_media_placeholder;

/// Export encodings understood by [`parse`].
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ExportFormat {
    /// JSON when the document starts with `{`, line-oriented otherwise
    #[default]
    Auto,
    /// `date, time - sender: content` lines
    Line,
    /// Structured JSON with a message list
    Json,
}

impl ExportFormat {
    /// Resolves [`ExportFormat::Auto`] by looking at the first significant character.
    pub fn resolve(self, raw: &str) -> Self {
        match self {
            Self::Auto => {
                let first = raw
                    .trim_start_matches(|c: char| c.is_whitespace() || c == '\u{feff}')
                    .chars()
                    .next();
                if first == Some('{') {
                    Self::Json
                } else {
                    Self::Line
                }
            }
            other => other,
        }
    }
}

/// Parses a raw export.
///
/// Only a structurally invalid JSON document is an error; unknown lines and
/// records are dropped.
pub fn parse(raw: &str, format: ExportFormat) -> Result<Vec<Message>> {
    let messages = match format.resolve(raw) {
        ExportFormat::Json => parse_json(raw)?,
        _ => parse_lines(raw),
    };
    tracing::info!(target: "parser", "Parsed {} messages", messages.len());
    Ok(messages)
}
