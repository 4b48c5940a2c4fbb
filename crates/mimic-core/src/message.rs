//! Chat message domain model.
//!
//! A [`Message`] is one normalized record of a chat export. Messages are
//! immutable once parsed and are ordered by timestamp.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Fixed content used for every media placeholder, whatever the export wrote.
pub const MEDIA_MARKER: &str = "[media]";

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Message {
    /// When the message was sent
    pub timestamp: DateTime<Utc>,
    /// Display name of the sender as written in the export
    pub sender: String,
    /// Text content, or [`MEDIA_MARKER`] for media placeholders
    pub content: String,
    /// Whether the message carried an attachment
    #[serde(default)]
    pub has_media: bool,
}

impl Message {
    pub fn new(
        timestamp: DateTime<Utc>,
        sender: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            sender: sender.into(),
            content: content.into(),
            has_media: false,
        }
    }

    /// Builds a media message whose content is the fixed marker.
    pub fn media(timestamp: DateTime<Utc>, sender: impl Into<String>) -> Self {
        Self {
            timestamp,
            sender: sender.into(),
            content: MEDIA_MARKER.to_string(),
            has_media: true,
        }
    }

    /// Key used to deduplicate messages after merging sampling strategies.
    pub fn dedup_key(&self) -> (DateTime<Utc>, &str, &str) {
        (self.timestamp, self.sender.as_str(), self.content.as_str())
    }

    /// Whether the content is only the media marker.
    pub fn is_media_only(&self) -> bool {
        self.has_media && self.content == MEDIA_MARKER
    }

    /// Renders the message as a transcript line: `[2023-01-01 09:00] Alex: hi`.
    pub fn transcript_line(&self) -> String {
        format!(
            "[{}] {}: {}",
            self.timestamp.format("%Y-%m-%d %H:%M"),
            self.sender,
            self.content
        )
    }
}

/// Renders a slice of messages as a newline separated transcript.
pub fn transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .map(Message::transcript_line)
        .collect::<Vec<_>>()
        .join("\n")
}

/// A chat participant with the number of messages they sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Participant {
    pub name: String,
    pub message_count: usize,
}

/// Lists senders ordered by message count (descending), then by name.
pub fn participants(messages: &[Message]) -> Vec<Participant> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for message in messages {
        *counts.entry(message.sender.as_str()).or_default() += 1;
    }

    let mut participants: Vec<Participant> = counts
        .into_iter()
        .map(|(name, message_count)| Participant {
            name: name.to_string(),
            message_count,
        })
        .collect();
    participants.sort_by(|a, b| {
        b.message_count
            .cmp(&a.message_count)
            .then_with(|| a.name.cmp(&b.name))
    });
    participants
}

/// Counts the messages sent by `subject`.
pub fn count_from(messages: &[Message], subject: &str) -> usize {
    messages.iter().filter(|m| m.sender == subject).count()
}
