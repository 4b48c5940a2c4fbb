//! Structured JSON export parsing.
//!
//! Accepts a single chat (`{"messages": [...]}`) or a full account export
//! (`{"chats": {"list": [{"messages": [...]}]}}`). Entries are
//! `{"type", "date", "from", "text"}` where `text` is a string or a list of
//! strings and `{"type", "text"}` fragments.

use super::media;
use crate::error::{MimicError, Result};
use crate::message::{MEDIA_MARKER, Message};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

const MEDIA_KEYS: &[&str] = &["photo", "file", "media_type", "sticker_emoji"];

/// Parses a JSON export document, keeping input order.
pub fn parse_json(raw: &str) -> Result<Vec<Message>> {
    let root: Value = serde_json::from_str(raw.trim_start_matches('\u{feff}'))?;
    let object = root
        .as_object()
        .ok_or_else(|| MimicError::parse("JSON export must be a top-level object"))?;

    let mut entries: Vec<&Value> = Vec::new();
    if let Some(list) = object.get("messages").and_then(Value::as_array) {
        entries.extend(list);
    }
    if let Some(chats) = object
        .get("chats")
        .and_then(|c| c.get("list"))
        .and_then(Value::as_array)
    {
        for chat in chats {
            if let Some(list) = chat.get("messages").and_then(Value::as_array) {
                entries.extend(list);
            }
        }
    }

    if entries.is_empty() && !object.contains_key("messages") && !object.contains_key("chats") {
        return Err(MimicError::parse(
            "JSON export has neither a 'messages' list nor a 'chats' list",
        ));
    }

    let total = entries.len();
    let messages: Vec<Message> = entries.into_iter().filter_map(parse_entry).collect();
    if messages.len() < total {
        tracing::debug!(
            target: "parser",
            "Skipped {} of {} JSON entries (service messages or unreadable records)",
            total - messages.len(),
            total
        );
    }
    Ok(messages)
}

fn parse_entry(entry: &Value) -> Option<Message> {
    if entry.get("type").and_then(Value::as_str) != Some("message") {
        return None;
    }
    let sender = entry.get("from").and_then(Value::as_str)?.trim();
    if sender.is_empty() {
        return None;
    }
    let timestamp = parse_date(entry)?;

    let text = entry.get("text").map(flatten_text).unwrap_or_default();
    let has_media = MEDIA_KEYS.iter().any(|key| entry.get(*key).is_some_and(|v| !v.is_null()))
        || media::is_placeholder(&text);

    let content = if text.trim().is_empty() || media::is_placeholder(&text) {
        if !has_media {
            return None;
        }
        MEDIA_MARKER.to_string()
    } else {
        text
    };

    Some(Message {
        timestamp,
        sender: sender.to_string(),
        content,
        has_media,
    })
}

fn parse_date(entry: &Value) -> Option<DateTime<Utc>> {
    if let Some(date) = entry.get("date").and_then(Value::as_str) {
        if let Ok(naive) = NaiveDateTime::parse_from_str(date, "%Y-%m-%dT%H:%M:%S") {
            return Some(naive.and_utc());
        }
        if let Ok(parsed) = DateTime::parse_from_rfc3339(date) {
            return Some(parsed.with_timezone(&Utc));
        }
    }
    let unix = entry.get("date_unixtime")?;
    let seconds = match unix {
        Value::String(s) => s.parse::<i64>().ok()?,
        other => other.as_i64()?,
    };
    DateTime::from_timestamp(seconds, 0)
}

/// Concatenates a plain or fragmented `text` field.
fn flatten_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(parts) => parts
            .iter()
            .map(|part| match part {
                Value::String(s) => s.as_str(),
                Value::Object(obj) => obj.get("text").and_then(Value::as_str).unwrap_or(""),
                _ => "",
            })
            .collect(),
        _ => String::new(),
    }
}
