//! Per-sender corpus statistics.
//!
//! Computed locally from parsed messages, so the texting-habits section of a
//! persona prompt is available even when every extraction stage fails.

use crate::message::Message;
use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Texting habits of one sender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SenderStats {
    pub sender: String,
    pub message_count: usize,
    pub media_count: usize,
    /// Average length in characters of text messages
    pub average_length: f64,
    /// Share of text messages containing at least one emoji
    pub emoji_ratio: f64,
    /// Share of text messages containing a question mark
    pub question_ratio: f64,
    /// Hour of day (0–23, UTC) with the most messages
    pub most_active_hour: Option<u32>,
    pub first_message: Option<DateTime<Utc>>,
    pub last_message: Option<DateTime<Utc>>,
}

/// Statistics over a whole corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusStats {
    pub total_messages: usize,
    pub first_message: Option<DateTime<Utc>>,
    pub last_message: Option<DateTime<Utc>>,
    /// Senders ordered by message count (descending), then by name
    pub senders: Vec<SenderStats>,
}

#[derive(Default)]
struct Accumulator {
    message_count: usize,
    media_count: usize,
    text_count: usize,
    text_chars: usize,
    emoji_messages: usize,
    question_messages: usize,
    hours: [usize; 24],
    first: Option<DateTime<Utc>>,
    last: Option<DateTime<Utc>>,
}

impl Accumulator {
    fn add(&mut self, message: &Message) {
        self.message_count += 1;
        self.hours[message.timestamp.hour() as usize] += 1;
        self.first = Some(self.first.map_or(message.timestamp, |t| t.min(message.timestamp)));
        self.last = Some(self.last.map_or(message.timestamp, |t| t.max(message.timestamp)));

        if message.has_media {
            self.media_count += 1;
        }
        if message.is_media_only() {
            return;
        }
        self.text_count += 1;
        self.text_chars += message.content.chars().count();
        if message.content.chars().any(is_emoji) {
            self.emoji_messages += 1;
        }
        if message.content.contains('?') {
            self.question_messages += 1;
        }
    }

    fn finish(self, sender: String) -> SenderStats {
        let ratio = |n: usize| {
            if self.text_count == 0 {
                0.0
            } else {
                n as f64 / self.text_count as f64
            }
        };
        let most_active_hour = self
            .hours
            .iter()
            .enumerate()
            .filter(|(_, count)| **count > 0)
            // max_by_key keeps the last maximum; reverse so the earliest hour wins ties
            .rev()
            .max_by_key(|(_, count)| **count)
            .map(|(hour, _)| hour as u32);

        SenderStats {
            sender,
            message_count: self.message_count,
            media_count: self.media_count,
            average_length: ratio(self.text_chars),
            emoji_ratio: ratio(self.emoji_messages),
            question_ratio: ratio(self.question_messages),
            most_active_hour,
            first_message: self.first,
            last_message: self.last,
        }
    }
}

impl CorpusStats {
    pub fn compute(messages: &[Message]) -> Self {
        let mut by_sender: BTreeMap<&str, Accumulator> = BTreeMap::new();
        for message in messages {
            by_sender
                .entry(message.sender.as_str())
                .or_default()
                .add(message);
        }

        let mut senders: Vec<SenderStats> = by_sender
            .into_iter()
            .map(|(sender, acc)| acc.finish(sender.to_string()))
            .collect();
        senders.sort_by(|a, b| {
            b.message_count
                .cmp(&a.message_count)
                .then_with(|| a.sender.cmp(&b.sender))
        });

        Self {
            total_messages: messages.len(),
            first_message: messages.iter().map(|m| m.timestamp).min(),
            last_message: messages.iter().map(|m| m.timestamp).max(),
            senders,
        }
    }

    pub fn sender(&self, name: &str) -> Option<&SenderStats> {
        self.senders.iter().find(|s| s.sender == name)
    }
}

/// Rough emoji detection over the common pictographic blocks.
pub fn is_emoji(c: char) -> bool {
    matches!(
        c as u32,
        0x1F300..=0x1FAFF | 0x2600..=0x27BF | 0x1F000..=0x1F2FF | 0x2764 | 0x2B50 | 0x2B55
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 3, 1, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_sender_habits() {
        let messages = vec![
            Message::new(at(9, 0), "Sam", "morning ☀️"),
            Message::new(at(9, 5), "Sam", "coffee?"),
            Message::media(at(21, 0), "Sam"),
            Message::new(at(21, 1), "Alex", "hi"),
        ];
        let stats = CorpusStats::compute(&messages);

        assert_eq!(stats.total_messages, 4);
        assert_eq!(stats.senders[0].sender, "Sam");
        let sam = stats.sender("Sam").unwrap();
        assert_eq!(sam.message_count, 3);
        assert_eq!(sam.media_count, 1);
        assert!((sam.emoji_ratio - 0.5).abs() < 1e-9);
        assert!((sam.question_ratio - 0.5).abs() < 1e-9);
        assert_eq!(sam.most_active_hour, Some(9));
        assert_eq!(sam.first_message, Some(at(9, 0)));
        assert_eq!(sam.last_message, Some(at(21, 0)));
        assert_eq!(stats.last_message, Some(at(21, 1)));
    }

    #[test]
    fn test_hour_ties_pick_earliest() {
        let messages = vec![
            Message::new(at(22, 0), "Sam", "late"),
            Message::new(at(7, 0), "Sam", "early"),
        ];
        let stats = CorpusStats::compute(&messages);
        assert_eq!(stats.senders[0].most_active_hour, Some(7));
    }

    #[test]
    fn test_empty_corpus() {
        let stats = CorpusStats::compute(&[]);
        assert_eq!(stats.total_messages, 0);
        assert!(stats.senders.is_empty());
        assert!(stats.first_message.is_none());
    }
}
