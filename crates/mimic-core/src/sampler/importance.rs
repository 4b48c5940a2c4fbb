//! Composite importance score used to rank candidate messages.

use crate::config::ImportanceWeights;
use crate::lexicon::{FillerSet, KeywordMatcher};
use crate::message::Message;

/// Scores messages by length, emotional keyword hits and timeline position.
#[derive(Debug, Clone)]
pub struct ImportanceScorer {
    weights: ImportanceWeights,
    keywords: KeywordMatcher,
    filler: FillerSet,
}

impl ImportanceScorer {
    pub fn new(weights: ImportanceWeights, keywords: KeywordMatcher, filler: FillerSet) -> Self {
        Self {
            weights,
            keywords,
            filler,
        }
    }

    /// Keyword hits in the message content.
    pub fn keyword_hits(&self, message: &Message) -> usize {
        self.keywords.count_matches(&message.content)
    }

    /// Whether the message can be chosen by content-driven strategies.
    pub fn is_informative(&self, message: &Message) -> bool {
        !message.is_media_only() && !self.filler.is_filler(&message.content)
    }

    /// Whether `position` lies in the first or last edge fraction of `len` messages.
    pub fn is_edge(&self, position: usize, len: usize) -> bool {
        let edge = edge_len(len, self.weights.edge_fraction);
        position < edge || position >= len.saturating_sub(edge)
    }

    /// Composite score = length contribution + keyword contribution + positional boost.
    pub fn score(&self, message: &Message, position: usize, len: usize) -> f64 {
        let saturation = self.weights.length_saturation_chars.max(1) as f64;
        let chars = message.content.chars().count() as f64;
        let length = self.weights.length_weight * (chars / saturation).min(1.0);

        let hits = self.keyword_hits(message).min(self.weights.max_keyword_hits) as f64;
        let keyword = self.weights.keyword_weight * hits;

        let position = if self.is_edge(position, len) {
            self.weights.position_boost
        } else {
            0.0
        };

        length + keyword + position
    }
}

/// Number of messages in one edge slice; at least one for non-empty corpora.
pub fn edge_len(len: usize, fraction: f64) -> usize {
    if len == 0 {
        return 0;
    }
    let fraction = fraction.clamp(0.0, 0.5);
    ((len as f64 * fraction).floor() as usize).max(1)
}
