//! Heuristic token estimation.
//!
//! Token counts are estimated from character counts with a fixed
//! characters-per-token constant rather than a tokenizer call, which keeps the
//! sampler deterministic and fast.

use crate::message::Message;
use serde::{Deserialize, Serialize};

/// Default characters per token for mixed Latin-script chat text.
pub const DEFAULT_CHARS_PER_TOKEN: f64 = 4.0;

/// Characters charged per message for the `[timestamp] sender: ` framing.
pub const MESSAGE_FRAMING_CHARS: usize = 20;

/// Estimates token counts with a fixed characters-per-token ratio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TokenEstimator {
    chars_per_token: f64,
}

impl TokenEstimator {
    /// Creates an estimator. Non-positive or non-finite ratios fall back to the default.
    pub fn new(chars_per_token: f64) -> Self {
        let chars_per_token = if chars_per_token.is_finite() && chars_per_token > 0.0 {
            chars_per_token
        } else {
            DEFAULT_CHARS_PER_TOKEN
        };
        Self { chars_per_token }
    }

    pub fn chars_per_token(&self) -> f64 {
        self.chars_per_token
    }

    /// Estimated tokens for a character count.
    pub fn for_chars(&self, chars: usize) -> usize {
        (chars as f64 / self.chars_per_token).ceil() as usize
    }

    /// Estimated tokens for a text.
    pub fn estimate(&self, text: &str) -> usize {
        self.for_chars(text.chars().count())
    }

    /// Estimated tokens for one message including its transcript framing.
    pub fn message(&self, message: &Message) -> usize {
        self.for_chars(
            message.sender.chars().count() + message.content.chars().count() + MESSAGE_FRAMING_CHARS,
        )
    }

    /// Sum of message estimates.
    pub fn messages(&self, messages: &[Message]) -> usize {
        messages.iter().map(|m| self.message(m)).sum()
    }
}

impl Default for TokenEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_CHARS_PER_TOKEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_estimate_rounds_up() {
        let estimator = TokenEstimator::new(4.0);
        assert_eq!(estimator.estimate(""), 0);
        assert_eq!(estimator.estimate("abc"), 1);
        assert_eq!(estimator.estimate("abcdefgh"), 2);
        assert_eq!(estimator.estimate("abcdefghi"), 3);
    }

    #[test]
    fn test_invalid_ratio_falls_back() {
        assert_eq!(TokenEstimator::new(0.0).chars_per_token(), DEFAULT_CHARS_PER_TOKEN);
        assert_eq!(
            TokenEstimator::new(f64::NAN).chars_per_token(),
            DEFAULT_CHARS_PER_TOKEN
        );
    }

    #[test]
    fn test_message_includes_framing() {
        let estimator = TokenEstimator::new(4.0);
        let message = Message::new(Utc::now(), "Al", "hi");
        // 2 + 2 + 20 = 24 chars
        assert_eq!(estimator.message(&message), 6);
    }

    #[test]
    fn test_counts_chars_not_bytes() {
        let estimator = TokenEstimator::new(1.0);
        assert_eq!(estimator.estimate("héllo"), 5);
    }
}
