//! Keyword lexicons and matching.
//!
//! The lists below are empirically tuned defaults. They are surfaced through
//! configuration so deployments can replace them without code changes.

use std::collections::HashSet;

/// Affection, conflict, apology, family and milestone vocabulary.
pub const EMOTIONAL_KEYWORDS: &[&str] = &[
    // affection
    "love", "miss you", "i miss", "babe", "baby", "darling", "sweetheart", "honey", "kiss",
    "hug", "cuddle", "adore", "beautiful", "handsome", "forever", "soulmate", "❤", "😘",
    "🥰", "😍",
    // conflict
    "angry", "mad", "upset", "annoyed", "hate", "fight", "argue", "why didn't you",
    "you never", "you always", "whatever", "leave me alone", "jealous", "ignore",
    "ignoring", "disappointed", "hurt",
    // apology
    "sorry", "apologize", "apologise", "forgive", "my fault", "i was wrong",
    "didn't mean",
    // family
    "mom", "mum", "dad", "mother", "father", "sister", "brother", "grandma", "grandpa",
    "family", "parents", "aunt", "uncle", "cousin",
    // milestones
    "anniversary", "birthday", "wedding", "engaged", "pregnant", "graduation",
    "new job", "promotion", "moving", "first date", "vacation", "christmas",
];

/// Low-information messages that never qualify for content-driven selection.
pub const FILLER_MESSAGES: &[&str] = &[
    "ok", "okay", "k", "kk", "okk", "lol", "lmao", "haha", "hahaha", "hehe", "yes", "no",
    "yeah", "yep", "nope", "ya", "ye", "sure", "cool", "nice", "hmm", "hm", "mhm", "ah",
    "oh", "thx", "thanks", "ty", "np", "gn", "gm", "brb", "omg", "wow", "true", "same",
    "?", "!", "...",
];

/// Relation words used to pre-filter messages for the family stage.
pub const FAMILY_KEYWORDS: &[&str] = &[
    "mom", "mum", "mama", "mommy", "dad", "papa", "daddy", "mother", "father", "sister",
    "sis", "brother", "bro", "grandma", "grandpa", "granny", "grandmother", "grandfather",
    "family", "parents", "aunt", "uncle", "cousin", "niece", "nephew", "son", "daughter",
    "in-law", "stepmom", "stepdad",
];

/// Words that mark an incoming message as emotionally loaded.
pub const SALIENCE_KEYWORDS: &[&str] = &[
    "love", "miss you", "sorry", "hate", "angry", "mad", "sad", "cry", "crying", "hurt",
    "upset", "worried", "scared", "jealous", "break up", "breakup", "leave", "fight",
    "why", "ignore", "ignoring", "need you", "❤", "😢", "😭", "😡",
];

/// Converts a static lexicon into owned strings for configuration defaults.
pub fn to_owned_list(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

/// Case-insensitive keyword matcher.
///
/// Purely alphanumeric keywords match whole words; anything else (phrases,
/// emoji, hyphenated words) matches as a substring.
#[derive(Debug, Clone, Default)]
pub struct KeywordMatcher {
    words: HashSet<String>,
    phrases: Vec<String>,
}

impl KeywordMatcher {
    pub fn new<S: AsRef<str>>(keywords: &[S]) -> Self {
        let mut words = HashSet::new();
        let mut phrases = Vec::new();
        for keyword in keywords {
            let keyword = keyword.as_ref().trim().to_lowercase();
            if keyword.is_empty() {
                continue;
            }
            if keyword.chars().all(char::is_alphanumeric) {
                words.insert(keyword);
            } else if !phrases.contains(&keyword) {
                phrases.push(keyword);
            }
        }
        Self { words, phrases }
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty() && self.phrases.is_empty()
    }

    /// Number of keyword hits in `text` (a word repeated twice counts twice).
    pub fn count_matches(&self, text: &str) -> usize {
        let lower = text.to_lowercase();
        let word_hits = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty() && self.words.contains(*token))
            .count();
        let phrase_hits = self
            .phrases
            .iter()
            .map(|phrase| lower.matches(phrase.as_str()).count())
            .sum::<usize>();
        word_hits + phrase_hits
    }

    pub fn matches(&self, text: &str) -> bool {
        self.count_matches(text) > 0
    }
}

/// Set of filler messages compared after trimming and lowercasing.
#[derive(Debug, Clone, Default)]
pub struct FillerSet {
    entries: HashSet<String>,
}

impl FillerSet {
    pub fn new<S: AsRef<str>>(entries: &[S]) -> Self {
        Self {
            entries: entries
                .iter()
                .map(|e| e.as_ref().trim().to_lowercase())
                .collect(),
        }
    }

    /// Whether the whole message is filler. Trailing punctuation is ignored.
    pub fn is_filler(&self, text: &str) -> bool {
        let normalized = text.trim().to_lowercase();
        if normalized.is_empty() || self.entries.contains(&normalized) {
            return true;
        }
        let stripped = normalized.trim_end_matches(['.', '!', '?', ',']);
        stripped.is_empty() || self.entries.contains(stripped)
    }
}
