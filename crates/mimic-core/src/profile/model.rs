//! Persona profile domain model.
//!
//! A [`PersonaProfile`] aggregates one facet per extraction stage. Every facet
//! has a documented default so a failed stage still leaves a complete profile.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lowest and highest value of every 1–10 score.
pub const SCORE_MIN: u8 = 1;
pub const SCORE_MAX: u8 = 10;
/// Value used when a score is missing or unreadable.
pub const SCORE_DEFAULT: u8 = 5;
/// Upper bound for every list field.
pub const MAX_LIST_ITEMS: usize = 10;

/// Extraction stages in the order the pipeline runs them.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StageKind {
    Identity,
    Personality,
    Attachment,
    Communication,
    EmotionalTriggers,
    Relationship,
    Family,
    ResponsePatterns,
}

impl StageKind {
    pub const ALL: [StageKind; 8] = [
        StageKind::Identity,
        StageKind::Personality,
        StageKind::Attachment,
        StageKind::Communication,
        StageKind::EmotionalTriggers,
        StageKind::Relationship,
        StageKind::Family,
        StageKind::ResponsePatterns,
    ];

    /// Human readable label used in progress messages and prompt headings.
    pub fn label(self) -> &'static str {
        match self {
            StageKind::Identity => "Identity",
            StageKind::Personality => "Personality",
            StageKind::Attachment => "Attachment style",
            StageKind::Communication => "Communication style",
            StageKind::EmotionalTriggers => "Emotional triggers",
            StageKind::Relationship => "Relationship dynamics",
            StageKind::Family => "Family context",
            StageKind::ResponsePatterns => "Response patterns",
        }
    }
}

/// Attachment classification.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum AttachmentStyle {
    #[default]
    Secure,
    Anxious,
    Avoidant,
    FearfulAvoidant,
}

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
pub enum Formality {
    Casual,
    #[default]
    Neutral,
    Formal,
}

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
pub enum EmojiUsage {
    None,
    Low,
    #[default]
    Moderate,
    Heavy,
}

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
pub enum MessageLength {
    Short,
    #[default]
    Medium,
    Long,
}

/// Who the subject is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityFacet {
    pub name: String,
    pub nickname: String,
    pub age_range: String,
    pub gender: String,
    pub occupation: String,
    pub location: String,
    pub languages: Vec<String>,
    pub interests: Vec<String>,
}

impl IdentityFacet {
    /// True when the stage found nothing to say.
    pub fn is_empty(&self) -> bool {
        [
            &self.name,
            &self.nickname,
            &self.age_range,
            &self.gender,
            &self.occupation,
            &self.location,
        ]
        .iter()
        .all(|v| v.is_empty())
            && self.languages.is_empty()
            && self.interests.is_empty()
    }
}

/// Big-five personality scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonalityFacet {
    pub openness: u8,
    pub conscientiousness: u8,
    pub extraversion: u8,
    pub agreeableness: u8,
    pub neuroticism: u8,
    pub summary: String,
}

impl Default for PersonalityFacet {
    fn default() -> Self {
        Self {
            openness: SCORE_DEFAULT,
            conscientiousness: SCORE_DEFAULT,
            extraversion: SCORE_DEFAULT,
            agreeableness: SCORE_DEFAULT,
            neuroticism: SCORE_DEFAULT,
            summary: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttachmentFacet {
    pub style: AttachmentStyle,
    pub anxiety_score: u8,
    pub avoidance_score: u8,
    pub evidence: Vec<String>,
}

impl Default for AttachmentFacet {
    fn default() -> Self {
        Self {
            style: AttachmentStyle::default(),
            anxiety_score: SCORE_DEFAULT,
            avoidance_score: SCORE_DEFAULT,
            evidence: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommunicationFacet {
    pub tone: String,
    pub formality: Formality,
    pub humor_style: String,
    pub emoji_usage: EmojiUsage,
    pub typical_phrases: Vec<String>,
    pub pet_names: Vec<String>,
    pub slang: Vec<String>,
    pub message_length: MessageLength,
    pub punctuation_habits: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmotionalTriggersFacet {
    pub positive_triggers: Vec<String>,
    pub negative_triggers: Vec<String>,
    pub comfort_strategies: Vec<String>,
    pub stress_signals: Vec<String>,
}

impl EmotionalTriggersFacet {
    pub fn is_empty(&self) -> bool {
        self.positive_triggers.is_empty()
            && self.negative_triggers.is_empty()
            && self.comfort_strategies.is_empty()
            && self.stress_signals.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationshipFacet {
    pub role: String,
    pub conflict_style: String,
    pub affection_style: String,
    pub shared_memories: Vec<String>,
    pub inside_jokes: Vec<String>,
    pub recurring_topics: Vec<String>,
}

impl RelationshipFacet {
    pub fn is_empty(&self) -> bool {
        self.role.is_empty()
            && self.conflict_style.is_empty()
            && self.affection_style.is_empty()
            && self.shared_memories.is_empty()
            && self.inside_jokes.is_empty()
            && self.recurring_topics.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FamilyFacet {
    pub family_members: Vec<String>,
    pub family_dynamics: String,
}

impl FamilyFacet {
    pub fn is_empty(&self) -> bool {
        self.family_members.is_empty() && self.family_dynamics.is_empty()
    }
}

/// How the subject reacts in recurring situations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponsePatternsFacet {
    pub happy: String,
    pub angry: String,
    pub sad: String,
    pub jealous: String,
    pub ignored: String,
    pub complimented: String,
}

impl ResponsePatternsFacet {
    pub const CONTEXTS: [&'static str; 6] =
        ["happy", "angry", "sad", "jealous", "ignored", "complimented"];

    /// Non-empty patterns as `(context, description)` pairs.
    pub fn entries(&self) -> Vec<(&'static str, &str)> {
        let values = [
            &self.happy,
            &self.angry,
            &self.sad,
            &self.jealous,
            &self.ignored,
            &self.complimented,
        ];
        Self::CONTEXTS
            .iter()
            .zip(values)
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| (*k, v.as_str()))
            .collect()
    }
}

/// One facet produced by a stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Facet {
    Identity(IdentityFacet),
    Personality(PersonalityFacet),
    Attachment(AttachmentFacet),
    Communication(CommunicationFacet),
    EmotionalTriggers(EmotionalTriggersFacet),
    Relationship(RelationshipFacet),
    Family(FamilyFacet),
    ResponsePatterns(ResponsePatternsFacet),
}

impl Facet {
    pub fn kind(&self) -> StageKind {
        match self {
            Facet::Identity(_) => StageKind::Identity,
            Facet::Personality(_) => StageKind::Personality,
            Facet::Attachment(_) => StageKind::Attachment,
            Facet::Communication(_) => StageKind::Communication,
            Facet::EmotionalTriggers(_) => StageKind::EmotionalTriggers,
            Facet::Relationship(_) => StageKind::Relationship,
            Facet::Family(_) => StageKind::Family,
            Facet::ResponsePatterns(_) => StageKind::ResponsePatterns,
        }
    }

    /// The documented default facet for a stage.
    pub fn default_for(kind: StageKind) -> Self {
        match kind {
            StageKind::Identity => Facet::Identity(IdentityFacet::default()),
            StageKind::Personality => Facet::Personality(PersonalityFacet::default()),
            StageKind::Attachment => Facet::Attachment(AttachmentFacet::default()),
            StageKind::Communication => Facet::Communication(CommunicationFacet::default()),
            StageKind::EmotionalTriggers => {
                Facet::EmotionalTriggers(EmotionalTriggersFacet::default())
            }
            StageKind::Relationship => Facet::Relationship(RelationshipFacet::default()),
            StageKind::Family => Facet::Family(FamilyFacet::default()),
            StageKind::ResponsePatterns => {
                Facet::ResponsePatterns(ResponsePatternsFacet::default())
            }
        }
    }
}

/// Why a stage fell back to its default facet.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DegradeReason {
    /// The service returned a non-retryable error or retries ran out
    CallFailed,
    /// The response held no usable JSON object
    InvalidResponse,
    /// Every attempt exceeded the call timeout
    TimedOut,
}

/// Output of one stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetResult {
    pub facet: Facet,
    pub succeeded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degraded: Option<DegradeReason>,
}

impl FacetResult {
    pub fn success(facet: Facet) -> Self {
        Self {
            facet,
            succeeded: true,
            degraded: None,
        }
    }

    /// A default facet recorded as not analyzed.
    pub fn degraded(kind: StageKind, reason: DegradeReason) -> Self {
        Self {
            facet: Facet::default_for(kind),
            succeeded: false,
            degraded: Some(reason),
        }
    }

    pub fn kind(&self) -> StageKind {
        self.facet.kind()
    }
}

/// Aggregate of all facets for one subject.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaProfile {
    pub subject: String,
    pub identity: IdentityFacet,
    pub personality: PersonalityFacet,
    pub attachment: AttachmentFacet,
    pub communication: CommunicationFacet,
    pub emotional_triggers: EmotionalTriggersFacet,
    pub relationship: RelationshipFacet,
    pub family: FamilyFacet,
    pub response_patterns: ResponsePatternsFacet,
    /// Stage name → whether the stage produced its facet. A key is present
    /// once the slot has been filled, successfully or not.
    pub categories_analyzed: BTreeMap<String, bool>,
}

impl PersonaProfile {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            ..Self::default()
        }
    }

    /// Whether a stage result has already been recorded for `kind`.
    pub fn is_filled(&self, kind: StageKind) -> bool {
        self.categories_analyzed.contains_key(kind.as_ref())
    }

    /// Whether the stage for `kind` succeeded.
    pub fn is_analyzed(&self, kind: StageKind) -> bool {
        self.categories_analyzed
            .get(kind.as_ref())
            .copied()
            .unwrap_or(false)
    }

    /// Records a stage result. Returns `false` and leaves the profile untouched
    /// when the slot is already filled.
    pub fn apply(&mut self, result: FacetResult) -> bool {
        let kind = result.kind();
        if self.is_filled(kind) {
            return false;
        }
        self.categories_analyzed
            .insert(kind.to_string(), result.succeeded);
        match result.facet {
            Facet::Identity(f) => self.identity = f,
            Facet::Personality(f) => self.personality = f,
            Facet::Attachment(f) => self.attachment = f,
            Facet::Communication(f) => self.communication = f,
            Facet::EmotionalTriggers(f) => self.emotional_triggers = f,
            Facet::Relationship(f) => self.relationship = f,
            Facet::Family(f) => self.family = f,
            Facet::ResponsePatterns(f) => self.response_patterns = f,
        }
        true
    }

    /// Number of stages that succeeded.
    pub fn analyzed_count(&self) -> usize {
        self.categories_analyzed.values().filter(|v| **v).count()
    }

    /// Marks every stage that never reported as not analyzed.
    pub fn fill_missing(&mut self) {
        for kind in StageKind::ALL {
            self.categories_analyzed
                .entry(kind.to_string())
                .or_insert(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_stage_order_matches_iteration() {
        let iterated: Vec<StageKind> = StageKind::iter().collect();
        assert_eq!(iterated, StageKind::ALL.to_vec());
        assert_eq!(StageKind::EmotionalTriggers.to_string(), "emotional_triggers");
        assert_eq!(
            StageKind::from_str("response_patterns").unwrap(),
            StageKind::ResponsePatterns
        );
    }

    #[test]
    fn test_defaults() {
        let profile = PersonaProfile::new("Sam");
        assert_eq!(profile.personality.openness, 5);
        assert_eq!(profile.attachment.style, AttachmentStyle::Secure);
        assert_eq!(profile.attachment.avoidance_score, 5);
        assert_eq!(profile.communication.formality, Formality::Neutral);
        assert!(profile.categories_analyzed.is_empty());
    }

    #[test]
    fn test_apply_never_overwrites() {
        let mut profile = PersonaProfile::new("Sam");
        let first = FacetResult::success(Facet::Identity(IdentityFacet {
            name: "Sam".into(),
            ..Default::default()
        }));
        let second = FacetResult::success(Facet::Identity(IdentityFacet {
            name: "Other".into(),
            ..Default::default()
        }));

        assert!(profile.apply(first));
        assert!(!profile.apply(second));
        assert_eq!(profile.identity.name, "Sam");
        assert!(profile.is_analyzed(StageKind::Identity));
    }

    #[test]
    fn test_degraded_facet_recorded_false() {
        let mut profile = PersonaProfile::new("Sam");
        profile.apply(FacetResult::degraded(
            StageKind::Family,
            DegradeReason::TimedOut,
        ));
        assert!(profile.is_filled(StageKind::Family));
        assert!(!profile.is_analyzed(StageKind::Family));
        assert_eq!(profile.family, FamilyFacet::default());

        profile.fill_missing();
        assert_eq!(profile.categories_analyzed.len(), 8);
        assert_eq!(profile.analyzed_count(), 0);
    }

    #[test]
    fn test_response_pattern_entries_skip_empty() {
        let patterns = ResponsePatternsFacet {
            happy: "sends lots of emoji".into(),
            ignored: "double texts".into(),
            ..Default::default()
        };
        assert_eq!(
            patterns.entries(),
            vec![("happy", "sends lots of emoji"), ("ignored", "double texts")]
        );
    }
}
