//! Lenient conversion of service JSON into facets.
//!
//! Generated objects are untrusted: keys go missing, scores arrive as strings
//! or out of range, lists grow long and enums are misspelled. Every facet is
//! built field by field so one bad value never discards the rest.

use super::model::*;
use serde_json::{Map, Value};
use std::str::FromStr;

/// Builds the facet for `kind` from a JSON object, filling defaults.
pub fn facet_from_value(kind: StageKind, value: &Value) -> Facet {
    let empty = Map::new();
    let obj = value.as_object().unwrap_or(&empty);
    let f = Fields(obj);

    match kind {
        StageKind::Identity => Facet::Identity(IdentityFacet {
            name: f.text("name"),
            nickname: f.text("nickname"),
            age_range: f.text("age_range"),
            gender: f.text("gender"),
            occupation: f.text("occupation"),
            location: f.text("location"),
            languages: f.list("languages"),
            interests: f.list("interests"),
        }),
        StageKind::Personality => Facet::Personality(PersonalityFacet {
            openness: f.score("openness"),
            conscientiousness: f.score("conscientiousness"),
            extraversion: f.score("extraversion"),
            agreeableness: f.score("agreeableness"),
            neuroticism: f.score("neuroticism"),
            summary: f.text("summary"),
        }),
        StageKind::Attachment => Facet::Attachment(AttachmentFacet {
            style: f.choice("style"),
            anxiety_score: f.score("anxiety_score"),
            avoidance_score: f.score("avoidance_score"),
            evidence: f.list("evidence"),
        }),
        StageKind::Communication => Facet::Communication(CommunicationFacet {
            tone: f.text("tone"),
            formality: f.choice("formality"),
            humor_style: f.text("humor_style"),
            emoji_usage: f.choice("emoji_usage"),
            typical_phrases: f.list("typical_phrases"),
            pet_names: f.list("pet_names"),
            slang: f.list("slang"),
            message_length: f.choice("message_length"),
            punctuation_habits: f.text("punctuation_habits"),
        }),
        StageKind::EmotionalTriggers => Facet::EmotionalTriggers(EmotionalTriggersFacet {
            positive_triggers: f.list("positive_triggers"),
            negative_triggers: f.list("negative_triggers"),
            comfort_strategies: f.list("comfort_strategies"),
            stress_signals: f.list("stress_signals"),
        }),
        StageKind::Relationship => Facet::Relationship(RelationshipFacet {
            role: f.text("role"),
            conflict_style: f.text("conflict_style"),
            affection_style: f.text("affection_style"),
            shared_memories: f.list("shared_memories"),
            inside_jokes: f.list("inside_jokes"),
            recurring_topics: f.list("recurring_topics"),
        }),
        StageKind::Family => Facet::Family(FamilyFacet {
            family_members: f.list("family_members"),
            family_dynamics: f.text("family_dynamics"),
        }),
        StageKind::ResponsePatterns => {
            // Accept both a flat object and one nested under "response_patterns".
            let nested = obj
                .get("response_patterns")
                .and_then(Value::as_object)
                .map(Fields)
                .unwrap_or(f);
            Facet::ResponsePatterns(ResponsePatternsFacet {
                happy: nested.text("happy"),
                angry: nested.text("angry"),
                sad: nested.text("sad"),
                jealous: nested.text("jealous"),
                ignored: nested.text("ignored"),
                complimented: nested.text("complimented"),
            })
        }
    }
}

/// Clamps a raw score into 1–10, rounding fractions.
pub fn clamp_score(raw: f64) -> u8 {
    if !raw.is_finite() {
        return SCORE_DEFAULT;
    }
    raw.round().clamp(SCORE_MIN as f64, SCORE_MAX as f64) as u8
}

#[derive(Clone, Copy)]
struct Fields<'a>(&'a Map<String, Value>);

impl Fields<'_> {
    fn text(&self, key: &str) -> String {
        self.0.get(key).map(scalar_text).unwrap_or_default()
    }

    fn score(&self, key: &str) -> u8 {
        let raw = match self.0.get(key) {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => leading_number(s),
            _ => None,
        };
        raw.map(clamp_score).unwrap_or(SCORE_DEFAULT)
    }

    /// Order-preserving list truncated to [`MAX_LIST_ITEMS`]. A lone string
    /// becomes a one-item list.
    fn list(&self, key: &str) -> Vec<String> {
        let items: Vec<String> = match self.0.get(key) {
            Some(Value::Array(values)) => values.iter().map(scalar_text).collect(),
            Some(value @ Value::String(_)) => vec![scalar_text(value)],
            _ => Vec::new(),
        };
        items
            .into_iter()
            .filter(|s| !s.is_empty())
            .take(MAX_LIST_ITEMS)
            .collect()
    }

    /// Parses an enumerated value; anything outside the domain is the default.
    fn choice<T: FromStr + Default>(&self, key: &str) -> T {
        let Some(raw) = self.0.get(key).and_then(Value::as_str) else {
            return T::default();
        };
        let normalized = raw.trim().to_lowercase().replace(['-', ' '], "_");
        T::from_str(&normalized).unwrap_or_default()
    }
}

/// Renders a scalar or small object as trimmed text.
fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        // Objects such as {"name": "Ana", "relation": "sister"} are joined
        // value by value.
        Value::Object(map) => map
            .values()
            .map(scalar_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        Value::Array(values) => values
            .iter()
            .map(scalar_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        Value::Null => String::new(),
    }
}

/// Reads "7", "7/10" or "8.5 out of 10".
fn leading_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    let end = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(trimmed.len());
    trimmed[..end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scores_clamped_and_defaulted() {
        let value = json!({
            "openness": 14,
            "conscientiousness": -3,
            "extraversion": "7/10",
            "agreeableness": 6.6,
            "summary": "  warm and chaotic  "
        });
        let Facet::Personality(p) = facet_from_value(StageKind::Personality, &value) else {
            panic!("wrong facet");
        };
        assert_eq!(p.openness, 10);
        assert_eq!(p.conscientiousness, 1);
        assert_eq!(p.extraversion, 7);
        assert_eq!(p.agreeableness, 7);
        assert_eq!(p.neuroticism, SCORE_DEFAULT);
        assert_eq!(p.summary, "warm and chaotic");
    }

    #[test]
    fn test_lists_truncated_in_order() {
        let many: Vec<String> = (0..15).map(|i| format!("topic {i}")).collect();
        let value = json!({"recurring_topics": many, "inside_jokes": "the duck"});
        let Facet::Relationship(r) = facet_from_value(StageKind::Relationship, &value) else {
            panic!("wrong facet");
        };
        assert_eq!(r.recurring_topics.len(), MAX_LIST_ITEMS);
        assert_eq!(r.recurring_topics[0], "topic 0");
        assert_eq!(r.recurring_topics[9], "topic 9");
        assert_eq!(r.inside_jokes, vec!["the duck"]);
    }

    #[test]
    fn test_enums_coerced() {
        let value = json!({"style": "Fearful-Avoidant", "anxiety_score": 8});
        let Facet::Attachment(a) = facet_from_value(StageKind::Attachment, &value) else {
            panic!("wrong facet");
        };
        assert_eq!(a.style, AttachmentStyle::FearfulAvoidant);

        let value = json!({"formality": "super chill", "emoji_usage": "HEAVY"});
        let Facet::Communication(c) = facet_from_value(StageKind::Communication, &value) else {
            panic!("wrong facet");
        };
        assert_eq!(c.formality, Formality::Neutral);
        assert_eq!(c.emoji_usage, EmojiUsage::Heavy);
    }

    #[test]
    fn test_non_object_gives_defaults() {
        let facet = facet_from_value(StageKind::Family, &json!("nope"));
        assert_eq!(facet, Facet::default_for(StageKind::Family));
    }

    #[test]
    fn test_family_members_as_objects() {
        let value = json!({"family_members": [{"name": "Ana", "relation": "sister"}]});
        let Facet::Family(f) = facet_from_value(StageKind::Family, &value) else {
            panic!("wrong facet");
        };
        assert_eq!(f.family_members, vec!["Ana, sister"]);
    }

    #[test]
    fn test_nested_response_patterns() {
        let value = json!({"response_patterns": {"sad": "goes quiet"}});
        let Facet::ResponsePatterns(r) = facet_from_value(StageKind::ResponsePatterns, &value)
        else {
            panic!("wrong facet");
        };
        assert_eq!(r.sad, "goes quiet");
    }
}
