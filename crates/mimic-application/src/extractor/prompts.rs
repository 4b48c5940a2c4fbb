//! Stage instructions and output schemas.

use mimic_core::profile::StageKind;

pub const ANALYST_SYSTEM_INSTRUCTION: &str = "You are a careful behavioural analyst. \
You read chat transcripts and describe one participant factually, based only on evidence \
in the transcript. When the transcript does not show something, leave the field empty \
instead of guessing. Answer with a single JSON object and nothing else.";

/// What the stage should look for.
pub fn instruction(kind: StageKind) -> &'static str {
    match kind {
        StageKind::Identity => {
            "Describe who {subject} is: name and nickname as used in the chat, approximate \
             age range, gender, occupation, where they live, the languages they write in \
             and their main interests. If a photo is attached it shows {subject}."
        }
        StageKind::Personality => {
            "Rate {subject} on the Big Five personality traits from 1 (very low) to 10 \
             (very high) and summarise their personality in two sentences."
        }
        StageKind::Attachment => {
            "Classify the attachment style {subject} shows toward the other person \
             (secure, anxious, avoidant or fearful_avoidant). Rate attachment anxiety and \
             avoidance from 1 to 10 and quote short evidence from the chat."
        }
        StageKind::Communication => {
            "Describe how {subject} writes: overall tone, formality, humour, how often they \
             use emoji, phrases they repeat, pet names, slang, typical message length and \
             punctuation or capitalisation habits."
        }
        StageKind::EmotionalTriggers => {
            "List what reliably improves {subject}'s mood, what upsets them, what comforts \
             them when they are down and how stress shows in their messages."
        }
        StageKind::Relationship => {
            "Describe {subject}'s role in this relationship, how they handle conflict, how \
             they show affection, memories the two share, inside jokes and topics that keep \
             coming back."
        }
        StageKind::Family => {
            "List the family members {subject} mentions (name if known and relation) and \
             describe the family dynamics in one or two sentences."
        }
        StageKind::ResponsePatterns => {
            "Describe in one sentence each how {subject} typically replies when they are \
             happy, angry, sad, jealous, feel ignored and when they receive a compliment."
        }
    }
}

/// Exact JSON shape the stage must return.
pub fn schema(kind: StageKind) -> &'static str {
    match kind {
        StageKind::Identity => {
            r#"{"name": "", "nickname": "", "age_range": "", "gender": "", "occupation": "", "location": "", "languages": [""], "interests": [""]}"#
        }
        StageKind::Personality => {
            r#"{"openness": 5, "conscientiousness": 5, "extraversion": 5, "agreeableness": 5, "neuroticism": 5, "summary": ""}"#
        }
        StageKind::Attachment => {
            r#"{"style": "secure|anxious|avoidant|fearful_avoidant", "anxiety_score": 5, "avoidance_score": 5, "evidence": [""]}"#
        }
        StageKind::Communication => {
            r#"{"tone": "", "formality": "casual|neutral|formal", "humor_style": "", "emoji_usage": "none|low|moderate|heavy", "typical_phrases": [""], "pet_names": [""], "slang": [""], "message_length": "short|medium|long", "punctuation_habits": ""}"#
        }
        StageKind::EmotionalTriggers => {
            r#"{"positive_triggers": [""], "negative_triggers": [""], "comfort_strategies": [""], "stress_signals": [""]}"#
        }
        StageKind::Relationship => {
            r#"{"role": "", "conflict_style": "", "affection_style": "", "shared_memories": [""], "inside_jokes": [""], "recurring_topics": [""]}"#
        }
        StageKind::Family => r#"{"family_members": [""], "family_dynamics": ""}"#,
        StageKind::ResponsePatterns => {
            r#"{"happy": "", "angry": "", "sad": "", "jealous": "", "ignored": "", "complimented": ""}"#
        }
    }
}
