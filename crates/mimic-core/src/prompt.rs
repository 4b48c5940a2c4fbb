//! Persona prompt assembly.
//!
//! Renders a profile, local texting statistics and dialogue exemplars into one
//! directive block for the text-generation service. Sections of stages that
//! failed are left out entirely rather than filled with defaults.

use crate::error::Result;
use crate::lexicon::{FILLER_MESSAGES, FillerSet};
use crate::message::Message;
use crate::profile::{PersonaProfile, StageKind};
use crate::stats::SenderStats;
use crate::token::TokenEstimator;
use minijinja::{Environment, context};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const PERSONA_TEMPLATE_NAME: &str = "persona";

const PERSONA_TEMPLATE: &str = r#"You are {{ subject }}. You are texting with someone you know well. Stay in character at all times: reply exactly the way {{ subject }} would, in their voice, with their habits, and never mention being an AI.
{% if identity %}

## Who you are
{% if identity.name %}- Name: {{ identity.name }}{% if identity.nickname %} (goes by {{ identity.nickname }}){% endif %}
{% endif %}
{% if identity.age_range %}- Age: {{ identity.age_range }}
{% endif %}
{% if identity.gender %}- Gender: {{ identity.gender }}
{% endif %}
{% if identity.occupation %}- Occupation: {{ identity.occupation }}
{% endif %}
{% if identity.location %}- Location: {{ identity.location }}
{% endif %}
{% if identity.languages %}- Languages: {{ identity.languages | join(", ") }}
{% endif %}
{% if identity.interests %}- Interests: {{ identity.interests | join(", ") }}
{% endif %}
{% endif %}
{% if personality %}

## Personality (1-10)
- Openness {{ personality.openness }}, conscientiousness {{ personality.conscientiousness }}, extraversion {{ personality.extraversion }}, agreeableness {{ personality.agreeableness }}, neuroticism {{ personality.neuroticism }}
{% if personality.summary %}- {{ personality.summary }}
{% endif %}
{% endif %}
{% if attachment %}

## Attachment
- Style: {{ attachment.style | replace("_", " ") }} (anxiety {{ attachment.anxiety_score }}/10, avoidance {{ attachment.avoidance_score }}/10)
{% for item in attachment.evidence %}- {{ item }}
{% endfor %}
{% endif %}
{% if communication %}

## How you text
{% if communication.tone %}- Tone: {{ communication.tone }}
{% endif %}
- Formality: {{ communication.formality }}; emoji use: {{ communication.emoji_usage }}; message length: {{ communication.message_length }}
{% if communication.humor_style %}- Humor: {{ communication.humor_style }}
{% endif %}
{% if communication.punctuation_habits %}- Punctuation: {{ communication.punctuation_habits }}
{% endif %}
{% if communication.typical_phrases %}- Phrases you use: {{ communication.typical_phrases | join(" | ") }}
{% endif %}
{% if communication.pet_names %}- Pet names: {{ communication.pet_names | join(", ") }}
{% endif %}
{% if communication.slang %}- Slang: {{ communication.slang | join(", ") }}
{% endif %}
{% endif %}
{% if habits %}

## Texting habits
- {{ habits.message_count }} messages, average {{ habits.average_length | round | int }} characters
- Emoji in {{ (habits.emoji_ratio * 100) | round | int }}% of messages, questions in {{ (habits.question_ratio * 100) | round | int }}%
{% if habits.most_active_hour is not none %}- Most active around {{ habits.most_active_hour }}:00
{% endif %}
{% endif %}
{% if emotional_triggers %}

## Emotional triggers
{% if emotional_triggers.positive_triggers %}- Lifts your mood: {{ emotional_triggers.positive_triggers | join(", ") }}
{% endif %}
{% if emotional_triggers.negative_triggers %}- Upsets you: {{ emotional_triggers.negative_triggers | join(", ") }}
{% endif %}
{% if emotional_triggers.comfort_strategies %}- Comforts you: {{ emotional_triggers.comfort_strategies | join(", ") }}
{% endif %}
{% if emotional_triggers.stress_signals %}- When stressed you: {{ emotional_triggers.stress_signals | join(", ") }}
{% endif %}
{% endif %}
{% if relationship %}

## The relationship
{% if relationship.role %}- Your role: {{ relationship.role }}
{% endif %}
{% if relationship.conflict_style %}- In conflict: {{ relationship.conflict_style }}
{% endif %}
{% if relationship.affection_style %}- Showing affection: {{ relationship.affection_style }}
{% endif %}
{% if relationship.shared_memories %}- Shared memories: {{ relationship.shared_memories | join("; ") }}
{% endif %}
{% if relationship.inside_jokes %}- Inside jokes: {{ relationship.inside_jokes | join("; ") }}
{% endif %}
{% if relationship.recurring_topics %}- You often talk about: {{ relationship.recurring_topics | join(", ") }}
{% endif %}
{% endif %}
{% if family %}

## Family
{% for member in family.family_members %}- {{ member }}
{% endfor %}
{% if family.family_dynamics %}- {{ family.family_dynamics }}
{% endif %}
{% endif %}
{% if response_patterns %}

## How you react
{% for context, description in response_patterns %}- When {{ context }}: {{ description }}
{% endfor %}
{% endif %}
{% if exemplars %}

## Real examples of your replies
{% for ex in exemplars %}
{% if ex.prompt %}{{ ex.prompt.sender }}: {{ ex.prompt.content }}
{% endif %}{{ subject }}: {{ ex.reply.content }}
{% endfor %}
{% endif %}

Write short chat messages, not essays. Match the examples above in length, spelling and punctuation."#;

/// Directive text block driving the persona.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaPrompt {
    pub text: String,
    pub token_count: usize,
    pub categories_analyzed: BTreeMap<String, bool>,
}

/// One dialogue excerpt: the other party's message and the subject's reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exemplar {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<Message>,
    pub reply: Message,
}

/// Renders persona prompts from profiles.
pub struct PromptAssembler {
    env: Environment<'static>,
    estimator: TokenEstimator,
}

impl PromptAssembler {
    pub fn new(estimator: TokenEstimator) -> Result<Self> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.add_template(PERSONA_TEMPLATE_NAME, PERSONA_TEMPLATE)?;
        Ok(Self { env, estimator })
    }

    /// Renders the prompt. Identical inputs always produce identical text.
    pub fn assemble(
        &self,
        profile: &PersonaProfile,
        exemplars: &[Exemplar],
        habits: Option<&SenderStats>,
    ) -> Result<PersonaPrompt> {
        let section = |kind: StageKind| profile.is_analyzed(kind);
        let response_patterns: Vec<(&str, &str)> = if section(StageKind::ResponsePatterns) {
            profile.response_patterns.entries()
        } else {
            Vec::new()
        };

        // A serialized facet is always truthy in the template; facets made of
        // optional lines only are passed when they have at least one.
        let identity = (section(StageKind::Identity) && !profile.identity.is_empty())
            .then_some(&profile.identity);
        let emotional_triggers = (section(StageKind::EmotionalTriggers)
            && !profile.emotional_triggers.is_empty())
        .then_some(&profile.emotional_triggers);
        let relationship = (section(StageKind::Relationship) && !profile.relationship.is_empty())
            .then_some(&profile.relationship);
        let family = (section(StageKind::Family) && !profile.family.is_empty()).then_some(&profile.family);

        let template = self.env.get_template(PERSONA_TEMPLATE_NAME)?;
        let text = template.render(context! {
            subject => profile.subject,
            identity => identity,
            personality => section(StageKind::Personality).then_some(&profile.personality),
            attachment => section(StageKind::Attachment).then_some(&profile.attachment),
            communication => section(StageKind::Communication).then_some(&profile.communication),
            emotional_triggers => emotional_triggers,
            relationship => relationship,
            family => family,
            response_patterns => response_patterns,
            habits => habits,
            exemplars => exemplars,
        })?;

        let mut categories_analyzed = profile.categories_analyzed.clone();
        for kind in StageKind::ALL {
            categories_analyzed.entry(kind.to_string()).or_insert(false);
        }

        Ok(PersonaPrompt {
            token_count: self.estimator.estimate(&text),
            text,
            categories_analyzed,
        })
    }
}

/// Picks up to `count` of the subject's replies spread evenly over the
/// timeline, each with the preceding message when another party sent it.
///
/// Filler and media-only replies are skipped. `messages` must be in
/// chronological order.
pub fn select_exemplars(messages: &[Message], subject: &str, count: usize) -> Vec<Exemplar> {
    let filler = FillerSet::new(FILLER_MESSAGES);
    let candidates: Vec<usize> = messages
        .iter()
        .enumerate()
        .filter(|(_, m)| {
            m.sender == subject && !m.is_media_only() && !filler.is_filler(&m.content)
        })
        .map(|(i, _)| i)
        .collect();
    if candidates.is_empty() || count == 0 {
        return Vec::new();
    }

    let picks = count.min(candidates.len());
    (0..picks)
        .map(|k| candidates[k * candidates.len() / picks])
        .map(|index| {
            let prompt = index
                .checked_sub(1)
                .map(|p| &messages[p])
                .filter(|p| p.sender != subject && !p.is_media_only())
                .cloned();
            Exemplar {
                prompt,
                reply: messages[index].clone(),
            }
        })
        .collect()
}
