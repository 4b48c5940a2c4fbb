//! Stage extractors.
//!
//! Each stage turns a purpose-filtered slice of the sample into one profile
//! facet. Extractors only build requests and interpret responses; calling the
//! service, pacing and retries belong to the pipeline.

pub mod json;
mod prompts;

use mimic_core::config::{GenerationConfig, PipelineConfig};
use mimic_core::generation::{GenerationRequest, InlineAttachment};
use mimic_core::lexicon::{FAMILY_KEYWORDS, KeywordMatcher};
use mimic_core::message::{Message, transcript};
use mimic_core::profile::{Facet, StageKind, facet_from_value};
use mimic_core::token::TokenEstimator;

pub use json::{extract_json_object, strip_code_fences};
pub use prompts::ANALYST_SYSTEM_INSTRUCTION;

/// Static description of one stage.
#[derive(Debug, Clone, PartialEq)]
pub struct StageDefinition {
    pub kind: StageKind,
    /// Only messages matching one of these keywords are sent, when set
    pub topic_keywords: Option<Vec<String>>,
    pub token_budget: usize,
    pub accepts_attachment: bool,
}

/// The fixed, ordered stage list.
pub fn stage_definitions(config: &PipelineConfig) -> Vec<StageDefinition> {
    StageKind::ALL
        .into_iter()
        .map(|kind| StageDefinition {
            kind,
            topic_keywords: (kind == StageKind::Family)
                .then(|| FAMILY_KEYWORDS.iter().map(|k| k.to_string()).collect()),
            token_budget: if kind == StageKind::Family {
                config.family_token_budget
            } else {
                config.stage_token_budget
            },
            accepts_attachment: kind == StageKind::Identity,
        })
        .collect()
}

/// Builds stage requests and turns responses into facets.
#[derive(Debug, Clone)]
pub struct StageExtractor {
    estimator: TokenEstimator,
    generation: GenerationConfig,
}

impl StageExtractor {
    pub fn new(estimator: TokenEstimator, generation: GenerationConfig) -> Self {
        Self {
            estimator,
            generation,
        }
    }

    /// Messages the stage will see: topic-filtered, then decimated to its budget.
    ///
    /// When the topic filter matches nothing the whole sample is used, so the
    /// stage can still report that the topic never comes up.
    pub fn select_slice(&self, definition: &StageDefinition, sample: &[Message]) -> Vec<Message> {
        let filtered: Vec<Message> = match &definition.topic_keywords {
            Some(keywords) => {
                let matcher = KeywordMatcher::new(keywords);
                sample
                    .iter()
                    .filter(|m| matcher.matches(&m.content))
                    .cloned()
                    .collect()
            }
            None => Vec::new(),
        };
        let source = if filtered.is_empty() {
            sample.to_vec()
        } else {
            filtered
        };
        decimate(source, definition.token_budget, &self.estimator)
    }

    /// Renders the deterministic request for a stage.
    pub fn build_request(
        &self,
        definition: &StageDefinition,
        subject: &str,
        slice: &[Message],
        attachment: Option<&InlineAttachment>,
    ) -> GenerationRequest {
        let kind = definition.kind;
        let prompt = format!(
            "Stage: {label}\n\n{instruction}\n\nReturn exactly this JSON structure, with every key present:\n{schema}\n\nTranscript ({count} messages, chronological):\n{transcript}",
            label = kind.label(),
            instruction = prompts::instruction(kind).replace("{subject}", subject),
            schema = prompts::schema(kind),
            count = slice.len(),
            transcript = transcript(slice),
        );

        let mut request = GenerationRequest::new(prompt)
            .with_system_instruction(ANALYST_SYSTEM_INSTRUCTION)
            .with_temperature(self.generation.extraction_temperature)
            .with_max_output_tokens(self.generation.extraction_max_output_tokens)
            .expect_json();
        if definition.accepts_attachment {
            if let Some(attachment) = attachment {
                request = request.with_attachment(attachment.clone());
            }
        }
        request
    }

    /// Interprets a raw response. `None` when no JSON object can be recovered.
    pub fn parse_response(&self, kind: StageKind, text: &str) -> Option<Facet> {
        extract_json_object(text).map(|value| facet_from_value(kind, &value))
    }
}

/// Keeps every k-th message, raising k from `total / budget` until the result
/// fits `budget`.
///
/// Chronological order is preserved and the first message is always kept.
pub fn decimate(messages: Vec<Message>, budget: usize, estimator: &TokenEstimator) -> Vec<Message> {
    let tokens: Vec<usize> = messages.iter().map(|m| estimator.message(m)).collect();
    let total: usize = tokens.iter().sum();
    if total <= budget {
        return messages;
    }
    if budget == 0 {
        return Vec::new();
    }

    let mut stride = total.div_ceil(budget).max(2);
    loop {
        let kept: usize = tokens.iter().step_by(stride).sum();
        if kept <= budget || stride >= messages.len() {
            break;
        }
        stride += 1;
    }

    messages.into_iter().step_by(stride).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn messages(contents: &[&str]) -> Vec<Message> {
        let start = Utc.with_ymd_and_hms(2023, 5, 1, 12, 0, 0).unwrap();
        contents
            .iter()
            .enumerate()
            .map(|(i, c)| Message::new(start + Duration::minutes(i as i64), "Sam", *c))
            .collect()
    }

    fn extractor() -> StageExtractor {
        StageExtractor::new(TokenEstimator::default(), GenerationConfig::default())
    }

    #[test]
    fn test_stage_order_and_budgets() {
        let definitions = stage_definitions(&PipelineConfig::default());
        let kinds: Vec<StageKind> = definitions.iter().map(|d| d.kind).collect();
        assert_eq!(kinds, StageKind::ALL.to_vec());
        assert_eq!(definitions[0].token_budget, 120_000);
        let family = definitions.iter().find(|d| d.kind == StageKind::Family).unwrap();
        assert_eq!(family.token_budget, 60_000);
        assert!(family.topic_keywords.is_some());
        assert!(definitions[0].accepts_attachment);
        assert!(!definitions[1].accepts_attachment);
    }

    #[test]
    fn test_family_filter() {
        let sample = messages(&["my mom called", "pizza?", "dad says hi", "brb"]);
        let definitions = stage_definitions(&PipelineConfig::default());
        let family = definitions.iter().find(|d| d.kind == StageKind::Family).unwrap();
        let slice = extractor().select_slice(family, &sample);
        assert_eq!(slice.len(), 2);
        assert_eq!(slice[1].content, "dad says hi");

        let unrelated = messages(&["pizza?", "brb"]);
        assert_eq!(extractor().select_slice(family, &unrelated).len(), 2);
    }

    #[test]
    fn test_decimation_preserves_order_and_budget() {
        let contents: Vec<String> = (0..100).map(|i| format!("message {i:03}")).collect();
        let refs: Vec<&str> = contents.iter().map(String::as_str).collect();
        let all = messages(&refs);
        let estimator = TokenEstimator::default();
        let per_message = estimator.message(&all[0]);

        let kept = decimate(all.clone(), per_message * 30, &estimator);
        assert!(estimator.messages(&kept) <= per_message * 30);
        assert!(kept.len() >= 25);
        assert_eq!(kept[0], all[0]);
        assert!(kept.windows(2).all(|w| w[0].timestamp < w[1].timestamp));

        assert_eq!(decimate(all.clone(), usize::MAX, &estimator).len(), 100);
    }

    #[test]
    fn test_request_is_deterministic() {
        let sample = messages(&["hey", "how are you"]);
        let definition = &stage_definitions(&PipelineConfig::default())[1];
        let a = extractor().build_request(definition, "Sam", &sample, None);
        let b = extractor().build_request(definition, "Sam", &sample, None);
        assert_eq!(a, b);
        assert!(a.prompt.contains("Rate Sam on the Big Five"));
        assert!(a.prompt.contains("\"openness\": 5"));
        assert!(a.json_response);
    }

    #[test]
    fn test_attachment_only_for_identity() {
        let attachment = InlineAttachment {
            mime_type: "image/jpeg".into(),
            data: vec![0xff, 0xd8],
        };
        let definitions = stage_definitions(&PipelineConfig::default());
        let identity = extractor().build_request(&definitions[0], "Sam", &[], Some(&attachment));
        let personality = extractor().build_request(&definitions[1], "Sam", &[], Some(&attachment));
        assert!(identity.attachment.is_some());
        assert!(personality.attachment.is_none());
    }

    #[test]
    fn test_parse_response() {
        let facet = extractor()
            .parse_response(StageKind::Personality, "```json\n{\"openness\": 12}\n```")
            .unwrap();
        let Facet::Personality(p) = facet else {
            panic!("wrong facet");
        };
        assert_eq!(p.openness, 10);
        assert!(extractor().parse_response(StageKind::Personality, "sorry, I can't").is_none());
    }
}
