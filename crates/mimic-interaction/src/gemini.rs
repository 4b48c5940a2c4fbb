//! GeminiClient - Direct REST API implementation of [`TextGenerator`].
//!
//! Credentials come from `secret.json` (see [`SecretService`]); the model can
//! be overridden per deployment.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use mimic_core::generation::{GenerationError, GenerationRequest, TextGenerator};
use mimic_core::secret::SecretService;
use reqwest::{Client, StatusCode, header::HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Client for the Gemini `generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Creates a new client with the provided API key and model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: BASE_URL.to_string(),
        }
    }

    /// Loads credentials through a secret service.
    ///
    /// Model precedence: `model_override`, then `model_name` from the secret
    /// file, then [`DEFAULT_GEMINI_MODEL`]. A missing Gemini section yields a
    /// client with an empty key, which [`TextGenerator::preflight`] rejects.
    pub async fn from_secrets(
        service: &dyn SecretService,
        model_override: Option<&str>,
    ) -> mimic_core::Result<Self> {
        let secrets = service.load_secrets().await?;
        let gemini = secrets.gemini.unwrap_or_default();
        let model = model_override
            .map(str::to_string)
            .or(gemini.model_name)
            .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());
        Ok(Self::new(gemini.api_key, model))
    }

    /// Overrides the model after construction.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Points the client at another endpoint prefix (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn send_request(&self, body: &GenerateContentRequest) -> Result<String, GenerationError> {
        let url = format!("{}/{}:generateContent", self.base_url, self.model);

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|err| {
                let retryable = err.is_connect() || err.is_timeout() || err.is_request();
                GenerationError::new(
                    format!("Gemini API request failed: {}", err.without_url()),
                    retryable,
                )
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let retry_after = parse_retry_after(response.headers().get("retry-after"));
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Gemini error body".to_string());
            return Err(map_http_error(status, body_text, retry_after));
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|err| {
            GenerationError::new(
                format!("Failed to parse Gemini response: {}", err.without_url()),
                false,
            )
        })?;

        extract_text_response(parsed)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let body = build_request(request);
        tracing::debug!(
            target: "gemini",
            "generateContent model={} prompt_chars={} attachment={} json={}",
            self.model,
            request.prompt.len(),
            request.attachment.is_some(),
            request.json_response
        );
        let text = self.send_request(&body).await?;
        tracing::debug!(target: "gemini", "Received {} chars", text.len());
        Ok(text)
    }

    async fn preflight(&self) -> Result<(), GenerationError> {
        if self.api_key.trim().is_empty() {
            return Err(GenerationError::new(
                "Gemini API key is not configured (set it in secret.json or GEMINI_API_KEY)",
                false,
            ));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

fn build_request(request: &GenerationRequest) -> GenerateContentRequest {
    let mut parts = vec![Part::Text {
        text: request.prompt.clone(),
    }];
    if let Some(attachment) = &request.attachment {
        parts.push(Part::InlineData {
            inline_data: InlineDataPayload {
                mime_type: attachment.mime_type.clone(),
                data: BASE64_STANDARD.encode(&attachment.data),
            },
        });
    }

    GenerateContentRequest {
        contents: vec![Content {
            role: "user".to_string(),
            parts,
        }],
        system_instruction: request.system_instruction.as_ref().map(|text| Content {
            role: "system".to_string(),
            parts: vec![Part::Text { text: text.clone() }],
        }),
        generation_config: GenerationConfigPayload {
            temperature: request.temperature,
            max_output_tokens: request.max_output_tokens,
            response_mime_type: request
                .json_response
                .then(|| "application/json".to_string()),
        },
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfigPayload,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfigPayload {
    temperature: f32,
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineDataPayload,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineDataPayload {
    mime_type: String,
    data: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

fn extract_text_response(response: GenerateContentResponse) -> Result<String, GenerationError> {
    let text: String = response
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.is_empty() {
        // Usually a safety block; another attempt may succeed.
        return Err(GenerationError::new(
            "Gemini API returned no text in the response candidates",
            true,
        ));
    }
    Ok(text)
}

fn map_http_error(
    status: StatusCode,
    body: String,
    retry_after: Option<Duration>,
) -> GenerationError {
    let message = serde_json::from_str::<ErrorWrapper>(&body)
        .map(|wrapper| {
            let status_text = wrapper.error.status.unwrap_or_default();
            let msg = wrapper.error.message.unwrap_or_else(|| body.clone());
            if status_text.is_empty() {
                msg
            } else {
                format!("{status_text}: {msg}")
            }
        })
        .unwrap_or_else(|_| body.clone());

    let mut error = GenerationError::http(status.as_u16(), message).with_retry_after(retry_after);
    // Gemini reports an invalid key as 400 INVALID_ARGUMENT.
    if status == StatusCode::BAD_REQUEST && error.message.contains("API key") {
        error.status_code = Some(StatusCode::UNAUTHORIZED.as_u16());
    }
    error
}

fn parse_retry_after(header: Option<&HeaderValue>) -> Option<Duration> {
    let value = header?.to_str().ok()?;
    if let Ok(seconds) = value.trim().parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    // HTTP-date values are ignored; the pipeline falls back to its own backoff.
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use mimic_core::generation::InlineAttachment;

    #[test]
    fn test_request_body_shape() {
        let request = GenerationRequest::new("describe Sam")
            .with_system_instruction("you are an analyst")
            .with_attachment(InlineAttachment {
                mime_type: "image/png".into(),
                data: vec![1, 2, 3],
            })
            .with_temperature(0.3)
            .with_max_output_tokens(512)
            .expect_json();

        let body = serde_json::to_value(build_request(&request)).unwrap();
        assert_eq!(body["contents"][0]["parts"][0]["text"], "describe Sam");
        assert_eq!(body["contents"][0]["parts"][1]["inlineData"]["mimeType"], "image/png");
        assert_eq!(body["contents"][0]["parts"][1]["inlineData"]["data"], "AQID");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "you are an analyst");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 512);
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
    }

    #[test]
    fn test_plain_request_omits_optional_fields() {
        let body = serde_json::to_value(build_request(&GenerationRequest::new("hi"))).unwrap();
        assert!(body.get("systemInstruction").is_none());
        assert!(body["generationConfig"].get("responseMimeType").is_none());
    }

    #[test]
    fn test_map_http_error() {
        let body = r#"{"error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}}"#;
        let error = map_http_error(
            StatusCode::TOO_MANY_REQUESTS,
            body.to_string(),
            Some(Duration::from_secs(7)),
        );
        assert!(error.is_retryable);
        assert_eq!(error.message, "RESOURCE_EXHAUSTED: Quota exceeded");
        assert_eq!(error.retry_after, Some(Duration::from_secs(7)));

        let bad_key = r#"{"error": {"code": 400, "message": "API key not valid. Please pass a valid API key.", "status": "INVALID_ARGUMENT"}}"#;
        let error = map_http_error(StatusCode::BAD_REQUEST, bad_key.to_string(), None);
        assert!(error.is_auth());
        assert!(!error.is_retryable);

        let error = map_http_error(StatusCode::BAD_GATEWAY, "upstream".to_string(), None);
        assert!(error.is_retryable);
        assert_eq!(error.message, "upstream");
    }

    #[test]
    fn test_parse_retry_after() {
        let header = HeaderValue::from_static("12");
        assert_eq!(parse_retry_after(Some(&header)), Some(Duration::from_secs(12)));
        let date = HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT");
        assert_eq!(parse_retry_after(Some(&date)), None);
        assert_eq!(parse_retry_after(None), None);
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let response: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [{"text": "{\"a\":"}, {"text": " 1}"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text_response(response).unwrap(), "{\"a\": 1}");

        let blocked: GenerateContentResponse =
            serde_json::from_str(r#"{"candidates": [{"finishReason": "SAFETY"}]}"#).unwrap();
        assert!(extract_text_response(blocked).is_err());
    }

    #[tokio::test]
    async fn test_preflight_rejects_empty_key() {
        let client = GeminiClient::new("", DEFAULT_GEMINI_MODEL);
        assert!(client.preflight().await.is_err());
        let client = GeminiClient::new("key", DEFAULT_GEMINI_MODEL);
        assert!(client.preflight().await.is_ok());
    }
}
