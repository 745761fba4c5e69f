use crate::{
    config::GeminiConfig,
    error::{Result, StudioError},
    models::{GenerationRequest, ImagePayload},
    service::traits::ImageGenerationService,
};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

const RETRY_BASE_DELAY_MS: u64 = 900;
const ERROR_BODY_LIMIT: usize = 600;

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    parts: Option<Vec<GeminiPart>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GeminiPart {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiInlineData,
    },
    Text {
        text: String,
    },
    /// Thought signatures and anything else without an image.
    Other {},
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

/// Gemini `generateContent` with an inline source image and a text prompt.
#[derive(Clone)]
pub struct GeminiImageService {
    client: Client,
    config: GeminiConfig,
}

impl GeminiImageService {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let service = Self {
            client: Client::new(),
            config,
        };
        service.ensure_ready()?;
        Ok(service)
    }

    fn api_key(&self) -> Option<&str> {
        self.config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    fn url(&self) -> String {
        format!(
            "{}/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        )
    }

    fn redact(&self, text: &str) -> String {
        match self.api_key() {
            Some(key) => text.replace(key, "[redacted]"),
            None => text.to_string(),
        }
    }
}

#[async_trait]
impl ImageGenerationService for GeminiImageService {
    fn name(&self) -> &str {
        "gemini"
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.api_key().is_none() {
            return Err(StudioError::InvalidPrecondition(
                "GEMINI_API_KEY is not set".into(),
            ));
        }
        Ok(())
    }

    async fn submit(&self, request: &GenerationRequest) -> Result<Vec<ImagePayload>> {
        let api_key = self
            .api_key()
            .ok_or_else(|| StudioError::InvalidPrecondition("GEMINI_API_KEY is not set".into()))?;
        let payload = build_payload(request);
        let url = self.url();
        let max_attempts = self.config.max_attempts.max(1);

        log::debug!("Submitting image generation to Gemini model {}", self.config.model);

        let mut attempt = 0usize;
        loop {
            attempt += 1;
            let response = match self
                .client
                .post(&url)
                .header("x-goog-api-key", api_key)
                .json(&payload)
                .send()
                .await
            {
                Ok(response) => response,
                Err(err) => {
                    let retry = should_retry_error(&err) && attempt < max_attempts;
                    let err_text = self.redact(&err.to_string());
                    log::warn!(
                        "Gemini request failed to send: {} (timeout={}, connect={}, retrying={})",
                        err_text,
                        err.is_timeout(),
                        err.is_connect(),
                        retry
                    );
                    if retry {
                        tokio::time::sleep(retry_delay(attempt)).await;
                        continue;
                    }
                    return Err(StudioError::RequestError(err_text));
                }
            };

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let detail = self.redact(&summarize_error_body(&body));
                let retry = should_retry_status(status) && attempt < max_attempts;
                log::warn!(
                    "Gemini API error: status={}, body={}, retrying={}",
                    status,
                    detail,
                    retry
                );
                if retry {
                    tokio::time::sleep(retry_delay(attempt)).await;
                    continue;
                }
                return Err(StudioError::ResponseError(format!(
                    "Gemini returned {}: {}",
                    status, detail
                )));
            }

            let body: GeminiResponse = response
                .json()
                .await
                .map_err(|e| StudioError::ResponseError(self.redact(&e.to_string())))?;
            let images = extract_images(body);
            log::debug!("Gemini returned {} image(s)", images.len());
            return Ok(images);
        }
    }
}

fn build_payload(request: &GenerationRequest) -> Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": [
                {
                    "inlineData": {
                        "mimeType": request.image.mime_type,
                        "data": general_purpose::STANDARD.encode(&request.image.data),
                    }
                },
                { "text": request.prompt },
            ]
        }],
        "generationConfig": {
            "responseModalities": ["IMAGE", "TEXT"],
            "imageConfig": { "aspectRatio": request.config.aspect_ratio.as_str() },
        },
    })
}

/// Inline image parts of the first candidate, in order.
fn extract_images(response: GeminiResponse) -> Vec<ImagePayload> {
    let parts = response
        .candidates
        .unwrap_or_default()
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts)
        .unwrap_or_default();

    let mut images = Vec::new();
    for part in parts {
        match part {
            GeminiPart::InlineData { inline_data } if inline_data.mime_type.starts_with("image/") => {
                match general_purpose::STANDARD.decode(inline_data.data.as_bytes()) {
                    Ok(bytes) => {
                        images.push(ImagePayload::new(bytes).with_mime_type(inline_data.mime_type))
                    }
                    Err(e) => log::warn!("Skipping undecodable Gemini image part: {}", e),
                }
            }
            GeminiPart::Text { text } => log::debug!("Gemini text part: {}", truncate(&text, 200)),
            _ => {}
        }
    }
    images
}

fn should_retry_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

fn should_retry_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}

fn retry_delay(attempt: usize) -> Duration {
    Duration::from_millis(RETRY_BASE_DELAY_MS.saturating_mul(attempt.max(1) as u64))
}

fn summarize_error_body(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| truncate(body, ERROR_BODY_LIMIT))
}

fn truncate(value: &str, limit: usize) -> String {
    if value.chars().count() <= limit {
        return value.to_string();
    }
    let truncated: String = value.chars().take(limit).collect();
    format!("{}... (truncated)", truncated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AspectRatio, Configuration, SourceImage};

    fn request() -> GenerationRequest {
        GenerationRequest {
            image: SourceImage::new(vec![1, 2, 3], "image/jpeg"),
            prompt: "studio portrait".into(),
            config: Configuration::new().with_aspect_ratio(AspectRatio::Story),
        }
    }

    #[test]
    fn test_missing_api_key_is_precondition_failure() {
        let err = GeminiImageService::new(GeminiConfig::new().with_api_key("  ")).err().unwrap();
        assert!(matches!(err, StudioError::InvalidPrecondition(_)));
        assert!(GeminiImageService::new(GeminiConfig::new().with_api_key("secret")).is_ok());
    }

    #[test]
    fn test_payload_carries_image_and_prompt() {
        let payload = build_payload(&request());
        let parts = &payload["contents"][0]["parts"];
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(parts[0]["inlineData"]["data"], "AQID");
        assert_eq!(parts[1]["text"], "studio portrait");
        assert_eq!(payload["generationConfig"]["imageConfig"]["aspectRatio"], "9:16");
    }

    #[test]
    fn test_extracts_first_candidate_images_in_order() {
        let body = json!({
            "candidates": [
                {
                    "content": {
                        "parts": [
                            { "text": "Here you go" },
                            { "inlineData": { "mimeType": "image/png", "data": "AQ==" } },
                            { "thoughtSignature": "abc" },
                            { "inlineData": { "mimeType": "image/jpeg", "data": "Ag==" } }
                        ]
                    }
                },
                {
                    "content": {
                        "parts": [{ "inlineData": { "mimeType": "image/png", "data": "Aw==" } }]
                    }
                }
            ]
        });
        let response: GeminiResponse = serde_json::from_value(body).unwrap();
        let images = extract_images(response);
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].data, vec![1]);
        assert_eq!(images[1].data, vec![2]);
        assert_eq!(images[1].mime_type.as_deref(), Some("image/jpeg"));
    }

    #[test]
    fn test_unknown_parts_parse_as_other() {
        let part: GeminiPart =
            serde_json::from_value(json!({ "thoughtSignature": "abc" })).unwrap();
        assert!(matches!(part, GeminiPart::Other {}));

        let part: GeminiPart = serde_json::from_value(json!({ "text": "hi" })).unwrap();
        assert!(matches!(part, GeminiPart::Text { .. }));
    }

    #[test]
    fn test_no_candidates_yields_no_images() {
        let response: GeminiResponse = serde_json::from_value(json!({})).unwrap();
        assert!(extract_images(response).is_empty());
    }

    #[test]
    fn test_error_body_summary_and_redaction() {
        let body = r#"{"error":{"code":429,"message":"Quota exceeded"}}"#;
        assert_eq!(summarize_error_body(body), "Quota exceeded");
        assert_eq!(summarize_error_body("bad gateway"), "bad gateway");

        let service = GeminiImageService::new(GeminiConfig::new().with_api_key("sk-123")).unwrap();
        assert_eq!(service.redact("url?key=sk-123"), "url?key=[redacted]");
        assert!(service.url().ends_with("gemini-2.5-flash-image-preview:generateContent"));
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(should_retry_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(should_retry_status(StatusCode::BAD_GATEWAY));
        assert!(!should_retry_status(StatusCode::BAD_REQUEST));
        assert_eq!(retry_delay(2), Duration::from_millis(1800));
    }
}
