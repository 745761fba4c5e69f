use crate::{
    config::BedrockConfig,
    error::{Result, StudioError},
    models::{AspectRatio, Configuration, GenerationRequest, ImagePayload},
    prompt::NO_EXTRA_INSTRUCTIONS,
    service::traits::ImageGenerationService,
};
use async_trait::async_trait;
use aws_sdk_bedrockruntime::{
    config::{ProvideCredentials, SharedCredentialsProvider},
    primitives::Blob,
    Client,
};
use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;
use serde_json::{json, Value};

/// Titan rejects longer prompt texts.
const TITAN_MAX_PROMPT_CHARS: usize = 512;

#[derive(Deserialize)]
struct TitanImageResponse {
    #[serde(default)]
    images: Vec<String>,
    error: Option<String>,
}

/// Amazon Titan image variation: the source photo guides the generated image.
#[derive(Clone)]
pub struct BedrockImageService {
    client: Client,
    model_id: String,
}

impl BedrockImageService {
    pub async fn new(config: BedrockConfig) -> Result<Self> {
        let region = aws_sdk_bedrockruntime::config::Region::new(
            config.region.clone().unwrap_or_else(|| "us-east-1".to_string()),
        );

        let aws_config = if let (Some(access_key), Some(secret_key)) =
            (&config.access_key, &config.secret_key)
        {
            aws_config::from_env()
                .credentials_provider(aws_sdk_bedrockruntime::config::Credentials::new(
                    access_key,
                    secret_key,
                    None,
                    None,
                    "studiogen",
                ))
                .region(region)
                .load()
                .await
        } else {
            aws_config::from_env().region(region).load().await
        };

        resolve_credentials(aws_config.credentials_provider()).await?;

        Ok(Self {
            client: Client::new(&aws_config),
            model_id: config.model_id,
        })
    }
}

/// Resolves the credential chain once so a missing credential fails before any call.
async fn resolve_credentials(provider: Option<SharedCredentialsProvider>) -> Result<()> {
    let provider = provider.ok_or_else(|| {
        StudioError::InvalidPrecondition("No AWS credentials provider configured for Bedrock".into())
    })?;

    provider.provide_credentials().await.map_err(|e| {
        StudioError::InvalidPrecondition(format!("No AWS credentials available for Bedrock: {}", e))
    })?;

    log::debug!("AWS credentials resolved for Bedrock");
    Ok(())
}

#[async_trait]
impl ImageGenerationService for BedrockImageService {
    fn name(&self) -> &str {
        "bedrock"
    }

    async fn submit(&self, request: &GenerationRequest) -> Result<Vec<ImagePayload>> {
        let payload = build_payload(request);
        let request_json = serde_json::to_string(&payload)
            .map_err(|e| StudioError::SerializationError(e.to_string()))?;

        log::debug!("Invoking Bedrock image model: {}", self.model_id);

        let response = self
            .client
            .invoke_model()
            .model_id(&self.model_id)
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(request_json.into_bytes()))
            .send()
            .await
            .map_err(|e| StudioError::AwsError(e.to_string()))?;

        let titan_response: TitanImageResponse =
            serde_json::from_slice(response.body.as_ref())
                .map_err(|e| StudioError::ResponseError(e.to_string()))?;

        if let Some(error) = titan_response.error.filter(|e| !e.is_empty()) {
            return Err(StudioError::ResponseError(error));
        }

        titan_response
            .images
            .iter()
            .map(|encoded| {
                general_purpose::STANDARD
                    .decode(encoded.as_bytes())
                    .map(|bytes| ImagePayload::new(bytes).with_mime_type("image/png"))
                    .map_err(|e| StudioError::ResponseError(e.to_string()))
            })
            .collect()
    }
}

fn build_payload(request: &GenerationRequest) -> Value {
    let (width, height) = titan_dimensions(request.config.aspect_ratio);
    json!({
        "taskType": "IMAGE_VARIATION",
        "imageVariationParams": {
            "text": titan_prompt(request),
            "images": [general_purpose::STANDARD.encode(&request.image.data)],
        },
        "imageGenerationConfig": {
            "numberOfImages": 1,
            "quality": "standard",
            "cfgScale": 8.0,
            "width": width,
            "height": height,
        }
    })
}

/// The filled prompt when it fits, otherwise a condensed one built from the configuration.
fn titan_prompt(request: &GenerationRequest) -> String {
    if request.prompt.chars().count() <= TITAN_MAX_PROMPT_CHARS {
        return request.prompt.clone();
    }
    log::debug!(
        "Prompt has {} characters, condensing it for Titan",
        request.prompt.chars().count()
    );
    pack_lines(&condensed_lines(&request.config), TITAN_MAX_PROMPT_CHARS)
}

/// Most important first: later lines are the first to be dropped.
fn condensed_lines(config: &Configuration) -> Vec<String> {
    let watermark = if config.remove_watermark {
        "No watermark or text anywhere.".to_string()
    } else {
        "Small \"Studiogen\" watermark in the bottom-right corner, about 50% opacity.".to_string()
    };
    let extra = config.extra_instructions.trim();

    let mut lines = vec![
        "Professional studio portrait of the same person; keep the face, hairstyle and body proportions unchanged.".to_string(),
        format!("Pose: {}.", config.pose_style),
        format!("Background: {}, realistic with consistent lighting.", config.background_style),
        format!("Aspect ratio {}, never crop the head.", config.aspect_ratio),
        watermark,
    ];
    if extra.is_empty() {
        lines.push(NO_EXTRA_INSTRUCTIONS.to_string());
    } else {
        lines.push(format!("Extra instructions: {}", extra));
    }
    lines.push("Soft key light, natural skin tone, realistic skin texture, no cartoon effects.".to_string());
    lines
}

/// Joins whole lines up to `limit` characters; a line that does not fit is skipped, never cut.
fn pack_lines(lines: &[String], limit: usize) -> String {
    let mut packed = String::new();
    let mut used = 0;
    for line in lines {
        let cost = line.chars().count() + usize::from(!packed.is_empty());
        if used + cost > limit {
            log::warn!(
                "Dropping prompt line for Titan ({} chars over budget): {}",
                used + cost - limit,
                line.chars().take(60).collect::<String>()
            );
            continue;
        }
        if !packed.is_empty() {
            packed.push('\n');
        }
        packed.push_str(line);
        used += cost;
    }
    packed
}

/// Closest sizes Titan supports for each ratio.
fn titan_dimensions(aspect_ratio: AspectRatio) -> (u32, u32) {
    match aspect_ratio {
        AspectRatio::Square => (1024, 1024),
        AspectRatio::Portrait => (896, 1152),
        AspectRatio::Story => (768, 1408),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceImage;
    use crate::prompt::PromptTemplate;

    fn request(config: Configuration) -> GenerationRequest {
        GenerationRequest {
            image: SourceImage::new(vec![1, 2, 3], "image/png"),
            prompt: PromptTemplate::studio().build(&config),
            config,
        }
    }

    #[test]
    fn test_variation_payload() {
        let payload = build_payload(&request(Configuration::new()));
        assert_eq!(payload["taskType"], "IMAGE_VARIATION");
        assert_eq!(payload["imageVariationParams"]["images"][0], "AQID");
        assert_eq!(payload["imageGenerationConfig"]["width"], 896);
        assert_eq!(payload["imageGenerationConfig"]["height"], 1152);
    }

    #[test]
    fn test_short_prompt_is_sent_unchanged() {
        let mut request = request(Configuration::new());
        request.prompt = "studio portrait, grey backdrop".into();
        assert_eq!(titan_prompt(&request), "studio portrait, grey backdrop");
    }

    #[test]
    fn test_long_prompt_keeps_every_parameter_whole() {
        let config = Configuration::new()
            .with_pose("Arms crossed, confident")
            .with_background("Dark charcoal studio wall")
            .with_aspect_ratio(AspectRatio::Story)
            .with_extra_instructions("Navy blazer, no tie")
            .with_remove_watermark(true);
        let request = request(config);
        assert!(request.prompt.chars().count() > TITAN_MAX_PROMPT_CHARS);

        let text = titan_prompt(&request);
        assert!(text.chars().count() <= TITAN_MAX_PROMPT_CHARS);
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines.contains(&"Pose: Arms crossed, confident."));
        assert!(lines.contains(&"Background: Dark charcoal studio wall, realistic with consistent lighting."));
        assert!(lines.contains(&"Aspect ratio 9:16, never crop the head."));
        assert!(lines.contains(&"No watermark or text anywhere."));
        assert!(lines.contains(&"Extra instructions: Navy blazer, no tie"));
    }

    #[test]
    fn test_oversized_line_is_dropped_not_cut() {
        let config = Configuration::new()
            .with_extra_instructions("x".repeat(600))
            .with_remove_watermark(false);
        let text = titan_prompt(&request(config));

        assert!(text.chars().count() <= TITAN_MAX_PROMPT_CHARS);
        assert!(!text.contains(&"x".repeat(10)));
        assert!(text.contains("Aspect ratio 4:5, never crop the head."));
        assert!(text.contains("\"Studiogen\" watermark"));
        assert!(text.lines().all(|line| line.ends_with('.')));
    }

    #[test]
    fn test_pack_lines_respects_limit() {
        let lines = vec!["aaaa".to_string(), "bbbbbbbb".to_string(), "cc".to_string()];
        assert_eq!(pack_lines(&lines, 10), "aaaa\ncc");
        assert_eq!(pack_lines(&lines, 100), "aaaa\nbbbbbbbb\ncc");
    }

    #[tokio::test]
    async fn test_missing_credentials_provider_is_precondition_failure() {
        let err = resolve_credentials(None).await.unwrap_err();
        assert!(matches!(err, StudioError::InvalidPrecondition(_)));
    }

    #[tokio::test]
    async fn test_static_credentials_resolve() {
        let provider = SharedCredentialsProvider::new(
            aws_sdk_bedrockruntime::config::Credentials::new("id", "secret", None, None, "test"),
        );
        assert!(resolve_credentials(Some(provider)).await.is_ok());
    }

    #[test]
    fn test_titan_response_parsing() {
        let response: TitanImageResponse =
            serde_json::from_str(r#"{"images":["AQ==","Ag=="],"error":null}"#).unwrap();
        assert_eq!(response.images.len(), 2);
        assert!(response.error.is_none());
    }
}
