#[cfg(feature = "bedrock")]
pub mod bedrock;
pub mod gemini;
pub mod traits;

use crate::{
    config::{ServiceProvider, StudioConfig},
    error::Result,
};
use std::sync::Arc;

#[cfg(feature = "bedrock")]
pub use bedrock::BedrockImageService;
pub use gemini::GeminiImageService;
pub use traits::ImageGenerationService;

/// Builds the configured provider; a missing credential is an `InvalidPrecondition`.
pub async fn connect(config: &StudioConfig) -> Result<Arc<dyn ImageGenerationService>> {
    let service: Arc<dyn ImageGenerationService> = match config.provider {
        ServiceProvider::Gemini => Arc::new(GeminiImageService::new(config.gemini.clone())?),
        ServiceProvider::Bedrock => {
            #[cfg(feature = "bedrock")]
            {
                Arc::new(BedrockImageService::new(config.bedrock.clone()).await?)
            }
            #[cfg(not(feature = "bedrock"))]
            {
                return Err(crate::error::StudioError::ConfigError(
                    "Bedrock feature not enabled".into(),
                ));
            }
        }
    };

    log::info!("Image generation service ready: {}", service.name());
    Ok(service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeminiConfig;
    use crate::error::StudioError;

    #[tokio::test]
    async fn test_connect_without_gemini_key_fails_fast() {
        let config = StudioConfig::new().with_gemini(GeminiConfig::new());
        let err = connect(&config).await.err().unwrap();
        assert!(matches!(err, StudioError::InvalidPrecondition(_)));
    }

    #[tokio::test]
    async fn test_connect_gemini() {
        let config = StudioConfig::new().with_gemini(GeminiConfig::new().with_api_key("key"));
        let service = connect(&config).await.unwrap();
        assert_eq!(service.name(), "gemini");
    }
}
