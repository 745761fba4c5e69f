use crate::error::{Result, StudioError};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Number of generation calls issued per batch.
pub const DEFAULT_FAN_OUT: usize = 4;
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(90);
pub const DEFAULT_BATCH_DEADLINE: Duration = Duration::from_secs(180);

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash-image-preview";
pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_BEDROCK_IMAGE_MODEL: &str = "amazon.titan-image-generator-v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceProvider {
    Gemini,
    Bedrock,
}

impl FromStr for ServiceProvider {
    type Err = StudioError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(ServiceProvider::Gemini),
            "bedrock" => Ok(ServiceProvider::Bedrock),
            other => Err(StudioError::ConfigError(format!(
                "Unknown provider '{}', expected gemini or bedrock",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub max_attempts: usize,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        GeminiConfig {
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            endpoint: DEFAULT_GEMINI_ENDPOINT.to_string(),
            max_attempts: 2,
        }
    }
}

impl GeminiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let api_key = env::var("GEMINI_API_KEY")
            .or_else(|_| env::var("API_KEY"))
            .ok()
            .filter(|key| !key.trim().is_empty());
        let model = env::var("GEMINI_IMAGE_MODEL").unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.into());
        let endpoint = env::var("GEMINI_ENDPOINT").unwrap_or_else(|_| DEFAULT_GEMINI_ENDPOINT.into());

        GeminiConfig {
            api_key,
            model,
            endpoint,
            ..Default::default()
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }
}

#[derive(Debug, Clone)]
pub struct BedrockConfig {
    pub region: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub model_id: String,
}

impl Default for BedrockConfig {
    fn default() -> Self {
        BedrockConfig {
            region: None,
            access_key: None,
            secret_key: None,
            model_id: DEFAULT_BEDROCK_IMAGE_MODEL.to_string(),
        }
    }
}

impl BedrockConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let region = env::var("AWS_REGION")
            .or_else(|_| env::var("AWS_DEFAULT_REGION"))
            .ok();
        let access_key = env::var("AWS_ACCESS_KEY_ID").ok();
        let secret_key = env::var("AWS_SECRET_ACCESS_KEY").ok();
        let model_id =
            env::var("BEDROCK_IMAGE_MODEL").unwrap_or_else(|_| DEFAULT_BEDROCK_IMAGE_MODEL.into());

        BedrockConfig {
            region,
            access_key,
            secret_key,
            model_id,
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_credentials(
        mut self,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        self.access_key = Some(access_key.into());
        self.secret_key = Some(secret_key.into());
        self
    }

    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }
}

/// Fan-out size and time limits for one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPolicy {
    pub fan_out: usize,
    pub call_timeout: Option<Duration>,
    pub batch_deadline: Option<Duration>,
}

impl Default for BatchPolicy {
    fn default() -> Self {
        BatchPolicy {
            fan_out: DEFAULT_FAN_OUT,
            call_timeout: Some(DEFAULT_CALL_TIMEOUT),
            batch_deadline: Some(DEFAULT_BATCH_DEADLINE),
        }
    }
}

impl BatchPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        let fan_out = env::var("STUDIO_FAN_OUT")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(defaults.fan_out);
        let call_timeout = env::var("STUDIO_CALL_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .or(defaults.call_timeout);
        let batch_deadline = env::var("STUDIO_BATCH_DEADLINE_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .or(defaults.batch_deadline);

        BatchPolicy {
            fan_out,
            call_timeout,
            batch_deadline,
        }
    }

    pub fn with_fan_out(mut self, fan_out: usize) -> Self {
        self.fan_out = fan_out.max(1);
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    pub fn with_batch_deadline(mut self, deadline: Duration) -> Self {
        self.batch_deadline = Some(deadline);
        self
    }

    /// Lets every call run until the service gives up on its own.
    pub fn without_limits(mut self) -> Self {
        self.call_timeout = None;
        self.batch_deadline = None;
        self
    }
}

#[derive(Debug, Clone)]
pub struct StudioConfig {
    pub provider: ServiceProvider,
    pub gemini: GeminiConfig,
    pub bedrock: BedrockConfig,
    pub policy: BatchPolicy,
}

impl Default for StudioConfig {
    fn default() -> Self {
        StudioConfig {
            provider: ServiceProvider::Gemini,
            gemini: GeminiConfig::default(),
            bedrock: BedrockConfig::default(),
            policy: BatchPolicy::default(),
        }
    }
}

impl StudioConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Result<Self> {
        let provider = match env::var("STUDIO_PROVIDER") {
            Ok(value) => value.parse()?,
            Err(_) => ServiceProvider::Gemini,
        };

        Ok(StudioConfig {
            provider,
            gemini: GeminiConfig::from_env(),
            bedrock: BedrockConfig::from_env(),
            policy: BatchPolicy::from_env(),
        })
    }

    pub fn with_gemini(mut self, config: GeminiConfig) -> Self {
        self.gemini = config;
        self.provider = ServiceProvider::Gemini;
        self
    }

    pub fn with_bedrock(mut self, config: BedrockConfig) -> Self {
        self.bedrock = config;
        self.provider = ServiceProvider::Bedrock;
        self
    }

    pub fn with_policy(mut self, policy: BatchPolicy) -> Self {
        self.policy = policy;
        self
    }
}
