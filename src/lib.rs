//! Studio portrait generation.
//!
//! Fill a prompt template from a style [`Configuration`], fan the same source
//! image and prompt out to an [`ImageGenerationService`] a fixed number of
//! times, and collect every produced image into one named batch that can be
//! packaged as a zip archive.

pub mod archive;
pub mod client;
pub mod config;
pub mod error;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod prompt;
pub mod service;

pub use archive::{Archive, ArchivePackager, ZipArchivePackager};
pub use client::StudioClient;
pub use config::{
    BatchPolicy, BedrockConfig, GeminiConfig, ServiceProvider, StudioConfig, DEFAULT_FAN_OUT,
};
pub use error::{Result, StudioError};
pub use models::{
    AspectRatio, BatchOutcome, CallFailure, CallFailureKind, Configuration, GeneratedImage,
    GenerationRequest, ImagePayload, SourceImage, ASPECT_RATIO_OPTIONS, BACKGROUND_OPTIONS,
    POSE_OPTIONS,
};
pub use orchestrator::{generate, BatchOrchestrator};
pub use prompt::PromptTemplate;
pub use service::{GeminiImageService, ImageGenerationService};

#[cfg(feature = "bedrock")]
pub use service::BedrockImageService;
