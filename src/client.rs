use crate::{
    archive::{Archive, ArchivePackager, ZipArchivePackager},
    config::{BatchPolicy, StudioConfig},
    error::Result,
    models::{BatchOutcome, Configuration, SourceImage},
    orchestrator::BatchOrchestrator,
    prompt::PromptTemplate,
    service::{self, ImageGenerationService},
};
use std::sync::Arc;

/// Connected service, orchestrator and packager behind one handle.
#[derive(Clone)]
pub struct StudioClient {
    orchestrator: BatchOrchestrator,
    packager: Arc<dyn ArchivePackager>,
}

impl StudioClient {
    pub async fn new(config: StudioConfig) -> Result<Self> {
        let service = service::connect(&config).await?;
        Ok(Self::with_service(service).with_policy(config.policy))
    }

    pub fn with_service(service: Arc<dyn ImageGenerationService>) -> Self {
        Self {
            orchestrator: BatchOrchestrator::new(service),
            packager: Arc::new(ZipArchivePackager::new()),
        }
    }

    pub fn with_policy(mut self, policy: BatchPolicy) -> Self {
        self.orchestrator = self.orchestrator.with_policy(policy);
        self
    }

    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.orchestrator = self.orchestrator.with_template(template);
        self
    }

    pub fn with_packager(mut self, packager: Arc<dyn ArchivePackager>) -> Self {
        self.packager = packager;
        self
    }

    pub fn orchestrator(&self) -> &BatchOrchestrator {
        &self.orchestrator
    }

    /// The filled prompt the next batch would send.
    pub fn prompt_preview(&self, config: &Configuration) -> String {
        self.orchestrator.template().build(config)
    }

    pub async fn generate(
        &self,
        image: Option<&SourceImage>,
        config: &Configuration,
    ) -> Result<BatchOutcome> {
        self.orchestrator.generate(image, config).await
    }

    pub fn package(&self, outcome: &BatchOutcome, config: &Configuration) -> Result<Archive> {
        self.packager
            .package(&outcome.images, config, outcome.generated_at)
    }
}
