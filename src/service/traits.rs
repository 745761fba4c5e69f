use crate::{
    error::Result,
    models::{GenerationRequest, ImagePayload},
};
use async_trait::async_trait;

/// An external image generator: one image plus a prompt in, zero or more images out.
///
/// Implementations must tolerate concurrent `submit` calls on a shared instance.
#[async_trait]
pub trait ImageGenerationService: Send + Sync {
    fn name(&self) -> &str;

    /// Checked once per batch before any call is made.
    fn ensure_ready(&self) -> Result<()> {
        Ok(())
    }

    async fn submit(&self, request: &GenerationRequest) -> Result<Vec<ImagePayload>>;
}
