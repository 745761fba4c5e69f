//! Batch generation: one prompt, `fan_out` concurrent calls, one flattened result.

use crate::{
    config::BatchPolicy,
    error::{Result, StudioError},
    logger,
    models::{
        extension_for_mime, BatchOutcome, CallFailure, CallFailureKind, Configuration,
        GeneratedImage, GenerationRequest, ImagePayload, SourceImage,
    },
    prompt::PromptTemplate,
    service::ImageGenerationService,
};
use chrono::{DateTime, Utc};
use futures::{future::join_all, FutureExt};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::time::{timeout_at, Instant};
use uuid::Uuid;

type CallResult = std::result::Result<Vec<ImagePayload>, CallFailureKind>;

#[derive(Clone)]
pub struct BatchOrchestrator {
    service: Arc<dyn ImageGenerationService>,
    template: PromptTemplate,
    policy: BatchPolicy,
}

impl BatchOrchestrator {
    pub fn new(service: Arc<dyn ImageGenerationService>) -> Self {
        Self {
            service,
            template: PromptTemplate::studio(),
            policy: BatchPolicy::default(),
        }
    }

    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn with_policy(mut self, policy: BatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn template(&self) -> &PromptTemplate {
        &self.template
    }

    pub fn policy(&self) -> &BatchPolicy {
        &self.policy
    }

    pub async fn generate(
        &self,
        image: Option<&SourceImage>,
        config: &Configuration,
    ) -> Result<BatchOutcome> {
        run_batch(
            self.service.as_ref(),
            &self.template,
            &self.policy,
            image,
            config,
        )
        .await
    }
}

/// One batch with the built-in template and the default policy.
pub async fn generate(
    image: Option<&SourceImage>,
    config: &Configuration,
    service: &dyn ImageGenerationService,
) -> Result<BatchOutcome> {
    run_batch(
        service,
        &PromptTemplate::studio(),
        &BatchPolicy::default(),
        image,
        config,
    )
    .await
}

async fn run_batch(
    service: &dyn ImageGenerationService,
    template: &PromptTemplate,
    policy: &BatchPolicy,
    image: Option<&SourceImage>,
    config: &Configuration,
) -> Result<BatchOutcome> {
    let image = match image {
        Some(image) if !image.data.is_empty() => image,
        _ => {
            return Err(StudioError::InvalidPrecondition(
                "No source image supplied".into(),
            ))
        }
    };
    service.ensure_ready().map_err(|e| match e {
        StudioError::InvalidPrecondition(_) => e,
        other => StudioError::InvalidPrecondition(other.to_string()),
    })?;

    let batch_id = Uuid::new_v4().to_string();
    let fan_out = policy.fan_out.max(1);
    let request = GenerationRequest {
        image: image.clone(),
        prompt: template.build(config),
        config: config.clone(),
    };

    log::info!(
        "Starting batch {} on {}: {} calls, pose '{}', background '{}', ratio {}",
        batch_id,
        service.name(),
        fan_out,
        config.pose_style,
        config.background_style,
        config.aspect_ratio
    );
    let _timer = logger::timer(&format!("batch {}", batch_id));

    let deadline = call_deadline(policy, Instant::now());
    let calls = (0..fan_out).map(|index| run_call(service, &request, index, deadline));
    let results = join_all(calls).await;

    let generated_at = Utc::now();
    let (images, failures) = collect_results(results, generated_at);

    for failure in &failures {
        log::warn!("Batch {}: {}", batch_id, failure);
    }

    if images.is_empty() {
        log::error!("Batch {} produced no images", batch_id);
        return Err(StudioError::NoImagesProduced { failures });
    }

    log::info!(
        "Batch {} produced {} image(s) from {} call(s), {} without images",
        batch_id,
        images.len(),
        fan_out,
        failures.len()
    );

    Ok(BatchOutcome {
        batch_id,
        images,
        failures,
        generated_at,
    })
}

/// Earlier of the per-call timeout and the batch deadline, both counted from `started`.
fn call_deadline(policy: &BatchPolicy, started: Instant) -> Option<Instant> {
    let per_call = policy.call_timeout.map(|timeout| started + timeout);
    let batch = policy.batch_deadline.map(|deadline| started + deadline);
    match (per_call, batch) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

async fn run_call(
    service: &dyn ImageGenerationService,
    request: &GenerationRequest,
    index: usize,
    deadline: Option<Instant>,
) -> CallResult {
    // A panicking backend fails only its own call.
    let call = AssertUnwindSafe(service.submit(request)).catch_unwind();
    let result = match deadline {
        Some(deadline) => match timeout_at(deadline, call).await {
            Ok(result) => result,
            Err(_) => return Err(CallFailureKind::TimedOut),
        },
        None => call.await,
    };

    match result {
        Ok(Ok(images)) => {
            log::debug!("Call #{} returned {} image(s)", index, images.len());
            Ok(images)
        }
        Ok(Err(e)) => Err(CallFailureKind::Service(e.to_string())),
        Err(panic) => Err(CallFailureKind::Service(format!(
            "service panicked: {}",
            panic_message(panic.as_ref())
        ))),
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// Flattens per-call results in submission order and names every image.
fn collect_results(
    results: Vec<CallResult>,
    generated_at: DateTime<Utc>,
) -> (Vec<GeneratedImage>, Vec<CallFailure>) {
    let stamp = generated_at.timestamp_millis();
    let mut images = Vec::new();
    let mut failures = Vec::new();

    for (call_index, result) in results.into_iter().enumerate() {
        match result {
            Ok(payloads) if payloads.is_empty() => {
                failures.push(CallFailure::new(call_index, CallFailureKind::Empty))
            }
            Ok(payloads) => {
                for payload in payloads {
                    let mime_type = payload.resolved_mime_type();
                    let file_name = format!(
                        "studio_{}_v{}.{}",
                        stamp,
                        images.len() + 1,
                        extension_for_mime(&mime_type)
                    );
                    images.push(GeneratedImage {
                        data: payload.data,
                        file_name,
                        mime_type,
                    });
                }
            }
            Err(kind) => failures.push(CallFailure::new(call_index, kind)),
        }
    }

    (images, failures)
}
