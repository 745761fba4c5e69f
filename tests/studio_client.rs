use async_trait::async_trait;
use std::io::{Cursor, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use studiogen::{
    AspectRatio, BatchPolicy, Configuration, GenerationRequest, ImageGenerationService,
    ImagePayload, SourceImage, StudioClient, StudioError, Result,
};

/// Returns `per_call` PNG-tagged payloads, failing on the listed call indexes.
struct StubService {
    per_call: usize,
    failing_calls: Vec<usize>,
    calls: AtomicUsize,
}

impl StubService {
    fn new(per_call: usize, failing_calls: Vec<usize>) -> Arc<Self> {
        Arc::new(Self {
            per_call,
            failing_calls,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ImageGenerationService for StubService {
    fn name(&self) -> &str {
        "stub"
    }

    async fn submit(&self, request: &GenerationRequest) -> Result<Vec<ImagePayload>> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(request.prompt.contains(request.config.aspect_ratio.as_str()));
        tokio::time::sleep(Duration::from_millis(5 * (4 - index as u64 % 4))).await;
        if self.failing_calls.contains(&index) {
            return Err(StudioError::ResponseError(format!("call {} rejected", index)));
        }
        Ok((0..self.per_call)
            .map(|n| ImagePayload::new(vec![index as u8, n as u8]).with_mime_type("image/png"))
            .collect())
    }
}

fn source() -> SourceImage {
    SourceImage::new(vec![0xff, 0xd8, 0xff, 0xe0], "image/jpeg")
}

#[tokio::test]
async fn generate_and_package_a_full_batch() {
    let service = StubService::new(1, vec![]);
    let client = StudioClient::with_service(service.clone());
    let config = Configuration::new()
        .with_pose("Headshot neutral")
        .with_background("Soft gradient")
        .with_aspect_ratio(AspectRatio::Square);

    let outcome = client.generate(Some(&source()), &config).await.unwrap();
    assert_eq!(service.calls.load(Ordering::SeqCst), 4);
    assert_eq!(outcome.images.len(), 4);

    let prefix = format!("studio_{}_v", outcome.generated_at.timestamp_millis());
    let names: Vec<&str> = outcome.images.iter().map(|i| i.file_name.as_str()).collect();
    assert_eq!(
        names,
        (1..=4)
            .map(|n| format!("{}{}.png", prefix, n))
            .collect::<Vec<_>>()
    );

    let archive = client.package(&outcome, &config).unwrap();
    let mut zip = zip::ZipArchive::new(Cursor::new(archive.data)).unwrap();
    assert_eq!(zip.len(), 5);

    let mut metadata = String::new();
    zip.by_name("metadata.json")
        .unwrap()
        .read_to_string(&mut metadata)
        .unwrap();
    let metadata: serde_json::Value = serde_json::from_str(&metadata).unwrap();
    assert_eq!(metadata["poseStyle"], "Headshot neutral");
    assert_eq!(metadata["backgroundStyle"], "Soft gradient");
    assert_eq!(metadata["aspectRatio"], "1:1");
    assert!(metadata["generationTimestamp"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn partial_batch_keeps_surviving_images_in_order() {
    let service = StubService::new(2, vec![0, 1, 3]);
    let client = StudioClient::with_service(service);

    let outcome = client
        .generate(Some(&source()), &Configuration::default())
        .await
        .unwrap();

    assert_eq!(outcome.images.len(), 2);
    assert_eq!(outcome.images[0].data, vec![2, 0]);
    assert_eq!(outcome.images[1].data, vec![2, 1]);
    assert_eq!(outcome.failures.len(), 3);
}

#[tokio::test]
async fn empty_batch_reports_no_images() {
    let client = StudioClient::with_service(StubService::new(0, vec![1]));

    let err = client
        .generate(Some(&source()), &Configuration::default())
        .await
        .unwrap_err();

    assert!(err.is_retryable());
    match err {
        StudioError::NoImagesProduced { failures } => assert_eq!(failures.len(), 4),
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn missing_source_image_is_rejected_before_any_call() {
    let service = StubService::new(1, vec![]);
    let client = StudioClient::with_service(service.clone())
        .with_policy(BatchPolicy::new().with_fan_out(6));

    let err = client
        .generate(None, &Configuration::default())
        .await
        .unwrap_err();

    assert!(matches!(err, StudioError::InvalidPrecondition(_)));
    assert_eq!(service.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn prompt_preview_is_fully_filled() {
    let client = StudioClient::with_service(StubService::new(1, vec![]));
    let preview = client.prompt_preview(&Configuration::default());
    assert!(!preview.contains("{{"));
    assert!(preview.contains("No additional instructions."));
    assert!(preview.contains("remove_watermark = false"));
}
