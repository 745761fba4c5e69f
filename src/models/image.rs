use super::Configuration;
use crate::error::{Result, StudioError};
use serde::Serialize;
use std::io::Cursor;
use std::path::Path;

pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const MIN_UPLOAD_DIMENSION: u32 = 512;
pub const ACCEPTED_UPLOAD_TYPES: [&str; 2] = ["image/png", "image/jpeg"];
pub const DEFAULT_IMAGE_MIME: &str = "image/png";

/// The user's portrait, as uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    pub data: Vec<u8>,
    pub mime_type: String,
}

impl SourceImage {
    /// Wraps bytes without any checks.
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
        }
    }

    /// Validates an uploaded file: at most 10MB, PNG or JPEG, at least 512x512.
    ///
    /// The media type is sniffed from the content; `declared_mime` is only
    /// used when sniffing fails, and is still checked against the accepted list.
    pub fn from_upload(data: Vec<u8>, declared_mime: Option<&str>) -> Result<Self> {
        if data.is_empty() {
            return Err(StudioError::InvalidUpload("The file is empty.".into()));
        }
        if data.len() > MAX_UPLOAD_BYTES {
            return Err(StudioError::InvalidUpload(
                "The file must be at most 10MB.".into(),
            ));
        }

        let mime_type = detect_mime_type(&data)
            .or_else(|| declared_mime.map(normalize_mime_type))
            .ok_or_else(|| StudioError::InvalidUpload("Not a valid image file.".into()))?;

        if !ACCEPTED_UPLOAD_TYPES.contains(&mime_type.as_str()) {
            return Err(StudioError::InvalidUpload(format!(
                "Unsupported image type {}, use PNG or JPG.",
                mime_type
            )));
        }

        let (width, height) = image::ImageReader::new(Cursor::new(&data))
            .with_guessed_format()
            .map_err(|_| StudioError::InvalidUpload("Not a valid image file.".into()))?
            .into_dimensions()
            .map_err(|_| StudioError::InvalidUpload("Not a valid image file.".into()))?;

        if width < MIN_UPLOAD_DIMENSION || height < MIN_UPLOAD_DIMENSION {
            return Err(StudioError::InvalidUpload(format!(
                "The image must be at least {0}x{0} pixels (got {1}x{2}).",
                MIN_UPLOAD_DIMENSION, width, height
            )));
        }

        log::debug!(
            "Accepted upload: {} bytes, {}, {}x{}",
            data.len(),
            mime_type,
            width,
            height
        );

        Ok(Self { data, mime_type })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        Self::from_upload(data, None)
    }
}

/// One image returned by a single generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub data: Vec<u8>,
    pub mime_type: Option<String>,
}

impl ImagePayload {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            mime_type: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Declared type, then sniffed type, then PNG.
    pub fn resolved_mime_type(&self) -> String {
        self.mime_type
            .as_deref()
            .map(normalize_mime_type)
            .or_else(|| detect_mime_type(&self.data))
            .unwrap_or_else(|| DEFAULT_IMAGE_MIME.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedImage {
    #[serde(skip)]
    pub data: Vec<u8>,
    pub file_name: String,
    pub mime_type: String,
}

/// The payload shared by every call of a batch.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub image: SourceImage,
    pub prompt: String,
    /// The style the prompt was filled from.
    pub config: Configuration,
}

pub fn detect_mime_type(data: &[u8]) -> Option<String> {
    infer::get(data)
        .filter(|kind| kind.matcher_type() == infer::MatcherType::Image)
        .map(|kind| kind.mime_type().to_string())
}

fn normalize_mime_type(mime_type: &str) -> String {
    match mime_type.trim().to_ascii_lowercase().as_str() {
        "image/jpg" | "image/pjpeg" => "image/jpeg".to_string(),
        other => other.to_string(),
    }
}

pub fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type {
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        _ => "png",
    }
}
