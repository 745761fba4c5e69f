use crate::{
    error::{Result, StudioError},
    models::{Configuration, GeneratedImage},
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

pub const METADATA_FILE_NAME: &str = "metadata.json";

/// A packaged batch, ready to be offered as a download.
#[derive(Debug, Clone)]
pub struct Archive {
    pub file_name: String,
    pub data: Vec<u8>,
}

impl Archive {
    pub fn write_to(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let path = dir.as_ref().join(&self.file_name);
        std::fs::write(&path, &self.data)
            .map_err(|e| StudioError::PackagingFailure(format!("{}: {}", path.display(), e)))?;
        Ok(path)
    }
}

pub trait ArchivePackager: Send + Sync {
    fn package(
        &self,
        images: &[GeneratedImage],
        config: &Configuration,
        generated_at: DateTime<Utc>,
    ) -> Result<Archive>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ArchiveMetadata<'a> {
    #[serde(flatten)]
    config: &'a Configuration,
    generation_timestamp: String,
    files: Vec<&'a str>,
}

/// One zip entry per image plus `metadata.json`.
#[derive(Debug, Clone, Default)]
pub struct ZipArchivePackager;

impl ZipArchivePackager {
    pub fn new() -> Self {
        Self
    }
}

impl ArchivePackager for ZipArchivePackager {
    fn package(
        &self,
        images: &[GeneratedImage],
        config: &Configuration,
        generated_at: DateTime<Utc>,
    ) -> Result<Archive> {
        if images.is_empty() {
            return Err(StudioError::PackagingFailure("No images to package".into()));
        }

        let metadata = ArchiveMetadata {
            config,
            generation_timestamp: generated_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            files: images.iter().map(|image| image.file_name.as_str()).collect(),
        };
        let metadata_json = serde_json::to_vec_pretty(&metadata)
            .map_err(|e| StudioError::SerializationError(e.to_string()))?;

        let data = write_zip(images, &metadata_json)
            .map_err(|e| StudioError::PackagingFailure(e.to_string()))?;

        let file_name = format!("studio_photos_{}.zip", Utc::now().timestamp_millis());
        log::info!(
            "Packaged {} image(s) into {} ({} bytes)",
            images.len(),
            file_name,
            data.len()
        );

        Ok(Archive { file_name, data })
    }
}

fn entry_options(method: CompressionMethod) -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(method)
}

fn write_zip(
    images: &[GeneratedImage],
    metadata_json: &[u8],
) -> std::result::Result<Vec<u8>, Box<dyn std::error::Error>> {
    let mut names = HashSet::new();
    for image in images {
        if image.file_name == METADATA_FILE_NAME || !names.insert(image.file_name.as_str()) {
            return Err(format!("Duplicate entry name {}", image.file_name).into());
        }
    }

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for image in images {
        // Generated images are already compressed.
        writer.start_file(image.file_name.as_str(), entry_options(CompressionMethod::Stored))?;
        writer.write_all(&image.data)?;
    }
    writer.start_file(METADATA_FILE_NAME, entry_options(CompressionMethod::Deflated))?;
    writer.write_all(metadata_json)?;

    Ok(writer.finish()?.into_inner())
}
