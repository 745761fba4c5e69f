use std::env;
use studiogen::{
    logger::{self, LoggerConfig},
    AspectRatio, Configuration, SourceImage, StudioClient, StudioConfig, StudioError,
};

const USAGE: &str =
    "usage: studiogen <image-path> [pose] [background] [aspect-ratio] [extra instructions]";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dotenv_loaded = dotenv::dotenv().is_ok();

    logger::init_with_config(LoggerConfig::development())?;

    if dotenv_loaded {
        log::info!("✅ .env file loaded successfully");
    } else {
        log::warn!("⚠️  No .env file found, using system environment variables");
    }

    let mut args = env::args().skip(1);
    let Some(image_path) = args.next() else {
        log::error!("❌ {}", USAGE);
        return Err(USAGE.into());
    };

    let mut config = Configuration::default();
    if let Some(pose) = args.next() {
        config = config.with_pose(pose);
    }
    if let Some(background) = args.next() {
        config = config.with_background(background);
    }
    if let Some(ratio) = args.next() {
        config = config.with_aspect_ratio(ratio.parse::<AspectRatio>()?);
    }
    let extra: Vec<String> = args.collect();
    if !extra.is_empty() {
        config = config.with_extra_instructions(extra.join(" "));
    }
    config = config.with_remove_watermark(
        env::var("STUDIO_REMOVE_WATERMARK").map_or(false, |v| v == "true"),
    );

    let source = match SourceImage::from_path(&image_path) {
        Ok(source) => source,
        Err(e) => {
            log::error!("❌ {}: {}", image_path, e);
            return Err(e.into());
        }
    };
    log::info!(
        "🖼️  Source image: {} ({}, {} bytes)",
        image_path,
        source.mime_type,
        source.data.len()
    );

    let studio_config = StudioConfig::from_env()?;
    logger::log_config_info(&studio_config);

    log::info!("🔄 Connecting to image generation service...");
    let client = match StudioClient::new(studio_config).await {
        Ok(client) => client,
        Err(e) => {
            log::error!("❌ Failed to initialize image service: {}", e);
            return Err(e.into());
        }
    };

    log::debug!("📝 Prompt:\n{}", client.prompt_preview(&config));

    log::info!("🎨 Generating studio photos...");
    let outcome = match client.generate(Some(&source), &config).await {
        Ok(outcome) => outcome,
        Err(StudioError::NoImagesProduced { failures }) => {
            for failure in &failures {
                log::warn!("   {}", failure);
            }
            log::error!("❌ {}", studiogen::error::NO_IMAGES_MESSAGE);
            return Err(StudioError::NoImagesProduced { failures }.into());
        }
        Err(e) => {
            log::error!("❌ Generation failed: {}", e);
            return Err(e.into());
        }
    };

    for image in &outcome.images {
        log::info!("✅ {} ({} bytes)", image.file_name, image.data.len());
    }
    if outcome.is_partial() {
        log::warn!(
            "⚠️  {} call(s) produced nothing, keeping the {} image(s) that came back",
            outcome.failures.len(),
            outcome.images.len()
        );
    }

    match client.package(&outcome, &config) {
        Ok(archive) => {
            let path = archive.write_to(env::current_dir()?)?;
            log::info!("📦 Archive saved to {}", path.display());
        }
        Err(e) => {
            log::error!("❌ {}", e);
            for image in &outcome.images {
                std::fs::write(&image.file_name, &image.data)?;
            }
            log::info!("💾 Saved {} image(s) individually instead", outcome.images.len());
        }
    }

    Ok(())
}
