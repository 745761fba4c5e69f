//! Console logger behind the `log` facade.
//!
//! Colored single-line output for development, JSON lines for production, and
//! an optional append-only file sink.

use crate::error::{Result, StudioError};
use chrono::{DateTime, Utc};
use colored::*;
use log::{Level, LevelFilter, Metadata, Record};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::sync::{Mutex, RwLock};
use std::time::{Duration, Instant};

static STUDIO_LOGGER: Lazy<StudioLogger> = Lazy::new(StudioLogger::new);

pub fn init() -> Result<()> {
    init_with_config(LoggerConfig::default())
}

pub fn init_with_config(config: LoggerConfig) -> Result<()> {
    let max_level = config.min_level;
    STUDIO_LOGGER.configure(config)?;

    log::set_logger(&*STUDIO_LOGGER)
        .map_err(|e| StudioError::ConfigError(format!("Failed to set logger: {}", e)))?;
    log::set_max_level(max_level);
    Ok(())
}

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub min_level: LevelFilter,
    pub show_colors: bool,
    pub show_emojis: bool,
    pub show_target: bool,
    pub show_file_location: bool,
    pub timestamp_format: String,
    pub output_json: bool,
    pub log_file_path: Option<String>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LevelFilter::Info,
            show_colors: true,
            show_emojis: true,
            show_target: true,
            show_file_location: false,
            timestamp_format: "%Y-%m-%d %H:%M:%S%.3f".to_string(),
            output_json: false,
            log_file_path: None,
        }
    }
}

impl LoggerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: LevelFilter) -> Self {
        self.min_level = level;
        self
    }

    pub fn with_colors(mut self, enabled: bool) -> Self {
        self.show_colors = enabled;
        self
    }

    pub fn with_json_output(mut self, enabled: bool) -> Self {
        self.output_json = enabled;
        self
    }

    pub fn with_file_output(mut self, path: impl Into<String>) -> Self {
        self.log_file_path = Some(path.into());
        self
    }

    pub fn production() -> Self {
        Self {
            min_level: LevelFilter::Info,
            show_colors: false,
            show_emojis: false,
            output_json: true,
            log_file_path: Some("studiogen.log".to_string()),
            ..Default::default()
        }
    }

    pub fn development() -> Self {
        Self {
            min_level: LevelFilter::Debug,
            show_file_location: true,
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize)]
struct LogLine<'a> {
    timestamp: DateTime<Utc>,
    level: &'static str,
    target: &'a str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<String>,
}

fn level_color(level: Level) -> Color {
    match level {
        Level::Trace => Color::Cyan,
        Level::Debug => Color::Blue,
        Level::Info => Color::Green,
        Level::Warn => Color::Yellow,
        Level::Error => Color::Red,
    }
}

fn level_emoji(level: Level) -> &'static str {
    match level {
        Level::Trace => "🔍",
        Level::Debug => "🐛",
        Level::Info => "💡",
        Level::Warn => "⚠️",
        Level::Error => "❌",
    }
}

pub struct StudioLogger {
    config: RwLock<LoggerConfig>,
    file: Mutex<Option<File>>,
}

impl StudioLogger {
    fn new() -> Self {
        Self {
            config: RwLock::new(LoggerConfig::default()),
            file: Mutex::new(None),
        }
    }

    fn configure(&self, config: LoggerConfig) -> Result<()> {
        let file = match &config.log_file_path {
            Some(path) => Some(OpenOptions::new().create(true).append(true).open(path)?),
            None => None,
        };
        if let Ok(mut guard) = self.file.lock() {
            *guard = file;
        }
        if let Ok(mut guard) = self.config.write() {
            *guard = config;
        }
        Ok(())
    }

    fn format_line(&self, line: &LogLine<'_>, level: Level, config: &LoggerConfig) -> String {
        if config.output_json {
            return serde_json::to_string(line).unwrap_or_default();
        }

        let timestamp = line.timestamp.format(&config.timestamp_format).to_string();
        let label = if config.show_emojis {
            format!("{} {:<5}", level_emoji(level), line.level)
        } else {
            format!("{:<5}", line.level)
        };

        let mut output = if config.show_colors {
            format!(
                "{} [{}] ",
                timestamp.bright_black(),
                label.color(level_color(level)).bold()
            )
        } else {
            format!("{} [{}] ", timestamp, label)
        };

        if config.show_target {
            if config.show_colors {
                output.push_str(&format!("{}: ", line.target.bright_blue()));
            } else {
                output.push_str(&format!("{}: ", line.target));
            }
        }

        output.push_str(&line.message);

        if let Some(location) = &line.location {
            if config.show_colors {
                output.push_str(&format!(" ({})", location.bright_black()));
            } else {
                output.push_str(&format!(" ({})", location));
            }
        }

        output
    }
}

impl log::Log for StudioLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.config
            .read()
            .map(|config| metadata.level() <= config.min_level)
            .unwrap_or(true)
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let Ok(config) = self.config.read() else {
            return;
        };

        let line = LogLine {
            timestamp: Utc::now(),
            level: record.level().as_str(),
            target: record.target(),
            message: record.args().to_string(),
            location: config
                .show_file_location
                .then(|| {
                    record
                        .file()
                        .map(|file| format!("{}:{}", file, record.line().unwrap_or(0)))
                })
                .flatten(),
        };

        println!("{}", self.format_line(&line, record.level(), &config));

        if let Ok(mut guard) = self.file.lock() {
            if let Some(file) = guard.as_mut() {
                let plain = LoggerConfig {
                    show_colors: false,
                    show_emojis: false,
                    ..config.clone()
                };
                let _ = writeln!(file, "{}", self.format_line(&line, record.level(), &plain));
            }
        }
    }

    fn flush(&self) {
        let _ = io::stdout().flush();
        if let Ok(mut guard) = self.file.lock() {
            if let Some(file) = guard.as_mut() {
                let _ = file.flush();
            }
        }
    }
}

/// Logs how long the guarded operation took when dropped.
pub struct Timer {
    start: Instant,
    name: String,
}

impl Timer {
    pub fn new(name: &str) -> Self {
        log::debug!("⏱️  Started: {}", name);
        Self {
            start: Instant::now(),
            name: name.to_string(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        log::info!(
            "⏱️  {} finished in {}ms",
            self.name,
            self.elapsed().as_millis()
        );
    }
}

pub fn timer(name: &str) -> Timer {
    Timer::new(name)
}

/// Logs the active configuration without secrets.
pub fn log_config_info(config: &crate::config::StudioConfig) {
    log::info!("⚙️  Configuration loaded:");
    log::info!("   Provider: {:?}", config.provider);
    match config.provider {
        crate::config::ServiceProvider::Gemini => {
            log::info!("   Gemini model: {}", config.gemini.model);
            log::info!(
                "   Gemini API key: {}",
                if config.gemini.api_key.is_some() { "✅" } else { "❌" }
            );
        }
        crate::config::ServiceProvider::Bedrock => {
            log::info!("   Bedrock model: {}", config.bedrock.model_id);
            log::info!(
                "   Region: {}",
                config.bedrock.region.as_deref().unwrap_or("us-east-1")
            );
        }
    }
    log::info!("   Calls per batch: {}", config.policy.fan_out);
    if let Some(timeout) = config.policy.call_timeout {
        log::info!("   Call timeout: {}s", timeout.as_secs());
    }
    if let Some(deadline) = config.policy.batch_deadline {
        log::info!("   Batch deadline: {}s", deadline.as_secs());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_line(message: &str) -> LogLine<'static> {
        LogLine {
            timestamp: Utc::now(),
            level: "WARN",
            target: "studiogen::orchestrator",
            message: message.to_string(),
            location: None,
        }
    }

    #[test]
    fn test_logger_config_presets() {
        let dev = LoggerConfig::development();
        assert_eq!(dev.min_level, LevelFilter::Debug);
        assert!(dev.show_colors);

        let prod = LoggerConfig::production();
        assert!(!prod.show_colors);
        assert!(prod.output_json);
        assert_eq!(prod.log_file_path.as_deref(), Some("studiogen.log"));
    }

    #[test]
    fn test_plain_and_json_formats() {
        let logger = StudioLogger::new();
        let plain = LoggerConfig::new().with_colors(false);
        let plain = LoggerConfig {
            show_emojis: false,
            ..plain
        };
        let text = logger.format_line(&record_line("call #2 timed out"), Level::Warn, &plain);
        assert!(text.contains("[WARN ] studiogen::orchestrator: call #2 timed out"));

        let json = LoggerConfig::new().with_json_output(true);
        let text = logger.format_line(&record_line("hello"), Level::Warn, &json);
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["level"], "WARN");
        assert_eq!(value["message"], "hello");
    }

    #[test]
    fn test_logger_initialization() {
        assert!(init_with_config(LoggerConfig::development()).is_ok());
    }
}
