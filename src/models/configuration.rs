use crate::error::{Result, StudioError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const POSE_OPTIONS: [&str; 10] = [
    "Sitting casual",
    "Standing confident",
    "Cross-arms executive",
    "Hands in pockets",
    "Seated angled to camera",
    "Looking over shoulder",
    "Three-quarter turn",
    "Headshot neutral",
    "Leaning on desk",
    "Hands clasped front",
];

pub const BACKGROUND_OPTIONS: [&str; 10] = [
    "Office minimal",
    "Studio seamless gray",
    "Wood interior (Japanese)",
    "Outdoor garden bokeh",
    "White backdrop",
    "Concrete modern wall",
    "Library",
    "Warm cafe",
    "Corporate glass office",
    "Soft gradient",
];

pub const ASPECT_RATIO_OPTIONS: [AspectRatio; 3] = [
    AspectRatio::Square,
    AspectRatio::Portrait,
    AspectRatio::Story,
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    Square,
    #[default]
    #[serde(rename = "4:5")]
    Portrait,
    #[serde(rename = "9:16")]
    Story,
}

impl AspectRatio {
    /// The literal ratio token, e.g. `"4:5"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Portrait => "4:5",
            AspectRatio::Story => "9:16",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = StudioError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "1:1" => Ok(AspectRatio::Square),
            "4:5" => Ok(AspectRatio::Portrait),
            "9:16" => Ok(AspectRatio::Story),
            other => Err(StudioError::ConfigError(format!(
                "Unsupported aspect ratio '{}', expected one of 1:1, 4:5, 9:16",
                other
            ))),
        }
    }
}

/// Style choices for one generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    pub pose_style: String,
    pub background_style: String,
    pub aspect_ratio: AspectRatio,
    #[serde(default)]
    pub extra_instructions: String,
    pub remove_watermark: bool,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            pose_style: POSE_OPTIONS[0].to_string(),
            background_style: BACKGROUND_OPTIONS[0].to_string(),
            aspect_ratio: AspectRatio::default(),
            extra_instructions: String::new(),
            remove_watermark: false,
        }
    }
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pose(mut self, pose_style: impl Into<String>) -> Self {
        self.pose_style = pose_style.into();
        self
    }

    pub fn with_background(mut self, background_style: impl Into<String>) -> Self {
        self.background_style = background_style.into();
        self
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: AspectRatio) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    pub fn with_extra_instructions(mut self, extra_instructions: impl Into<String>) -> Self {
        self.extra_instructions = extra_instructions.into();
        self
    }

    pub fn with_remove_watermark(mut self, remove_watermark: bool) -> Self {
        self.remove_watermark = remove_watermark;
        self
    }
}
