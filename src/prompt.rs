//! Prompt templating.
//!
//! A [`PromptTemplate`] is a plain string with `{{name}}` placeholders. Filling
//! it is a single pass over the template, so values taken from the
//! configuration are inserted verbatim and never re-scanned for placeholders.

use crate::error::{Result, StudioError};
use crate::models::Configuration;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::borrow::Cow;

pub const NO_EXTRA_INSTRUCTIONS: &str = "No additional instructions.";

pub const PLACEHOLDERS: [&str; 5] = [
    "pose_style",
    "background_style",
    "aspect_ratio",
    "extra_instructions",
    "remove_watermark",
];

static PLACEHOLDER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").expect("valid placeholder regex"));

pub const STUDIO_PORTRAIT_TEMPLATE: &str = r#"[STUDIO_PORTRAIT_SYSTEM_PROMPT]

ROLE:
You are a professional studio photo retoucher. Turn the uploaded photo into a clean, realistic studio portrait fit for LinkedIn or a portfolio, **without changing the subject's identity**.

INPUTS:
- The user's original photo (a single person/subject).
- Parameters:
  - pose_style = "{{pose_style}}"
  - background_style = "{{background_style}}"
  - aspect_ratio = "{{aspect_ratio}}"   # one of: 1:1 | 4:5 | 9:16
  - extra_instructions = "{{extra_instructions}}"
  - remove_watermark = {{remove_watermark}}  # true/false

REQUIREMENTS (MUST FOLLOW):
1) **Preserve the subject's face, body proportions and hairstyle** as accurately as possible (identity-preserving).
2) Clothing and expression may be lightly tidied, **no extreme makeover**.
3) Apply the pose/style: {{pose_style}}.
4) Apply the backdrop: {{background_style}}, realistic and with consistent lighting.
5) Lighting: studio-grade, soft key light + subtle fill, natural skin tone, no blown highlights.
6) Compose for aspect_ratio {{aspect_ratio}}; elegant cropping, never crop the head.
7) Gentle retouch: remove noise, minor blemishes and small flyaway hairs; **avoid over-smoothing**.
8) Natural colors; neutral white balance; soft contrast; appropriate sharpness.
9) If remove_watermark=false, add a small "Studiogen" watermark in the bottom-right corner at about 50% opacity.
10) Produce **1 version** consistent with the subject's identity.

NEGATIVE GUIDANCE:
- Do not reshape the face, alter eyes/nose/mouth, or drastically change the hair.
- Do not add conspicuous accessories (hats/glasses) unless asked.
- Avoid cartoon effects, heavy HDR, plastic skin, or unrealistic background blur.
- Do not add any text other than the watermark.

STYLE TOKENS (optional, use lightly):
- "professional portrait, studio quality, soft key light, realistic skin texture, subtle bokeh, 50mm look"

OUTPUT:
- 1 image (PNG), at least 1024 px on the longest side, aspect_ratio {{aspect_ratio}}.
"#;

/// Immutable prompt template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    text: Cow<'static, str>,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::studio()
    }
}

impl PromptTemplate {
    /// The built-in studio portrait template.
    pub fn studio() -> Self {
        Self {
            text: Cow::Borrowed(STUDIO_PORTRAIT_TEMPLATE),
        }
    }

    /// Accepts any text; unknown placeholders are left as they are.
    pub fn new(text: impl Into<Cow<'static, str>>) -> Self {
        Self { text: text.into() }
    }

    /// Like [`PromptTemplate::new`], but rejects placeholders the builder cannot fill.
    pub fn try_new(text: impl Into<Cow<'static, str>>) -> Result<Self> {
        let template = Self::new(text);
        let unknown: Vec<String> = template
            .placeholders()
            .into_iter()
            .filter(|name| !PLACEHOLDERS.contains(&name.as_str()))
            .collect();
        if !unknown.is_empty() {
            return Err(StudioError::ConfigError(format!(
                "Unknown prompt placeholders: {}",
                unknown.join(", ")
            )));
        }
        Ok(template)
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Distinct placeholder names, in order of first appearance.
    pub fn placeholders(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for caps in PLACEHOLDER_PATTERN.captures_iter(&self.text) {
            let name = caps[1].to_string();
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    pub fn build(&self, config: &Configuration) -> String {
        build(&self.text, config)
    }
}

/// Fills every known placeholder of `template` from `config`.
pub fn build(template: &str, config: &Configuration) -> String {
    PLACEHOLDER_PATTERN
        .replace_all(template, |caps: &Captures| {
            value_for(&caps[1], config).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn value_for(name: &str, config: &Configuration) -> Option<String> {
    let value = match name {
        "pose_style" => config.pose_style.clone(),
        "background_style" => config.background_style.clone(),
        "aspect_ratio" => config.aspect_ratio.as_str().to_string(),
        "extra_instructions" => {
            if config.extra_instructions.trim().is_empty() {
                NO_EXTRA_INSTRUCTIONS.to_string()
            } else {
                config.extra_instructions.clone()
            }
        }
        "remove_watermark" => config.remove_watermark.to_string(),
        _ => return None,
    };
    Some(value)
}
