use super::GeneratedImage;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum CallFailureKind {
    Service(String),
    TimedOut,
    Empty,
}

/// Why one call of a batch contributed no images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallFailure {
    pub call_index: usize,
    pub kind: CallFailureKind,
}

impl CallFailure {
    pub fn new(call_index: usize, kind: CallFailureKind) -> Self {
        Self { call_index, kind }
    }
}

impl fmt::Display for CallFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            CallFailureKind::Service(msg) => write!(f, "call #{} failed: {}", self.call_index, msg),
            CallFailureKind::TimedOut => write!(f, "call #{} timed out", self.call_index),
            CallFailureKind::Empty => write!(f, "call #{} returned no images", self.call_index),
        }
    }
}

/// A successful batch: at least one image, plus whatever went wrong on the way.
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub batch_id: String,
    pub images: Vec<GeneratedImage>,
    pub failures: Vec<CallFailure>,
    pub generated_at: DateTime<Utc>,
}

impl BatchOutcome {
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}
