use crate::models::CallFailure;
use thiserror::Error;

/// Message shown to the user when a whole batch comes back empty.
pub const NO_IMAGES_MESSAGE: &str =
    "The AI did not produce any images. Try again with a different photo or prompt.";

#[derive(Debug, Error)]
pub enum StudioError {
    #[error("Invalid precondition: {0}")]
    InvalidPrecondition(String),

    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    #[error("{}", NO_IMAGES_MESSAGE)]
    NoImagesProduced { failures: Vec<CallFailure> },

    #[error("Packaging failed: {0}")]
    PackagingFailure(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Request error: {0}")]
    RequestError(String),

    #[error("Response error: {0}")]
    ResponseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("AWS error: {0}")]
    AwsError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StudioError {
    /// Batch-level failures the user can fix by trying again with other input.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StudioError::NoImagesProduced { .. } | StudioError::InvalidUpload(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, StudioError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CallFailureKind;

    #[test]
    fn test_no_images_message_is_user_facing() {
        let err = StudioError::NoImagesProduced {
            failures: vec![CallFailure::new(0, CallFailureKind::TimedOut)],
        };
        assert_eq!(err.to_string(), NO_IMAGES_MESSAGE);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_precondition_is_not_retryable() {
        let err = StudioError::InvalidPrecondition("no source image".into());
        assert_eq!(err.to_string(), "Invalid precondition: no source image");
        assert!(!err.is_retryable());
    }
}
