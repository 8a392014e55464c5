use thiserror::Error;

use crate::formats::ImageFormatId;

pub type Result<T> = std::result::Result<T, ImagerError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImagerError {
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Failed to encode {format} image: {message}")]
    EncodingFailure {
        format: ImageFormatId,
        message: String,
    },

    #[error("Failed to decode image: {0}")]
    DecodeError(String),
}

impl ImagerError {
    /// True when the caller sent something we can never serve (a bad
    /// request), false for failures on our side.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ImagerError::UnsupportedFormat(_) | ImagerError::InvalidDimensions { .. }
        )
    }
}
