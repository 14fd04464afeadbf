use thiserror::Error;

/// Capture pipeline errors.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no frame available from video source")]
    CaptureUnavailable,

    #[error("frame decode failed: {0}")]
    Decode(String),

    #[error("frame render failed: {0}")]
    Render(String),

    #[error("image encode failed: {0}")]
    Encode(String),

    #[error("a capture is already in progress")]
    CaptureInProgress,
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, CaptureError>;
