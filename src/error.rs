//! Error types for the scanning pipeline.
//!
//! Parse failures are not represented here: an unparseable date string is
//! simply dropped by the date parser.

use thiserror::Error;

/// Errors raised by the capture, preprocessing and recognition stages.
#[derive(Error, Debug)]
pub enum ScanError {
    /// Camera permission denied or no device present.
    #[error("camera unavailable: {0}")]
    CameraUnavailable(String),

    /// A frame was requested before the stream reported its dimensions
    /// and decoded its first frame.
    #[error("video not ready")]
    VideoNotReady,

    /// A captured buffer could not be decoded.
    #[error("image decode")]
    ImageDecode(#[source] image::ImageError),

    /// A transformed image could not be encoded.
    #[error("image encode")]
    ImageEncode(#[source] image::ImageError),

    /// The recognition engine could not be started.
    #[error("OCR init failed: {0}")]
    OcrInit(String),

    /// The recognition engine ran but extracted no text.
    #[error("OCR returned no text")]
    OcrEmptyResult,

    /// A blocking worker task panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(String),

    /// IO error while handing images to the engine.
    #[error("io")]
    Io(#[from] std::io::Error),
}

impl From<tokio::task::JoinError> for ScanError {
    fn from(err: tokio::task::JoinError) -> Self {
        ScanError::Task(err.to_string())
    }
}

impl ScanError {
    /// Returns true when the scan loop should just try again on the next tick.
    pub fn is_transient(&self) -> bool {
        matches!(self, ScanError::VideoNotReady | ScanError::OcrEmptyResult)
    }

    /// Human-readable message for the error/debug channel, including the
    /// underlying cause when there is one.
    pub fn user_message(&self) -> String {
        match self {
            ScanError::ImageDecode(e) | ScanError::ImageEncode(e) => format!("{}: {}", self, e),
            ScanError::Io(e) => format!("{}: {}", self, e),
            _ => self.to_string(),
        }
    }
}
