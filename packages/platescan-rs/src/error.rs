//! Error types for the platescan library.
use platescan_ocr::{DetectError, FilterError, OcrError};
use thiserror::Error;

/// Raised only for programming or configuration mistakes. A missing plate is
/// never an error.
#[derive(Debug, Error)]
pub enum PlateError {
    #[error("invalid observation #{index}: {reason}")]
    InvalidObservation { index: usize, reason: String },

    #[error("config error: {0}")]
    Config(String),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Plate(#[from] PlateError),

    #[error("OCR engine not ready: {0}")]
    Ocr(#[from] OcrError),

    #[error("vehicle detector not ready: {0}")]
    Detector(#[from] DetectError),

    #[error("image filter error: {0}")]
    Filter(#[from] FilterError),

    #[error("unable to load image: {0}")]
    Image(#[from] image::ImageError),
}
