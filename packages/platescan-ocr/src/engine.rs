use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone)]
pub enum ImageInput {
    FilePath(PathBuf),
    Bytes(Vec<u8>),
}

/// Tesseract-style page segmentation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageSegMode(pub u8);

impl PageSegMode {
    pub const SINGLE_LINE: PageSegMode = PageSegMode(7);
    pub const SINGLE_WORD: PageSegMode = PageSegMode(8);
    pub const SPARSE_TEXT: PageSegMode = PageSegMode(11);
}

impl fmt::Display for PageSegMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "psm{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct OcrOutput {
    pub text: String,
    /// Mean word confidence, 0-100.
    pub confidence: f32,
}

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("engine error: {0}")]
    EngineError(String),
    #[error("engine timed out after {0}s")]
    Timeout(u64),
}

#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, input: &ImageInput, mode: PageSegMode) -> Result<OcrOutput, OcrError>;

    /// Loads models or checks binaries. Callers invoke it once before the first
    /// `recognize`; the default does nothing.
    async fn warm_up(&self) -> Result<(), OcrError> {
        Ok(())
    }
}
