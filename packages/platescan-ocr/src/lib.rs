//! Collaborator adapters for platescan: OCR engines, vehicle detectors and the
//! image filter chains that produce OCR variants.

pub mod detector;
pub mod engine;
pub mod filters;
pub mod region;
pub mod tesseract;

pub use detector::{CommandDetector, DetectError, VehicleDetector};
pub use engine::{ImageInput, OcrEngine, OcrError, OcrOutput, PageSegMode};
pub use filters::{Enhancement, FilterError, Region};
pub use region::{BoundingBox, Detection, PixelRect};
pub use tesseract::TesseractEngine;
