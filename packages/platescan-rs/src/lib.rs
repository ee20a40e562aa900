//! # platescan-rs
//!
//! Reads license plates out of vehicle photos. The hard part is turning noisy,
//! watermark-polluted OCR text into a validated, ranked plate string; the
//! detection, OCR and image filtering around it are delegated to the
//! adapters in `platescan-ocr`.
//!
//! ## Features
//!
//! - **Normalization**: strip watermarks, symbols and whitespace from OCR text
//! - **Plate Grammar**: one ordered table of plate shapes, shared by candidate generation and validation
//! - **Scoring & Ranking**: exact-format base scores, dash bonus, repeated-character penalties, stable ranking
//! - **Observation Selection**: confidence and source-label tie-breaking across image variants
//! - **Pipeline**: vehicle crop, enhancement variants, concurrent OCR fan-out, debug artifacts
//!
//! ## Quick Start
//!
//! ```ignore
//! use platescan_rs::prelude::*;
//!
//! let observations = vec![
//!     OcrObservation::new("platesmania.com NCM-27-04 www.", 0.92, "focused@psm7")?,
//! ];
//! let result = extract(observations, 6, DEFAULT_DENYLIST)?;
//! assert_eq!(result.best_plate.as_deref(), Some("NCM-27-04"));
//!
//! // Full pipeline on a photo
//! let reader = PlatescanConfig::default().build_reader()?;
//! let report = reader.read_path("car.jpg".as_ref()).await?;
//! println!("{:?}", report.plate);
//! ```

pub mod artifacts;
pub mod config;
pub mod error;
pub mod extractor;
pub mod gallery;
pub mod grammar;
pub mod normalizer;
pub mod pipeline;
pub mod scorer;
pub mod selection;

// Re-export commonly used types at the root level
pub use artifacts::RunArtifacts;
pub use config::PlatescanConfig;
pub use error::{PipelineError, PlateError};
pub use extractor::{extract, Candidate, ExtractionResult, ExtractorConfig, OcrObservation, PlateExtractor};
pub use gallery::list_images;
pub use grammar::{is_valid_plate, PatternKind};
pub use normalizer::{Normalizer, DEFAULT_DENYLIST, VENDOR_DENYLIST};
pub use pipeline::{PipelineSettings, PlateReader, PlateReport, ProgressEvent, ProgressSink, TracingSink};
pub use selection::{select_reading, PlateReading, Selection, SelectionPolicy, SelectionStage};

/// Prelude module for convenient imports
///
/// Import everything you need with:
/// ```ignore
/// use platescan_rs::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        extract, is_valid_plate, list_images, select_reading, Candidate, ExtractionResult, ExtractorConfig,
        Normalizer, OcrObservation, PatternKind, PipelineError, PipelineSettings, PlateError, PlateExtractor,
        PlateReader, PlateReading, PlateReport, PlatescanConfig, ProgressEvent, ProgressSink, RunArtifacts,
        Selection, SelectionPolicy, SelectionStage, TracingSink, DEFAULT_DENYLIST, VENDOR_DENYLIST,
    };
}
