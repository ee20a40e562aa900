//! TOML configuration for the `platescan` binary.
//!
//! Every field has a default, so an empty file (or no file) is valid.
//!
//! ```toml
//! [extractor]
//! min_length = 5
//! denylist = ["platesmania", "www.", ".com", "katz"]
//!
//! [ocr]
//! page_seg_modes = [7, 11]
//!
//! [detector]
//! command = "python3 detect.py --model yolov8n.pt"
//! ```

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use platescan_ocr::filters::MAX_UPSCALE_FACTOR;
use platescan_ocr::tesseract::PLATE_WHITELIST;
use platescan_ocr::{CommandDetector, PageSegMode, TesseractEngine};

use crate::extractor::{ExtractorConfig, PlateExtractor};
use crate::pipeline::{PipelineSettings, PlateReader};
use crate::selection::SelectionPolicy;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatescanConfig {
    pub extractor: ExtractorConfig,
    pub selection: SelectionPolicy,
    pub ocr: OcrConfig,
    pub detector: DetectorConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub program: String,
    pub language: String,
    pub page_seg_modes: Vec<u8>,
    pub whitelist: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            program: "tesseract".to_string(),
            language: "eng".to_string(),
            page_seg_modes: vec![7, 8, 11],
            whitelist: Some(PLATE_WHITELIST.to_string()),
            timeout_secs: Some(30),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Object detection command; detection is skipped when unset.
    pub command: Option<String>,
    pub min_confidence: f32,
    pub classes: Vec<String>,
    pub timeout_secs: Option<u64>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        let settings = PipelineSettings::default();
        Self {
            command: None,
            min_confidence: settings.detection_min_confidence,
            classes: settings.vehicle_classes,
            timeout_secs: Some(60),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub upscale_factor: u32,
    pub max_dimension: u32,
    /// When set, every run writes its variants and report here.
    pub debug_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let settings = PipelineSettings::default();
        Self {
            upscale_factor: settings.upscale_factor,
            max_dimension: settings.max_dimension,
            debug_dir: None,
        }
    }
}

impl PlatescanConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&contents).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.ocr.page_seg_modes.is_empty() {
            bail!("ocr.page_seg_modes must list at least one mode");
        }
        if self.ocr.page_seg_modes.iter().any(|m| *m > 13) {
            bail!("ocr.page_seg_modes must be between 0 and 13");
        }
        if self.pipeline.upscale_factor == 0 || self.pipeline.max_dimension == 0 {
            bail!("pipeline.upscale_factor and pipeline.max_dimension must be positive");
        }
        if self.pipeline.upscale_factor > MAX_UPSCALE_FACTOR {
            bail!("pipeline.upscale_factor must be at most {}", MAX_UPSCALE_FACTOR);
        }
        if !(0.0..=1.0).contains(&self.selection.min_confidence) || !(0.0..=1.0).contains(&self.selection.near_tie) {
            bail!("selection thresholds must be between 0 and 1");
        }
        Ok(())
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            page_seg_modes: self.ocr.page_seg_modes.iter().map(|m| PageSegMode(*m)).collect(),
            upscale_factor: self.pipeline.upscale_factor,
            max_dimension: self.pipeline.max_dimension,
            vehicle_classes: self.detector.classes.clone(),
            detection_min_confidence: self.detector.min_confidence,
        }
    }

    /// Wires the tesseract engine, the optional detector command, the
    /// extractor and the selection policy into a reader.
    pub fn build_reader(&self) -> Result<PlateReader> {
        let extractor = PlateExtractor::new(&self.extractor).context("Invalid extractor settings")?;
        let engine = TesseractEngine::new(&self.ocr.program)
            .with_language(&self.ocr.language)
            .with_whitelist(self.ocr.whitelist.clone())
            .with_timeout(self.ocr.timeout_secs.map(Duration::from_secs));

        let mut reader = PlateReader::new(Arc::new(engine), extractor)
            .with_policy(self.selection.clone())
            .with_settings(self.pipeline_settings());

        if let Some(command) = &self.detector.command {
            let detector = CommandDetector::from_command_line(command)
                .context("Invalid detector command")?
                .with_timeout(self.detector.timeout_secs.map(Duration::from_secs));
            reader = reader.with_detector(Arc::new(detector));
        }

        Ok(reader)
    }
}
