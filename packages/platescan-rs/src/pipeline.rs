//! End-to-end plate reading for one image.
//!
//! Detect a vehicle, build enhancement variants and region crops, OCR every
//! (variant, page segmentation mode) pair concurrently, then fan in through
//! the extractor and the observation-level selector.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use image::DynamicImage;
use platescan_ocr::filters::{self, Enhancement, Region};
use platescan_ocr::{Detection, ImageInput, OcrEngine, OcrError, OcrOutput, PageSegMode, VehicleDetector};
use serde::Serialize;
use tokio::sync::OnceCell;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::PipelineError;
use crate::extractor::{ExtractionResult, OcrObservation, PlateExtractor};
use crate::selection::{PlateReading, Selection, SelectionPolicy, SelectionStage};

/// Label of the uncropped variant.
pub const FULL_VARIANT: &str = "full";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    Started { width: u32, height: u32 },
    VehicleDetected { label: String, confidence: f32 },
    NoVehicle,
    VariantPrepared { label: String },
    OcrCompleted { source_label: String, text: String, confidence: f32 },
    OcrFailed { source_label: String, error: String },
    PlateSelected { plate: Option<String>, source_label: String, stage: SelectionStage },
    Finished { plate: Option<String>, elapsed_ms: u64 },
}

/// Receives human-readable progress while a read is running.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: &ProgressEvent);
}

/// Writes progress events to the tracing subscriber.
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn emit(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Started { width, height } => info!("Analyzing {}x{} image", width, height),
            ProgressEvent::VehicleDetected { label, confidence } => {
                info!("Vehicle detected: {} ({:.1}%)", label, confidence * 100.0)
            }
            ProgressEvent::NoVehicle => info!("No vehicle detected, using full image"),
            ProgressEvent::VariantPrepared { label } => debug!("Prepared variant {}", label),
            ProgressEvent::OcrCompleted {
                source_label,
                text,
                confidence,
            } => debug!("OCR {} -> {:?} ({:.2})", source_label, text, confidence),
            ProgressEvent::OcrFailed { source_label, error } => warn!("OCR {} failed: {}", source_label, error),
            ProgressEvent::PlateSelected {
                plate,
                source_label,
                stage,
            } => info!("Selected {:?} from {} ({:?})", plate, source_label, stage),
            ProgressEvent::Finished { plate, elapsed_ms } => match plate {
                Some(plate) => info!("Plate {} read in {}ms", plate, elapsed_ms),
                None => info!("No plate found ({}ms)", elapsed_ms),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub page_seg_modes: Vec<PageSegMode>,
    pub upscale_factor: u32,
    /// Inputs larger than this on either side are shrunk first.
    pub max_dimension: u32,
    pub vehicle_classes: Vec<String>,
    pub detection_min_confidence: f32,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            page_seg_modes: vec![PageSegMode::SINGLE_LINE, PageSegMode::SINGLE_WORD, PageSegMode::SPARSE_TEXT],
            upscale_factor: 2,
            max_dimension: 1600,
            vehicle_classes: ["car", "truck", "bus", "motorcycle"].iter().map(|s| s.to_string()).collect(),
            detection_min_confidence: 0.25,
        }
    }
}

/// One prepared image, PNG encoded.
#[derive(Debug, Clone)]
pub struct Variant {
    pub label: String,
    pub png: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlateReport {
    /// Selected reading's plate, else the best pooled candidate.
    pub plate: Option<String>,
    pub selection: Option<Selection>,
    pub extraction: ExtractionResult,
    pub readings: Vec<PlateReading>,
    pub vehicle: Option<Detection>,
    pub elapsed_ms: u64,
    #[serde(skip)]
    pub variants: Vec<Variant>,
}

/// Owns the OCR engine and detector for the lifetime of a process. Build one
/// and share it; `ensure_ready` runs engine warm-up exactly once.
pub struct PlateReader {
    ocr: Arc<dyn OcrEngine>,
    detector: Option<Arc<dyn VehicleDetector>>,
    extractor: PlateExtractor,
    policy: SelectionPolicy,
    settings: PipelineSettings,
    sink: Option<Arc<dyn ProgressSink>>,
    ready: OnceCell<()>,
}

impl PlateReader {
    pub fn new(ocr: Arc<dyn OcrEngine>, extractor: PlateExtractor) -> Self {
        Self {
            ocr,
            detector: None,
            extractor,
            policy: SelectionPolicy::default(),
            settings: PipelineSettings::default(),
            sink: None,
            ready: OnceCell::new(),
        }
    }

    pub fn with_detector(mut self, detector: Arc<dyn VehicleDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    pub fn with_policy(mut self, policy: SelectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn is_ready(&self) -> bool {
        self.ready.initialized()
    }

    pub async fn ensure_ready(&self) -> Result<(), PipelineError> {
        self.ready
            .get_or_try_init(|| async {
                self.ocr.warm_up().await?;
                if let Some(detector) = &self.detector {
                    detector.warm_up().await?;
                }
                info!("Plate reader ready");
                Ok::<(), PipelineError>(())
            })
            .await?;
        Ok(())
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(sink) = &self.sink {
            sink.emit(&event);
        }
    }

    pub async fn read_path(&self, path: &Path) -> Result<PlateReport, PipelineError> {
        let image = image::open(path)?;
        self.read(&image).await
    }

    pub async fn read(&self, image: &DynamicImage) -> Result<PlateReport, PipelineError> {
        let started = Instant::now();
        self.ensure_ready().await?;
        self.emit(ProgressEvent::Started {
            width: image.width(),
            height: image.height(),
        });

        let max = self.settings.max_dimension;
        let image = if image.width() > max || image.height() > max {
            filters::aspect_fit(image, max, max)
        } else {
            image.clone()
        };

        let vehicle = self.detect_vehicle(&image).await;
        let vehicle_crop = vehicle.as_ref().and_then(|d| {
            let rect = d.bbox.to_pixel_rect(image.width(), image.height())?;
            match filters::crop(&image, rect) {
                Ok(crop) => Some(crop),
                Err(e) => {
                    warn!("Unable to crop vehicle: {}", e);
                    None
                }
            }
        });

        let variants = self.prepare_variants(&image, vehicle_crop.as_ref());
        let outputs = self.recognize_all(&variants).await;

        let mut observations = Vec::with_capacity(outputs.len());
        let mut readings = Vec::with_capacity(outputs.len());
        for (source_label, output) in outputs {
            let confidence = (output.confidence / 100.0).clamp(0.0, 1.0);
            let observation = match OcrObservation::new(output.text, confidence, source_label.clone()) {
                Ok(observation) => observation,
                // non-finite engine confidence; leave it out of the pool
                Err(e) => {
                    self.emit_failure(source_label, e.to_string());
                    continue;
                }
            };
            self.emit(ProgressEvent::OcrCompleted {
                source_label,
                text: observation.text.clone(),
                confidence,
            });
            let single = self.extractor.extract(vec![observation.clone()])?;
            readings.push(PlateReading {
                plate: single.best_plate,
                confidence,
                source_label: observation.source_label.clone(),
            });
            observations.push(observation);
        }

        let extraction = self.extractor.extract(observations)?;
        let selection = self.policy.select(&readings);
        if let Some(selection) = &selection {
            self.emit(ProgressEvent::PlateSelected {
                plate: selection.reading.plate.clone(),
                source_label: selection.reading.source_label.clone(),
                stage: selection.stage,
            });
        }

        let plate = selection
            .as_ref()
            .and_then(|s| s.reading.plate.clone())
            .or_else(|| extraction.best_plate.clone());
        let elapsed_ms = started.elapsed().as_millis() as u64;
        self.emit(ProgressEvent::Finished {
            plate: plate.clone(),
            elapsed_ms,
        });

        Ok(PlateReport {
            plate,
            selection,
            extraction,
            readings,
            vehicle,
            elapsed_ms,
            variants,
        })
    }

    /// Most confident detection of a configured vehicle class. Detector
    /// failures are logged and treated as "no vehicle".
    async fn detect_vehicle(&self, image: &DynamicImage) -> Option<Detection> {
        let detector = self.detector.as_ref()?;
        let input = match filters::encode_png(image) {
            Ok(png) => ImageInput::Bytes(png),
            Err(e) => {
                warn!("Unable to encode image for detection: {}", e);
                return None;
            }
        };

        let detections = match detector.detect(&input).await {
            Ok(detections) => detections,
            Err(e) => {
                warn!("Vehicle detection failed: {}", e);
                self.emit(ProgressEvent::NoVehicle);
                return None;
            }
        };

        let best = pick_vehicle(
            detections,
            &self.settings.vehicle_classes,
            self.settings.detection_min_confidence,
        );
        match &best {
            Some(d) => self.emit(ProgressEvent::VehicleDetected {
                label: d.label.clone(),
                confidence: d.confidence,
            }),
            None => self.emit(ProgressEvent::NoVehicle),
        }
        best
    }

    fn prepare_variants(&self, full: &DynamicImage, vehicle: Option<&DynamicImage>) -> Vec<Variant> {
        let base = vehicle.unwrap_or(full);
        let mut prepared: Vec<(String, DynamicImage)> = Enhancement::ALL
            .iter()
            .map(|e| {
                (
                    e.label().to_string(),
                    filters::enhance(base, *e, self.settings.upscale_factor),
                )
            })
            .collect();

        for region in Region::ALL {
            match filters::crop_region(base, region) {
                Ok(crop) => prepared.push((
                    region.label().to_string(),
                    filters::enhance(&crop, Enhancement::Focused, self.settings.upscale_factor),
                )),
                Err(e) => warn!("Skipping {} crop: {}", region.label(), e),
            }
        }
        prepared.push((
            FULL_VARIANT.to_string(),
            DynamicImage::ImageLuma8(filters::grayscale(full)),
        ));

        let mut variants = Vec::with_capacity(prepared.len());
        for (label, image) in prepared {
            match filters::encode_png(&image) {
                Ok(png) => {
                    self.emit(ProgressEvent::VariantPrepared { label: label.clone() });
                    variants.push(Variant { label, png });
                }
                Err(e) => warn!("Unable to encode variant {}: {}", label, e),
            }
        }
        variants
    }

    /// OCRs every (variant, mode) pair concurrently. Results come back in
    /// variant order, then mode order, whatever order the calls finished in.
    async fn recognize_all(&self, variants: &[Variant]) -> Vec<(String, OcrOutput)> {
        let mut tasks = JoinSet::new();
        let mut order = 0usize;
        for variant in variants {
            for mode in &self.settings.page_seg_modes {
                let ocr = Arc::clone(&self.ocr);
                let input = ImageInput::Bytes(variant.png.clone());
                let label = format!("{}@{}", variant.label, mode);
                let mode = *mode;
                let slot = order;
                order += 1;
                tasks.spawn(async move {
                    let result: Result<OcrOutput, OcrError> = ocr.recognize(&input, mode).await;
                    (slot, label, result)
                });
            }
        }

        let mut completed = Vec::with_capacity(order);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((slot, label, Ok(output))) => completed.push((slot, label, output)),
                Ok((_, label, Err(e))) => self.emit_failure(label, e.to_string()),
                Err(e) => warn!("OCR task panicked: {}", e),
            }
        }
        completed.sort_by_key(|(slot, _, _)| *slot);
        debug!("{} of {} OCR calls succeeded", completed.len(), order);
        completed.into_iter().map(|(_, label, output)| (label, output)).collect()
    }

    fn emit_failure(&self, source_label: String, error: String) {
        debug!("OCR {} failed: {}", source_label, error);
        self.emit(ProgressEvent::OcrFailed { source_label, error });
    }
}

pub fn pick_vehicle(detections: Vec<Detection>, classes: &[String], min_confidence: f32) -> Option<Detection> {
    detections
        .into_iter()
        .filter(|d| d.confidence >= min_confidence)
        .filter(|d| classes.is_empty() || classes.iter().any(|c| c.eq_ignore_ascii_case(&d.label)))
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
}
