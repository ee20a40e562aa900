//! Vehicle detection delegated to an external object-detection command.
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

use crate::engine::ImageInput;
use crate::region::{BoundingBox, Detection};

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("detector command is invalid: {0}")]
    InvalidCommand(String),
    #[error("detector failed: {0}")]
    Failed(String),
    #[error("detector output is not valid JSON: {0}")]
    BadOutput(String),
    #[error("detector timed out after {0}s")]
    Timeout(u64),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait VehicleDetector: Send + Sync {
    async fn detect(&self, input: &ImageInput) -> Result<Vec<Detection>, DetectError>;

    async fn warm_up(&self) -> Result<(), DetectError> {
        Ok(())
    }
}

/// Runs `<command> --image <path>` and reads detections from its stdout.
///
/// Accepted output shapes: `{"detections": [...]}` or a bare array, where each
/// entry has `label` (or `class`), `confidence` and a four-number `bbox`.
pub struct CommandDetector {
    program: String,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl CommandDetector {
    pub fn from_command_line(command_line: &str) -> Result<Self, DetectError> {
        let mut parts = shell_words::split(command_line)
            .map_err(|e| DetectError::InvalidCommand(format!("{}: {}", command_line, e)))?;
        if parts.is_empty() {
            return Err(DetectError::InvalidCommand("empty command".to_string()));
        }
        let program = parts.remove(0);
        Ok(Self {
            program,
            args: parts,
            timeout: None,
        })
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run(&self, image_path: &Path) -> Result<Vec<Detection>, DetectError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg("--image")
            .arg(image_path)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        debug!("Running: {} {:?} --image {:?}", self.program, self.args, image_path);

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, cmd.output())
                .await
                .map_err(|_| DetectError::Timeout(limit.as_secs()))??,
            None => cmd.output().await?,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DetectError::Failed(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        parse_detections(&String::from_utf8_lossy(&output.stdout))
    }
}

#[async_trait]
impl VehicleDetector for CommandDetector {
    async fn detect(&self, input: &ImageInput) -> Result<Vec<Detection>, DetectError> {
        match input {
            ImageInput::FilePath(path) => self.run(path).await,
            ImageInput::Bytes(data) => {
                let spool = tempfile::Builder::new()
                    .prefix("platescan-detect-")
                    .suffix(".png")
                    .tempfile()?;
                tokio::fs::write(spool.path(), data).await?;
                self.run(spool.path()).await
            }
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawReport {
    Wrapped { detections: Vec<RawDetection> },
    Bare(Vec<RawDetection>),
}

#[derive(Deserialize)]
struct RawDetection {
    #[serde(alias = "class", alias = "name")]
    label: String,
    #[serde(alias = "score", alias = "conf")]
    confidence: f32,
    #[serde(alias = "box")]
    bbox: Vec<f32>,
}

/// Parses detector stdout, skipping any log lines printed before the JSON body.
pub fn parse_detections(stdout: &str) -> Result<Vec<Detection>, DetectError> {
    let body = extract_json(stdout);
    if body.is_empty() {
        return Ok(Vec::new());
    }
    let report: RawReport =
        serde_json::from_str(body).map_err(|e| DetectError::BadOutput(format!("{} - output: {}", e, body)))?;
    let raw = match report {
        RawReport::Wrapped { detections } => detections,
        RawReport::Bare(detections) => detections,
    };

    raw.into_iter()
        .map(|d| {
            let bbox = BoundingBox::from_slice(&d.bbox).ok_or_else(|| {
                DetectError::BadOutput(format!("bbox for {} has {} values", d.label, d.bbox.len()))
            })?;
            Ok(Detection {
                label: d.label,
                confidence: d.confidence,
                bbox,
            })
        })
        .collect()
}

fn extract_json(text: &str) -> &str {
    let start = text.find(|c: char| c == '{' || c == '[');
    let end = text.rfind(|c: char| c == '}' || c == ']');
    match (start, end) {
        (Some(s), Some(e)) if e >= s => &text[s..=e],
        _ => "",
    }
}
