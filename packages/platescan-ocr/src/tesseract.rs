//! OCR through the `tesseract` command line tool.
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::engine::{ImageInput, OcrEngine, OcrError, OcrOutput, PageSegMode};

/// Characters that can appear on a plate; everything else is noise to the reader.
pub const PLATE_WHITELIST: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789-";

pub struct TesseractEngine {
    program: String,
    language: String,
    whitelist: Option<String>,
    timeout: Option<Duration>,
}

impl TesseractEngine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            language: "eng".to_string(),
            whitelist: Some(PLATE_WHITELIST.to_string()),
            timeout: None,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_whitelist(mut self, whitelist: Option<String>) -> Self {
        self.whitelist = whitelist.filter(|w| !w.is_empty());
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn command(&self, image_arg: &str, mode: PageSegMode) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg(image_arg)
            .arg("stdout")
            .arg("--psm")
            .arg(mode.0.to_string())
            .arg("-l")
            .arg(&self.language);
        if let Some(whitelist) = &self.whitelist {
            cmd.arg("-c")
                .arg(format!("tessedit_char_whitelist={}", whitelist));
        }
        cmd.arg("tsv");
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    async fn run(&self, input: &ImageInput, mode: PageSegMode) -> Result<std::process::Output, OcrError> {
        match input {
            ImageInput::FilePath(path) => {
                let path = path
                    .to_str()
                    .ok_or_else(|| OcrError::InvalidInput(format!("non UTF-8 path {:?}", path)))?;
                self.command(path, mode)
                    .output()
                    .await
                    .map_err(|e| OcrError::EngineError(format!("failed to run {}: {}", self.program, e)))
            }
            ImageInput::Bytes(data) => {
                let mut cmd = self.command("stdin", mode);
                cmd.stdin(Stdio::piped());
                let mut child = cmd
                    .spawn()
                    .map_err(|e| OcrError::EngineError(format!("failed to run {}: {}", self.program, e)))?;
                if let Some(mut stdin) = child.stdin.take() {
                    stdin
                        .write_all(data)
                        .await
                        .map_err(|e| OcrError::EngineError(e.to_string()))?;
                }
                child
                    .wait_with_output()
                    .await
                    .map_err(|e| OcrError::EngineError(e.to_string()))
            }
        }
    }
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    async fn recognize(&self, input: &ImageInput, mode: PageSegMode) -> Result<OcrOutput, OcrError> {
        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.run(input, mode))
                .await
                .map_err(|_| OcrError::Timeout(limit.as_secs()))??,
            None => self.run(input, mode).await?,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::EngineError(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let tsv = String::from_utf8_lossy(&output.stdout);
        let parsed = parse_tsv(&tsv);
        debug!(
            "tesseract {} read {:?} (conf {:.1})",
            mode, parsed.text, parsed.confidence
        );
        Ok(parsed)
    }

    async fn warm_up(&self) -> Result<(), OcrError> {
        let output = Command::new(&self.program)
            .arg("--version")
            .output()
            .await
            .map_err(|e| OcrError::EngineError(format!("{} is not available: {}", self.program, e)))?;
        if !output.status.success() {
            return Err(OcrError::EngineError(format!(
                "{} --version exited with {}",
                self.program, output.status
            )));
        }
        Ok(())
    }
}

/// One row of tesseract's TSV report. Columns are matched by header name.
#[derive(Debug, Deserialize)]
struct TsvRow {
    block_num: u32,
    par_num: u32,
    line_num: u32,
    conf: f32,
    #[serde(default)]
    text: String,
}

/// Parses tesseract's TSV report. Only word rows (`conf >= 0`, non-empty
/// text) are kept; words on the same line are joined by spaces and lines by
/// newlines. Rows that do not fit the header are skipped.
pub fn parse_tsv(tsv: &str) -> OcrOutput {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .quoting(false)
        .has_headers(true)
        .flexible(true)
        .from_reader(tsv.as_bytes());

    let mut lines: Vec<String> = Vec::new();
    let mut current_line: Option<(u32, u32, u32)> = None;
    let mut confidences: Vec<f32> = Vec::new();

    for (index, result) in reader.deserialize::<TsvRow>().enumerate() {
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                debug!("skipping tsv row {}: {}", index + 1, e);
                continue;
            }
        };
        let text = row.text.trim();
        if !row.conf.is_finite() || row.conf < 0.0 || text.is_empty() {
            continue;
        }

        let line_key = (row.block_num, row.par_num, row.line_num);
        if current_line != Some(line_key) {
            lines.push(String::new());
            current_line = Some(line_key);
        }
        if let Some(line) = lines.last_mut() {
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(text);
        }
        confidences.push(row.conf);
    }

    let confidence = if confidences.is_empty() {
        0.0
    } else {
        confidences.iter().sum::<f32>() / confidences.len() as f32
    };

    OcrOutput {
        text: lines.join("\n"),
        confidence,
    }
}
