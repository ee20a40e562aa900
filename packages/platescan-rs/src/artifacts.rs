//! Per-run debug artifacts: every OCR variant as PNG plus the JSON report.
use anyhow::{Context, Result};
use chrono::Local;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::pipeline::PlateReport;

pub const REPORT_FILE: &str = "report.json";

pub struct RunArtifacts {
    dir: PathBuf,
}

impl RunArtifacts {
    /// Creates `<base>/<timestamp>[-<stem>]`.
    pub async fn create(base: &Path, stem: Option<&str>) -> Result<Self> {
        let mut name = Local::now().format("%Y%m%d-%H%M%S%.3f").to_string();
        if let Some(stem) = stem.map(sanitize).filter(|s| !s.is_empty()) {
            name.push('-');
            name.push_str(&stem);
        }
        let dir = base.join(name);
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create artifact directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes `<index>-<variant>.png` for each variant and the report.
    pub async fn write(&self, report: &PlateReport) -> Result<()> {
        for (index, variant) in report.variants.iter().enumerate() {
            let path = self.dir.join(format!("{:02}-{}.png", index, sanitize(&variant.label)));
            fs::write(&path, &variant.png)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }

        let json = serde_json::to_string_pretty(report)?;
        fs::write(self.dir.join(REPORT_FILE), json)
            .await
            .context("Failed to write run report")?;
        Ok(())
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::ExtractionResult;
    use crate::pipeline::Variant;

    #[tokio::test]
    async fn test_writes_variants_and_report() {
        let base = tempfile::tempdir().unwrap();
        let artifacts = RunArtifacts::create(base.path(), Some("car photo.jpg")).await.unwrap();
        assert!(artifacts
            .dir()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .ends_with("-car_photo_jpg"));

        let report = PlateReport {
            plate: Some("NCM2704".to_string()),
            selection: None,
            extraction: ExtractionResult::default(),
            readings: Vec::new(),
            vehicle: None,
            elapsed_ms: 12,
            variants: vec![
                Variant {
                    label: "focused".to_string(),
                    png: vec![1, 2, 3],
                },
                Variant {
                    label: "bottom-half".to_string(),
                    png: vec![4],
                },
            ],
        };
        artifacts.write(&report).await.unwrap();

        assert_eq!(std::fs::read(artifacts.dir().join("00-focused.png")).unwrap(), vec![1, 2, 3]);
        assert!(artifacts.dir().join("01-bottom-half.png").exists());
        let json = std::fs::read_to_string(artifacts.dir().join(REPORT_FILE)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["plate"], "NCM2704");
        assert!(value.get("variants").is_none());
    }
}
