//! Observation-level selection.
//!
//! Each (variant, OCR mode) pair already has its own best plate. This stage
//! picks one of those readings using only static metadata (confidence and
//! source label), so the outcome does not depend on the order in which
//! concurrent OCR calls completed.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::grammar::is_valid_plate;

/// Best plate of one (variant, OCR mode) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlateReading {
    pub plate: Option<String>,
    /// 0.0..=1.0, from the OCR engine.
    pub confidence: f32,
    pub source_label: String,
}

impl PlateReading {
    /// The variant part of a `<variant>@<mode>` label.
    pub fn variant(&self) -> &str {
        variant_of(&self.source_label)
    }

    fn validated_plate(&self) -> Option<&str> {
        self.plate.as_deref().filter(|p| is_valid_plate(p))
    }
}

pub fn variant_of(label: &str) -> &str {
    label.split('@').next().unwrap_or(label)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStage {
    Confident,
    AnyValidated,
    DefaultVariant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionPolicy {
    /// Readings above this confidence win outright.
    pub min_confidence: f32,
    /// Confidence gap under which two readings count as tied.
    pub near_tie: f32,
    /// The standard processing variant, preferred among near-ties.
    pub primary_variant: String,
    /// The uncropped variant used when nothing validated.
    pub default_variant: String,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self {
            min_confidence: 0.1,
            near_tie: 0.1,
            primary_variant: "focused".to_string(),
            default_variant: "full".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub reading: PlateReading,
    pub stage: SelectionStage,
}

impl SelectionPolicy {
    fn is_primary(&self, reading: &PlateReading) -> bool {
        reading.variant() == self.primary_variant
    }

    /// Total order used wherever two readings compete: higher confidence,
    /// then primary variant, then label. `Less` means `a` ranks first.
    fn rank(&self, a: &PlateReading, b: &PlateReading) -> Ordering {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| self.is_primary(b).cmp(&self.is_primary(a)))
            .then_with(|| a.source_label.cmp(&b.source_label))
    }

    pub fn select(&self, readings: &[PlateReading]) -> Option<Selection> {
        let validated: Vec<&PlateReading> = readings.iter().filter(|r| r.validated_plate().is_some()).collect();

        let confident = validated
            .iter()
            .copied()
            .filter(|r| r.confidence > self.min_confidence)
            .min_by(|a, b| self.rank(a, b));
        if let Some(reading) = confident {
            return Some(Selection {
                reading: reading.clone(),
                stage: SelectionStage::Confident,
            });
        }

        if let Some(top) = validated.iter().copied().min_by(|a, b| self.rank(a, b)) {
            let reading = validated
                .iter()
                .copied()
                .filter(|r| self.is_primary(r) && top.confidence - r.confidence < self.near_tie)
                .min_by(|a, b| self.rank(a, b))
                .unwrap_or(top);
            return Some(Selection {
                reading: reading.clone(),
                stage: SelectionStage::AnyValidated,
            });
        }

        readings
            .iter()
            .filter(|r| r.variant() == self.default_variant)
            .min_by(|a, b| self.rank(a, b))
            .map(|reading| Selection {
                reading: reading.clone(),
                stage: SelectionStage::DefaultVariant,
            })
    }
}

/// [`SelectionPolicy::select`] with the default policy.
pub fn select_reading(readings: &[PlateReading]) -> Option<Selection> {
    SelectionPolicy::default().select(readings)
}
