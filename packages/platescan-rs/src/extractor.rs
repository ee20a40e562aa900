//! Plate candidate extraction: normalize, scan the grammar, score, rank.
//!
//! Everything here is pure and synchronous. A [`PlateExtractor`] holds only
//! immutable compiled state and can be shared across threads freely.

use serde::{Deserialize, Serialize};

use crate::error::PlateError;
use crate::grammar::{self, PatternKind};
use crate::normalizer::{Normalizer, DEFAULT_DENYLIST, DEFAULT_MIN_LENGTH, SINGLE_FIELD_MIN_LENGTH, VENDOR_DENYLIST};
use crate::scorer;

/// One OCR engine output for one image variant / engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrObservation {
    pub text: String,
    /// 0.0..=1.0
    pub confidence: f32,
    pub source_label: String,
}

impl OcrObservation {
    pub fn new(text: impl Into<String>, confidence: f32, source_label: impl Into<String>) -> Result<Self, PlateError> {
        let observation = Self {
            text: text.into(),
            confidence,
            source_label: source_label.into(),
        };
        observation.validate(0)?;
        Ok(observation)
    }

    fn validate(&self, index: usize) -> Result<(), PlateError> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(PlateError::InvalidObservation {
                index,
                reason: format!("confidence {} is outside 0..=1", self.confidence),
            });
        }
        if self.source_label.trim().is_empty() {
            return Err(PlateError::InvalidObservation {
                index,
                reason: "source label is empty".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// The matched substring, verbatim (dashes are never inserted).
    pub plate: String,
    pub score: i32,
    pub pattern: PatternKind,
    pub source_label: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub best_plate: Option<String>,
    /// Highest score first; equal scores keep discovery order.
    pub candidates: Vec<Candidate>,
    pub all_observations: Vec<OcrObservation>,
}

impl ExtractionResult {
    pub fn best(&self) -> Option<&Candidate> {
        self.candidates.first()
    }

    pub fn best_score(&self) -> Option<i32> {
        self.best().map(|c| c.score)
    }
}

/// Min length and denylist differ between callers, so both are explicit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub min_length: usize,
    pub denylist: Vec<String>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            min_length: DEFAULT_MIN_LENGTH,
            denylist: DEFAULT_DENYLIST.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ExtractorConfig {
    /// For OCR runs over a single plate-sized field.
    pub fn single_field() -> Self {
        Self {
            min_length: SINGLE_FIELD_MIN_LENGTH,
            ..Self::default()
        }
    }

    /// Adds the dealer/photographer names seen on plate frames.
    pub fn with_vendor_tokens(mut self) -> Self {
        for token in VENDOR_DENYLIST {
            if !self.denylist.iter().any(|d| d.eq_ignore_ascii_case(token)) {
                self.denylist.push(token.to_string());
            }
        }
        self
    }
}

#[derive(Debug, Clone)]
pub struct PlateExtractor {
    normalizer: Normalizer,
}

impl PlateExtractor {
    pub fn new(config: &ExtractorConfig) -> Result<Self, PlateError> {
        Ok(Self {
            normalizer: Normalizer::new(config.min_length, &config.denylist)?,
        })
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Candidates for one text in discovery order (pattern priority, then
    /// left to right). Not yet ranked.
    pub fn candidates_for(&self, text: &str, source_label: &str) -> Vec<Candidate> {
        let canonical = self.normalizer.normalize(text);
        grammar::scan(&canonical)
            .into_iter()
            .map(|m| Candidate {
                score: scorer::score(&m.text),
                plate: m.text,
                pattern: m.kind,
                source_label: source_label.to_string(),
            })
            .collect()
    }

    /// Pools candidates from every observation and ranks them.
    ///
    /// Empty input, too-short text and texts without a match all produce an
    /// empty result. Only malformed observations are errors.
    pub fn extract(&self, observations: Vec<OcrObservation>) -> Result<ExtractionResult, PlateError> {
        for (index, observation) in observations.iter().enumerate() {
            observation.validate(index)?;
        }

        let mut candidates: Vec<Candidate> = observations
            .iter()
            .flat_map(|o| self.candidates_for(&o.text, &o.source_label))
            .collect();
        // stable: equal scores keep discovery order
        candidates.sort_by(|a, b| b.score.cmp(&a.score));

        Ok(ExtractionResult {
            best_plate: candidates.first().map(|c| c.plate.clone()),
            candidates,
            all_observations: observations,
        })
    }
}

impl Default for PlateExtractor {
    fn default() -> Self {
        Self {
            normalizer: Normalizer::default(),
        }
    }
}

/// One-shot extraction with explicit settings.
pub fn extract<S: AsRef<str>>(
    observations: Vec<OcrObservation>,
    min_length: usize,
    denylist: &[S],
) -> Result<ExtractionResult, PlateError> {
    let extractor = PlateExtractor {
        normalizer: Normalizer::new(min_length, denylist)?,
    };
    extractor.extract(observations)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(text: &str, confidence: f32, label: &str) -> OcrObservation {
        OcrObservation::new(text, confidence, label).unwrap()
    }

    fn run(texts: &[&str]) -> ExtractionResult {
        let observations = texts.iter().map(|t| obs(t, 0.9, "focused@psm7")).collect();
        extract(observations, DEFAULT_MIN_LENGTH, DEFAULT_DENYLIST).unwrap()
    }

    #[test]
    fn test_dashed_plate_is_returned_verbatim() {
        let result = run(&["NCM-27-04"]);
        assert_eq!(result.best_plate.as_deref(), Some("NCM-27-04"));
        assert_eq!(result.best_score(), Some(110));
        assert_eq!(result.best().unwrap().pattern, PatternKind::ThreeLettersTwoTwoDigits);
    }

    #[test]
    fn test_compact_plate_is_not_reformatted() {
        let result = run(&["ncm 2704"]);
        assert_eq!(result.best_plate.as_deref(), Some("NCM2704"));
        assert_eq!(result.best_score(), Some(100));
    }

    #[test]
    fn test_trailing_letter_plate() {
        let result = run(&["GZW-002-A"]);
        assert_eq!(result.best_plate.as_deref(), Some("GZW-002-A"));
        assert_eq!(result.best_score(), Some(100));
        // the truncated pattern also fires, one rank lower
        assert_eq!(result.candidates[1].plate, "GZW-002-");
        assert_eq!(result.candidates[1].score, 95);
    }

    #[test]
    fn test_truncated_read_scores_95() {
        let result = run(&["SZH-002-"]);
        assert_eq!(result.best_plate.as_deref(), Some("SZH-002-"));
        assert_eq!(result.best_score(), Some(95));
        assert!(result
            .candidates
            .iter()
            .any(|c| c.pattern == PatternKind::ThreeLettersThreeDigits && c.score == 95));
    }

    #[test]
    fn test_watermarks_do_not_change_the_result() {
        let clean = run(&["NCM-27-04"]);
        let noisy = run(&["platesmania.com NCM-27-04 www."]);
        assert_eq!(noisy.best_plate, clean.best_plate);
        assert_eq!(noisy.best_score(), clean.best_score());
    }

    #[test]
    fn test_penalized_candidate_ranks_below_clean_one() {
        for order in [["XXX-111-A", "ABC-12-34"], ["ABC-12-34", "XXX-111-A"]] {
            let observations = vec![obs(order[0], 0.99, "focused@psm7"), obs(order[1], 0.01, "upscaled@psm8")];
            let result = extract(observations, DEFAULT_MIN_LENGTH, DEFAULT_DENYLIST).unwrap();
            assert_eq!(result.best_plate.as_deref(), Some("ABC-12-34"));
            assert_eq!(result.best_score(), Some(110));
            let penalized = result.candidates.iter().find(|c| c.plate == "XXX-111-A").unwrap();
            assert_eq!(penalized.score, 80);
        }
    }

    #[test]
    fn test_ties_keep_discovery_order() {
        let result = run(&["ABC-12-34", "XYZ-56-78"]);
        assert_eq!(result.candidates[0].plate, "ABC-12-34");
        assert_eq!(result.candidates[1].plate, "XYZ-56-78");

        let reversed = run(&["XYZ-56-78", "ABC-12-34"]);
        assert_eq!(reversed.best_plate.as_deref(), Some("XYZ-56-78"));
    }

    #[test]
    fn test_candidates_sorted_descending() {
        let result = run(&["GZW-002-A QRS1234 AB12CDE"]);
        assert!(!result.candidates.is_empty());
        for pair in result.candidates.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        assert_eq!(result.best_plate.as_deref(), Some(result.candidates[0].plate.as_str()));
    }

    #[test]
    fn test_no_signal_inputs() {
        assert_eq!(run(&[]), ExtractionResult::default());

        let short = run(&["AB-12"]);
        assert!(short.best_plate.is_none());
        assert!(short.candidates.is_empty());
        assert_eq!(short.all_observations.len(), 1);

        assert!(run(&["www.platesmania.com"]).best_plate.is_none());
        assert!(run(&["HELLO WORLD"]).best_plate.is_none());
    }

    #[test]
    fn test_min_length_is_configurable() {
        let observations = vec![obs("AB123", 0.5, "bottom-half@psm7")];
        let strict = extract(observations.clone(), DEFAULT_MIN_LENGTH, DEFAULT_DENYLIST).unwrap();
        assert!(strict.best_plate.is_none());

        let single = ExtractorConfig::single_field();
        let result = PlateExtractor::new(&single).unwrap().extract(observations).unwrap();
        assert_eq!(result.best_plate.as_deref(), Some("AB123"));
        assert_eq!(result.best_score(), Some(60));
    }

    #[test]
    fn test_vendor_tokens() {
        let config = ExtractorConfig::default().with_vendor_tokens();
        assert_eq!(config.denylist.len(), DEFAULT_DENYLIST.len() + VENDOR_DENYLIST.len());
        let extractor = PlateExtractor::new(&config).unwrap();
        let result = extractor.extract(vec![obs("MAJOR NCM-27-04", 0.4, "full@psm11")]).unwrap();
        assert_eq!(result.best_plate.as_deref(), Some("NCM-27-04"));
        assert_eq!(result.candidates.len(), 1);
    }

    #[test]
    fn test_malformed_observation_fails_fast() {
        assert!(OcrObservation::new("NCM2704", 1.5, "focused").is_err());
        assert!(OcrObservation::new("NCM2704", 0.5, " ").is_err());

        let bad = OcrObservation {
            text: "NCM2704".to_string(),
            confidence: f32::NAN,
            source_label: "focused".to_string(),
        };
        let good = obs("NCM2704", 0.5, "focused");
        let err = extract(vec![good, bad], DEFAULT_MIN_LENGTH, DEFAULT_DENYLIST).unwrap_err();
        assert!(matches!(err, PlateError::InvalidObservation { index: 1, .. }));
    }
}
