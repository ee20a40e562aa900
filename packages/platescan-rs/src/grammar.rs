//! The plate-shape grammar shared by candidate generation and validation.
//!
//! Patterns are tried in a fixed priority order; that order is also the
//! tie-break order when two candidates score the same.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Shortest and longest substring accepted as a candidate.
pub const MIN_CANDIDATE_LEN: usize = 5;
pub const MAX_CANDIDATE_LEN: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    /// `LLL-DD-DD`
    ThreeLettersTwoTwoDigits,
    /// `LLL-DDD-L`, trailing letter optional
    ThreeLettersThreeDigitsLetter,
    /// `LLL-DDD-`, truncated reads ending after the digit block
    ThreeLettersThreeDigits,
    /// `LLL-DDDD`
    ThreeLettersFourDigits,
    /// `LLLDDDD`
    Compact,
    /// `LLLDDLL`
    CompactLetterSuffix,
    /// `LL-DDD-LL`
    Federal,
    /// `DD-LL-DDD`
    Commercial,
    /// `LL{2,3}DD{2,4}L?`
    Fallback,
}

impl PatternKind {
    pub const PRIORITY: [PatternKind; 9] = [
        PatternKind::ThreeLettersTwoTwoDigits,
        PatternKind::ThreeLettersThreeDigitsLetter,
        PatternKind::ThreeLettersThreeDigits,
        PatternKind::ThreeLettersFourDigits,
        PatternKind::Compact,
        PatternKind::CompactLetterSuffix,
        PatternKind::Federal,
        PatternKind::Commercial,
        PatternKind::Fallback,
    ];

    pub fn regex_source(&self) -> &'static str {
        match self {
            PatternKind::ThreeLettersTwoTwoDigits => r"[A-Z]{3}-?\d{2}-?\d{2}",
            PatternKind::ThreeLettersThreeDigitsLetter => r"[A-Z]{3}-?\d{3}-?[A-Z]?",
            PatternKind::ThreeLettersThreeDigits => r"[A-Z]{3}-?\d{3}-?",
            PatternKind::ThreeLettersFourDigits => r"[A-Z]{3}-?\d{4}",
            PatternKind::Compact => r"[A-Z]{3}\d{4}",
            PatternKind::CompactLetterSuffix => r"[A-Z]{3}\d{2}[A-Z]{2}",
            PatternKind::Federal => r"[A-Z]{2}-?\d{3}-?[A-Z]{2}",
            PatternKind::Commercial => r"\d{2}-?[A-Z]{2}-?\d{3}",
            PatternKind::Fallback => r"[A-Z]{2,3}\d{2,4}[A-Z]?",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PatternKind::ThreeLettersTwoTwoDigits => "LLL-DD-DD",
            PatternKind::ThreeLettersThreeDigitsLetter => "LLL-DDD-L",
            PatternKind::ThreeLettersThreeDigits => "LLL-DDD-",
            PatternKind::ThreeLettersFourDigits => "LLL-DDDD",
            PatternKind::Compact => "LLLDDDD",
            PatternKind::CompactLetterSuffix => "LLLDDLL",
            PatternKind::Federal => "LL-DDD-LL",
            PatternKind::Commercial => "DD-LL-DDD",
            PatternKind::Fallback => "generic",
        }
    }
}

/// A compiled grammar entry. `scan` finds substrings; `exact` matches a whole string.
pub struct PlatePattern {
    pub kind: PatternKind,
    scan: Regex,
    exact: Regex,
}

impl PlatePattern {
    fn compile(kind: PatternKind) -> Option<Self> {
        let source = kind.regex_source();
        let scan = Regex::new(source).ok()?;
        let exact = Regex::new(&format!("^(?:{})$", source)).ok()?;
        Some(Self { kind, scan, exact })
    }

    pub fn is_exact(&self, text: &str) -> bool {
        self.exact.is_match(text)
    }
}

static GRAMMAR: OnceLock<Vec<PlatePattern>> = OnceLock::new();

/// The grammar in priority order.
pub fn patterns() -> &'static [PlatePattern] {
    GRAMMAR.get_or_init(|| PatternKind::PRIORITY.iter().filter_map(|k| PlatePattern::compile(*k)).collect())
}

/// A raw match produced by [`scan`], before scoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    pub kind: PatternKind,
    pub text: String,
}

/// Runs every pattern over a canonical string. Matches are returned pattern
/// by pattern in priority order, and left to right within a pattern; matches
/// outside the accepted length window are dropped.
pub fn scan(canonical: &str) -> Vec<PatternMatch> {
    let mut found = Vec::new();
    if canonical.is_empty() {
        return found;
    }
    for pattern in patterns() {
        for m in pattern.scan.find_iter(canonical) {
            let len = m.as_str().chars().count();
            if (MIN_CANDIDATE_LEN..=MAX_CANDIDATE_LEN).contains(&len) {
                found.push(PatternMatch {
                    kind: pattern.kind,
                    text: m.as_str().to_string(),
                });
            }
        }
    }
    found
}

/// True when the whole string is a plate under some grammar pattern.
pub fn is_valid_plate(plate: &str) -> bool {
    let len = plate.chars().count();
    (MIN_CANDIDATE_LEN..=MAX_CANDIDATE_LEN).contains(&len) && patterns().iter().any(|p| p.is_exact(plate))
}
