//! Integer confidence score for a matched plate string.
//!
//! The base score comes from re-testing the matched text against exact
//! formats, independent of which pattern produced it: a permissive pattern can
//! still yield a string in a stricter format.

use regex::Regex;
use std::sync::OnceLock;

pub const DASH_BONUS: i32 = 10;
pub const REPEATED_DIGIT_PENALTY: i32 = 20;
pub const REPEATED_LETTER_PENALTY: i32 = 15;
pub const UNRECOGNIZED_BASE: i32 = 50;

const REPEATED_DIGITS: [&str; 10] = ["000", "111", "222", "333", "444", "555", "666", "777", "888", "999"];
const REPEATED_LETTERS: [&str; 3] = ["AAA", "BBB", "CCC"];

static BASE_RULES: OnceLock<Vec<(Regex, i32)>> = OnceLock::new();

fn base_rules() -> &'static [(Regex, i32)] {
    BASE_RULES.get_or_init(|| {
        [
            (r"^[A-Z]{3}-?\d{2}-?\d{2}$", 100),
            (r"^[A-Z]{3}-?\d{3}-?[A-Z]$", 90),
            (r"^[A-Z]{3}-?\d{3}-?$", 85),
            (r"^[A-Z]{2}-?\d{3}-?[A-Z]{2}$", 85),
            (r"^[A-Z]{3}-?\d{4}$", 80),
            (r"^[A-Z]{2,3}\d{2,4}[A-Z]?$", 60),
        ]
        .iter()
        .filter_map(|(pattern, base)| Regex::new(pattern).ok().map(|re| (re, *base)))
        .collect()
    })
}

/// Score before adjustments: the first exact format the plate satisfies.
pub fn base_score(plate: &str) -> i32 {
    base_rules()
        .iter()
        .find(|(re, _)| re.is_match(plate))
        .map(|(_, base)| *base)
        .unwrap_or(UNRECOGNIZED_BASE)
}

/// Final score. May be negative; callers rank on it as is.
pub fn score(plate: &str) -> i32 {
    let mut score = base_score(plate);
    if plate.contains('-') {
        score += DASH_BONUS;
    }
    if REPEATED_DIGITS.iter().any(|t| plate.contains(t)) {
        score -= REPEATED_DIGIT_PENALTY;
    }
    if REPEATED_LETTERS.iter().any(|t| plate.contains(t)) {
        score -= REPEATED_LETTER_PENALTY;
    }
    score
}
