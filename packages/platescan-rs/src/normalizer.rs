//! Turns raw OCR text into the canonical form the plate grammar runs on.
use regex::{Regex, RegexBuilder};
use std::sync::OnceLock;

use crate::error::PlateError;

/// Watermarks that show up on scraped sample photos.
pub const DEFAULT_DENYLIST: &[&str] = &["platesmania", "www.", ".com"];

/// Dealer and photographer names printed on plate frames.
pub const VENDOR_DENYLIST: &[&str] = &["major", "katz", "guerrero"];

pub const DEFAULT_MIN_LENGTH: usize = 6;

/// Threshold for callers that OCR a single plate-sized field.
pub const SINGLE_FIELD_MIN_LENGTH: usize = 5;

static OUTSIDE_ALPHABET: OnceLock<Option<Regex>> = OnceLock::new();
static WHITESPACE: OnceLock<Option<Regex>> = OnceLock::new();

fn outside_alphabet() -> Option<&'static Regex> {
  OUTSIDE_ALPHABET
    .get_or_init(|| Regex::new(r"[^A-Za-z0-9\-\s]").ok())
    .as_ref()
}

fn whitespace() -> Option<&'static Regex> {
  WHITESPACE.get_or_init(|| Regex::new(r"\s+").ok()).as_ref()
}

/// Cleans OCR text: denylisted substrings out, anything outside
/// `A-Z 0-9 -` out, whitespace out, uppercased.
#[derive(Debug, Clone)]
pub struct Normalizer {
  min_length: usize,
  denylist: Option<Regex>,
}

impl Normalizer {
  pub fn new<S: AsRef<str>>(min_length: usize, denylist: &[S]) -> Result<Self, PlateError> {
    let mut alternatives = Vec::with_capacity(denylist.len());
    for entry in denylist {
      let entry = entry.as_ref();
      if entry.is_empty() {
        return Err(PlateError::Config("denylist entries must not be empty".to_string()));
      }
      alternatives.push(regex::escape(entry));
    }

    let denylist = if alternatives.is_empty() {
      None
    } else {
      let re = RegexBuilder::new(&alternatives.join("|"))
        .case_insensitive(true)
        .build()
        .map_err(|e| PlateError::Config(format!("denylist does not compile: {}", e)))?;
      Some(re)
    };

    Ok(Self { min_length, denylist })
  }

  pub fn min_length(&self) -> usize {
    self.min_length
  }

  /// Returns the canonical form of `text`, or an empty string when the input
  /// is too short to carry a plate.
  ///
  /// Cleaning repeats until nothing changes, so a token that only appears
  /// once another one (or a symbol) is removed is stripped as well. The length
  /// gate looks at the raw text: a cleaned result shorter than `min_length`
  /// normalizes to "" on a second pass.
  pub fn normalize(&self, text: &str) -> String {
    if text.trim().chars().count() < self.min_length {
      return String::new();
    }

    let mut result = text.to_string();
    loop {
      let cleaned = self.clean_pass(&result);
      if cleaned == result {
        break;
      }
      result = cleaned;
    }

    result.to_ascii_uppercase()
  }

  fn clean_pass(&self, text: &str) -> String {
    let mut result = match &self.denylist {
      Some(re) => re.replace_all(text, "").into_owned(),
      None => text.to_string(),
    };

    if let Some(re) = outside_alphabet() {
      result = re.replace_all(&result, "").into_owned();
    }
    if let Some(re) = whitespace() {
      result = re.replace_all(&result, "").into_owned();
    }
    result
  }
}

impl Default for Normalizer {
  fn default() -> Self {
    Self::new(DEFAULT_MIN_LENGTH, DEFAULT_DENYLIST).unwrap_or(Self {
      min_length: DEFAULT_MIN_LENGTH,
      denylist: None,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_short_input_has_no_signal() {
    let normalizer = Normalizer::default();
    assert_eq!(normalizer.normalize(""), "");
    assert_eq!(normalizer.normalize("   AB12   "), "");
    assert_eq!(normalizer.normalize("ABC12"), "");

    let single = Normalizer::new(SINGLE_FIELD_MIN_LENGTH, DEFAULT_DENYLIST).unwrap();
    assert_eq!(single.normalize("ABC12"), "ABC12");
  }

  #[test]
  fn test_strips_watermarks_symbols_and_spaces() {
    let normalizer = Normalizer::default();
    assert_eq!(normalizer.normalize("platesmania.com NCM-27-04 www."), "NCM-27-04");
    assert_eq!(normalizer.normalize("  gzw 002 | a\n"), "GZW002A");
    assert_eq!(normalizer.normalize("PlatesMania ABC*12_34"), "ABC1234");
  }

  #[test]
  fn test_only_noise_normalizes_to_empty() {
    let normalizer = Normalizer::default();
    assert_eq!(normalizer.normalize("www.platesmania.com"), "");
    assert_eq!(normalizer.normalize("!!! ... ###"), "");
  }

  #[test]
  fn test_vendor_tokens_are_configurable() {
    let plain = Normalizer::default();
    assert_eq!(plain.normalize("KATZ NCM2704"), "KATZNCM2704");

    let tokens: Vec<&str> = DEFAULT_DENYLIST.iter().chain(VENDOR_DENYLIST).copied().collect();
    let vendor = Normalizer::new(DEFAULT_MIN_LENGTH, &tokens).unwrap();
    assert_eq!(vendor.normalize("Katz NCM2704 Guerrero"), "NCM2704");
  }

  #[test]
  fn test_normalize_is_idempotent() {
    let normalizer = Normalizer::default();
    for text in ["NCM-27-04", "GZW002A", "AB-123-CD", "12-AB-345"] {
      let once = normalizer.normalize(text);
      assert_eq!(once, text);
      assert_eq!(normalizer.normalize(&once), once);
    }
  }

  #[test]
  fn test_nested_tokens_are_removed_in_one_call() {
    let normalizer = Normalizer::default();
    let once = normalizer.normalize("platesplatesmaniamania NCM2704");
    assert_eq!(once, "NCM2704");
    assert_eq!(normalizer.normalize(&once), once);

    // removing a symbol or a space can join a watermark back together
    assert_eq!(normalizer.normalize("plates*mania NCM2704"), "NCM2704");
    assert_eq!(normalizer.normalize("plates mania NCM2704"), "NCM2704");
  }

  #[test]
  fn test_short_cleaned_output_fails_closed_on_second_pass() {
    let normalizer = Normalizer::default();
    let once = normalizer.normalize("ABC 12");
    assert_eq!(once, "ABC12");
    // the raw text passed the length gate, the cleaned text does not
    assert_eq!(normalizer.normalize(&once), "");
  }

  #[test]
  fn test_empty_denylist_entry_is_rejected() {
    assert!(Normalizer::new(DEFAULT_MIN_LENGTH, &["www.", ""]).is_err());
    let none: [&str; 0] = [];
    assert_eq!(Normalizer::new(DEFAULT_MIN_LENGTH, &none).unwrap().normalize("a.b-c d1"), "AB-CD1");
  }
}
