//! Integration tests for the platescan-rs library API

use platescan_rs::prelude::*;

fn observe(text: &str, confidence: f32, label: &str) -> OcrObservation {
    OcrObservation::new(text, confidence, label).expect("valid observation")
}

#[test]
fn test_prelude_imports() {
    let result = extract(vec![observe("NCM-27-04", 0.9, "focused@psm7")], 6, DEFAULT_DENYLIST).unwrap();
    assert_eq!(result.best_plate.as_deref(), Some("NCM-27-04"));
    assert!(is_valid_plate("NCM-27-04"));

    let normalizer = Normalizer::new(6, DEFAULT_DENYLIST).unwrap();
    assert_eq!(normalizer.normalize("www.NCM 27 04"), "NCM2704");
}

#[test]
fn test_inputs_below_min_length_have_no_plate() {
    for min_length in [5usize, 6, 8] {
        let short: String = "ABC1234".chars().take(min_length - 1).collect();
        let result = extract(vec![observe(&short, 0.9, "focused")], min_length, DEFAULT_DENYLIST).unwrap();
        assert!(result.best_plate.is_none(), "{:?} with min {}", short, min_length);
    }
}

#[test]
fn test_noise_only_input_has_no_plate() {
    let result = extract(
        vec![observe("www.platesmania.com", 0.9, "full"), observe(" .com www. ", 0.9, "full")],
        6,
        DEFAULT_DENYLIST,
    )
    .unwrap();
    assert!(result.best_plate.is_none());
    assert!(result.candidates.is_empty());
}

#[test]
fn test_normalization_is_idempotent() {
    let normalizer = Normalizer::default();
    for raw in [
        "platesmania.com NCM-27-04 www.",
        "gzw 002 a",
        "  ab-123-cd  ",
        "12 ab 345!",
        "platesplatesmaniamania NCM2704",
        "w.comww. ABC1234",
    ] {
        let once = normalizer.normalize(raw);
        assert_eq!(normalizer.normalize(&once), once, "raw input {:?}", raw);
    }
}

#[test]
fn test_reference_plates() {
    let cases = [("NCM-27-04", "NCM-27-04", 110), ("GZW-002-A", "GZW-002-A", 100), ("SZH-002-", "SZH-002-", 95)];
    for (input, plate, score) in cases {
        let result = extract(vec![observe(input, 0.5, "focused@psm7")], 6, DEFAULT_DENYLIST).unwrap();
        assert_eq!(result.best_plate.as_deref(), Some(plate));
        assert_eq!(result.best_score(), Some(score));
    }
}

#[test]
fn test_watermarked_input_scores_like_clean_input() {
    let clean = extract(vec![observe("NCM-27-04", 0.5, "a")], 6, DEFAULT_DENYLIST).unwrap();
    let noisy = extract(vec![observe("platesmania.com NCM-27-04 www.", 0.5, "a")], 6, DEFAULT_DENYLIST).unwrap();
    assert_eq!(noisy.best_plate, clean.best_plate);
    assert_eq!(noisy.candidates, clean.candidates);
}

#[test]
fn test_ranking_ignores_observation_order_and_confidence() {
    let a = observe("XXX-111-A", 1.0, "focused@psm7");
    let b = observe("ABC-12-34", 0.0, "upscaled@psm7");
    for pool in [vec![a.clone(), b.clone()], vec![b, a]] {
        let result = extract(pool, 6, DEFAULT_DENYLIST).unwrap();
        assert_eq!(result.best_plate.as_deref(), Some("ABC-12-34"));
        assert_eq!(result.best_score(), Some(110));
    }
}

#[test]
fn test_zero_observations() {
    let none: [&str; 0] = [];
    let result = extract(Vec::new(), 6, &none).unwrap();
    assert_eq!(result.best_plate, None);
    assert!(result.candidates.is_empty());
    assert!(result.all_observations.is_empty());
}

#[test]
fn test_best_plate_invariant() {
    let texts = ["noise", "GZW-002-A and QRS1234", "12 AB 345", "AB-123-CD", "nothing here at all"];
    let extractor = PlateExtractor::new(&ExtractorConfig::default().with_vendor_tokens()).unwrap();
    for text in texts {
        let result = extractor.extract(vec![observe(text, 0.3, "center-region@psm11")]).unwrap();
        assert_eq!(result.best_plate.is_some(), !result.candidates.is_empty());
        if let Some(best) = &result.best_plate {
            assert_eq!(best, &result.candidates[0].plate);
        }
    }
}

#[test]
fn test_selection_layer_over_readings() {
    let readings = vec![
        PlateReading {
            plate: Some("ABC-12-34".to_string()),
            confidence: 0.05,
            source_label: "upscaled@psm7".to_string(),
        },
        PlateReading {
            plate: Some("ABC-12-84".to_string()),
            confidence: 0.01,
            source_label: "focused@psm7".to_string(),
        },
        PlateReading {
            plate: None,
            confidence: 0.7,
            source_label: "full@psm11".to_string(),
        },
    ];
    let selection = select_reading(&readings).unwrap();
    assert_eq!(selection.stage, SelectionStage::AnyValidated);
    assert_eq!(selection.reading.source_label, "focused@psm7");
}

#[test]
fn test_config_builds_reader() {
    let config = PlatescanConfig::default();
    let reader = config.build_reader().unwrap();
    assert!(!reader.is_ready());
}
