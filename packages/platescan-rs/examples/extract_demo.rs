use anyhow::Result;
use platescan_rs::prelude::*;

fn main() -> Result<()> {
    // OCR output for the same photo under different filters and page modes
    let observations = vec![
        OcrObservation::new("platesmania.com NCM-27-04 www.", 0.41, "focused@psm7")?,
        OcrObservation::new("NCM 2704", 0.38, "high_contrast@psm7")?,
        OcrObservation::new("NCM-27-0A", 0.12, "edge_enhanced@psm11")?,
        OcrObservation::new("www.", 0.90, "full@psm11")?,
    ];

    let result = extract(observations, 6, DEFAULT_DENYLIST)?;

    println!("Observations: {}", result.all_observations.len());
    println!("Candidates:");
    println!("{}", "=".repeat(60));
    for (i, candidate) in result.candidates.iter().enumerate() {
        println!(
            "{}. {} (score: {}, {} from {})",
            i + 1,
            candidate.plate,
            candidate.score,
            candidate.pattern.name(),
            candidate.source_label
        );
    }
    println!();

    match &result.best_plate {
        Some(plate) => println!("Best plate: {}", plate),
        None => println!("No plate found"),
    }

    // Per-variant readings go through the selection policy
    let readings = vec![
        PlateReading {
            plate: Some("NCM-27-04".to_string()),
            confidence: 0.41,
            source_label: "focused@psm7".to_string(),
        },
        PlateReading {
            plate: Some("NCM-27-0A".to_string()),
            confidence: 0.48,
            source_label: "upscaled@psm7".to_string(),
        },
    ];
    if let Some(selection) = select_reading(&readings) {
        println!(
            "Selected reading: {:?} from {} ({:?})",
            selection.reading.plate, selection.reading.source_label, selection.stage
        );
    }

    Ok(())
}
