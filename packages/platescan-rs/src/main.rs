mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Args, Commands};
use platescan_rs::prelude::*;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
  let args = Args::parse();
  init_logging(args.verbose);

  if let Err(e) = run(args).await {
    eprintln!("Error: {:#}", e);
    std::process::exit(1);
  }
}

fn init_logging(verbose: bool) {
  let default_level = if verbose { "debug" } else { "info" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_target(false)
    .init();
}

async fn run(args: Args) -> Result<()> {
  let config = PlatescanConfig::load_or_default(args.config.as_deref())?;

  match args.command {
    Commands::Version => {
      println!("platescan {}", env!("CARGO_PKG_VERSION"));
      Ok(())
    }
    Commands::Extract {
      texts,
      observations,
      min_length,
      single_field,
      deny,
      vendor_denylist,
      json,
    } => {
      let mut settings = config.extractor.clone();
      if single_field {
        settings.min_length = ExtractorConfig::single_field().min_length;
      }
      if let Some(min_length) = min_length {
        settings.min_length = min_length;
      }
      if vendor_denylist {
        settings = settings.with_vendor_tokens();
      }
      settings.denylist.extend(deny);

      let mut pool = match observations {
        Some(path) => load_observations(&path)?,
        None => Vec::new(),
      };
      for (i, text) in texts.into_iter().enumerate() {
        pool.push(OcrObservation::new(text, 1.0, format!("arg{}", i + 1))?);
      }

      let extractor = PlateExtractor::new(&settings)?;
      let result = extractor.extract(pool)?;
      print_extraction(&result, json)
    }
    Commands::Read { image, debug_dir, json } => {
      let reader = config.build_reader()?.with_sink(Arc::new(TracingSink));
      let debug_dir = debug_dir.or_else(|| config.pipeline.debug_dir.clone());
      let report = read_one(&reader, &image, debug_dir.as_deref()).await?;
      print_report(&report, json)
    }
    Commands::Gallery { dir, read } => {
      let images = list_images(&dir);
      if images.is_empty() {
        println!("No images found in {}", dir.display());
        return Ok(());
      }
      if !read {
        for image in &images {
          println!("{}", image.display());
        }
        return Ok(());
      }

      let reader = config.build_reader()?;
      for image in &images {
        match read_one(&reader, image, config.pipeline.debug_dir.as_deref()).await {
          Ok(report) => println!("{}\t{}", image.display(), report.plate.as_deref().unwrap_or("-")),
          Err(e) => {
            warn!("Failed to read {}: {:#}", image.display(), e);
            println!("{}\t!", image.display());
          }
        }
      }
      Ok(())
    }
  }
}

fn load_observations(path: &Path) -> Result<Vec<OcrObservation>> {
  let contents =
    std::fs::read_to_string(path).with_context(|| format!("Failed to read observations from {}", path.display()))?;
  serde_json::from_str(&contents).with_context(|| format!("Malformed observations in {}", path.display()))
}

async fn read_one(reader: &PlateReader, image: &Path, debug_dir: Option<&Path>) -> Result<PlateReport> {
  let report = reader
    .read_path(image)
    .await
    .with_context(|| format!("Failed to read plate from {}", image.display()))?;

  if let Some(base) = debug_dir {
    let stem = image.file_stem().and_then(|s| s.to_str());
    let artifacts = RunArtifacts::create(base, stem).await?;
    artifacts.write(&report).await?;
    info!("Debug artifacts written to {}", artifacts.dir().display());
  }
  Ok(report)
}

fn print_extraction(result: &ExtractionResult, json: bool) -> Result<()> {
  if json {
    println!("{}", serde_json::to_string_pretty(result)?);
    return Ok(());
  }
  match result.best() {
    Some(best) => {
      println!("{} (score {})", best.plate, best.score);
      for candidate in result.candidates.iter().skip(1) {
        println!(
          "  {} {} [{} from {}]",
          candidate.score,
          candidate.plate,
          candidate.pattern.name(),
          candidate.source_label
        );
      }
    }
    None => println!("No plate found"),
  }
  Ok(())
}

fn print_report(report: &PlateReport, json: bool) -> Result<()> {
  if json {
    println!("{}", serde_json::to_string_pretty(report)?);
    return Ok(());
  }
  match &report.plate {
    Some(plate) => println!("{}", plate),
    None => println!("No plate found"),
  }
  if let Some(selection) = &report.selection {
    println!(
      "  selected {} ({:.2}, {:?})",
      selection.reading.source_label, selection.reading.confidence, selection.stage
    );
  }
  if let Some(best) = report.extraction.best() {
    println!("  top candidate {} (score {})", best.plate, best.score);
  }
  Ok(())
}
