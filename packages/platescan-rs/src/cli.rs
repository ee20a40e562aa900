//! Command line arguments backing the `platescan` binary.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
  name = "platescan",
  about = "Read license plates out of vehicle photos and noisy OCR text",
  version
)]
pub struct Args {
  /// Configuration file (TOML)
  #[arg(long, short = 'c', global = true)]
  pub config: Option<PathBuf>,

  /// Log debug output to stderr
  #[arg(long, short = 'v', global = true)]
  pub verbose: bool,

  #[command(subcommand)]
  pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
  /// Print version information
  Version,
  /// Extract and rank plate candidates from OCR text
  Extract {
    /// OCR text, one observation per argument
    texts: Vec<String>,

    /// JSON file with an array of {text, confidence, source_label} observations
    #[arg(long, short = 'o')]
    observations: Option<PathBuf>,

    /// Minimum trimmed length for a text to be considered
    #[arg(long)]
    min_length: Option<usize>,

    /// Use the single-field threshold (5 characters)
    #[arg(long, conflicts_with = "min_length")]
    single_field: bool,

    /// Extra substring to strip before matching (repeatable)
    #[arg(long = "deny", value_name = "TOKEN")]
    deny: Vec<String>,

    /// Also strip known dealer/photographer names
    #[arg(long)]
    vendor_denylist: bool,

    /// Print the full result as JSON
    #[arg(long)]
    json: bool,
  },
  /// Run the full detection + OCR pipeline on one image
  Read {
    /// Vehicle photo
    image: PathBuf,

    /// Write variants and the report of this run under this directory
    #[arg(long)]
    debug_dir: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
  },
  /// List the sample images in a directory, optionally reading each one
  Gallery {
    /// Directory holding sample photos
    #[arg(default_value = "samples")]
    dir: PathBuf,

    /// Run the pipeline on every image
    #[arg(long)]
    read: bool,
  },
}
