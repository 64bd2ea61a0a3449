//! Landmarkit: anatomical landmark coordinate codec.
//!
//! Landmarkit maps landmark coordinates between the spaces an image passes
//! through on its way to a heatmap model and back (original pixels,
//! letterboxed or resized model input, downsampled heatmap grid), encodes
//! points as Gaussian training targets, decodes predicted heatmaps to
//! sub-pixel points, and validates labeled corpora before they are trusted.
//!
//! # Modules
//!
//! - [`ir`]: Keypoints, coordinate-space markers, label and prediction files
//! - [`transform`]: Invertible coordinate transforms
//! - [`heatmap`]: Heatmap encoding and decoding
//! - [`validation`]: Corpus validation and issue reporting
//! - [`pipeline`]: Image to landmark inference around an external predictor
//! - [`config`]: Shared codec configuration
//! - [`prepare`], [`split`], [`eval`]: Corpus preparation and evaluation
//! - [`error`]: Error types for landmarkit operations

pub mod config;
pub mod error;
pub mod eval;
pub mod heatmap;
pub mod ir;
pub mod pipeline;
pub mod prepare;
pub mod split;
pub mod transform;
pub mod validation;

use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

pub use config::CodecConfig;
pub use error::LandmarkError;

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "LANDMARKIT_LOG";

/// The landmarkit CLI application.
#[derive(Parser)]
#[command(name = "landmarkit")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    /// Codec configuration file (YAML).
    #[arg(long, global = true, env = "LANDMARKIT_CONFIG")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Validate a labeled corpus and report every issue.
    Validate(ValidateArgs),
    /// Letterbox a validated corpus into model-ready images and labels.
    Prepare(PrepareArgs),
    /// Split a manifest into train.txt and val.txt.
    Split(SplitArgs),
    /// Compute Mean Radial Error of predictions against labels.
    Evaluate(EvaluateArgs),
}

/// Arguments for the validate subcommand.
#[derive(clap::Args)]
struct ValidateArgs {
    /// Directory of images.
    #[arg(long)]
    images: PathBuf,

    /// Directory of JSON label files.
    #[arg(long)]
    labels: PathBuf,

    /// Output format for the report ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,

    /// Also write the flat CSV cleaning report here.
    #[arg(long)]
    report_csv: Option<PathBuf>,

    /// Write the manifest of trusted pairs here.
    #[arg(long)]
    manifest: Option<PathBuf>,
}

/// Arguments for the prepare subcommand.
#[derive(clap::Args)]
struct PrepareArgs {
    /// Manifest written by `validate`.
    #[arg(long)]
    manifest: PathBuf,

    /// Output directory; receives images/ and labels/.
    #[arg(long)]
    out: PathBuf,
}

/// Arguments for the split subcommand.
#[derive(clap::Args)]
struct SplitArgs {
    /// Manifest written by `validate`.
    #[arg(long)]
    manifest: PathBuf,

    /// Output directory for train.txt and val.txt.
    #[arg(long)]
    out: PathBuf,

    /// Random seed.
    #[arg(long, default_value_t = split::DEFAULT_SEED)]
    seed: u64,

    /// Fraction of items held out for validation.
    #[arg(long, default_value_t = split::DEFAULT_VAL_RATIO)]
    val_ratio: f64,
}

/// Arguments for the evaluate subcommand.
#[derive(clap::Args)]
struct EvaluateArgs {
    /// Directory of prediction files (one JSON array of points per image).
    #[arg(long)]
    predictions: PathBuf,

    /// Directory of ground-truth label files.
    #[arg(long)]
    labels: PathBuf,

    /// Output format ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

/// Run the landmarkit CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), LandmarkError> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let Some(command) = cli.command else {
        println!("landmarkit {}", env!("CARGO_PKG_VERSION"));
        println!();
        println!("Anatomical landmark coordinate codec.");
        println!();
        println!("Run 'landmarkit --help' for usage information.");
        return Ok(());
    };

    let config = load_config(cli.config.as_deref())?;
    match command {
        Commands::Validate(args) => run_validate(args, &config),
        Commands::Prepare(args) => run_prepare(args, &config),
        Commands::Split(args) => run_split(args),
        Commands::Evaluate(args) => run_evaluate(args, &config),
    }
}

/// Installs the stderr subscriber. `LANDMARKIT_LOG` wins over `-v`.
fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    // A subscriber may already be installed when embedded; keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(path: Option<&Path>) -> Result<CodecConfig, LandmarkError> {
    match path {
        Some(path) => CodecConfig::load(path),
        None => Ok(CodecConfig::default()),
    }
}

fn check_output_format(output: &str) -> Result<(), LandmarkError> {
    match output {
        "text" | "json" => Ok(()),
        other => Err(LandmarkError::UnsupportedFormat(format!(
            "'{}' (supported: text, json)",
            other
        ))),
    }
}

fn to_json_stdout<T: serde::Serialize>(value: &T) -> Result<(), LandmarkError> {
    let json = serde_json::to_string_pretty(value).map_err(|source| LandmarkError::JsonWrite {
        path: PathBuf::from("<stdout>"),
        source,
    })?;
    println!("{}", json);
    Ok(())
}

/// Execute the validate subcommand.
fn run_validate(args: ValidateArgs, config: &CodecConfig) -> Result<(), LandmarkError> {
    check_output_format(&args.output)?;

    let opts = validation::ValidateOptions {
        num_keypoints: config.num_keypoints,
    };
    let outcome = validation::validate_corpus(&args.images, &args.labels, &opts)?;

    if let Some(path) = &args.report_csv {
        outcome.report.write_csv_file(path)?;
    }
    if let Some(path) = &args.manifest {
        outcome.manifest.write_json(path)?;
    }

    match args.output.as_str() {
        "json" => to_json_stdout(&outcome.report)?,
        _ => {
            print!("{}", outcome.report);
            println!("Trusted pairs: {}", outcome.manifest.len());
        }
    }

    if outcome.report.is_clean() {
        Ok(())
    } else {
        Err(LandmarkError::ValidationFailed {
            issue_count: outcome.report.len(),
            report: outcome.report,
        })
    }
}

/// Execute the prepare subcommand.
fn run_prepare(args: PrepareArgs, config: &CodecConfig) -> Result<(), LandmarkError> {
    let manifest = validation::DatasetManifest::read_json(&args.manifest)?;
    let summary = prepare::letterbox_corpus(
        &manifest,
        &args.out,
        config.model_input_size,
        config.num_keypoints,
    )?;
    println!(
        "Prepared {} pair(s) at {}x{}",
        summary.processed, config.model_input_size, config.model_input_size
    );
    println!("  images: {}", summary.images_dir.display());
    println!("  labels: {}", summary.labels_dir.display());
    Ok(())
}

/// Execute the split subcommand.
fn run_split(args: SplitArgs) -> Result<(), LandmarkError> {
    let manifest = validation::DatasetManifest::read_json(&args.manifest)?;
    let opts = split::SplitOptions {
        seed: args.seed,
        val_ratio: args.val_ratio,
    };
    let result = split::split_manifest(&manifest, &opts)?;
    let (train_path, val_path) = result.write_files(&args.out)?;
    println!("Train: {} -> {}", result.train.len(), train_path.display());
    println!("Val:   {} -> {}", result.val.len(), val_path.display());
    Ok(())
}

/// Execute the evaluate subcommand.
fn run_evaluate(args: EvaluateArgs, config: &CodecConfig) -> Result<(), LandmarkError> {
    check_output_format(&args.output)?;
    let report = eval::evaluate_dirs(&args.predictions, &args.labels, config.num_keypoints)?;
    match args.output.as_str() {
        "json" => to_json_stdout(&report),
        _ => {
            print!("{}", report);
            Ok(())
        }
    }
}
