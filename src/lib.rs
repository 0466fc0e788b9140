//! orchardlabel: YOLO to COCO conversion for the AppleBBCH81 orchard dataset.
//!
//! The dataset keeps YOLO labels as the source of truth. This crate derives
//! COCO documents from them, partitions the images into train/val/test
//! lists, and checks both for consistency.
//!
//! # Modules
//!
//! - [`ir`]: COCO record types, typed boxes, YOLO/COCO/split-list I/O
//! - [`assemble`]: builds a COCO document from labels and image headers
//! - [`split`]: train/val/test partitioning
//! - [`conversion`]: multi-split conversion runs and their reports
//! - [`profile`]: dataset metadata and id configuration
//! - [`validation`]: document and split-list checks
//! - [`error`]: error type

pub mod assemble;
pub mod conversion;
pub mod error;
pub mod ir;
pub mod profile;
pub mod split;
pub mod validation;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

pub use error::OrchardError;

use assemble::AssembleOptions;
use conversion::{ConversionReport, ConvertOptions, SplitSelection};
use ir::io_yolo::LinePolicy;
use profile::DatasetProfile;
use split::{SplitMode, SplitRatios, DEFAULT_SEED};
use validation::ValidationReport;

#[derive(Parser)]
#[command(name = "orchardlabel")]
#[command(version, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Partition the images into train/val/test split lists.
    Split(SplitArgs),
    /// Convert YOLO labels into COCO documents.
    Convert(ConvertArgs),
    /// Validate a COCO document.
    Validate(ValidateArgs),
    /// Check split lists for overlap and coverage.
    CheckSplits(CheckSplitsArgs),
}

#[derive(clap::Args)]
struct SplitArgs {
    /// Directory containing the images.
    #[arg(long)]
    images: PathBuf,

    /// Directory to write the split lists to.
    #[arg(long)]
    out: PathBuf,

    #[arg(long, default_value_t = 0.8)]
    train: f64,

    #[arg(long, default_value_t = 0.1)]
    val: f64,

    #[arg(long, default_value_t = 0.1)]
    test: f64,

    /// Shuffle seed.
    #[arg(long, conflicts_with = "sorted")]
    seed: Option<u64>,

    /// Cut the sorted image list without shuffling.
    #[arg(long)]
    sorted: bool,
}

#[derive(clap::Args)]
struct ConvertArgs {
    /// Directory containing the images.
    #[arg(long)]
    images: PathBuf,

    /// Directory containing the YOLO label files.
    #[arg(long)]
    labels: PathBuf,

    /// Directory to write COCO documents to.
    #[arg(long)]
    out: PathBuf,

    /// Split lists to convert. Without this, every image goes into one
    /// `all` document.
    #[arg(long, num_args = 1..)]
    splits: Vec<String>,

    /// Directory holding `<split>.txt` lists.
    #[arg(long, default_value = "sets")]
    split_dir: PathBuf,

    /// YAML dataset profile overriding the built-in metadata.
    #[arg(long, env = "ORCHARDLABEL_PROFILE")]
    profile: Option<PathBuf>,

    /// Record malformed label lines and continue instead of failing.
    #[arg(long)]
    skip_malformed: bool,

    /// Fail when an image is missing or its size cannot be read.
    #[arg(long)]
    strict: bool,

    /// Write one document per image instead of one per split.
    #[arg(long)]
    per_image: bool,

    /// Format of the conversion report printed to stdout.
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    report: ReportFormat,
}

#[derive(clap::Args)]
struct ValidateArgs {
    /// COCO JSON file to validate.
    input: PathBuf,

    /// Treat warnings as errors.
    #[arg(long)]
    strict: bool,

    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    output: ReportFormat,
}

#[derive(clap::Args)]
struct CheckSplitsArgs {
    /// Directory holding `<split>.txt` lists.
    #[arg(long)]
    split_dir: PathBuf,

    #[arg(long, num_args = 1.., default_values = ["train", "val", "test"])]
    splits: Vec<String>,

    /// Image directory to check coverage against.
    #[arg(long)]
    images: Option<PathBuf>,

    /// Treat warnings as errors.
    #[arg(long)]
    strict: bool,

    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    output: ReportFormat,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Text,
    Json,
}

/// Runs the CLI. Called from `main.rs`.
pub fn run() -> Result<(), OrchardError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Split(args) => run_split(args),
        Commands::Convert(args) => run_convert(args),
        Commands::Validate(args) => run_validate(args),
        Commands::CheckSplits(args) => run_check_splits(args),
    }
}

fn run_split(args: SplitArgs) -> Result<(), OrchardError> {
    let ratios = SplitRatios::new(args.train, args.val, args.test)?;
    let mode = if args.sorted {
        SplitMode::Sorted
    } else {
        SplitMode::Seeded(args.seed.unwrap_or(DEFAULT_SEED))
    };

    let stems = split::collect_image_stems(&args.images)?;
    let splits = split::generate_splits(&stems, &ratios, mode)?;
    split::write_split_lists(&args.out, &splits)?;

    println!(
        "Split {} image(s): train {}, val {}, test {} -> {}",
        splits.all.len(),
        splits.train.len(),
        splits.val.len(),
        splits.test.len(),
        args.out.display()
    );
    Ok(())
}

fn run_convert(args: ConvertArgs) -> Result<(), OrchardError> {
    let profile = match &args.profile {
        Some(path) => DatasetProfile::from_yaml_file(path)?,
        None => DatasetProfile::default(),
    };

    let splits = if args.splits.is_empty() {
        None
    } else {
        Some(SplitSelection {
            names: args.splits,
            split_dir: args.split_dir,
        })
    };

    let opts = ConvertOptions {
        images_dir: args.images,
        labels_dir: args.labels,
        out_dir: args.out,
        splits,
        per_image: args.per_image,
        assemble: AssembleOptions {
            line_policy: if args.skip_malformed {
                LinePolicy::Skip
            } else {
                LinePolicy::Abort
            },
            strict_images: args.strict,
        },
    };

    let outcome = conversion::convert_dataset(&opts, &profile)?;
    print_conversion_reports(&outcome.reports, args.report)
}

fn print_conversion_reports(
    reports: &[ConversionReport],
    format: ReportFormat,
) -> Result<(), OrchardError> {
    match format {
        ReportFormat::Json => print_json(reports),
        ReportFormat::Text => {
            for report in reports {
                print!("{report}");
            }
            Ok(())
        }
    }
}

fn run_validate(args: ValidateArgs) -> Result<(), OrchardError> {
    let dataset = ir::io_coco_json::read_coco_json(&args.input)?;
    let opts = validation::ValidateOptions {
        strict: args.strict,
    };
    let report = validation::validate_dataset(&dataset, &opts);
    finish_validation(report, args.strict, args.output)
}

fn run_check_splits(args: CheckSplitsArgs) -> Result<(), OrchardError> {
    let splits = args
        .splits
        .iter()
        .map(|name| {
            let path = ir::io_splits::split_list_path(&args.split_dir, name);
            Ok((name.clone(), ir::io_splits::read_split_list(&path)?))
        })
        .collect::<Result<Vec<_>, OrchardError>>()?;

    let all_stems = args
        .images
        .as_deref()
        .map(split::collect_image_stems)
        .transpose()?;

    let report = validation::validate_splits(&splits, all_stems.as_deref());
    finish_validation(report, args.strict, args.output)
}

fn finish_validation(
    report: ValidationReport,
    strict: bool,
    format: ReportFormat,
) -> Result<(), OrchardError> {
    match format {
        ReportFormat::Json => print_json(&serde_json::json!({
            "error_count": report.error_count(),
            "warning_count": report.warning_count(),
            "issues": &report.issues,
        }))?,
        ReportFormat::Text => print!("{report}"),
    }

    if report.passes(strict) {
        Ok(())
    } else {
        Err(OrchardError::ValidationFailed {
            error_count: report.error_count(),
            warning_count: report.warning_count(),
            report,
        })
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), OrchardError> {
    let text = serde_json::to_string_pretty(value).map_err(OrchardError::ReportSerialize)?;
    println!("{text}");
    Ok(())
}
