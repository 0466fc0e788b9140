//! YOLO to COCO conversion over one or more splits.
//!
//! Every split of a run is assembled in memory before the first document is
//! written. A failure anywhere leaves the output directory untouched.

pub mod report;

pub use report::{
    ConversionCounts, ConversionIssue, ConversionIssueCode, ConversionReport, ConversionSeverity,
};

use std::path::{Path, PathBuf};

use log::info;

use crate::assemble::{assemble_into, assemble_per_image, resolve_split, AssembleOptions};
use crate::error::OrchardError;
use crate::ir::io_coco_json::write_coco_json;
use crate::ir::io_splits::{read_split_list, split_list_path};
use crate::ir::Dataset;
use crate::profile::DatasetProfile;
use crate::split::collect_image_stems;

/// Name of the document covering every image when no splits are selected.
pub const ALL_SPLIT: &str = "all";

/// Split lists to convert, read from `split_dir/<name>.txt`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SplitSelection {
    pub names: Vec<String>,
    pub split_dir: PathBuf,
}

#[derive(Clone, Debug)]
pub struct ConvertOptions {
    pub images_dir: PathBuf,
    pub labels_dir: PathBuf,
    pub out_dir: PathBuf,

    /// `None` converts every image into a single `all` document.
    pub splits: Option<SplitSelection>,

    /// Write one document per image under `<out_dir>/<split>/` instead of
    /// one document per split.
    pub per_image: bool,

    pub assemble: AssembleOptions,
}

/// What a finished conversion produced.
#[derive(Clone, Debug, Default)]
pub struct ConversionOutcome {
    pub reports: Vec<ConversionReport>,
    pub written: Vec<PathBuf>,
}

/// Stems for each split to convert, in the order given.
pub fn resolve_split_stems(
    images_dir: &Path,
    selection: Option<&SplitSelection>,
) -> Result<Vec<(String, Vec<String>)>, OrchardError> {
    match selection {
        None => Ok(vec![(ALL_SPLIT.to_string(), collect_image_stems(images_dir)?)]),
        Some(selection) => {
            if selection.names.is_empty() {
                return Err(OrchardError::config("no split names given"));
            }
            selection
                .names
                .iter()
                .map(|name| {
                    let stems = read_split_list(&split_list_path(&selection.split_dir, name))?;
                    Ok((name.clone(), stems))
                })
                .collect()
        }
    }
}

/// Converts the selected splits and writes their documents.
pub fn convert_dataset(
    opts: &ConvertOptions,
    profile: &DatasetProfile,
) -> Result<ConversionOutcome, OrchardError> {
    profile.check()?;
    if !opts.images_dir.is_dir() {
        return Err(OrchardError::config(format!(
            "image directory '{}' does not exist",
            opts.images_dir.display()
        )));
    }

    let split_stems = resolve_split_stems(&opts.images_dir, opts.splits.as_ref())?;

    let mut assembled: Vec<(String, Dataset)> = Vec::with_capacity(split_stems.len());
    let mut outcome = ConversionOutcome::default();
    for (name, stems) in &split_stems {
        let mut report = ConversionReport::new(name.as_str());
        let slots = resolve_split(&opts.images_dir, stems, &mut report);
        let (dataset, report) = assemble_into(
            name,
            &slots,
            &opts.images_dir,
            &opts.labels_dir,
            profile,
            &opts.assemble,
            report,
        )?;
        assembled.push((name.clone(), dataset));
        outcome.reports.push(report);
    }

    for (name, dataset) in &assembled {
        if opts.per_image {
            let dir = opts.out_dir.join(name);
            for (stem, doc) in assemble_per_image(dataset) {
                let path = dir.join(format!("{stem}.json"));
                write_coco_json(&path, &doc)?;
                outcome.written.push(path);
            }
            info!(
                "[{name}] wrote {} per-image document(s) to {}",
                dataset.images.len(),
                dir.display()
            );
        } else {
            let path = opts.out_dir.join(profile.output_file_name(name));
            write_coco_json(&path, dataset)?;
            info!("[{name}] wrote {}", path.display());
            outcome.written.push(path);
        }
    }

    Ok(outcome)
}
