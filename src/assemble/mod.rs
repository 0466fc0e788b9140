//! COCO assembly: YOLO boxes plus image dimensions in, one COCO document out.
//!
//! # Identifier Assignment
//!
//! Images are ordered by stem before anything is read. An image's id is
//! `image_id_offset + index` in that order, fixed before loading starts, so
//! the parallel loading phase cannot influence it. An image that turns out
//! to be unreadable leaves its id unused rather than shifting later ones.
//!
//! Annotation ids are handed out after loading, walking images in id order
//! and boxes in label-file line order.

use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::conversion::{ConversionCounts, ConversionIssue, ConversionIssueCode, ConversionReport};
use crate::error::OrchardError;
use crate::ir::io_yolo::{
    find_image_for_stem, label_path_for, load_boxes, read_image_dimensions, LinePolicy,
    SourceImage, YoloBox,
};
use crate::ir::{Annotation, BBox, Clamped, Dataset, Image, ImageId, Pixel};
use crate::profile::DatasetProfile;

/// Knobs for a single assembly run.
#[derive(Clone, Copy, Debug, Default)]
pub struct AssembleOptions {
    pub line_policy: LinePolicy,

    /// Abort the split when an image is missing or unreadable instead of
    /// omitting it.
    pub strict_images: bool,
}

/// An image position in a split. `path` is `None` when no file was found.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageSlot {
    pub stem: String,
    pub path: Option<PathBuf>,
}

impl From<SourceImage> for ImageSlot {
    fn from(image: SourceImage) -> Self {
        Self {
            stem: image.stem,
            path: Some(image.path),
        }
    }
}

/// Turns a split list into ordered image slots.
///
/// Stems are sorted and de-duplicated; duplicates are reported.
pub fn resolve_split(
    images_dir: &Path,
    stems: &[String],
    report: &mut ConversionReport,
) -> Vec<ImageSlot> {
    let mut sorted: Vec<&String> = stems.iter().collect();
    sorted.sort();

    let mut slots: Vec<ImageSlot> = Vec::with_capacity(sorted.len());
    for stem in sorted {
        if slots.last().is_some_and(|last| &last.stem == stem) {
            report.add(ConversionIssue::warning(
                ConversionIssueCode::DuplicateStem,
                format!("'{stem}' is listed more than once; keeping one entry"),
            ));
            continue;
        }
        slots.push(ImageSlot {
            stem: stem.clone(),
            path: find_image_for_stem(images_dir, stem),
        });
    }
    slots
}

struct LoadedImage {
    file_name: String,
    width: u32,
    height: u32,
    label_path: PathBuf,
    boxes: Vec<YoloBox>,
    issues: Vec<ConversionIssue>,
}

fn load_slot(
    slot: &ImageSlot,
    images_dir: &Path,
    labels_dir: &Path,
    policy: LinePolicy,
) -> Result<LoadedImage, OrchardError> {
    let Some(path) = &slot.path else {
        return Err(OrchardError::MissingImageDimensions {
            path: images_dir.join(&slot.stem),
            message: "no image file found for this stem".to_string(),
        });
    };

    let (width, height) = read_image_dimensions(path)?;
    let label_path = label_path_for(labels_dir, &slot.stem);

    let mut issues = Vec::new();
    let boxes = load_boxes(&label_path, policy, &mut issues)?;

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| slot.stem.clone());

    debug!("{file_name}: {width}x{height}, {} box(es)", boxes.len());
    Ok(LoadedImage {
        file_name,
        width,
        height,
        label_path,
        boxes,
        issues,
    })
}

/// Builds the COCO document for one split.
///
/// `slots` must already be in id order (see [`resolve_split`]).
pub fn assemble_split(
    split: &str,
    slots: &[ImageSlot],
    images_dir: &Path,
    labels_dir: &Path,
    profile: &DatasetProfile,
    opts: &AssembleOptions,
) -> Result<(Dataset, ConversionReport), OrchardError> {
    let report = ConversionReport::new(split);
    assemble_into(split, slots, images_dir, labels_dir, profile, opts, report)
}

/// Like [`assemble_split`], continuing a report that already holds
/// resolution issues.
pub fn assemble_into(
    split: &str,
    slots: &[ImageSlot],
    images_dir: &Path,
    labels_dir: &Path,
    profile: &DatasetProfile,
    opts: &AssembleOptions,
    mut report: ConversionReport,
) -> Result<(Dataset, ConversionReport), OrchardError> {
    report.listed_images = slots.len();

    let loaded: Vec<Result<LoadedImage, OrchardError>> = slots
        .par_iter()
        .map(|slot| load_slot(slot, images_dir, labels_dir, opts.line_policy))
        .collect();

    let mut dataset = Dataset {
        info: profile.dataset_info(),
        licenses: vec![profile.license()],
        categories: profile.coco_categories(),
        ..Default::default()
    };

    let first_image_id = profile.first_image_id();
    let first_annotation_id = profile.first_annotation_id();

    for (index, outcome) in loaded.into_iter().enumerate() {
        let image = match outcome {
            Ok(image) => image,
            Err(OrchardError::MissingImageDimensions { path, message }) if !opts.strict_images => {
                warn!("omitting {}: {}", path.display(), message);
                report.add(
                    ConversionIssue::warning(ConversionIssueCode::MissingImage, message)
                        .at(&path, None),
                );
                continue;
            }
            Err(err) => return Err(err),
        };

        let image_id = first_image_id.checked_offset(index).ok_or_else(|| {
            OrchardError::config(format!(
                "image id overflows u64: image_id_offset {first_image_id} + {index}"
            ))
        })?;
        report.extend(image.issues.iter().cloned());

        let mut record = Image::new(image_id, image.file_name.clone(), image.width, image.height)
            .with_license(profile.license_id());
        if let Some(date) = &profile.date_captured {
            record = record.with_date_captured(date.clone());
        }
        dataset.images.push(record);

        for yolo in &image.boxes {
            let Some(category_id) = profile.category_for_class(yolo.class_id) else {
                let message = format!(
                    "class_id {} is out of range for {} categor(ies)",
                    yolo.class_id,
                    profile.categories.len()
                );
                match opts.line_policy {
                    LinePolicy::Abort => {
                        return Err(OrchardError::MalformedLabelLine {
                            path: image.label_path.clone(),
                            line: yolo.line,
                            message,
                        })
                    }
                    LinePolicy::Skip => {
                        report.add(
                            ConversionIssue::warning(
                                ConversionIssueCode::SkippedMalformedLine,
                                message,
                            )
                            .at(&image.label_path, Some(yolo.line)),
                        );
                        continue;
                    }
                }
            };

            let Some(bbox) = place_box(yolo, &image, image_id, &mut report) else {
                continue;
            };

            let count = dataset.annotations.len();
            let annotation_id = first_annotation_id.checked_offset(count).ok_or_else(|| {
                OrchardError::config(format!(
                    "annotation id overflows u64: annotation_id_offset {first_annotation_id} + {count}"
                ))
            })?;
            dataset
                .annotations
                .push(Annotation::new(annotation_id, image_id, category_id, bbox));
        }
    }

    report.output = ConversionCounts {
        images: dataset.images.len(),
        categories: dataset.categories.len(),
        annotations: dataset.annotations.len(),
    };

    info!(
        "[{split}] {} image(s), {} annotation(s)",
        report.output.images, report.output.annotations
    );
    Ok((dataset, report))
}

/// Converts a YOLO box to pixels and clamps it to the image.
fn place_box(
    yolo: &YoloBox,
    image: &LoadedImage,
    image_id: ImageId,
    report: &mut ConversionReport,
) -> Option<BBox<Pixel>> {
    let (w, h) = (image.width as f64, image.height as f64);
    let pixel = yolo.bbox().to_pixel(w, h);

    match pixel.clamp_to(w, h) {
        Clamped::Inside(bbox) => Some(bbox),
        Clamped::Clipped(bbox) => {
            report.add(
                ConversionIssue::info(
                    ConversionIssueCode::ClampedBox,
                    format!(
                        "box on image {image_id} clamped from {:?} to {:?}",
                        pixel.to_xywh(),
                        bbox.to_xywh()
                    ),
                )
                .at(&image.label_path, Some(yolo.line)),
            );
            Some(bbox)
        }
        Clamped::Outside => {
            report.add(
                ConversionIssue::warning(
                    ConversionIssueCode::DroppedBox,
                    format!("box on image {image_id} has no area inside the image; dropped"),
                )
                .at(&image.label_path, Some(yolo.line)),
            );
            None
        }
    }
}

/// One single-image document per image of `dataset`.
///
/// Ids are kept as assigned for the whole set. Returns `(stem, document)`
/// pairs in image id order.
pub fn assemble_per_image(dataset: &Dataset) -> Vec<(String, Dataset)> {
    let mut images: Vec<&Image> = dataset.images.iter().collect();
    images.sort_by_key(|img| img.id);

    images
        .into_iter()
        .map(|image| {
            let stem = Path::new(&image.file_name)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| image.file_name.clone());

            let doc = Dataset {
                info: dataset.info.clone(),
                licenses: dataset.licenses.clone(),
                images: vec![image.clone()],
                categories: dataset.categories.clone(),
                annotations: dataset.annotations_for(image.id).cloned().collect(),
            };
            (stem, doc)
        })
        .collect()
}
