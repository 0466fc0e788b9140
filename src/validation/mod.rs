//! Consistency checks for emitted COCO documents and split lists.
//!
//! Document checks cover id uniqueness, references between records, image
//! dimensions and box geometry. Split checks cover disjointness of train,
//! val and test and coverage of the image set.

mod report;

pub use report::{IssueCode, IssueContext, Severity, ValidationIssue, ValidationReport};

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::ir::{AnnotationId, CategoryId, Dataset, ImageId, LicenseId};

/// Pixel slack allowed on box bounds and stored areas.
pub const GEOMETRY_TOLERANCE: f64 = 0.5;

#[derive(Clone, Debug, Default)]
pub struct ValidateOptions {
    /// Treat warnings as errors.
    pub strict: bool,
}

/// Validates a COCO document.
pub fn validate_dataset(dataset: &Dataset, _opts: &ValidateOptions) -> ValidationReport {
    let mut report = ValidationReport::new();

    let image_ids: HashSet<ImageId> = dataset.images.iter().map(|i| i.id).collect();
    let category_ids: HashSet<CategoryId> = dataset.categories.iter().map(|c| c.id).collect();

    validate_images(dataset, &mut report);
    validate_categories(dataset, &mut report);
    validate_annotations(dataset, &image_ids, &category_ids, &mut report);

    report
}

fn validate_images(dataset: &Dataset, report: &mut ValidationReport) {
    let license_ids: HashSet<LicenseId> = dataset.licenses.iter().map(|l| l.id).collect();
    let mut seen_ids: HashMap<ImageId, usize> = HashMap::new();
    let mut seen_names: HashMap<&str, ImageId> = HashMap::new();

    for (idx, image) in dataset.images.iter().enumerate() {
        let id = image.id.as_u64();

        if let Some(first_idx) = seen_ids.get(&image.id) {
            report.add(ValidationIssue::error(
                IssueCode::DuplicateImageId,
                format!("duplicate image id {id} (first seen at index {first_idx})"),
                IssueContext::Image { id },
            ));
        } else {
            seen_ids.insert(image.id, idx);
        }

        if image.width == 0 || image.height == 0 {
            report.add(ValidationIssue::error(
                IssueCode::InvalidImageDimensions,
                format!("invalid dimensions {}x{}", image.width, image.height),
                IssueContext::Image { id },
            ));
        }

        if image.file_name.is_empty() {
            report.add(ValidationIssue::warning(
                IssueCode::EmptyFileName,
                "empty file_name",
                IssueContext::Image { id },
            ));
        } else if let Some(other) = seen_names.get(image.file_name.as_str()) {
            report.add(ValidationIssue::warning(
                IssueCode::DuplicateFileName,
                format!("file_name '{}' also used by image {other}", image.file_name),
                IssueContext::Image { id },
            ));
        } else {
            seen_names.insert(&image.file_name, image.id);
        }

        if let Some(license_id) = image.license_id {
            if !license_ids.contains(&license_id) {
                report.add(ValidationIssue::warning(
                    IssueCode::MissingLicenseRef,
                    format!("references non-existent license {license_id}"),
                    IssueContext::Image { id },
                ));
            }
        }
    }
}

fn validate_categories(dataset: &Dataset, report: &mut ValidationReport) {
    if dataset.categories.is_empty() {
        report.add(ValidationIssue::warning(
            IssueCode::NoCategories,
            "document defines no categories",
            IssueContext::Dataset,
        ));
    }

    let mut seen_ids: HashSet<CategoryId> = HashSet::new();
    for category in &dataset.categories {
        let id = category.id.as_u64();

        if !seen_ids.insert(category.id) {
            report.add(ValidationIssue::error(
                IssueCode::DuplicateCategoryId,
                format!("duplicate category id {id}"),
                IssueContext::Category { id },
            ));
        }

        if category.name.trim().is_empty() {
            report.add(ValidationIssue::warning(
                IssueCode::EmptyCategoryName,
                "empty category name",
                IssueContext::Category { id },
            ));
        }
    }
}

fn validate_annotations(
    dataset: &Dataset,
    image_ids: &HashSet<ImageId>,
    category_ids: &HashSet<CategoryId>,
    report: &mut ValidationReport,
) {
    let mut seen_ids: HashSet<AnnotationId> = HashSet::new();
    let image_dims: HashMap<ImageId, (u32, u32)> = dataset
        .images
        .iter()
        .map(|i| (i.id, (i.width, i.height)))
        .collect();

    for annotation in &dataset.annotations {
        let id = annotation.id.as_u64();
        let context = || IssueContext::Annotation { id };

        if !seen_ids.insert(annotation.id) {
            report.add(ValidationIssue::error(
                IssueCode::DuplicateAnnotationId,
                format!("duplicate annotation id {id}"),
                context(),
            ));
        }

        if !image_ids.contains(&annotation.image_id) {
            report.add(ValidationIssue::error(
                IssueCode::MissingImageRef,
                format!("references non-existent image {}", annotation.image_id),
                context(),
            ));
        }

        if !category_ids.contains(&annotation.category_id) {
            report.add(ValidationIssue::error(
                IssueCode::MissingCategoryRef,
                format!("references non-existent category {}", annotation.category_id),
                context(),
            ));
        }

        let bbox = &annotation.bbox;
        if !bbox.is_finite() || !annotation.area.is_finite() {
            report.add(ValidationIssue::error(
                IssueCode::BBoxNotFinite,
                format!("non-finite bbox {:?} or area {}", bbox.to_xywh(), annotation.area),
                context(),
            ));
            continue;
        }

        if bbox.width() < 0.0 || bbox.height() < 0.0 {
            report.add(ValidationIssue::error(
                IssueCode::BBoxNegativeSize,
                format!("negative size {}x{}", bbox.width(), bbox.height()),
                context(),
            ));
        } else if bbox.area() <= 0.0 {
            report.add(ValidationIssue::warning(
                IssueCode::InvalidBBoxArea,
                format!("zero-area bbox {:?}", bbox.to_xywh()),
                context(),
            ));
        }

        if (annotation.area - bbox.area()).abs() > GEOMETRY_TOLERANCE {
            report.add(ValidationIssue::warning(
                IssueCode::AreaMismatch,
                format!(
                    "area {} differs from bbox width*height {}",
                    annotation.area,
                    bbox.area()
                ),
                context(),
            ));
        }

        if let Some(&(width, height)) = image_dims.get(&annotation.image_id) {
            let (w, h) = (width as f64, height as f64);
            if bbox.x() < -GEOMETRY_TOLERANCE
                || bbox.y() < -GEOMETRY_TOLERANCE
                || bbox.xmax() > w + GEOMETRY_TOLERANCE
                || bbox.ymax() > h + GEOMETRY_TOLERANCE
            {
                report.add(ValidationIssue::error(
                    IssueCode::BBoxOutOfBounds,
                    format!(
                        "bbox {:?} extends outside image bounds {width}x{height}",
                        bbox.to_xywh()
                    ),
                    context(),
                ));
            }
        }
    }
}

/// Names whose lists are expected to be pairwise disjoint.
pub const DISJOINT_SPLITS: [&str; 3] = ["train", "val", "test"];

/// Checks split lists against each other and, when given, the image set.
///
/// `splits` pairs each split name with its stems as read from disk.
/// Overlap is only checked between the names in [`DISJOINT_SPLITS`]; derived
/// lists such as `train_val` overlap by construction. Coverage is checked
/// when `all_stems` is given and at least one disjoint split is present.
pub fn validate_splits(
    splits: &[(String, Vec<String>)],
    all_stems: Option<&[String]>,
) -> ValidationReport {
    let mut report = ValidationReport::new();

    // stem -> disjoint splits that list it, in a stable order.
    let mut owners: BTreeMap<&str, Vec<&str>> = BTreeMap::new();

    for (name, stems) in splits {
        if stems.is_empty() {
            report.add(ValidationIssue::warning(
                IssueCode::EmptySplit,
                "split lists no images",
                IssueContext::Split { name: name.clone() },
            ));
        }

        let mut seen: HashSet<&str> = HashSet::new();
        for stem in stems {
            if !seen.insert(stem.as_str()) {
                report.add(ValidationIssue::warning(
                    IssueCode::DuplicateStem,
                    format!("'{stem}' listed more than once"),
                    IssueContext::Split { name: name.clone() },
                ));
            }
        }

        if DISJOINT_SPLITS.contains(&name.as_str()) {
            for stem in seen {
                owners.entry(stem).or_default().push(name.as_str());
            }
        }
    }

    for (stem, names) in &owners {
        if names.len() > 1 {
            report.add(ValidationIssue::error(
                IssueCode::SplitOverlap,
                format!("listed in {}", names.join(", ")),
                IssueContext::Stem {
                    stem: stem.to_string(),
                },
            ));
        }
    }

    let has_disjoint = splits
        .iter()
        .any(|(name, _)| DISJOINT_SPLITS.contains(&name.as_str()));

    if let Some(all_stems) = all_stems {
        let known: HashSet<&str> = all_stems.iter().map(String::as_str).collect();

        let mut unknown: Vec<&str> = splits
            .iter()
            .flat_map(|(_, stems)| stems.iter().map(String::as_str))
            .filter(|stem| !known.contains(stem))
            .collect();
        unknown.sort_unstable();
        unknown.dedup();
        for stem in unknown {
            report.add(ValidationIssue::error(
                IssueCode::UnknownStem,
                "no matching image",
                IssueContext::Stem {
                    stem: stem.to_string(),
                },
            ));
        }

        if has_disjoint {
            let mut uncovered: Vec<&str> = known
                .iter()
                .copied()
                .filter(|stem| !owners.contains_key(stem))
                .collect();
            uncovered.sort_unstable();
            for stem in uncovered {
                report.add(ValidationIssue::warning(
                    IssueCode::StemNotInAnySplit,
                    "image is not assigned to train, val or test",
                    IssueContext::Stem {
                        stem: stem.to_string(),
                    },
                ));
            }
        }
    }

    report
}
