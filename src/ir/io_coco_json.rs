//! COCO JSON reader and writer.
//!
//! COCO bounding boxes are `[x, y, width, height]` with `(x, y)` the top-left
//! corner in pixels, which is exactly how [`BBox<Pixel>`] stores them.
//!
//! # Deterministic Output
//!
//! The writer sorts every collection by id and emits fields in a fixed order,
//! so converting unchanged inputs twice produces byte-identical files.
//!
//! # Atomic Writes
//!
//! Documents are serialized into a temporary file next to the destination and
//! renamed into place only once fully written. A failed write leaves no
//! truncated JSON behind.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use super::model::{Annotation, Category, Dataset, DatasetInfo, Image, License};
use super::{AnnotationId, BBox, CategoryId, ImageId, LicenseId, Pixel};
use crate::error::OrchardError;

// ============================================================================
// COCO Schema Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct CocoDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    info: Option<CocoInfo>,

    #[serde(default)]
    licenses: Vec<CocoLicense>,

    images: Vec<CocoImage>,

    annotations: Vec<CocoAnnotation>,

    categories: Vec<CocoCategory>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CocoInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    year: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    contributor: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    date_created: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CocoLicense {
    id: u64,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CocoImage {
    id: u64,
    file_name: String,
    width: u32,
    height: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    license: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    date_captured: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CocoAnnotation {
    id: u64,
    image_id: u64,
    category_id: u64,

    /// `[x, y, width, height]`, `(x, y)` the top-left corner.
    bbox: [f64; 4],

    #[serde(default)]
    area: Option<f64>,

    #[serde(default)]
    iscrowd: Option<u8>,

    /// Always written as `[]`; accepted and ignored on read.
    #[serde(default)]
    segmentation: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct CocoCategory {
    id: u64,
    name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    supercategory: Option<String>,
}

// ============================================================================
// Public API
// ============================================================================

/// Reads a COCO JSON file.
pub fn read_coco_json(path: &Path) -> Result<Dataset, OrchardError> {
    let file = File::open(path).map_err(|err| OrchardError::read(path, err))?;
    let reader = BufReader::new(file);

    let coco: CocoDocument =
        serde_json::from_reader(reader).map_err(|source| OrchardError::CocoJsonParse {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(coco_to_ir(coco))
}

/// Writes `dataset` as pretty-printed COCO JSON, atomically.
///
/// Parent directories are created if missing.
pub fn write_coco_json(path: &Path, dataset: &Dataset) -> Result<(), OrchardError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|err| OrchardError::write(dir, err))?;

    let coco = ir_to_coco(dataset);
    let mut tmp = NamedTempFile::new_in(dir).map_err(|err| OrchardError::write(dir, err))?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        serde_json::to_writer_pretty(&mut writer, &coco).map_err(|source| {
            OrchardError::CocoJsonWrite {
                path: path.to_path_buf(),
                source,
            }
        })?;
        writer.flush().map_err(|err| OrchardError::write(path, err))?;
    }

    tmp.persist(path).map_err(|err| OrchardError::write(path, err.error))?;
    Ok(())
}

/// Parses COCO JSON from a string.
pub fn from_coco_str(json: &str) -> Result<Dataset, serde_json::Error> {
    let coco: CocoDocument = serde_json::from_str(json)?;
    Ok(coco_to_ir(coco))
}

/// Parses COCO JSON from raw bytes.
pub fn from_coco_slice(bytes: &[u8]) -> Result<Dataset, serde_json::Error> {
    let coco: CocoDocument = serde_json::from_slice(bytes)?;
    Ok(coco_to_ir(coco))
}

/// Renders `dataset` exactly as [`write_coco_json`] would write it.
pub fn to_coco_string(dataset: &Dataset) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&ir_to_coco(dataset))
}

// ============================================================================
// Conversion: COCO -> IR
// ============================================================================

fn coco_to_ir(coco: CocoDocument) -> Dataset {
    let info = coco
        .info
        .map(|info| DatasetInfo {
            description: info.description,
            version: info.version,
            year: info.year,
            contributor: info.contributor,
            date_created: info.date_created,
            url: info.url,
        })
        .unwrap_or_default();

    let licenses = coco
        .licenses
        .into_iter()
        .map(|l| License {
            id: LicenseId::new(l.id),
            name: l.name,
            url: l.url,
        })
        .collect();

    let images = coco
        .images
        .into_iter()
        .map(|img| Image {
            id: ImageId::new(img.id),
            file_name: img.file_name,
            width: img.width,
            height: img.height,
            license_id: img.license.map(LicenseId::new),
            date_captured: img.date_captured,
        })
        .collect();

    let categories = coco
        .categories
        .into_iter()
        .map(|cat| Category {
            id: CategoryId::new(cat.id),
            name: cat.name,
            supercategory: cat.supercategory,
        })
        .collect();

    let annotations = coco
        .annotations
        .into_iter()
        .map(|ann| {
            let [x, y, w, h] = ann.bbox;
            let bbox = BBox::<Pixel>::from_xywh(x, y, w, h);
            Annotation {
                id: AnnotationId::new(ann.id),
                image_id: ImageId::new(ann.image_id),
                category_id: CategoryId::new(ann.category_id),
                area: ann.area.unwrap_or_else(|| bbox.area()),
                iscrowd: ann.iscrowd.unwrap_or(0),
                bbox,
            }
        })
        .collect();

    Dataset {
        info,
        licenses,
        images,
        categories,
        annotations,
    }
}

// ============================================================================
// Conversion: IR -> COCO
// ============================================================================

fn ir_to_coco(dataset: &Dataset) -> CocoDocument {
    let info = Some(CocoInfo {
        description: dataset.info.description.clone(),
        version: dataset.info.version.clone(),
        year: dataset.info.year,
        contributor: dataset.info.contributor.clone(),
        date_created: dataset.info.date_created.clone(),
        url: dataset.info.url.clone(),
    });

    let mut licenses: Vec<CocoLicense> = dataset
        .licenses
        .iter()
        .map(|l| CocoLicense {
            id: l.id.as_u64(),
            name: l.name.clone(),
            url: l.url.clone(),
        })
        .collect();
    licenses.sort_by_key(|l| l.id);

    let mut images: Vec<CocoImage> = dataset
        .images
        .iter()
        .map(|img| CocoImage {
            id: img.id.as_u64(),
            file_name: img.file_name.clone(),
            width: img.width,
            height: img.height,
            license: img.license_id.map(|l| l.as_u64()),
            date_captured: img.date_captured.clone(),
        })
        .collect();
    images.sort_by_key(|i| i.id);

    let mut categories: Vec<CocoCategory> = dataset
        .categories
        .iter()
        .map(|cat| CocoCategory {
            id: cat.id.as_u64(),
            name: cat.name.clone(),
            supercategory: cat.supercategory.clone(),
        })
        .collect();
    categories.sort_by_key(|c| c.id);

    let mut annotations: Vec<CocoAnnotation> = dataset
        .annotations
        .iter()
        .map(|ann| CocoAnnotation {
            id: ann.id.as_u64(),
            image_id: ann.image_id.as_u64(),
            category_id: ann.category_id.as_u64(),
            bbox: ann.bbox.to_xywh(),
            area: Some(ann.area),
            iscrowd: Some(ann.iscrowd),
            segmentation: serde_json::Value::Array(vec![]),
        })
        .collect();
    annotations.sort_by_key(|a| a.id);

    CocoDocument {
        info,
        licenses,
        images,
        annotations,
        categories,
    }
}
