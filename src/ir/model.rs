//! In-memory COCO document model.
//!
//! The assembler builds a [`Dataset`] and the COCO writer serializes it;
//! the reader parses COCO JSON back into the same shape for validation.

use super::bbox::BBox;
use super::ids::{AnnotationId, CategoryId, ImageId, LicenseId};
use super::space::Pixel;

/// One COCO document: a split's images with their annotations.
#[derive(Clone, Debug, Default)]
pub struct Dataset {
    pub info: DatasetInfo,
    pub licenses: Vec<License>,
    pub images: Vec<Image>,
    pub categories: Vec<Category>,
    pub annotations: Vec<Annotation>,
}

impl Dataset {
    /// Annotations belonging to `image_id`, in stored order.
    pub fn annotations_for(&self, image_id: ImageId) -> impl Iterator<Item = &Annotation> {
        self.annotations
            .iter()
            .filter(move |ann| ann.image_id == image_id)
    }
}

/// The COCO `info` block.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DatasetInfo {
    pub description: Option<String>,
    pub version: Option<String>,
    pub year: Option<u32>,
    pub contributor: Option<String>,
    pub date_created: Option<String>,
    pub url: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct License {
    pub id: LicenseId,
    pub name: String,
    pub url: Option<String>,
}

impl License {
    pub fn new(id: impl Into<LicenseId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// An image record. Created once per source image and never edited.
#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    pub id: ImageId,

    /// Basename of the image file, e.g. `IMG_0001.jpg`.
    pub file_name: String,

    pub width: u32,
    pub height: u32,
    pub license_id: Option<LicenseId>,
    pub date_captured: Option<String>,
}

impl Image {
    pub fn new(
        id: impl Into<ImageId>,
        file_name: impl Into<String>,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            id: id.into(),
            file_name: file_name.into(),
            width,
            height,
            license_id: None,
            date_captured: None,
        }
    }

    pub fn with_license(mut self, license_id: impl Into<LicenseId>) -> Self {
        self.license_id = Some(license_id.into());
        self
    }

    pub fn with_date_captured(mut self, date: impl Into<String>) -> Self {
        self.date_captured = Some(date.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub supercategory: Option<String>,
}

impl Category {
    pub fn new(id: impl Into<CategoryId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            supercategory: None,
        }
    }

    pub fn with_supercategory(mut self, supercategory: impl Into<String>) -> Self {
        self.supercategory = Some(supercategory.into());
        self
    }
}

/// A bbox-only COCO annotation.
///
/// Derived from a YOLO box and its image's dimensions; `area` is the pixel
/// width times height of `bbox` and `iscrowd` is always 0 for output we
/// produce.
#[derive(Clone, Debug, PartialEq)]
pub struct Annotation {
    pub id: AnnotationId,
    pub image_id: ImageId,
    pub category_id: CategoryId,
    pub bbox: BBox<Pixel>,
    pub area: f64,
    pub iscrowd: u8,
}

impl Annotation {
    /// Creates an annotation whose area is computed from `bbox`.
    pub fn new(
        id: impl Into<AnnotationId>,
        image_id: impl Into<ImageId>,
        category_id: impl Into<CategoryId>,
        bbox: BBox<Pixel>,
    ) -> Self {
        Self {
            id: id.into(),
            image_id: image_id.into(),
            category_id: category_id.into(),
            area: bbox.area(),
            bbox,
            iscrowd: 0,
        }
    }
}
