//! Data model and file formats.
//!
//! YOLO label files are the source of truth; COCO documents are derived from
//! them. The types here keep the two coordinate conventions apart:
//!
//! - [`BBox<Normalized>`] is a YOLO box, fractions of the image size.
//! - [`BBox<Pixel>`] is a COCO box, `[x_min, y_min, width, height]` in pixels.
//!
//! # Example
//!
//! ```
//! use orchardlabel::ir::{BBox, Normalized};
//!
//! let yolo: BBox<Normalized> = BBox::from_cxcywh(0.5, 0.5, 0.2, 0.2);
//! let coco = yolo.to_pixel(640.0, 640.0);
//! assert_eq!(coco.to_xywh(), [256.0, 256.0, 128.0, 128.0]);
//! ```

mod bbox;
mod ids;
pub mod io_coco_json;
pub mod io_splits;
pub mod io_yolo;
mod model;
mod space;

pub use bbox::{BBox, Clamped};
pub use ids::{AnnotationId, CategoryId, ImageId, LicenseId};
pub use model::{Annotation, Category, Dataset, DatasetInfo, Image, License};
pub use space::{Normalized, Pixel};
