//! Coordinate space markers for [`BBox`](super::BBox).
//!
//! YOLO labels live in [`Normalized`] space (fractions of the image size);
//! COCO boxes live in [`Pixel`] space. Both markers are uninhabited so they
//! cost nothing at runtime.

/// Absolute pixel coordinates, origin at the top-left corner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Pixel {}

/// Coordinates relative to the image size, nominally in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Normalized {}
