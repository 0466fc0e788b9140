//! Axis-aligned bounding boxes in top-left XYWH form.
//!
//! COCO stores `[x_min, y_min, width, height]` in pixels, so that is the
//! canonical layout here. YOLO's center-based form is produced and consumed
//! through [`BBox::from_cxcywh`] and [`BBox::to_cxcywh`].

use std::marker::PhantomData;

use super::{Normalized, Pixel};

/// A bounding box whose coordinate space is fixed by `TSpace`.
///
/// Construction does not check that the box is well formed; negative sizes
/// and non-finite values can be represented so validation can report them.
#[derive(Clone, Copy, PartialEq)]
pub struct BBox<TSpace> {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    _space: PhantomData<TSpace>,
}

impl<TSpace> BBox<TSpace> {
    #[inline]
    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            _space: PhantomData,
        }
    }

    /// Builds a box from its center point and size.
    #[inline]
    pub fn from_cxcywh(cx: f64, cy: f64, width: f64, height: f64) -> Self {
        Self::from_xywh(cx - width / 2.0, cy - height / 2.0, width, height)
    }

    #[inline]
    pub fn x(&self) -> f64 {
        self.x
    }

    #[inline]
    pub fn y(&self) -> f64 {
        self.y
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.height
    }

    #[inline]
    pub fn xmax(&self) -> f64 {
        self.x + self.width
    }

    #[inline]
    pub fn ymax(&self) -> f64 {
        self.y + self.height
    }

    /// Width times height. Negative for malformed boxes.
    #[inline]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }

    #[inline]
    pub fn to_xywh(&self) -> [f64; 4] {
        [self.x, self.y, self.width, self.height]
    }

    #[inline]
    pub fn to_cxcywh(&self) -> (f64, f64, f64, f64) {
        (
            self.x + self.width / 2.0,
            self.y + self.height / 2.0,
            self.width,
            self.height,
        )
    }
}

impl<TSpace> std::fmt::Debug for BBox<TSpace> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BBox")
            .field("x", &self.x)
            .field("y", &self.y)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

impl<TSpace> Default for BBox<TSpace> {
    fn default() -> Self {
        Self::from_xywh(0.0, 0.0, 0.0, 0.0)
    }
}

impl BBox<Normalized> {
    /// Scales a normalized box to pixels.
    ///
    /// `x_min = (x_center - width / 2) * image_width`, and likewise for y;
    /// sizes scale directly.
    pub fn to_pixel(&self, image_width: f64, image_height: f64) -> BBox<Pixel> {
        BBox::from_xywh(
            self.x * image_width,
            self.y * image_height,
            self.width * image_width,
            self.height * image_height,
        )
    }
}

/// Outcome of clamping a pixel box to its image.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Clamped {
    /// The box already lay inside the image.
    Inside(BBox<Pixel>),
    /// At least one edge was pulled back onto the image border.
    Clipped(BBox<Pixel>),
    /// Nothing of the box remains inside the image.
    Outside,
}

impl BBox<Pixel> {
    /// Inverse of [`BBox::<Normalized>::to_pixel`].
    pub fn to_normalized(&self, image_width: f64, image_height: f64) -> BBox<Normalized> {
        BBox::from_xywh(
            self.x / image_width,
            self.y / image_height,
            self.width / image_width,
            self.height / image_height,
        )
    }

    /// Clamps the box to `[0, image_width] x [0, image_height]`.
    ///
    /// Unchanged boxes keep their exact values. A box left with zero or
    /// negative extent on either axis is [`Clamped::Outside`].
    pub fn clamp_to(&self, image_width: f64, image_height: f64) -> Clamped {
        let xmin = self.x.max(0.0);
        let ymin = self.y.max(0.0);
        let xmax = self.xmax().min(image_width);
        let ymax = self.ymax().min(image_height);

        if !(xmax > xmin && ymax > ymin) {
            return Clamped::Outside;
        }

        if xmin == self.x && ymin == self.y && xmax == self.xmax() && ymax == self.ymax() {
            Clamped::Inside(*self)
        } else {
            Clamped::Clipped(BBox::from_xywh(xmin, ymin, xmax - xmin, ymax - ymin))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_form_converts_to_top_left() {
        let bbox: BBox<Normalized> = BBox::from_cxcywh(0.5, 0.5, 0.2, 0.2);
        let px = bbox.to_pixel(640.0, 640.0);
        assert_eq!(px.to_xywh(), [256.0, 256.0, 128.0, 128.0]);
        assert_eq!(px.area(), 16384.0);
    }

    #[test]
    fn pixel_to_normalized_roundtrip() {
        let original: BBox<Normalized> = BBox::from_cxcywh(0.31, 0.72, 0.11, 0.05);
        let back = original.to_pixel(1280.0, 720.0).to_normalized(1280.0, 720.0);
        let (cx, cy, w, h) = back.to_cxcywh();
        assert!((cx - 0.31).abs() < 1e-12);
        assert!((cy - 0.72).abs() < 1e-12);
        assert!((w - 0.11).abs() < 1e-12);
        assert!((h - 0.05).abs() < 1e-12);
    }

    #[test]
    fn clamp_keeps_inside_boxes_exact() {
        let bbox: BBox<Pixel> = BBox::from_xywh(10.0, 20.0, 30.0, 40.0);
        assert_eq!(bbox.clamp_to(100.0, 100.0), Clamped::Inside(bbox));
    }

    #[test]
    fn clamp_clips_overhanging_edges() {
        let bbox: BBox<Pixel> = BBox::from_xywh(-10.0, 90.0, 30.0, 20.0);
        match bbox.clamp_to(100.0, 100.0) {
            Clamped::Clipped(clipped) => {
                assert_eq!(clipped.to_xywh(), [0.0, 90.0, 20.0, 10.0]);
            }
            other => panic!("expected clipped box, got {other:?}"),
        }
    }

    #[test]
    fn clamp_rejects_degenerate_and_outside_boxes() {
        let outside: BBox<Pixel> = BBox::from_xywh(120.0, 10.0, 5.0, 5.0);
        assert_eq!(outside.clamp_to(100.0, 100.0), Clamped::Outside);

        let zero_width: BBox<Pixel> = BBox::from_xywh(100.0, 10.0, 0.0, 5.0);
        assert_eq!(zero_width.clamp_to(100.0, 100.0), Clamped::Outside);
    }

    #[test]
    fn non_finite_values_are_detected() {
        let bbox: BBox<Pixel> = BBox::from_xywh(f64::NAN, 0.0, 1.0, 1.0);
        assert!(!bbox.is_finite());
    }
}
