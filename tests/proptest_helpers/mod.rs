#![allow(dead_code)]

use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

/// Tolerance for normalized coordinates after a pixel round trip.
pub const EPS_NORMALIZED: f64 = 1e-9;

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(32);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// A YOLO box that lies entirely inside the image, so it is never clamped.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InsideBox {
    pub class_id: usize,
    pub cx: f64,
    pub cy: f64,
    pub w: f64,
    pub h: f64,
}

impl InsideBox {
    pub fn to_line(self) -> String {
        format!(
            "{} {} {} {} {}",
            self.class_id, self.cx, self.cy, self.w, self.h
        )
    }
}

/// Keeps a margin from the border so that rounding cannot push an edge out.
fn arb_span() -> impl Strategy<Value = (f64, f64)> {
    (0.01f64..0.5).prop_flat_map(|size| {
        let half = size / 2.0;
        ((half + 0.001)..(1.0 - half - 0.001)).prop_map(move |center| (center, size))
    })
}

pub fn arb_inside_box() -> impl Strategy<Value = InsideBox> {
    (0usize..3, arb_span(), arb_span()).prop_map(|(class_id, (cx, w), (cy, h))| InsideBox {
        class_id,
        cx,
        cy,
        w,
        h,
    })
}

/// `(width, height, boxes)` for one image.
pub fn arb_labeled_image(max_boxes: usize) -> impl Strategy<Value = (u32, u32, Vec<InsideBox>)> {
    (
        16u32..2048,
        16u32..2048,
        prop::collection::vec(arb_inside_box(), 0..=max_boxes),
    )
}

/// Distinct image stems.
pub fn arb_stems(max: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set("[a-z]{1,3}_[0-9]{1,4}", 0..=max)
        .prop_map(|set| set.into_iter().collect())
}
