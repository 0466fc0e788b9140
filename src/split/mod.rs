//! Train/val/test partitioning of the image set.
//!
//! Stems are always sorted first, so the partition depends only on the set
//! of images and the mode, never on directory listing order.

use std::path::Path;

use log::info;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::OrchardError;
use crate::ir::io_splits::{split_list_path, write_split_list};
use crate::ir::io_yolo::collect_images;

/// Tolerance on `train + val + test == 1`.
pub const RATIO_TOLERANCE: f64 = 1e-6;

/// Seed used by the CLI when neither `--seed` nor `--sorted` is given.
pub const DEFAULT_SEED: u64 = 42;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SplitRatios {
    pub train: f64,
    pub val: f64,
    pub test: f64,
}

impl Default for SplitRatios {
    fn default() -> Self {
        Self {
            train: 0.8,
            val: 0.1,
            test: 0.1,
        }
    }
}

impl SplitRatios {
    pub fn new(train: f64, val: f64, test: f64) -> Result<Self, OrchardError> {
        let ratios = Self { train, val, test };
        ratios.validate()?;
        Ok(ratios)
    }

    pub fn validate(&self) -> Result<(), OrchardError> {
        for (name, value) in [("train", self.train), ("val", self.val), ("test", self.test)] {
            if !value.is_finite() || value < 0.0 {
                return Err(OrchardError::config(format!(
                    "{name} ratio must be a finite non-negative number, got {value}"
                )));
            }
        }

        let sum = self.train + self.val + self.test;
        if (sum - 1.0).abs() > RATIO_TOLERANCE {
            return Err(OrchardError::config(format!(
                "split ratios must sum to 1.0, got {sum}"
            )));
        }
        Ok(())
    }
}

/// Ordering applied before the set is cut.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SplitMode {
    /// Lexicographic stem order.
    Sorted,
    /// Sorted, then shuffled with a seeded RNG.
    Seeded(u64),
}

impl Default for SplitMode {
    fn default() -> Self {
        SplitMode::Seeded(DEFAULT_SEED)
    }
}

/// A partition of the image stems.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Splits {
    pub train: Vec<String>,
    pub val: Vec<String>,
    pub test: Vec<String>,
    /// Every stem, sorted.
    pub all: Vec<String>,
}

impl Splits {
    /// `train` followed by `val`.
    pub fn train_val(&self) -> Vec<String> {
        self.train.iter().chain(&self.val).cloned().collect()
    }

    /// Named lists in the order they are written.
    pub fn named_lists(&self) -> Vec<(&'static str, Vec<String>)> {
        vec![
            ("train", self.train.clone()),
            ("val", self.val.clone()),
            ("test", self.test.clone()),
            ("train_val", self.train_val()),
            ("all", self.all.clone()),
        ]
    }
}

/// Sizes of the train and val parts for `n` images. Test takes the rest.
pub fn split_counts(n: usize, ratios: &SplitRatios) -> (usize, usize) {
    let n_train = ((n as f64 * ratios.train).round() as usize).min(n);
    let n_val = ((n as f64 * ratios.val).round() as usize).min(n - n_train);
    (n_train, n_val)
}

/// Partitions `stems` into train/val/test.
///
/// Duplicate stems are collapsed. An empty input is a configuration error.
pub fn generate_splits(
    stems: &[String],
    ratios: &SplitRatios,
    mode: SplitMode,
) -> Result<Splits, OrchardError> {
    ratios.validate()?;

    let mut all: Vec<String> = stems.to_vec();
    all.sort();
    all.dedup();
    if all.is_empty() {
        return Err(OrchardError::config("no images to split"));
    }

    let mut order = all.clone();
    if let SplitMode::Seeded(seed) = mode {
        let mut rng = StdRng::seed_from_u64(seed);
        order.shuffle(&mut rng);
    }

    let (n_train, n_val) = split_counts(order.len(), ratios);
    let test = order.split_off(n_train + n_val);
    let val = order.split_off(n_train);
    let train = order;

    info!(
        "split {} image(s): train {}, val {}, test {}",
        all.len(),
        train.len(),
        val.len(),
        test.len()
    );

    Ok(Splits {
        train,
        val,
        test,
        all,
    })
}

/// Stems of the images directly inside `images_dir`, sorted.
pub fn collect_image_stems(images_dir: &Path) -> Result<Vec<String>, OrchardError> {
    Ok(collect_images(images_dir)?
        .into_iter()
        .map(|image| image.stem)
        .collect())
}

/// Writes `train.txt`, `val.txt`, `test.txt`, `train_val.txt` and `all.txt`.
pub fn write_split_lists(split_dir: &Path, splits: &Splits) -> Result<(), OrchardError> {
    for (name, stems) in splits.named_lists() {
        let path = split_list_path(split_dir, name);
        write_split_list(&path, &stems)?;
        info!("wrote {} ({} stem(s))", path.display(), stems.len());
    }
    Ok(())
}
