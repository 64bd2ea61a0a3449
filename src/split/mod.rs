//! Train/validation splitting.
//!
//! Splits are reproducible: the manifest is put into image-name order first
//! and then shuffled with a seeded [`StdRng`], so the same manifest and seed
//! always give the same files.

use std::fs;
use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use rand::{rngs::StdRng, SeedableRng};
use tracing::info;

use crate::error::LandmarkError;
use crate::validation::DatasetManifest;

pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_VAL_RATIO: f64 = 0.2;

/// Split options.
#[derive(Clone, Debug)]
pub struct SplitOptions {
    pub seed: u64,
    /// Fraction of items held out for validation, in `(0, 1)`.
    pub val_ratio: f64,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            val_ratio: DEFAULT_VAL_RATIO,
        }
    }
}

/// Image file names assigned to each side of the split.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<String>,
    pub val: Vec<String>,
}

impl Split {
    /// Writes `train.txt` and `val.txt` (one image name per line) into `dir`.
    pub fn write_files(&self, dir: &Path) -> Result<(PathBuf, PathBuf), LandmarkError> {
        fs::create_dir_all(dir)?;
        let train_path = dir.join("train.txt");
        let val_path = dir.join("val.txt");
        fs::write(&train_path, lines(&self.train))?;
        fs::write(&val_path, lines(&self.val))?;
        Ok((train_path, val_path))
    }
}

fn lines(names: &[String]) -> String {
    names.iter().map(|name| format!("{name}\n")).collect()
}

/// Validate split options before running.
pub fn validate_split_options(opts: &SplitOptions) -> Result<(), LandmarkError> {
    if !(opts.val_ratio > 0.0 && opts.val_ratio < 1.0) {
        return Err(LandmarkError::InvalidSplitParams {
            message: format!(
                "--val-ratio must be in the interval (0.0, 1.0), got {}",
                opts.val_ratio
            ),
        });
    }
    Ok(())
}

/// Number of validation items for `n` items: `max(1, floor(n * ratio))`.
pub fn val_count(n: usize, val_ratio: f64) -> usize {
    ((n as f64 * val_ratio).floor() as usize).max(1)
}

/// Splits a manifest into train and validation image names.
pub fn split_manifest(
    manifest: &DatasetManifest,
    opts: &SplitOptions,
) -> Result<Split, LandmarkError> {
    validate_split_options(opts)?;
    if manifest.is_empty() {
        return Err(LandmarkError::InvalidSplitParams {
            message: "manifest has no entries to split".to_string(),
        });
    }

    let mut names: Vec<String> = manifest
        .entries
        .iter()
        .map(|entry| {
            entry
                .image
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| entry.image.display().to_string())
        })
        .collect();
    names.sort();

    let mut rng = StdRng::seed_from_u64(opts.seed);
    names.shuffle(&mut rng);

    let val_len = val_count(names.len(), opts.val_ratio).min(names.len());
    let train = names.split_off(val_len);
    info!(
        train = train.len(),
        val = names.len(),
        seed = opts.seed,
        "split manifest"
    );

    Ok(Split { train, val: names })
}
