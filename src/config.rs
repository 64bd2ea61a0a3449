//! Deployment configuration.
//!
//! Every stage that touches coordinates must agree on these values: a model
//! trained at one input size, heatmap size, or preprocessing policy produces
//! garbage under another. The configuration is read once (from YAML, every
//! field optional) and passed by reference to each stage.
//!
//! ```yaml
//! model_input_size: 256
//! heatmap_size: 64
//! sigma: 2.0
//! window_radius: 2
//! num_keypoints: 17
//! preprocess: letterbox   # or: resize
//! clamp: none             # or: image_bounds
//! normalization:
//!   mean: [0.485, 0.456, 0.406]
//!   std: [0.229, 0.224, 0.225]
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::LandmarkError;
use crate::heatmap::{HeatmapCodec, DEFAULT_WINDOW_RADIUS};
use crate::ir::NUM_KEYPOINTS;
use crate::pipeline::{ClampPolicy, Normalization};
use crate::transform::{Downsample, PreprocessPolicy};

/// Shared codec and preprocessing settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CodecConfig {
    /// Side length of the square model input.
    pub model_input_size: u32,
    /// Side length of the square heatmap grid.
    pub heatmap_size: u32,
    /// Gaussian spread of training targets, in grid cells.
    pub sigma: f64,
    /// Radius of the centroid window used when decoding.
    pub window_radius: usize,
    /// Number of landmarks, one heatmap channel each.
    pub num_keypoints: usize,
    pub preprocess: PreprocessPolicy,
    pub clamp: ClampPolicy,
    pub normalization: Normalization,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            model_input_size: 256,
            heatmap_size: 64,
            sigma: 2.0,
            window_radius: DEFAULT_WINDOW_RADIUS,
            num_keypoints: NUM_KEYPOINTS,
            preprocess: PreprocessPolicy::default(),
            clamp: ClampPolicy::default(),
            normalization: Normalization::default(),
        }
    }
}

impl CodecConfig {
    /// Reads and validates a YAML config file.
    pub fn load(path: &Path) -> Result<Self, LandmarkError> {
        let data = fs::read_to_string(path).map_err(LandmarkError::Io)?;
        let config: CodecConfig =
            serde_yaml::from_str(&data).map_err(|source| LandmarkError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every value is usable.
    pub fn validate(&self) -> Result<(), LandmarkError> {
        if self.model_input_size == 0 {
            return Err(LandmarkError::configuration(
                "model_input_size must be greater than 0",
            ));
        }
        if self.heatmap_size == 0 {
            return Err(LandmarkError::configuration(
                "heatmap_size must be greater than 0",
            ));
        }
        if self.num_keypoints == 0 {
            return Err(LandmarkError::configuration(
                "num_keypoints must be greater than 0",
            ));
        }
        if self.heatmap_size > self.model_input_size {
            return Err(LandmarkError::configuration(format!(
                "heatmap_size {} exceeds model_input_size {}",
                self.heatmap_size, self.model_input_size
            )));
        }
        if self.window_radius > self.heatmap_size as usize {
            return Err(LandmarkError::configuration(format!(
                "window_radius {} exceeds heatmap_size {}",
                self.window_radius, self.heatmap_size
            )));
        }
        if !(self.sigma.is_finite() && self.sigma > 0.0) {
            return Err(LandmarkError::configuration(format!(
                "sigma must be a positive number, got {}",
                self.sigma
            )));
        }
        self.normalization.validate()
    }

    pub fn codec(&self) -> Result<HeatmapCodec, LandmarkError> {
        Ok(HeatmapCodec::new(self.heatmap_size as usize, self.sigma)?
            .with_window_radius(self.window_radius)
            .with_num_keypoints(self.num_keypoints))
    }

    pub fn downsample(&self) -> Result<Downsample, LandmarkError> {
        Downsample::new(self.heatmap_size, self.model_input_size)
    }
}
