//! Image to landmark inference.
//!
//! [`InferencePipeline`] owns the predictor and runs one image through the
//! full coordinate chain:
//!
//! 1. decode the image and record its size;
//! 2. build the configured [`Preprocess`](crate::transform::Preprocess)
//!    and render the normalized model input;
//! 3. call the predictor;
//! 4. decode the heatmap stack on the grid;
//! 5. undo the downsample (grid to model input);
//! 6. undo the preprocessing (model input to original pixels).
//!
//! Any failure aborts the run; there are no partial results.

mod predictor;
mod tensor;

pub use predictor::{FixedPointsPredictor, HeatmapPredictor, PredictorError};
pub use tensor::{render_model_input, InputTensor, Normalization};

use std::path::Path;

use image::{DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::CodecConfig;
use crate::error::LandmarkError;
use crate::heatmap::HeatmapCodec;
use crate::ir::{CoordinateSpace, KeypointSet, Original, Point};
use crate::transform::{Downsample, PointTransform};

/// What to do with predicted points that land outside the image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClampPolicy {
    /// Return points exactly as decoded.
    #[default]
    None,
    /// Clamp each coordinate into `[0, size - 1]`.
    ImageBounds,
}

/// Runs images through preprocessing, the predictor, and decoding.
pub struct InferencePipeline<P> {
    predictor: P,
    config: CodecConfig,
    codec: HeatmapCodec,
    downsample: Downsample,
}

impl<P: HeatmapPredictor> InferencePipeline<P> {
    /// Takes ownership of the predictor for the pipeline's lifetime.
    ///
    /// # Errors
    /// Returns [`LandmarkError::Configuration`] if the config is invalid.
    pub fn new(predictor: P, config: CodecConfig) -> Result<Self, LandmarkError> {
        config.validate()?;
        let codec = config.codec()?;
        let downsample = config.downsample()?;
        Ok(Self {
            predictor,
            config,
            codec,
            downsample,
        })
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    pub fn predictor(&self) -> &P {
        &self.predictor
    }

    /// Tears the pipeline down and hands the predictor back.
    pub fn into_predictor(self) -> P {
        self.predictor
    }

    /// Predicts landmarks for encoded image bytes (PNG, JPEG, BMP).
    pub fn run(&self, image_bytes: &[u8]) -> Result<KeypointSet<Original>, LandmarkError> {
        let image = image::load_from_memory(image_bytes)
            .map_err(|source| LandmarkError::ImageDecode { path: None, source })?;
        self.run_image(&image)
    }

    /// Predicts landmarks for an image file.
    pub fn run_path(&self, path: &Path) -> Result<KeypointSet<Original>, LandmarkError> {
        let image = image::open(path).map_err(|source| LandmarkError::ImageDecode {
            path: Some(path.to_path_buf()),
            source,
        })?;
        self.run_image(&image)
    }

    /// Predicts landmarks for an already decoded image.
    pub fn run_image(&self, image: &DynamicImage) -> Result<KeypointSet<Original>, LandmarkError> {
        let (width, height) = image.dimensions();
        let preprocess = self
            .config
            .preprocess
            .build(self.config.model_input_size, width, height)?;
        debug!(
            from = %CoordinateSpace::Original { width, height },
            to = %preprocess.target_space(),
            "preprocessing image"
        );

        let canvas = render_model_input(image, &preprocess);
        let tensor = InputTensor::from_rgb(&canvas, &self.config.normalization)?;

        let stack = self
            .predictor
            .predict(&tensor)
            .map_err(LandmarkError::ExternalModel)?;

        let grid = self.config.heatmap_size as usize;
        if stack.resolution() != (grid, grid) {
            let (w, h) = stack.resolution();
            return Err(LandmarkError::HeatmapShapeMismatch {
                message: format!(
                    "predictor returned {}x{} maps, expected {}x{}",
                    w, h, grid, grid
                ),
            });
        }

        let on_grid = self.codec.decode(&stack)?;
        let on_input = self.downsample.inverse_set(&on_grid);
        let on_original = preprocess.inverse_set(&on_input);

        Ok(match self.config.clamp {
            ClampPolicy::None => on_original,
            ClampPolicy::ImageBounds => clamp_to_image(&on_original, width, height),
        })
    }
}

fn clamp_to_image(
    points: &KeypointSet<Original>,
    width: u32,
    height: u32,
) -> KeypointSet<Original> {
    let max_x = f64::from(width.saturating_sub(1));
    let max_y = f64::from(height.saturating_sub(1));
    points.map(|p| Point::new(p.x.clamp(0.0, max_x), p.y.clamp(0.0, max_y)))
}
