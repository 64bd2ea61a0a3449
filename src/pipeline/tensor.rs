//! Model-input rendering and tensor normalization.

use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage};
use serde::{Deserialize, Serialize};

use crate::error::LandmarkError;
use crate::transform::Preprocess;

/// Per-channel normalization applied to `[0, 1]` RGB values.
///
/// Must match the constants the model was trained with exactly.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Normalization {
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

impl Default for Normalization {
    /// ImageNet statistics.
    fn default() -> Self {
        Self {
            mean: [0.485, 0.456, 0.406],
            std: [0.229, 0.224, 0.225],
        }
    }
}

impl Normalization {
    pub fn validate(&self) -> Result<(), LandmarkError> {
        if let Some(bad) = self.std.iter().find(|s| !(s.is_finite() && **s > 0.0)) {
            return Err(LandmarkError::configuration(format!(
                "normalization std values must be positive, got {bad}"
            )));
        }
        if self.mean.iter().any(|m| !m.is_finite()) {
            return Err(LandmarkError::configuration(
                "normalization mean values must be finite",
            ));
        }
        Ok(())
    }
}

/// Normalized RGB tensor in channel-major `(3, size, size)` layout.
#[derive(Clone, Debug, PartialEq)]
pub struct InputTensor {
    size: u32,
    data: Vec<f32>,
}

impl InputTensor {
    /// Normalizes a square RGB image.
    ///
    /// # Errors
    /// Returns [`LandmarkError::Configuration`] if the image is not square.
    pub fn from_rgb(image: &RgbImage, norm: &Normalization) -> Result<Self, LandmarkError> {
        let (width, height) = image.dimensions();
        if width != height {
            return Err(LandmarkError::configuration(format!(
                "model input must be square, got {}x{}",
                width, height
            )));
        }

        let plane = (width * height) as usize;
        let mut data = vec![0.0f32; 3 * plane];
        for (idx, pixel) in image.pixels().enumerate() {
            for c in 0..3 {
                let value = f32::from(pixel.0[c]) / 255.0;
                data[c * plane + idx] = (value - norm.mean[c]) / norm.std[c];
            }
        }

        Ok(Self { size: width, data })
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// `[channels, height, width]`.
    pub fn shape(&self) -> [usize; 3] {
        [3, self.size as usize, self.size as usize]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn get(&self, channel: usize, y: usize, x: usize) -> Option<f32> {
        let size = self.size as usize;
        if channel >= 3 || y >= size || x >= size {
            return None;
        }
        Some(self.data[channel * size * size + y * size + x])
    }
}

/// Renders the square model-input image for a preprocessing transform.
///
/// Letterboxing resizes the content and pastes it onto a black canvas at
/// the transform's padding offset; resizing stretches to the full square.
pub fn render_model_input(image: &DynamicImage, preprocess: &Preprocess) -> RgbImage {
    let rgb = image.to_rgb8();
    let ((content_w, content_h), (offset_x, offset_y)) = preprocess.content_rect();
    let resized = imageops::resize(
        &rgb,
        content_w.max(1),
        content_h.max(1),
        FilterType::Triangle,
    );

    match preprocess {
        Preprocess::Resize(_) => resized,
        Preprocess::Letterbox(lb) => {
            let size = lb.target_size();
            let mut canvas = RgbImage::new(size, size);
            imageops::replace(&mut canvas, &resized, i64::from(offset_x), i64::from(offset_y));
            canvas
        }
    }
}
