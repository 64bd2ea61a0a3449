//! Invertible mappings between coordinate spaces.
//!
//! An image passes through four spaces: original pixels, the preprocessed
//! square model input (letterboxed or plainly resized), and the downsampled
//! heatmap grid. Every mapping here is affine per axis, exactly invertible,
//! and never clamps: points outside the image map to points outside the
//! target canvas and back again.
//!
//! The two preprocessing policies are incompatible. A model
//! trained on letterboxed inputs produces meaningless coordinates when fed
//! resized inputs and vice versa, so the policy is chosen once through
//! [`PreprocessPolicy`] and carried as a single [`Preprocess`] value.

use serde::{Deserialize, Serialize};

use crate::error::LandmarkError;
use crate::ir::{CoordinateSpace, HeatmapGrid, KeypointSet, ModelInput, Original, Point};

/// A mapping between two typed coordinate spaces.
pub trait PointTransform {
    type Source;
    type Target;

    fn forward(&self, point: Point<Self::Source>) -> Point<Self::Target>;

    fn inverse(&self, point: Point<Self::Target>) -> Point<Self::Source>;

    /// The space this transform maps into.
    fn target_space(&self) -> CoordinateSpace;

    fn forward_set(&self, set: &KeypointSet<Self::Source>) -> KeypointSet<Self::Target> {
        set.map(|p| self.forward(p))
    }

    fn inverse_set(&self, set: &KeypointSet<Self::Target>) -> KeypointSet<Self::Source> {
        set.map(|p| self.inverse(p))
    }
}

fn require_positive(name: &str, value: u32) -> Result<(), LandmarkError> {
    if value == 0 {
        return Err(LandmarkError::configuration(format!(
            "{name} must be greater than 0"
        )));
    }
    Ok(())
}

/// Aspect-preserving fit of an image into a square canvas, centred with
/// padding on the short axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Letterbox {
    target_size: u32,
    scale: f64,
    new_width: u32,
    new_height: u32,
    pad_x: u32,
    pad_y: u32,
}

impl Letterbox {
    /// Computes letterbox parameters for a `width` x `height` image.
    ///
    /// # Errors
    /// Returns [`LandmarkError::Configuration`] if any argument is zero.
    pub fn new(target_size: u32, width: u32, height: u32) -> Result<Self, LandmarkError> {
        require_positive("target size", target_size)?;
        require_positive("image width", width)?;
        require_positive("image height", height)?;

        let target = f64::from(target_size);
        let scale = target / f64::from(width.max(height));
        let new_width = (f64::from(width) * scale).round() as u32;
        let new_height = (f64::from(height) * scale).round() as u32;
        let pad_x = target_size.saturating_sub(new_width) / 2;
        let pad_y = target_size.saturating_sub(new_height) / 2;

        Ok(Self {
            target_size,
            scale,
            new_width,
            new_height,
            pad_x,
            pad_y,
        })
    }

    pub fn target_size(&self) -> u32 {
        self.target_size
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Size of the resized image content inside the canvas.
    pub fn content_size(&self) -> (u32, u32) {
        (self.new_width, self.new_height)
    }

    pub fn padding(&self) -> (u32, u32) {
        (self.pad_x, self.pad_y)
    }
}

impl PointTransform for Letterbox {
    type Source = Original;
    type Target = ModelInput;

    fn forward(&self, p: Point<Original>) -> Point<ModelInput> {
        Point::new(
            p.x * self.scale + f64::from(self.pad_x),
            p.y * self.scale + f64::from(self.pad_y),
        )
    }

    fn inverse(&self, p: Point<ModelInput>) -> Point<Original> {
        Point::new(
            (p.x - f64::from(self.pad_x)) / self.scale,
            (p.y - f64::from(self.pad_y)) / self.scale,
        )
    }

    fn target_space(&self) -> CoordinateSpace {
        CoordinateSpace::Letterboxed {
            target_size: self.target_size,
            scale: self.scale,
            pad_x: self.pad_x,
            pad_y: self.pad_y,
        }
    }
}

/// Plain resize to a square canvas with independent axis scales.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Resize {
    size: u32,
    sx: f64,
    sy: f64,
}

impl Resize {
    /// # Errors
    /// Returns [`LandmarkError::Configuration`] if any argument is zero.
    pub fn new(size: u32, width: u32, height: u32) -> Result<Self, LandmarkError> {
        require_positive("target size", size)?;
        require_positive("image width", width)?;
        require_positive("image height", height)?;

        Ok(Self {
            size,
            sx: f64::from(size) / f64::from(width),
            sy: f64::from(size) / f64::from(height),
        })
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn scales(&self) -> (f64, f64) {
        (self.sx, self.sy)
    }
}

impl PointTransform for Resize {
    type Source = Original;
    type Target = ModelInput;

    fn forward(&self, p: Point<Original>) -> Point<ModelInput> {
        Point::new(p.x * self.sx, p.y * self.sy)
    }

    fn inverse(&self, p: Point<ModelInput>) -> Point<Original> {
        Point::new(p.x / self.sx, p.y / self.sy)
    }

    fn target_space(&self) -> CoordinateSpace {
        CoordinateSpace::ModelInput { size: self.size }
    }
}

/// Uniform scale from model-input pixels to heatmap cells.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Downsample {
    heatmap_size: u32,
    factor: f64,
}

impl Downsample {
    /// # Errors
    /// Returns [`LandmarkError::Configuration`] if either size is zero.
    pub fn new(heatmap_size: u32, model_input_size: u32) -> Result<Self, LandmarkError> {
        require_positive("heatmap size", heatmap_size)?;
        require_positive("model input size", model_input_size)?;

        Ok(Self {
            heatmap_size,
            factor: f64::from(heatmap_size) / f64::from(model_input_size),
        })
    }

    pub fn heatmap_size(&self) -> u32 {
        self.heatmap_size
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }
}

impl PointTransform for Downsample {
    type Source = ModelInput;
    type Target = HeatmapGrid;

    fn forward(&self, p: Point<ModelInput>) -> Point<HeatmapGrid> {
        Point::new(p.x * self.factor, p.y * self.factor)
    }

    fn inverse(&self, p: Point<HeatmapGrid>) -> Point<ModelInput> {
        Point::new(p.x / self.factor, p.y / self.factor)
    }

    fn target_space(&self) -> CoordinateSpace {
        CoordinateSpace::HeatmapGrid {
            size: self.heatmap_size,
        }
    }
}

/// Preprocessing policy, selected once per deployment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreprocessPolicy {
    /// Aspect-preserving fit with padding.
    #[default]
    Letterbox,
    /// Independent per-axis stretch.
    Resize,
}

impl PreprocessPolicy {
    /// Builds the concrete transform for one image.
    pub fn build(
        self,
        target_size: u32,
        width: u32,
        height: u32,
    ) -> Result<Preprocess, LandmarkError> {
        match self {
            PreprocessPolicy::Letterbox => {
                Letterbox::new(target_size, width, height).map(Preprocess::Letterbox)
            }
            PreprocessPolicy::Resize => {
                Resize::new(target_size, width, height).map(Preprocess::Resize)
            }
        }
    }
}

/// The per-image preprocessing transform: original pixels to model input.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Preprocess {
    Letterbox(Letterbox),
    Resize(Resize),
}

impl Preprocess {
    pub fn policy(&self) -> PreprocessPolicy {
        match self {
            Preprocess::Letterbox(_) => PreprocessPolicy::Letterbox,
            Preprocess::Resize(_) => PreprocessPolicy::Resize,
        }
    }

    /// Side length of the square model input.
    pub fn model_input_size(&self) -> u32 {
        match self {
            Preprocess::Letterbox(lb) => lb.target_size(),
            Preprocess::Resize(rs) => rs.size(),
        }
    }

    /// Size of the image content on the canvas and its top-left offset.
    pub fn content_rect(&self) -> ((u32, u32), (u32, u32)) {
        match self {
            Preprocess::Letterbox(lb) => (lb.content_size(), lb.padding()),
            Preprocess::Resize(rs) => ((rs.size(), rs.size()), (0, 0)),
        }
    }
}

impl PointTransform for Preprocess {
    type Source = Original;
    type Target = ModelInput;

    fn forward(&self, p: Point<Original>) -> Point<ModelInput> {
        match self {
            Preprocess::Letterbox(lb) => lb.forward(p),
            Preprocess::Resize(rs) => rs.forward(p),
        }
    }

    fn inverse(&self, p: Point<ModelInput>) -> Point<Original> {
        match self {
            Preprocess::Letterbox(lb) => lb.inverse(p),
            Preprocess::Resize(rs) => rs.inverse(p),
        }
    }

    fn target_space(&self) -> CoordinateSpace {
        match self {
            Preprocess::Letterbox(lb) => lb.target_space(),
            Preprocess::Resize(rs) => rs.target_space(),
        }
    }
}
