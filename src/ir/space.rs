//! Coordinate space marker types.
//!
//! These are zero-sized types (ZSTs) used as type parameters to distinguish
//! the coordinate spaces an image passes through on its way to the model and
//! back. A point in model-input pixels can never be handed to code that
//! expects original-image pixels without going through a transform.

use serde::Serialize;
use std::fmt;

/// Marker type for original image pixels.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Original {}

/// Marker type for fixed-size model-input pixels (after letterbox or resize).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelInput {}

/// Marker type for downsampled response-map cells.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeatmapGrid {}

impl fmt::Debug for Original {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}

impl fmt::Debug for ModelInput {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}

impl fmt::Debug for HeatmapGrid {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}

/// Runtime description of a coordinate space and its parameters.
///
/// The marker types above carry the space at compile time; this enum carries
/// the numbers (for logging, reports, and prediction metadata).
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "space", rename_all = "snake_case")]
pub enum CoordinateSpace {
    /// Raw image pixels.
    Original { width: u32, height: u32 },
    /// Aspect-preserving fit into a square canvas with padding.
    Letterboxed {
        target_size: u32,
        scale: f64,
        pad_x: u32,
        pad_y: u32,
    },
    /// Fixed square model input (plain resize, no padding).
    ModelInput { size: u32 },
    /// Square response-map grid.
    HeatmapGrid { size: u32 },
}

impl fmt::Display for CoordinateSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordinateSpace::Original { width, height } => {
                write!(f, "original {}x{}", width, height)
            }
            CoordinateSpace::Letterboxed {
                target_size,
                scale,
                pad_x,
                pad_y,
            } => write!(
                f,
                "letterboxed {} (scale {:.4}, pad {}x{})",
                target_size, scale, pad_x, pad_y
            ),
            CoordinateSpace::ModelInput { size } => write!(f, "model input {}", size),
            CoordinateSpace::HeatmapGrid { size } => write!(f, "heatmap grid {}", size),
        }
    }
}
