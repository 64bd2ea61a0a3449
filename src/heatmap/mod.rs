//! Heatmap encoding and decoding.
//!
//! Training targets are unnormalized Gaussians, one channel per landmark,
//! peaking at exactly 1.0 when the landmark sits on a cell centre. Decoding
//! finds the coarse peak of each channel and refines it with a weighted
//! centroid over a small window (a local soft-argmax).
//!
//! Channels never interact: channel `i` is keypoint id `i + 1`, and both
//! directions process channels in parallel while preserving that order.

use rayon::prelude::*;
use tracing::trace;

use crate::error::LandmarkError;
use crate::ir::{HeatmapGrid, KeypointSet, ModelInput, Point, NUM_KEYPOINTS};
use crate::transform::{Downsample, PointTransform};

/// Default radius of the centroid window (a 5x5 window).
pub const DEFAULT_WINDOW_RADIUS: usize = 2;

/// Total window weight below which decoding falls back to the integer peak.
const MIN_WINDOW_WEIGHT: f64 = 1e-8;

/// A single 2D response map, row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct Heatmap {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl Heatmap {
    /// Wraps a row-major buffer of `width * height` values.
    pub fn new(width: usize, height: usize, data: Vec<f32>) -> Result<Self, LandmarkError> {
        if width == 0 || height == 0 {
            return Err(LandmarkError::HeatmapShapeMismatch {
                message: format!("heatmap must be non-empty, got {}x{}", width, height),
            });
        }
        if data.len() != width * height {
            return Err(LandmarkError::HeatmapShapeMismatch {
                message: format!(
                    "buffer holds {} values, expected {}x{} = {}",
                    data.len(),
                    width,
                    height,
                    width * height
                ),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// An all-zero map.
    pub fn zeros(width: usize, height: usize) -> Result<Self, LandmarkError> {
        Self::new(width, height, vec![0.0; width * height])
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.data[y * self.width + x])
    }

    /// Sets a cell; out-of-range coordinates are ignored.
    pub fn set(&mut self, x: usize, y: usize, value: f32) {
        if x < self.width && y < self.height {
            self.data[y * self.width + x] = value;
        }
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    fn first_non_finite(&self) -> Option<(usize, usize)> {
        self.data
            .iter()
            .position(|v| !v.is_finite())
            .map(|idx| (idx % self.width, idx / self.width))
    }
}

/// One response map per keypoint, all at the same resolution.
#[derive(Clone, Debug, PartialEq)]
pub struct HeatmapStack {
    channels: Vec<Heatmap>,
}

impl HeatmapStack {
    /// Groups channels into a stack.
    ///
    /// # Errors
    /// Returns [`LandmarkError::HeatmapShapeMismatch`] if the stack is empty
    /// or the channels differ in resolution.
    pub fn new(channels: Vec<Heatmap>) -> Result<Self, LandmarkError> {
        let Some(first) = channels.first() else {
            return Err(LandmarkError::HeatmapShapeMismatch {
                message: "stack has no channels".to_string(),
            });
        };

        let (width, height) = (first.width, first.height);
        if let Some((index, odd)) = channels
            .iter()
            .enumerate()
            .find(|(_, c)| c.width != width || c.height != height)
        {
            return Err(LandmarkError::HeatmapShapeMismatch {
                message: format!(
                    "channel {} is {}x{}, channel 0 is {}x{}",
                    index, odd.width, odd.height, width, height
                ),
            });
        }

        Ok(Self { channels })
    }

    /// Splits a flat `(channels, height, width)` buffer, as produced by a
    /// model, into a stack.
    pub fn from_flat(
        num_channels: usize,
        height: usize,
        width: usize,
        data: &[f32],
    ) -> Result<Self, LandmarkError> {
        let plane = width * height;
        if data.len() != num_channels * plane {
            return Err(LandmarkError::HeatmapShapeMismatch {
                message: format!(
                    "buffer holds {} values, expected {}x{}x{}",
                    data.len(),
                    num_channels,
                    height,
                    width
                ),
            });
        }

        let channels = data
            .chunks(plane.max(1))
            .take(num_channels)
            .map(|chunk| Heatmap::new(width, height, chunk.to_vec()))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(channels)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Always false for a constructed stack.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Grid resolution as `(width, height)`.
    pub fn resolution(&self) -> (usize, usize) {
        (self.channels[0].width, self.channels[0].height)
    }

    pub fn channel(&self, index: usize) -> Option<&Heatmap> {
        self.channels.get(index)
    }

    pub fn channels(&self) -> &[Heatmap] {
        &self.channels
    }
}

/// Encodes keypoints into Gaussian targets and decodes response maps back
/// into sub-cell keypoints.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeatmapCodec {
    grid_size: usize,
    sigma: f64,
    window_radius: usize,
    num_keypoints: usize,
}

impl HeatmapCodec {
    /// Creates a codec for a square `grid_size` grid.
    ///
    /// # Errors
    /// Returns [`LandmarkError::Configuration`] if `grid_size` is zero or
    /// `sigma` is not a positive finite number.
    pub fn new(grid_size: usize, sigma: f64) -> Result<Self, LandmarkError> {
        if grid_size == 0 {
            return Err(LandmarkError::configuration("heatmap size must be greater than 0"));
        }
        if !(sigma.is_finite() && sigma > 0.0) {
            return Err(LandmarkError::configuration(format!(
                "sigma must be a positive number, got {sigma}"
            )));
        }
        Ok(Self {
            grid_size,
            sigma,
            window_radius: DEFAULT_WINDOW_RADIUS,
            num_keypoints: NUM_KEYPOINTS,
        })
    }

    #[must_use]
    pub fn with_window_radius(mut self, radius: usize) -> Self {
        self.window_radius = radius;
        self
    }

    /// Overrides the expected channel count (defaults to [`NUM_KEYPOINTS`]).
    #[must_use]
    pub fn with_num_keypoints(mut self, num_keypoints: usize) -> Self {
        self.num_keypoints = num_keypoints;
        self
    }

    pub fn grid_size(&self) -> usize {
        self.grid_size
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    pub fn window_radius(&self) -> usize {
        self.window_radius
    }

    /// Renders one Gaussian per keypoint, in id order.
    pub fn encode(&self, points: &KeypointSet<HeatmapGrid>) -> HeatmapStack {
        let channels: Vec<Heatmap> = points
            .as_slice()
            .par_iter()
            .map(|kp| render_gaussian(self.grid_size, kp.position, self.sigma))
            .collect();
        HeatmapStack { channels }
    }

    /// Downsamples model-input keypoints to the grid, then encodes them.
    pub fn encode_targets(
        &self,
        points: &KeypointSet<ModelInput>,
        downsample: &Downsample,
    ) -> HeatmapStack {
        self.encode(&downsample.forward_set(points))
    }

    /// Decodes every channel into a keypoint in grid coordinates.
    ///
    /// # Errors
    /// - [`LandmarkError::ChannelCountMismatch`] if the stack does not hold
    ///   the expected number of channels.
    /// - [`LandmarkError::InvalidHeatmapValues`] if any value is NaN or
    ///   infinite.
    pub fn decode(&self, stack: &HeatmapStack) -> Result<KeypointSet<HeatmapGrid>, LandmarkError> {
        if stack.len() != self.num_keypoints {
            return Err(LandmarkError::ChannelCountMismatch {
                expected: self.num_keypoints,
                found: stack.len(),
            });
        }

        for (channel, map) in stack.channels.iter().enumerate() {
            if let Some((x, y)) = map.first_non_finite() {
                return Err(LandmarkError::InvalidHeatmapValues { channel, x, y });
            }
        }

        let positions: Vec<Point<HeatmapGrid>> = stack
            .channels
            .par_iter()
            .map(|map| decode_channel(map, self.window_radius))
            .collect();

        KeypointSet::from_positions(positions)
    }
}

/// Renders `exp(-d^2 / (2 sigma^2))` over a square grid.
///
/// Centres outside the grid yield a map holding only the Gaussian's tail.
pub fn render_gaussian(grid_size: usize, center: Point<HeatmapGrid>, sigma: f64) -> Heatmap {
    let denom = 2.0 * sigma * sigma;
    let mut data = Vec::with_capacity(grid_size * grid_size);
    for py in 0..grid_size {
        let dy = py as f64 - center.y;
        for px in 0..grid_size {
            let dx = px as f64 - center.x;
            data.push((-(dx * dx + dy * dy) / denom).exp() as f32);
        }
    }
    Heatmap {
        width: grid_size,
        height: grid_size,
        data,
    }
}

/// Locates the peak of one channel with sub-cell precision.
///
/// The coarse peak is the first maximum in row-major order. The result is
/// the centroid of the window of `radius` cells around it, with negative
/// values treated as zero weight. If the window carries no weight the
/// integer peak is returned.
pub fn decode_channel(map: &Heatmap, radius: usize) -> Point<HeatmapGrid> {
    let mut peak_idx = 0;
    let mut peak_val = map.data[0];
    for (idx, &value) in map.data.iter().enumerate().skip(1) {
        if value > peak_val {
            peak_val = value;
            peak_idx = idx;
        }
    }
    let px = peak_idx % map.width;
    let py = peak_idx / map.width;

    let x0 = px.saturating_sub(radius);
    let x1 = px.saturating_add(radius).saturating_add(1).min(map.width);
    let y0 = py.saturating_sub(radius);
    let y1 = py.saturating_add(radius).saturating_add(1).min(map.height);

    let mut total = 0.0f64;
    let mut sum_x = 0.0f64;
    let mut sum_y = 0.0f64;
    for y in y0..y1 {
        let row = &map.data[y * map.width..(y + 1) * map.width];
        for (x, &value) in row.iter().enumerate().take(x1).skip(x0) {
            let w = f64::from(value.max(0.0));
            total += w;
            sum_x += w * x as f64;
            sum_y += w * y as f64;
        }
    }

    if total < MIN_WINDOW_WEIGHT {
        trace!(px, py, total, "window weight too small, using integer peak");
        return Point::new(px as f64, py as f64);
    }

    Point::new(sum_x / total, sum_y / total)
}

/// Fuzz-only entrypoint: reads little-endian `f32` cells into a square map
/// and decodes it as a single-channel stack.
#[cfg(feature = "fuzzing")]
pub fn fuzz_decode_bytes(bytes: &[u8]) -> Result<(), LandmarkError> {
    let cells: Vec<f32> = bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    let mut side = (cells.len() as f64).sqrt() as usize;
    while side * side > cells.len() {
        side -= 1;
    }
    if side == 0 {
        return Ok(());
    }
    let stack = HeatmapStack::from_flat(1, side, side, &cells[..side * side])?;
    let codec = HeatmapCodec::new(side, 1.0)?.with_num_keypoints(1);
    let _ = codec.decode(&stack)?;
    Ok(())
}
