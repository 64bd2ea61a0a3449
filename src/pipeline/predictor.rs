//! The external prediction boundary.
//!
//! The network is opaque to this crate: it takes a normalized input tensor
//! and returns one response map per landmark. Anything that can do that is
//! a [`HeatmapPredictor`], whether it wraps a loaded model, a remote
//! service, or a fixed answer for tests.

use super::tensor::InputTensor;
use crate::heatmap::{HeatmapCodec, HeatmapStack};
use crate::ir::{HeatmapGrid, KeypointSet};

/// Error type returned by predictor implementations.
pub type PredictorError = Box<dyn std::error::Error + Send + Sync>;

/// Capability interface for the model call.
///
/// Calls are synchronous. Implementations bound to a single device should
/// serialize concurrent calls themselves.
pub trait HeatmapPredictor: Send + Sync {
    fn predict(&self, input: &InputTensor) -> Result<HeatmapStack, PredictorError>;
}

impl<F> HeatmapPredictor for F
where
    F: Fn(&InputTensor) -> Result<HeatmapStack, PredictorError> + Send + Sync,
{
    fn predict(&self, input: &InputTensor) -> Result<HeatmapStack, PredictorError> {
        self(input)
    }
}

/// Deterministic predictor that always answers with the same keypoints.
///
/// The keypoints are rendered once with the given codec, so decoding the
/// answer recovers them.
#[derive(Clone, Debug)]
pub struct FixedPointsPredictor {
    stack: HeatmapStack,
    expected_input: Option<u32>,
}

impl FixedPointsPredictor {
    pub fn new(points: &KeypointSet<HeatmapGrid>, codec: &HeatmapCodec) -> Self {
        Self {
            stack: codec.encode(points),
            expected_input: None,
        }
    }

    /// Rejects tensors whose side length differs from `size`.
    #[must_use]
    pub fn expecting_input_size(mut self, size: u32) -> Self {
        self.expected_input = Some(size);
        self
    }
}

impl HeatmapPredictor for FixedPointsPredictor {
    fn predict(&self, input: &InputTensor) -> Result<HeatmapStack, PredictorError> {
        if let Some(expected) = self.expected_input {
            if input.size() != expected {
                return Err(format!(
                    "input tensor is {0}x{0}, model expects {1}x{1}",
                    input.size(),
                    expected
                )
                .into());
            }
        }
        Ok(self.stack.clone())
    }
}
