//! Keypoint data model for landmarkit.
//!
//! This module defines the types every other stage works in terms of:
//! typed points, keypoint sets, and the on-disk label and prediction
//! formats.
//!
//! # Design Principles
//!
//! 1. **Type Safety**: Points carry a marker type for their coordinate space
//!    ([`Original`], [`ModelInput`], [`HeatmapGrid`]) so that pixel values
//!    from different stages cannot be mixed without an explicit transform.
//!
//! 2. **Stable Order**: A [`KeypointSet`] is always sorted by id and its ids
//!    always form `1..=n`, so channel `i` of a heatmap stack is keypoint
//!    `i + 1`.
//!
//! 3. **Strict Loading, Lenient Validation**: The loaders here reject
//!    malformed files outright. The [`validation`](crate::validation) module
//!    parses leniently so it can report every problem in a corpus.
//!
//! # Example
//!
//! ```
//! use landmarkit::ir::{KeypointSet, Original, Point, NUM_KEYPOINTS};
//!
//! let set: KeypointSet<Original> = KeypointSet::from_positions(
//!     (0..NUM_KEYPOINTS).map(|i| Point::new(i as f64, 2.0 * i as f64)),
//! )
//! .unwrap();
//! assert_eq!(set.len(), NUM_KEYPOINTS);
//! ```

mod coord;
pub mod io_label_json;
pub mod io_predictions;
mod keypoint;
mod space;

pub use coord::Point;
pub use keypoint::{Keypoint, KeypointId, KeypointSet, NUM_KEYPOINTS};
pub use space::{CoordinateSpace, HeatmapGrid, ModelInput, Original};
