//! Landmark label files.
//!
//! One JSON file per image:
//!
//! ```json
//! {
//!   "image": "Image 1.jpg",
//!   "width": 1200,
//!   "height": 1600,
//!   "landmarks": [{"id": 1, "x": 512, "y": 640}, ...]
//! }
//! ```
//!
//! Field names are part of the on-disk contract and must not change. This
//! module is the strict loader: anything malformed is an error. The
//! validator does its own lenient, issue-collecting parse.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::keypoint::{Keypoint, KeypointSet};
use super::space::Original;
use crate::error::LandmarkError;

/// Label file contents.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LabelFile {
    /// File name of the labeled image, relative to the image directory.
    pub image: String,
    pub width: u32,
    pub height: u32,
    pub landmarks: Vec<LabelLandmark>,
}

/// One landmark entry as stored on disk.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LabelLandmark {
    pub id: u32,
    pub x: f64,
    pub y: f64,
}

impl LabelFile {
    /// Builds a label from a keypoint set in original image coordinates.
    pub fn from_keypoints(
        image: impl Into<String>,
        width: u32,
        height: u32,
        keypoints: &KeypointSet<Original>,
    ) -> Self {
        Self {
            image: image.into(),
            width,
            height,
            landmarks: keypoints
                .iter()
                .map(|kp| LabelLandmark {
                    id: kp.id.as_u32(),
                    x: kp.position.x,
                    y: kp.position.y,
                })
                .collect(),
        }
    }

    /// The landmarks as a keypoint set of exactly `expected` points, sorted
    /// by id.
    pub fn keypoints(&self, expected: usize) -> Result<KeypointSet<Original>, LandmarkError> {
        let points = self
            .landmarks
            .iter()
            .map(|lm| Keypoint::new(lm.id, lm.x, lm.y))
            .collect();
        KeypointSet::with_len(points, expected)
    }
}

/// Reads a label file.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
pub fn read_label_file(path: &Path) -> Result<LabelFile, LandmarkError> {
    let file = File::open(path).map_err(LandmarkError::Io)?;
    let reader = BufReader::new(file);

    serde_json::from_reader(reader).map_err(|source| LandmarkError::LabelParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads a label file and returns it with its `expected` keypoints.
pub fn read_ground_truth(
    path: &Path,
    expected: usize,
) -> Result<(LabelFile, KeypointSet<Original>), LandmarkError> {
    let label = read_label_file(path)?;
    let keypoints = label
        .keypoints(expected)
        .map_err(|err| LandmarkError::LabelInvalid {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
    Ok((label, keypoints))
}

/// Writes a label file as pretty-printed JSON.
pub fn write_label_file(path: &Path, label: &LabelFile) -> Result<(), LandmarkError> {
    let file = File::create(path).map_err(LandmarkError::Io)?;
    let writer = BufWriter::new(file);

    serde_json::to_writer_pretty(writer, label).map_err(|source| LandmarkError::JsonWrite {
        path: path.to_path_buf(),
        source,
    })
}

/// Parses a label from a JSON string.
pub fn from_label_str(json: &str) -> Result<LabelFile, serde_json::Error> {
    serde_json::from_str(json)
}

/// Parses a label from raw bytes without requiring UTF-8 upfront.
pub fn from_label_slice(bytes: &[u8]) -> Result<LabelFile, serde_json::Error> {
    serde_json::from_slice(bytes)
}

/// Serializes a label to a pretty JSON string.
pub fn to_label_string(label: &LabelFile) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(label)
}
