//! Prediction files consumed by downstream record-keeping.
//!
//! A prediction is an ordered JSON array of K points in original image
//! coordinates; position `i` is landmark id `i + 1`. Readers accept each
//! point as `{"x": .., "y": ..}` or `[x, y]`; writers only produce the
//! object form.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use super::coord::Point;
use super::keypoint::KeypointSet;
use super::space::Original;
use crate::error::LandmarkError;

/// Reads a prediction file holding exactly `expected` points.
pub fn read_predictions(
    path: &Path,
    expected: usize,
) -> Result<KeypointSet<Original>, LandmarkError> {
    let file = File::open(path).map_err(LandmarkError::Io)?;
    let reader = BufReader::new(file);

    let points: Vec<Point<Original>> =
        serde_json::from_reader(reader).map_err(|source| LandmarkError::PredictionParse {
            path: path.to_path_buf(),
            source,
        })?;

    points_to_set(points, expected).map_err(|err| LandmarkError::LabelInvalid {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

/// Writes a keypoint set as a prediction file.
pub fn write_predictions(
    path: &Path,
    keypoints: &KeypointSet<Original>,
) -> Result<(), LandmarkError> {
    let file = File::create(path).map_err(LandmarkError::Io)?;
    let writer = BufWriter::new(file);

    let points: Vec<Point<Original>> = keypoints.positions().collect();
    serde_json::to_writer_pretty(writer, &points).map_err(|source| LandmarkError::JsonWrite {
        path: path.to_path_buf(),
        source,
    })
}

/// Parses a prediction array from a JSON string.
pub fn from_predictions_str(
    json: &str,
    expected: usize,
) -> Result<KeypointSet<Original>, LandmarkError> {
    let points: Vec<Point<Original>> =
        serde_json::from_str(json).map_err(|err| LandmarkError::InvalidKeypoints {
            message: err.to_string(),
        })?;
    points_to_set(points, expected)
}

/// Serializes a keypoint set to the prediction JSON form.
pub fn to_predictions_string(
    keypoints: &KeypointSet<Original>,
) -> Result<String, serde_json::Error> {
    let points: Vec<Point<Original>> = keypoints.positions().collect();
    serde_json::to_string(&points)
}

fn points_to_set(
    points: Vec<Point<Original>>,
    expected: usize,
) -> Result<KeypointSet<Original>, LandmarkError> {
    if points.len() != expected {
        return Err(LandmarkError::InvalidKeypoints {
            message: format!(
                "expected {} predicted points, found {}",
                expected,
                points.len()
            ),
        });
    }
    KeypointSet::from_positions(points)
}
