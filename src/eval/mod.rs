//! Prediction accuracy.
//!
//! Mean Radial Error (MRE) is the mean Euclidean distance, in original image
//! pixels, between each predicted landmark and its ground truth, taken over
//! every point of every image.

use std::fmt;
use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::LandmarkError;
use crate::ir::io_label_json::read_ground_truth;
use crate::ir::io_predictions::read_predictions;
use crate::ir::{KeypointSet, Original};
use crate::validation::{list_files, stem, LABEL_EXTENSION};

/// Accuracy of a set of predictions against ground truth.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EvalReport {
    /// Number of evaluated images.
    pub images: usize,
    /// Number of evaluated points.
    pub points: usize,
    pub mean_radial_error: f64,
    pub per_landmark: Vec<LandmarkAccuracy>,
    /// Prediction files without a matching label.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unmatched: Vec<String>,
}

/// Error statistics for one landmark id.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LandmarkAccuracy {
    pub id: u32,
    pub mean: f64,
    pub max: f64,
}

/// Distance between each predicted point and its ground truth, in id order.
pub fn radial_errors(
    predicted: &KeypointSet<Original>,
    truth: &KeypointSet<Original>,
) -> Result<Vec<f64>, LandmarkError> {
    if predicted.len() != truth.len() {
        return Err(LandmarkError::InvalidKeypoints {
            message: format!(
                "prediction has {} points, ground truth has {}",
                predicted.len(),
                truth.len()
            ),
        });
    }
    Ok(predicted
        .positions()
        .zip(truth.positions())
        .map(|(p, t)| p.distance(&t))
        .collect())
}

/// Computes MRE and per-landmark statistics over `(predicted, truth)` pairs.
pub fn mean_radial_error(
    pairs: &[(KeypointSet<Original>, KeypointSet<Original>)],
) -> Result<EvalReport, LandmarkError> {
    let Some((first, _)) = pairs.first() else {
        return Err(LandmarkError::InvalidKeypoints {
            message: "no prediction/ground-truth pairs to evaluate".to_string(),
        });
    };

    let mut sums = vec![0.0; first.len()];
    let mut maxes = vec![0.0f64; first.len()];
    let mut total = 0.0;
    let mut points = 0;

    for (predicted, truth) in pairs {
        let errors = radial_errors(predicted, truth)?;
        if errors.len() != sums.len() {
            return Err(LandmarkError::InvalidKeypoints {
                message: format!(
                    "inconsistent keypoint count: {} then {}",
                    sums.len(),
                    errors.len()
                ),
            });
        }
        for (i, err) in errors.into_iter().enumerate() {
            sums[i] += err;
            maxes[i] = maxes[i].max(err);
            total += err;
            points += 1;
        }
    }

    let per_landmark = first
        .iter()
        .zip(sums.iter().zip(&maxes))
        .map(|(kp, (sum, max))| LandmarkAccuracy {
            id: kp.id.as_u32(),
            mean: sum / pairs.len() as f64,
            max: *max,
        })
        .collect();

    Ok(EvalReport {
        images: pairs.len(),
        points,
        mean_radial_error: total / points as f64,
        per_landmark,
        unmatched: Vec::new(),
    })
}

/// Evaluates every prediction file in `predictions_dir` against the label
/// with the same stem in `labels_dir`. Both sides must hold exactly
/// `num_keypoints` points.
pub fn evaluate_dirs(
    predictions_dir: &Path,
    labels_dir: &Path,
    num_keypoints: usize,
) -> Result<EvalReport, LandmarkError> {
    let mut pairs = Vec::new();
    let mut unmatched = Vec::new();

    for name in list_files(predictions_dir, &[LABEL_EXTENSION])? {
        let label_path = labels_dir.join(format!("{}.{}", stem(&name), LABEL_EXTENSION));
        if !label_path.is_file() {
            warn!(prediction = %name, "no ground truth label; skipping");
            unmatched.push(name);
            continue;
        }
        let predicted = read_predictions(&predictions_dir.join(&name), num_keypoints)?;
        let (_, truth) = read_ground_truth(&label_path, num_keypoints)?;
        pairs.push((predicted, truth));
    }

    let mut report = mean_radial_error(&pairs)?;
    report.unmatched = unmatched;
    info!(
        images = report.images,
        mre = report.mean_radial_error,
        "evaluated predictions"
    );
    Ok(report)
}

impl fmt::Display for EvalReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Mean Radial Error: {:.3} px ({} points over {} images)",
            self.mean_radial_error, self.points, self.images
        )?;
        writeln!(f)?;
        writeln!(f, "  {:>4}  {:>10}  {:>10}", "id", "mean", "max")?;
        for lm in &self.per_landmark {
            writeln!(f, "  {:>4}  {:>10.3}  {:>10.3}", lm.id, lm.mean, lm.max)?;
        }
        if !self.unmatched.is_empty() {
            writeln!(f)?;
            writeln!(f, "Skipped {} prediction(s) without labels:", self.unmatched.len())?;
            for name in &self.unmatched {
                writeln!(f, "  {}", name)?;
            }
        }
        Ok(())
    }
}
