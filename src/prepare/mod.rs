//! Corpus preprocessing.
//!
//! Turns a validated corpus into model-ready training data: every image is
//! letterboxed onto the square model input and its landmarks are moved into
//! model-input pixels, so the label's `width` and `height` both become the
//! target size.

use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info};

use crate::error::LandmarkError;
use crate::ir::io_label_json::{read_ground_truth, write_label_file, LabelFile};
use crate::ir::{KeypointSet, ModelInput, Original, Point};
use crate::pipeline::render_model_input;
use crate::transform::{Letterbox, PointTransform, Preprocess};
use crate::validation::{DatasetManifest, ManifestEntry};

/// Where prepared files were written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrepareSummary {
    pub processed: usize,
    pub images_dir: PathBuf,
    pub labels_dir: PathBuf,
}

/// Letterboxes every manifest entry into `<out_dir>/images` and
/// `<out_dir>/labels`, keeping file names. Each label must hold exactly
/// `num_keypoints` landmarks.
pub fn letterbox_corpus(
    manifest: &DatasetManifest,
    out_dir: &Path,
    target_size: u32,
    num_keypoints: usize,
) -> Result<PrepareSummary, LandmarkError> {
    let images_dir = out_dir.join("images");
    let labels_dir = out_dir.join("labels");
    fs::create_dir_all(&images_dir)?;
    fs::create_dir_all(&labels_dir)?;

    manifest
        .entries
        .par_iter()
        .try_for_each(|entry| {
            prepare_entry(entry, &images_dir, &labels_dir, target_size, num_keypoints)
        })?;

    info!(
        processed = manifest.len(),
        target_size,
        out = %out_dir.display(),
        "letterboxed corpus"
    );
    Ok(PrepareSummary {
        processed: manifest.len(),
        images_dir,
        labels_dir,
    })
}

fn prepare_entry(
    entry: &ManifestEntry,
    images_dir: &Path,
    labels_dir: &Path,
    target_size: u32,
    num_keypoints: usize,
) -> Result<(), LandmarkError> {
    let (label, keypoints) = read_ground_truth(&entry.label, num_keypoints)?;
    let image = image::open(&entry.image).map_err(|source| LandmarkError::ImageDecode {
        path: Some(entry.image.clone()),
        source,
    })?;

    let letterbox = Letterbox::new(target_size, image.width(), image.height())?;
    let preprocess = Preprocess::Letterbox(letterbox);
    let canvas = render_model_input(&image, &preprocess);

    let image_name = file_name(&entry.image);
    let out_image = images_dir.join(&image_name);
    canvas
        .save(&out_image)
        .map_err(|source| LandmarkError::ImageWrite {
            path: out_image.clone(),
            source,
        })?;

    let moved = as_prepared(&letterbox.forward_set(&keypoints));
    let out_label = LabelFile::from_keypoints(image_name, target_size, target_size, &moved);
    write_label_file(&labels_dir.join(file_name(&entry.label)), &out_label)?;

    debug!(label = %label.image, scale = letterbox.scale(), "prepared entry");
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// A prepared image is the original image of the training corpus, so its
/// model-input keypoints are relabeled as original pixels.
fn as_prepared(points: &KeypointSet<ModelInput>) -> KeypointSet<Original> {
    points.map(|p| Point::new(p.x, p.y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::io_label_json::read_label_file;
    use crate::ir::NUM_KEYPOINTS;
    use image::{GenericImageView, Rgb, RgbImage};

    #[test]
    fn letterboxes_images_and_labels() {
        let temp = tempfile::tempdir().unwrap();
        let src = temp.path().join("src");
        fs::create_dir_all(&src).unwrap();

        let image_path = src.join("a.png");
        RgbImage::from_pixel(100, 200, Rgb([200, 200, 200]))
            .save(&image_path)
            .unwrap();
        let keypoints = KeypointSet::from_positions(
            (0..NUM_KEYPOINTS).map(|i| Point::new(50.0, 5.0 * i as f64)),
        )
        .unwrap();
        let label_path = src.join("a.json");
        write_label_file(
            &label_path,
            &LabelFile::from_keypoints("a.png", 100, 200, &keypoints),
        )
        .unwrap();

        let manifest = DatasetManifest {
            entries: vec![ManifestEntry {
                image: image_path,
                label: label_path,
            }],
        };
        let out = temp.path().join("processed");
        let summary = letterbox_corpus(&manifest, &out, 256, NUM_KEYPOINTS).unwrap();
        assert_eq!(summary.processed, 1);

        let prepared = image::open(summary.images_dir.join("a.png")).unwrap();
        assert_eq!(prepared.dimensions(), (256, 256));

        let label = read_label_file(&summary.labels_dir.join("a.json")).unwrap();
        assert_eq!((label.width, label.height), (256, 256));
        assert_eq!(label.image, "a.png");
        // (50, 20) -> (50 * 1.28 + 64, 20 * 1.28)
        let lm = label.landmarks.iter().find(|lm| lm.id == 5).unwrap();
        assert!((lm.x - 128.0).abs() < 1e-9);
        assert!((lm.y - 25.6).abs() < 1e-9);
    }

    #[test]
    fn unreadable_image_fails() {
        let temp = tempfile::tempdir().unwrap();
        let keypoints = KeypointSet::from_positions(
            (0..NUM_KEYPOINTS).map(|_| Point::new(1.0, 1.0)),
        )
        .unwrap();
        let label_path = temp.path().join("a.json");
        write_label_file(
            &label_path,
            &LabelFile::from_keypoints("a.png", 10, 10, &keypoints),
        )
        .unwrap();
        let manifest = DatasetManifest {
            entries: vec![ManifestEntry {
                image: temp.path().join("a.png"),
                label: label_path,
            }],
        };
        let err = letterbox_corpus(&manifest, &temp.path().join("out"), 64, NUM_KEYPOINTS)
            .unwrap_err();
        assert!(matches!(err, LandmarkError::ImageDecode { .. }));
    }

    #[test]
    fn honors_configured_landmark_count() {
        let temp = tempfile::tempdir().unwrap();
        let image_path = temp.path().join("a.png");
        RgbImage::from_pixel(40, 20, Rgb([0, 0, 0]))
            .save(&image_path)
            .unwrap();
        let keypoints =
            KeypointSet::from_positions((0..5).map(|i| Point::new(4.0 * i as f64, 10.0)))
                .unwrap();
        let label_path = temp.path().join("a.json");
        write_label_file(
            &label_path,
            &LabelFile::from_keypoints("a.png", 40, 20, &keypoints),
        )
        .unwrap();
        let manifest = DatasetManifest {
            entries: vec![ManifestEntry {
                image: image_path,
                label: label_path,
            }],
        };

        let out = temp.path().join("out");
        let summary = letterbox_corpus(&manifest, &out, 64, 5).unwrap();
        let label = read_label_file(&summary.labels_dir.join("a.json")).unwrap();
        assert_eq!(label.landmarks.len(), 5);

        let err = letterbox_corpus(&manifest, &out, 64, NUM_KEYPOINTS).unwrap_err();
        assert!(matches!(err, LandmarkError::LabelInvalid { .. }));
    }
}
