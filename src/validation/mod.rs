//! Corpus validation for landmarkit.
//!
//! Checks an image directory against a label directory and decides which
//! pairs can be trusted as ground truth:
//! - Pairing: every image has a label with the same stem and vice versa
//! - Parsing: each label is JSON with `image`, `width`, `height`, `landmarks`
//! - Cross-check: the referenced image is readable and its size matches
//! - Landmarks: the expected count, with valid ids and in-bounds coordinates
//!
//! Validation never stops at the first problem. Every issue is recorded and
//! only pairs that pass every check enter the [`DatasetManifest`].

mod report;

pub use report::{IssueKind, ValidationIssue, ValidationReport, CSV_HEADER};

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::LandmarkError;
use crate::ir::NUM_KEYPOINTS;

/// Image extensions recognized when pairing, matched case-insensitively.
pub const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];
pub const LABEL_EXTENSION: &str = "json";

/// Options for validation behavior.
#[derive(Clone, Debug)]
pub struct ValidateOptions {
    /// Number of landmarks every label must carry.
    pub num_keypoints: usize,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            num_keypoints: NUM_KEYPOINTS,
        }
    }
}

/// One trusted image/label pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub image: PathBuf,
    pub label: PathBuf,
}

/// The pairs that passed every validation step, sorted by label path.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetManifest {
    pub entries: Vec<ManifestEntry>,
}

impl DatasetManifest {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn read_json(path: &Path) -> Result<Self, LandmarkError> {
        let data = fs::read_to_string(path)?;
        serde_json::from_str(&data).map_err(|source| LandmarkError::LabelParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn write_json(&self, path: &Path) -> Result<(), LandmarkError> {
        let json = serde_json::to_string_pretty(self).map_err(|source| {
            LandmarkError::JsonWrite {
                path: path.to_path_buf(),
                source,
            }
        })?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// Everything a validation run produces.
#[derive(Clone, Debug, Default)]
pub struct ValidationOutcome {
    pub report: ValidationReport,
    pub manifest: DatasetManifest,
}

/// Validates a labeled corpus.
///
/// Only I/O failures on the directories themselves are errors; every
/// problem with an individual file becomes an issue in the report.
pub fn validate_corpus(
    images_dir: &Path,
    labels_dir: &Path,
    opts: &ValidateOptions,
) -> Result<ValidationOutcome, LandmarkError> {
    let images = list_files(images_dir, &IMAGE_EXTENSIONS)?;
    let labels = list_files(labels_dir, &[LABEL_EXTENSION])?;
    info!(
        images = images.len(),
        labels = labels.len(),
        "scanning corpus"
    );

    let mut images_by_stem: BTreeMap<String, Vec<&str>> = BTreeMap::new();
    for name in &images {
        images_by_stem.entry(stem(name)).or_default().push(name);
    }
    let label_stems: BTreeSet<String> = labels.iter().map(|name| stem(name)).collect();

    let mut report = ValidationReport::new();
    for name in &images {
        if !label_stems.contains(&stem(name)) {
            report.add(ValidationIssue::new(
                IssueKind::MissingLabel,
                name.as_str(),
                format!("expected {}.{}", stem(name), LABEL_EXTENSION),
            ));
        }
    }
    for name in &labels {
        if !images_by_stem.contains_key(&stem(name)) {
            report.add(ValidationIssue::new(
                IssueKind::MissingImage,
                name.as_str(),
                format!("no image with stem '{}'", stem(name)),
            ));
        }
    }
    info!(
        missing_labels = report.count(IssueKind::MissingLabel),
        missing_images = report.count(IssueKind::MissingImage),
        "pairing checked"
    );

    let issues = Mutex::new(report.issues);
    let mut entries: Vec<ManifestEntry> = labels
        .par_iter()
        .filter_map(|name| {
            let paired = images_by_stem
                .get(&stem(name))
                .and_then(|names| names.first().copied());
            let check = LabelCheck {
                images_dir,
                label_path: labels_dir.join(name),
                label_name: name,
                paired_image: paired,
                num_keypoints: opts.num_keypoints,
            };
            let (found, image) = check.run();
            let passed = found.is_empty();
            issues
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .extend(found);

            match (passed, paired, image) {
                (true, Some(_), Some(image)) => Some(ManifestEntry {
                    image,
                    label: check.label_path,
                }),
                _ => None,
            }
        })
        .collect();
    entries.sort_by(|a, b| a.label.cmp(&b.label));

    let mut report = ValidationReport {
        issues: issues.into_inner().unwrap_or_else(PoisonError::into_inner),
    };
    report.sort();

    info!(
        issues = report.len(),
        trusted = entries.len(),
        "validation finished"
    );
    Ok(ValidationOutcome {
        report,
        manifest: DatasetManifest { entries },
    })
}

/// File names directly inside `dir` with one of the given extensions, sorted.
pub(crate) fn list_files(dir: &Path, extensions: &[&str]) -> Result<Vec<String>, LandmarkError> {
    let mut names = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|source| LandmarkError::DatasetTraversal {
            path: dir.to_path_buf(),
            message: format!("failed while traversing directory: {source}"),
        })?;
        if !entry.file_type().is_file() || !has_extension(entry.path(), extensions) {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

fn has_extension(path: &Path, allowed: &[&str]) -> bool {
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return false;
    };

    allowed
        .iter()
        .any(|allowed_ext| ext.eq_ignore_ascii_case(allowed_ext))
}

pub(crate) fn stem(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name)
        .to_string()
}

/// Checks for a single label file.
struct LabelCheck<'a> {
    images_dir: &'a Path,
    label_path: PathBuf,
    label_name: &'a str,
    paired_image: Option<&'a str>,
    num_keypoints: usize,
}

impl LabelCheck<'_> {
    /// Returns the issues found and the resolved image path, if any.
    fn run(&self) -> (Vec<ValidationIssue>, Option<PathBuf>) {
        let mut issues = Vec::new();
        let image = self.check(&mut issues);
        debug!(label = self.label_name, issues = issues.len(), "label checked");
        (issues, image)
    }

    fn check(&self, issues: &mut Vec<ValidationIssue>) -> Option<PathBuf> {
        let label_issue =
            |kind, detail: String| ValidationIssue::new(kind, self.label_name, detail);

        let data = match fs::read_to_string(&self.label_path) {
            Ok(data) => data,
            Err(err) => {
                issues.push(label_issue(IssueKind::BadJson, err.to_string()));
                return None;
            }
        };
        let obj = match serde_json::from_str::<Value>(&data) {
            Ok(Value::Object(obj)) => obj,
            Ok(_) => {
                issues.push(label_issue(
                    IssueKind::BadJson,
                    "top-level value is not an object".to_string(),
                ));
                return None;
            }
            Err(err) => {
                issues.push(label_issue(IssueKind::BadJson, err.to_string()));
                return None;
            }
        };

        let image_field = obj.get("image").and_then(Value::as_str);
        let width = obj.get("width").and_then(Value::as_u64);
        let height = obj.get("height").and_then(Value::as_u64);
        let landmarks = obj.get("landmarks").and_then(Value::as_array);
        for (field, present) in [
            ("image", image_field.is_some()),
            ("width", width.is_some()),
            ("height", height.is_some()),
            ("landmarks", landmarks.is_some()),
        ] {
            if !present {
                issues.push(label_issue(
                    IssueKind::MissingField,
                    describe_missing(&obj, field),
                ));
            }
        }

        let Some(image_name) = image_field.or(self.paired_image) else {
            issues.push(label_issue(
                IssueKind::UnreadableImage,
                "no image referenced and none paired by stem".to_string(),
            ));
            return None;
        };
        let image_path = self.images_dir.join(image_name);
        let (actual_w, actual_h) = match read_dimensions(&image_path) {
            Ok(dims) => dims,
            Err(detail) => {
                issues.push(label_issue(IssueKind::UnreadableImage, detail));
                return None;
            }
        };

        let image_issue = |kind, detail: String| ValidationIssue::new(kind, image_name, detail);

        if let (Some(w), Some(h)) = (width, height) {
            if w != actual_w || h != actual_h {
                issues.push(image_issue(
                    IssueKind::SizeMismatch,
                    format!("declared {}x{}, actual {}x{}", w, h, actual_w, actual_h),
                ));
            }
        }

        if let Some(landmarks) = landmarks {
            if landmarks.len() != self.num_keypoints {
                issues.push(image_issue(
                    IssueKind::BadKeypointCount,
                    format!("{} (expected {})", landmarks.len(), self.num_keypoints),
                ));
            }

            let mut seen_ids = BTreeSet::new();
            for (index, landmark) in landmarks.iter().enumerate() {
                let Some(lm) = landmark.as_object() else {
                    issues.push(image_issue(
                        IssueKind::MissingCoordinate,
                        format!("landmark #{} is not an object", index),
                    ));
                    continue;
                };

                let raw_id = lm.get("id").cloned().unwrap_or(Value::Null);
                match raw_id.as_u64() {
                    Some(id) if (1..=self.num_keypoints as u64).contains(&id) => {
                        if !seen_ids.insert(id) {
                            issues.push(image_issue(
                                IssueKind::BadKeypointId,
                                format!("id={} repeated", id),
                            ));
                        }
                    }
                    _ => issues.push(image_issue(
                        IssueKind::BadKeypointId,
                        format!(
                            "landmark #{} has id {} (expected 1..={})",
                            index, raw_id, self.num_keypoints
                        ),
                    )),
                }

                let x = lm.get("x").and_then(Value::as_f64);
                let y = lm.get("y").and_then(Value::as_f64);
                let (Some(x), Some(y)) = (x, y) else {
                    issues.push(image_issue(
                        IssueKind::MissingCoordinate,
                        format!("id={}", raw_id),
                    ));
                    continue;
                };

                let in_bounds =
                    (0.0..actual_w as f64).contains(&x) && (0.0..actual_h as f64).contains(&y);
                if !in_bounds {
                    issues.push(image_issue(
                        IssueKind::OutOfBounds,
                        format!(
                            "id={} x={} y={} image={}x{}",
                            raw_id, x, y, actual_w, actual_h
                        ),
                    ));
                }
            }
        }

        Some(image_path)
    }
}

/// Dimensions of a fully decodable image.
///
/// The header size must agree with the decoded pixels; a truncated or
/// corrupt file is unreadable even when its header parses.
fn read_dimensions(path: &Path) -> Result<(u64, u64), String> {
    let header =
        imagesize::size(path).map_err(|err| format!("{}: {}", path.display(), err))?;
    let decoded = image::open(path).map_err(|err| format!("{}: {}", path.display(), err))?;
    let (width, height) = (u64::from(decoded.width()), u64::from(decoded.height()));
    if (header.width as u64, header.height as u64) != (width, height) {
        return Err(format!(
            "{}: header says {}x{}, pixels decode to {}x{}",
            path.display(),
            header.width,
            header.height,
            width,
            height
        ));
    }
    Ok((width, height))
}

fn describe_missing(obj: &Map<String, Value>, field: &str) -> String {
    match obj.get(field) {
        None => field.to_string(),
        Some(value) => format!("{} has wrong type: {}", field, value),
    }
}
