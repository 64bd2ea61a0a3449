use std::path::PathBuf;
use thiserror::Error;

use crate::validation::ValidationReport;

/// The main error type for landmarkit operations.
#[derive(Debug, Error)]
pub enum LandmarkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {message}")]
    Configuration { message: String },

    #[error("Failed to read config from {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to parse label JSON from {path}: {source}")]
    LabelParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid label file {path}: {message}")]
    LabelInvalid { path: PathBuf, message: String },

    #[error("Failed to write JSON to {path}: {source}")]
    JsonWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse predictions from {path}: {source}")]
    PredictionParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid keypoint set: {message}")]
    InvalidKeypoints { message: String },

    #[error("Heatmap stack has {found} channel(s), expected {expected}")]
    ChannelCountMismatch { expected: usize, found: usize },

    #[error("Heatmap channel {channel} contains a non-finite value at cell ({x}, {y})")]
    InvalidHeatmapValues { channel: usize, x: usize, y: usize },

    #[error("Heatmap shape mismatch: {message}")]
    HeatmapShapeMismatch { message: String },

    #[error("Failed to decode image{}: {}", path_suffix(.path), .source)]
    ImageDecode {
        path: Option<PathBuf>,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to write image to {path}: {source}")]
    ImageWrite {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Failure inside the external prediction boundary, passed through as-is.
    #[error(transparent)]
    ExternalModel(Box<dyn std::error::Error + Send + Sync>),

    #[error("Failed to write report to {path}: {source}")]
    ReportWrite {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to traverse {path}: {message}")]
    DatasetTraversal { path: PathBuf, message: String },

    #[error("Validation found {issue_count} issue(s)")]
    ValidationFailed {
        issue_count: usize,
        report: ValidationReport,
    },

    #[error("Invalid split parameters: {message}")]
    InvalidSplitParams { message: String },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

impl LandmarkError {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

fn path_suffix(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => format!(" {}", path.display()),
        None => String::new(),
    }
}
