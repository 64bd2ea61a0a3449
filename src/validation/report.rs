//! Validation report types for structured error reporting.
//!
//! A report is a flat list of `(kind, subject, detail)` rows. It can be
//! printed for humans, serialized to JSON, or written as the CSV cleaning
//! report (`issue_type,file_or_image,details`).

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::error::LandmarkError;

/// Header row of the CSV cleaning report.
pub const CSV_HEADER: [&str; 3] = ["issue_type", "file_or_image", "details"];

/// The result of validating a corpus.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    /// All issues found, in `(kind, subject, detail)` order once sorted.
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Creates a new empty report.
    pub fn new() -> Self {
        Self { issues: Vec::new() }
    }

    /// Adds an issue to the report.
    pub fn add(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    /// Sorts issues into their canonical order.
    pub fn sort(&mut self) {
        self.issues.sort();
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    /// Returns true if there are no issues at all.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Number of issues of one kind.
    pub fn count(&self, kind: IssueKind) -> usize {
        self.issues.iter().filter(|i| i.kind == kind).count()
    }

    /// Issue counts per kind, omitting kinds that never occurred.
    pub fn counts(&self) -> BTreeMap<IssueKind, usize> {
        let mut counts = BTreeMap::new();
        for issue in &self.issues {
            *counts.entry(issue.kind).or_insert(0) += 1;
        }
        counts
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Writes the report as CSV, header first.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(CSV_HEADER)?;
        for issue in &self.issues {
            wtr.write_record([
                issue.kind.as_str(),
                issue.subject.as_str(),
                issue.detail.as_str(),
            ])?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Writes the CSV report to a file.
    pub fn write_csv_file(&self, path: &Path) -> Result<(), LandmarkError> {
        let file = std::fs::File::create(path)?;
        self.write_csv(std::io::BufWriter::new(file))
            .map_err(|source| LandmarkError::ReportWrite {
                path: path.to_path_buf(),
                source,
            })
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.issues.is_empty() {
            return writeln!(f, "Validation passed: no issues found");
        }

        writeln!(f, "Validation found {} issue(s):", self.issues.len())?;
        for (kind, count) in self.counts() {
            writeln!(f, "  {:<18} {}", kind, count)?;
        }
        writeln!(f)?;

        for issue in &self.issues {
            writeln!(f, "  {}", issue)?;
        }

        Ok(())
    }
}

/// A single problem found in the corpus.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    /// Label or image file name the issue is about.
    pub subject: String,
    pub detail: String,
}

impl ValidationIssue {
    pub fn new(kind: IssueKind, subject: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind,
            subject: subject.into(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.subject, self.detail)
    }
}

/// A stable code identifying the type of validation issue.
///
/// The declaration order is the report's primary sort key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum IssueKind {
    /// An image has no label with the same stem.
    MissingLabel,
    /// A label has no image with the same stem.
    MissingImage,
    /// A label file is not valid JSON.
    #[serde(rename = "BadJSON")]
    BadJson,
    /// A required label field is absent or has the wrong type.
    MissingField,
    /// Declared width/height differ from the image's actual size.
    SizeMismatch,
    /// The label does not hold exactly the expected number of landmarks.
    BadKeypointCount,
    /// A landmark lacks a numeric `x` or `y`.
    MissingCoordinate,
    /// A landmark lies outside the actual image.
    OutOfBounds,
    /// The referenced image is missing or its header cannot be read.
    UnreadableImage,
    /// A landmark id is missing, out of range, or repeated.
    BadKeypointId,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::MissingLabel => "MissingLabel",
            IssueKind::MissingImage => "MissingImage",
            IssueKind::BadJson => "BadJSON",
            IssueKind::MissingField => "MissingField",
            IssueKind::SizeMismatch => "SizeMismatch",
            IssueKind::BadKeypointCount => "BadKeypointCount",
            IssueKind::MissingCoordinate => "MissingCoordinate",
            IssueKind::OutOfBounds => "OutOfBounds",
            IssueKind::UnreadableImage => "UnreadableImage",
            IssueKind::BadKeypointId => "BadKeypointId",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
