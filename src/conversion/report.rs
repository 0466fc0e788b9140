//! Conversion report types.
//!
//! Every input the converter could not use verbatim leaves a trace here:
//! skipped label lines, missing label files, unreadable images, clamped and
//! dropped boxes.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// What happened while assembling one split.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ConversionReport {
    /// Split name (`train`, `val`, `all`, ...).
    pub split: String,
    /// Images listed for the split.
    pub listed_images: usize,
    /// Counts in the emitted document.
    pub output: ConversionCounts,
    pub issues: Vec<ConversionIssue>,
}

impl ConversionReport {
    pub fn new(split: impl Into<String>) -> Self {
        Self {
            split: split.into(),
            ..Default::default()
        }
    }

    pub fn add(&mut self, issue: ConversionIssue) {
        self.issues.push(issue);
    }

    pub fn extend(&mut self, issues: impl IntoIterator<Item = ConversionIssue>) {
        self.issues.extend(issues);
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == ConversionSeverity::Warning)
            .count()
    }

    pub fn info_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == ConversionSeverity::Info)
            .count()
    }

    /// Number of issues carrying `code`.
    pub fn count(&self, code: ConversionIssueCode) -> usize {
        self.issues.iter().filter(|i| i.code == code).count()
    }
}

impl fmt::Display for ConversionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "[{}] {} listed, {} images, {} annotations",
            self.split, self.listed_images, self.output.images, self.output.annotations
        )?;

        let dropped = self.count(ConversionIssueCode::DroppedBox);
        let clipped = self.count(ConversionIssueCode::ClampedBox);
        if dropped > 0 || clipped > 0 {
            writeln!(f, "  boxes: {clipped} clamped, {dropped} dropped")?;
        }

        let warnings = self.warning_count();
        if warnings > 0 {
            writeln!(f, "  Warnings ({warnings}):")?;
            for issue in self
                .issues
                .iter()
                .filter(|i| i.severity == ConversionSeverity::Warning)
            {
                writeln!(f, "    - {issue}")?;
            }
        }

        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ConversionCounts {
    pub images: usize,
    pub categories: usize,
    pub annotations: usize,
}

/// A single thing the converter noticed.
#[derive(Clone, Debug, Serialize)]
pub struct ConversionIssue {
    pub severity: ConversionSeverity,
    pub code: ConversionIssueCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl ConversionIssue {
    pub fn warning(code: ConversionIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: ConversionSeverity::Warning,
            code,
            message: message.into(),
            path: None,
            line: None,
        }
    }

    pub fn info(code: ConversionIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: ConversionSeverity::Info,
            code,
            message: message.into(),
            path: None,
            line: None,
        }
    }

    /// Attaches the file (and optionally the line) the issue refers to.
    pub fn at(mut self, path: &Path, line: Option<usize>) -> Self {
        self.path = Some(path.to_path_buf());
        self.line = line;
        self
    }
}

impl fmt::Display for ConversionIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.path, self.line) {
            (Some(path), Some(line)) => write!(f, "{}:{}: {}", path.display(), line, self.message),
            (Some(path), None) => write!(f, "{}: {}", path.display(), self.message),
            _ => write!(f, "{}", self.message),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionSeverity {
    /// Input was lost or ignored.
    Warning,
    /// Input was adjusted but nothing was lost.
    Info,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionIssueCode {
    /// A malformed label line was skipped under the skip policy.
    SkippedMalformedLine,
    /// A listed image had no label file.
    MissingLabelFile,
    /// A listed image could not be found or its size could not be read.
    MissingImage,
    /// A split list named the same stem more than once.
    DuplicateStem,
    /// A box was clamped to the image bounds.
    ClampedBox,
    /// A box had no area left after clamping.
    DroppedBox,
}
