//! Validation findings for COCO documents and split lists.

use std::fmt;

use serde::Serialize;

#[derive(Clone, Debug, Default, Serialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    pub fn error_count(&self) -> usize {
        self.count_severity(Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count_severity(Severity::Warning)
    }

    fn count_severity(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    /// No errors. Warnings are allowed.
    pub fn is_ok(&self) -> bool {
        self.error_count() == 0
    }

    /// No issues of any severity.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn has(&self, code: IssueCode) -> bool {
        self.issues.iter().any(|i| i.code == code)
    }

    /// Whether the report passes, treating warnings as errors when `strict`.
    pub fn passes(&self, strict: bool) -> bool {
        if strict {
            self.is_clean()
        } else {
            self.is_ok()
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.issues.is_empty() {
            return writeln!(f, "Validation passed: no issues found");
        }

        writeln!(
            f,
            "Validation found {} error(s) and {} warning(s):",
            self.error_count(),
            self.warning_count()
        )?;
        for issue in &self.issues {
            writeln!(f, "  {issue}")?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub code: IssueCode,
    pub message: String,
    pub context: IssueContext,
}

impl ValidationIssue {
    pub fn error(code: IssueCode, message: impl Into<String>, context: IssueContext) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            context,
        }
    }

    pub fn warning(code: IssueCode, message: impl Into<String>, context: IssueContext) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
            context,
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "ERROR",
            Severity::Warning => "WARN ",
        };
        write!(
            f,
            "[{}] {:?} in {}: {}",
            severity, self.code, self.context, self.message
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

/// Stable issue codes, serialized in snake_case.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    // Identifier uniqueness
    DuplicateImageId,
    DuplicateAnnotationId,
    DuplicateCategoryId,
    DuplicateFileName,

    // References
    MissingImageRef,
    MissingCategoryRef,
    MissingLicenseRef,

    // Records
    InvalidImageDimensions,
    EmptyFileName,
    EmptyCategoryName,
    NoCategories,

    // Boxes
    BBoxNotFinite,
    BBoxNegativeSize,
    BBoxOutOfBounds,
    InvalidBBoxArea,
    AreaMismatch,

    // Split lists
    DuplicateStem,
    SplitOverlap,
    StemNotInAnySplit,
    UnknownStem,
    EmptySplit,
}

/// Where an issue was found.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IssueContext {
    Dataset,
    Image { id: u64 },
    Annotation { id: u64 },
    Category { id: u64 },
    Split { name: String },
    Stem { stem: String },
}

impl fmt::Display for IssueContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueContext::Dataset => write!(f, "dataset"),
            IssueContext::Image { id } => write!(f, "image {id}"),
            IssueContext::Annotation { id } => write!(f, "annotation {id}"),
            IssueContext::Category { id } => write!(f, "category {id}"),
            IssueContext::Split { name } => write!(f, "split '{name}'"),
            IssueContext::Stem { stem } => write!(f, "stem '{stem}'"),
        }
    }
}
