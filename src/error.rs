use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::validation::ValidationReport;

/// The main error type for orchardlabel operations.
#[derive(Debug, Error)]
pub enum OrchardError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed label line in {path}:{line}: {message}")]
    MalformedLabelLine {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Cannot determine image dimensions for {path}: {message}")]
    MissingImageDimensions { path: PathBuf, message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Failed to parse dataset profile {path}: {source}")]
    ProfileParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to parse COCO JSON from {path}: {source}")]
    CocoJsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write COCO JSON to {path}: {source}")]
    CocoJsonWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize report: {0}")]
    ReportSerialize(#[source] serde_json::Error),

    #[error("Failed to traverse image directory {path}: {message}")]
    ImageDirTraversal { path: PathBuf, message: String },

    #[error("Validation failed with {error_count} error(s) and {warning_count} warning(s)")]
    ValidationFailed {
        error_count: usize,
        warning_count: usize,
        report: ValidationReport,
    },
}

impl OrchardError {
    /// Shorthand for a [`OrchardError::Configuration`] error.
    pub fn config(message: impl Into<String>) -> Self {
        OrchardError::Configuration {
            message: message.into(),
        }
    }

    /// Wraps an I/O error from reading `path`.
    pub fn read(path: &Path, source: std::io::Error) -> Self {
        OrchardError::FileRead {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Wraps an I/O error from writing `path`.
    pub fn write(path: &Path, source: std::io::Error) -> Self {
        OrchardError::FileWrite {
            path: path.to_path_buf(),
            source,
        }
    }
}
