use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the segmentation and extraction engines.
///
/// Only `PatternEngine` and `Config` are fatal; they are raised while the
/// engines are built, before any document is touched. Everything else is
/// scoped to a page or a document and the batch carries on.
#[derive(Debug, Error)]
pub enum SieveError {
    #[error("Input not readable: {path}: {reason}")]
    MissingInput { path: PathBuf, reason: String },

    #[error("Page {page} could not be copied: {reason}")]
    CopyFailure { page: usize, reason: String },

    #[error("Page {page} could not be rasterized: {reason}")]
    RasterizeFailure { page: usize, reason: String },

    #[error("Artifact {name} has no pages")]
    ArtifactEmpty { name: String },

    #[error("Malformed rule {label:?}: {reason}")]
    PatternEngine { label: String, reason: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Text extraction failed for {path}: {reason}")]
    TextExtraction { path: PathBuf, reason: String },

    #[error("External tool not found: {0}")]
    ToolNotFound(String),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SieveError {
    pub fn missing_input(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::MissingInput {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn malformed_rule(label: &str, reason: impl ToString) -> Self {
        Self::PatternEngine {
            label: label.to_string(),
            reason: reason.to_string(),
        }
    }

    /// True for errors that must stop the process before any document is read.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::PatternEngine { .. } | Self::Config(_))
    }
}

pub type SieveResult<T> = Result<T, SieveError>;
