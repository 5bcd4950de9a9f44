//! Error types for translation runs

use lingodok_ooxml::{OoxmlError, RunId};
use thiserror::Error;

/// Error type produced by text transforms
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for translation operations
pub type Result<T> = std::result::Result<T, TranslateError>;

/// Errors that can occur while translating a package
#[derive(Error, Debug)]
pub enum TranslateError {
    /// Opening, scanning, rewriting or saving the package failed
    #[error(transparent)]
    Package(#[from] OoxmlError),

    /// The transform failed for a run
    #[error("Translation failed for run {id}: {source}")]
    Translation {
        id: RunId,
        #[source]
        source: BoxError,
    },

    /// A batch transform failed or returned the wrong number of texts
    #[error("Batch translation of {runs} runs failed: {source}")]
    Batch {
        runs: usize,
        #[source]
        source: BoxError,
    },

    /// A transform task panicked or was cancelled
    #[error("Transform task did not complete: {reason}")]
    TaskFailed { reason: String },

    /// Configuration file could not be parsed
    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// A skip pattern is not a valid regular expression
    #[error("Invalid skip pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Configuration file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TranslateError {
    /// Wrap a transform failure
    pub fn translation(id: RunId, source: impl Into<BoxError>) -> Self {
        Self::Translation {
            id,
            source: source.into(),
        }
    }

    /// Wrap a batch transform failure
    pub fn batch(runs: usize, source: impl Into<BoxError>) -> Self {
        Self::Batch {
            runs,
            source: source.into(),
        }
    }

    /// Get the error code for diagnostics
    pub fn code(&self) -> &'static str {
        match self {
            Self::Package(inner) => inner.code(),
            Self::Translation { .. } => "TRANS001",
            Self::TaskFailed { .. } => "TRANS002",
            Self::Config(_) => "TRANS003",
            Self::Pattern(_) => "TRANS004",
            Self::Io(_) => "TRANS005",
            Self::Batch { .. } => "TRANS006",
        }
    }
}
