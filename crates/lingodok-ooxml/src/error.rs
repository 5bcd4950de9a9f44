//! Error types for OOXML package operations

use std::path::PathBuf;

use thiserror::Error;

use crate::adapter::PackageKind;
use crate::run::RunId;

/// Result type for OOXML package operations
pub type Result<T> = std::result::Result<T, OoxmlError>;

/// Errors that can occur while reading, scanning, rewriting or saving a package
#[derive(Error, Debug)]
pub enum OoxmlError {
    /// The container could not be read as a ZIP archive
    #[error("Corrupt archive: {0}")]
    CorruptArchive(#[from] zip::result::ZipError),

    /// Error reading the input file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A part required by the package kind is absent
    #[error("Invalid {kind} package: required part {part} not found")]
    InvalidPackage { kind: PackageKind, part: String },

    /// A scanned part's XML could not be parsed
    #[error("Malformed XML in {part} at byte {position}: {reason}")]
    MalformedXml {
        part: String,
        position: u64,
        reason: String,
    },

    /// No format adapter handles this file extension
    #[error("Unsupported file format: {extension:?}. Supported formats: .docx, .docm, .dotx, .pptx, .pptm, .potx")]
    UnsupportedFormat { extension: String },

    /// Rewrite visited a different number of leaves than extraction produced
    #[error("Text run count mismatch: extracted {expected}, found {actual} during rewrite")]
    NodeCountMismatch { expected: usize, actual: usize },

    /// The leaf at a run's ordinal no longer sits where extraction found it
    #[error("Text run {id} no longer matches its location in {part}")]
    RunPathMismatch { id: RunId, part: String },

    /// A replacement targets a run the extraction never produced
    #[error("Unknown text run: {id}")]
    UnknownRun { id: RunId },

    /// The output container could not be written
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl OoxmlError {
    /// Create an invalid package error
    pub fn invalid_package(kind: PackageKind, part: impl Into<String>) -> Self {
        Self::InvalidPackage {
            kind,
            part: part.into(),
        }
    }

    /// Create a malformed XML error
    pub fn malformed(part: impl Into<String>, position: u64, reason: impl Into<String>) -> Self {
        Self::MalformedXml {
            part: part.into(),
            position,
            reason: reason.into(),
        }
    }

    /// Create an unsupported format error
    pub fn unsupported(extension: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            extension: extension.into(),
        }
    }

    /// Attach a part name to a malformed XML error raised by the codec
    pub(crate) fn in_part(self, name: &str) -> Self {
        match self {
            Self::MalformedXml {
                position, reason, ..
            } => Self::MalformedXml {
                part: name.to_string(),
                position,
                reason,
            },
            other => other,
        }
    }

    /// Get the error code for diagnostics
    pub fn code(&self) -> &'static str {
        match self {
            Self::CorruptArchive(_) => "OOXML001",
            Self::Io(_) => "OOXML002",
            Self::InvalidPackage { .. } => "OOXML003",
            Self::MalformedXml { .. } => "OOXML004",
            Self::UnsupportedFormat { .. } => "OOXML005",
            Self::NodeCountMismatch { .. } => "OOXML006",
            Self::RunPathMismatch { .. } => "OOXML007",
            Self::UnknownRun { .. } => "OOXML008",
            Self::Write { .. } => "OOXML009",
        }
    }
}
