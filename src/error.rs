//! Error handling for ENVI metadata extraction.
//!
//! Two layers of errors live here: [`ExtractError`] is the classification
//! returned by a [`MetadataExtractor`](crate::raster::MetadataExtractor), and
//! [`EnviError`] is what the driver itself reports to its caller.

use std::path::PathBuf;
use thiserror::Error;

/// Failure classification reported by a metadata extractor.
///
/// Only [`ExtractError::Io`] is treated as the recoverable symptom of a
/// non-standard ENVI header; everything else is passed through.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("unable to read raster {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("unsupported raster {path}: {message}")]
    Unsupported { path: PathBuf, message: String },

    #[error("metadata extraction failed for {path}: {message}")]
    Other { path: PathBuf, message: String },
}

impl ExtractError {
    pub fn io(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Io {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn unsupported(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Unsupported {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn other(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Other {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether this is the I/O-category failure that recovery reacts to
    pub fn is_io(&self) -> bool {
        matches!(self, ExtractError::Io { .. })
    }
}

#[derive(Error, Debug)]
pub enum EnviError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not an ENVI dataset: {path} - {reason}")]
    NotApplicable { path: PathBuf, reason: String },

    #[error("Invalid ENVI header: {path} - {reason}")]
    Format { path: PathBuf, reason: String },

    #[error("Metadata extraction failed: {0}")]
    Extraction(#[from] ExtractError),

    #[error("Raster error: {message}")]
    Raster { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl EnviError {
    pub fn not_applicable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::NotApplicable {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn format(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Format {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn raster(message: impl Into<String>) -> Self {
        Self::Raster {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// True when the framework should move on to the next driver rather than
    /// report a fault
    pub fn is_not_applicable(&self) -> bool {
        matches!(self, EnviError::NotApplicable { .. })
    }
}

pub type Result<T> = std::result::Result<T, EnviError>;
