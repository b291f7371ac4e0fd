//! Error types for YAML parsing with source locations.

use crate::Provenance;
use std::sync::Arc;
use thiserror::Error;

/// Result type alias for bst-yaml operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during YAML parsing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// YAML syntax error
    #[error("{provenance}: Malformed YAML: {message}")]
    Parse {
        message: String,
        provenance: Provenance,
    },

    /// Well-formed YAML which cannot be represented as a document
    #[error("{provenance}: {message}")]
    InvalidStructure {
        message: String,
        provenance: Provenance,
    },
}

impl Error {
    pub(crate) fn from_scan(err: &yaml_rust2::ScanError, file: &Arc<str>) -> Self {
        Error::Parse {
            message: err.info().to_string(),
            provenance: Provenance::from_marker(file, err.marker()),
        }
    }

    /// The location the error should be reported against.
    pub fn provenance(&self) -> &Provenance {
        match self {
            Error::Parse { provenance, .. } | Error::InvalidStructure { provenance, .. } => {
                provenance
            }
        }
    }
}
