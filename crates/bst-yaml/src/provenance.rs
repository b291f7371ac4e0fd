//! Source location information for document nodes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Where a node was parsed from.
///
/// Every [`Node`](crate::Node) carries one of these. When a node is copied
/// into another document during composition its provenance travels with it,
/// so errors raised against the composed document still point at the file
/// that declared the offending value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Provenance {
    /// Project-relative name of the file the node came from
    pub file: Arc<str>,

    /// Line number (1-based)
    pub line: usize,

    /// Column number (0-based)
    pub col: usize,
}

impl Provenance {
    /// Create a provenance with all fields specified.
    pub fn new(file: impl Into<Arc<str>>, line: usize, col: usize) -> Self {
        Self {
            file: file.into(),
            line,
            col,
        }
    }

    /// Provenance of the start of a file.
    ///
    /// Used for documents which contain nothing, and for nodes synthesized
    /// on behalf of a whole file.
    pub fn file_start(file: impl Into<Arc<str>>) -> Self {
        Self::new(file, 1, 0)
    }

    /// Create a provenance from a yaml-rust2 scanner marker.
    ///
    /// The scanner already counts lines from 1 and columns from 0, which is
    /// the convention used in rendered diagnostics.
    pub(crate) fn from_marker(file: &Arc<str>, marker: &yaml_rust2::scanner::Marker) -> Self {
        Self {
            file: Arc::clone(file),
            line: marker.line(),
            col: marker.col(),
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [line {} column {}]", self.file, self.line, self.col)
    }
}
