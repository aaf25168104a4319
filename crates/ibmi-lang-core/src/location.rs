//! Source location tracking for error reporting.
//!
//! Every AST node in the language crates carries a [`SourceLocation`] so that
//! diagnostics and downstream reports can point back at the originating line.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A resolved position in a source file.
///
/// Lines and columns are 1-indexed. The file name is shared between all the
/// nodes of one parse, so cloning a location never copies the path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    /// The file name or path as given to the parser.
    pub file: Arc<str>,
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed).
    pub column: u32,
}

impl SourceLocation {
    /// Create a new location.
    pub fn new(file: impl Into<Arc<str>>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }

    /// Location of the first character of a file.
    pub fn start_of(file: impl Into<Arc<str>>) -> Self {
        Self::new(file, 1, 1)
    }

    /// Same file, different position.
    pub fn at(&self, line: u32, column: u32) -> Self {
        Self {
            file: Arc::clone(&self.file),
            line,
            column,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}
