//! The per-file result record handed to downstream reporting layers.

use serde::Serialize;

use crate::diagnostic::{has_errors, Diagnostic};

/// Result of analyzing one source file.
///
/// `ast` is `None` when the file could not be loaded; `metrics` then hold
/// their baseline values and `diagnostics` explain the failure. Consumers
/// treat the record as read-only.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis<A, M> {
    pub path: String,
    pub ast: Option<A>,
    pub diagnostics: Vec<Diagnostic>,
    pub metrics: M,
    pub summary: String,
    pub ast_tree: String,
}

impl<A, M: Default> Analysis<A, M> {
    /// A result for a file that never produced an AST.
    pub fn failed(path: impl Into<String>, diagnostic: Diagnostic) -> Self {
        let path = path.into();
        let summary = format!(
            "Summarization/Analysis Report\nFile: {path}\nStatus: not analyzed ({})",
            diagnostic.message
        );
        Self {
            path,
            ast: None,
            diagnostics: vec![diagnostic],
            metrics: M::default(),
            summary,
            ast_tree: crate::report::TreeWriter::empty(),
        }
    }
}

impl<A, M> Analysis<A, M> {
    /// Whether any diagnostic attached to this result is an error.
    pub fn has_errors(&self) -> bool {
        has_errors(&self.diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Counts {
        items: usize,
    }

    #[test]
    fn test_failed_analysis() {
        let d = Diagnostic::error("missing.cl", 0, 0, "file not found: missing.cl");
        let result: Analysis<(), Counts> = Analysis::failed("missing.cl", d);
        assert!(result.ast.is_none());
        assert!(result.has_errors());
        assert_eq!(result.metrics, Counts::default());
        assert!(result.summary.contains("file not found"));
        assert!(result.ast_tree.ends_with("(No AST generated)"));
    }
}
