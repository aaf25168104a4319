//! Plain-text summary reports and AST tree rendering.

use std::fmt::Display;

/// Line-oriented builder for the per-file analysis summary.
///
/// Every language produces the same outline: a title, the file and its type,
/// then the `I. Overview`, `II. Metrics & Violations` and
/// `III. Data Flow & Dependencies` sections.
#[derive(Debug, Clone)]
pub struct SummaryReport {
    lines: Vec<String>,
}

impl SummaryReport {
    /// Start a report for `path`; `label` is the heading used for the path
    /// (`Program` or `File`).
    pub fn new(label: &str, path: &str, kind: impl Display) -> Self {
        Self {
            lines: vec![
                "Summarization/Analysis Report".to_string(),
                format!("{label}: {path}"),
                format!("Type: {kind}"),
            ],
        }
    }

    /// Add a section heading.
    pub fn section(&mut self, title: &str) -> &mut Self {
        self.lines.push(title.to_string());
        self
    }

    /// Add a `label: value` line.
    pub fn line(&mut self, label: &str, value: impl Display) -> &mut Self {
        self.lines.push(format!("{label}: {value}"));
        self
    }

    pub fn finish(&self) -> String {
        self.lines.join("\n")
    }
}

/// Renders an AST as an indented tree using box-drawing connectors.
#[derive(Debug, Clone)]
pub struct TreeWriter {
    lines: Vec<String>,
}

const TREE_HEADER: &str = "AST Representation";

impl TreeWriter {
    /// Start a tree whose root line is `root`.
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            lines: vec![TREE_HEADER.to_string(), root.into()],
        }
    }

    /// The rendering used when no AST could be produced.
    pub fn empty() -> String {
        format!("{TREE_HEADER}\n  (No AST generated)")
    }

    /// Add a node under `prefix` and return the prefix for its children.
    pub fn node(&mut self, prefix: &str, is_last: bool, label: impl Display) -> String {
        let connector = if is_last { "└── " } else { "├── " };
        self.lines.push(format!("{prefix}{connector}{label}"));
        let mut child = String::with_capacity(prefix.len() + 6);
        child.push_str(prefix);
        child.push_str(if is_last { "    " } else { "│   " });
        child
    }

    pub fn finish(&self) -> String {
        self.lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_outline() {
        let mut report = SummaryReport::new("Program", "A.clle", "CL/CLLE");
        report.section("I. Overview").line("Total Lines", 3);
        assert_eq!(
            report.finish(),
            "Summarization/Analysis Report\nProgram: A.clle\nType: CL/CLLE\nI. Overview\nTotal Lines: 3"
        );
    }

    #[test]
    fn test_tree_connectors() {
        let mut tree = TreeWriter::new("Root");
        let first = tree.node("", false, "A");
        tree.node(&first, true, "A1");
        let last = tree.node("", true, "B");
        tree.node(&last, true, "B1");
        assert_eq!(
            tree.finish(),
            "AST Representation\nRoot\n├── A\n│   └── A1\n└── B\n    └── B1"
        );
    }

    #[test]
    fn test_empty_tree() {
        assert_eq!(TreeWriter::empty(), "AST Representation\n  (No AST generated)");
    }
}
