//! Display file metrics and summary report.

use std::path::Path;

use ibmi_encoding::{load_with, TextEncoding, DEFAULT_ENCODINGS};
use ibmi_lang_core::{Analysis, Diagnostic, SummaryReport, TreeWriter};
use serde::Serialize;
use tracing::{info, warn};

use crate::ast::{DisplayFile, Field};
use crate::Parser;

/// Screen size assumed when the file has no `DSPSIZ` keyword.
pub const DEFAULT_SCREEN_SIZE: &str = "24x80";

/// Structural counts for a display file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DspfMetrics {
    pub record_count: u32,
    pub field_count: u32,
    /// Fields with usage `I` or `B`.
    pub input_field_count: u32,
    pub constant_count: u32,
    /// Primary screen size as `ROWSxCOLS`.
    pub screen_size: String,
}

impl Default for DspfMetrics {
    fn default() -> Self {
        Self {
            record_count: 0,
            field_count: 0,
            input_field_count: 0,
            constant_count: 0,
            screen_size: DEFAULT_SCREEN_SIZE.to_string(),
        }
    }
}

impl DspfMetrics {
    pub fn from_display(display: &DisplayFile) -> Self {
        Self {
            record_count: display.record_formats.len() as u32,
            field_count: display.fields().count() as u32,
            input_field_count: display.fields().filter(|f| f.is_input()).count() as u32,
            constant_count: display.record_formats.iter().map(|r| r.constants.len() as u32).sum(),
            screen_size: display
                .file_level_keywords
                .get("DSPSIZ")
                .and_then(|value| screen_size(value))
                .unwrap_or_else(|| DEFAULT_SCREEN_SIZE.to_string()),
        }
    }
}

/// The primary size of a `DSPSIZ` value: `27 132 *DS4` or `*DS3 *DS4`.
fn screen_size(value: &str) -> Option<String> {
    let mut parts = value.split_whitespace();
    match parts.next()? {
        "*DS3" => Some("24x80".to_string()),
        "*DS4" => Some("27x132".to_string()),
        rows => {
            let rows: u32 = rows.parse().ok()?;
            let cols: u32 = parts.next()?.parse().ok()?;
            Some(format!("{rows}x{cols}"))
        }
    }
}

/// Analysis result for one display file.
pub type DspfAnalysis = Analysis<DisplayFile, DspfMetrics>;

/// Loads, parses and measures display files.
#[derive(Debug)]
pub struct Analyzer {
    parser: Parser,
    encodings: Vec<TextEncoding>,
}

impl Analyzer {
    pub fn new() -> Self {
        Self {
            parser: Parser::new(),
            encodings: DEFAULT_ENCODINGS.to_vec(),
        }
    }

    pub fn with_parser(mut self, parser: Parser) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_encodings(mut self, encodings: Vec<TextEncoding>) -> Self {
        self.encodings = encodings;
        self
    }

    /// Load and analyze a file. Load failures become a single error diagnostic.
    pub fn analyze(&self, path: impl AsRef<Path>) -> DspfAnalysis {
        let path = path.as_ref();
        let shown = path.display().to_string();
        match load_with(path, &self.encodings) {
            Ok(source) => self.analyze_source(&source, &shown),
            Err(err) => {
                warn!(path = %shown, error = %err, "could not load display file");
                Analysis::failed(shown.clone(), Diagnostic::error(shown, 0, 0, err.to_string()))
            }
        }
    }

    pub fn analyze_source(&self, source: &str, path: &str) -> DspfAnalysis {
        let outcome = self.parser.parse(source, path);
        let display = outcome.ast;
        let diagnostics = outcome.diagnostics;
        let metrics = DspfMetrics::from_display(&display);
        info!(
            path,
            strategy = ?outcome.strategy,
            records = metrics.record_count,
            fields = metrics.field_count,
            "analyzed display file"
        );

        let summary = summary(path, source, &display, &metrics, diagnostics.len());
        let ast_tree = render_tree(&display);
        Analysis {
            path: path.to_string(),
            ast: Some(display),
            diagnostics,
            metrics,
            summary,
            ast_tree,
        }
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Analyze a display file with the default configuration.
pub fn analyze(path: impl AsRef<Path>) -> DspfAnalysis {
    Analyzer::new().analyze(path)
}

fn summary(path: &str, source: &str, display: &DisplayFile, metrics: &DspfMetrics, issues: usize) -> String {
    let records: Vec<&str> = display.record_formats.iter().map(|r| r.name.as_str()).collect();
    let records = if records.is_empty() {
        "None".to_string()
    } else {
        records.join(", ")
    };

    let mut report = SummaryReport::new("File", path, "DSPF (DDS)");
    report
        .section("I. Overview")
        .line("Total Lines", source.lines().count())
        .line("Logical LOC", metrics.record_count + metrics.field_count + metrics.constant_count)
        .line("Procedural Complexity", "Low (Declarative)")
        .line("Type of Operations", "Record Definition, Field Definition")
        .line("Screen Size", &metrics.screen_size)
        .section("II. Metrics & Violations")
        .line("Maintainability Index", "High")
        .line("Issues", issues)
        .section("III. Data Flow & Dependencies")
        .line("Records", records)
        .line(
            "Fields",
            format!("{} ({} input)", metrics.field_count, metrics.input_field_count),
        )
        .line("Constants", metrics.constant_count);
    report.finish()
}

fn render_tree(display: &DisplayFile) -> String {
    let mut tree = TreeWriter::new("DisplayFile");
    let count = display.record_formats.len();
    for (i, record) in display.record_formats.iter().enumerate() {
        let prefix = tree.node("", i + 1 == count, format!("Record: {}", record.name));
        let fields = record.fields.len();
        for (j, field) in record.fields.iter().enumerate() {
            tree.node(&prefix, j + 1 == fields, field_label(field));
        }
    }
    tree.finish()
}

fn field_label(field: &Field) -> String {
    let length = field.length.map(|l| l.to_string()).unwrap_or_default();
    match field.data_type {
        Some(data_type) => format!("Field: {} ({data_type} {length})", field.name),
        None if length.is_empty() => format!("Field: {}", field.name),
        None => format!("Field: {} ({length})", field.name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROMPT: &str = "     A                                      DSPSIZ(27 132 *DS4)
     A          R PROMPT
     A                                  1  2'Customer'
     A            CUSTNO         5S 0I  3 10
     A            NAME          30A  B  4 10
     A            TOTAL          9Y 2O  5 10
     A          R FOOTER
     A            MSG           78A  O 24  2
";

    #[test]
    fn test_metrics() {
        let result = Analyzer::new().analyze_source(PROMPT, "PROMPT.dspf");
        let m = &result.metrics;
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
        assert_eq!((m.record_count, m.field_count, m.input_field_count, m.constant_count), (2, 4, 2, 1));
        assert_eq!(m.screen_size, "27x132");
    }

    #[test]
    fn test_screen_size_forms() {
        assert_eq!(screen_size("24 80"), Some("24x80".to_string()));
        assert_eq!(screen_size("*DS4 *DS3"), Some("27x132".to_string()));
        assert_eq!(screen_size("*DS3"), Some("24x80".to_string()));
        assert_eq!(screen_size("WIDE"), None);
        let result = Analyzer::new().analyze_source("     A          R ONLY\n", "ONE.dspf");
        assert_eq!(result.metrics.screen_size, DEFAULT_SCREEN_SIZE);
    }

    #[test]
    fn test_summary_and_tree() {
        let result = Analyzer::new().analyze_source(PROMPT, "PROMPT.dspf");
        let lines: Vec<&str> = result.summary.lines().collect();
        assert_eq!(lines[2], "Type: DSPF (DDS)");
        assert!(lines.contains(&"Logical LOC: 7"));
        assert!(lines.contains(&"Screen Size: 27x132"));
        assert!(lines.contains(&"Records: PROMPT, FOOTER"));
        assert!(lines.contains(&"Fields: 4 (2 input)"));
        assert_eq!(
            result.ast_tree,
            "AST Representation\nDisplayFile\n├── Record: PROMPT\n│   ├── Field: CUSTNO (S 5)\n│   ├── Field: NAME (A 30)\n│   └── Field: TOTAL (Y 9)\n└── Record: FOOTER\n    └── Field: MSG (A 78)"
        );
    }

    #[test]
    fn test_json_shape() {
        let result = Analyzer::new().analyze_source(PROMPT, "PROMPT.dspf");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["ast"]["record_formats"][0]["fields"][1]["usage"], "both");
        assert_eq!(json["metrics"]["screen_size"], "27x132");
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = analyze(dir.path().join("NOPE.dspf"));
        assert!(result.ast.is_none());
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.metrics, DspfMetrics::default());
        assert_eq!(result.metrics.screen_size, "24x80");
    }
}
