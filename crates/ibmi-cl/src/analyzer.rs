//! CL program metrics and summary report.

use std::collections::BTreeSet;
use std::path::Path;

use ibmi_encoding::{load_with, TextEncoding, DEFAULT_ENCODINGS};
use ibmi_lang_core::{
    Analysis, ComplexityLevel, Diagnostic, MaintainabilityRating, SummaryReport, TreeWriter,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::ast::{Command, Program};
use crate::Parser;

/// Structural counts for a CL program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClMetrics {
    pub command_count: u32,
    /// `DCL` commands.
    pub variable_count: u32,
    /// `DCLF` commands.
    pub file_count: u32,
    pub cyclomatic_complexity: u32,
    pub maintainability_rating: MaintainabilityRating,
}

impl Default for ClMetrics {
    fn default() -> Self {
        Self {
            command_count: 0,
            variable_count: 0,
            file_count: 0,
            cyclomatic_complexity: 1,
            maintainability_rating: MaintainabilityRating::A,
        }
    }
}

/// Commands that add a decision point.
const BRANCHING_COMMANDS: &[&str] = &["IF", "WHEN", "DOFOR", "DOWHILE", "DOUNTIL", "MONMSG"];

impl ClMetrics {
    /// Compute metrics by walking the program.
    pub fn from_program(program: &Program) -> Self {
        let count = |name: &str| program.commands.iter().filter(|c| c.name == name).count() as u32;
        let branches = program
            .commands
            .iter()
            .filter(|c| BRANCHING_COMMANDS.contains(&c.name.as_str()))
            .count() as u32;
        let cyclomatic_complexity = 1 + branches;

        Self {
            command_count: program.commands.len() as u32,
            variable_count: count("DCL"),
            file_count: count("DCLF"),
            cyclomatic_complexity,
            maintainability_rating: MaintainabilityRating::from_cyclomatic(cyclomatic_complexity),
        }
    }
}

/// Analysis result for one CL source file.
pub type ClAnalysis = Analysis<Program, ClMetrics>;

/// Loads, parses and measures CL sources.
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

    /// Use a specific parser configuration.
    pub fn with_parser(mut self, parser: Parser) -> Self {
        self.parser = parser;
        self
    }

    /// Override the ordered list of encodings tried when loading.
    pub fn with_encodings(mut self, encodings: Vec<TextEncoding>) -> Self {
        self.encodings = encodings;
        self
    }

    /// Load and analyze a file. Load failures become a single error diagnostic.
    pub fn analyze(&self, path: impl AsRef<Path>) -> ClAnalysis {
        let path = path.as_ref();
        let shown = path.display().to_string();
        match load_with(path, &self.encodings) {
            Ok(source) => self.analyze_source(&source, &shown),
            Err(err) => {
                warn!(path = %shown, error = %err, "could not load CL source");
                Analysis::failed(shown.clone(), Diagnostic::error(shown, 0, 0, err.to_string()))
            }
        }
    }

    /// Analyze already-loaded source text.
    pub fn analyze_source(&self, source: &str, path: &str) -> ClAnalysis {
        let outcome = self.parser.parse(source, path);
        let program = outcome.ast;
        let diagnostics = outcome.diagnostics;
        let metrics = ClMetrics::from_program(&program);
        info!(
            path,
            strategy = ?outcome.strategy,
            commands = metrics.command_count,
            complexity = metrics.cyclomatic_complexity,
            "analyzed CL source"
        );

        let summary = summary(path, source, &program, &metrics, diagnostics.len());
        let ast_tree = render_tree(&program);
        Analysis {
            path: path.to_string(),
            ast: Some(program),
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

/// Analyze a CL file with the default configuration.
pub fn analyze(path: impl AsRef<Path>) -> ClAnalysis {
    Analyzer::new().analyze(path)
}

fn files_used(program: &Program) -> Vec<String> {
    program
        .commands
        .iter()
        .filter(|c| c.name == "DCLF")
        .filter_map(|c| c.keyword("FILE").or_else(|| c.positional().next()))
        .map(|p| p.value.text.clone())
        .collect()
}

fn summary(path: &str, source: &str, program: &Program, metrics: &ClMetrics, issues: usize) -> String {
    let operations: BTreeSet<&str> = program.commands.iter().map(|c| c.name.as_str()).collect();
    let files = files_used(program);
    let cc = metrics.cyclomatic_complexity;

    let mut report = SummaryReport::new("Program", path, "CL/CLLE");
    report
        .section("I. Overview")
        .line("Total Lines", source.lines().count())
        .line("Logical LOC", metrics.command_count)
        .line(
            "Procedural Complexity",
            format!("{} ({cc})", ComplexityLevel::from_cyclomatic(cc)),
        )
        .line("Database Access", format!("{} Files", metrics.file_count))
        .line("Type of Operations", join_or_none(operations.into_iter()))
        .section("II. Metrics & Violations")
        .line("Maintainability Index", metrics.maintainability_rating)
        .line("Cyclomatic Complexity", cc)
        .line("Issues", issues)
        .section("III. Data Flow & Dependencies")
        .line("Files Used", join_or_none(files.iter().map(String::as_str)))
        .line("Internal Variables", format!("{} defined", metrics.variable_count));
    report.finish()
}

fn join_or_none<'a>(items: impl Iterator<Item = &'a str>) -> String {
    let joined = items.collect::<Vec<_>>().join(", ");
    if joined.is_empty() {
        "None".to_string()
    } else {
        joined
    }
}

fn render_tree(program: &Program) -> String {
    let mut tree = TreeWriter::new("ClProgram");
    let count = program.commands.len();
    for (i, command) in program.commands.iter().enumerate() {
        let prefix = tree.node("", i + 1 == count, command_label(command));
        let params = command.parameters.len();
        for (j, param) in command.parameters.iter().enumerate() {
            let label = match &param.keyword {
                Some(keyword) => format!("Parameter: {keyword}={}", param.value.text),
                None => format!("Parameter: {}", param.value.text),
            };
            tree.node(&prefix, j + 1 == params, label);
        }
    }
    tree.finish()
}

fn command_label(command: &Command) -> String {
    match &command.label {
        Some(label) => format!("Command: {} ({label}:)", command.name),
        None => format!("Command: {}", command.name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORDERS: &str = "\
PGM PARM(&CUST)
  DCL VAR(&CUST) TYPE(*CHAR) LEN(10)
  DCL VAR(&OK) TYPE(*LGL)
  DCLF FILE(QGPL/ORDERS)
  MONMSG MSGID(CPF0000)
  IF COND(&OK) THEN(CALL PGM(SHIP))
  DOWHILE COND(&OK)
    RCVF
  ENDDO
ENDPGM
";

    #[test]
    fn test_metrics() {
        let result = Analyzer::new().analyze_source(ORDERS, "ORDERS.clle");
        let m = &result.metrics;
        assert_eq!(m.command_count, 10);
        assert_eq!(m.variable_count, 2);
        assert_eq!(m.file_count, 1);
        assert_eq!(m.cyclomatic_complexity, 4);
        assert_eq!(m.maintainability_rating, MaintainabilityRating::A);
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    #[cfg(feature = "grammar")]
    fn test_summary_sections() {
        let result = Analyzer::new().analyze_source(ORDERS, "ORDERS.clle");
        let lines: Vec<&str> = result.summary.lines().collect();
        assert_eq!(lines[0], "Summarization/Analysis Report");
        assert_eq!(lines[1], "Program: ORDERS.clle");
        assert_eq!(lines[2], "Type: CL/CLLE");
        assert!(lines.contains(&"Total Lines: 10"));
        assert!(lines.contains(&"Procedural Complexity: Low (4)"));
        assert!(lines.contains(&"Files Used: QGPL/ORDERS"));
        assert!(lines.contains(&"Internal Variables: 2 defined"));
        assert!(lines.contains(&"Type of Operations: DCL, DCLF, DOWHILE, ENDDO, ENDPGM, IF, MONMSG, PGM, RCVF"));
    }

    #[test]
    #[cfg(feature = "grammar")]
    fn test_tree() {
        let result = Analyzer::new().analyze_source("PGM\nCALL PGM(A) PARM(&X)\n", "T.clle");
        assert_eq!(
            result.ast_tree,
            "AST Representation\nClProgram\n├── Command: PGM\n└── Command: CALL\n    ├── Parameter: PGM=A\n    └── Parameter: PARM=&X"
        );
    }

    #[test]
    fn test_rating_bands() {
        let mut source = String::from("PGM\n");
        for _ in 0..12 {
            source.push_str("MONMSG MSGID(CPF0000)\n");
        }
        source.push_str("ENDPGM\n");
        let result = Analyzer::new().analyze_source(&source, "M.clle");
        assert_eq!(result.metrics.cyclomatic_complexity, 13);
        assert_eq!(result.metrics.maintainability_rating, MaintainabilityRating::B);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("NOPE.clle");
        let result = analyze(&path);
        assert!(result.ast.is_none());
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].line, 0);
        assert!(result.diagnostics[0].message.starts_with("file not found"));
        assert_eq!(result.metrics, ClMetrics::default());
    }
}
