//! RPG program metrics, summary report, AST tree and graph.

use std::collections::BTreeSet;
use std::ops::Deref;
use std::path::Path;

use ibmi_encoding::{load_with, TextEncoding, DEFAULT_ENCODINGS};
use ibmi_lang_core::{
    Analysis, ComplexityLevel, Diagnostic, MaintainabilityRating, SummaryReport, TreeWriter,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::ast::{EmbeddedSql, Program, Statement};
use crate::graph::RpgGraph;
use crate::Parser;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RpgMetrics {
    pub procedure_count: u32,
    pub variable_count: u32,
    pub sql_statement_count: u32,
    pub cyclomatic_complexity: u32,
    pub maintainability_rating: MaintainabilityRating,
}

impl Default for RpgMetrics {
    fn default() -> Self {
        Self {
            procedure_count: 0,
            variable_count: 0,
            sql_statement_count: 0,
            cyclomatic_complexity: 1,
            maintainability_rating: MaintainabilityRating::A,
        }
    }
}

impl RpgMetrics {
    pub fn from_program(program: &Program) -> Self {
        let decisions: u32 = program.top_level_statements().map(decision_points).sum();
        let cyclomatic_complexity = 1 + decisions;
        Self {
            procedure_count: program.procedures.len() as u32,
            variable_count: program.variables.len() as u32,
            sql_statement_count: program.sql_statements.len() as u32,
            cyclomatic_complexity,
            maintainability_rating: MaintainabilityRating::from_cyclomatic(cyclomatic_complexity),
        }
    }
}

/// Decision points in `stmt` and everything nested in it.
fn decision_points(stmt: &Statement) -> u32 {
    let own = match stmt {
        Statement::If { else_ifs, .. } => 1 + else_ifs.len() as u32,
        Statement::Select { whens, .. } => 1 + whens.len() as u32,
        Statement::DoFor { .. } => 1,
        _ => 0,
    };
    own + stmt.children().into_iter().map(decision_points).sum::<u32>()
}

/// Analysis result for one RPG member, plus its statement graph.
#[derive(Debug, Clone, Serialize)]
pub struct RpgAnalysis {
    #[serde(flatten)]
    pub analysis: Analysis<Program, RpgMetrics>,
    pub graph: RpgGraph,
}

impl Deref for RpgAnalysis {
    type Target = Analysis<Program, RpgMetrics>;

    fn deref(&self) -> &Self::Target {
        &self.analysis
    }
}

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
    pub fn analyze(&self, path: impl AsRef<Path>) -> RpgAnalysis {
        let path = path.as_ref();
        let shown = path.display().to_string();
        match load_with(path, &self.encodings) {
            Ok(source) => self.analyze_source(&source, &shown),
            Err(err) => {
                warn!(path = %shown, error = %err, "could not load RPG source");
                RpgAnalysis {
                    analysis: Analysis::failed(
                        shown.clone(),
                        Diagnostic::error(shown, 0, 0, err.to_string()),
                    ),
                    graph: RpgGraph::default(),
                }
            }
        }
    }

    pub fn analyze_source(&self, source: &str, path: &str) -> RpgAnalysis {
        let outcome = self.parser.parse(source, path);
        let program = outcome.ast;
        let diagnostics = outcome.diagnostics;
        let metrics = RpgMetrics::from_program(&program);
        info!(
            path,
            strategy = ?outcome.strategy,
            free_format = program.is_free_format,
            procedures = metrics.procedure_count,
            sql = metrics.sql_statement_count,
            complexity = metrics.cyclomatic_complexity,
            "analyzed RPG source"
        );

        let summary = summary(path, source, &program, &metrics, diagnostics.len());
        let ast_tree = render_tree(&program);
        let graph = RpgGraph::from_program(&program);
        RpgAnalysis {
            analysis: Analysis {
                path: path.to_string(),
                ast: Some(program),
                diagnostics,
                metrics,
                summary,
                ast_tree,
            },
            graph,
        }
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Analyze an RPG file with the default configuration.
pub fn analyze(path: impl AsRef<Path>) -> RpgAnalysis {
    Analyzer::new().analyze(path)
}

/// Operation categories present anywhere in the program, in report order.
fn operation_kinds(program: &Program) -> Vec<&'static str> {
    fn visit(stmt: &Statement, seen: &mut BTreeSet<usize>) {
        let kind = match stmt {
            Statement::Assign { .. } => 0,
            Statement::Call { .. } => 1,
            Statement::EmbeddedSql(_) => 2,
            Statement::If { .. } | Statement::Select { .. } | Statement::DoFor { .. } => 3,
            Statement::Return { .. } => 4,
        };
        seen.insert(kind);
        for child in stmt.children() {
            visit(child, seen);
        }
    }
    const NAMES: [&str; 5] = ["Assignment", "Call", "SQL", "Control Flow", "Return"];

    let mut seen = BTreeSet::new();
    for stmt in program.top_level_statements() {
        visit(stmt, &mut seen);
    }
    if !program.sql_statements.is_empty() {
        seen.insert(2);
    }
    seen.into_iter().map(|i| NAMES[i]).collect()
}

/// Tables named after FROM, INTO, UPDATE or JOIN in embedded SQL.
fn sql_tables(statements: &[EmbeddedSql]) -> BTreeSet<String> {
    let mut tables = BTreeSet::new();
    for sql in statements {
        let words: Vec<&str> = sql.sql_text.split_whitespace().collect();
        for pair in words.windows(2) {
            let keyword = pair[0].to_ascii_uppercase();
            if !matches!(keyword.as_str(), "FROM" | "INTO" | "UPDATE" | "JOIN") {
                continue;
            }
            let name = pair[1].trim_end_matches([',', ';', ')']);
            // INTO :host-variable is not a table
            if name.starts_with(':') || name.starts_with('(') || name.is_empty() {
                continue;
            }
            tables.insert(name.to_ascii_uppercase());
        }
    }
    tables
}

fn summary(path: &str, source: &str, program: &Program, metrics: &RpgMetrics, issues: usize) -> String {
    let cc = metrics.cyclomatic_complexity;
    let logical_loc = metrics.sql_statement_count + metrics.variable_count + program.main_body.len() as u32;
    let kind = if program.is_free_format {
        "Free-Form RPGLE"
    } else {
        "Fixed-Format RPGLE"
    };
    let tables = sql_tables(&program.sql_statements);

    let mut report = SummaryReport::new("Program", path, kind);
    report
        .section("I. Overview")
        .line("Total Lines", source.lines().count())
        .line("Logical LOC", logical_loc)
        .line(
            "Procedural Complexity",
            format!("{} ({cc})", ComplexityLevel::from_cyclomatic(cc)),
        )
        .line("Database Access", format!("{} SQL Statements", metrics.sql_statement_count))
        .line("Type of Operations", join_or_none(operation_kinds(program).into_iter()))
        .section("II. Metrics & Violations")
        .line("Maintainability Index", metrics.maintainability_rating)
        .line("Cyclomatic Complexity", cc)
        .line("Issues", issues)
        .section("III. Data Flow & Dependencies")
        .line("Files Used", join_or_none(tables.iter().map(String::as_str)))
        .line("Procedures", metrics.procedure_count)
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
    let mut tree = TreeWriter::new("RpgProgram");
    if !program.variables.is_empty() {
        let last_section = program.main_body.is_empty() && program.procedures.is_empty();
        let prefix = tree.node(
            "",
            last_section,
            format!("DataDeclarations ({})", program.variables.len()),
        );
        let count = program.variables.len();
        for (i, var) in program.variables.iter().enumerate() {
            let data_type = var.data_type.as_deref().unwrap_or("?");
            tree.node(&prefix, i + 1 == count, format!("Decl: {} ({data_type})", var.name));
        }
    }
    let prefix = tree.node("", program.procedures.is_empty(), "StatementList");
    statements(&mut tree, &prefix, program.main_body.iter().collect());
    let count = program.procedures.len();
    for (i, procedure) in program.procedures.iter().enumerate() {
        let prefix = tree.node("", i + 1 == count, format!("Procedure: {}", procedure.name));
        statements(&mut tree, &prefix, procedure.body.iter().collect());
    }
    tree.finish()
}

fn statements(tree: &mut TreeWriter, prefix: &str, body: Vec<&Statement>) {
    let count = body.len();
    for (i, stmt) in body.iter().enumerate() {
        let label = match stmt {
            Statement::Assign { target, .. } => format!("Assign: {}", target.text()),
            Statement::Call { name, .. } => format!("Call: {name}"),
            Statement::If { .. } => "If".to_string(),
            Statement::Select { .. } => "Select".to_string(),
            Statement::DoFor { kind, .. } => format!("DoFor: {}", kind.as_str()),
            Statement::Return { .. } => "Return".to_string(),
            Statement::EmbeddedSql(sql) => {
                format!("EmbeddedSql: {}", sql.stmt_type.as_deref().unwrap_or("UNKNOWN"))
            }
        };
        let child_prefix = tree.node(prefix, i + 1 == count, label);
        statements(tree, &child_prefix, stmt.children());
    }
}
