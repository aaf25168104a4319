//! SQL script metrics and summary report.

use std::collections::BTreeSet;
use std::path::Path;

use ibmi_encoding::{load_with, TextEncoding, DEFAULT_ENCODINGS};
use ibmi_lang_core::{Analysis, Diagnostic, SummaryReport, TreeWriter};
use serde::Serialize;
use tracing::{info, warn};

use crate::ast::{DdlKind, Script, Statement};
use crate::Parser;

/// Structural counts for an SQL script.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Db2Metrics {
    pub statement_count: u32,
    /// `CREATE TABLE` statements.
    pub table_count: u32,
    pub view_count: u32,
    pub index_count: u32,
    /// Columns across all `CREATE TABLE` statements.
    pub column_count: u32,
    pub select_count: u32,
    pub insert_count: u32,
    pub update_count: u32,
    pub delete_count: u32,
    /// Distinct `SCHEMA.NAME` of every table a statement reads, writes or
    /// defines, sorted.
    pub tables_referenced: Vec<String>,
}

impl Db2Metrics {
    pub fn from_script(script: &Script) -> Self {
        let mut metrics = Self {
            statement_count: script.statements.len() as u32,
            ..Self::default()
        };
        let mut tables = BTreeSet::new();

        for statement in &script.statements {
            match statement {
                Statement::Select(_) => metrics.select_count += 1,
                Statement::Insert(_) => metrics.insert_count += 1,
                Statement::Update(_) => metrics.update_count += 1,
                Statement::Delete(_) => metrics.delete_count += 1,
                Statement::Ddl(ddl) => match ddl.kind {
                    DdlKind::Table => {
                        metrics.table_count += 1;
                        metrics.column_count += ddl.columns.len() as u32;
                        tables.insert(qualified(ddl.schema.as_deref(), &ddl.name));
                    }
                    DdlKind::View => metrics.view_count += 1,
                    DdlKind::Index => metrics.index_count += 1,
                    DdlKind::Other => {}
                },
            }
            tables.extend(statement.tables_referenced().iter().map(|t| t.qualified_name()));
        }
        metrics.tables_referenced = tables.into_iter().collect();
        metrics
    }
}

fn qualified(schema: Option<&str>, name: &str) -> String {
    match schema {
        Some(schema) => format!("{schema}.{name}"),
        None => name.to_string(),
    }
}

/// Analysis result for one SQL script.
pub type Db2Analysis = Analysis<Script, Db2Metrics>;

/// Loads, parses and measures SQL scripts.
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
    pub fn analyze(&self, path: impl AsRef<Path>) -> Db2Analysis {
        let path = path.as_ref();
        let shown = path.display().to_string();
        match load_with(path, &self.encodings) {
            Ok(source) => self.analyze_source(&source, &shown),
            Err(err) => {
                warn!(path = %shown, error = %err, "could not load SQL script");
                Analysis::failed(shown.clone(), Diagnostic::error(shown, 0, 0, err.to_string()))
            }
        }
    }

    pub fn analyze_source(&self, source: &str, path: &str) -> Db2Analysis {
        let outcome = self.parser.parse(source, path);
        let script = outcome.ast;
        let diagnostics = outcome.diagnostics;
        let metrics = Db2Metrics::from_script(&script);
        info!(
            path,
            strategy = ?outcome.strategy,
            statements = metrics.statement_count,
            tables = metrics.tables_referenced.len(),
            "analyzed SQL script"
        );

        let summary = summary(path, source, &script, &metrics, diagnostics.len());
        let ast_tree = render_tree(&script);
        Analysis {
            path: path.to_string(),
            ast: Some(script),
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

/// Analyze an SQL file with the default configuration.
pub fn analyze(path: impl AsRef<Path>) -> Db2Analysis {
    Analyzer::new().analyze(path)
}

fn summary(path: &str, source: &str, script: &Script, metrics: &Db2Metrics, issues: usize) -> String {
    let operations: BTreeSet<String> = script.statements.iter().map(Statement::kind_name).collect();
    let defined: Vec<String> = script
        .statements
        .iter()
        .filter_map(|s| match s {
            Statement::Ddl(ddl) if ddl.kind == DdlKind::Table => Some(qualified(ddl.schema.as_deref(), &ddl.name)),
            _ => None,
        })
        .collect();

    let mut report = SummaryReport::new("File", path, "DB2 SQL");
    report
        .section("I. Overview")
        .line("Total Lines", source.lines().count())
        .line("Logical LOC", metrics.statement_count)
        .line("Database Access", format!("{} Tables", metrics.tables_referenced.len()))
        .line("Type of Operations", join_or_none(operations.iter().map(String::as_str)))
        .section("II. Metrics & Violations")
        .line(
            "Statements",
            format!(
                "{} SELECT, {} INSERT, {} UPDATE, {} DELETE",
                metrics.select_count, metrics.insert_count, metrics.update_count, metrics.delete_count
            ),
        )
        .line(
            "Objects Defined",
            format!(
                "{} Tables ({} Columns), {} Views, {} Indexes",
                metrics.table_count, metrics.column_count, metrics.view_count, metrics.index_count
            ),
        )
        .line("Issues", issues)
        .section("III. Data Flow & Dependencies")
        .line("Tables Defined", join_or_none(defined.iter().map(String::as_str)))
        .line(
            "Tables Referenced",
            join_or_none(metrics.tables_referenced.iter().map(String::as_str)),
        );
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

fn render_tree(script: &Script) -> String {
    let mut tree = TreeWriter::new("Db2Script");
    let count = script.statements.len();
    for (i, statement) in script.statements.iter().enumerate() {
        let label = match statement {
            Statement::Ddl(ddl) => format!("{}: {}", ddl.verb(), qualified(ddl.schema.as_deref(), &ddl.name)),
            other => format!("Statement: {}", other.kind_name()),
        };
        let prefix = tree.node("", i + 1 == count, label);

        let mut children: Vec<String> = Vec::new();
        match statement {
            Statement::Ddl(ddl) => {
                children.extend(
                    ddl.columns
                        .iter()
                        .map(|c| format!("Column: {} {}", c.name, c.data_type)),
                );
                if let Some(table) = &ddl.on_table {
                    children.push(format!("On: {}", table.qualified_name()));
                }
            }
            Statement::Select(select) if !select.columns.is_empty() => {
                children.push(format!("Columns: {}", select.columns.join(", ")));
                children.extend(select.from_tables.iter().map(|t| format!("Table: {}", t.qualified_name())));
            }
            other => {
                children.extend(other.tables_referenced().iter().map(|t| format!("Table: {}", t.qualified_name())));
            }
        }
        let last = children.len();
        for (j, child) in children.into_iter().enumerate() {
            tree.node(&prefix, j + 1 == last, child);
        }
    }
    tree.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = "\
-- order maintenance
CREATE TABLE APP.ORDERS (ID INTEGER NOT NULL, AMT DECIMAL(9, 2), STATUS CHAR(1));
CREATE VIEW APP.OPEN AS SELECT ID FROM APP.ORDERS WHERE STATUS = 'O';
CREATE INDEX APP.ORDERS_IX ON APP.ORDERS (ID);
INSERT INTO APP.ORDERS (ID, AMT, STATUS) VALUES (1, 9.99, 'O');
UPDATE APP.ORDERS SET STATUS = 'C' WHERE ID = 1;
DELETE FROM QGPL/HISTORY WHERE ID < 0;
SELECT O.ID, C.NAME FROM APP.ORDERS O JOIN APP.CUST C ON C.ID = O.ID;
";

    #[test]
    fn test_metrics() {
        let result = Analyzer::new().analyze_source(SCRIPT, "ORDERS.sql");
        let m = &result.metrics;
        assert_eq!(m.statement_count, 7);
        assert_eq!((m.table_count, m.view_count, m.index_count), (1, 1, 1));
        assert_eq!(m.column_count, 3);
        assert_eq!((m.select_count, m.insert_count, m.update_count, m.delete_count), (1, 1, 1, 1));
        assert_eq!(m.tables_referenced, vec!["APP.CUST", "APP.ORDERS", "QGPL.HISTORY"]);
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    }

    #[test]
    fn test_summary_sections() {
        let result = Analyzer::new().analyze_source(SCRIPT, "ORDERS.sql");
        let lines: Vec<&str> = result.summary.lines().collect();
        assert_eq!(lines[1], "File: ORDERS.sql");
        assert_eq!(lines[2], "Type: DB2 SQL");
        assert!(lines.contains(&"Total Lines: 8"));
        assert!(lines.contains(&"Logical LOC: 7"));
        assert!(lines.contains(&"Tables Defined: APP.ORDERS"));
        assert!(lines.contains(&"Objects Defined: 1 Tables (3 Columns), 1 Views, 1 Indexes"));
        assert!(lines.contains(&"Type of Operations: CREATE INDEX, CREATE TABLE, CREATE VIEW, Delete, Insert, Select, Update"));
    }

    #[test]
    fn test_tree() {
        let result = Analyzer::new().analyze_source("SELECT A FROM S.T;\nDROP TABLE S.T", "T.sql");
        assert_eq!(
            result.ast_tree,
            "AST Representation\nDb2Script\n├── Statement: Select\n│   ├── Columns: A\n│   └── Table: S.T\n└── DROP TABLE: S.T"
        );
    }

    #[test]
    fn test_serializes_statement_tags() {
        let result = Analyzer::new().analyze_source("SELECT A FROM T", "J.sql");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["ast"]["statements"][0]["type"], "Select");
        assert_eq!(json["metrics"]["select_count"], 1);
        assert_eq!(json["metrics"]["tables_referenced"][0], "T");
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = analyze(dir.path().join("NOPE.sql"));
        assert!(result.ast.is_none());
        assert_eq!(result.diagnostics.len(), 1);
        assert!(result.diagnostics[0].is_error());
        assert_eq!(result.metrics, Db2Metrics::default());
    }
}
