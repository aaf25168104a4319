//! DB2 SQL abstract syntax tree.
//!
//! Expressions are kept as normalized source text; only the parts the
//! analyzers look at (tables, column lists, predicates) are structured.
//! Qualified object names are always split at construction, so a
//! [`TableRef`] never holds `SCHEMA.NAME` in its `name`.

use ibmi_lang_core::{QuoteTracker, SourceLocation};
use serde::Serialize;

/// A parsed SQL script.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Script {
    pub loc: SourceLocation,
    pub statements: Vec<Statement>,
}

impl Script {
    pub fn empty(file: &str) -> Self {
        Self {
            loc: SourceLocation::start_of(file),
            statements: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Statement {
    Select(SelectStmt),
    Insert(InsertStmt),
    Update(UpdateStmt),
    Delete(DeleteStmt),
    Ddl(DdlStmt),
}

impl Statement {
    pub fn loc(&self) -> &SourceLocation {
        match self {
            Statement::Select(s) => &s.loc,
            Statement::Insert(s) => &s.loc,
            Statement::Update(s) => &s.loc,
            Statement::Delete(s) => &s.loc,
            Statement::Ddl(s) => &s.loc,
        }
    }

    /// `Select`, `Insert`, `Update`, `Delete` or the DDL verb.
    pub fn kind_name(&self) -> String {
        match self {
            Statement::Select(_) => "Select".to_string(),
            Statement::Insert(_) => "Insert".to_string(),
            Statement::Update(_) => "Update".to_string(),
            Statement::Delete(_) => "Delete".to_string(),
            Statement::Ddl(ddl) => ddl.verb(),
        }
    }

    /// Tables read or written by the statement, including those of nested
    /// queries. The object a DDL statement defines is not included.
    pub fn tables_referenced(&self) -> Vec<&TableRef> {
        let mut tables = Vec::new();
        match self {
            Statement::Select(s) => s.collect_tables(&mut tables),
            Statement::Insert(s) => {
                tables.push(&s.table);
                if let Some(select) = &s.select {
                    select.collect_tables(&mut tables);
                }
            }
            Statement::Update(s) => tables.push(&s.table),
            Statement::Delete(s) => tables.push(&s.table),
            Statement::Ddl(s) => {
                tables.extend(s.on_table.iter());
                if let Some(query) = &s.query {
                    query.collect_tables(&mut tables);
                }
            }
        }
        tables
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectStmt {
    pub loc: SourceLocation,
    pub distinct: bool,
    /// Select-list items as written, alias included; `*` for all columns.
    pub columns: Vec<String>,
    /// Tables in the FROM clause, joined tables included, in source order.
    pub from_tables: Vec<TableRef>,
    /// `ON` conditions of the joins in `from_tables`.
    pub join_conditions: Vec<Predicate>,
    pub where_clause: Option<Predicate>,
    pub group_by: Vec<String>,
    pub having: Option<Predicate>,
    pub order_by: Vec<OrderItem>,
    pub fetch_first: Option<u64>,
    /// Queries combined with UNION, EXCEPT or INTERSECT.
    pub unions: Vec<SelectStmt>,
    /// Nested queries: derived tables, subquery predicates, scalar subqueries.
    pub subqueries: Vec<SelectStmt>,
}

impl SelectStmt {
    pub fn new(loc: SourceLocation) -> Self {
        Self {
            loc,
            distinct: false,
            columns: Vec::new(),
            from_tables: Vec::new(),
            join_conditions: Vec::new(),
            where_clause: None,
            group_by: Vec::new(),
            having: None,
            order_by: Vec::new(),
            fetch_first: None,
            unions: Vec::new(),
            subqueries: Vec::new(),
        }
    }

    fn collect_tables<'a>(&'a self, out: &mut Vec<&'a TableRef>) {
        out.extend(self.from_tables.iter());
        for nested in self.unions.iter().chain(&self.subqueries) {
            nested.collect_tables(out);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderItem {
    pub expr: String,
    pub descending: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsertStmt {
    pub loc: SourceLocation,
    pub table: TableRef,
    pub columns: Vec<String>,
    /// `VALUES` rows, one entry per value expression.
    pub values: Vec<Vec<String>>,
    pub select: Option<Box<SelectStmt>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateStmt {
    pub loc: SourceLocation,
    pub table: TableRef,
    /// `(column, value expression)` pairs from the SET clause.
    pub set_clauses: Vec<(String, String)>,
    pub where_clause: Option<Predicate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeleteStmt {
    pub loc: SourceLocation,
    pub table: TableRef,
    pub where_clause: Option<Predicate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DdlKind {
    Table,
    View,
    Index,
    /// DROP, ALTER and CREATE of any other object type.
    Other,
}

/// A data definition statement. `body` is the full statement text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DdlStmt {
    pub loc: SourceLocation,
    pub kind: DdlKind,
    pub name: String,
    pub schema: Option<String>,
    pub body: String,
    /// Column definitions of a CREATE TABLE.
    pub columns: Vec<ColumnDef>,
    /// Table an index is built over.
    pub on_table: Option<TableRef>,
    /// Defining query of a view.
    pub query: Option<Box<SelectStmt>>,
}

impl DdlStmt {
    pub fn new(loc: SourceLocation, kind: DdlKind, qualified: &str, body: impl Into<String>) -> Self {
        let (schema, name) = split_qualified(qualified);
        Self {
            loc,
            kind,
            name,
            schema,
            body: body.into(),
            columns: Vec::new(),
            on_table: None,
            query: None,
        }
    }

    /// `CREATE TABLE`, `CREATE VIEW`, `CREATE INDEX`, or the first two words
    /// of the statement for other DDL.
    pub fn verb(&self) -> String {
        match self.kind {
            DdlKind::Table => "CREATE TABLE".to_string(),
            DdlKind::View => "CREATE VIEW".to_string(),
            DdlKind::Index => "CREATE INDEX".to_string(),
            DdlKind::Other => self
                .body
                .split_whitespace()
                .map(str::to_ascii_uppercase)
                .filter(|w| w != "OR" && w != "REPLACE")
                .take(2)
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnDef {
    pub loc: SourceLocation,
    pub name: String,
    /// Type with its length arguments, e.g. `DECIMAL(9,2)`.
    pub data_type: String,
    pub nullable: bool,
    /// Remaining column clauses (`DEFAULT 0`, `PRIMARY KEY`, ...).
    pub constraints: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableRef {
    pub loc: SourceLocation,
    pub name: String,
    pub schema: Option<String>,
    pub alias: Option<String>,
}

impl TableRef {
    /// Build from `NAME`, `SCHEMA.NAME` or system-naming `LIB/NAME`.
    pub fn from_qualified(loc: SourceLocation, qualified: &str, alias: Option<String>) -> Self {
        let (schema, name) = split_qualified(qualified);
        Self {
            loc,
            name,
            schema,
            alias,
        }
    }

    /// `SCHEMA.NAME`, or just the name when unqualified.
    pub fn qualified_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{schema}.{}", self.name),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnRef {
    pub loc: SourceLocation,
    pub name: String,
    /// Table name or correlation qualifying the column.
    pub table: Option<String>,
}

impl ColumnRef {
    /// Build from `COL` or `QUALIFIER.COL`; only the last part is the name.
    pub fn from_qualified(loc: SourceLocation, qualified: &str) -> Self {
        match qualified.rsplit_once('.') {
            Some((table, name)) => Self {
                loc,
                name: unquote(name),
                table: Some(unquote(table)),
            },
            None => Self {
                loc,
                name: unquote(qualified),
                table: None,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PredicateKind {
    And,
    Or,
    Not,
    /// `=`, `<>`, `<`, `>`, `<=` or `>=`.
    Comparison(String),
    Like,
    In,
    Between,
    IsNull,
    IsNotNull,
    Exists,
    /// Condition kept as text only.
    Raw,
}

/// One side of a predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Operand {
    Column(ColumnRef),
    /// Any other expression, as text.
    Value(String),
}

impl Operand {
    pub fn text(&self) -> String {
        match self {
            Operand::Column(col) => match &col.table {
                Some(table) => format!("{table}.{}", col.name),
                None => col.name.clone(),
            },
            Operand::Value(text) => text.clone(),
        }
    }
}

/// A boolean condition. `And`/`Or`/`Not` keep their operands in
/// `children`; the other kinds use `left` and `right`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Predicate {
    pub loc: SourceLocation,
    pub kind: PredicateKind,
    pub left: Option<Operand>,
    pub right: Option<Operand>,
    pub children: Vec<Predicate>,
}

impl Predicate {
    pub fn compare(loc: SourceLocation, kind: PredicateKind, left: Operand, right: Option<Operand>) -> Self {
        Self {
            loc,
            kind,
            left: Some(left),
            right,
            children: Vec::new(),
        }
    }

    pub fn group(loc: SourceLocation, kind: PredicateKind, children: Vec<Predicate>) -> Self {
        Self {
            loc,
            kind,
            left: None,
            right: None,
            children,
        }
    }

    /// A condition kept as text.
    pub fn raw(loc: SourceLocation, text: impl Into<String>) -> Self {
        Self {
            loc,
            kind: PredicateKind::Raw,
            left: Some(Operand::Value(text.into())),
            right: None,
            children: Vec::new(),
        }
    }

    /// Columns referenced anywhere in the condition.
    pub fn columns(&self) -> Vec<&ColumnRef> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a ColumnRef>) {
        for operand in self.left.iter().chain(self.right.iter()) {
            if let Operand::Column(col) = operand {
                out.push(col);
            }
        }
        for child in &self.children {
            child.collect_columns(out);
        }
    }
}

/// Split `SCHEMA.NAME` or `LIB/NAME` into its schema and name. Separators
/// inside delimited identifiers do not count, and delimited identifiers lose
/// their quotes. In `RDB.SCHEMA.NAME` the database part is dropped.
pub(crate) fn split_qualified(text: &str) -> (Option<String>, String) {
    let text = text.trim();
    let mut quotes = QuoteTracker::new();
    let separators: Vec<usize> = text
        .char_indices()
        .filter(|&(_, c)| !quotes.step(c) && matches!(c, '.' | '/'))
        .map(|(i, _)| i)
        .collect();
    let Some(&last) = separators.last() else {
        return (None, unquote(text));
    };
    let start = separators.iter().rev().nth(1).map_or(0, |&i| i + 1);
    (Some(unquote(&text[start..last])), unquote(&text[last + 1..]))
}

fn unquote(part: &str) -> String {
    let part = part.trim();
    match part.strip_prefix('"').and_then(|p| p.strip_suffix('"')) {
        Some(inner) => inner.replace("\"\"", "\""),
        None => part.to_string(),
    }
}
