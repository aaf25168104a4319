//! RPG abstract syntax tree.
//!
//! Both source formats produce the same tree. Declarations are collected
//! at program level regardless of where they appear; executable statements
//! live either in the main body or in a procedure body.

use ibmi_lang_core::SourceLocation;
use serde::Serialize;

/// A parsed RPG source member.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Program {
    pub loc: SourceLocation,
    /// Decided from the first non-blank line (`**FREE` or `/FREE`).
    pub is_free_format: bool,
    pub procedures: Vec<Procedure>,
    pub main_body: Vec<Statement>,
    pub variables: Vec<VarDecl>,
    /// Every embedded SQL statement in source order, wherever it appears.
    pub sql_statements: Vec<EmbeddedSql>,
}

impl Program {
    pub fn empty(file: &str, is_free_format: bool) -> Self {
        Self {
            loc: SourceLocation::start_of(file),
            is_free_format,
            procedures: Vec::new(),
            main_body: Vec::new(),
            variables: Vec::new(),
            sql_statements: Vec::new(),
        }
    }

    /// All statements in the program, main body first, without descending
    /// into nested blocks.
    pub fn top_level_statements(&self) -> impl Iterator<Item = &Statement> {
        self.main_body
            .iter()
            .chain(self.procedures.iter().flat_map(|p| p.body.iter()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Procedure {
    pub loc: SourceLocation,
    pub name: String,
    pub params: Vec<Param>,
    pub body: Vec<Statement>,
    /// Return type from the procedure interface, if declared.
    pub returns: Option<String>,
}

impl Procedure {
    pub fn new(loc: SourceLocation, name: impl Into<String>) -> Self {
        Self {
            loc,
            name: name.into(),
            params: Vec::new(),
            body: Vec::new(),
            returns: None,
        }
    }
}

/// A procedure interface parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Param {
    pub loc: SourceLocation,
    pub name: String,
    pub data_type: Option<String>,
    /// `VALUE` or `CONST` when the parameter is not passed by reference.
    pub passing: Option<String>,
}

/// A standalone field, named constant or data structure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VarDecl {
    pub loc: SourceLocation,
    pub name: String,
    pub data_type: Option<String>,
    pub length: Option<u32>,
    pub decimals: Option<u32>,
    /// Initial value text (`INZ` or constant value).
    pub inz: Option<String>,
}

impl VarDecl {
    pub fn new(loc: SourceLocation, name: impl Into<String>, data_type: Option<String>) -> Self {
        Self {
            loc,
            name: name.into(),
            data_type,
            length: None,
            decimals: None,
            inz: None,
        }
    }
}

/// An `EXEC SQL` block. The text excludes the `EXEC SQL` prefix and the
/// terminator; lines are trimmed and joined with `\n`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbeddedSql {
    pub loc: SourceLocation,
    pub sql_text: String,
    pub stmt_type: Option<String>,
}

/// Loop flavor of a [`Statement::DoFor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopKind {
    /// Counted `DO`.
    Do,
    Dow,
    Dou,
    For,
}

impl LoopKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LoopKind::Do => "DO",
            LoopKind::Dow => "DOW",
            LoopKind::Dou => "DOU",
            LoopKind::For => "FOR",
        }
    }
}

/// A condition with its guarded body (`ELSEIF`, `WHEN`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionalBlock {
    pub loc: SourceLocation,
    pub condition: Expr,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Statement {
    Assign {
        loc: SourceLocation,
        target: Expr,
        expr: Expr,
    },
    Call {
        loc: SourceLocation,
        name: String,
        args: Vec<Expr>,
    },
    If {
        loc: SourceLocation,
        condition: Expr,
        then_body: Vec<Statement>,
        else_ifs: Vec<ConditionalBlock>,
        else_body: Vec<Statement>,
    },
    Select {
        loc: SourceLocation,
        whens: Vec<ConditionalBlock>,
        other: Option<Vec<Statement>>,
    },
    DoFor {
        loc: SourceLocation,
        kind: LoopKind,
        condition: Option<Expr>,
        body: Vec<Statement>,
    },
    Return {
        loc: SourceLocation,
        value: Option<Expr>,
    },
    EmbeddedSql(EmbeddedSql),
}

impl Statement {
    pub fn loc(&self) -> &SourceLocation {
        match self {
            Statement::Assign { loc, .. }
            | Statement::Call { loc, .. }
            | Statement::If { loc, .. }
            | Statement::Select { loc, .. }
            | Statement::DoFor { loc, .. }
            | Statement::Return { loc, .. } => loc,
            Statement::EmbeddedSql(sql) => &sql.loc,
        }
    }

    /// Nested statement lists, in source order.
    pub fn children(&self) -> Vec<&Statement> {
        match self {
            Statement::If {
                then_body,
                else_ifs,
                else_body,
                ..
            } => then_body
                .iter()
                .chain(else_ifs.iter().flat_map(|b| b.body.iter()))
                .chain(else_body.iter())
                .collect(),
            Statement::Select { whens, other, .. } => whens
                .iter()
                .flat_map(|b| b.body.iter())
                .chain(other.iter().flatten())
                .collect(),
            Statement::DoFor { body, .. } => body.iter().collect(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expr {
    pub loc: SourceLocation,
    pub kind: ExprKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value")]
pub enum ExprKind {
    /// Number, quoted string (quotes kept) or `*SPECIAL` value.
    Literal(String),
    /// Possibly qualified name (`DS.FIELD`), upper-cased.
    Ident(String),
    Binary {
        op: String,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: String,
        operand: Box<Expr>,
    },
    /// Built-in (`%TRIM`), procedure call or array element.
    Call { name: String, args: Vec<Expr> },
    /// Unparsed text kept by the fallback strategies.
    Raw(String),
}

/// Longest token the raw-text heuristic treats as a field name.
const MAX_RAW_NAME_LEN: usize = 10;

impl Expr {
    pub fn new(loc: SourceLocation, kind: ExprKind) -> Self {
        Self { loc, kind }
    }

    pub fn raw(loc: SourceLocation, text: impl Into<String>) -> Self {
        Self::new(loc, ExprKind::Raw(text.into()))
    }

    pub fn ident(loc: SourceLocation, name: impl Into<String>) -> Self {
        Self::new(loc, ExprKind::Ident(name.into()))
    }

    /// Source-like rendering. Grouping parentheses are not preserved.
    pub fn text(&self) -> String {
        match &self.kind {
            ExprKind::Literal(s) | ExprKind::Ident(s) | ExprKind::Raw(s) => s.clone(),
            ExprKind::Binary { op, left, right } => {
                format!("{} {op} {}", left.text(), right.text())
            }
            ExprKind::Unary { op, operand } if op.chars().all(|c| c.is_ascii_alphabetic()) => {
                format!("{op} {}", operand.text())
            }
            ExprKind::Unary { op, operand } => format!("{op}{}", operand.text()),
            ExprKind::Call { name, args } => {
                let args: Vec<String> = args.iter().map(Expr::text).collect();
                format!("{name}({})", args.join(": "))
            }
        }
    }

    /// Names referenced by this expression, in order of first appearance.
    ///
    /// Structured expressions report their identifiers. `Raw` text falls back
    /// to a coarse guess: any purely alphabetic token of at most ten
    /// characters counts as a reference.
    pub fn variables(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables(&self, out: &mut Vec<String>) {
        match &self.kind {
            ExprKind::Literal(_) => {}
            ExprKind::Ident(name) => push_unique(out, name.clone()),
            ExprKind::Raw(text) => {
                for token in text.split(|c: char| !c.is_ascii_alphanumeric() && c != '_') {
                    if !token.is_empty()
                        && token.len() <= MAX_RAW_NAME_LEN
                        && token.chars().all(|c| c.is_ascii_alphabetic())
                    {
                        push_unique(out, token.to_uppercase());
                    }
                }
            }
            ExprKind::Binary { left, right, .. } => {
                left.collect_variables(out);
                right.collect_variables(out);
            }
            ExprKind::Unary { operand, .. } => operand.collect_variables(out),
            ExprKind::Call { name, args } => {
                // Array elements reference the array itself.
                if !name.starts_with('%') {
                    push_unique(out, name.clone());
                }
                for arg in args {
                    arg.collect_variables(out);
                }
            }
        }
    }
}

fn push_unique(out: &mut Vec<String>, name: String) {
    if !out.contains(&name) {
        out.push(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> SourceLocation {
        SourceLocation::start_of("T.rpgle")
    }

    #[test]
    fn test_expr_text() {
        let sum = Expr::new(
            loc(),
            ExprKind::Binary {
                op: "+".into(),
                left: Box::new(Expr::ident(loc(), "TOTAL")),
                right: Box::new(Expr::new(loc(), ExprKind::Literal("1".into()))),
            },
        );
        assert_eq!(sum.text(), "TOTAL + 1");

        let not = Expr::new(
            loc(),
            ExprKind::Unary {
                op: "NOT".into(),
                operand: Box::new(Expr::ident(loc(), "DONE")),
            },
        );
        assert_eq!(not.text(), "NOT DONE");

        let trim = Expr::new(
            loc(),
            ExprKind::Call {
                name: "%SUBST".into(),
                args: vec![Expr::ident(loc(), "NAME"), Expr::new(loc(), ExprKind::Literal("1".into()))],
            },
        );
        assert_eq!(trim.text(), "%SUBST(NAME: 1)");
    }

    #[test]
    fn test_raw_variables_heuristic() {
        let e = Expr::raw(loc(), "total + qty * 2 + averyverylongname + x1");
        assert_eq!(e.variables(), vec!["TOTAL", "QTY"]);
    }

    #[test]
    fn test_structured_variables() {
        let e = Expr::new(
            loc(),
            ExprKind::Call {
                name: "%TRIM".into(),
                args: vec![Expr::ident(loc(), "CUST.NAME"), Expr::ident(loc(), "CUST.NAME")],
            },
        );
        assert_eq!(e.variables(), vec!["CUST.NAME"]);
    }
}
