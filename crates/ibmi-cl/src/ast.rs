//! CL abstract syntax tree.
//!
//! A program is a flat list of commands; control flow (`IF`, `DO`,
//! `MONMSG`) is expressed by the commands themselves, so the tree is only
//! ever nested inside parameter values.

use ibmi_lang_core::SourceLocation;
use serde::Serialize;

/// A parsed CL source member.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Program {
    pub loc: SourceLocation,
    pub commands: Vec<Command>,
}

/// One logical command, after continuation lines are joined.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Command {
    pub loc: SourceLocation,
    /// Statement label (`LOOP:`), upper-cased.
    pub label: Option<String>,
    /// Command name, always upper-cased.
    pub name: String,
    pub parameters: Vec<Parameter>,
}

/// A command parameter. Positional parameters have no keyword.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    pub loc: SourceLocation,
    pub keyword: Option<String>,
    pub value: Expression,
}

/// A parameter value. Parenthesized lists keep their elements as children.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expression {
    pub loc: SourceLocation,
    pub text: String,
    pub children: Vec<Expression>,
}

impl Program {
    /// An empty program for `file`.
    pub fn empty(file: &str) -> Self {
        Self {
            loc: SourceLocation::start_of(file),
            commands: Vec::new(),
        }
    }
}

impl Command {
    /// The first parameter with the given keyword.
    pub fn keyword(&self, keyword: &str) -> Option<&Parameter> {
        self.parameters
            .iter()
            .find(|p| p.keyword.as_deref().is_some_and(|k| k.eq_ignore_ascii_case(keyword)))
    }

    /// Parameters without a keyword, in order.
    pub fn positional(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter().filter(|p| p.keyword.is_none())
    }
}

impl Expression {
    /// A leaf expression.
    pub fn leaf(loc: SourceLocation, text: impl Into<String>) -> Self {
        Self {
            loc,
            text: text.into(),
            children: Vec::new(),
        }
    }
}
