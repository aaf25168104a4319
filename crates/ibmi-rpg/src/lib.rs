//! RPG / RPGLE / SQLRPGLE parsing and analysis.
//!
//! Both source formats are supported. A member whose first non-blank line is
//! `**FREE` or `/FREE` is free-form; anything else is read as fixed-format
//! specifications. Embedded `EXEC SQL` statements are captured in
//! [`Program::sql_statements`](ast::Program) wherever they occur.
//!
//! # Example
//!
//! ```rust
//! let src = "**FREE\ndcl-s total packed(9:2);\ntotal = total + 1;\n";
//! let (program, diagnostics) = ibmi_rpg::parse(src, "X.rpgle");
//! assert!(diagnostics.is_empty());
//! assert!(program.is_free_format);
//! assert_eq!(program.variables[0].name, "TOTAL");
//! ```

mod analyzer;
pub mod ast;
mod fallback;
#[cfg(feature = "grammar")]
mod grammar;
mod graph;
mod sql;

pub use analyzer::{analyze, Analyzer, RpgAnalysis, RpgMetrics};
pub use fallback::{
    FallbackParser, CONTENT_COLUMN, MIN_LINE_LEN, OPCODE_END, OPCODE_START, PROC_NAME_WIDTH,
    SPEC_COLUMN,
};
#[cfg(feature = "grammar")]
pub use grammar::GrammarParser;
pub use graph::{GraphNode, RpgGraph};
pub use sql::{guess_sql_type, SQL_STATEMENT_TYPES, SQL_TYPE_WINDOW};

use ibmi_lang_core::{Diagnostic, ParseOutcome, TieredParser};

use crate::ast::Program;

/// Whether `text` is free-form: its first non-blank line starts with
/// `**FREE` or `/FREE`, ignoring case and leading blanks.
pub fn is_free_format(text: &str) -> bool {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_ascii_uppercase)
        .is_some_and(|line| line.starts_with("**FREE") || line.starts_with("/FREE"))
}

/// Parse RPG source with the default strategy configuration.
pub fn parse(text: &str, file: &str) -> (Program, Vec<Diagnostic>) {
    Parser::new().parse(text, file).into_parts()
}

/// A configured RPG parser.
#[derive(Debug)]
pub struct Parser {
    inner: TieredParser<Program>,
}

impl Parser {
    /// Grammar strategy enabled when the `grammar` feature is compiled in.
    pub fn new() -> Self {
        Self::with_grammar(cfg!(feature = "grammar"))
    }

    /// Choose whether to try the grammar strategy before the fallback.
    pub fn with_grammar(enabled: bool) -> Self {
        let inner = TieredParser::new(FallbackParser);
        #[cfg(feature = "grammar")]
        let inner = if enabled {
            inner.with_grammar_strategy(GrammarParser)
        } else {
            inner
        };
        #[cfg(not(feature = "grammar"))]
        if enabled {
            tracing::debug!("RPG grammar strategy not compiled in, using fallback only");
        }
        Self { inner }
    }

    pub fn uses_grammar(&self) -> bool {
        self.inner.has_grammar()
    }

    pub fn parse(&self, text: &str, file: &str) -> ParseOutcome<Program> {
        self.inner.parse(text, file)
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}
