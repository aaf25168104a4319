//! DB2 for i SQL script parsing and analysis.
//!
//! [`parse`] turns a `;`-separated SQL script into a [`Script`](ast::Script)
//! of typed statements. The `grammar` feature adds a tokenizer and
//! recursive-descent parser that recovers at statement boundaries, so one
//! pass reports every malformed statement; when it reports an error the
//! statement-splitting [`FallbackParser`] answers instead.
//!
//! Table and column names are always split into schema and name, for both
//! SQL naming (`LIB.TABLE`) and system naming (`LIB/TABLE`).
//!
//! # Example
//!
//! ```rust
//! use ibmi_db2::ast::Statement;
//!
//! let (script, diagnostics) = ibmi_db2::parse("SELECT A, B FROM SCHEMA.TBL", "Q.sql");
//! assert!(diagnostics.is_empty());
//! let Statement::Select(select) = &script.statements[0] else { unreachable!() };
//! assert_eq!(select.columns, vec!["A", "B"]);
//! assert_eq!(select.from_tables[0].schema.as_deref(), Some("SCHEMA"));
//! ```

mod analyzer;
pub mod ast;
mod fallback;
#[cfg(feature = "grammar")]
mod grammar;

pub use analyzer::{analyze, Analyzer, Db2Analysis, Db2Metrics};
pub use fallback::{split_statements, FallbackParser};
#[cfg(feature = "grammar")]
pub use grammar::GrammarParser;

use ibmi_lang_core::{Diagnostic, ParseOutcome, TieredParser};

use crate::ast::Script;

/// Parse an SQL script with the default strategy configuration.
pub fn parse(text: &str, file: &str) -> (Script, Vec<Diagnostic>) {
    Parser::new().parse(text, file).into_parts()
}

/// A configured SQL parser.
#[derive(Debug)]
pub struct Parser {
    inner: TieredParser<Script>,
}

impl Parser {
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
            tracing::debug!("SQL grammar strategy not compiled in, using fallback only");
        }
        Self { inner }
    }

    pub fn uses_grammar(&self) -> bool {
        self.inner.has_grammar()
    }

    pub fn parse(&self, text: &str, file: &str) -> ParseOutcome<Script> {
        self.inner.parse(text, file)
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}
