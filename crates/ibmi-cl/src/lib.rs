//! CL/CLLE command script parsing and analysis.
//!
//! [`parse`] turns source text into a [`Program`](ast::Program) plus
//! diagnostics. With the default `grammar` feature a strict tokenizer and
//! recursive-descent parser is tried first; when it reports any error, or
//! when it is disabled, the line-oriented [`FallbackParser`] produces the
//! result instead.
//!
//! # Example
//!
//! ```rust
//! let (program, diagnostics) = ibmi_cl::parse("CALL PGM(FOO) PARM(&A &B)", "X.clle");
//! assert!(diagnostics.is_empty());
//! assert_eq!(program.commands[0].name, "CALL");
//! ```

mod analyzer;
pub mod ast;
mod fallback;
#[cfg(feature = "grammar")]
mod grammar;

pub use analyzer::{analyze, Analyzer, ClAnalysis, ClMetrics};
pub use fallback::{FallbackParser, CONTINUATION_COLUMN, LABEL_FIELD_WIDTH};
#[cfg(feature = "grammar")]
pub use grammar::GrammarParser;

use ibmi_lang_core::{Diagnostic, ParseOutcome, TieredParser};

use crate::ast::Program;

/// Parse CL source with the default strategy configuration.
pub fn parse(text: &str, file: &str) -> (Program, Vec<Diagnostic>) {
    Parser::new().parse(text, file).into_parts()
}

/// A configured CL parser.
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
    ///
    /// Requesting the grammar without the `grammar` feature yields a
    /// fallback-only parser.
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
            tracing::debug!("CL grammar strategy not compiled in, using fallback only");
        }
        Self { inner }
    }

    /// Whether the grammar strategy will be tried.
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
