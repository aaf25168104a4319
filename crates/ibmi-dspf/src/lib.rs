//! DSPF display file (DDS) parsing and analysis.
//!
//! With the default `grammar` feature the source is first read by its DDS
//! column layout, which reports misplaced specs, bad numbers and unbalanced
//! keyword text. When that reports an error, or when the feature is off, a
//! token-oriented [`FallbackParser`] builds the tree instead.
//!
//! # Example
//!
//! ```rust
//! let text = "     A          R PROMPT\n     A            CUSTNO         5S 0I  3 10\n";
//! let (display, diagnostics) = ibmi_dspf::parse(text, "PROMPT.dspf");
//! assert!(diagnostics.is_empty());
//! assert_eq!(display.record_formats[0].name, "PROMPT");
//! assert_eq!(display.record_formats[0].fields[0].name, "CUSTNO");
//! ```

mod analyzer;
pub mod ast;
mod fallback;
#[cfg(feature = "grammar")]
mod grammar;

pub use analyzer::{analyze, Analyzer, DspfAnalysis, DspfMetrics, DEFAULT_SCREEN_SIZE};
pub use fallback::FallbackParser;
#[cfg(feature = "grammar")]
pub use grammar::GrammarParser;

use ibmi_lang_core::{Diagnostic, ParseOutcome, TieredParser};

use crate::ast::DisplayFile;

/// Parse DDS source with the default strategy configuration.
pub fn parse(text: &str, file: &str) -> (DisplayFile, Vec<Diagnostic>) {
    Parser::new().parse(text, file).into_parts()
}

/// A configured DDS parser.
#[derive(Debug)]
pub struct Parser {
    inner: TieredParser<DisplayFile>,
}

impl Parser {
    pub fn new() -> Self {
        Self::with_grammar(cfg!(feature = "grammar"))
    }

    /// Choose whether to try the column-layout strategy before the fallback.
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
            tracing::debug!("DDS grammar strategy not compiled in, using fallback only");
        }
        Self { inner }
    }

    pub fn uses_grammar(&self) -> bool {
        self.inner.has_grammar()
    }

    pub fn parse(&self, text: &str, file: &str) -> ParseOutcome<DisplayFile> {
        self.inner.parse(text, file)
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}
