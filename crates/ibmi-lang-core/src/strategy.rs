//! Two-tier parsing: a strict grammar strategy backed by a heuristic fallback.
//!
//! Each language crate provides two implementations of [`ParseStrategy`] for
//! the same AST type. [`TieredParser`] runs the grammar strategy when one was
//! configured and keeps its result only if it produced no error diagnostics.
//! Otherwise the grammar output is discarded entirely and the fallback's
//! `(ast, diagnostics)` is returned instead. The two diagnostic streams are
//! never merged.

use serde::Serialize;
use tracing::debug;

use crate::diagnostic::{has_errors, Diagnostic};

/// A way of turning source text into an AST.
///
/// Implementations must not panic on malformed input: problems are reported
/// as diagnostics and the AST holds whatever could be recovered.
pub trait ParseStrategy: Send + Sync {
    /// The AST root produced by this strategy.
    type Ast;

    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Parse `text`, attributing every location to `file`.
    fn parse(&self, text: &str, file: &str) -> (Self::Ast, Vec<Diagnostic>);
}

/// Which strategy produced a [`ParseOutcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Grammar,
    Fallback,
}

/// The result of a tiered parse.
#[derive(Debug, Clone)]
pub struct ParseOutcome<A> {
    pub ast: A,
    pub diagnostics: Vec<Diagnostic>,
    pub strategy: StrategyKind,
}

impl<A> ParseOutcome<A> {
    /// Split into the `(ast, diagnostics)` pair every language `parse` returns.
    pub fn into_parts(self) -> (A, Vec<Diagnostic>) {
        (self.ast, self.diagnostics)
    }
}

/// Grammar-first parser with a mandatory fallback.
///
/// The grammar strategy is an injected capability: language crates decide at
/// construction time (driven by their `grammar` cargo feature or an explicit
/// flag) whether one is present.
pub struct TieredParser<A> {
    grammar: Option<Box<dyn ParseStrategy<Ast = A>>>,
    fallback: Box<dyn ParseStrategy<Ast = A>>,
}

impl<A> TieredParser<A> {
    /// Create a parser that only uses `fallback`.
    pub fn new(fallback: impl ParseStrategy<Ast = A> + 'static) -> Self {
        Self {
            grammar: None,
            fallback: Box::new(fallback),
        }
    }

    /// Install a grammar strategy to try before the fallback.
    pub fn with_grammar_strategy(mut self, grammar: impl ParseStrategy<Ast = A> + 'static) -> Self {
        self.grammar = Some(Box::new(grammar));
        self
    }

    /// Whether a grammar strategy is configured.
    pub fn has_grammar(&self) -> bool {
        self.grammar.is_some()
    }

    /// Parse `text`, falling back when the grammar strategy is absent or rejects it.
    pub fn parse(&self, text: &str, file: &str) -> ParseOutcome<A> {
        if let Some(grammar) = &self.grammar {
            let (ast, diagnostics) = grammar.parse(text, file);
            if !has_errors(&diagnostics) {
                debug!(file, strategy = grammar.name(), "grammar strategy accepted input");
                return ParseOutcome {
                    ast,
                    diagnostics,
                    strategy: StrategyKind::Grammar,
                };
            }
            let errors = diagnostics.iter().filter(|d| d.is_error()).count();
            debug!(
                file,
                strategy = grammar.name(),
                errors,
                "grammar strategy rejected input, using fallback"
            );
        }

        let (ast, diagnostics) = self.fallback.parse(text, file);
        ParseOutcome {
            ast,
            diagnostics,
            strategy: StrategyKind::Fallback,
        }
    }
}

impl<A> std::fmt::Debug for TieredParser<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TieredParser")
            .field("grammar", &self.grammar.as_ref().map(|g| g.name()))
            .field("fallback", &self.fallback.name())
            .finish()
    }
}
