//! Strict RPG strategy.
//!
//! Free-form source is tokenized and split at `;`; fixed-format source is
//! read column by column, with extended factor 2 expressions and free-form
//! regions going through the same expression parser. Mismatched block
//! terminators, malformed expressions and unknown specification types are
//! errors, which makes the tiered parser fall back.

mod blocks;
mod expr;
mod fixed;
mod free;
mod lexer;

use ibmi_lang_core::{normalize_line_endings, Diagnostic, ParseStrategy};

use crate::ast::Program;
use expr::Locator;

/// The grammar-driven RPG strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrammarParser;

impl ParseStrategy for GrammarParser {
    type Ast = Program;

    fn name(&self) -> &'static str {
        "rpg-grammar"
    }

    fn parse(&self, text: &str, file: &str) -> (Program, Vec<Diagnostic>) {
        let text = normalize_line_endings(text);
        let is_free = crate::is_free_format(&text);
        let mut program = Program::empty(file, is_free);
        let mut diagnostics = Vec::new();

        program.main_body = if is_free {
            let locator = Locator::new(&program.loc.clone(), &text);
            free::parse_free(&mut program, &text, &locator, &mut diagnostics)
        } else {
            fixed::parse_fixed(&mut program, &text, &mut diagnostics)
        };
        (program, diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Statement;

    #[test]
    fn test_dispatches_on_format() {
        let (free, diagnostics) = GrammarParser.parse("**FREE\r\ndcl-s x int(10);\r\nx = 1;\r\n", "F.rpgle");
        assert!(diagnostics.is_empty());
        assert!(free.is_free_format);
        assert_eq!(free.variables.len(), 1);
        assert!(matches!(&free.main_body[0], Statement::Assign { loc, .. } if loc.line == 3));

        let (fixed, diagnostics) = GrammarParser.parse("     C                   RETURN\n", "X.rpgle");
        assert!(diagnostics.is_empty());
        assert!(!fixed.is_free_format);
        assert_eq!(fixed.main_body.len(), 1);
    }
}
