//! Heuristic RPG parser.
//!
//! Never fails and never reports diagnostics. Free-form sources are scanned
//! line by line for declarations, procedure boundaries, embedded SQL and a
//! few statement shapes; fixed-format sources are sliced by column.
//! Everything else is ignored.

mod fixed;
mod free;

pub use fixed::{
    CONTENT_COLUMN, MIN_LINE_LEN, OPCODE_END, OPCODE_START, PROC_NAME_WIDTH, SPEC_COLUMN,
};

use ibmi_lang_core::{Diagnostic, ParseStrategy};

use crate::ast::Program;
use crate::is_free_format;

/// The always-succeeding RPG strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackParser;

impl ParseStrategy for FallbackParser {
    type Ast = Program;

    fn name(&self) -> &'static str {
        "rpg-fallback"
    }

    fn parse(&self, text: &str, file: &str) -> (Program, Vec<Diagnostic>) {
        let free = is_free_format(text);
        let mut program = Program::empty(file, free);
        if free {
            free::parse(&mut program, text);
        } else {
            fixed::parse(&mut program, text);
        }
        (program, Vec::new())
    }
}
