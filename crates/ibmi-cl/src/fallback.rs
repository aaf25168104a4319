//! Line-oriented heuristic CL parser.
//!
//! Never fails. Source lines use the fixed member layout: a `+` in column 6
//! marks a continuation line, and columns 1-15 of a continuation line are the
//! label field, which is dropped before the rest is appended to the command.
//! Unrecognized text is kept as positional parameters rather than reported.

use ibmi_lang_core::{columns, split_whitespace_quoted, Diagnostic, ParseStrategy, SourceLocation};

use crate::ast::{Command, Expression, Parameter, Program};

/// 0-based index of the continuation marker column (column 6).
pub const CONTINUATION_COLUMN: usize = 5;
/// Width of the label field stripped from continuation lines.
pub const LABEL_FIELD_WIDTH: usize = 15;

/// The always-succeeding CL strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackParser;

impl ParseStrategy for FallbackParser {
    type Ast = Program;

    fn name(&self) -> &'static str {
        "cl-fallback"
    }

    fn parse(&self, text: &str, file: &str) -> (Program, Vec<Diagnostic>) {
        let mut program = Program::empty(file);
        let lines: Vec<&str> = text.lines().collect();

        let mut i = 0;
        while i < lines.len() {
            let line = lines[i];
            if is_ignorable(line) {
                i += 1;
                continue;
            }

            let mut logical = line.trim().to_string();
            let mut j = i + 1;
            while j < lines.len() && is_continuation(lines[j]) {
                let rest = columns::from(lines[j], LABEL_FIELD_WIDTH).trim_end();
                if !rest.is_empty() {
                    logical.push(' ');
                    logical.push_str(rest);
                }
                j += 1;
            }

            let column = line.chars().take_while(|c| c.is_whitespace()).count() as u32 + 1;
            let loc = program.loc.at(i as u32 + 1, column);
            if let Some(command) = parse_command_text(logical.trim(), &loc) {
                program.commands.push(command);
            }
            i = j;
        }

        (program, Vec::new())
    }
}

fn is_ignorable(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || trimmed.starts_with("/*") || trimmed.starts_with('*')
}

fn is_continuation(line: &str) -> bool {
    columns::char_at(line, CONTINUATION_COLUMN) == Some('+')
}

/// Split one logical command into its name and parameters.
fn parse_command_text(text: &str, loc: &SourceLocation) -> Option<Command> {
    let mut parts = split_whitespace_quoted(text).into_iter();
    let name = parts.next()?.to_uppercase();

    let parameters = parts
        .map(|part| match part.split_once('=') {
            Some((keyword, value)) => {
                let keyword = keyword.trim().to_uppercase();
                Parameter {
                    loc: loc.clone(),
                    keyword: (!keyword.is_empty()).then_some(keyword),
                    value: Expression::leaf(loc.clone(), value.trim()),
                }
            }
            None => Parameter {
                loc: loc.clone(),
                keyword: None,
                value: Expression::leaf(loc.clone(), part),
            },
        })
        .collect();

    Some(Command {
        loc: loc.clone(),
        label: None,
        name,
        parameters,
    })
}
