//! Strict CL strategy: tokenizer plus recursive descent.
//!
//! Grammar:
//!
//! ```text
//! program   := { statement NEWLINE }
//! statement := [ NAME ':' ] NAME { parameter }
//! parameter := NAME '(' { value } ')'        -- keyword form, no blank before '('
//!            | value                          -- positional
//! value     := atom | NAME '(' { value } ')' | '(' { value } ')'
//! atom      := NAME | SPECIAL | VARIABLE | STRING | NUMBER | OPERATOR
//! ```
//!
//! Any syntax error is reported as an error diagnostic, which makes the
//! tiered parser discard this result.

mod lexer;

use std::collections::HashSet;
use std::sync::Arc;

use ibmi_lang_core::{
    normalize_line_endings, Diagnostic, LineIndex, ParseStrategy, Severity, SourceLocation,
};

use crate::ast::{Command, Expression, Parameter, Program};
use lexer::{tokenize, Token, TokenKind};

/// The grammar-driven CL strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrammarParser;

impl ParseStrategy for GrammarParser {
    type Ast = Program;

    fn name(&self) -> &'static str {
        "cl-grammar"
    }

    fn parse(&self, text: &str, file: &str) -> (Program, Vec<Diagnostic>) {
        let text = normalize_line_endings(text);
        let index = LineIndex::new(&text);
        let file: Arc<str> = Arc::from(file);
        let (tokens, lex_errors) = tokenize(&text);

        let mut parser = Parser {
            tokens,
            pos: 0,
            file: Arc::clone(&file),
            index,
            diagnostics: Vec::new(),
        };
        for err in lex_errors {
            parser.report(err.offset, Severity::Error, err.message);
        }
        let program = parser.program();
        (program, parser.diagnostics)
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    file: Arc<str>,
    index: LineIndex,
    diagnostics: Vec<Diagnostic>,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    fn nth_kind(&self, n: usize) -> Option<TokenKind> {
        self.tokens.get(self.pos + n).map(|t| t.kind)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn loc(&self, offset: u32) -> SourceLocation {
        let (line, column) = self.index.line_col(offset);
        SourceLocation::new(Arc::clone(&self.file), line, column)
    }

    fn report(&mut self, offset: u32, severity: Severity, message: impl Into<String>) {
        let loc = self.loc(offset);
        self.diagnostics.push(Diagnostic::at(&loc, severity, message));
    }

    fn at_line_end(&self) -> bool {
        matches!(self.peek_kind(), None | Some(TokenKind::Newline))
    }

    fn skip_newlines(&mut self) {
        while self.peek_kind() == Some(TokenKind::Newline) {
            self.pos += 1;
        }
    }

    /// Skip the rest of a malformed command.
    fn recover(&mut self) {
        while !self.at_line_end() {
            self.pos += 1;
        }
    }

    /// `NAME` immediately followed by `(`.
    fn at_call(&self) -> bool {
        match (self.tokens.get(self.pos), self.tokens.get(self.pos + 1)) {
            (Some(name), Some(paren)) => {
                name.kind == TokenKind::Name && paren.kind == TokenKind::LParen && name.end == paren.start
            }
            _ => false,
        }
    }

    fn program(&mut self) -> Program {
        let loc = SourceLocation::start_of(Arc::clone(&self.file));
        let mut commands = Vec::new();
        let mut pending_label = None;

        loop {
            self.skip_newlines();
            if self.peek().is_none() {
                break;
            }

            if self.peek_kind() == Some(TokenKind::Name) && self.nth_kind(1) == Some(TokenKind::Colon) {
                let label = self.advance().map(|t| t.text);
                self.pos += 1;
                if self.at_line_end() {
                    // Label on a line of its own applies to the next command.
                    pending_label = label;
                    continue;
                }
                pending_label = label;
            }

            if let Some(mut command) = self.command() {
                command.label = pending_label.take();
                commands.push(command);
            }
        }

        if let Some(label) = pending_label {
            let offset = self.tokens.last().map(|t| t.start).unwrap_or(0);
            self.report(offset, Severity::Warning, format!("label {label} is not followed by a command"));
        }
        self.check_structure(&commands);

        Program { loc, commands }
    }

    fn command(&mut self) -> Option<Command> {
        let token = self.peek()?.clone();
        if token.kind != TokenKind::Name {
            let found = if token.text.is_empty() { "end of line" } else { token.text.as_str() };
            self.report(token.start, Severity::Error, format!("expected command name, found '{found}'"));
            self.recover();
            return None;
        }
        self.pos += 1;

        let mut parameters = Vec::new();
        let mut seen = HashSet::new();
        while !self.at_line_end() {
            let Some(param) = self.parameter() else {
                self.recover();
                break;
            };
            if let Some(keyword) = &param.keyword {
                if !seen.insert(keyword.clone()) {
                    let offset = self.tokens[self.pos.saturating_sub(1)].start;
                    self.report(
                        offset,
                        Severity::Warning,
                        format!("keyword {keyword} specified more than once on {}", token.text),
                    );
                }
            }
            parameters.push(param);
        }

        Some(Command {
            loc: self.loc(token.start),
            label: None,
            name: token.text,
            parameters,
        })
    }

    fn parameter(&mut self) -> Option<Parameter> {
        let start = self.peek()?.start;
        if self.at_call() {
            let keyword = self.advance().map(|t| t.text);
            let (open, elements) = self.group()?;
            let value = match <[Expression; 1]>::try_from(elements) {
                Ok([single]) if single.children.is_empty() => single,
                Ok([single]) => Expression {
                    loc: self.loc(open),
                    text: single.text.clone(),
                    children: vec![single],
                },
                Err(elements) => Expression {
                    loc: self.loc(open),
                    text: join(&elements),
                    children: elements,
                },
            };
            return Some(Parameter {
                loc: self.loc(start),
                keyword,
                value,
            });
        }

        let value = self.value()?;
        Some(Parameter {
            loc: self.loc(start),
            keyword: None,
            value,
        })
    }

    fn value(&mut self) -> Option<Expression> {
        let token = self.peek()?.clone();
        match token.kind {
            TokenKind::Name if self.at_call() => {
                self.pos += 1;
                let (_, args) = self.group()?;
                Some(Expression {
                    loc: self.loc(token.start),
                    text: format!("{}({})", token.text, join(&args)),
                    children: args,
                })
            }
            TokenKind::LParen => {
                let (open, elements) = self.group()?;
                Some(Expression {
                    loc: self.loc(open),
                    text: format!("({})", join(&elements)),
                    children: elements,
                })
            }
            TokenKind::RParen => {
                self.report(token.start, Severity::Error, "unbalanced ')'");
                None
            }
            TokenKind::Colon => {
                self.report(token.start, Severity::Error, "unexpected ':'");
                None
            }
            TokenKind::Newline => None,
            TokenKind::Name
            | TokenKind::Special
            | TokenKind::Variable
            | TokenKind::String
            | TokenKind::Number
            | TokenKind::Operator => {
                self.pos += 1;
                Some(Expression::leaf(self.loc(token.start), token.text))
            }
        }
    }

    /// Parse `'(' { value } ')'`, returning the offset of `(` and the elements.
    fn group(&mut self) -> Option<(u32, Vec<Expression>)> {
        let open = self.advance()?.start;
        let mut elements = Vec::new();
        loop {
            match self.peek_kind() {
                Some(TokenKind::RParen) => {
                    self.pos += 1;
                    return Some((open, elements));
                }
                None | Some(TokenKind::Newline) => {
                    self.report(open, Severity::Error, "missing ')' for this '('");
                    return None;
                }
                Some(_) => elements.push(self.value()?),
            }
        }
    }

    /// Structural oddities that do not prevent parsing.
    fn check_structure(&mut self, commands: &[Command]) {
        let Some(first) = commands.first() else {
            return;
        };
        let has_pgm = commands.iter().any(|c| c.name == "PGM");
        let has_endpgm = commands.iter().any(|c| c.name == "ENDPGM");
        if has_pgm && first.name != "PGM" {
            self.diagnostics.push(Diagnostic::at(
                &first.loc,
                Severity::Warning,
                "PGM is not the first command",
            ));
        }
        if has_pgm && !has_endpgm {
            if let Some(last) = commands.last() {
                self.diagnostics.push(Diagnostic::at(
                    &last.loc,
                    Severity::Warning,
                    "program has PGM but no ENDPGM",
                ));
            }
        }
        let opened = commands.iter().filter(|c| is_do_open(c)).count();
        let closed = commands.iter().filter(|c| c.name == "ENDDO").count();
        if opened != closed {
            self.diagnostics.push(Diagnostic::at(
                &first.loc,
                Severity::Warning,
                format!("{opened} DO group(s) opened but {closed} ENDDO found"),
            ));
        }
    }
}

/// Commands that open a group closed by ENDDO.
fn is_do_open(command: &Command) -> bool {
    match command.name.as_str() {
        "DO" | "DOWHILE" | "DOUNTIL" | "DOFOR" => true,
        "IF" | "ELSE" | "MONMSG" => command.parameters.iter().any(|p| {
            let then = p.keyword.as_deref().map_or(true, |k| matches!(k, "THEN" | "CMD" | "EXEC"));
            then && p.value.text.trim() == "DO"
        }),
        _ => false,
    }
}

fn join(elements: &[Expression]) -> String {
    elements
        .iter()
        .map(|e| e.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}
