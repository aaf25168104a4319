//! Token cursor and expression parser shared by both grammar strategies.
//!
//! ```text
//! expr    := and { OR and }
//! and     := not { AND not }
//! not     := NOT not | compare
//! compare := sum [ ('=' | '<>' | '<' | '>' | '<=' | '>=') sum ]
//! sum     := product { ('+' | '-') product }
//! product := power { ('*' | '/') power }
//! power   := unary [ '**' power ]
//! unary   := ('-' | '+') unary | primary
//! primary := NUMBER | STRING | SPECIAL [STRING] | '(' expr ')'
//!          | BIF [ '(' args ')' ]
//!          | IDENT [ '(' args ')' ] { '.' IDENT [ '(' args ')' ] }
//! args    := [ expr { ':' expr } ]
//! ```

use ibmi_lang_core::{LineIndex, SourceLocation};

use super::lexer::{Token, TokenKind};
use crate::ast::{Expr, ExprKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SyntaxError {
    pub offset: u32,
    pub message: String,
}

pub(crate) type ParseResult<T> = Result<T, SyntaxError>;

/// Maps byte offsets within a piece of text to file locations.
///
/// The text may start anywhere in the file: a calculation spec's extended
/// factor 2 is tokenized on its own and positioned at its line and column.
#[derive(Debug)]
pub(crate) struct Locator {
    file: SourceLocation,
    index: LineIndex,
    line: u32,
    column: u32,
}

impl Locator {
    /// Text that starts at line 1, column 1.
    pub fn new(file: &SourceLocation, text: &str) -> Self {
        Self::at(file, text, 1, 1)
    }

    /// Text whose first character sits at `line`/`column`.
    pub fn at(file: &SourceLocation, text: &str, line: u32, column: u32) -> Self {
        Self {
            file: file.clone(),
            index: LineIndex::new(text),
            line,
            column,
        }
    }

    pub fn loc(&self, offset: u32) -> SourceLocation {
        let (line, column) = self.index.line_col(offset);
        if line == 1 {
            self.file.at(self.line, self.column + column - 1)
        } else {
            self.file.at(self.line + line - 1, column)
        }
    }
}

const COMPARISONS: &[&str] = &["=", "<>", "<", ">", "<=", ">="];

/// Assignment operators accepted after a target.
pub(crate) const ASSIGN_OPERATORS: &[&str] = &["=", "+=", "-=", "*=", "/=", "**="];

pub(crate) struct Cursor<'t> {
    tokens: &'t [Token],
    pos: usize,
    locator: &'t Locator,
}

impl<'t> Cursor<'t> {
    pub fn new(tokens: &'t [Token], locator: &'t Locator) -> Self {
        Self {
            tokens,
            pos: 0,
            locator,
        }
    }

    pub fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    pub fn advance(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Consume the identifier `text` if it is next.
    pub fn eat_ident(&mut self, text: &str) -> bool {
        if self.peek().is_some_and(|t| t.is_ident(text)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_kind(&mut self, kind: TokenKind) -> Option<&'t Token> {
        if self.peek().is_some_and(|t| t.kind == kind) {
            self.advance()
        } else {
            None
        }
    }

    fn eat_operator(&mut self, ops: &[&str]) -> Option<&'t Token> {
        if self
            .peek()
            .is_some_and(|t| t.kind == TokenKind::Operator && ops.contains(&t.text.as_str()))
        {
            self.advance()
        } else {
            None
        }
    }

    pub fn loc_of(&self, token: &Token) -> SourceLocation {
        self.locator.loc(token.start)
    }

    /// An error at the next token, or just past the last one.
    pub fn error(&self, message: impl Into<String>) -> SyntaxError {
        let offset = match self.peek() {
            Some(token) => token.start,
            None => self.tokens.last().map_or(0, |t| t.end),
        };
        SyntaxError {
            offset,
            message: message.into(),
        }
    }

    fn found(&self) -> String {
        match self.peek() {
            Some(token) => format!("'{}'", token.text),
            None => "end of statement".to_string(),
        }
    }

    /// Require that every token was consumed.
    pub fn finish(&self) -> ParseResult<()> {
        match self.peek() {
            None => Ok(()),
            Some(token) => Err(self.error(format!("unexpected '{}'", token.text))),
        }
    }

    pub fn expr(&mut self) -> ParseResult<Expr> {
        let mut left = self.and()?;
        while let Some(op) = self.peek().filter(|t| t.is_ident("OR")) {
            self.pos += 1;
            let right = self.and()?;
            left = binary(self.loc_of(op), "OR", left, right);
        }
        Ok(left)
    }

    fn and(&mut self) -> ParseResult<Expr> {
        let mut left = self.not()?;
        while let Some(op) = self.peek().filter(|t| t.is_ident("AND")) {
            self.pos += 1;
            let right = self.not()?;
            left = binary(self.loc_of(op), "AND", left, right);
        }
        Ok(left)
    }

    fn not(&mut self) -> ParseResult<Expr> {
        if let Some(op) = self.peek().filter(|t| t.is_ident("NOT")) {
            self.pos += 1;
            let operand = self.not()?;
            return Ok(unary(self.loc_of(op), "NOT", operand));
        }
        self.compare()
    }

    fn compare(&mut self) -> ParseResult<Expr> {
        let left = self.sum()?;
        match self.eat_operator(COMPARISONS) {
            Some(op) => {
                let right = self.sum()?;
                Ok(binary(self.loc_of(op), &op.text, left, right))
            }
            None => Ok(left),
        }
    }

    fn sum(&mut self) -> ParseResult<Expr> {
        let mut left = self.product()?;
        while let Some(op) = self.eat_operator(&["+", "-"]) {
            let right = self.product()?;
            left = binary(self.loc_of(op), &op.text, left, right);
        }
        Ok(left)
    }

    fn product(&mut self) -> ParseResult<Expr> {
        let mut left = self.power()?;
        while let Some(op) = self.eat_operator(&["*", "/"]) {
            let right = self.power()?;
            left = binary(self.loc_of(op), &op.text, left, right);
        }
        Ok(left)
    }

    fn power(&mut self) -> ParseResult<Expr> {
        let base = self.unary()?;
        match self.eat_operator(&["**"]) {
            Some(op) => {
                let exponent = self.power()?;
                Ok(binary(self.loc_of(op), "**", base, exponent))
            }
            None => Ok(base),
        }
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        match self.eat_operator(&["-", "+"]) {
            Some(op) => {
                let operand = self.unary()?;
                Ok(unary(self.loc_of(op), &op.text, operand))
            }
            None => self.primary(),
        }
    }

    /// A single operand, including qualified names and calls. Also used for
    /// assignment targets.
    pub fn primary(&mut self) -> ParseResult<Expr> {
        let Some(token) = self.peek() else {
            return Err(self.error("expected expression, found end of statement"));
        };
        let loc = self.loc_of(token);
        match token.kind {
            TokenKind::Number | TokenKind::String => {
                self.pos += 1;
                Ok(Expr::new(loc, ExprKind::Literal(token.text.clone())))
            }
            TokenKind::Special => {
                self.pos += 1;
                // *ALL'-'
                let mut text = token.text.clone();
                if let Some(pattern) = self.eat_kind(TokenKind::String) {
                    text.push_str(&pattern.text);
                }
                Ok(Expr::new(loc, ExprKind::Literal(text)))
            }
            TokenKind::LParen => {
                self.pos += 1;
                let inner = self.expr()?;
                self.expect_rparen()?;
                Ok(inner)
            }
            TokenKind::Bif => {
                self.pos += 1;
                let args = if self.eat_kind(TokenKind::LParen).is_some() {
                    self.args()?
                } else {
                    Vec::new()
                };
                Ok(Expr::new(
                    loc,
                    ExprKind::Call {
                        name: token.text.clone(),
                        args,
                    },
                ))
            }
            TokenKind::Ident => {
                self.pos += 1;
                let mut expr = self.name_or_call(loc.clone(), token.text.clone())?;
                while self.eat_kind(TokenKind::Dot).is_some() {
                    let Some(field) = self.eat_kind(TokenKind::Ident) else {
                        return Err(self.error(format!("expected field name after '.', found {}", self.found())));
                    };
                    let qualified = format!("{}.{}", expr.text(), field.text);
                    expr = self.name_or_call(loc.clone(), qualified)?;
                }
                Ok(expr)
            }
            _ => Err(self.error(format!("expected expression, found {}", self.found()))),
        }
    }

    fn name_or_call(&mut self, loc: SourceLocation, name: String) -> ParseResult<Expr> {
        if self.eat_kind(TokenKind::LParen).is_some() {
            let args = self.args()?;
            Ok(Expr::new(loc, ExprKind::Call { name, args }))
        } else {
            Ok(Expr::new(loc, ExprKind::Ident(name)))
        }
    }

    /// Arguments after an opening `(`, through the closing `)`.
    pub fn args(&mut self) -> ParseResult<Vec<Expr>> {
        let mut args = Vec::new();
        if self.eat_kind(TokenKind::RParen).is_some() {
            return Ok(args);
        }
        loop {
            args.push(self.expr()?);
            if self.eat_kind(TokenKind::Colon).is_none() {
                break;
            }
        }
        self.expect_rparen()?;
        Ok(args)
    }

    fn expect_rparen(&mut self) -> ParseResult<()> {
        match self.eat_kind(TokenKind::RParen) {
            Some(_) => Ok(()),
            None => Err(self.error(format!("expected ')', found {}", self.found()))),
        }
    }

    /// `target op expr`, where compound operators expand to
    /// `target = target op expr`.
    pub fn assignment(&mut self) -> ParseResult<(Expr, Expr)> {
        let target = self.primary()?;
        let Some(op) = self.eat_operator(ASSIGN_OPERATORS) else {
            return Err(self.error(format!("expected '=', found {}", self.found())));
        };
        let value = self.expr()?;
        self.finish()?;
        let expr = match op.text.strip_suffix('=').filter(|o| !o.is_empty()) {
            Some(arith) => binary(self.loc_of(op), arith, target.clone(), value),
            None => value,
        };
        Ok((target, expr))
    }

    /// `index = start (TO | DOWNTO) limit [BY step]`, folded into one
    /// condition expression.
    pub fn for_clause(&mut self) -> ParseResult<Expr> {
        let index = self.primary()?;
        let mut clause = match self.eat_operator(&["="]) {
            Some(op) => {
                let start = self.expr()?;
                binary(self.loc_of(op), "=", index, start)
            }
            None => index,
        };
        for keyword in ["TO", "DOWNTO", "BY"] {
            if let Some(token) = self.peek().filter(|t| t.is_ident(keyword)) {
                self.pos += 1;
                let operand = self.expr()?;
                clause = binary(self.loc_of(token), keyword, clause, operand);
            }
        }
        self.finish()?;
        Ok(clause)
    }
}

pub(crate) fn binary(loc: SourceLocation, op: &str, left: Expr, right: Expr) -> Expr {
    Expr::new(
        loc,
        ExprKind::Binary {
            op: op.to_string(),
            left: Box::new(left),
            right: Box::new(right),
        },
    )
}

pub(crate) fn unary(loc: SourceLocation, op: &str, operand: Expr) -> Expr {
    Expr::new(
        loc,
        ExprKind::Unary {
            op: op.to_string(),
            operand: Box::new(operand),
        },
    )
}
