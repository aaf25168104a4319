//! Strict SQL strategy: tokenizer plus recursive descent.
//!
//! ```text
//! script    := { statement [ ';' ] }
//! statement := query | insert | update | delete | create | drop | alter
//! insert    := INSERT INTO name [ '(' names ')' ] ( VALUES rows | query )
//! update    := UPDATE name [ alias ] SET assign { ',' assign } [ WHERE cond ]
//! delete    := DELETE [ FROM ] name [ alias ] [ WHERE cond ]
//! ```
//!
//! Queries, conditions and expressions are in [`query`]; DDL in [`ddl`].
//! A malformed statement is reported and skipped up to the next `;`, so
//! one pass reports every bad statement. SET, COMMIT and the other
//! statements with no tree representation are skipped with a warning.

mod ddl;
mod lexer;
mod query;

use ibmi_lang_core::{
    normalize_line_endings, Diagnostic, LineIndex, ParseStrategy, QuoteTracker, Severity, SourceLocation,
};

use crate::ast::{DeleteStmt, InsertStmt, Script, SelectStmt, Statement, TableRef, UpdateStmt};
use lexer::{tokenize, Token, TokenKind};

/// Statements accepted but not represented in the tree.
const SKIPPED_STATEMENTS: &[&str] = &["SET", "COMMIT", "ROLLBACK", "CALL", "GRANT", "COMMENT", "LABEL"];

/// Words that end an expression or table reference and so can never be an
/// unquoted alias.
const RESERVED: &[&str] = &[
    "ALL", "AND", "AS", "ASC", "BETWEEN", "BY", "CASE", "CROSS", "DESC", "DISTINCT", "ELSE", "END",
    "EXCEPT", "EXCEPTION", "EXISTS", "FETCH", "FOR", "FROM", "FULL", "GROUP", "HAVING", "IN", "INNER",
    "INTERSECT", "INTO", "IS", "JOIN", "LEFT", "LIKE", "LIMIT", "NOT", "OFFSET", "ON", "OPTIMIZE", "OR",
    "ORDER", "OUTER", "RIGHT", "SELECT", "SET", "THEN", "UNION", "USING", "VALUES", "WHEN", "WHERE",
    "WITH",
];

/// Isolation levels accepted in a trailing `WITH` clause.
const ISOLATION_LEVELS: &[&str] = &["NC", "UR", "CS", "RS", "RR", "CHG", "NONE", "ALL"];

#[derive(Debug, Clone, PartialEq, Eq)]
struct SyntaxError {
    offset: u32,
    message: String,
}

type ParseResult<T> = Result<T, SyntaxError>;

/// The grammar-driven DB2 strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrammarParser;

impl ParseStrategy for GrammarParser {
    type Ast = Script;

    fn name(&self) -> &'static str {
        "db2-grammar"
    }

    fn parse(&self, text: &str, file: &str) -> (Script, Vec<Diagnostic>) {
        let text = normalize_line_endings(text);
        let (tokens, lex_errors) = tokenize(&text);
        let mut script = Script::empty(file);
        let mut parser = Parser {
            src: &text,
            tokens,
            pos: 0,
            file: script.loc.clone(),
            index: LineIndex::new(&text),
            nested: Vec::new(),
            diagnostics: Vec::new(),
        };
        for err in lex_errors {
            parser.report(err.offset, Severity::Error, err.message);
        }
        script.statements = parser.script();
        (script, parser.diagnostics)
    }
}

struct Parser<'s> {
    src: &'s str,
    tokens: Vec<Token>,
    pos: usize,
    file: SourceLocation,
    index: LineIndex,
    /// One frame per query being parsed; nested queries land in the top frame.
    nested: Vec<Vec<SelectStmt>>,
    diagnostics: Vec<Diagnostic>,
}

/// Saved parser position for backtracking.
#[derive(Debug, Clone, Copy)]
struct Mark {
    pos: usize,
    nested: usize,
}

impl<'s> Parser<'s> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn nth(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.pos + n)
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek_kind() == Some(kind)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        self.peek().is_some_and(|t| t.is_keyword(keyword))
    }

    fn nth_is_keyword(&self, n: usize, keyword: &str) -> bool {
        self.nth(n).is_some_and(|t| t.is_keyword(keyword))
    }

    fn at_any_keyword(&self, keywords: &[&str]) -> bool {
        self.peek()
            .is_some_and(|t| t.kind == TokenKind::Ident && keywords.contains(&t.text.as_str()))
    }

    fn at_operator(&self, op: &str) -> bool {
        self.peek().is_some_and(|t| t.kind == TokenKind::Operator && t.text == op)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        let found = self.at(kind);
        if found {
            self.pos += 1;
        }
        found
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        let found = self.at_keyword(keyword);
        if found {
            self.pos += 1;
        }
        found
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> ParseResult<Token> {
        if self.at(kind) {
            self.advance().ok_or_else(|| self.unexpected(what))
        } else {
            Err(self.unexpected(what))
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> ParseResult<Token> {
        if self.at_keyword(keyword) {
            self.advance().ok_or_else(|| self.unexpected(keyword))
        } else {
            Err(self.unexpected(keyword))
        }
    }

    /// "expected X, found Y" at the current token.
    fn unexpected(&self, expected: &str) -> SyntaxError {
        match self.peek() {
            Some(token) => SyntaxError {
                offset: token.start,
                message: format!("expected {expected}, found '{}'", token.text),
            },
            None => SyntaxError {
                offset: self.src.len() as u32,
                message: format!("expected {expected}, found end of input"),
            },
        }
    }

    fn mark(&self) -> Mark {
        Mark {
            pos: self.pos,
            nested: self.nested.last().map_or(0, Vec::len),
        }
    }

    fn reset(&mut self, mark: Mark) {
        self.pos = mark.pos;
        if let Some(frame) = self.nested.last_mut() {
            frame.truncate(mark.nested);
        }
    }

    /// End offset of the last consumed token.
    fn prev_end(&self) -> u32 {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map_or(0, |t| t.end)
    }

    fn loc(&self, offset: u32) -> SourceLocation {
        let (line, column) = self.index.line_col(offset);
        self.file.at(line, column)
    }

    fn report(&mut self, offset: u32, severity: Severity, message: impl Into<String>) {
        let loc = self.loc(offset);
        self.diagnostics.push(Diagnostic::at(&loc, severity, message));
    }

    /// Source text of `start..end` with whitespace runs outside quotes
    /// collapsed to one blank.
    fn text(&self, start: u32, end: u32) -> String {
        let raw = self.src.get(start as usize..end as usize).unwrap_or("");
        let mut out = String::with_capacity(raw.len());
        let mut quotes = QuoteTracker::new();
        let mut pending_space = false;
        for c in raw.chars() {
            if !quotes.step(c) && c.is_whitespace() {
                pending_space = !out.is_empty();
                continue;
            }
            if pending_space {
                out.push(' ');
                pending_space = false;
            }
            out.push(c);
        }
        out
    }

    /// Source text of `start..end` exactly as written.
    fn raw_text(&self, start: u32, end: u32) -> String {
        self.src
            .get(start as usize..end as usize)
            .unwrap_or("")
            .trim()
            .to_string()
    }

    fn script(&mut self) -> Vec<Statement> {
        let mut statements = Vec::new();
        loop {
            while self.eat(TokenKind::Semicolon) {}
            if self.at_end() {
                break;
            }
            match self.statement() {
                Ok(Some(statement)) => statements.push(statement),
                Ok(None) => {}
                Err(err) => {
                    self.report(err.offset, Severity::Error, err.message);
                    self.skip_statement();
                }
            }
        }
        statements
    }

    /// Skip to the next `;` without consuming it.
    fn skip_statement(&mut self) {
        while !self.at_end() && !self.at(TokenKind::Semicolon) {
            self.pos += 1;
        }
    }

    fn statement(&mut self) -> ParseResult<Option<Statement>> {
        let Some(token) = self.peek().cloned() else {
            return Ok(None);
        };
        let statement = match (token.kind, token.text.as_str()) {
            (TokenKind::Ident, "SELECT" | "WITH") | (TokenKind::LParen, _) => Statement::Select(self.query()?),
            (TokenKind::Ident, "INSERT") => Statement::Insert(self.insert()?),
            (TokenKind::Ident, "UPDATE") => Statement::Update(self.update()?),
            (TokenKind::Ident, "DELETE") => Statement::Delete(self.delete()?),
            (TokenKind::Ident, "CREATE") => Statement::Ddl(self.create()?),
            (TokenKind::Ident, "DROP" | "ALTER" | "RENAME") => Statement::Ddl(self.other_ddl()?),
            (TokenKind::Ident, keyword) if SKIPPED_STATEMENTS.contains(&keyword) => {
                self.report(token.start, Severity::Warning, format!("{keyword} statement skipped"));
                self.skip_statement();
                return Ok(None);
            }
            _ => return Err(self.unexpected("SQL statement")),
        };
        if !self.at_end() && !self.at(TokenKind::Semicolon) {
            return Err(self.unexpected("';'"));
        }
        Ok(Some(statement))
    }

    /// An unquoted or delimited identifier, without quotes.
    fn name(&mut self) -> ParseResult<(String, u32)> {
        match self.peek() {
            Some(t) if t.kind == TokenKind::Ident => {
                let text = t.text.clone();
                let start = t.start;
                self.pos += 1;
                Ok((text, start))
            }
            Some(t) if t.kind == TokenKind::QuotedIdent => {
                let text = t.text[1..t.text.len() - 1].replace("\"\"", "\"");
                let start = t.start;
                self.pos += 1;
                Ok((text, start))
            }
            _ => Err(self.unexpected("name")),
        }
    }

    fn at_name(&self) -> bool {
        matches!(self.peek_kind(), Some(TokenKind::Ident | TokenKind::QuotedIdent))
    }

    /// `name { '.' name }` or system-naming `lib/name`. Unquoted parts are
    /// upper-cased, delimited parts keep their quotes.
    fn qualified_name(&mut self) -> ParseResult<(String, u32)> {
        if !self.at_name() {
            return Err(self.unexpected("name"));
        }
        let first = &self.tokens[self.pos];
        let (start, mut text) = (first.start, first.text.clone());
        self.pos += 1;
        loop {
            let dot = self.at(TokenKind::Dot);
            let slash = self.at_operator("/") && self.touches_neighbours();
            let Some(part) = self
                .nth(1)
                .filter(|t| (dot || slash) && matches!(t.kind, TokenKind::Ident | TokenKind::QuotedIdent))
            else {
                break;
            };
            text.push(if dot { '.' } else { '/' });
            text.push_str(&part.text);
            self.pos += 2;
        }
        Ok((text, start))
    }

    /// The current token is glued to both the previous and the next token.
    fn touches_neighbours(&self) -> bool {
        let (Some(prev), Some(cur), Some(next)) = (
            self.pos.checked_sub(1).and_then(|i| self.tokens.get(i)),
            self.peek(),
            self.nth(1),
        ) else {
            return false;
        };
        prev.end == cur.start && cur.end == next.start
    }

    /// `[AS] alias`, where a bare alias must not be a reserved word.
    fn alias(&mut self) -> ParseResult<Option<String>> {
        if self.eat_keyword("AS") {
            return self.name().map(|(name, _)| Some(name));
        }
        match self.peek() {
            Some(t) if t.kind == TokenKind::QuotedIdent => self.name().map(|(name, _)| Some(name)),
            Some(t) if t.kind == TokenKind::Ident && !RESERVED.contains(&t.text.as_str()) => {
                self.name().map(|(name, _)| Some(name))
            }
            _ => Ok(None),
        }
    }

    fn table_ref(&mut self, with_alias: bool) -> ParseResult<TableRef> {
        let (qualified, start) = self.qualified_name()?;
        let alias = if with_alias { self.alias()? } else { None };
        Ok(TableRef::from_qualified(self.loc(start), &qualified, alias))
    }

    /// `'(' name { ',' name } ')'`.
    fn name_list(&mut self) -> ParseResult<Vec<String>> {
        self.expect(TokenKind::LParen, "'('")?;
        let mut names = Vec::new();
        loop {
            names.push(self.name()?.0);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen, "')'")?;
        Ok(names)
    }

    /// Trailing `WITH NC|UR|CS|RS|RR` isolation clause.
    fn isolation_clause(&mut self) {
        if self.at_keyword("WITH") && self.nth(1).is_some_and(|t| ISOLATION_LEVELS.contains(&t.text.as_str())) {
            self.pos += 2;
            if self.at_keyword("USE") {
                // USE AND KEEP EXCLUSIVE LOCKS
                while self.at(TokenKind::Ident) {
                    self.pos += 1;
                }
            }
        }
    }

    fn insert(&mut self) -> ParseResult<InsertStmt> {
        let start = self.expect_keyword("INSERT")?.start;
        self.expect_keyword("INTO")?;
        let table = self.table_ref(false)?;
        let mut stmt = InsertStmt {
            loc: self.loc(start),
            table,
            columns: Vec::new(),
            values: Vec::new(),
            select: None,
        };
        if self.at(TokenKind::LParen) && !self.nth(1).is_some_and(|t| t.is_keyword("SELECT") || t.is_keyword("WITH")) {
            stmt.columns = self.name_list()?;
        }
        if self.eat_keyword("OVERRIDING") {
            self.pos += 1;
            self.expect_keyword("VALUE")?;
        }

        if self.eat_keyword("VALUES") {
            loop {
                stmt.values.push(self.values_row()?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        } else if self.at_any_keyword(&["SELECT", "WITH"]) || self.at(TokenKind::LParen) {
            stmt.select = Some(Box::new(self.query()?));
        } else {
            return Err(self.unexpected("VALUES or a query"));
        }
        self.isolation_clause();
        Ok(stmt)
    }

    fn values_row(&mut self) -> ParseResult<Vec<String>> {
        let is_row = self.at(TokenKind::LParen)
            && !self.nth(1).is_some_and(|t| t.is_keyword("SELECT") || t.is_keyword("WITH"));
        if !is_row {
            let value = self.expr()?;
            return Ok(vec![self.text(value.start, value.end)]);
        }
        self.pos += 1;
        let mut row = Vec::new();
        loop {
            let value = self.expr()?;
            row.push(self.text(value.start, value.end));
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen, "')'")?;
        Ok(row)
    }

    fn update(&mut self) -> ParseResult<UpdateStmt> {
        let start = self.expect_keyword("UPDATE")?.start;
        let table = self.table_ref(true)?;
        self.expect_keyword("SET")?;
        let mut set_clauses = Vec::new();
        loop {
            if self.at(TokenKind::LParen) {
                let columns = self.name_list()?.join(", ");
                self.expect_operator("=")?;
                let value = self.expr()?;
                set_clauses.push((columns, self.text(value.start, value.end)));
            } else {
                let (column, _) = self.qualified_name()?;
                self.expect_operator("=")?;
                let value = self.expr()?;
                set_clauses.push((column, self.text(value.start, value.end)));
            }
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        let where_clause = self.where_clause()?;
        self.isolation_clause();
        Ok(UpdateStmt {
            loc: self.loc(start),
            table,
            set_clauses,
            where_clause,
        })
    }

    fn delete(&mut self) -> ParseResult<DeleteStmt> {
        let start = self.expect_keyword("DELETE")?.start;
        self.eat_keyword("FROM");
        let table = self.table_ref(true)?;
        let where_clause = self.where_clause()?;
        self.isolation_clause();
        Ok(DeleteStmt {
            loc: self.loc(start),
            table,
            where_clause,
        })
    }

    fn expect_operator(&mut self, op: &str) -> ParseResult<()> {
        if self.at_operator(op) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{op}'")))
        }
    }
}
