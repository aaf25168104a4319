//! Data definition statements.
//!
//! ```text
//! create  := CREATE [OR REPLACE] ( table | view | index | object )
//! table   := TABLE name ( '(' element { ',' element } ')' | AS '(' query ')' ... | LIKE name )
//! element := column-def | [CONSTRAINT name] (PRIMARY KEY | UNIQUE | FOREIGN KEY | CHECK) ...
//! view    := VIEW name [ '(' names ')' ] AS query [ WITH ... CHECK OPTION ]
//! index   := [UNIQUE [WHERE NOT NULL]] [ENCODED VECTOR] INDEX name ON name '(' ... ')'
//! ```
//!
//! Anything past the parts the tree records (table options, routine
//! bodies, ALTER actions) is skipped to the end of the statement.

use crate::ast::{ColumnDef, DdlKind, DdlStmt, TableRef};

use super::lexer::TokenKind;
use super::{ParseResult, Parser};

/// Words naming the object type after CREATE, DROP, ALTER or RENAME.
const OBJECT_TYPES: &[&str] = &[
    "TABLE", "VIEW", "INDEX", "ALIAS", "SEQUENCE", "SCHEMA", "COLLECTION", "PROCEDURE", "FUNCTION",
    "TRIGGER", "VARIABLE", "TYPE", "DISTINCT", "MASK", "PERMISSION", "SPECIFIC", "UNIQUE", "ENCODED",
    "VECTOR", "GLOBAL", "TEMPORARY",
];

/// Object types whose statement may carry a `BEGIN ... END` body.
const ROUTINES: &[&str] = &["PROCEDURE", "FUNCTION", "TRIGGER"];

/// Table elements that are constraints rather than columns.
const CONSTRAINT_STARTS: &[&str] = &["CONSTRAINT", "PRIMARY", "UNIQUE", "FOREIGN", "CHECK", "PERIOD"];

/// Words that start a new clause in a column definition.
const COLUMN_CLAUSES: &[&str] = &[
    "NOT", "NULL", "DEFAULT", "PRIMARY", "UNIQUE", "REFERENCES", "CHECK", "CONSTRAINT", "GENERATED",
    "WITH", "FOR", "CCSID", "ALLOCATE", "IMPLICITLY",
];

/// Ends of SQL PL compound statements that do not close a `BEGIN`.
const COMPOUND_ENDS: &[&str] = &["IF", "WHILE", "LOOP", "FOR", "REPEAT"];

impl<'s> Parser<'s> {
    pub(super) fn create(&mut self) -> ParseResult<DdlStmt> {
        let start = self.expect_keyword("CREATE")?.start;
        if self.eat_keyword("OR") {
            self.expect_keyword("REPLACE")?;
        }
        let mut ddl = if self.eat_keyword("TABLE") {
            self.create_table(start)?
        } else if self.eat_keyword("VIEW") {
            self.create_view(start)?
        } else if self.at_any_keyword(&["UNIQUE", "ENCODED", "INDEX"]) {
            self.create_index(start)?
        } else {
            return self.object_ddl(start);
        };
        ddl.body = self.raw_text(start, self.prev_end());
        Ok(ddl)
    }

    fn create_table(&mut self, start: u32) -> ParseResult<DdlStmt> {
        let (name, _) = self.qualified_name()?;
        let mut ddl = DdlStmt::new(self.loc(start), DdlKind::Table, &name, "");

        if self.eat_keyword("AS") {
            self.expect(TokenKind::LParen, "'('")?;
            ddl.query = Some(Box::new(self.query()?));
            self.expect(TokenKind::RParen, "')'")?;
        } else if self.eat_keyword("LIKE") {
            let (source, at) = self.qualified_name()?;
            ddl.on_table = Some(TableRef::from_qualified(self.loc(at), &source, None));
        } else {
            self.expect(TokenKind::LParen, "'('")?;
            loop {
                if self.at_any_keyword(CONSTRAINT_STARTS) {
                    self.skip_element()?;
                } else {
                    ddl.columns.push(self.column_def()?);
                }
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::RParen, "')'")?;
        }
        self.skip_rest(false)?;
        Ok(ddl)
    }

    fn column_def(&mut self) -> ParseResult<ColumnDef> {
        let (name, start) = self.name()?;
        let data_type = self.data_type()?;
        let mut constraints: Vec<String> = Vec::new();
        let mut clause_start: Option<u32> = None;
        let mut prev_word = String::new();
        let mut depth = 0usize;

        loop {
            let Some(token) = self.peek().cloned() else {
                break;
            };
            match token.kind {
                TokenKind::Comma | TokenKind::RParen if depth == 0 => break,
                TokenKind::Semicolon => break,
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => depth -= 1,
                TokenKind::Ident if depth == 0 => {
                    let continues = matches!(
                        (prev_word.as_str(), token.text.as_str()),
                        ("NOT", "NULL") | ("WITH", "DEFAULT") | ("DEFAULT", "NULL")
                    );
                    if COLUMN_CLAUSES.contains(&token.text.as_str()) && !continues {
                        if let Some(from) = clause_start {
                            constraints.push(self.text(from, self.prev_end()));
                        }
                        clause_start = Some(token.start);
                    }
                }
                _ => {}
            }
            if token.kind == TokenKind::Ident {
                prev_word = token.text.clone();
            }
            self.pos += 1;
        }
        if let Some(from) = clause_start {
            constraints.push(self.text(from, self.prev_end()));
        }
        let nullable = !constraints.iter().any(|c| c.to_ascii_uppercase().starts_with("NOT NULL"));
        Ok(ColumnDef {
            loc: self.loc(start),
            name,
            data_type,
            nullable,
            constraints,
        })
    }

    /// Skip a table constraint up to the next `,` or `)` at its level.
    fn skip_element(&mut self) -> ParseResult<()> {
        loop {
            match self.peek_kind() {
                None | Some(TokenKind::Comma | TokenKind::RParen | TokenKind::Semicolon) => return Ok(()),
                Some(TokenKind::LParen) => self.skip_parenthesized()?,
                Some(_) => self.pos += 1,
            }
        }
    }

    fn create_view(&mut self, start: u32) -> ParseResult<DdlStmt> {
        let (name, _) = self.qualified_name()?;
        let mut ddl = DdlStmt::new(self.loc(start), DdlKind::View, &name, "");
        if self.at(TokenKind::LParen) {
            self.name_list()?;
        }
        self.expect_keyword("AS")?;
        ddl.query = Some(Box::new(self.query()?));
        if self.eat_keyword("WITH") {
            while self.at_any_keyword(&["CASCADED", "LOCAL", "CHECK", "OPTION"]) {
                self.pos += 1;
            }
        }
        self.skip_rest(false)?;
        Ok(ddl)
    }

    fn create_index(&mut self, start: u32) -> ParseResult<DdlStmt> {
        if self.eat_keyword("UNIQUE") && self.eat_keyword("WHERE") {
            self.expect_keyword("NOT")?;
            self.expect_keyword("NULL")?;
        }
        if self.eat_keyword("ENCODED") {
            self.expect_keyword("VECTOR")?;
        }
        self.expect_keyword("INDEX")?;
        let (name, _) = self.qualified_name()?;
        let mut ddl = DdlStmt::new(self.loc(start), DdlKind::Index, &name, "");
        self.expect_keyword("ON")?;
        let (table, at) = self.qualified_name()?;
        ddl.on_table = Some(TableRef::from_qualified(self.loc(at), &table, None));
        self.skip_parenthesized()?;
        self.skip_rest(false)?;
        Ok(ddl)
    }

    /// CREATE of any other object.
    fn object_ddl(&mut self, start: u32) -> ParseResult<DdlStmt> {
        let routine = self.at_any_keyword(ROUTINES);
        if !self.at_any_keyword(OBJECT_TYPES) {
            return Err(self.unexpected("object type"));
        }
        while self.at_any_keyword(OBJECT_TYPES) {
            self.pos += 1;
        }
        let (name, _) = self.qualified_name()?;
        self.skip_rest(routine)?;
        Ok(DdlStmt::new(self.loc(start), DdlKind::Other, &name, self.raw_text(start, self.prev_end())))
    }

    /// DROP, ALTER and RENAME: the object name is recorded, the rest skipped.
    pub(super) fn other_ddl(&mut self) -> ParseResult<DdlStmt> {
        let start = self.advance().map_or(0, |t| t.start);
        if !self.at_any_keyword(OBJECT_TYPES) && !self.at_name() {
            return Err(self.unexpected("object type"));
        }
        while self.at_any_keyword(OBJECT_TYPES) {
            self.pos += 1;
        }
        let (name, _) = self.qualified_name()?;
        self.skip_rest(false)?;
        Ok(DdlStmt::new(self.loc(start), DdlKind::Other, &name, self.raw_text(start, self.prev_end())))
    }

    /// Skip to the end of the statement. Inside a routine, `;` only ends
    /// the statement outside `BEGIN ... END` blocks.
    fn skip_rest(&mut self, routine: bool) -> ParseResult<()> {
        let mut blocks = 0usize;
        while let Some(token) = self.peek().cloned() {
            match token.kind {
                TokenKind::Semicolon if blocks == 0 => return Ok(()),
                TokenKind::LParen => {
                    self.skip_parenthesized()?;
                    continue;
                }
                TokenKind::RParen => return Err(self.unexpected("end of statement")),
                TokenKind::Ident if routine => match token.text.as_str() {
                    "BEGIN" | "CASE" => blocks += 1,
                    "END" if self.nth(1).is_some_and(|t| COMPOUND_ENDS.contains(&t.text.as_str())) => {
                        self.pos += 1;
                    }
                    "END" => {
                        blocks = blocks.saturating_sub(1);
                        if self.nth_is_keyword(1, "CASE") {
                            self.pos += 1;
                        }
                    }
                    _ => {}
                },
                _ => {}
            }
            self.pos += 1;
        }
        Ok(())
    }
}
