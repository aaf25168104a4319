//! Free-form statements.
//!
//! Each `;`-terminated statement is dispatched on its leading opcode.
//! Declarations that span several statements (`DCL-DS … END-DS`,
//! `DCL-PR … END-PR`, `DCL-PI … END-PI`) switch the parser into a
//! declaration context until their terminator.

use ibmi_lang_core::{Diagnostic, Severity, SourceLocation};

use super::blocks::{BlockBuilder, BlockError, Closer, Group};
use super::expr::{Cursor, Locator, ParseResult, SyntaxError, ASSIGN_OPERATORS};
use super::lexer::{tokenize, Token, TokenKind};
use crate::ast::{ExprKind, LoopKind, Param, Procedure, Program, Statement, VarDecl};
use crate::sql::embedded_sql;

/// Valid operations with no AST counterpart.
pub(super) const UNMODELED_OPCODES: &[&str] = &[
    "ACQ", "CHAIN", "CLEAR", "CLOSE", "COMMIT", "DATA-GEN", "DATA-INTO", "DEALLOC", "DELETE",
    "DSPLY", "DUMP", "EXFMT", "FEOD", "FORCE", "IN", "ITER", "LEAVE", "LEAVESR", "NEXT", "OPEN",
    "OUT", "POST", "READ", "READC", "READE", "READP", "READPE", "REL", "RESET", "ROLBK", "SETGT",
    "SETLL", "SORTA", "TEST", "UNLOCK", "UPDATE", "WRITE", "XML-INTO", "XML-SAX",
];

/// Data type keywords of a free-form declaration.
const TYPE_KEYWORDS: &[&str] = &[
    "CHAR", "VARCHAR", "GRAPH", "VARGRAPH", "UCS2", "VARUCS2", "IND", "PACKED", "ZONED", "BINDEC",
    "INT", "UNS", "FLOAT", "DATE", "TIME", "TIMESTAMP", "POINTER", "OBJECT", "LIKE", "LIKEDS",
    "LIKEREC",
];

/// Operation extender letters, as in `CALLP(E)` or `EVAL(H)`.
const EXTENDER_LETTERS: &str = "ADEHMNPRTZ";

#[derive(Debug)]
enum DeclContext {
    DataStructure(SourceLocation),
    Prototype(SourceLocation),
    Interface(SourceLocation),
}

/// Parse free-form `src` into `program`. Declarations, procedures and SQL
/// are added to `program` directly; the main-line statements are returned
/// so a caller embedding a free-form region can place them.
pub(super) fn parse_free(
    program: &mut Program,
    src: &str,
    locator: &Locator,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<Statement> {
    let (tokens, lex_errors) = tokenize(src);
    for err in lex_errors {
        diagnostics.push(Diagnostic::at(&locator.loc(err.offset), Severity::Error, err.message));
    }

    let mut parser = FreeParser {
        program,
        diagnostics,
        src,
        locator,
        main: BlockBuilder::new(),
        procedure: None,
        decl: None,
    };

    let mut start = 0;
    while start < tokens.len() {
        if tokens[start].kind == TokenKind::Sql {
            parser.sql(&tokens[start]);
            start += 1;
            continue;
        }
        let end = tokens[start..]
            .iter()
            .position(|t| matches!(t.kind, TokenKind::Semicolon | TokenKind::Sql))
            .map_or(tokens.len(), |p| start + p);
        if tokens.get(end).map(|t| t.kind) != Some(TokenKind::Semicolon) {
            let offset = tokens[end - 1].end;
            parser.report(offset, Severity::Error, "missing ';' after statement");
        }
        parser.statement(&tokens[start..end]);
        start = if tokens.get(end).is_some_and(|t| t.kind == TokenKind::Semicolon) {
            end + 1
        } else {
            end
        };
    }

    parser.finish()
}

struct FreeParser<'p> {
    program: &'p mut Program,
    diagnostics: &'p mut Vec<Diagnostic>,
    src: &'p str,
    locator: &'p Locator,
    main: BlockBuilder,
    procedure: Option<(Procedure, BlockBuilder)>,
    decl: Option<DeclContext>,
}

/// Type and keywords following a declared name.
#[derive(Debug, Default)]
struct DeclTail {
    data_type: Option<String>,
    length: Option<u32>,
    decimals: Option<u32>,
    /// Keyword name and raw parenthesized argument text.
    keywords: Vec<(String, Option<String>)>,
}

impl DeclTail {
    fn keyword(&self, name: &str) -> Option<&(String, Option<String>)> {
        self.keywords.iter().find(|(k, _)| k == name)
    }
}

fn syntax(token: &Token, message: impl Into<String>) -> SyntaxError {
    SyntaxError {
        offset: token.start,
        message: message.into(),
    }
}

fn block_result(token: &Token, result: Result<(), BlockError>) -> ParseResult<()> {
    result.map_err(|message| syntax(token, message))
}

/// Operands after an opcode and its optional extender.
fn operands(tokens: &[Token]) -> &[Token] {
    match tokens {
        [op, open, ext, close, rest @ ..]
            if open.kind == TokenKind::LParen
                && open.start == op.end
                && ext.kind == TokenKind::Ident
                && ext.text.chars().all(|c| EXTENDER_LETTERS.contains(c))
                && close.kind == TokenKind::RParen =>
        {
            rest
        }
        [_, rest @ ..] => rest,
        [] => tokens,
    }
}

/// An assignment operator outside parentheses.
fn has_top_level_assignment(tokens: &[Token]) -> bool {
    let mut depth = 0i32;
    tokens.iter().any(|t| {
        match t.kind {
            TokenKind::LParen => depth += 1,
            TokenKind::RParen => depth -= 1,
            _ => {}
        }
        depth == 0 && t.kind == TokenKind::Operator && ASSIGN_OPERATORS.contains(&t.text.as_str())
    })
}

fn contains_ident(tokens: &[Token], text: &str) -> bool {
    tokens.iter().any(|t| t.is_ident(text))
}

/// Length and decimals from `(len[:dec])` arguments.
fn length_args(args: &str) -> (Option<u32>, Option<u32>) {
    let mut parts = args.split(':').map(|p| p.trim().parse::<u32>().ok());
    (parts.next().flatten(), parts.next().flatten())
}

impl<'p> FreeParser<'p> {
    fn report(&mut self, offset: u32, severity: Severity, message: impl Into<String>) {
        let loc = self.locator.loc(offset);
        self.diagnostics.push(Diagnostic::at(&loc, severity, message));
    }

    fn builder(&mut self) -> &mut BlockBuilder {
        match &mut self.procedure {
            Some((_, builder)) => builder,
            None => &mut self.main,
        }
    }

    fn push(&mut self, token: &Token, stmt: Statement) -> ParseResult<()> {
        let result = self.builder().push(stmt);
        block_result(token, result)
    }

    fn sql(&mut self, token: &Token) {
        let sql = embedded_sql(self.locator.loc(token.start), &token.text);
        if self.procedure.is_some() || self.builder().depth() > 0 {
            if let Err(err) = self.push(token, Statement::EmbeddedSql(sql.clone())) {
                self.report(err.offset, Severity::Error, err.message);
            }
        }
        self.program.sql_statements.push(sql);
    }

    fn statement(&mut self, tokens: &[Token]) {
        let Some(first) = tokens.first() else {
            return;
        };
        let loc = self.locator.loc(first.start);
        if let Err(err) = self.dispatch(tokens, loc) {
            self.report(err.offset, Severity::Error, err.message);
        }
    }

    fn dispatch(&mut self, tokens: &[Token], loc: SourceLocation) -> ParseResult<()> {
        let first = &tokens[0];
        let terminator = match &self.decl {
            Some(DeclContext::DataStructure(_)) => Some("END-DS"),
            Some(DeclContext::Prototype(_)) => Some("END-PR"),
            Some(DeclContext::Interface(_)) => Some("END-PI"),
            None => None,
        };
        if let Some(terminator) = terminator {
            if first.is_ident(terminator) {
                self.decl = None;
                return Ok(());
            }
            return match terminator {
                "END-DS" => self.subfield(tokens, loc),
                "END-PI" => self.interface_param(tokens, loc),
                _ => Ok(()),
            };
        }

        if tokens.get(1).is_some_and(|t| {
            t.kind == TokenKind::Operator && ASSIGN_OPERATORS.contains(&t.text.as_str())
        }) {
            return self.assignment(tokens, loc);
        }

        let opcode = match first.kind {
            TokenKind::Ident => first.text.as_str(),
            _ => "",
        };
        let mut cursor = Cursor::new(operands(tokens), self.locator);
        match opcode {
            "CTL-OPT" | "DCL-F" => Ok(()),
            "DCL-S" => self.dcl_s(tokens, loc),
            "DCL-C" => self.dcl_c(tokens, loc),
            "DCL-DS" => self.dcl_ds(tokens, loc),
            "DCL-PR" => {
                if !contains_ident(tokens, "END-PR") {
                    self.decl = Some(DeclContext::Prototype(loc));
                }
                Ok(())
            }
            "DCL-PI" => self.dcl_pi(tokens, loc),
            "DCL-PROC" => self.dcl_proc(tokens, loc),
            "END-PROC" => self.end_proc(first),
            "END-DS" | "END-PR" | "END-PI" => {
                Err(syntax(first, format!("{opcode} without a matching declaration")))
            }
            "IF" => {
                let condition = condition(&mut cursor)?;
                self.builder().open_if(loc, condition);
                Ok(())
            }
            "ELSEIF" => {
                let condition = condition(&mut cursor)?;
                let result = self.builder().else_if(loc, condition);
                block_result(first, result)
            }
            "ELSE" => {
                cursor.finish()?;
                let result = self.builder().else_branch();
                block_result(first, result)
            }
            "SELECT" => {
                cursor.finish()?;
                self.builder().open_select(loc);
                Ok(())
            }
            "WHEN" => {
                let condition = condition(&mut cursor)?;
                let result = self.builder().when(loc, condition);
                block_result(first, result)
            }
            "OTHER" => {
                cursor.finish()?;
                let result = self.builder().other();
                block_result(first, result)
            }
            "DOW" | "DOU" => {
                let condition = condition(&mut cursor)?;
                let kind = if opcode == "DOW" { LoopKind::Dow } else { LoopKind::Dou };
                self.builder().open_loop(loc, kind, Some(condition));
                Ok(())
            }
            "FOR" => {
                let clause = cursor.for_clause()?;
                self.builder().open_loop(loc, LoopKind::For, Some(clause));
                Ok(())
            }
            "MONITOR" => {
                cursor.finish()?;
                self.builder().open_group(loc, Group::Monitor);
                Ok(())
            }
            "ON-ERROR" => {
                let result = self.builder().on_error();
                block_result(first, result)
            }
            "BEGSR" => {
                self.builder().open_group(loc, Group::Subroutine);
                Ok(())
            }
            "ENDIF" => self.close(first, Closer::EndIf),
            "ENDSL" => self.close(first, Closer::EndSl),
            "ENDDO" => self.close(first, Closer::EndDo),
            "ENDFOR" => self.close(first, Closer::EndFor),
            "ENDMON" => self.close(first, Closer::EndMon),
            "ENDSR" => self.close(first, Closer::EndSr),
            "RETURN" => {
                let value = if cursor.at_end() {
                    None
                } else {
                    Some(cursor.expr()?)
                };
                cursor.finish()?;
                self.push(first, Statement::Return { loc, value })
            }
            "CALLP" => {
                let callee = cursor.primary()?;
                cursor.finish()?;
                let stmt = call_statement(first, loc, callee.kind)?;
                self.push(first, stmt)
            }
            "EXSR" => {
                let Some(name) = cursor.advance().filter(|t| t.kind == TokenKind::Ident) else {
                    return Err(cursor.error("expected subroutine name after EXSR"));
                };
                cursor.finish()?;
                let stmt = Statement::Call {
                    loc,
                    name: name.text.clone(),
                    args: Vec::new(),
                };
                self.push(first, stmt)
            }
            "EVAL" | "EVALR" | "EVAL-CORR" => {
                let (target, expr) = cursor.assignment()?;
                self.push(first, Statement::Assign { loc, target, expr })
            }
            op if UNMODELED_OPCODES.contains(&op) => Ok(()),
            _ => self.generic(tokens, loc),
        }
    }

    fn close(&mut self, token: &Token, closer: Closer) -> ParseResult<()> {
        let result = self.builder().close(closer);
        block_result(token, result)
    }

    fn assignment(&mut self, tokens: &[Token], loc: SourceLocation) -> ParseResult<()> {
        let mut cursor = Cursor::new(tokens, self.locator);
        let (target, expr) = cursor.assignment()?;
        self.push(&tokens[0], Statement::Assign { loc, target, expr })
    }

    /// Assignments to array elements or qualified targets, bare procedure
    /// calls, and anything unrecognized.
    fn generic(&mut self, tokens: &[Token], loc: SourceLocation) -> ParseResult<()> {
        let first = &tokens[0];
        if has_top_level_assignment(tokens) {
            return self.assignment(tokens, loc);
        }
        if first.kind == TokenKind::Ident && tokens.get(1).is_some_and(|t| t.kind == TokenKind::LParen) {
            let mut cursor = Cursor::new(tokens, self.locator);
            let callee = cursor.primary()?;
            cursor.finish()?;
            let stmt = call_statement(first, loc, callee.kind)?;
            return self.push(first, stmt);
        }
        self.report(
            first.start,
            Severity::Warning,
            format!("unrecognized statement '{}' skipped", first.text),
        );
        Ok(())
    }

    /// Declared name at `tokens[1]`: an identifier or `*N`.
    fn decl_name<'t>(&self, tokens: &'t [Token]) -> ParseResult<&'t Token> {
        match tokens.get(1) {
            Some(t) if matches!(t.kind, TokenKind::Ident | TokenKind::Special) => Ok(t),
            Some(t) => Err(syntax(t, format!("expected name after {}, found '{}'", tokens[0].text, t.text))),
            None => Err(syntax(&tokens[0], format!("expected name after {}", tokens[0].text))),
        }
    }

    /// Name of a `DCL-DS`/`DCL-PI` block; the closing keyword cannot stand in for it.
    fn block_name<'t>(&self, tokens: &'t [Token], end: &str) -> ParseResult<&'t Token> {
        let name = self.decl_name(tokens)?;
        if name.is_ident(end) {
            return Err(syntax(name, format!("expected name after {}, found '{}'", tokens[0].text, name.text)));
        }
        Ok(name)
    }

    /// Parse `type[(args)] { keyword[(args)] }` up to the end of `tokens`.
    fn decl_tail(&self, tokens: &[Token]) -> ParseResult<DeclTail> {
        let mut tail = DeclTail::default();
        let mut i = 0;
        while i < tokens.len() {
            let word = &tokens[i];
            if word.kind != TokenKind::Ident {
                return Err(syntax(word, format!("unexpected '{}' in declaration", word.text)));
            }
            let mut args = None;
            i += 1;
            if tokens.get(i).is_some_and(|t| t.kind == TokenKind::LParen) {
                let open = &tokens[i];
                let close = matching_paren(tokens, i)
                    .ok_or_else(|| syntax(open, format!("missing ')' for {}", word.text)))?;
                let raw = self.src[open.end as usize..tokens[close].start as usize].trim();
                args = Some(raw.to_string());
                i = close + 1;
            }

            let keyword = word.text.as_str();
            if tail.data_type.is_none() && tail.keywords.is_empty() && TYPE_KEYWORDS.contains(&keyword) {
                match &args {
                    Some(a) if keyword.starts_with("LIKE") => {
                        tail.data_type = Some(format!("{keyword}({})", a.to_ascii_uppercase()));
                    }
                    Some(a) => {
                        let (length, decimals) = length_args(a);
                        tail.length = length;
                        tail.decimals = decimals;
                        tail.data_type = Some(keyword.to_string());
                    }
                    None => tail.data_type = Some(keyword.to_string()),
                }
            } else {
                tail.keywords.push((keyword.to_string(), args));
            }
        }
        Ok(tail)
    }

    fn var_decl(&self, name: &Token, tail: DeclTail, loc: SourceLocation) -> VarDecl {
        let inz = tail.keyword("INZ").and_then(|(_, args)| args.clone());
        VarDecl {
            loc,
            name: name.text.clone(),
            data_type: tail.data_type,
            length: tail.length,
            decimals: tail.decimals,
            inz,
        }
    }

    fn dcl_s(&mut self, tokens: &[Token], loc: SourceLocation) -> ParseResult<()> {
        let name = self.decl_name(tokens)?;
        let tail = self.decl_tail(&tokens[2..])?;
        let decl = self.var_decl(name, tail, loc);
        self.program.variables.push(decl);
        Ok(())
    }

    fn dcl_c(&mut self, tokens: &[Token], loc: SourceLocation) -> ParseResult<()> {
        let name = self.decl_name(tokens)?;
        let value = &tokens[2..];
        let (Some(first), Some(last)) = (value.first(), value.last()) else {
            return Err(syntax(name, format!("constant {} has no value", name.text)));
        };
        let raw = &self.src[first.start as usize..last.end as usize];
        let raw = match (value.get(1), value.last()) {
            (Some(open), Some(close))
                if first.is_ident("CONST") && open.kind == TokenKind::LParen && close.kind == TokenKind::RParen =>
            {
                self.src[open.end as usize..close.start as usize].trim()
            }
            _ => raw.trim(),
        };
        let mut decl = VarDecl::new(loc, name.text.clone(), Some("CONST".to_string()));
        decl.inz = Some(raw.to_string());
        self.program.variables.push(decl);
        Ok(())
    }

    fn dcl_ds(&mut self, tokens: &[Token], loc: SourceLocation) -> ParseResult<()> {
        let name = self.block_name(tokens, "END-DS")?;
        let (body, inline_end) = inline_body(tokens, "END-DS");
        let tail = self.decl_tail(body)?;
        let is_template_copy = tail
            .data_type
            .as_deref()
            .is_some_and(|t| t.starts_with("LIKEDS") || t.starts_with("LIKEREC"));
        let mut decl = self.var_decl(name, tail, loc.clone());
        decl.data_type.get_or_insert_with(|| "DS".to_string());
        self.program.variables.push(decl);
        if !inline_end && !is_template_copy {
            self.decl = Some(DeclContext::DataStructure(loc));
        }
        Ok(())
    }

    /// Subfield lines inside `DCL-DS`; the `DCL-SUBF` keyword is optional.
    fn subfield(&mut self, tokens: &[Token], loc: SourceLocation) -> ParseResult<()> {
        let tokens = if tokens[0].is_ident("DCL-SUBF") {
            &tokens[1..]
        } else {
            tokens
        };
        let Some(name) = tokens.first().filter(|t| t.kind == TokenKind::Ident) else {
            return Err(syntax(&tokens[0], "expected subfield name"));
        };
        if name.text.starts_with("DCL-") || name.text.starts_with("END-") {
            return Err(syntax(name, format!("{} inside a data structure; missing END-DS", name.text)));
        }
        let tail = self.decl_tail(&tokens[1..])?;
        let decl = self.var_decl(name, tail, loc);
        self.program.variables.push(decl);
        Ok(())
    }

    fn dcl_pi(&mut self, tokens: &[Token], loc: SourceLocation) -> ParseResult<()> {
        self.block_name(tokens, "END-PI")?;
        let (body, inline_end) = inline_body(tokens, "END-PI");
        let tail = self.decl_tail(body)?;
        if let Some((procedure, _)) = self.procedure.as_mut() {
            procedure.returns = tail.data_type;
        }
        if !inline_end {
            self.decl = Some(DeclContext::Interface(loc));
        }
        Ok(())
    }

    /// Parameter lines inside `DCL-PI`; the `DCL-PARM` keyword is optional.
    fn interface_param(&mut self, tokens: &[Token], loc: SourceLocation) -> ParseResult<()> {
        let tokens = if tokens[0].is_ident("DCL-PARM") {
            &tokens[1..]
        } else {
            tokens
        };
        let Some(name) = tokens.first().filter(|t| t.kind == TokenKind::Ident) else {
            return Err(syntax(&tokens[0], "expected parameter name"));
        };
        if name.text.starts_with("DCL-") || name.text.starts_with("END-") {
            return Err(syntax(name, format!("{} inside a procedure interface; missing END-PI", name.text)));
        }
        let tail = self.decl_tail(&tokens[1..])?;
        let passing = ["VALUE", "CONST"]
            .into_iter()
            .find(|k| tail.keyword(k).is_some())
            .map(str::to_string);
        let param = Param {
            loc,
            name: name.text.clone(),
            data_type: tail.data_type,
            passing,
        };
        if let Some((procedure, _)) = self.procedure.as_mut() {
            procedure.params.push(param);
        }
        Ok(())
    }

    fn dcl_proc(&mut self, tokens: &[Token], loc: SourceLocation) -> ParseResult<()> {
        let first = &tokens[0];
        if let Some((open, _)) = &self.procedure {
            return Err(syntax(first, format!("DCL-PROC inside procedure {}", open.name)));
        }
        if self.main.depth() > 0 {
            return Err(syntax(first, "DCL-PROC inside an open block"));
        }
        let Some(name) = tokens.get(1).filter(|t| t.kind == TokenKind::Ident) else {
            return Err(syntax(first, "expected procedure name after DCL-PROC"));
        };
        self.procedure = Some((Procedure::new(loc, name.text.clone()), BlockBuilder::new()));
        Ok(())
    }

    fn end_proc(&mut self, token: &Token) -> ParseResult<()> {
        let Some((procedure, builder)) = self.procedure.take() else {
            return Err(syntax(token, "END-PROC without DCL-PROC"));
        };
        self.close_procedure(procedure, builder);
        Ok(())
    }

    fn close_procedure(&mut self, mut procedure: Procedure, builder: BlockBuilder) {
        let (body, errors) = builder.finish();
        for (loc, message) in errors {
            self.diagnostics.push(Diagnostic::at(&loc, Severity::Error, message));
        }
        procedure.body = body;
        self.program.procedures.push(procedure);
    }

    fn finish(mut self) -> Vec<Statement> {
        if let Some(context) = self.decl.take() {
            let (loc, message) = match context {
                DeclContext::DataStructure(loc) => (loc, "DCL-DS without END-DS"),
                DeclContext::Prototype(loc) => (loc, "DCL-PR without END-PR"),
                DeclContext::Interface(loc) => (loc, "DCL-PI without END-PI"),
            };
            self.diagnostics.push(Diagnostic::at(&loc, Severity::Error, message));
        }
        if let Some((procedure, builder)) = self.procedure.take() {
            let message = format!("procedure {} has no END-PROC", procedure.name);
            self.diagnostics.push(Diagnostic::at(&procedure.loc, Severity::Error, message));
            self.close_procedure(procedure, builder);
        }
        let main = std::mem::take(&mut self.main);
        let (body, errors) = main.finish();
        for (loc, message) in errors {
            self.diagnostics.push(Diagnostic::at(&loc, Severity::Error, message));
        }
        body
    }
}

/// Index of the `)` matching the `(` at `open`.
fn matching_paren(tokens: &[Token], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        match token.kind {
            TokenKind::LParen => depth += 1,
            TokenKind::RParen => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn condition(cursor: &mut Cursor) -> ParseResult<crate::ast::Expr> {
    if cursor.at_end() {
        return Err(cursor.error("missing condition"));
    }
    let expr = cursor.expr()?;
    cursor.finish()?;
    Ok(expr)
}

pub(super) fn call_statement(token: &Token, loc: SourceLocation, callee: ExprKind) -> ParseResult<Statement> {
    match callee {
        ExprKind::Call { name, args } => Ok(Statement::Call { loc, name, args }),
        ExprKind::Ident(name) => Ok(Statement::Call {
            loc,
            name,
            args: Vec::new(),
        }),
        _ => Err(syntax(token, "expected procedure name")),
    }
}

/// Tokens after `DCL-xx name` up to an inline closing keyword, and whether one was found.
fn inline_body<'t>(tokens: &'t [Token], end: &str) -> (&'t [Token], bool) {
    let start = tokens.len().min(2);
    let rest = &tokens[start..];
    match rest.iter().position(|t| t.is_ident(end)) {
        Some(at) => (&rest[..at], true),
        None => (rest, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Expr;

    fn parse(src: &str) -> (Program, Vec<Diagnostic>) {
        let mut program = Program::empty("T.rpgle", true);
        let mut diagnostics = Vec::new();
        let locator = Locator::new(&program.loc.clone(), src);
        let body = parse_free(&mut program, src, &locator, &mut diagnostics);
        program.main_body = body;
        (program, diagnostics)
    }

    fn clean(src: &str) -> Program {
        let (program, diagnostics) = parse(src);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        program
    }

    fn messages(src: &str) -> Vec<String> {
        parse(src).1.into_iter().map(|d| d.message).collect()
    }

    #[test]
    fn test_declarations() {
        let p = clean(concat!(
            "**FREE\n",
            "ctl-opt dftactgrp(*no);\n",
            "dcl-f custfile keyed;\n",
            "dcl-s total packed(9:2) inz(0);\n",
            "dcl-s name varchar(50);\n",
            "dcl-s copy like(name);\n",
            "dcl-c MAX_ROWS const(100);\n",
            "dcl-c TITLE 'Orders';\n",
            "dcl-ds order qualified;\n",
            "  id int(10);\n",
            "  dcl-subf qty packed(5:0);\n",
            "end-ds;\n",
            "dcl-ds last likeds(order);\n",
        ));
        let names: Vec<&str> = p.variables.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["TOTAL", "NAME", "COPY", "MAX_ROWS", "TITLE", "ORDER", "ID", "QTY", "LAST"]
        );
        assert_eq!(p.variables[0].data_type.as_deref(), Some("PACKED"));
        assert_eq!((p.variables[0].length, p.variables[0].decimals), (Some(9), Some(2)));
        assert_eq!(p.variables[0].inz.as_deref(), Some("0"));
        assert_eq!(p.variables[2].data_type.as_deref(), Some("LIKE(NAME)"));
        assert_eq!(p.variables[3].inz.as_deref(), Some("100"));
        assert_eq!(p.variables[4].inz.as_deref(), Some("'Orders'"));
        assert_eq!(p.variables[5].data_type.as_deref(), Some("DS"));
        assert_eq!(p.variables[8].data_type.as_deref(), Some("LIKEDS(ORDER)"));
    }

    #[test]
    fn test_procedure_with_interface() {
        let p = clean(concat!(
            "dcl-pr calcTax packed(9:2);\n",
            "  amount packed(9:2) const;\n",
            "end-pr;\n",
            "dcl-proc calcTax export;\n",
            "  dcl-pi *n packed(9:2);\n",
            "    amount packed(9:2) const;\n",
            "    rate packed(5:4) value;\n",
            "    flags char(1);\n",
            "  end-pi;\n",
            "  return amount * rate;\n",
            "end-proc;\n",
        ));
        assert!(p.main_body.is_empty());
        let proc = &p.procedures[0];
        assert_eq!(proc.name, "CALCTAX");
        assert_eq!(proc.returns.as_deref(), Some("PACKED"));
        let passing: Vec<Option<&str>> = proc.params.iter().map(|p| p.passing.as_deref()).collect();
        assert_eq!(passing, vec![Some("CONST"), Some("VALUE"), None]);
        assert_eq!(proc.body.len(), 1);
    }

    #[test]
    fn test_control_flow_nesting() {
        let p = clean(concat!(
            "dow not %eof(custfile);\n",
            "  read custfile;\n",
            "  if balance > 1000;\n",
            "    flag = 'Y';\n",
            "  elseif balance > 0;\n",
            "    flag = 'N';\n",
            "  else;\n",
            "    leave;\n",
            "  endif;\n",
            "  select;\n",
            "    when type = 'A';\n",
            "      count += 1;\n",
            "    other;\n",
            "      exsr report;\n",
            "  endsl;\n",
            "  for i = 1 to 10;\n",
            "  endfor;\n",
            "enddo;\n",
            "*inlr = *on;\n",
        ));
        assert_eq!(p.main_body.len(), 2);
        let Statement::DoFor { kind, body, .. } = &p.main_body[0] else {
            panic!("expected loop");
        };
        assert_eq!(*kind, LoopKind::Dow);
        assert_eq!(body.len(), 3);
        assert!(matches!(&body[0], Statement::If { else_ifs, else_body, .. } if else_ifs.len() == 1 && else_body.is_empty()));
        assert!(matches!(&body[1], Statement::Select { whens, other: Some(other), .. } if whens.len() == 1 && other.len() == 1));
        assert!(matches!(&body[2], Statement::DoFor { kind: LoopKind::For, .. }));
        assert!(matches!(&p.main_body[1], Statement::Assign { target, .. } if target.text() == "*INLR"));
    }

    #[test]
    fn test_calls_and_assignments() {
        let p = clean(concat!(
            "callp(e) ship(order.id: qty);\n",
            "log();\n",
            "eval(h) total = total * 1.05;\n",
            "names(i) = %trim(name);\n",
            "monitor;\n",
            "  process();\n",
            "on-error 1211;\n",
            "  return;\n",
            "endmon;\n",
        ));
        let kinds: Vec<&str> = p
            .main_body
            .iter()
            .map(|s| match s {
                Statement::Call { .. } => "call",
                Statement::Assign { .. } => "assign",
                Statement::Return { .. } => "return",
                _ => "other",
            })
            .collect();
        assert_eq!(kinds, vec!["call", "call", "assign", "assign", "call", "return"]);
        let Statement::Call { name, args, .. } = &p.main_body[0] else {
            panic!("expected call");
        };
        assert_eq!(name, "SHIP");
        assert_eq!(args[0].text(), "ORDER.ID");
    }

    #[test]
    fn test_embedded_sql_placement() {
        let p = clean(concat!(
            "exec sql select count(*) into :n from orders;\n",
            "if n > 0;\n",
            "  exec sql delete from orders;\n",
            "endif;\n",
        ));
        assert_eq!(p.sql_statements.len(), 2);
        assert_eq!(p.main_body.len(), 1);
        let Statement::If { then_body, .. } = &p.main_body[0] else {
            panic!("expected if");
        };
        assert!(matches!(&then_body[0], Statement::EmbeddedSql(sql) if sql.stmt_type.as_deref() == Some("DELETE")));
    }

    #[test]
    fn test_unrecognized_statement_is_warning() {
        let (p, diagnostics) = parse("frobnicate the widget;\nx = 1;\n");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, Severity::Warning);
        assert_eq!(diagnostics[0].message, "unrecognized statement 'FROBNICATE' skipped");
        assert_eq!(p.main_body.len(), 1);
    }

    #[test]
    fn test_structural_errors() {
        assert_eq!(messages("x = 1"), vec!["missing ';' after statement"]);
        assert_eq!(messages("if a;\nx = 1;\n"), vec!["IF block is not closed"]);
        assert_eq!(messages("endif;"), vec!["ENDIF without an open block"]);
        assert_eq!(messages("dow a;\nendif;\nenddo;"), vec!["ENDIF does not close the open DOW block"]);
        assert_eq!(messages("end-proc;"), vec!["END-PROC without DCL-PROC"]);
        assert_eq!(messages("dcl-ds d;\n a char(1);\n"), vec!["DCL-DS without END-DS"]);
        assert_eq!(messages("x = (a + ;"), vec!["expected expression, found end of statement"]);
        assert_eq!(messages("if ;"), vec!["missing condition"]);
        assert_eq!(messages("dcl-pi end-pi;"), vec!["expected name after DCL-PI, found 'END-PI'"]);
        assert_eq!(messages("dcl-ds \tend-ds;"), vec!["expected name after DCL-DS, found 'END-DS'"]);
    }

    #[test]
    fn test_error_location() {
        // Just past the dangling '='.
        let (_, diagnostics) = parse("x = 1;\n  if a = ;\n");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!((diagnostics[0].line, diagnostics[0].column), (2, 9));
    }

    #[test]
    fn test_variables_of_condition() {
        let p = clean("if qty > max and %found(f);\nendif;\n");
        let Statement::If { condition, .. } = &p.main_body[0] else {
            panic!("expected if");
        };
        let vars: Vec<String> = Expr::variables(condition);
        assert_eq!(vars, vec!["QTY", "MAX", "F"]);
    }
}
