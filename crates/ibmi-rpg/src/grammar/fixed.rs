//! Fixed-format specifications read by their true RPG IV column layout.
//!
//! ```text
//! D  name 7-21  type 24-25  from 26-32  length 33-39  dtype 40  dec 41-42  keywords 44-80
//! C  factor1 12-25  opcode 26-35  factor2 36-49  result 50-63  (extended factor 2: 36-80)
//! P  name 7-21  begin/end 24  keywords 44-80
//! ```
//!
//! Extended factor 2 expressions are tokenized with the free-form lexer and
//! positioned at their real column. `/FREE` regions and fully free lines
//! (columns 6-7 blank) are handed to the free-form parser.

use ibmi_lang_core::{columns, Diagnostic, Severity, SourceLocation};

use super::blocks::{BlockBuilder, Closer, Group};
use super::expr::{binary, unary, Cursor, Locator, ParseResult};
use super::free::{call_statement, parse_free, UNMODELED_OPCODES};
use super::lexer::tokenize;
use crate::ast::{Expr, ExprKind, LoopKind, Param, Procedure, Program, Statement, VarDecl};
use crate::sql::{embedded_sql, find_ci};

const SPEC: usize = 5;
const FORM: usize = 6;
const NAME: (usize, usize) = (6, 21);
const DEF_TYPE: (usize, usize) = (23, 25);
const LENGTH: (usize, usize) = (32, 39);
const DATA_TYPE: usize = 39;
const DECIMALS: (usize, usize) = (40, 42);
const KEYWORDS: (usize, usize) = (43, 80);
const FACTOR1: (usize, usize) = (11, 25);
const OPCODE: (usize, usize) = (25, 35);
const FACTOR2: (usize, usize) = (35, 49);
const EXT_FACTOR2: (usize, usize) = (35, 80);
const RESULT: (usize, usize) = (49, 63);
const PROC_MARKER: usize = 23;

/// Operation codes whose extended factor 2 is a free-form expression.
const EXPRESSION_OPCODES: &[&str] = &[
    "EVAL", "EVALR", "EVAL-CORR", "IF", "ELSEIF", "DOW", "DOU", "WHEN", "FOR", "RETURN", "CALLP",
];

/// Fixed-only operations with no AST counterpart.
const FIXED_UNMODELED: &[&str] = &[
    "ADDDUR", "BITOFF", "BITON", "CAT", "CHECK", "CHECKR", "COMP", "DEFINE", "ENDCS", "EXTRCT",
    "GOTO", "KFLD", "KLIST", "LOOKUP", "MOVEA", "MVR", "OCCUR", "PLIST", "SCAN", "SETOFF", "SETON",
    "SQRT", "SUBDUR", "SUBST", "TAG", "TESTB", "TESTN", "TESTZ", "TIME", "XFOOT", "XLATE",
];

/// Comparison suffixes of `IFxx`, `DOWxx`, `ANDxx` and friends.
const COMPARISONS: &[(&str, &str)] = &[
    ("EQ", "="),
    ("NE", "<>"),
    ("GT", ">"),
    ("LT", "<"),
    ("GE", ">="),
    ("LE", "<="),
];

/// Internal data type letters of a definition spec.
const DATA_TYPES: &[(char, &str)] = &[
    ('A', "CHAR"),
    ('B', "BINDEC"),
    ('C', "UCS2"),
    ('D', "DATE"),
    ('F', "FLOAT"),
    ('G', "GRAPH"),
    ('I', "INT"),
    ('N', "IND"),
    ('O', "OBJECT"),
    ('P', "PACKED"),
    ('S', "ZONED"),
    ('T', "TIME"),
    ('U', "UNS"),
    ('Z', "TIMESTAMP"),
    ('*', "POINTER"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DefContext {
    None,
    DataStructure,
    Prototype,
    Interface,
}

/// Parse fixed-format `text` into `program`, returning the main-line
/// statements.
pub(super) fn parse_fixed(program: &mut Program, text: &str, diagnostics: &mut Vec<Diagnostic>) -> Vec<Statement> {
    let mut parser = FixedParser {
        program,
        diagnostics,
        lines: text.lines().collect(),
        pos: 0,
        main: BlockBuilder::new(),
        procedure: None,
        context: DefContext::None,
        long_name: String::new(),
    };
    parser.run();
    parser.finish()
}

struct FixedParser<'p> {
    program: &'p mut Program,
    diagnostics: &'p mut Vec<Diagnostic>,
    lines: Vec<&'p str>,
    pos: usize,
    main: BlockBuilder,
    procedure: Option<(Procedure, BlockBuilder)>,
    context: DefContext,
    /// Pieces of a name continued with `...`.
    long_name: String,
}

fn is_blank(c: Option<char>) -> bool {
    c.map_or(true, |c| c == ' ')
}

/// Columns 6 and 7 blank with something after them.
fn is_free_line(line: &str) -> bool {
    is_blank(columns::char_at(line, SPEC))
        && is_blank(columns::char_at(line, FORM))
        && !columns::from(line, FORM).trim().is_empty()
}

/// Argument of `name(...)` in a keyword area.
fn keyword_arg(keywords: &str, name: &str) -> Option<String> {
    let upper = keywords.to_ascii_uppercase();
    let mut search = 0;
    while let Some(found) = find_ci(&upper[search..], name) {
        let start = search + found;
        let before_ok = start == 0 || !upper.as_bytes()[start - 1].is_ascii_alphanumeric();
        let after = start + name.len();
        if before_ok && upper.as_bytes().get(after) == Some(&b'(') {
            let mut depth = 0usize;
            for (i, b) in keywords.bytes().enumerate().skip(after) {
                match b {
                    b'(' => depth += 1,
                    b')' => {
                        depth -= 1;
                        if depth == 0 {
                            return Some(keywords[after + 1..i].trim().to_string());
                        }
                    }
                    _ => {}
                }
            }
            return None;
        }
        search = start + name.len();
    }
    None
}

fn has_keyword(keywords: &str, name: &str) -> bool {
    keywords
        .split(|c: char| !c.is_ascii_alphanumeric() && c != '-')
        .any(|word| word.eq_ignore_ascii_case(name))
}

/// An operand written in a factor or result field.
fn factor_operand(loc: SourceLocation, text: &str) -> Expr {
    let text = text.trim();
    let is_literal = text.starts_with('\'')
        || text.starts_with('*')
        || text
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-' | '+'));
    if is_literal {
        Expr::new(loc, ExprKind::Literal(text.to_string()))
    } else {
        Expr::ident(loc, text.to_ascii_uppercase())
    }
}

/// Split `IFEQ` into `("IF", "=")`.
fn comparison_opcode(opcode: &str) -> Option<(&str, &'static str)> {
    ["IF", "DOW", "DOU", "WHEN", "AND", "OR"].into_iter().find_map(|base| {
        let suffix = opcode.strip_prefix(base)?;
        COMPARISONS
            .iter()
            .find(|(code, _)| *code == suffix)
            .map(|(_, op)| (base, *op))
    })
}

impl<'p> FixedParser<'p> {
    fn error(&mut self, loc: &SourceLocation, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic::at(loc, Severity::Error, message));
    }

    fn builder(&mut self) -> &mut BlockBuilder {
        match &mut self.procedure {
            Some((_, builder)) => builder,
            None => &mut self.main,
        }
    }

    fn push(&mut self, loc: &SourceLocation, stmt: Statement) {
        if let Err(message) = self.builder().push(stmt) {
            self.error(loc, message);
        }
    }

    fn block(&mut self, loc: &SourceLocation, result: Result<(), String>) {
        if let Err(message) = result {
            self.error(loc, message);
        }
    }

    fn run(&mut self) {
        while self.pos < self.lines.len() {
            let line = self.lines[self.pos];
            let line_no = self.pos as u32 + 1;
            self.pos += 1;

            // Compile-time data follows the program source.
            if line.starts_with("**") {
                break;
            }
            let spec = columns::char_at(line, SPEC).map(|c| c.to_ascii_uppercase());
            let form = columns::char_at(line, FORM);
            if form == Some('*') || columns::from(line, FORM).trim_start().starts_with("//") {
                continue;
            }
            if form == Some('/') {
                self.directive(line, line_no);
                continue;
            }
            if is_free_line(line) {
                self.pos -= 1;
                self.free_lines();
                continue;
            }
            let loc = self.program.loc.at(line_no, SPEC as u32 + 1);
            match spec {
                None | Some(' ') => {}
                Some('H' | 'F' | 'I' | 'O') => {}
                Some('D') => self.definition(line, line_no),
                Some('P') => self.procedure_spec(line, line_no),
                Some('C') => self.calculation(line, line_no),
                Some(other) => self.error(&loc, format!("unknown specification type '{other}'")),
            }
        }
    }

    fn directive(&mut self, line: &str, line_no: u32) {
        let text = columns::from(line, FORM);
        let loc = self.program.loc.at(line_no, FORM as u32 + 1);
        if find_ci(text, "/EXEC SQL") == Some(0) {
            self.exec_sql(loc, columns::from(text, "/EXEC SQL".len()));
        } else if find_ci(text, "/FREE") == Some(0) {
            self.free_directive_region(&loc);
        } else if find_ci(text, "/END-FREE") == Some(0) {
            self.error(&loc, "/END-FREE without /FREE");
        }
    }

    fn exec_sql(&mut self, loc: SourceLocation, first: &str) {
        let mut raw = first.to_string();
        let mut terminated = false;
        while self.pos < self.lines.len() {
            let next = self.lines[self.pos];
            self.pos += 1;
            let body = columns::from(next, FORM);
            if find_ci(body, "/END-EXEC") == Some(0) {
                terminated = true;
                break;
            }
            raw.push('\n');
            raw.push_str(body.strip_prefix('+').unwrap_or(body));
        }
        if !terminated {
            self.error(&loc, "/EXEC SQL without /END-EXEC");
        }
        self.embedded(loc, &raw);
    }

    fn embedded(&mut self, loc: SourceLocation, raw: &str) {
        let sql = embedded_sql(loc.clone(), raw);
        if self.procedure.is_some() || self.builder().depth() > 0 {
            self.push(&loc, Statement::EmbeddedSql(sql.clone()));
        }
        self.program.sql_statements.push(sql);
    }

    fn free_directive_region(&mut self, loc: &SourceLocation) {
        let start_line = self.pos as u32 + 1;
        let mut region = Vec::new();
        let mut terminated = false;
        while self.pos < self.lines.len() {
            let line = self.lines[self.pos];
            self.pos += 1;
            if find_ci(columns::from(line, FORM).trim_start(), "/END-FREE") == Some(0) {
                terminated = true;
                break;
            }
            region.push(blank_sequence_area(line));
        }
        if !terminated {
            self.error(loc, "/FREE without /END-FREE");
        }
        self.free_region(start_line, &region.join("\n"));
    }

    fn free_lines(&mut self) {
        let start_line = self.pos as u32 + 1;
        let mut region = Vec::new();
        while self.pos < self.lines.len() {
            let line = self.lines[self.pos];
            if !(is_free_line(line) || line.trim().is_empty()) {
                break;
            }
            region.push(blank_sequence_area(line));
            self.pos += 1;
        }
        self.free_region(start_line, &region.join("\n"));
    }

    fn free_region(&mut self, start_line: u32, region: &str) {
        let file = self.program.loc.clone();
        let locator = Locator::at(&file, region, start_line, 1);
        let statements = parse_free(self.program, region, &locator, self.diagnostics);
        for stmt in statements {
            let loc = stmt.loc().clone();
            self.push(&loc, stmt);
        }
    }

    /// The name in columns 7-21, joined with any `...` continuation lines
    /// before it. `None` while the name is still being continued.
    fn spec_name(&mut self, line: &str) -> Option<String> {
        // A continued name may run past column 21.
        if let Some(part) = columns::from(line, NAME.0).trim().strip_suffix("...") {
            self.long_name.push_str(part);
            return None;
        }
        let mut name = std::mem::take(&mut self.long_name);
        name.push_str(columns::slice(line, NAME.0, NAME.1).trim());
        Some(name.to_ascii_uppercase())
    }

    fn definition(&mut self, line: &str, line_no: u32) {
        let Some(name) = self.spec_name(line) else {
            return;
        };
        let loc = self.program.loc.at(line_no, NAME.0 as u32 + 1);
        let def_type = columns::slice(line, DEF_TYPE.0, DEF_TYPE.1).trim().to_ascii_uppercase();
        let length = columns::field(line, LENGTH.0, LENGTH.1).and_then(|l| l.parse::<u32>().ok());
        let decimals = columns::field(line, DECIMALS.0, DECIMALS.1).and_then(|d| d.parse::<u32>().ok());
        let keywords = columns::slice(line, KEYWORDS.0, KEYWORDS.1).trim();
        let letter = columns::char_at(line, DATA_TYPE).map(|c| c.to_ascii_uppercase());

        let data_type = match letter.filter(|c| *c != ' ') {
            Some(letter) => DATA_TYPES
                .iter()
                .find(|(l, _)| *l == letter)
                .map(|(_, t)| t.to_string()),
            None if decimals.is_some() => Some("PACKED".to_string()),
            None if length.is_some() => Some("CHAR".to_string()),
            None => ["LIKE", "LIKEDS", "LIKEREC"].into_iter().find_map(|kw| {
                keyword_arg(keywords, kw).map(|arg| format!("{kw}({})", arg.to_ascii_uppercase()))
            }),
        };
        let decl = |data_type: Option<String>| VarDecl {
            loc: loc.clone(),
            name: name.clone(),
            data_type,
            length,
            decimals,
            inz: keyword_arg(keywords, "INZ"),
        };

        match def_type.as_str() {
            "S" => {
                self.context = DefContext::None;
                self.program.variables.push(decl(data_type));
            }
            "C" => {
                self.context = DefContext::None;
                let mut constant = decl(Some("CONST".to_string()));
                constant.inz = keyword_arg(keywords, "CONST").or_else(|| Some(keywords.to_string()));
                self.program.variables.push(constant);
            }
            "DS" => {
                let is_copy = keyword_arg(keywords, "LIKEDS").is_some() || keyword_arg(keywords, "LIKEREC").is_some();
                self.context = if is_copy {
                    DefContext::None
                } else {
                    DefContext::DataStructure
                };
                self.program.variables.push(decl(data_type.or_else(|| Some("DS".to_string()))));
            }
            "PR" => self.context = DefContext::Prototype,
            "PI" => {
                self.context = DefContext::Interface;
                if let Some((procedure, _)) = self.procedure.as_mut() {
                    procedure.returns = data_type;
                }
            }
            "" => match self.context {
                DefContext::DataStructure if !name.is_empty() => self.program.variables.push(decl(data_type)),
                DefContext::Interface if !name.is_empty() => {
                    let passing = ["VALUE", "CONST"]
                        .into_iter()
                        .find(|kw| has_keyword(keywords, kw))
                        .map(str::to_string);
                    let param = Param {
                        loc: loc.clone(),
                        name,
                        data_type,
                        passing,
                    };
                    if let Some((procedure, _)) = self.procedure.as_mut() {
                        procedure.params.push(param);
                    }
                }
                DefContext::None if !name.is_empty() => {
                    self.error(&loc, format!("definition {name} has no definition type"));
                }
                // Keyword continuation, or a prototype parameter.
                _ => {}
            },
            other => self.error(&loc, format!("unknown definition type '{other}'")),
        }
    }

    fn procedure_spec(&mut self, line: &str, line_no: u32) {
        let Some(name) = self.spec_name(line) else {
            return;
        };
        let loc = self.program.loc.at(line_no, NAME.0 as u32 + 1);
        self.context = DefContext::None;
        match columns::char_at(line, PROC_MARKER).map(|c| c.to_ascii_uppercase()) {
            Some('B') => {
                if let Some((open, _)) = &self.procedure {
                    let message = format!("procedure {name} begins inside procedure {}", open.name);
                    self.error(&loc, message);
                    return;
                }
                if self.main.depth() > 0 {
                    self.error(&loc, format!("procedure {name} begins inside an open block"));
                    return;
                }
                self.procedure = Some((Procedure::new(loc, name), BlockBuilder::new()));
            }
            Some('E') => match self.procedure.take() {
                Some((procedure, builder)) => self.close_procedure(procedure, builder),
                None => self.error(&loc, "procedure end without a matching begin"),
            },
            _ => self.error(&loc, "procedure specification needs B or E in column 24"),
        }
    }

    fn close_procedure(&mut self, mut procedure: Procedure, builder: BlockBuilder) {
        let (body, errors) = builder.finish();
        for (loc, message) in errors {
            self.error(&loc, message);
        }
        procedure.body = body;
        self.program.procedures.push(procedure);
    }

    /// Extended factor 2 of the current line plus any continuation lines,
    /// padded so every line keeps its source columns.
    fn extended_factor2(&mut self, line: &str) -> String {
        let mut text = columns::slice(line, EXT_FACTOR2.0, EXT_FACTOR2.1).to_string();
        while let Some(next) = self.lines.get(self.pos) {
            let is_continuation = columns::char_at(next, SPEC).is_some_and(|c| c.eq_ignore_ascii_case(&'C'))
                && !matches!(columns::char_at(next, FORM), Some('*' | '/'))
                && columns::field(next, OPCODE.0, OPCODE.1).is_none()
                && columns::field(next, FACTOR1.0, FACTOR1.1).is_none()
                && columns::field(next, EXT_FACTOR2.0, EXT_FACTOR2.1).is_some();
            if !is_continuation {
                break;
            }
            text.push('\n');
            text.push_str(&" ".repeat(EXT_FACTOR2.0));
            text.push_str(columns::slice(next, EXT_FACTOR2.0, EXT_FACTOR2.1));
            self.pos += 1;
        }
        text
    }

    /// Tokenize an extended factor 2 and run `f` over it.
    fn expression<T>(
        &mut self,
        line_no: u32,
        text: &str,
        f: impl FnOnce(&mut Cursor) -> ParseResult<T>,
    ) -> Option<T> {
        let locator = Locator::at(&self.program.loc, text, line_no, EXT_FACTOR2.0 as u32 + 1);
        let (tokens, lex_errors) = tokenize(text);
        if !lex_errors.is_empty() {
            for err in lex_errors {
                self.error(&locator.loc(err.offset), err.message);
            }
            return None;
        }
        let mut cursor = Cursor::new(&tokens, &locator);
        match f(&mut cursor) {
            Ok(value) => Some(value),
            Err(err) => {
                self.error(&locator.loc(err.offset), err.message);
                None
            }
        }
    }

    fn calculation(&mut self, line: &str, line_no: u32) {
        let loc = self.program.loc.at(line_no, OPCODE.0 as u32 + 1);
        let opcode_field = columns::slice(line, OPCODE.0, OPCODE.1).trim().to_ascii_uppercase();
        let opcode = opcode_field.split('(').next().unwrap_or("").to_string();
        if opcode.is_empty() {
            return;
        }
        if opcode_field == "EXEC SQL" {
            let text = self.extended_factor2(line);
            self.embedded(loc, &text);
            return;
        }
        let factor1 = columns::slice(line, FACTOR1.0, FACTOR1.1).trim();
        let factor2 = columns::slice(line, FACTOR2.0, FACTOR2.1).trim();
        let result = columns::slice(line, RESULT.0, RESULT.1).trim();
        let f1 = || factor_operand(loc.clone(), factor1);
        let f2 = || factor_operand(loc.clone(), factor2);

        if EXPRESSION_OPCODES.contains(&opcode.as_str()) {
            let text = self.extended_factor2(line);
            self.expression_opcode(&opcode, &text, line_no, loc);
            return;
        }

        if let Some((base, op)) = comparison_opcode(&opcode) {
            let condition = binary(loc.clone(), op, f1(), f2());
            match base {
                "IF" => self.builder().open_if(loc, condition),
                "DOW" => self.builder().open_loop(loc, LoopKind::Dow, Some(condition)),
                "DOU" => self.builder().open_loop(loc, LoopKind::Dou, Some(condition)),
                "WHEN" => {
                    let result = self.builder().when(loc.clone(), condition);
                    self.block(&loc, result);
                }
                _ => {
                    let result = self.builder().extend_condition(loc.clone(), base, condition);
                    self.block(&loc, result);
                }
            }
            return;
        }

        let assign = |expr: Expr| Statement::Assign {
            loc: loc.clone(),
            target: factor_operand(loc.clone(), result),
            expr,
        };
        match opcode.as_str() {
            "ELSE" => {
                let result = self.builder().else_branch();
                self.block(&loc, result);
            }
            "SELECT" => self.builder().open_select(loc),
            "OTHER" => {
                let result = self.builder().other();
                self.block(&loc, result);
            }
            "DO" => {
                let limit = (!factor2.is_empty()).then(f2);
                self.builder().open_loop(loc, LoopKind::Do, limit);
            }
            "BEGSR" => self.builder().open_group(loc, Group::Subroutine),
            "MONITOR" => self.builder().open_group(loc, Group::Monitor),
            "ON-ERROR" => {
                let result = self.builder().on_error();
                self.block(&loc, result);
            }
            "END" | "ENDIF" | "ENDDO" | "ENDFOR" | "ENDSL" | "ENDSR" | "ENDMON" => {
                let closer = match opcode.as_str() {
                    "ENDIF" => Closer::EndIf,
                    "ENDDO" => Closer::EndDo,
                    "ENDFOR" => Closer::EndFor,
                    "ENDSL" => Closer::EndSl,
                    "ENDSR" => Closer::EndSr,
                    "ENDMON" => Closer::EndMon,
                    _ => Closer::End,
                };
                let result = self.builder().close(closer);
                self.block(&loc, result);
            }
            "CALL" | "CALLB" => {
                let name = factor2.trim_matches('\'').to_ascii_uppercase();
                let stmt = Statement::Call {
                    loc: loc.clone(),
                    name,
                    args: Vec::new(),
                };
                self.push(&loc, stmt);
            }
            "PARM" => {
                let arg = if result.is_empty() { f2() } else { factor_operand(loc.clone(), result) };
                if let Some(Statement::Call { args, .. }) = self.builder().last_mut() {
                    args.push(arg);
                }
            }
            "EXSR" => {
                let stmt = Statement::Call {
                    loc: loc.clone(),
                    name: factor2.to_ascii_uppercase(),
                    args: Vec::new(),
                };
                self.push(&loc, stmt);
            }
            "ADD" | "SUB" | "MULT" | "DIV" => {
                let op = match opcode.as_str() {
                    "ADD" => "+",
                    "SUB" => "-",
                    "MULT" => "*",
                    _ => "/",
                };
                let left = if factor1.is_empty() {
                    factor_operand(loc.clone(), result)
                } else {
                    f1()
                };
                let stmt = assign(binary(loc.clone(), op, left, f2()));
                self.push(&loc, stmt);
            }
            "Z-ADD" | "MOVE" | "MOVEL" => {
                let stmt = assign(f2());
                self.push(&loc, stmt);
            }
            "Z-SUB" => {
                let stmt = assign(unary(loc.clone(), "-", f2()));
                self.push(&loc, stmt);
            }
            op if UNMODELED_OPCODES.contains(&op)
                || FIXED_UNMODELED.contains(&op)
                || op.starts_with("CAB")
                || op.starts_with("CAS") => {}
            other => {
                let message = format!("unknown operation code '{other}'");
                self.diagnostics.push(Diagnostic::at(&loc, Severity::Warning, message));
            }
        }
    }

    fn expression_opcode(&mut self, opcode: &str, text: &str, line_no: u32, loc: SourceLocation) {
        match opcode {
            "IF" | "ELSEIF" | "DOW" | "DOU" | "WHEN" => {
                let Some(condition) = self.expression(line_no, text, condition) else {
                    return;
                };
                let result = match opcode {
                    "IF" => {
                        self.builder().open_if(loc.clone(), condition);
                        Ok(())
                    }
                    "ELSEIF" => self.builder().else_if(loc.clone(), condition),
                    "WHEN" => self.builder().when(loc.clone(), condition),
                    _ => {
                        let kind = if opcode == "DOW" { LoopKind::Dow } else { LoopKind::Dou };
                        self.builder().open_loop(loc.clone(), kind, Some(condition));
                        Ok(())
                    }
                };
                self.block(&loc, result);
            }
            "FOR" => {
                if let Some(clause) = self.expression(line_no, text, |c| c.for_clause()) {
                    self.builder().open_loop(loc, LoopKind::For, Some(clause));
                }
            }
            "RETURN" => {
                let value = self.expression(line_no, text, |c| {
                    if c.at_end() {
                        return Ok(None);
                    }
                    let value = c.expr()?;
                    c.finish()?;
                    Ok(Some(value))
                });
                if let Some(value) = value {
                    self.push(&loc.clone(), Statement::Return { loc, value });
                }
            }
            "CALLP" => {
                let call_loc = loc.clone();
                let stmt = self.expression(line_no, text, |c| {
                    let Some(first) = c.peek() else {
                        return Err(c.error("expected procedure call after CALLP"));
                    };
                    let callee = c.primary()?;
                    c.finish()?;
                    call_statement(first, call_loc, callee.kind)
                });
                if let Some(stmt) = stmt {
                    self.push(&loc, stmt);
                }
            }
            _ => {
                if let Some((target, expr)) = self.expression(line_no, text, |c| c.assignment()) {
                    self.push(&loc.clone(), Statement::Assign { loc, target, expr });
                }
            }
        }
    }

    fn finish(mut self) -> Vec<Statement> {
        if let Some((procedure, builder)) = self.procedure.take() {
            let message = format!("procedure {} has no end specification", procedure.name);
            self.error(&procedure.loc.clone(), message);
            self.close_procedure(procedure, builder);
        }
        let main = std::mem::take(&mut self.main);
        let (body, errors) = main.finish();
        for (loc, message) in errors {
            self.error(&loc, message);
        }
        body
    }
}

fn condition(cursor: &mut Cursor) -> ParseResult<Expr> {
    if cursor.at_end() {
        return Err(cursor.error("missing condition"));
    }
    let expr = cursor.expr()?;
    cursor.finish()?;
    Ok(expr)
}

/// Blank the sequence number and spec columns so free-form text keeps its
/// columns.
fn blank_sequence_area(line: &str) -> String {
    let rest = columns::from(line, FORM + 1);
    let prefix = line.chars().count().min(FORM + 1);
    format!("{}{}", " ".repeat(prefix), rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> (Program, Vec<Diagnostic>) {
        let mut program = Program::empty("T.rpgle", false);
        let mut diagnostics = Vec::new();
        let body = parse_fixed(&mut program, src, &mut diagnostics);
        program.main_body = body;
        (program, diagnostics)
    }

    fn clean(src: &str) -> Program {
        let (program, diagnostics) = parse(src);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        program
    }

    #[test]
    fn test_definitions() {
        let p = clean(concat!(
            "     H DFTACTGRP(*NO)\n",
            "     FCUSTFILE  IF   E           K DISK\n",
            "     D count           S             10I 0 INZ(0)\n",
            "     D name            S             30A\n",
            "     D rate            S              7  4\n",
            "     D MAXROWS         C                   CONST(500)\n",
            "     D customerRecord...\n",
            "     D                 DS\n",
            "     D  custId                        7P 0\n",
            "     D  custName                     40A\n",
        ));
        let names: Vec<&str> = p.variables.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["COUNT", "NAME", "RATE", "MAXROWS", "CUSTOMERRECORD", "CUSTID", "CUSTNAME"]);
        assert_eq!(p.variables[0].data_type.as_deref(), Some("INT"));
        assert_eq!((p.variables[0].length, p.variables[0].decimals), (Some(10), Some(0)));
        assert_eq!(p.variables[0].inz.as_deref(), Some("0"));
        assert_eq!(p.variables[1].data_type.as_deref(), Some("CHAR"));
        assert_eq!(p.variables[2].data_type.as_deref(), Some("PACKED"));
        assert_eq!(p.variables[3].inz.as_deref(), Some("500"));
        assert_eq!(p.variables[4].data_type.as_deref(), Some("DS"));
        assert_eq!(p.variables[5].data_type.as_deref(), Some("PACKED"));
    }

    #[test]
    fn test_calculations_by_column() {
        let p = clean(concat!(
            "     C                   EVAL      total = total + 1\n",
            "     C     total         ADD       1             count\n",
            "     C                   Z-ADD     0             count\n",
            "     C                   CALL      'PRTLBL'\n",
            "     C                   PARM                    count\n",
            "     C                   EXSR      CLEANUP\n",
            "     C                   SETON                                        LR\n",
            "     C                   RETURN\n",
        ));
        assert_eq!(p.main_body.len(), 6);
        let Statement::Assign { target, expr, .. } = &p.main_body[0] else {
            panic!("expected assignment");
        };
        assert_eq!(target.text(), "TOTAL");
        assert_eq!(expr.text(), "TOTAL + 1");
        assert!(matches!(&p.main_body[1], Statement::Assign { target, expr, .. }
            if target.text() == "COUNT" && expr.text() == "TOTAL + 1"));
        let Statement::Call { name, args, .. } = &p.main_body[3] else {
            panic!("expected call");
        };
        assert_eq!(name, "PRTLBL");
        assert_eq!(args[0].text(), "COUNT");
        assert!(matches!(&p.main_body[4], Statement::Call { name, .. } if name == "CLEANUP"));
        assert!(matches!(&p.main_body[5], Statement::Return { value: None, .. }));
    }

    #[test]
    fn test_extended_factor2_continuation() {
        let p = clean(concat!(
            "     C                   IF        status = 'A' and\n",
            "     C                             balance > 0\n",
            "     C                   EVAL      flag = 'Y'\n",
            "     C                   ENDIF\n",
        ));
        let Statement::If { condition, then_body, .. } = &p.main_body[0] else {
            panic!("expected if");
        };
        assert_eq!(condition.text(), "STATUS = 'A' AND BALANCE > 0");
        assert_eq!(then_body.len(), 1);
    }

    #[test]
    fn test_fixed_comparison_opcodes() {
        let p = clean(concat!(
            "     C     count         DOWLT     10\n",
            "     C     flag          ANDEQ     'Y'\n",
            "     C                   ADD       1             count\n",
            "     C                   ENDDO\n",
            "     C     code          IFEQ      *BLANKS\n",
            "     C                   END\n",
        ));
        assert_eq!(p.main_body.len(), 2);
        let Statement::DoFor { kind, condition: Some(condition), body, .. } = &p.main_body[0] else {
            panic!("expected loop");
        };
        assert_eq!(*kind, LoopKind::Dow);
        assert_eq!(condition.text(), "COUNT < 10 AND FLAG = 'Y'");
        assert_eq!(body.len(), 1);
    }

    #[test]
    fn test_procedures_and_interface() {
        let p = clean(concat!(
            "     PcalcTax          B                   EXPORT\n",
            "     D calcTax         PI             9P 2\n",
            "     D  amount                        9P 2 CONST\n",
            "     D  rate                          5P 4 VALUE\n",
            "     C                   RETURN    amount * rate\n",
            "     PcalcTax          E\n",
        ));
        let proc = &p.procedures[0];
        assert_eq!(proc.name, "CALCTAX");
        assert_eq!(proc.returns.as_deref(), Some("PACKED"));
        assert_eq!(proc.params.len(), 2);
        assert_eq!(proc.params[0].passing.as_deref(), Some("CONST"));
        assert!(matches!(&proc.body[0], Statement::Return { value: Some(v), .. } if v.text() == "AMOUNT * RATE"));
        assert!(p.variables.is_empty());
    }

    #[test]
    fn test_free_region_and_sql() {
        let p = clean(concat!(
            "     C/EXEC SQL\n",
            "     C+ SELECT NAME INTO :NAME FROM CUSTOMER\n",
            "     C/END-EXEC\n",
            "      /FREE\n",
            "        total = total + 1;\n",
            "        if total > 10;\n",
            "          exec sql update orders set flag = 'Y';\n",
            "        endif;\n",
            "      /END-FREE\n",
            "     C                   RETURN\n",
            "**CTDATA ARR\n",
            "not rpg at all\n",
        ));
        assert_eq!(p.sql_statements.len(), 2);
        assert_eq!(p.sql_statements[0].sql_text, "SELECT NAME INTO :NAME FROM CUSTOMER");
        assert_eq!(p.main_body.len(), 3);
    }

    #[test]
    fn test_exec_sql_in_opcode_area() {
        let p = clean(concat!(
            "     C                   IF        *IN03\n",
            "     C                   EXEC SQL  DELETE FROM ORDERS\n",
            "     C                               WHERE STATUS = 'X'\n",
            "     C                   ENDIF\n",
        ));
        assert_eq!(p.sql_statements.len(), 1);
        assert_eq!(p.sql_statements[0].sql_text, "DELETE FROM ORDERS\nWHERE STATUS = 'X'");
        assert_eq!(p.sql_statements[0].stmt_type.as_deref(), Some("DELETE"));
        let Statement::If { then_body, .. } = &p.main_body[0] else {
            panic!("expected if");
        };
        assert!(matches!(&then_body[0], Statement::EmbeddedSql(_)));
    }

    #[test]
    fn test_fully_free_lines() {
        let p = clean(concat!(
            "     D x               S             10I 0\n",
            "       x = 5;\n",
            "       dsply x;\n",
            "     C                   RETURN\n",
        ));
        assert_eq!(p.main_body.len(), 2);
        assert_eq!(p.main_body[0].loc().line, 2);
        assert_eq!(p.main_body[0].loc().column, 8);
    }

    #[test]
    fn test_errors_and_warnings() {
        let (_, diagnostics) = parse("     X something\n");
        assert_eq!(diagnostics[0].message, "unknown specification type 'X'");

        let (_, diagnostics) = parse("     C                   FROB      x\n");
        assert_eq!(diagnostics[0].severity, Severity::Warning);
        assert_eq!(diagnostics[0].message, "unknown operation code 'FROB'");

        let (_, diagnostics) = parse("     C                   IF        a =\n");
        let messages: Vec<&str> = diagnostics.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, vec!["expected expression, found end of statement"]);
        assert_eq!(diagnostics[0].column, 39);

        let (_, diagnostics) = parse("     C                   ENDIF\n");
        assert_eq!(diagnostics[0].message, "ENDIF without an open block");

        let (_, diagnostics) = parse("     Pfoo              B\n");
        assert_eq!(diagnostics[0].message, "procedure FOO has no end specification");
    }

    #[test]
    fn test_keyword_arg() {
        assert_eq!(keyword_arg("INZ(*HIVAL) DIM(10)", "INZ").as_deref(), Some("*HIVAL"));
        assert_eq!(keyword_arg("OVERLAY(DS:5) LIKE(x)", "LIKE").as_deref(), Some("x"));
        assert_eq!(keyword_arg("LIKEDS(y)", "LIKE"), None);
        assert_eq!(keyword_arg("CONST(%len(a))", "CONST").as_deref(), Some("%len(a)"));
    }
}
