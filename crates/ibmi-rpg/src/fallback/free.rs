//! Line-at-a-time scan of free-form source.

use ibmi_lang_core::SourceLocation;

use crate::ast::{Expr, Procedure, Program, Statement, VarDecl};
use crate::sql::{embedded_sql, find_ci};

/// Leading words of control-flow lines. Their `=` is a comparison, so they
/// must not reach the assignment recognizer.
const CONDITIONAL_OPCODES: &[&str] = &["IF", "ELSEIF", "WHEN", "DOW", "DOU", "FOR", "ON-ERROR"];

pub(super) fn parse(program: &mut Program, text: &str) {
    let lines: Vec<&str> = text.lines().collect();
    let mut procedure: Option<Procedure> = None;

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        let stripped = line.trim();
        let column = line.chars().take_while(|c| c.is_whitespace()).count() as u32 + 1;
        let loc = program.loc.at(i as u32 + 1, column);
        i += 1;

        if is_ignorable(stripped) {
            continue;
        }

        if let Some(at) = find_ci(stripped, "EXEC SQL") {
            let mut raw = stripped[at + "EXEC SQL".len()..].to_string();
            let mut last = stripped.to_string();
            while !ends_sql_block(&last) && i < lines.len() {
                last = lines[i].trim().to_string();
                raw.push('\n');
                raw.push_str(&last);
                i += 1;
            }
            let sql = embedded_sql(loc, &raw);
            if let Some(proc) = procedure.as_mut() {
                proc.body.push(Statement::EmbeddedSql(sql.clone()));
            }
            program.sql_statements.push(sql);
            continue;
        }

        let lower = stripped.to_ascii_lowercase();
        if let Some(rest) = dcl_s_operands(&lower) {
            if let Some(decl) = parse_dcl_s(rest, loc) {
                program.variables.push(decl);
            }
            continue;
        }
        if lower.starts_with("dcl-proc") {
            if let Some(open) = procedure.take() {
                program.procedures.push(open);
            }
            let name = stripped
                .split_whitespace()
                .nth(1)
                .map(|n| n.trim_end_matches(';').to_uppercase())
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| "unknown".to_string());
            procedure = Some(Procedure::new(loc, name));
            continue;
        }
        if lower.starts_with("end-proc") {
            if let Some(closed) = procedure.take() {
                program.procedures.push(closed);
            }
            continue;
        }

        if let Some(stmt) = parse_statement(stripped, loc) {
            match procedure.as_mut() {
                Some(proc) => proc.body.push(stmt),
                None => program.main_body.push(stmt),
            }
        }
    }

    if let Some(open) = procedure {
        program.procedures.push(open);
    }
}

fn is_ignorable(stripped: &str) -> bool {
    stripped.is_empty()
        || stripped.starts_with("//")
        || stripped.starts_with("**")
        || (stripped.starts_with('/') && stripped[1..].starts_with(|c: char| c.is_ascii_alphabetic()))
}

fn ends_sql_block(line: &str) -> bool {
    let upper = line.to_ascii_uppercase();
    upper.contains("END-EXEC") || upper.contains("END-SQL") || line.trim_end().ends_with(';')
}

/// Operands after a `DCL-S` keyword (`dcl-s`, `dcls` and `dcl s` spellings).
fn dcl_s_operands(lower: &str) -> Option<&str> {
    ["dcl-s ", "dcl s ", "dcls "]
        .iter()
        .find_map(|prefix| lower.strip_prefix(prefix))
}

/// `name type[(len[:dec])] ...`; anything missing yields no declaration.
fn parse_dcl_s(operands: &str, loc: SourceLocation) -> Option<VarDecl> {
    let mut words = operands.split_whitespace();
    let name = words.next()?.trim_end_matches(';');
    let type_word = words.next()?;
    if !is_word(name) {
        return None;
    }
    let data_type: String = type_word
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    if data_type.is_empty() {
        return None;
    }

    let mut decl = VarDecl::new(loc, name.to_uppercase(), Some(data_type.to_uppercase()));
    if let Some(args) = type_word[data_type.len()..]
        .strip_prefix('(')
        .and_then(|rest| rest.split(')').next())
    {
        let mut parts = args.split(':').map(|p| p.trim().parse::<u32>().ok());
        decl.length = parts.next().flatten();
        decl.decimals = parts.next().flatten();
    }
    Some(decl)
}

fn is_word(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// `RETURN`, `CALL`/`CALLP` and `target = expression`.
fn parse_statement(stripped: &str, loc: SourceLocation) -> Option<Statement> {
    let text = stripped.trim_end_matches(';').trim();
    let upper = text.to_ascii_uppercase();
    let first_word = upper.split_whitespace().next().unwrap_or("");

    if first_word == "RETURN" {
        let value = text[first_word.len()..].trim();
        return Some(Statement::Return {
            value: (!value.is_empty()).then(|| Expr::raw(loc.clone(), value)),
            loc,
        });
    }

    if matches!(first_word, "CALL" | "CALLP") {
        let rest = text[first_word.len()..].trim();
        let (name, args) = match rest.split_once('(') {
            Some((name, args)) => (name.trim(), args.trim_end_matches(')')),
            None => (rest, ""),
        };
        let args = args
            .split(':')
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(|a| Expr::raw(loc.clone(), a))
            .collect();
        return Some(Statement::Call {
            name: name.trim_matches('\'').to_uppercase(),
            args,
            loc,
        });
    }

    if CONDITIONAL_OPCODES.contains(&first_word) || upper.contains(" EXEC ") {
        return None;
    }
    let (target, expr) = text.split_once('=')?;
    let target = target
        .trim()
        .trim_end_matches(['+', '-', '*', '/'])
        .trim();
    let target = if is_eval_opcode(first_word) {
        target
            .split_once(char::is_whitespace)
            .map_or("", |(_, t)| t.trim())
    } else {
        target
    };
    if target.is_empty() {
        return None;
    }
    Some(Statement::Assign {
        target: Expr::raw(loc.clone(), target),
        expr: Expr::raw(loc.clone(), expr.trim()),
        loc,
    })
}

/// `EVAL`, `EVALR` and `EVAL-CORR`, with or without an extender.
fn is_eval_opcode(word: &str) -> bool {
    let opcode = word.split('(').next().unwrap_or(word);
    matches!(opcode, "EVAL" | "EVALR" | "EVAL-CORR")
}
