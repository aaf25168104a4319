//! Column-slicing scan of fixed-format source.
//!
//! Only the spec letter is read from its true column. The operation code is
//! taken from a fixed window of the content after it, which matches compact
//! sources but not the full RPG IV calculation layout; the grammar strategy
//! handles that.

use ibmi_lang_core::{columns, SourceLocation};

use crate::ast::{Expr, Procedure, Program, Statement, VarDecl};
use crate::sql::{embedded_sql, find_ci};

/// 0-based index of the spec letter (column 6).
pub const SPEC_COLUMN: usize = 5;
/// 0-based index where line content starts (column 7).
pub const CONTENT_COLUMN: usize = 6;
/// Lines shorter than this carry no content.
pub const MIN_LINE_LEN: usize = 7;
/// Opcode window within the content.
pub const OPCODE_START: usize = 6;
pub const OPCODE_END: usize = 14;
/// Width of a procedure name on a `P` line.
pub const PROC_NAME_WIDTH: usize = 10;
/// 0-based index of the begin/end marker on a `P` line (column 24).
const PROC_MARKER_COLUMN: usize = 23;

pub(super) fn parse(program: &mut Program, text: &str) {
    let lines: Vec<&str> = text.lines().collect();
    let mut procedure: Option<Procedure> = None;

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        let loc = program.loc.at(i as u32 + 1, SPEC_COLUMN as u32 + 1);
        i += 1;

        if line.chars().count() < MIN_LINE_LEN {
            continue;
        }
        let spec = columns::char_at(line, SPEC_COLUMN).map(|c| c.to_ascii_uppercase());
        let content = columns::from(line, CONTENT_COLUMN).trim_end();
        if content.trim().is_empty() || content.starts_with('*') {
            continue;
        }

        match spec {
            Some('D') => {
                let mut parts = content.split_whitespace();
                if let (Some(name), Some(kind)) = (parts.next(), parts.next()) {
                    program
                        .variables
                        .push(VarDecl::new(loc, name.to_uppercase(), Some(kind.to_uppercase())));
                }
            }
            Some('P') => {
                let marker = columns::char_at(line, PROC_MARKER_COLUMN).map(|c| c.to_ascii_uppercase());
                if let Some(open) = procedure.take() {
                    program.procedures.push(open);
                }
                if marker != Some('E') {
                    let name = columns::field(content, 0, PROC_NAME_WIDTH).unwrap_or("unknown");
                    procedure = Some(Procedure::new(loc, name.to_uppercase()));
                }
            }
            Some('C') if find_ci(content, "/EXEC SQL") == Some(0) => {
                let mut raw = columns::from(content, "/EXEC SQL".len()).to_string();
                while i < lines.len() {
                    let next = lines[i];
                    i += 1;
                    let body = columns::from(next, CONTENT_COLUMN);
                    if find_ci(body, "/END-EXEC") == Some(0) {
                        break;
                    }
                    raw.push('\n');
                    raw.push_str(body.strip_prefix('+').unwrap_or(body));
                }
                let sql = embedded_sql(loc, &raw);
                if let Some(proc) = procedure.as_mut() {
                    proc.body.push(Statement::EmbeddedSql(sql.clone()));
                }
                program.sql_statements.push(sql);
            }
            Some('C') => {
                if let Some(stmt) = parse_calc(content, loc) {
                    match procedure.as_mut() {
                        Some(proc) => proc.body.push(stmt),
                        None => program.main_body.push(stmt),
                    }
                }
            }
            _ => {}
        }
    }

    if let Some(open) = procedure {
        program.procedures.push(open);
    }
}

fn parse_calc(content: &str, loc: SourceLocation) -> Option<Statement> {
    let (opcode, rest) = if content.chars().count() > OPCODE_END {
        (
            columns::slice(content, OPCODE_START, OPCODE_END).trim().to_ascii_uppercase(),
            columns::from(content, OPCODE_END).trim(),
        )
    } else {
        (String::new(), content.trim())
    };
    let opcode = opcode.split('(').next().unwrap_or("");

    match opcode {
        "EVAL" | "EVALR" | "EVAL-CORR" => {
            let (target, expr) = rest.split_once('=')?;
            Some(Statement::Assign {
                target: Expr::raw(loc.clone(), target.trim()),
                expr: Expr::raw(loc.clone(), expr.trim()),
                loc,
            })
        }
        "CALL" => {
            let name = rest.split_whitespace().next()?.trim_matches('\'');
            Some(Statement::Call {
                name: name.to_uppercase(),
                args: Vec::new(),
                loc,
            })
        }
        "RETURN" | "LEAVE" => Some(Statement::Return { loc, value: None }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(text: &str) -> Program {
        let mut program = Program::empty("T.rpgle", false);
        parse(&mut program, text);
        program
    }

    #[test]
    fn test_short_lines_carry_no_content() {
        let p = scan("\nC\n     C\n  D\n     D \n");
        assert!(p.variables.is_empty());
        assert!(p.main_body.is_empty());
    }

    #[test]
    fn test_declarations() {
        let p = scan("     D count           S             10I 0\n     D*comment here\n");
        assert_eq!(p.variables.len(), 1);
        assert_eq!(p.variables[0].name, "COUNT");
        assert_eq!(p.variables[0].data_type.as_deref(), Some("S"));
        assert_eq!(p.variables[0].loc.line, 1);
    }

    #[test]
    fn test_opcode_window() {
        // content[6..14] holds the opcode, the remainder starts at content[14].
        let p = scan(concat!(
            "     C      EVAL    total = total + 1\n",
            "     C      CALL    'PRTLBL'\n",
            "     C      RETURN  result\n",
            // A bare opcode leaves nothing past the window.
            "     C      RETURN\n",
        ));
        assert_eq!(p.main_body.len(), 3);
        match &p.main_body[0] {
            Statement::Assign { target, expr, .. } => {
                assert_eq!(target.text(), "total");
                assert_eq!(expr.text(), "total + 1");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(&p.main_body[1], Statement::Call { name, .. } if name == "PRTLBL"));
        assert!(matches!(&p.main_body[2], Statement::Return { .. }));
    }

    #[test]
    fn test_procedures() {
        let p = scan(concat!(
            "     PCalcTax          B\n",
            "     C      RETURN  x\n",
            "     PCalcTax          E\n",
            "     C      LEAVE   x\n",
        ));
        assert_eq!(p.procedures.len(), 1);
        assert_eq!(p.procedures[0].name, "CALCTAX");
        assert_eq!(p.procedures[0].body.len(), 1);
        assert_eq!(p.main_body.len(), 1);
    }

    #[test]
    fn test_exec_sql_directive() {
        let p = scan(concat!(
            "     C/EXEC SQL\n",
            "     C+ SELECT NAME INTO :NAME\n",
            "     C+   FROM CUSTOMER\n",
            "     C/END-EXEC\n",
        ));
        assert_eq!(p.sql_statements.len(), 1);
        assert_eq!(p.sql_statements[0].sql_text, "SELECT NAME INTO :NAME\nFROM CUSTOMER");
        assert!(p.main_body.is_empty());
    }
}
