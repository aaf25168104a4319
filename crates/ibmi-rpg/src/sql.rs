//! Embedded SQL capture shared by every strategy.

use ibmi_lang_core::SourceLocation;

use crate::ast::EmbeddedSql;

/// Statement keywords recognized as the type of an embedded SQL block.
pub const SQL_STATEMENT_TYPES: &[&str] = &[
    "SELECT", "INSERT", "UPDATE", "DELETE", "DECLARE", "FETCH", "OPEN", "CLOSE", "SET", "CALL",
    "COMMIT", "ROLLBACK",
];

/// Only this many leading characters are searched for the statement keyword.
pub const SQL_TYPE_WINDOW: usize = 50;

/// Build an [`EmbeddedSql`] from the raw text between `EXEC SQL` and its
/// terminator.
pub(crate) fn embedded_sql(loc: SourceLocation, raw: &str) -> EmbeddedSql {
    let sql_text = clean_sql_text(raw);
    let stmt_type = guess_sql_type(&sql_text);
    EmbeddedSql {
        loc,
        sql_text,
        stmt_type,
    }
}

/// Trim every line, drop blank ones and remove a trailing `END-EXEC` or `;`.
pub(crate) fn clean_sql_text(raw: &str) -> String {
    let mut text = raw
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    loop {
        let trimmed = text.trim_end();
        let upper = trimmed.to_ascii_uppercase();
        let cut = if upper.ends_with("END-EXEC") {
            trimmed.len() - "END-EXEC".len()
        } else if trimmed.ends_with(';') {
            trimmed.len() - 1
        } else {
            break;
        };
        text = trimmed[..cut].trim_end().to_string();
    }
    text
}

/// The statement keyword that appears earliest within the first
/// [`SQL_TYPE_WINDOW`] characters, matched as a whole word.
pub fn guess_sql_type(sql: &str) -> Option<String> {
    let window: String = sql.chars().take(SQL_TYPE_WINDOW).collect::<String>().to_ascii_uppercase();
    let words = word_offsets(&window);
    SQL_STATEMENT_TYPES
        .iter()
        .filter_map(|kw| {
            words
                .iter()
                .find(|(_, w)| w == kw)
                .map(|(offset, _)| (*offset, *kw))
        })
        .min_by_key(|(offset, _)| *offset)
        .map(|(_, kw)| kw.to_string())
}

fn word_offsets(text: &str) -> Vec<(usize, &str)> {
    let mut words = Vec::new();
    let mut start = None;
    for (i, c) in text.char_indices() {
        let word_char = c.is_ascii_alphanumeric() || c == '_';
        match (word_char, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                words.push((s, &text[s..i]));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        words.push((s, &text[s..]));
    }
    words
}

/// Byte offset where `needle` (ASCII, upper-case) starts in `haystack`,
/// compared case-insensitively.
pub(crate) fn find_ci(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle.as_bytes()))
}
