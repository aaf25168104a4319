//! Token-oriented heuristic DDS parser.
//!
//! Never fails and never reports. Column positions are ignored: the spec
//! type is the first character of the trimmed line, and `A R NAME` is
//! accepted as well as `R NAME`. On a field line the first token is the
//! name; purely numeric tokens fill row, column and length in that order;
//! attribute keywords take their parenthesized value or, written bare, the
//! next token. Every A line inside a record format yields one field: a
//! literal line also yields a constant and its field is nameless, a keyword
//! line also sets record keywords. A lines outside a record format only
//! carry file-level keywords.

use ibmi_lang_core::{Diagnostic, ParseStrategy, QuoteTracker, SourceLocation};

use crate::ast::{insert_keyword, Attribute, Constant, DisplayFile, Field, RecordFormat, ATTRIBUTE_KEYWORDS};

/// Bare keywords that consume the following token as their value.
const VALUE_KEYWORDS: &[&str] = &["DSPATR", "COLOR", "CHECK", "CHGINPDFT", "REF", "TEXT", "CHKMSGID"];

/// The always-succeeding DSPF strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackParser;

impl ParseStrategy for FallbackParser {
    type Ast = DisplayFile;

    fn name(&self) -> &'static str {
        "dspf-fallback"
    }

    fn parse(&self, text: &str, file: &str) -> (DisplayFile, Vec<Diagnostic>) {
        let mut display = DisplayFile::empty(file);

        for (i, line) in text.lines().enumerate() {
            let trimmed = line.trim();
            let mut chars = trimmed.chars();
            let Some(spec) = chars.next().map(|c| c.to_ascii_uppercase()) else {
                continue;
            };
            let content = chars.as_str().trim();
            if spec == '*' || trimmed.starts_with("/*") || content.starts_with('*') {
                continue;
            }
            let loc = display.loc.at(i as u32 + 1, 1);

            let record_marker = content == "R" || content.starts_with("R ");
            match spec {
                'R' => open_record(&mut display, content, loc),
                'A' if record_marker => open_record(&mut display, content[1..].trim(), loc),
                'A' => element(&mut display, content, loc),
                _ => {}
            }
        }
        (display, Vec::new())
    }
}

fn open_record(display: &mut DisplayFile, content: &str, loc: SourceLocation) {
    let items = split_items(content);
    let name = items.first().map_or_else(|| "UNKNOWN".to_string(), |n| n.to_ascii_uppercase());
    let mut record = RecordFormat::new(loc, name);
    for item in items.iter().skip(1) {
        let (name, value) = keyword(item);
        insert_keyword(&mut record.keywords, name, value);
    }
    display.record_formats.push(record);
}

/// A field, a constant or a keyword line.
fn element(display: &mut DisplayFile, content: &str, loc: SourceLocation) {
    let items = split_items(content);
    let Some(first) = items.first() else {
        return;
    };
    if first.contains('(') {
        let target = match display.record_formats.last_mut() {
            Some(record) => &mut record.keywords,
            None => &mut display.file_level_keywords,
        };
        for item in &items {
            let (name, value) = keyword(item);
            insert_keyword(target, name, value);
        }
        if let Some(record) = display.record_formats.last_mut() {
            record.fields.push(Field::new(loc, ""));
        }
        return;
    }
    let Some(record) = display.record_formats.last_mut() else {
        return;
    };

    if is_number(first) || first.starts_with('\'') {
        let mut constant = Constant {
            loc: loc.clone(),
            text: String::new(),
            row: None,
            col: None,
            attributes: Vec::new(),
        };
        let mut numbers = Vec::new();
        let mut rest = Vec::new();
        for item in &items {
            if is_number(item) {
                numbers.push(item.parse().ok());
            } else if item.starts_with('\'') && constant.text.is_empty() {
                constant.text = unquote(item);
            } else {
                rest.push(item.clone());
            }
        }
        constant.row = numbers.first().copied().flatten();
        constant.col = numbers.get(1).copied().flatten();
        let (attributes, _) = classify(&rest, &loc);
        constant.attributes = attributes;
        let mut field = Field::new(loc, "");
        field.row = constant.row;
        field.col = constant.col;
        field.attributes = constant.attributes.clone();
        record.fields.push(field);
        record.constants.push(constant);
        return;
    }

    let mut field = Field::new(loc.clone(), first.to_ascii_uppercase());
    let mut numbers = Vec::new();
    let mut rest = Vec::new();
    for item in &items[1..] {
        if is_number(item) && rest.is_empty() {
            numbers.push(item.parse().ok());
        } else {
            rest.push(item.clone());
        }
    }
    field.row = numbers.first().copied().flatten();
    field.col = numbers.get(1).copied().flatten();
    field.length = numbers.get(2).copied().flatten();
    let (attributes, keywords) = classify(&rest, &loc);
    field.attributes = attributes;
    for (name, value) in keywords {
        insert_keyword(&mut field.keywords, name, value);
    }
    record.fields.push(field);
}

/// Sort tokens into attributes and other keywords. Numbers and stray
/// literals after the position are ignored.
fn classify(items: &[String], loc: &SourceLocation) -> (Vec<Attribute>, Vec<(String, Option<String>)>) {
    let mut attributes = Vec::new();
    let mut keywords = Vec::new();
    let mut iter = items.iter().peekable();
    while let Some(item) = iter.next() {
        if is_number(item) || item.starts_with('\'') {
            continue;
        }
        let (name, mut value) = keyword(item);
        if value.is_none() && VALUE_KEYWORDS.contains(&name.as_str()) {
            value = iter.next().map(|v| v.trim_matches(['(', ')']).to_string());
        }
        if ATTRIBUTE_KEYWORDS.contains(&name.as_str()) {
            attributes.push(Attribute {
                loc: loc.clone(),
                name,
                value,
            });
        } else {
            keywords.push((name, value));
        }
    }
    (attributes, keywords)
}

/// `KWD(value)` or a bare `KWD`.
fn keyword(item: &str) -> (String, Option<String>) {
    match item.split_once('(') {
        Some((name, value)) => (
            name.to_ascii_uppercase(),
            Some(value.strip_suffix(')').unwrap_or(value).trim().to_string()),
        ),
        None => (item.to_ascii_uppercase(), None),
    }
}

fn is_number(item: &str) -> bool {
    !item.is_empty() && item.bytes().all(|b| b.is_ascii_digit())
}

fn unquote(item: &str) -> String {
    let inner = item.trim_start_matches('\'');
    inner.strip_suffix('\'').unwrap_or(inner).replace("''", "'")
}

/// Whitespace split that keeps quoted text and parenthesized values whole.
/// A literal glued to a number (`2'Title'`) becomes two tokens.
fn split_items(text: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut quotes = QuoteTracker::new();
    let mut depth = 0i32;

    for c in text.chars() {
        let opens_literal = c == '\'' && !quotes.in_quotes() && depth == 0;
        if opens_literal && is_number(&current) {
            items.push(std::mem::take(&mut current));
        }
        if !quotes.step(c) {
            match c {
                '(' => depth += 1,
                ')' => depth -= 1,
                _ if c.is_whitespace() && depth <= 0 => {
                    if !current.is_empty() {
                        items.push(std::mem::take(&mut current));
                    }
                    continue;
                }
                _ => {}
            }
        }
        current.push(c);
    }
    if !current.is_empty() {
        items.push(current);
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> DisplayFile {
        let (display, diags) = FallbackParser.parse(text, "F.dspf");
        assert!(diags.is_empty());
        display
    }

    #[test]
    fn test_fields_belong_to_preceding_record() {
        let display = parse("R HEADER\nA TITLE 1 2 30\nA USER 2 2 10\nR DETAIL\nA QTY 5 10 7 DSPATR HI COLOR(RED) REF QTYFLD\n");
        assert_eq!(display.record_formats.len(), 2);
        assert_eq!(display.record_formats[0].fields.len(), 2);
        assert_eq!(display.record_formats[1].fields.len(), 1);
        let title = &display.record_formats[0].fields[0];
        assert_eq!((title.row, title.col, title.length), (Some(1), Some(2), Some(30)));
        let qty = &display.record_formats[1].fields[0];
        let attrs: Vec<_> = qty
            .attributes
            .iter()
            .map(|a| (a.name.as_str(), a.value.as_deref()))
            .collect();
        assert_eq!(attrs, vec![("DSPATR", Some("HI")), ("COLOR", Some("RED"))]);
        assert_eq!(qty.keywords["REF"], "QTYFLD");
    }

    #[test]
    fn test_column_layout_lines() {
        let text = "     A                                      DSPSIZ(24 80 *DS3)
     A          R ORDHDR                    OVERLAY
     A                                  1  2'Order Entry'
     A            CUSNO     5Y 0B  3 10
";
        let display = parse(text);
        assert_eq!(display.file_level_keywords["DSPSIZ"], "24 80 *DS3");
        let record = &display.record_formats[0];
        assert_eq!(record.name, "ORDHDR");
        assert!(record.keywords.contains_key("OVERLAY"));
        assert_eq!(record.constants[0].text, "Order Entry");
        assert_eq!((record.constants[0].row, record.constants[0].col), (Some(1), Some(2)));
        let names: Vec<_> = record.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["", "CUSNO"]);
        assert_eq!((record.fields[0].row, record.fields[0].col), (Some(1), Some(2)));
    }

    #[test]
    fn test_every_record_line_counts_as_a_field() {
        let display = parse("R SCREEN\nA TITLE 1 2\nA 'Hello' 2 2 DSPATR(HI)\nA NAME 5 10 20\nA CF03(03 'Exit')\nR NEXT\nA X 1 1 1");
        let counts: Vec<_> = display.record_formats.iter().map(|r| r.fields.len()).collect();
        assert_eq!(counts, vec![4, 1]);
        let screen = &display.record_formats[0];
        assert_eq!(screen.constants.len(), 1);
        assert_eq!(screen.fields[1].attributes[0].name, "DSPATR");
        assert_eq!(screen.keywords["CF03"], "03 'Exit'");
        assert_eq!(screen.fields[3].name, "");
    }

    #[test]
    fn test_orphan_fields_and_comments_ignored() {
        let display = parse("A STRAY 1 1\n* comment\n     A* dds comment\n/* block */\nR ONLY\n");
        assert_eq!(display.record_formats.len(), 1);
        assert!(display.record_formats[0].fields.is_empty());
    }

    #[test]
    fn test_split_items() {
        assert_eq!(
            split_items("2'It''s here' TEXT('a b') X"),
            vec!["2", "'It''s here'", "TEXT('a b')", "X"]
        );
    }
}
