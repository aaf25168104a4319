//! DDS read by its column layout.
//!
//! ```text
//! col 6 A | 7 * comment | 8-16 conditioning | 17 name type (R, H) | 19-28 name
//! 29 reference | 30-34 length | 35 data type | 36-37 decimals | 38 usage
//! 39-41 row | 42-44 column | 45-80 keywords
//! ```
//!
//! A keyword area ending in `+` or `-` continues in the keyword area of the
//! next line. Keyword-only lines extend whatever was defined last: the file
//! before the first record format, otherwise the last record, field or
//! constant.

use ibmi_lang_core::{columns, normalize_line_endings, Diagnostic, ParseStrategy, Severity, SourceLocation};

use crate::ast::{
    insert_keyword, parse_keywords, Attribute, Constant, DisplayFile, Field, KeywordItem, RecordFormat, Usage,
    ATTRIBUTE_KEYWORDS,
};

const SPEC: usize = 5;
const COMMENT: usize = 6;
const NAME_TYPE: usize = 16;
const NAME: (usize, usize) = (18, 28);
const LENGTH: (usize, usize) = (29, 34);
const DATA_TYPE: usize = 34;
const DECIMALS: (usize, usize) = (35, 37);
const USAGE: usize = 37;
const ROW: (usize, usize) = (38, 41);
const COL: (usize, usize) = (41, 44);
const KEYWORDS: (usize, usize) = (44, 80);

/// The column-layout DSPF strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrammarParser;

impl ParseStrategy for GrammarParser {
    type Ast = DisplayFile;

    fn name(&self) -> &'static str {
        "dspf-grammar"
    }

    fn parse(&self, text: &str, file: &str) -> (DisplayFile, Vec<Diagnostic>) {
        let text = normalize_line_endings(text);
        let mut parser = DdsParser {
            display: DisplayFile::empty(file),
            diagnostics: Vec::new(),
            lines: text.lines().collect(),
            target: Target::File,
        };
        parser.run();
        (parser.display, parser.diagnostics)
    }
}

/// What a keyword-only line extends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    File,
    Record,
    Field,
    Constant,
}

struct DdsParser<'t> {
    display: DisplayFile,
    diagnostics: Vec<Diagnostic>,
    lines: Vec<&'t str>,
    target: Target,
}

/// The numeric columns of one spec line.
#[derive(Debug, Default)]
struct Position {
    length: Option<u32>,
    decimals: Option<u32>,
    row: Option<u32>,
    col: Option<u32>,
}

impl DdsParser<'_> {
    fn error(&mut self, line: usize, column: usize, message: impl Into<String>) {
        let loc = self.display.loc.at(line as u32, column as u32);
        self.diagnostics.push(Diagnostic::at(&loc, Severity::Error, message));
    }

    fn run(&mut self) {
        let mut i = 0;
        while i < self.lines.len() {
            let line = self.lines[i];
            let number = i + 1;
            i += 1;
            if line.trim().is_empty() {
                continue;
            }
            match columns::char_at(line, SPEC) {
                Some('A' | 'a' | ' ') => {}
                Some(other) => {
                    self.error(number, SPEC + 1, format!("expected 'A' in column 6, found '{other}'"));
                    continue;
                }
                None => {
                    self.error(number, 1, "expected 'A' in column 6, found end of line");
                    continue;
                }
            }
            if columns::char_at(line, COMMENT) == Some('*') {
                continue;
            }

            let mut keywords = columns::slice(line, KEYWORDS.0, KEYWORDS.1).trim_end().to_string();
            while let Some(marker) = keywords.chars().last().filter(|c| *c == '+' || *c == '-') {
                let Some(next) = self.lines.get(i) else {
                    break;
                };
                i += 1;
                keywords.pop();
                let more = columns::slice(next, KEYWORDS.0, KEYWORDS.1);
                keywords.push_str(if marker == '+' { more.trim() } else { more.trim_end() });
            }
            self.spec_line(line, number, &keywords);
        }
    }

    fn spec_line(&mut self, line: &str, number: usize, keywords: &str) {
        let items = match parse_keywords(keywords) {
            Ok(items) => items,
            Err(message) => {
                self.error(number, KEYWORDS.0 + 1, message);
                return;
            }
        };
        let Some(position) = self.position(line, number) else {
            return;
        };
        let loc = self.display.loc.at(number as u32, 1);
        let name = columns::field(line, NAME.0, NAME.1).map(str::to_ascii_uppercase);

        match columns::char_at(line, NAME_TYPE).unwrap_or(' ').to_ascii_uppercase() {
            'R' => {
                let Some(name) = name else {
                    self.error(number, NAME.0 + 1, "record format name missing");
                    return;
                };
                let mut record = RecordFormat::new(loc, name);
                for (name, value) in keyword_pairs(items) {
                    insert_keyword(&mut record.keywords, name, value);
                }
                self.display.record_formats.push(record);
                self.target = Target::Record;
            }
            // Help specifications belong to the record being defined.
            'H' => {
                if !self.display.record_formats.is_empty() {
                    self.target = Target::Record;
                }
                self.extend(items, &loc);
            }
            ' ' => match name {
                Some(name) => self.field(line, number, name, position, items, loc),
                None if position.row.is_some() || items.iter().any(|i| matches!(i, KeywordItem::Literal(_))) => {
                    self.constant(number, position, items, loc)
                }
                None => self.extend(items, &loc),
            },
            other => self.error(number, NAME_TYPE + 1, format!("invalid name type '{other}'")),
        }
    }

    fn position(&mut self, line: &str, number: usize) -> Option<Position> {
        let mut position = Position::default();
        let mut valid = true;
        let targets = [
            (LENGTH, "length", &mut position.length),
            (DECIMALS, "decimals", &mut position.decimals),
            (ROW, "row", &mut position.row),
            (COL, "column", &mut position.col),
        ];
        let mut errors = Vec::new();
        for ((start, end), what, slot) in targets {
            let Some(text) = columns::field(line, start, end) else {
                continue;
            };
            match text.trim_start_matches(['+', '-']).parse::<u32>() {
                Ok(value) => *slot = Some(value),
                Err(_) => {
                    errors.push((start + 1, format!("invalid {what} '{text}'")));
                    valid = false;
                }
            }
        }
        for (column, message) in errors {
            self.error(number, column, message);
        }
        valid.then_some(position)
    }

    fn field(
        &mut self,
        line: &str,
        number: usize,
        name: String,
        position: Position,
        items: Vec<KeywordItem>,
        loc: SourceLocation,
    ) {
        if self.display.record_formats.is_empty() {
            self.error(number, NAME.0 + 1, format!("field {name} defined before any record format"));
            return;
        }
        let usage = match columns::char_at(line, USAGE).filter(|c| *c != ' ') {
            Some(code) => match Usage::from_code(code) {
                Some(usage) => Some(usage),
                None => {
                    self.error(number, USAGE + 1, format!("invalid usage '{code}'"));
                    return;
                }
            },
            None => None,
        };

        let mut field = Field::new(loc.clone(), name);
        field.length = position.length;
        field.decimals = position.decimals;
        field.row = position.row;
        field.col = position.col;
        field.data_type = columns::char_at(line, DATA_TYPE)
            .filter(|c| *c != ' ')
            .map(|c| c.to_ascii_uppercase());
        field.usage = usage;
        let (attributes, keywords) = split_attributes(items, &loc);
        field.attributes = attributes;
        for (name, value) in keywords {
            insert_keyword(&mut field.keywords, name, value);
        }
        if let Some(record) = self.display.record_formats.last_mut() {
            record.fields.push(field);
        }
        self.target = Target::Field;
    }

    /// A literal or a system value such as `DATE` placed at a position.
    fn constant(
        &mut self,
        number: usize,
        position: Position,
        items: Vec<KeywordItem>,
        loc: SourceLocation,
    ) {
        let Some(record) = self.display.record_formats.last_mut() else {
            self.error(number, COL.1 + 1, "constant defined before any record format");
            return;
        };
        let text = items
            .iter()
            .find_map(|item| match item {
                KeywordItem::Literal(text) => Some(text.clone()),
                _ => None,
            })
            .or_else(|| {
                items.iter().find_map(|item| match item {
                    KeywordItem::Keyword { name, .. } if !ATTRIBUTE_KEYWORDS.contains(&name.as_str()) => {
                        Some(name.clone())
                    }
                    _ => None,
                })
            })
            .unwrap_or_default();
        let (attributes, _) = split_attributes(items, &loc);
        record.constants.push(Constant {
            loc,
            text,
            row: position.row,
            col: position.col,
            attributes,
        });
        self.target = Target::Constant;
    }

    /// Keywords on a line with no name or position.
    fn extend(&mut self, items: Vec<KeywordItem>, loc: &SourceLocation) {
        let record = self.display.record_formats.last_mut();
        match (self.target, record) {
            (Target::Field, Some(record)) => {
                if let Some(field) = record.fields.last_mut() {
                    let (attributes, keywords) = split_attributes(items, loc);
                    field.attributes.extend(attributes);
                    for (name, value) in keywords {
                        insert_keyword(&mut field.keywords, name, value);
                    }
                }
            }
            (Target::Constant, Some(record)) => {
                if let Some(constant) = record.constants.last_mut() {
                    let (attributes, _) = split_attributes(items, loc);
                    constant.attributes.extend(attributes);
                }
            }
            (Target::Record, Some(record)) => {
                for (name, value) in keyword_pairs(items) {
                    insert_keyword(&mut record.keywords, name, value);
                }
            }
            _ => {
                for (name, value) in keyword_pairs(items) {
                    insert_keyword(&mut self.display.file_level_keywords, name, value);
                }
            }
        }
    }
}

fn keyword_pairs(items: Vec<KeywordItem>) -> impl Iterator<Item = (String, Option<String>)> {
    items.into_iter().filter_map(|item| match item {
        KeywordItem::Keyword { name, value } => Some((name, value)),
        KeywordItem::Literal(_) => None,
    })
}

/// Separate attribute keywords from the rest. Literals are dropped.
pub(crate) fn split_attributes(
    items: Vec<KeywordItem>,
    loc: &SourceLocation,
) -> (Vec<Attribute>, Vec<(String, Option<String>)>) {
    let mut attributes = Vec::new();
    let mut keywords = Vec::new();
    for (name, value) in keyword_pairs(items) {
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

#[cfg(test)]
mod tests {
    use super::*;

    const ORDERS: &str = "     A*  Order entry screen
     A                                      DSPSIZ(27 132 *DS4)
     A                                      CA03(03 'Exit')
     A          R ORDHDR
     A                                      OVERLAY
     A                                  1  2'Order Entry'
     A                                      COLOR(WHT)
     A            CUSNO          5Y 0B  3 10DSPATR(HI) CHECK(RZ)
     A                                      EDTCDE(Z)
     A            CUSNAM        30A  O  3 20
     A          R ORDDTL
     A            QTY            7S 2I  5 10COLOR(RED) TEXT('Quantity +
     A                                      ordered')
     A                                  1 70DATE
";

    fn parse(text: &str) -> (DisplayFile, Vec<Diagnostic>) {
        GrammarParser.parse(text, "ORD.dspf")
    }

    #[test]
    fn test_records_and_fields() {
        let (display, diags) = parse(ORDERS);
        assert!(diags.is_empty(), "{diags:?}");
        assert_eq!(display.file_level_keywords["DSPSIZ"], "27 132 *DS4");
        assert_eq!(display.file_level_keywords["CA03"], "03 'Exit'");

        let names: Vec<_> = display.record_formats.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["ORDHDR", "ORDDTL"]);
        let hdr = &display.record_formats[0];
        assert!(hdr.keywords.contains_key("OVERLAY"));
        assert_eq!(hdr.fields.len(), 2);
        assert_eq!(hdr.constants.len(), 1);
        assert_eq!(hdr.constants[0].text, "Order Entry");
        assert_eq!((hdr.constants[0].row, hdr.constants[0].col), (Some(1), Some(2)));
        assert_eq!(hdr.constants[0].attributes[0].value.as_deref(), Some("WHT"));

        let cusno = &hdr.fields[0];
        assert_eq!(cusno.name, "CUSNO");
        assert_eq!((cusno.length, cusno.data_type, cusno.decimals), (Some(5), Some('Y'), Some(0)));
        assert_eq!(cusno.usage, Some(Usage::Both));
        assert_eq!((cusno.row, cusno.col), (Some(3), Some(10)));
        let attrs: Vec<_> = cusno.attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(attrs, vec!["DSPATR", "CHECK"]);
        assert_eq!(cusno.keywords["EDTCDE"], "Z");
        assert_eq!(hdr.fields[1].usage, Some(Usage::Output));
    }

    #[test]
    fn test_continuation_and_system_constant() {
        let (display, diags) = parse(ORDERS);
        assert!(diags.is_empty());
        let dtl = &display.record_formats[1];
        assert_eq!(dtl.fields[0].keywords["TEXT"], "'Quantity ordered'");
        assert!(dtl.fields[0].is_input());
        assert_eq!(dtl.constants[0].text, "DATE");
        assert_eq!(dtl.constants[0].col, Some(70));
    }

    #[test]
    fn test_errors() {
        let text = "     A            EARLY         10A  O  1  2
     A          R REC
     A            BAD           1X   O  1  2
     A            F2            10A  Q  1  2
     A                                      COLOR(RED
     X          R OTHER
";
        let (_, diags) = parse(text);
        let messages: Vec<_> = diags.iter().map(ToString::to_string).collect();
        assert_eq!(
            messages,
            vec![
                "ORD.dspf:1:19: [error] field EARLY defined before any record format",
                "ORD.dspf:3:30: [error] invalid length '1X'",
                "ORD.dspf:4:38: [error] invalid usage 'Q'",
                "ORD.dspf:5:45: [error] unbalanced parenthesis in keywords",
                "ORD.dspf:6:6: [error] expected 'A' in column 6, found 'X'",
            ]
        );
    }

    #[test]
    fn test_short_and_comment_lines() {
        let (display, diags) = parse("     A*\n\n     A          R ONLY\n");
        assert!(diags.is_empty());
        assert_eq!(display.record_formats.len(), 1);
        let (_, diags) = parse("R X\n");
        assert_eq!(diags[0].message, "expected 'A' in column 6, found end of line");
    }
}
