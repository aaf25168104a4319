//! DSPF abstract syntax tree.

use std::collections::BTreeMap;

use ibmi_lang_core::SourceLocation;
use serde::Serialize;

/// Keywords kept as [`Attribute`]s instead of plain keyword entries.
pub const ATTRIBUTE_KEYWORDS: &[&str] = &["DSPATR", "COLOR", "CHECK", "CHGINPDFT"];

/// A parsed display file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayFile {
    pub loc: SourceLocation,
    pub record_formats: Vec<RecordFormat>,
    /// Keywords that appear before the first record format.
    pub file_level_keywords: BTreeMap<String, String>,
}

impl DisplayFile {
    pub fn empty(file: &str) -> Self {
        Self {
            loc: SourceLocation::start_of(file),
            record_formats: Vec::new(),
            file_level_keywords: BTreeMap::new(),
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.record_formats.iter().flat_map(|r| r.fields.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordFormat {
    pub loc: SourceLocation,
    pub name: String,
    /// Fields in source order.
    pub fields: Vec<Field>,
    pub keywords: BTreeMap<String, String>,
    pub constants: Vec<Constant>,
}

impl RecordFormat {
    pub fn new(loc: SourceLocation, name: impl Into<String>) -> Self {
        Self {
            loc,
            name: name.into(),
            fields: Vec::new(),
            keywords: BTreeMap::new(),
            constants: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub loc: SourceLocation,
    pub name: String,
    pub row: Option<u32>,
    pub col: Option<u32>,
    pub length: Option<u32>,
    /// Data type letter from column 35 (`A`, `S`, `Y`, ...).
    pub data_type: Option<char>,
    pub decimals: Option<u32>,
    pub usage: Option<Usage>,
    pub attributes: Vec<Attribute>,
    pub keywords: BTreeMap<String, String>,
}

impl Field {
    pub fn new(loc: SourceLocation, name: impl Into<String>) -> Self {
        Self {
            loc,
            name: name.into(),
            row: None,
            col: None,
            length: None,
            data_type: None,
            decimals: None,
            usage: None,
            attributes: Vec::new(),
            keywords: BTreeMap::new(),
        }
    }

    /// Whether the user can type into the field.
    pub fn is_input(&self) -> bool {
        matches!(self.usage, Some(Usage::Input | Usage::Both))
    }
}

/// Field usage from column 38.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Usage {
    Both,
    Input,
    Output,
    Hidden,
    Message,
    Program,
}

impl Usage {
    pub fn from_code(code: char) -> Option<Self> {
        match code.to_ascii_uppercase() {
            'B' => Some(Usage::Both),
            'I' => Some(Usage::Input),
            'O' => Some(Usage::Output),
            'H' => Some(Usage::Hidden),
            'M' => Some(Usage::Message),
            'P' => Some(Usage::Program),
            _ => None,
        }
    }
}

/// An attribute keyword (`DSPATR(HI)`, `COLOR(RED)`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
    pub loc: SourceLocation,
    pub name: String,
    pub value: Option<String>,
}

/// Literal text placed on the screen, or a system value such as `DATE`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Constant {
    pub loc: SourceLocation,
    pub text: String,
    pub row: Option<u32>,
    pub col: Option<u32>,
    pub attributes: Vec<Attribute>,
}

/// One entry of a keyword area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum KeywordItem {
    Keyword { name: String, value: Option<String> },
    /// A quoted literal, quotes removed and `''` unescaped.
    Literal(String),
}

/// Split a keyword area into `KWD`, `KWD(value)` and `'literal'` items.
///
/// Fails with a message on an unbalanced parenthesis or quote.
pub(crate) fn parse_keywords(text: &str) -> Result<Vec<KeywordItem>, String> {
    let mut items = Vec::new();
    let mut chars = text.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c == '\'' {
            chars.next();
            items.push(KeywordItem::Literal(read_literal(&mut chars)?));
            continue;
        }
        if c == '(' || c == ')' {
            return Err("unbalanced parenthesis in keywords".to_string());
        }

        let mut name = String::new();
        while let Some(&c) = chars.peek() {
            if c.is_whitespace() || c == '(' || c == '\'' || c == ')' {
                break;
            }
            name.push(c.to_ascii_uppercase());
            chars.next();
        }
        let value = if chars.peek() == Some(&'(') {
            chars.next();
            Some(read_group(&mut chars)?)
        } else {
            None
        };
        items.push(KeywordItem::Keyword { name, value });
    }
    Ok(items)
}

fn read_literal(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Result<String, String> {
    let mut text = String::new();
    loop {
        match chars.next() {
            None => return Err("unterminated literal in keywords".to_string()),
            Some('\'') if chars.peek() == Some(&'\'') => {
                chars.next();
                text.push('\'');
            }
            Some('\'') => return Ok(text),
            Some(c) => text.push(c),
        }
    }
}

/// Contents of a parenthesized value after its `(`, quotes kept.
fn read_group(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Result<String, String> {
    let mut value = String::new();
    let mut depth = 1;
    let mut quoted = false;
    for c in chars.by_ref() {
        if c == '\'' {
            quoted = !quoted;
        } else if !quoted && c == '(' {
            depth += 1;
        } else if !quoted && c == ')' {
            depth -= 1;
            if depth == 0 {
                return Ok(value.trim().to_string());
            }
        }
        value.push(c);
    }
    if quoted {
        Err("unterminated literal in keywords".to_string())
    } else {
        Err("unbalanced parenthesis in keywords".to_string())
    }
}

/// Add a keyword to a map; repeated keywords keep every value.
pub(crate) fn insert_keyword(map: &mut BTreeMap<String, String>, name: String, value: Option<String>) {
    let value = value.unwrap_or_default();
    map.entry(name)
        .and_modify(|existing| {
            if !value.is_empty() {
                if !existing.is_empty() {
                    existing.push(' ');
                }
                existing.push_str(&value);
            }
        })
        .or_insert(value);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kw(name: &str, value: Option<&str>) -> KeywordItem {
        KeywordItem::Keyword {
            name: name.to_string(),
            value: value.map(str::to_string),
        }
    }

    #[test]
    fn test_keyword_items() {
        let items = parse_keywords("CA03(03 'Exit') dspatr(hi)  OVERLAY 'It''s' REF(FLD (A))").unwrap();
        assert_eq!(
            items,
            vec![
                kw("CA03", Some("03 'Exit'")),
                kw("DSPATR", Some("hi")),
                kw("OVERLAY", None),
                KeywordItem::Literal("It's".to_string()),
                kw("REF", Some("FLD (A)")),
            ]
        );
    }

    #[test]
    fn test_keyword_errors() {
        assert_eq!(parse_keywords("COLOR(RED").unwrap_err(), "unbalanced parenthesis in keywords");
        assert_eq!(parse_keywords("TEXT('open").unwrap_err(), "unterminated literal in keywords");
        assert_eq!(parse_keywords("'open").unwrap_err(), "unterminated literal in keywords");
        assert_eq!(parse_keywords("A)").unwrap_err(), "unbalanced parenthesis in keywords");
    }

    #[test]
    fn test_repeated_keywords_accumulate() {
        let mut map = BTreeMap::new();
        insert_keyword(&mut map, "CF03".to_string(), Some("03".to_string()));
        insert_keyword(&mut map, "OVERLAY".to_string(), None);
        insert_keyword(&mut map, "CF03".to_string(), Some("'Exit'".to_string()));
        assert_eq!(map["CF03"], "03 'Exit'");
        assert_eq!(map["OVERLAY"], "");
    }

    #[test]
    fn test_usage_codes() {
        assert_eq!(Usage::from_code('b'), Some(Usage::Both));
        assert_eq!(Usage::from_code('X'), None);
        let mut field = Field::new(SourceLocation::start_of("D.dspf"), "F");
        field.usage = Some(Usage::Input);
        assert!(field.is_input());
    }
}
