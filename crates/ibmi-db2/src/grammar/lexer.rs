//! SQL tokenizer.
//!
//! Works on normalized text. Ordinary identifiers are upper-cased; delimited
//! (`"quoted"`) identifiers keep their case. `--` and `/* */` comments
//! produce no tokens.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Ident,
    /// `"delimited"` identifier, stored with its quotes.
    QuotedIdent,
    /// `'string'`, stored with its quotes and `''` escapes.
    String,
    Number,
    /// `?` or `:host` variable.
    Parameter,
    Operator,
    Comma,
    Dot,
    LParen,
    RParen,
    Semicolon,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub start: u32,
    pub end: u32,
}

impl Token {
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Ident && self.text == keyword
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LexError {
    pub offset: u32,
    pub message: String,
}

pub(crate) fn tokenize(src: &str) -> (Vec<Token>, Vec<LexError>) {
    let mut lexer = Lexer {
        src,
        bytes: src.as_bytes(),
        pos: 0,
        tokens: Vec::new(),
        errors: Vec::new(),
    };
    lexer.run();
    (lexer.tokens, lexer.errors)
}

struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    tokens: Vec<Token>,
    errors: Vec<LexError>,
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || matches!(b, b'_' | b'#' | b'@' | b'$')
}

fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'#' | b'@' | b'$')
}

impl<'a> Lexer<'a> {
    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn push(&mut self, kind: TokenKind, start: usize, text: String) {
        self.tokens.push(Token {
            kind,
            text,
            start: start as u32,
            end: self.pos as u32,
        });
    }

    fn single(&mut self, kind: TokenKind) {
        let start = self.pos;
        self.pos += 1;
        self.push(kind, start, self.src[start..self.pos].to_string());
    }

    fn error(&mut self, offset: usize, message: impl Into<String>) {
        self.errors.push(LexError {
            offset: offset as u32,
            message: message.into(),
        });
    }

    fn run(&mut self) {
        while let Some(b) = self.peek_at(0) {
            let start = self.pos;
            match b {
                b' ' | b'\t' | b'\n' | b'\x0c' => self.pos += 1,
                b'-' if self.peek_at(1) == Some(b'-') => {
                    while self.peek_at(0).is_some_and(|c| c != b'\n') {
                        self.pos += 1;
                    }
                }
                b'/' if self.peek_at(1) == Some(b'*') => match self.src[start + 2..].find("*/") {
                    Some(rel) => self.pos = start + 2 + rel + 2,
                    None => {
                        self.error(start, "unterminated comment");
                        self.pos = self.bytes.len();
                    }
                },
                b'\'' => self.quoted(b'\'', TokenKind::String, "unterminated string"),
                b'"' => self.quoted(b'"', TokenKind::QuotedIdent, "unterminated delimited identifier"),
                b if is_ident_start(b) => {
                    while self.peek_at(0).is_some_and(is_ident_char) {
                        self.pos += 1;
                    }
                    self.push(TokenKind::Ident, start, self.src[start..self.pos].to_ascii_uppercase());
                }
                b if b.is_ascii_digit() => self.number(),
                b'.' if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => self.number(),
                b'?' => self.single(TokenKind::Parameter),
                b':' if self.peek_at(1).is_some_and(is_ident_start) => {
                    self.pos += 1;
                    while self.peek_at(0).is_some_and(is_ident_char) {
                        self.pos += 1;
                    }
                    self.push(TokenKind::Parameter, start, self.src[start..self.pos].to_ascii_uppercase());
                }
                b',' => self.single(TokenKind::Comma),
                b'.' => self.single(TokenKind::Dot),
                b'(' => self.single(TokenKind::LParen),
                b')' => self.single(TokenKind::RParen),
                b';' => self.single(TokenKind::Semicolon),
                b'=' | b'<' | b'>' | b'!' | b'|' | b'+' | b'-' | b'*' | b'/' | b'%' => self.operator(),
                _ => {
                    let ch = self.src[start..].chars().next().unwrap_or('?');
                    if ch == '¬' {
                        // DB2 "not" sign: ¬=, ¬<, ¬>
                        self.pos += ch.len_utf8();
                        if matches!(self.peek_at(0), Some(b'=' | b'<' | b'>')) {
                            self.pos += 1;
                        }
                        self.push(TokenKind::Operator, start, self.src[start..self.pos].to_string());
                    } else {
                        self.error(start, format!("unexpected character '{ch}'"));
                        self.pos += ch.len_utf8();
                    }
                }
            }
        }
    }

    /// A `quote`-delimited token with doubled-quote escapes; may span lines.
    fn quoted(&mut self, quote: u8, kind: TokenKind, unterminated: &str) {
        let start = self.pos;
        self.pos += 1;
        loop {
            match self.peek_at(0) {
                None => {
                    self.error(start, unterminated);
                    return;
                }
                Some(q) if q == quote && self.peek_at(1) == Some(quote) => self.pos += 2,
                Some(q) if q == quote => {
                    self.pos += 1;
                    self.push(kind, start, self.src[start..self.pos].to_string());
                    return;
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    fn number(&mut self) {
        let start = self.pos;
        while self.peek_at(0).is_some_and(|c| c.is_ascii_digit() || c == b'.') {
            self.pos += 1;
        }
        if matches!(self.peek_at(0), Some(b'E' | b'e'))
            && self
                .peek_at(1)
                .is_some_and(|c| c.is_ascii_digit() || ((c == b'+' || c == b'-') && self.peek_at(2).is_some_and(|d| d.is_ascii_digit())))
        {
            self.pos += 2;
            while self.peek_at(0).is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        self.push(TokenKind::Number, start, self.src[start..self.pos].to_string());
    }

    fn operator(&mut self) {
        let start = self.pos;
        let two = self.src.get(start..start + 2).unwrap_or("");
        let len = match two {
            "<=" | ">=" | "<>" | "!=" | "||" => 2,
            _ => 1,
        };
        self.pos += len;
        self.push(TokenKind::Operator, start, self.src[start..self.pos].to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let (tokens, errors) = tokenize(src);
        assert!(errors.is_empty(), "{errors:?}");
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_select_tokens() {
        use TokenKind::*;
        assert_eq!(
            kinds("select a, b from lib.tbl where c >= ?;"),
            vec![Ident, Ident, Comma, Ident, Ident, Ident, Dot, Ident, Ident, Ident, Operator, Parameter, Semicolon]
        );
    }

    #[test]
    fn test_identifiers_upper_cased_except_delimited() {
        let (tokens, _) = tokenize("custNo \"Mixed Case\" :hostVar");
        let texts: Vec<_> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["CUSTNO", "\"Mixed Case\"", ":HOSTVAR"]);
    }

    #[test]
    fn test_comments_skipped() {
        use TokenKind::*;
        assert_eq!(kinds("-- header\nSELECT /* inline\n */ 1 -- trailing"), vec![Ident, Number]);
    }

    #[test]
    fn test_string_escapes_and_semicolons() {
        let (tokens, errors) = tokenize("'it''s; fine'");
        assert!(errors.is_empty());
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].text, "'it''s; fine'");
    }

    #[test]
    fn test_numbers() {
        let (tokens, _) = tokenize("1 2.50 .5 1E3 1e-2");
        let texts: Vec<_> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["1", "2.50", ".5", "1E3", "1e-2"]);
    }

    #[test]
    fn test_operators() {
        let (tokens, _) = tokenize("a<>b || c ¬= d");
        let ops: Vec<_> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Operator)
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(ops, vec!["<>", "||", "¬="]);
    }

    #[test]
    fn test_errors() {
        assert_eq!(tokenize("'abc").1[0].message, "unterminated string");
        assert_eq!(tokenize("/* abc").1[0].message, "unterminated comment");
        assert_eq!(tokenize("\"abc").1[0].message, "unterminated delimited identifier");
        assert_eq!(tokenize("a ` b").1[0].message, "unexpected character '`'");
    }
}
