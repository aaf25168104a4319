//! CL tokenizer.
//!
//! Operates on normalized text. Continuation markers are resolved here: a
//! `+` or `-` that is the last non-blank character of a line joins the next
//! line. With `+` the next line's leading blanks are dropped, with `-` they
//! are kept (this only matters inside quoted strings). Comments may span
//! lines and produce no tokens.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    /// Command, keyword or object name, possibly library-qualified.
    Name,
    /// `*SPECIAL` value or `*CAT`-style operator.
    Special,
    /// `&VARIABLE`.
    Variable,
    /// `'quoted'` string, stored with its quotes.
    String,
    Number,
    LParen,
    RParen,
    Colon,
    Operator,
    /// End of a logical command.
    Newline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// Byte offset of the first character.
    pub start: u32,
    /// Byte offset just past the last character.
    pub end: u32,
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

fn is_name_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || matches!(b, b'_' | b'#' | b'@' | b'$' | b'%')
}

fn is_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'#' | b'@' | b'$' | b'.')
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

    fn error(&mut self, offset: usize, message: impl Into<String>) {
        self.errors.push(LexError {
            offset: offset as u32,
            message: message.into(),
        });
    }

    /// If the byte at `at` is the last non-blank byte of its line, return the
    /// offset of the terminating newline (or end of input).
    fn trailing_marker_end(&self, at: usize) -> Option<usize> {
        let mut i = at + 1;
        while i < self.bytes.len() {
            match self.bytes[i] {
                b' ' | b'\t' => i += 1,
                b'\n' => return Some(i),
                _ => return None,
            }
        }
        Some(i)
    }

    /// Consume a continuation marker at `self.pos` ending its line at `eol`.
    fn continue_line(&mut self, eol: usize) {
        let marker = self.bytes[self.pos];
        if eol >= self.bytes.len() || eol + 1 >= self.bytes.len() {
            self.error(self.pos, "continuation marker on the last line");
            self.pos = self.bytes.len();
            return;
        }
        self.pos = eol + 1;
        if marker == b'+' {
            while matches!(self.peek_at(0), Some(b' ' | b'\t')) {
                self.pos += 1;
            }
        }
    }

    fn run(&mut self) {
        while let Some(b) = self.peek_at(0) {
            let start = self.pos;
            match b {
                b' ' | b'\t' => self.pos += 1,
                b'\n' => {
                    self.pos += 1;
                    if self.tokens.last().map(|t| t.kind) != Some(TokenKind::Newline) {
                        self.push(TokenKind::Newline, start, String::new());
                    }
                }
                b'/' if self.peek_at(1) == Some(b'*') => self.comment(),
                b'+' | b'-' if self.trailing_marker_end(self.pos).is_some() => {
                    let eol = self.trailing_marker_end(self.pos).unwrap_or(self.bytes.len());
                    self.continue_line(eol);
                }
                b'\'' => self.string(),
                b'&' => {
                    self.pos += 1;
                    while self.peek_at(0).is_some_and(is_name_char) {
                        self.pos += 1;
                    }
                    if self.pos == start + 1 {
                        self.error(start, "'&' must be followed by a variable name");
                    }
                    self.push(TokenKind::Variable, start, self.src[start..self.pos].to_uppercase());
                }
                b'*' if self.peek_at(1).is_some_and(|c| c.is_ascii_alphabetic()) => {
                    self.pos += 1;
                    while self.peek_at(0).is_some_and(is_name_char) {
                        self.pos += 1;
                    }
                    self.push(TokenKind::Special, start, self.src[start..self.pos].to_uppercase());
                }
                b if is_name_start(b) => self.name(),
                b if b.is_ascii_digit() => {
                    while self.peek_at(0).is_some_and(|c| c.is_ascii_digit() || c == b'.') {
                        self.pos += 1;
                    }
                    self.push(TokenKind::Number, start, self.src[start..self.pos].to_string());
                }
                b'(' => {
                    self.pos += 1;
                    self.push(TokenKind::LParen, start, "(".to_string());
                }
                b')' => {
                    self.pos += 1;
                    self.push(TokenKind::RParen, start, ")".to_string());
                }
                b':' => {
                    self.pos += 1;
                    self.push(TokenKind::Colon, start, ":".to_string());
                }
                b'|' | b'<' | b'>' | b'=' | b'+' | b'-' | b'*' | b'/' | b'!' | b',' => {
                    self.operator();
                }
                _ => {
                    let ch = self.src[start..].chars().next().unwrap_or('?');
                    self.error(start, format!("unexpected character '{ch}'"));
                    self.pos += ch.len_utf8();
                }
            }
        }
    }

    fn comment(&mut self) {
        let start = self.pos;
        match self.src[start + 2..].find("*/") {
            Some(rel) => self.pos = start + 2 + rel + 2,
            None => {
                self.error(start, "unterminated comment");
                self.pos = self.bytes.len();
            }
        }
    }

    fn string(&mut self) {
        let start = self.pos;
        let mut text = String::from("'");
        self.pos += 1;
        let mut segment = self.pos;

        loop {
            match self.peek_at(0) {
                None => {
                    self.error(start, "unterminated string");
                    return;
                }
                Some(b'\n') => {
                    self.error(start, "unterminated string");
                    return;
                }
                Some(b'\'') if self.peek_at(1) == Some(b'\'') => self.pos += 2,
                Some(b'\'') => {
                    self.pos += 1;
                    text.push_str(&self.src[segment..self.pos]);
                    self.push(TokenKind::String, start, text);
                    return;
                }
                Some(b'+' | b'-') => match self.trailing_marker_end(self.pos) {
                    Some(eol) => {
                        text.push_str(&self.src[segment..self.pos]);
                        self.continue_line(eol);
                        segment = self.pos;
                    }
                    None => self.pos += 1,
                },
                Some(_) => self.pos += 1,
            }
        }
    }

    fn name(&mut self) {
        let start = self.pos;
        self.pos += 1;
        loop {
            match self.peek_at(0) {
                Some(c) if is_name_char(c) => self.pos += 1,
                // Library qualification: QGPL/ORDERS
                Some(b'/') if self.peek_at(1).is_some_and(is_name_start) => self.pos += 1,
                _ => break,
            }
        }
        self.push(TokenKind::Name, start, self.src[start..self.pos].to_uppercase());
    }

    fn operator(&mut self) {
        let start = self.pos;
        let two = self.src.get(start..start + 2).unwrap_or("");
        let len = match two {
            "||" | "|>" | "|<" | "<=" | ">=" | "<>" | "!=" | "*=" => 2,
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
    fn test_basic_command() {
        use TokenKind::*;
        assert_eq!(
            kinds("DCL VAR(&X) TYPE(*CHAR) LEN(10)"),
            vec![Name, Name, LParen, Variable, RParen, Name, LParen, Special, RParen, Name, LParen, Number, RParen]
        );
    }

    #[test]
    fn test_label_and_qualified_name() {
        let (tokens, _) = tokenize("loop: call qgpl/orders");
        let texts: Vec<_> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["LOOP", ":", "CALL", "QGPL/ORDERS"]);
    }

    #[test]
    fn test_comment_spanning_lines() {
        use TokenKind::*;
        assert_eq!(kinds("PGM /* a\nb */ PARM(&A)"), vec![Name, Name, LParen, Variable, RParen]);
    }

    #[test]
    fn test_plus_continuation() {
        let (tokens, errors) = tokenize("CHGVAR VAR(&A) +\n       VALUE(1)\n");
        assert!(errors.is_empty());
        let newlines = tokens.iter().filter(|t| t.kind == TokenKind::Newline).count();
        assert_eq!(newlines, 1);
        assert_eq!(tokens.len(), 10);
    }

    #[test]
    fn test_continuation_inside_string() {
        let (tokens, errors) = tokenize("SNDMSG MSG('ABC +\n     DEF') \nX MSG('A -\n  B')");
        assert!(errors.is_empty());
        assert_eq!(tokens[3].text, "'ABC DEF'");
        let last_string = tokens.iter().rev().find(|t| t.kind == TokenKind::String).unwrap();
        assert_eq!(last_string.text, "'A   B'");
    }

    #[test]
    fn test_doubled_quote_escape() {
        let (tokens, errors) = tokenize("X 'it''s'");
        assert!(errors.is_empty());
        assert_eq!(tokens[1].text, "'it''s'");
    }

    #[test]
    fn test_arithmetic_operator_not_continuation() {
        use TokenKind::*;
        assert_eq!(
            kinds("CHGVAR &I (&I + 1)"),
            vec![Name, Variable, LParen, Variable, Operator, Number, RParen]
        );
    }

    #[test]
    fn test_errors() {
        assert_eq!(tokenize("X 'abc").1[0].message, "unterminated string");
        assert_eq!(tokenize("X /* abc").1[0].message, "unterminated comment");
        assert_eq!(tokenize("X +").1[0].message, "continuation marker on the last line");
        assert_eq!(tokenize("X ?").1[0].message, "unexpected character '?'");
    }
}
