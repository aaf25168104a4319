//! Free-form RPG tokenizer.
//!
//! Line breaks are insignificant; statements end at `;`. Directive lines
//! (`/COPY`, `/IF`, `**FREE` …) and `//` comments produce no tokens, and a
//! `**CTDATA` line ends the source. An `EXEC SQL` statement is captured
//! whole as a single [`TokenKind::Sql`] token that includes its `;`.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    /// Name or opcode, upper-cased. Hyphenated keywords (`DCL-S`,
    /// `END-PROC`, `ON-ERROR`) are a single token.
    Ident,
    /// `*ON`, `*INLR` and other special values.
    Special,
    /// Built-in function name such as `%TRIM`.
    Bif,
    Number,
    /// Quoted string, stored with its quotes.
    String,
    /// Text between `EXEC SQL` and the terminating `;`.
    Sql,
    LParen,
    RParen,
    Colon,
    Semicolon,
    Dot,
    Operator,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub start: u32,
    pub end: u32,
}

impl Token {
    pub fn is_ident(&self, text: &str) -> bool {
        self.kind == TokenKind::Ident && self.text == text
    }

    pub fn is_operator(&self, text: &str) -> bool {
        self.kind == TokenKind::Operator && self.text == text
    }

    /// Tokens that can end an operand; a following `*` multiplies.
    fn ends_operand(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Ident | TokenKind::Special | TokenKind::Number | TokenKind::String | TokenKind::RParen
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LexError {
    pub offset: u32,
    pub message: String,
}

/// Prefixes that join with `-` into one keyword token.
const HYPHENATED_PREFIXES: &[&str] = &["DCL", "END", "CTL", "EVAL", "ON"];

/// Compile-time data sections that end the program source.
const DATA_SECTIONS: &[&str] = &["**CTDATA", "**FTRANS", "**ALTSEQ"];

pub(crate) fn tokenize(src: &str) -> (Vec<Token>, Vec<LexError>) {
    let mut lexer = Lexer {
        src,
        bytes: src.as_bytes(),
        pos: 0,
        line_start: true,
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
    /// Only blanks seen since the last newline.
    line_start: bool,
    tokens: Vec<Token>,
    errors: Vec<LexError>,
}

fn is_name_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || matches!(b, b'_' | b'#' | b'@' | b'$')
}

fn is_name_char(b: u8) -> bool {
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

    fn error(&mut self, offset: usize, message: impl Into<String>) {
        self.errors.push(LexError {
            offset: offset as u32,
            message: message.into(),
        });
    }

    fn skip_line(&mut self) {
        while self.peek_at(0).is_some_and(|b| b != b'\n') {
            self.pos += 1;
        }
    }

    fn rest_starts_with_ci(&self, word: &str) -> bool {
        self.src
            .get(self.pos..self.pos + word.len())
            .is_some_and(|s| s.eq_ignore_ascii_case(word))
    }

    fn run(&mut self) {
        while let Some(b) = self.peek_at(0) {
            let start = self.pos;
            if b == b'\n' {
                self.pos += 1;
                self.line_start = true;
                continue;
            }
            if b == b' ' || b == b'\t' {
                self.pos += 1;
                continue;
            }

            if self.line_start {
                self.line_start = false;
                if b == b'/' && self.peek_at(1).is_some_and(|c| c.is_ascii_alphabetic()) {
                    self.skip_line();
                    continue;
                }
                if b == b'*' && self.peek_at(1) == Some(b'*') {
                    if DATA_SECTIONS.iter().any(|s| self.rest_starts_with_ci(s)) {
                        self.pos = self.bytes.len();
                        return;
                    }
                    self.skip_line();
                    continue;
                }
            }

            match b {
                b'/' if self.peek_at(1) == Some(b'/') => self.skip_line(),
                b'\'' => self.string(),
                b'%' if self.peek_at(1).is_some_and(|c| c.is_ascii_alphabetic()) => {
                    self.pos += 1;
                    self.eat_name_chars();
                    self.push(TokenKind::Bif, start, self.src[start..self.pos].to_ascii_uppercase());
                }
                b'*' if self.peek_at(1).is_some_and(|c| c.is_ascii_alphabetic())
                    && !self.tokens.last().is_some_and(Token::ends_operand) =>
                {
                    self.pos += 1;
                    self.eat_name_chars();
                    self.push(TokenKind::Special, start, self.src[start..self.pos].to_ascii_uppercase());
                }
                b if is_name_start(b) => self.name(),
                b if b.is_ascii_digit() => {
                    self.eat_digits();
                    if self.peek_at(0) == Some(b'.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
                        self.pos += 1;
                        self.eat_digits();
                    }
                    self.push(TokenKind::Number, start, self.src[start..self.pos].to_string());
                }
                b'(' => self.single(TokenKind::LParen),
                b')' => self.single(TokenKind::RParen),
                b':' => self.single(TokenKind::Colon),
                b';' => self.single(TokenKind::Semicolon),
                b'.' => self.single(TokenKind::Dot),
                b'=' | b'<' | b'>' | b'+' | b'-' | b'*' | b'/' => self.operator(),
                _ => {
                    let ch = self.src[start..].chars().next().unwrap_or('?');
                    self.error(start, format!("unexpected character '{ch}'"));
                    self.pos += ch.len_utf8();
                }
            }
        }
    }

    fn eat_name_chars(&mut self) {
        while self.peek_at(0).is_some_and(is_name_char) {
            self.pos += 1;
        }
    }

    fn eat_digits(&mut self) {
        while self.peek_at(0).is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
    }

    fn single(&mut self, kind: TokenKind) {
        let start = self.pos;
        self.pos += 1;
        self.push(kind, start, self.src[start..self.pos].to_string());
    }

    fn name(&mut self) {
        let start = self.pos;
        self.eat_name_chars();
        let mut text = self.src[start..self.pos].to_ascii_uppercase();

        if HYPHENATED_PREFIXES.contains(&text.as_str())
            && self.peek_at(0) == Some(b'-')
            && self.peek_at(1).is_some_and(|c| c.is_ascii_alphabetic())
        {
            self.pos += 1;
            self.eat_name_chars();
            text = self.src[start..self.pos].to_ascii_uppercase();
        }

        if text == "EXEC" {
            let after = self.pos;
            while matches!(self.peek_at(0), Some(b' ' | b'\t' | b'\n')) {
                self.pos += 1;
            }
            if self.rest_starts_with_ci("SQL") && !self.peek_at(3).is_some_and(is_name_char) {
                self.pos += 3;
                self.sql(start);
                return;
            }
            self.pos = after;
        }
        self.push(TokenKind::Ident, start, text);
    }

    /// Capture up to the next `;` or `END-EXEC` outside quotes. A `;`
    /// directly after `END-EXEC` belongs to the statement.
    fn sql(&mut self, start: usize) {
        let body = self.pos;
        let mut quote: Option<u8> = None;
        while let Some(b) = self.peek_at(0) {
            match (quote, b) {
                (None, b'E' | b'e') if self.rest_starts_with_ci("END-EXEC") => {
                    let text = self.src[body..self.pos].to_string();
                    self.pos += "END-EXEC".len();
                    let mut after = self.pos;
                    while matches!(self.bytes.get(after), Some(b' ' | b'\t')) {
                        after += 1;
                    }
                    if self.bytes.get(after) == Some(&b';') {
                        self.pos = after + 1;
                    }
                    self.push(TokenKind::Sql, start, text);
                    return;
                }
                (None, b';') => {
                    let text = self.src[body..self.pos].to_string();
                    self.pos += 1;
                    self.push(TokenKind::Sql, start, text);
                    return;
                }
                (None, b'\'' | b'"') => quote = Some(b),
                (Some(q), c) if c == q => quote = None,
                _ => {}
            }
            self.pos += 1;
        }
        self.error(start, "missing ';' after EXEC SQL");
    }

    fn string(&mut self) {
        let start = self.pos;
        self.pos += 1;
        loop {
            match self.peek_at(0) {
                None | Some(b'\n') => {
                    self.error(start, "unterminated string");
                    return;
                }
                Some(b'\'') if self.peek_at(1) == Some(b'\'') => self.pos += 2,
                Some(b'\'') => {
                    self.pos += 1;
                    self.push(TokenKind::String, start, self.src[start..self.pos].to_string());
                    return;
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    fn operator(&mut self) {
        let start = self.pos;
        let rest = &self.src[start..];
        let len = if rest.starts_with("**=") {
            3
        } else if ["<>", "<=", ">=", "**", "+=", "-=", "*=", "/="]
            .iter()
            .any(|op| rest.starts_with(op))
        {
            2
        } else {
            1
        };
        self.pos += len;
        self.push(TokenKind::Operator, start, rest[..len].to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(src: &str) -> Vec<String> {
        let (tokens, errors) = tokenize(src);
        assert!(errors.is_empty(), "{errors:?}");
        tokens.into_iter().map(|t| t.text).collect()
    }

    #[test]
    fn test_hyphenated_keywords() {
        assert_eq!(
            texts("dcl-s count int(10);\nend-proc;"),
            vec!["DCL-S", "COUNT", "INT", "(", "10", ")", ";", "END-PROC", ";"]
        );
    }

    #[test]
    fn test_special_versus_multiply() {
        let (tokens, _) = tokenize("*inlr = *on; x = a*b;");
        assert_eq!(tokens[0].kind, TokenKind::Special);
        assert_eq!(tokens[0].text, "*INLR");
        assert_eq!(tokens[2].kind, TokenKind::Special);
        let star = tokens.iter().find(|t| t.text == "*").unwrap();
        assert_eq!(star.kind, TokenKind::Operator);
    }

    #[test]
    fn test_directives_and_comments_skipped() {
        assert_eq!(
            texts("**FREE\n/copy qrpglesrc,protos\n  x = 1; // note\n"),
            vec!["X", "=", "1", ";"]
        );
    }

    #[test]
    fn test_ctdata_ends_source() {
        assert_eq!(texts("x = 1;\n**CTDATA arr\nnot code at all\n"), vec!["X", "=", "1", ";"]);
    }

    #[test]
    fn test_exec_sql_single_token() {
        let (tokens, errors) = tokenize("exec sql\n  select 'a;b' into :x from t;\nx = 1;");
        assert!(errors.is_empty());
        assert_eq!(tokens[0].kind, TokenKind::Sql);
        assert_eq!(tokens[0].text.trim(), "select 'a;b' into :x from t");
        assert_eq!(tokens[1].text, "X");
    }

    #[test]
    fn test_exec_sql_end_exec_terminator() {
        let (tokens, errors) = tokenize("EXEC SQL SELECT * FROM T END-EXEC\nEXEC SQL COMMIT END-EXEC;\n");
        assert!(errors.is_empty());
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].text.trim(), "SELECT * FROM T");
        assert_eq!(tokens[1].text.trim(), "COMMIT");
    }

    #[test]
    fn test_exec_without_sql_is_ident() {
        assert_eq!(texts("execute = 1;"), vec!["EXECUTE", "=", "1", ";"]);
    }

    #[test]
    fn test_compound_operators_and_numbers() {
        assert_eq!(texts("t += 1.50 ** 2;"), vec!["T", "+=", "1.50", "**", "2", ";"]);
    }

    #[test]
    fn test_bif_and_qualified() {
        assert_eq!(
            texts("%trim(cust.name)"),
            vec!["%TRIM", "(", "CUST", ".", "NAME", ")"]
        );
    }

    #[test]
    fn test_errors() {
        assert_eq!(tokenize("x = 'abc").1[0].message, "unterminated string");
        assert_eq!(tokenize("exec sql select 1").1[0].message, "missing ';' after EXEC SQL");
        assert_eq!(tokenize("x = ?;").1[0].message, "unexpected character '?'");
    }
}
