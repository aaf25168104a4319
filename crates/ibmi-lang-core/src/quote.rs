//! Quote tracking for the heuristic scanners.

/// Tracks whether a character scan is inside a quoted span.
///
/// A span opens on `'` or `"` and closes only on the same character, so
/// either quote type may appear inside the other. A doubled quote (`''`)
/// closes and immediately reopens, which keeps escaped quotes inside the span.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuoteTracker {
    open: Option<char>,
}

impl QuoteTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the scan is currently inside quotes.
    pub fn in_quotes(&self) -> bool {
        self.open.is_some()
    }

    /// Feed one character. Returns `true` if it is part of a quoted span,
    /// including the opening and closing quote characters.
    pub fn step(&mut self, c: char) -> bool {
        match self.open {
            Some(q) => {
                if c == q {
                    self.open = None;
                }
                true
            }
            None if c == '\'' || c == '"' => {
                self.open = Some(c);
                true
            }
            None => false,
        }
    }
}

/// Split on whitespace, except inside quoted spans. Quotes stay in the tokens.
pub fn split_whitespace_quoted(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quotes = QuoteTracker::new();

    for c in text.chars() {
        if !quotes.step(c) && c.is_whitespace() {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_plain() {
        assert_eq!(split_whitespace_quoted("  A  B\tC "), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_split_keeps_quoted_spaces() {
        assert_eq!(
            split_whitespace_quoted("SNDPGMMSG MSG('Hello there') TOPGMQ(*EXT)"),
            vec!["SNDPGMMSG", "MSG('Hello there')", "TOPGMQ(*EXT)"]
        );
    }

    #[test]
    fn test_split_mixed_quote_types() {
        assert_eq!(
            split_whitespace_quoted(r#"X 'it"s here' "don't stop" Y"#),
            vec!["X", r#"'it"s here'"#, r#""don't stop""#, "Y"]
        );
    }

    #[test]
    fn test_split_unterminated_quote_runs_to_end() {
        assert_eq!(split_whitespace_quoted("A 'B C"), vec!["A", "'B C"]);
    }

    #[test]
    fn test_tracker_doubled_quote() {
        let mut q = QuoteTracker::new();
        let inside: Vec<bool> = "'a''b' c".chars().map(|c| q.step(c)).collect();
        assert_eq!(inside, vec![true, true, true, true, true, true, false, false]);
    }
}
