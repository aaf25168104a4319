//! Line-ending normalization and offset-to-position lookup.
//!
//! Source members downloaded from an IBM i system arrive with `\r\n`, bare
//! `\r` or `\n` terminators depending on the transfer tool. Every grammar
//! lexer normalizes first and then resolves token byte offsets through a
//! [`LineIndex`], so reported positions never drift by one byte per `\r\n`.

/// Start offsets of every line of a normalized text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    starts: Vec<u32>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i as u32 + 1))
            .collect();
        Self { starts }
    }

    /// Lines in the text; a trailing `\n` opens an empty last line.
    pub fn line_count(&self) -> usize {
        self.starts.len()
    }

    /// 1-based `(line, column)` of a byte offset. Columns count bytes.
    pub fn line_col(&self, offset: u32) -> (u32, u32) {
        let line = self.starts.partition_point(|&start| start <= offset).max(1) - 1;
        (line as u32 + 1, offset - self.starts[line] + 1)
    }
}

/// Rewrite `\r\n` and lone `\r` terminators as `\n`.
pub fn normalize_line_endings(text: &str) -> String {
    if text.contains('\r') {
        text.replace("\r\n", "\n").replace('\r', "\n")
    } else {
        text.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminators() {
        assert_eq!(normalize_line_endings("PGM\nENDPGM"), "PGM\nENDPGM");
        assert_eq!(normalize_line_endings("A\r\nB\rC\nD\r\r\n"), "A\nB\nC\nD\n\n");
        assert_eq!(normalize_line_endings("£1\r\n¢2"), "£1\n¢2");
    }

    #[test]
    fn test_positions() {
        let index = LineIndex::new("PGM\n  DCL VAR(&A)\nENDPGM\n");
        assert_eq!(index.line_count(), 4);
        assert_eq!(index.line_col(0), (1, 1));
        assert_eq!(index.line_col(3), (1, 4));
        assert_eq!(index.line_col(4), (2, 1));
        assert_eq!(index.line_col(6), (2, 3));
        assert_eq!(index.line_col(19), (3, 2));
    }
}
