//! Fixed-column slicing that never indexes out of bounds.
//!
//! Legacy source layouts assign meaning by column. Lines are frequently
//! shorter than the field being read, so every accessor treats missing
//! columns as "no content" instead of panicking. Positions are 0-based
//! character indices.

/// The character at `index`, if the line is long enough.
pub fn char_at(line: &str, index: usize) -> Option<char> {
    line.chars().nth(index)
}

/// Characters `start..end` of `line`, clamped to the line length.
pub fn slice(line: &str, start: usize, end: usize) -> &str {
    if start >= end {
        return "";
    }
    let byte_at = |n: usize| {
        line.char_indices()
            .nth(n)
            .map(|(i, _)| i)
            .unwrap_or(line.len())
    };
    let from = byte_at(start);
    let to = byte_at(end);
    &line[from..to]
}

/// Characters from `start` to the end of `line`.
pub fn from(line: &str, start: usize) -> &str {
    slice(line, start, usize::MAX)
}

/// Trimmed content of characters `start..end`, or `None` when blank.
pub fn field(line: &str, start: usize, end: usize) -> Option<&str> {
    let value = slice(line, start, end).trim();
    (!value.is_empty()).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_lines_have_no_content() {
        assert_eq!(char_at("ab", 5), None);
        assert_eq!(slice("ab", 5, 10), "");
        assert_eq!(from("short", 15), "");
        assert_eq!(field("     ", 0, 5), None);
    }

    #[test]
    fn test_slice_clamps() {
        assert_eq!(slice("     C                   EVAL", 5, 6), "C");
        assert_eq!(slice("abcdef", 2, 100), "cdef");
        assert_eq!(slice("abcdef", 3, 2), "");
    }

    #[test]
    fn test_multibyte_safe() {
        assert_eq!(slice("ÅÅÅabc", 2, 4), "Åa");
        assert_eq!(char_at("ÅÅÅabc", 3), Some('a'));
    }

    #[test]
    fn test_field_trims() {
        assert_eq!(field("     D CUSTNO          S", 6, 21), Some("CUSTNO"));
    }
}
