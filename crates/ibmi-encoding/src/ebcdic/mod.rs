//! EBCDIC code pages used for IBM i source members.
//!
//! Only the two Latin-1 compatible single-byte pages that source members are
//! normally stored in are supported: CP037 (US/Canada) and CP500
//! (International). They differ in seven positions, all punctuation.

mod tables;

use crate::error::EncodingError;

/// A single-byte EBCDIC code page whose characters all fall in Latin-1.
#[derive(Debug)]
pub struct CodePage {
    /// Display name, e.g. `CP037`.
    pub name: &'static str,
    /// IBM coded character set identifier.
    pub ccsid: u16,
    to_latin1: &'static [u8; 256],
}

/// CCSID 37, US/Canada.
pub static CP037: CodePage = CodePage {
    name: "CP037",
    ccsid: 37,
    to_latin1: &tables::CP037_TO_LATIN1,
};

/// CCSID 500, International.
pub static CP500: CodePage = CodePage {
    name: "CP500",
    ccsid: 500,
    to_latin1: &tables::CP500_TO_LATIN1,
};

impl CodePage {
    /// Decode EBCDIC bytes to a string. Every byte maps, so this cannot fail.
    pub fn decode(&self, bytes: &[u8]) -> String {
        bytes.iter().map(|&b| self.to_char(b)).collect()
    }

    /// Encode a string to EBCDIC bytes.
    ///
    /// # Errors
    /// Returns [`EncodingError::Unmappable`] for characters outside Latin-1.
    pub fn encode(&self, s: &str) -> Result<Vec<u8>, EncodingError> {
        s.chars()
            .map(|ch| {
                u8::try_from(u32::from(ch))
                    .ok()
                    .and_then(|latin1| self.to_latin1.iter().position(|&c| c == latin1))
                    .map(|pos| pos as u8)
                    .ok_or_else(|| EncodingError::Unmappable {
                        ch,
                        code_page: self.name,
                    })
            })
            .collect()
    }

    /// Convert a single EBCDIC byte to its character.
    #[inline]
    pub fn to_char(&self, ebcdic: u8) -> char {
        char::from(self.to_latin1[ebcdic as usize])
    }

    /// Look up a code page by CCSID.
    pub fn from_ccsid(ccsid: u16) -> Option<&'static CodePage> {
        match ccsid {
            37 => Some(&CP037),
            500 => Some(&CP500),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hello_cp037() {
        assert_eq!(CP037.encode("HELLO").unwrap(), vec![0xC8, 0xC5, 0xD3, 0xD3, 0xD6]);
        assert_eq!(CP037.decode(&[0xC8, 0xC5, 0xD3, 0xD3, 0xD6]), "HELLO");
    }

    #[test]
    fn test_digits_and_space() {
        assert_eq!(CP037.decode(&[0x40, 0xF0, 0xF9]), " 09");
        assert_eq!(CP500.decode(&[0x40, 0xF0, 0xF9]), " 09");
    }

    #[test]
    fn test_cp037_cp500_differences() {
        // Brackets and exclamation mark move between the two pages.
        assert_eq!(CP037.to_char(0xBA), '[');
        assert_eq!(CP500.to_char(0x4A), '[');
        assert_eq!(CP037.to_char(0x5A), '!');
        assert_eq!(CP500.to_char(0x4F), '!');
        assert_eq!(CP037.to_char(0x4F), '|');
        assert_eq!(CP500.to_char(0xBB), '|');
    }

    #[test]
    fn test_cl_punctuation_cp037() {
        let src = "DCL VAR(&X) TYPE(*CHAR) LEN(10) /* x */";
        let bytes = CP037.encode(src).unwrap();
        assert_eq!(CP037.decode(&bytes), src);
        assert_eq!(bytes[8], 0x50); // '&'
        assert_eq!(bytes[17], 0x5C); // '*'
    }

    #[test]
    fn test_tables_are_bijective() {
        for page in [&CP037, &CP500] {
            let mut seen = [false; 256];
            for b in 0..=255u8 {
                let c = page.to_latin1[b as usize] as usize;
                assert!(!seen[c], "{} maps two bytes to {c:#04x}", page.name);
                seen[c] = true;
            }
        }
    }

    #[test]
    fn test_unmappable() {
        let err = CP037.encode("€").unwrap_err();
        assert!(matches!(err, EncodingError::Unmappable { ch: '€', .. }));
    }

    #[test]
    fn test_from_ccsid() {
        assert_eq!(CodePage::from_ccsid(37).map(|p| p.name), Some("CP037"));
        assert_eq!(CodePage::from_ccsid(500).map(|p| p.name), Some("CP500"));
        assert!(CodePage::from_ccsid(1047).is_none());
    }
}
