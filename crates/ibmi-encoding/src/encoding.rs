//! Text encodings a source member may be stored in.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ebcdic::{CP037, CP500};
use crate::error::EncodingError;

/// A supported source text encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TextEncoding {
    Utf8,
    Cp037,
    Cp500,
    Latin1,
}

/// Encodings tried by [`load`](crate::load), in order.
///
/// Both EBCDIC pages map every byte, so Latin-1 is only reached when the
/// list is reordered or trimmed by configuration.
pub const DEFAULT_ENCODINGS: [TextEncoding; 4] = [
    TextEncoding::Utf8,
    TextEncoding::Cp037,
    TextEncoding::Cp500,
    TextEncoding::Latin1,
];

impl TextEncoding {
    /// Canonical lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Cp037 => "cp037",
            TextEncoding::Cp500 => "cp500",
            TextEncoding::Latin1 => "latin-1",
        }
    }

    /// Look up an encoding by any of its common aliases, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Some(TextEncoding::Utf8),
            "cp037" | "ibm037" | "ibm-037" | "ccsid37" => Some(TextEncoding::Cp037),
            "cp500" | "ibm500" | "ibm-500" | "ccsid500" => Some(TextEncoding::Cp500),
            "latin-1" | "latin1" | "iso-8859-1" | "iso8859-1" => Some(TextEncoding::Latin1),
            _ => None,
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TextEncoding {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| EncodingError::UnknownEncoding {
            name: s.to_string(),
        })
    }
}

impl TryFrom<String> for TextEncoding {
    type Error = EncodingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TextEncoding> for String {
    fn from(value: TextEncoding) -> Self {
        value.name().to_string()
    }
}

/// Decode raw bytes with one encoding.
///
/// UTF-8 is strict and a leading byte-order mark is dropped.
pub fn decode_bytes(bytes: &[u8], encoding: TextEncoding) -> Result<String, EncodingError> {
    match encoding {
        TextEncoding::Utf8 => {
            let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
            std::str::from_utf8(bytes)
                .map(str::to_string)
                .map_err(|e| EncodingError::InvalidData {
                    encoding: encoding.name().to_string(),
                    offset: e.valid_up_to(),
                })
        }
        TextEncoding::Cp037 => Ok(CP037.decode(bytes)),
        TextEncoding::Cp500 => Ok(CP500.decode(bytes)),
        TextEncoding::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for enc in DEFAULT_ENCODINGS {
            assert_eq!(TextEncoding::from_name(enc.name()), Some(enc));
        }
    }

    #[test]
    fn test_aliases() {
        assert_eq!("UTF8".parse::<TextEncoding>().unwrap(), TextEncoding::Utf8);
        assert_eq!("IBM-037".parse::<TextEncoding>().unwrap(), TextEncoding::Cp037);
        assert_eq!("ISO-8859-1".parse::<TextEncoding>().unwrap(), TextEncoding::Latin1);
        assert!(matches!(
            "cp1047".parse::<TextEncoding>(),
            Err(EncodingError::UnknownEncoding { .. })
        ));
    }

    #[test]
    fn test_utf8_strict() {
        let err = decode_bytes(b"PGM\xC8", TextEncoding::Utf8).unwrap_err();
        assert_eq!(
            err,
            EncodingError::InvalidData {
                encoding: "utf-8".to_string(),
                offset: 3
            }
        );
    }

    #[test]
    fn test_utf8_bom_stripped() {
        assert_eq!(decode_bytes(b"\xEF\xBB\xBFPGM", TextEncoding::Utf8).unwrap(), "PGM");
    }

    #[test]
    fn test_latin1_maps_every_byte() {
        assert_eq!(decode_bytes(&[0x41, 0xA3], TextEncoding::Latin1).unwrap(), "A£");
    }
}
