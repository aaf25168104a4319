//! EBCDIC decoding and source loading for IBM i source members.
//!
//! Source members copied off an IBM i system are either already converted
//! to UTF-8/Latin-1 or still raw EBCDIC. The [`load`] function tries an
//! ordered list of encodings and returns the first successful decode.
//!
//! # Example
//!
//! ```rust
//! use ibmi_encoding::{decode_bytes, TextEncoding, CP037};
//!
//! let ebcdic = CP037.encode("CALL PGM(A)").unwrap();
//! assert_eq!(decode_bytes(&ebcdic, TextEncoding::Cp037).unwrap(), "CALL PGM(A)");
//! ```

pub mod ebcdic;
mod encoding;
mod error;
mod loader;

pub use ebcdic::{CodePage, CP037, CP500};
pub use encoding::{decode_bytes, TextEncoding, DEFAULT_ENCODINGS};
pub use error::{EncodingError, LoadError};
pub use loader::{load, load_with};

/// Result type for encoding operations.
pub type Result<T> = std::result::Result<T, EncodingError>;
