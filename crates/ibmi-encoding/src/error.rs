//! Error types for decoding and loading.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Errors from a single decode or encode operation.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum EncodingError {
    /// Bytes are not valid in the requested encoding.
    #[error("invalid {encoding} data at byte {offset}")]
    #[diagnostic(code(ibmi::encoding::invalid_data))]
    InvalidData { encoding: String, offset: usize },

    /// A character has no representation in the target code page.
    #[error("character {ch:?} cannot be encoded in {code_page}")]
    #[diagnostic(code(ibmi::encoding::unmappable))]
    Unmappable { ch: char, code_page: &'static str },

    /// The encoding name is not recognized.
    #[error("unknown encoding '{name}'")]
    #[diagnostic(
        code(ibmi::encoding::unknown),
        help("supported encodings: utf-8, cp037, cp500, latin-1")
    )]
    UnknownEncoding { name: String },
}

/// Errors from loading a source file.
#[derive(Debug, Error, Diagnostic)]
pub enum LoadError {
    /// The path does not exist.
    #[error("file not found: {}", path.display())]
    #[diagnostic(code(ibmi::load::not_found))]
    NotFound { path: PathBuf },

    /// No configured encoding could decode the file; carries the last failure.
    #[error("could not decode {}: {reason}", path.display())]
    #[diagnostic(code(ibmi::load::decode_failure))]
    DecodeFailure {
        path: PathBuf,
        encoding: Option<String>,
        reason: String,
    },

    /// Any other I/O failure while reading.
    #[error("failed to read {}: {source}", path.display())]
    #[diagnostic(code(ibmi::load::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
