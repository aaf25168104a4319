//! Pipeline error types.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Errors from reading or validating a [`PipelineConfig`](crate::PipelineConfig).
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    #[diagnostic(code(ibmi::config::read))]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {source}")]
    #[diagnostic(code(ibmi::config::parse))]
    Parse {
        #[source]
        source: toml::de::Error,
    },

    #[error("unknown encoding '{name}' in config")]
    #[diagnostic(
        code(ibmi::config::unknown_encoding),
        help("supported encodings: utf-8, cp037, cp500, latin-1")
    )]
    UnknownEncoding { name: String },

    #[error("max_workers must be at least 1, got {value}")]
    #[diagnostic(code(ibmi::config::invalid_workers))]
    InvalidWorkers { value: usize },
}

/// A kind or mode name that is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error("unknown {what} '{name}', expected one of: {expected}")]
#[diagnostic(code(ibmi::pipeline::unknown_name))]
pub struct UnknownName {
    pub what: &'static str,
    pub name: String,
    pub expected: &'static str,
}
