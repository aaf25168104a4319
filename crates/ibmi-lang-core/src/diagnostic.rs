//! Diagnostic types for parser and analyzer error/warning reporting.
//!
//! A [`Diagnostic`] is an immutable value created while parsing or analyzing a
//! file. Diagnostics are collected in source order per file and concatenated
//! across a batch run. Severity is advisory: nothing in the core aborts
//! because an error diagnostic exists.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::location::SourceLocation;

/// How serious a [`Diagnostic`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The input could not be interpreted here.
    Error,
    /// Parsing continued but something looks suspicious.
    Warning,
}

/// A diagnostic message tied to a file position.
///
/// The display form is `{file}:{line}:{column}: [{severity}] {message}`,
/// which report renderers depend on byte-for-byte.
///
/// # Example
///
/// ```
/// use ibmi_lang_core::{Diagnostic, Severity};
///
/// let d = Diagnostic::report("ORDERS.clle", 4, 1, Severity::Error, "unterminated string");
/// assert!(d.is_error());
/// assert_eq!(d.to_string(), "ORDERS.clle:4:1: [error] unterminated string");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Diagnostic {
    pub file: String,
    /// 1-based; 0 when the file could not be read at all.
    pub line: u32,
    /// 1-based; 0 when there is no position.
    pub column: u32,
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    /// Create a diagnostic from its parts.
    pub fn report(
        file: impl Into<String>,
        line: u32,
        column: u32,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            line,
            column,
            severity,
            message: message.into(),
        }
    }

    pub fn error(file: impl Into<String>, line: u32, column: u32, message: impl Into<String>) -> Self {
        Self::report(file, line, column, Severity::Error, message)
    }

    pub fn warning(file: impl Into<String>, line: u32, column: u32, message: impl Into<String>) -> Self {
        Self::report(file, line, column, Severity::Warning, message)
    }

    /// Create a diagnostic positioned at an AST location.
    pub fn at(loc: &SourceLocation, severity: Severity, message: impl Into<String>) -> Self {
        Self::report(loc.file.as_ref(), loc.line, loc.column, severity, message)
    }

    pub fn is_error(&self) -> bool {
        matches!(self.severity, Severity::Error)
    }

    pub fn is_warning(&self) -> bool {
        matches!(self.severity, Severity::Warning)
    }
}

/// Whether any of `diagnostics` is an error.
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: [{}] {}",
            self.file, self.line, self.column, self.severity, self.message
        )
    }
}
