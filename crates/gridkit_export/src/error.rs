//! Top-level export error taxonomy.

use std::fmt;
use std::io;

use gridkit_sheet::SheetError;

/// Export pipeline failures. Every error aborts the in-progress render or
/// save immediately; partial sheet content already written stays in the
/// in-memory document.
#[derive(Debug)]
pub enum ExportError {
    /// Invalid column/union/writer configuration.
    Configuration(String),
    /// The styling model rejected a style block.
    Style(String),
    /// The underlying provider/query failed; propagated, never retried.
    DataSource(String),
    /// Filesystem or encoder failure.
    Io(String),
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration(msg) => write!(f, "Configuration error: {msg}"),
            Self::Style(msg) => write!(f, "Style application error: {msg}"),
            Self::DataSource(msg) => write!(f, "Data source error: {msg}"),
            Self::Io(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for ExportError {}

impl From<SheetError> for ExportError {
    fn from(err: SheetError) -> Self {
        match err {
            SheetError::Style(msg) => Self::Style(msg),
            SheetError::UnknownWriterFormat(name) => {
                Self::Configuration(format!("unknown writer format: {name:?}"))
            }
            SheetError::SheetIndex(idx) => {
                Self::Configuration(format!("sheet index out of range: {idx}"))
            }
            SheetError::Write(msg) | SheetError::Io(msg) => Self::Io(msg),
        }
    }
}

impl From<io::Error> for ExportError {
    fn from(err: io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
