//! Mirror Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};
use std::io::Error as IoError;
use std::path::PathBuf;

/// A mirror error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for mirror operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// File or directory does not exist
    #[display("file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// Access denied by the local filesystem
    #[display("permission denied: {}", _0.display())]
    PermissionDenied(#[error(not(source))] PathBuf),
    /// Underlying I/O error
    #[display("I/O error: {_0}")]
    Io(IoError),
    /// Path contains invalid characters, is empty, or escapes the mirror root
    #[display("invalid path: {}", _0.display())]
    InvalidPath(#[error(not(source))] PathBuf),
    /// Record filename does not start with a valid `YYYYMMDD` capture date
    #[display("record name does not start with a YYYYMMDD date: {_0}")]
    InvalidRecordName(#[error(not(source))] String),
    /// Year/month/day components do not form a calendar date
    #[display("invalid date: {_0}")]
    InvalidDate(#[error(not(source))] String),
    /// Path template failed to compile or render
    #[display("issue with path generation from template")]
    Template,
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}
