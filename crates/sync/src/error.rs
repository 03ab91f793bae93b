//! Sync Error Types
//!
//! Per-record problems (size mismatches, failed transfers, failed remote
//! deletes) are outcomes, not errors. What is left here stops an operation
//! before it can classify anything.

use derive_more::{Display, Error};

/// A sync error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The record name carries no capture date, so it has no mirror location.
    #[display("no mirror location for record {_0}")]
    InvalidRecordName(#[error(not(source))] String),
    /// The local mirror could not be read or written.
    #[display("local mirror operation failed")]
    Mirror,
    /// The camera or one of its channels failed.
    #[display("device operation failed")]
    Device,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Transient causes live in the child error; only a device hop can be one.
        matches!(self, Self::Device)
    }
}
