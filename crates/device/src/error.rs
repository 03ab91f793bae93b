//! Device Error Types
//!
//! Errors raised by camera collaborators (CGI, FTP, Telnet) and by the
//! session that owns them, using `exn` for location tracking.

use derive_more::{Display, Error};

/// A device error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for device operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Connection refused, reset or otherwise broken
    #[display("network error: {_0}")]
    Network(#[error(not(source))] String),
    /// The camera did not answer in time
    #[display("camera did not respond in time")]
    Timeout,
    /// Operation needs an open connection on the channel
    #[display("not connected")]
    NotConnected,
    /// The camera answered but refused the request
    #[display("request rejected by camera: {_0}")]
    Rejected(#[error(not(source))] String),
    /// The remote file or directory does not exist
    #[display("remote file not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// Writing a transfer to local disk failed
    #[display("local write failed: {_0}")]
    LocalWrite(#[error(not(source))] String),
    /// The session was configured without a Telnet client
    #[display("no telnet client configured for this device")]
    TelnetUnavailable,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout | Self::NotConnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_retryable() {
        assert!(ErrorKind::Network("reset".into()).is_retryable());
        assert!(ErrorKind::Timeout.is_retryable());
        assert!(!ErrorKind::Rejected("busy".into()).is_retryable());
        assert!(!ErrorKind::TelnetUnavailable.is_retryable());
    }

    #[test]
    fn error_kind_display() {
        let kind = ErrorKind::NotFound("/mnt/sda0/a.h264".into());
        assert_eq!(kind.to_string(), "remote file not found: /mnt/sda0/a.h264");
    }
}
