//! Config Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// An explicitly requested config file does not exist
    #[display("config file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// The config file extension is not one of toml, yaml, yml or json
    #[display("unsupported config format: {}", _0.display())]
    UnsupportedFormat(#[error(not(source))] PathBuf),
    /// The layered sources could not be merged into a configuration
    #[display("could not load configuration")]
    Load,
    /// A device entry is unusable
    #[display("device {device}: {reason}")]
    InvalidDevice { device: String, reason: &'static str },
    /// The device's local mirror could not be opened
    #[display("could not open mirror for device {_0}")]
    Mirror(#[error(not(source))] String),
    /// No device with this name is configured
    #[display("unknown device {_0}")]
    UnknownDevice(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
