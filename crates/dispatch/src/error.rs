//! Dispatch Error Types
//!
//! Parameter errors are raised before a handler touches the camera or the
//! mirror. Everything a handler raises afterwards is wrapped in
//! [`ErrorKind::Action`] over the failing layer's own error.

use derive_more::{Display, Error};

/// A dispatch error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for dispatch operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// No handler is registered under this action name
    #[display("action {_0} is not supported")]
    UnsupportedAction(#[error(not(source))] String),
    /// A required parameter is absent, null or empty
    #[display("parameter {_0} not defined")]
    MissingParameter(#[error(not(source))] String),
    /// A parameter is present but has the wrong shape
    #[display("parameter {_0} is invalid")]
    InvalidParameter(#[error(not(source))] String),
    /// The handler ran and failed
    #[display("action {_0} failed")]
    Action(#[error(not(source))] String),
    /// A handler result could not be turned into response fields
    #[display("could not encode response")]
    Encode,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    ///
    /// Only a handler failure can be transient; parameter errors will fail
    /// again the same way.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Action(_))
    }

    /// Error factory for [`or_raise`](exn::ResultExt::or_raise) inside a handler.
    pub(crate) fn action(name: &'static str) -> impl FnOnce() -> Self {
        move || Self::Action(name.to_string())
    }
}
