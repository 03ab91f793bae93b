//! Camera sessions and the remote side of record synchronization.
//!
//! A camera is reached over three channels: a CGI API for record listings,
//! downloads and deletes, an FTP server for raw SD card access, and an
//! optional Telnet shell used to start that FTP server. The clients for those
//! channels live outside this crate; [`CgiClient`], [`FtpClient`] and
//! [`TelnetClient`] describe what is expected of them. A [`DeviceSession`]
//! bundles one camera's clients with its per-channel [`Status`], and
//! [`RemoteFileCatalog`] turns raw listings into [`RemoteRecord`]s.

mod catalog;
mod cgi;
pub mod error;
mod ftp;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
mod record;
mod session;
mod status;
mod telnet;

pub use crate::catalog::RemoteFileCatalog;
pub use crate::cgi::{CgiClient, PageRequest};
pub use crate::ftp::{EntryKind, FtpClient, FtpEntry, join_remote};
pub use crate::record::{RecordPage, RemoteRecord};
pub use crate::session::{DEFAULT_FTP_DIR, DeviceSession, FTPD_COMMAND, SessionOptions, SessionRegistry};
pub use crate::status::{Channel, Fill, Indicator, Shape, Status};
pub use crate::telnet::TelnetClient;
use std::sync::Arc;

pub type CgiHandle = Arc<dyn CgiClient + Send + Sync>;
pub type FtpHandle = Arc<dyn FtpClient + Send + Sync>;
pub type TelnetHandle = Arc<dyn TelnetClient + Send + Sync>;
