//! Action dispatch for camera sessions.
//!
//! A host platform delivers messages of the form `{ "action": ..., ...params }`
//! and expects either a response object or an error back. An
//! [`ActionDispatcher`] routes each message to a handler registered under the
//! action name; the table of registrations also produces the `listActions`
//! description.
//!
//! Two tables are provided: [`record_actions`] for the CGI record API and
//! local mirror, and [`ftp_actions`] for raw SD card access.
//!
//! ```no_run
//! use camsync_dispatch::{Request, record_dispatcher};
//! # use camsync_device::DeviceSession;
//! # use camsync_mirror::MirrorStore;
//! # use std::sync::Arc;
//! # async fn example(session: Arc<DeviceSession>, store: Arc<MirrorStore>) {
//! let dispatcher = record_dispatcher(session, store);
//! match dispatcher.dispatch(Request::new("listRecords")).await {
//!     Ok(response) => println!("{}", response.fields["payload"]["RecordCount"]),
//!     Err(e) => eprintln!("{e}"),
//! }
//! # }
//! ```

mod dispatcher;
pub mod error;
mod ftp;
mod params;
mod record;

pub use crate::dispatcher::{ActionDispatcher, Handler, HandlerFuture, LIST_ACTIONS, Registration, Request, Response};
pub use crate::ftp::{FtpContext, ftp_actions, ftp_dispatcher};
pub use crate::params::{Fields, fields, optional, required};
pub use crate::record::{RecordContext, record_actions, record_dispatcher};
