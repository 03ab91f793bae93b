//! Local mirror of camera records.
//!
//! Every record a camera produces is named after the day it was captured
//! (`YYYYMMDD...`). The mirror turns that name into a deterministic location
//! under a configured root directory using a small path template, creating
//! the directory tree on demand. Nothing here talks to a camera; the mirror
//! only answers "where does this record live locally, and is it there yet?".

mod date;
pub mod error;
mod path;
mod store;
mod template;

pub use crate::date::RecordDate;
pub use crate::path::validate as validate_path;
pub use crate::store::{CacheListing, LocalFileRef, MirrorStore};
pub use crate::template::{DEFAULT_LOG_DIR, DEFAULT_TEMPLATE, PathTemplate};
