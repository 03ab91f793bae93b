//! In-memory camera collaborators for testing.
//!
//! Each mock keeps a journal of the calls it received and tracks how many
//! transfers were in flight at once, so tests can assert both ordering and
//! the absence of overlap. Files carry only a size; transfers write that many
//! zero bytes to the requested local path.

mod cgi;
mod ftp;
mod telnet;

pub use self::cgi::MockCgi;
pub use self::ftp::MockFtp;
pub use self::telnet::MockTelnet;

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A call received by a mock, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List(String),
    Download(String),
    Delete(String),
}

/// Contents and failure injection for one mocked remote file.
#[derive(Debug, Clone)]
struct MockFile {
    size: u64,
    /// Bytes actually delivered on download, when different from `size`.
    delivered: Option<u64>,
    fail_download: bool,
    fail_delete: bool,
}
impl MockFile {
    fn new(size: u64) -> Self {
        Self { size, delivered: None, fail_download: false, fail_delete: false }
    }
}

/// Tracks concurrent transfers and remembers the high-water mark.
#[derive(Debug, Default)]
struct Gauge {
    current: AtomicUsize,
    max: AtomicUsize,
}
impl Gauge {
    fn enter(&self) -> GaugeGuard<'_> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
        GaugeGuard(self)
    }

    fn max(&self) -> usize {
        self.max.load(Ordering::SeqCst)
    }
}

struct GaugeGuard<'a>(&'a Gauge);
impl Drop for GaugeGuard<'_> {
    fn drop(&mut self) {
        self.0.current.fetch_sub(1, Ordering::SeqCst);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Writes `len` zero bytes to `dest`, creating missing parent directories.
async fn write_payload(dest: &Path, len: u64) -> Result<u64> {
    let local_write = || ErrorKind::LocalWrite(dest.display().to_string());
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await.or_raise(local_write)?;
    }
    let len_usize = usize::try_from(len).or_raise(local_write)?;
    tokio::fs::write(dest, vec![0u8; len_usize]).await.or_raise(local_write)?;
    Ok(len)
}
