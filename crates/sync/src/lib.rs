//! Moving records from a camera to its local mirror.
//!
//! The [`SyncEngine`] decides, record by record, whether to download, skip or
//! give up, and removes the camera's copy once a complete local copy exists:
//!
//! 1. A record whose destination already holds a file is **skipped** and
//!    deleted from the camera.
//! 2. Otherwise it is downloaded. An empty download, or one whose size
//!    differs from the size the caller declared, **fails**: the partial local
//!    file is removed and the camera keeps its copy.
//! 3. A successful download is **downloaded** and deleted from the camera.
//!
//! A failed remote delete never changes how a record is classified; it is
//! logged and reported as `remote_deleted: false`. Batches are processed
//! strictly in order, one transfer at a time.

pub mod error;
mod model;
mod record;
mod sd;
mod stream;
#[cfg(test)]
mod testing;

pub use crate::model::{
    Deletion, Download, RecordRequest, SdAction, SdCounts, SdEntry, SdOutcome, SyncCounts, SyncEntry, SyncOutcome,
    SyncStatus,
};
pub use crate::stream::SyncEvent;
use camsync_device::DeviceSession;
use camsync_mirror::MirrorStore;
use std::sync::Arc;

/// Sync operations for one camera and its mirror.
#[derive(Clone)]
pub struct SyncEngine {
    session: Arc<DeviceSession>,
    store: Arc<MirrorStore>,
}

impl SyncEngine {
    pub fn new(session: Arc<DeviceSession>, store: Arc<MirrorStore>) -> Self {
        Self { session, store }
    }

    pub fn session(&self) -> &Arc<DeviceSession> {
        &self.session
    }

    pub fn store(&self) -> &Arc<MirrorStore> {
        &self.store
    }
}
