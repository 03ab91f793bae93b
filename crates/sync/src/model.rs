use camsync_device::RemoteRecord;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn selected_by_default() -> bool {
    true
}

/// One record named in a batch action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordRequest {
    pub filename: String,
    /// Expected size; when present a download of any other size fails.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filesize: Option<u64>,
    /// Destination overriding the mirror layout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filepath: Option<PathBuf>,
    /// Records with `selected: false` are left out of a batch entirely.
    #[serde(default = "selected_by_default")]
    pub selected: bool,
}
impl RecordRequest {
    pub fn new(filename: impl Into<String>) -> Self {
        Self { filename: filename.into(), filesize: None, filepath: None, selected: true }
    }

    pub fn with_filesize(mut self, filesize: u64) -> Self {
        self.filesize = Some(filesize);
        self
    }

    pub fn with_filepath(mut self, filepath: impl Into<PathBuf>) -> Self {
        self.filepath = Some(filepath.into());
        self
    }

    pub fn deselected(mut self) -> Self {
        self.selected = false;
        self
    }
}
impl From<RemoteRecord> for RecordRequest {
    fn from(record: RemoteRecord) -> Self {
        Self::new(record.filename).with_filesize(record.filesize)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Downloaded,
    /// A local copy already existed.
    Skipped,
    Failed,
}

/// What happened to one record of a sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncEntry {
    pub filename: String,
    /// Local destination; absent when none could be determined.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filepath: Option<PathBuf>,
    pub status: SyncStatus,
    /// Bytes on disk for skipped records, bytes received otherwise.
    pub filesize: u64,
    pub remote_deleted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
impl SyncEntry {
    pub(crate) fn failed(filename: &str, filepath: Option<PathBuf>, filesize: u64, error: impl ToString) -> Self {
        Self {
            filename: filename.to_string(),
            filepath,
            status: SyncStatus::Failed,
            filesize,
            remote_deleted: false,
            error: Some(error.to_string()),
        }
    }
}

/// Per-status totals of a batch sync.
///
/// Serialized with the `downloded` key that existing callers read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCounts {
    #[serde(rename = "downloded", alias = "downloaded")]
    pub downloaded: u64,
    pub failed: u64,
    pub skipped: u64,
}
impl SyncCounts {
    pub fn total(&self) -> u64 {
        self.downloaded + self.failed + self.skipped
    }
}

/// Result of a batch sync: totals plus one entry per selected record, in
/// request order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncOutcome {
    #[serde(rename = "result")]
    pub counts: SyncCounts,
    pub records: Vec<SyncEntry>,
}
impl SyncOutcome {
    pub(crate) fn push(&mut self, entry: SyncEntry) {
        match entry.status {
            SyncStatus::Downloaded => self.counts.downloaded += 1,
            SyncStatus::Skipped => self.counts.skipped += 1,
            SyncStatus::Failed => self.counts.failed += 1,
        }
        self.records.push(entry);
    }
}

/// Result of a plain download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Download {
    pub filename: String,
    pub filesize: u64,
    /// Present only when bytes were written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filepath: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Deletion {
    pub filename: String,
    pub deleted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SdAction {
    Downloaded,
    /// Sync only: a local copy already existed.
    Skipped,
    /// Clean only: the remote copy was removed.
    Deleted,
    /// Clean only: local and remote sizes differ, both were left alone.
    Mismatched,
    /// Clean only: no local copy, the remote copy was left alone.
    Untouched,
    Failed,
}

/// One FTP file considered by an SD card sync or cleanup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SdEntry {
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_size: Option<u64>,
    pub remote_size: u64,
    pub action: SdAction,
}

impl SdEntry {
    pub(crate) fn failed(record: &RemoteRecord) -> Self {
        Self {
            filename: record.filename.clone(),
            local_size: None,
            remote_size: record.filesize,
            action: SdAction::Failed,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SdCounts {
    pub downloaded: u64,
    pub skipped: u64,
    pub deleted: u64,
    pub mismatched: u64,
    pub untouched: u64,
    pub failed: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SdOutcome {
    #[serde(rename = "result")]
    pub counts: SdCounts,
    pub records: Vec<SdEntry>,
}
impl SdOutcome {
    pub(crate) fn push(&mut self, entry: SdEntry) {
        let counter = match entry.action {
            SdAction::Downloaded => &mut self.counts.downloaded,
            SdAction::Skipped => &mut self.counts.skipped,
            SdAction::Deleted => &mut self.counts.deleted,
            SdAction::Mismatched => &mut self.counts.mismatched,
            SdAction::Untouched => &mut self.counts.untouched,
            SdAction::Failed => &mut self.counts.failed,
        };
        *counter += 1;
        self.records.push(entry);
    }
}
