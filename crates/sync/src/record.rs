use crate::SyncEngine;
use crate::error::{ErrorKind, Result};
use crate::model::{Deletion, Download, RecordRequest, SyncEntry, SyncOutcome, SyncStatus};
use camsync_mirror::error::ErrorKind as MirrorErrorKind;
use exn::ResultExt;
use std::path::{Path, PathBuf};
use tracing::instrument;

impl SyncEngine {
    /// Where a record should be written: the caller's override, or its place
    /// in the mirror. Parent directories are created either way.
    pub(crate) async fn destination(&self, filename: &str, filepath: Option<&Path>) -> Result<PathBuf> {
        let path = match filepath {
            Some(path) => path.to_path_buf(),
            None => match self.store.locate(filename) {
                Ok(path) => path,
                Err(e) if matches!(&*e, MirrorErrorKind::InvalidRecordName(_)) => {
                    return Err(e).or_raise(|| ErrorKind::InvalidRecordName(filename.to_string()));
                },
                Err(e) => return Err(e).or_raise(|| ErrorKind::Mirror),
            },
        };
        self.store.prepare(&path).await.or_raise(|| ErrorKind::Mirror)?;
        Ok(path)
    }

    /// Removes a partial download so a later run does not take it for a
    /// complete copy.
    pub(crate) async fn discard(&self, path: &Path) {
        if let Err(e) = self.store.remove(path).await {
            tracing::warn!(path = %path.display(), error = %e, "could not remove partial download");
        }
    }

    /// Deletes a record from the camera, reporting failure instead of raising it.
    async fn delete_remote(&self, filename: &str) -> bool {
        match self.session.cgi().del_file(filename).await {
            Ok(()) => {
                tracing::info!(filename, "deleted from camera");
                true
            },
            Err(e) => {
                tracing::warn!(filename, error = %e, "remote delete failed, camera keeps its copy");
                false
            },
        }
    }

    /// Syncs a single record.
    ///
    /// Transfer failures and size mismatches come back as a
    /// [`Failed`](SyncStatus::Failed) entry. Only problems that prevent the
    /// record from being classified at all are errors.
    ///
    /// # Errors
    ///
    /// [`InvalidRecordName`](ErrorKind::InvalidRecordName) when no override
    /// path is given and the filename carries no capture date, and
    /// [`Mirror`](ErrorKind::Mirror) when the local mirror cannot be read or
    /// prepared.
    #[instrument(skip_all, fields(filename = %request.filename))]
    pub async fn sync_record(&self, request: &RecordRequest) -> Result<SyncEntry> {
        let filename = request.filename.as_str();
        let filepath = self.destination(filename, request.filepath.as_deref()).await?;

        if let Some(local) = self.store.stat(&filepath).await.or_raise(|| ErrorKind::Mirror)? {
            tracing::debug!(filepath = %filepath.display(), "already mirrored, skipping download");
            let remote_deleted = self.delete_remote(filename).await;
            return Ok(SyncEntry {
                filename: filename.to_string(),
                filepath: Some(filepath),
                status: SyncStatus::Skipped,
                filesize: local.filesize,
                remote_deleted,
                error: None,
            });
        }

        let filesize = match self.session.cgi().download_record(filename, &filepath).await {
            Ok(filesize) => filesize,
            Err(e) => {
                tracing::warn!(error = %e, "download failed");
                self.discard(&filepath).await;
                return Ok(SyncEntry::failed(filename, Some(filepath), 0, e));
            },
        };
        if filesize == 0 || request.filesize.is_some_and(|expected| expected != filesize) {
            tracing::warn!(filesize, expected = ?request.filesize, "size mismatch, camera keeps its copy");
            self.discard(&filepath).await;
            let reason = format!("received {filesize} bytes, expected {:?}", request.filesize);
            return Ok(SyncEntry::failed(filename, Some(filepath), filesize, reason));
        }

        tracing::info!(filesize, filepath = %filepath.display(), "downloaded");
        let remote_deleted = self.delete_remote(filename).await;
        Ok(SyncEntry {
            filename: filename.to_string(),
            filepath: Some(filepath),
            status: SyncStatus::Downloaded,
            filesize,
            remote_deleted,
            error: None,
        })
    }

    /// [`sync_record`](Self::sync_record), with errors folded into a failed entry.
    pub(crate) async fn sync_one(&self, request: &RecordRequest) -> SyncEntry {
        match self.sync_record(request).await {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(filename = %request.filename, error = %e, "record could not be synced");
                SyncEntry::failed(&request.filename, request.filepath.clone(), 0, e)
            },
        }
    }

    /// Syncs every selected record, in order, one at a time.
    ///
    /// Never fails as a whole: each record ends up in exactly one of the
    /// three counters.
    pub async fn sync_records(&self, requests: &[RecordRequest]) -> SyncOutcome {
        let mut outcome = SyncOutcome::default();
        for request in requests.iter().filter(|r| r.selected) {
            outcome.push(self.sync_one(request).await);
        }
        tracing::info!(
            downloaded = outcome.counts.downloaded,
            failed = outcome.counts.failed,
            skipped = outcome.counts.skipped,
            "sync complete"
        );
        outcome
    }

    /// Downloads a record without deleting it from the camera.
    ///
    /// An empty transfer leaves nothing behind and reports no `filepath`.
    #[instrument(skip(self))]
    pub async fn download_record(&self, filename: &str, filepath: Option<&Path>) -> Result<Download> {
        let path = self.destination(filename, filepath).await?;
        let filesize = match self.session.cgi().download_record(filename, &path).await {
            Ok(filesize) => filesize,
            Err(e) => {
                self.discard(&path).await;
                return Err(e).or_raise(|| ErrorKind::Device);
            },
        };
        if filesize == 0 {
            tracing::warn!("camera sent an empty record");
            self.discard(&path).await;
            return Ok(Download { filename: filename.to_string(), filesize, filepath: None });
        }
        tracing::info!(filesize, filepath = %path.display(), "downloaded");
        Ok(Download { filename: filename.to_string(), filesize, filepath: Some(path) })
    }

    /// Downloads every selected record. A record that fails reports a zero
    /// size and the batch moves on.
    pub async fn download_records(&self, requests: &[RecordRequest]) -> Vec<Download> {
        let mut downloads = Vec::new();
        for request in requests.iter().filter(|r| r.selected) {
            let download = match self.download_record(&request.filename, request.filepath.as_deref()).await {
                Ok(download) => download,
                Err(e) => {
                    tracing::warn!(filename = %request.filename, error = %e, "download failed");
                    Download { filename: request.filename.clone(), filesize: 0, filepath: None }
                },
            };
            downloads.push(download);
        }
        downloads
    }

    #[instrument(skip(self))]
    pub async fn delete_record(&self, filename: &str) -> Result<()> {
        self.session.cgi().del_file(filename).await.or_raise(|| ErrorKind::Device)?;
        tracing::info!("deleted from camera");
        Ok(())
    }

    /// Deletes every selected record, reporting each result.
    pub async fn delete_records(&self, requests: &[RecordRequest]) -> Vec<Deletion> {
        let mut deletions = Vec::new();
        for request in requests.iter().filter(|r| r.selected) {
            let deleted = self.delete_remote(&request.filename).await;
            deletions.push(Deletion { filename: request.filename.clone(), deleted });
        }
        deletions
    }
}
