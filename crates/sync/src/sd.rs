//! Raw SD card access over FTP.
//!
//! These operations bypass the CGI API and the mirror layout: camera files
//! are compared with a flat local directory by name and size. Sync only ever
//! downloads, clean only ever deletes.

use crate::SyncEngine;
use crate::error::{ErrorKind, Result};
use crate::model::{SdAction, SdEntry, SdOutcome};
use camsync_device::{FtpHandle, RemoteRecord, join_remote};
use camsync_mirror::validate_path;
use exn::ResultExt;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// How a camera file relates to the local directory.
enum LocalCopy {
    Missing(PathBuf),
    Matches(PathBuf, u64),
    Differs(PathBuf, u64),
}

impl SyncEngine {
    async fn local_copy(&self, record: &RemoteRecord, dir: &Path) -> Result<LocalCopy> {
        let relative = validate_path(&record.filename).or_raise(|| ErrorKind::Mirror)?;
        let path = dir.join(relative);
        Ok(match self.store.stat(&path).await.or_raise(|| ErrorKind::Mirror)? {
            None => LocalCopy::Missing(path),
            Some(local) if local.filesize == record.filesize => LocalCopy::Matches(path, local.filesize),
            Some(local) => LocalCopy::Differs(path, local.filesize),
        })
    }

    /// Names of the records whose copy in `dir` has exactly the remote size.
    ///
    /// A record whose local copy cannot be checked (unsafe name, unreadable
    /// file) is left out.
    pub async fn matching_local_copies(&self, records: &[RemoteRecord], dir: &Path) -> Vec<String> {
        let mut matching = Vec::new();
        for record in records {
            match self.local_copy(record, dir).await {
                Ok(LocalCopy::Matches(..)) => matching.push(record.filename.clone()),
                Ok(_) => {},
                Err(e) => tracing::debug!(filename = %record.filename, error = %e, "local copy not checked"),
            }
        }
        matching
    }

    /// Downloads every camera file that has no copy in `dir`.
    ///
    /// Existing local files are skipped whatever their size. Nothing is ever
    /// deleted from the camera.
    #[instrument(skip_all, fields(device = %self.session.name(), dir = %dir.display()))]
    pub async fn sync_sd(&self, dir: &Path) -> Result<SdOutcome> {
        let outcome = self.session.with_ftp_connection(|ftp| self.sync_sd_inner(ftp, dir)).await;
        outcome.or_raise(|| ErrorKind::Device)?
    }

    async fn sync_sd_inner(&self, ftp: FtpHandle, dir: &Path) -> Result<SdOutcome> {
        let ftp_dir = self.session.ftp_dir();
        let records = self.session.catalog().list_directory(ftp_dir).await.or_raise(|| ErrorKind::Device)?;
        let mut outcome = SdOutcome::default();
        for record in records {
            let mut entry = SdEntry::failed(&record);
            let path = match self.local_copy(&record, dir).await {
                Ok(LocalCopy::Missing(path)) => path,
                Ok(LocalCopy::Matches(_, size) | LocalCopy::Differs(_, size)) => {
                    tracing::debug!(filename = %record.filename, "skip");
                    entry.local_size = Some(size);
                    entry.action = SdAction::Skipped;
                    outcome.push(entry);
                    continue;
                },
                Err(e) => {
                    tracing::warn!(filename = %record.filename, error = %e, "no local path for camera file");
                    outcome.push(entry);
                    continue;
                },
            };
            entry.action = self.fetch(&ftp, ftp_dir, &record, &path).await;
            outcome.push(entry);
        }
        tracing::info!(counts = ?outcome.counts, "sd sync complete");
        Ok(outcome)
    }

    async fn fetch(&self, ftp: &FtpHandle, ftp_dir: &str, record: &RemoteRecord, path: &Path) -> SdAction {
        if let Err(e) = self.store.prepare(path).await {
            tracing::warn!(filename = %record.filename, error = %e, "cannot create local directory");
            return SdAction::Failed;
        }
        match ftp.get(&join_remote(ftp_dir, &record.filename), path).await {
            Ok(received) if received > 0 && received == record.filesize => {
                tracing::info!(filename = %record.filename, filesize = received, "downloaded");
                SdAction::Downloaded
            },
            Ok(received) => {
                tracing::warn!(filename = %record.filename, received, expected = record.filesize, "size mismatch");
                self.discard(path).await;
                SdAction::Failed
            },
            Err(e) => {
                tracing::warn!(filename = %record.filename, error = %e, "download failed");
                self.discard(path).await;
                SdAction::Failed
            },
        }
    }

    /// Deletes every camera file whose copy in `dir` has exactly the same size.
    ///
    /// Deletion goes through FTP and falls back to a Telnet `rm -f` when FTP
    /// refuses. Size mismatches and files without a local copy are reported
    /// and left on the camera. Nothing is ever downloaded.
    #[instrument(skip_all, fields(device = %self.session.name(), dir = %dir.display()))]
    pub async fn clean_sd(&self, dir: &Path) -> Result<SdOutcome> {
        let outcome = self.session.with_ftp_connection(|ftp| self.clean_sd_inner(ftp, dir)).await;
        outcome.or_raise(|| ErrorKind::Device)?
    }

    async fn clean_sd_inner(&self, ftp: FtpHandle, dir: &Path) -> Result<SdOutcome> {
        let ftp_dir = self.session.ftp_dir();
        let records = self.session.catalog().list_directory(ftp_dir).await.or_raise(|| ErrorKind::Device)?;
        let matching: HashSet<String> = self.matching_local_copies(&records, dir).await.into_iter().collect();
        let mut outcome = SdOutcome::default();
        for record in records {
            let mut entry = SdEntry::failed(&record);
            if matching.contains(&record.filename) {
                entry.local_size = Some(record.filesize);
                entry.action = self.remove_from_card(&ftp, ftp_dir, &record.filename).await;
                outcome.push(entry);
                continue;
            }
            match self.local_copy(&record, dir).await {
                Ok(LocalCopy::Missing(_)) => {
                    tracing::debug!(filename = %record.filename, "new file");
                    entry.action = SdAction::Untouched;
                },
                Ok(LocalCopy::Differs(_, size)) => {
                    tracing::warn!(
                        filename = %record.filename,
                        remote = record.filesize,
                        local = size,
                        "size differs, keeping camera copy"
                    );
                    entry.local_size = Some(size);
                    entry.action = SdAction::Mismatched;
                },
                Ok(LocalCopy::Matches(_, size)) => {
                    // Written after the match pass; left for the next run.
                    tracing::debug!(filename = %record.filename, "local copy appeared during cleanup");
                    entry.local_size = Some(size);
                    entry.action = SdAction::Untouched;
                },
                Err(e) => {
                    tracing::warn!(filename = %record.filename, error = %e, "no local path for camera file");
                },
            }
            outcome.push(entry);
        }
        tracing::info!(counts = ?outcome.counts, "sd clean complete");
        Ok(outcome)
    }

    async fn remove_from_card(&self, ftp: &FtpHandle, ftp_dir: &str, filename: &str) -> SdAction {
        let ftp_error = match ftp.delete_files(ftp_dir, &[filename.to_string()]).await {
            Ok(()) => {
                tracing::info!(filename, "deleted from card");
                return SdAction::Deleted;
            },
            Err(e) => e,
        };
        tracing::debug!(filename, error = %ftp_error, "ftp delete failed, trying telnet");
        match self.session.delete_via_telnet(ftp_dir, filename).await {
            Ok(()) => {
                tracing::info!(filename, "deleted from card via telnet");
                SdAction::Deleted
            },
            Err(e) => {
                tracing::warn!(filename, ftp_error = %ftp_error, telnet_error = %e, "delete failed");
                SdAction::Failed
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{A, B, C, Fixture};
    use crate::{SdAction, SdCounts};
    use camsync_device::mock::{MockFtp, MockTelnet};
    use camsync_device::{DEFAULT_FTP_DIR, EntryKind, FtpClient, RemoteRecord};
    use std::path::PathBuf;

    fn card() -> MockFtp {
        MockFtp::with_files(DEFAULT_FTP_DIR, [(A, 100), (B, 50), (C, 70)])
            .with_entry(DEFAULT_FTP_DIR, "record", EntryKind::Directory)
    }

    fn local_dir(fx: &Fixture) -> PathBuf {
        fx.temp_dir.path().join("sd")
    }

    #[tokio::test]
    async fn test_sync_sd_downloads_missing_only() {
        let fx = Fixture::with_ftp(card(), MockTelnet::new());
        let dir = local_dir(&fx);
        fx.place(&dir.join(A), 100);

        let outcome = fx.engine.sync_sd(&dir).await.unwrap();

        assert_eq!(outcome.counts, SdCounts { downloaded: 2, skipped: 1, ..SdCounts::default() });
        assert_eq!(outcome.records.len(), 3);
        assert_eq!(fx.ftp.downloads(), vec![format!("/mnt/sda0/{B}"), format!("/mnt/sda0/{C}")]);
        assert!(fx.ftp.deletes().is_empty());
        assert_eq!(std::fs::metadata(dir.join(C)).unwrap().len(), 70);
        assert!(!fx.ftp.is_connected());
    }

    #[tokio::test]
    async fn test_sync_sd_failed_transfer() {
        let fx = Fixture::with_ftp(card().with_truncated(B, 10).with_failing_download(C), MockTelnet::new());
        let dir = local_dir(&fx);

        let outcome = fx.engine.sync_sd(&dir).await.unwrap();

        assert_eq!(outcome.counts, SdCounts { downloaded: 1, failed: 2, ..SdCounts::default() });
        assert!(!dir.join(B).exists());
        assert!(!dir.join(C).exists());
        assert!(fx.ftp.max_in_flight() <= 1);
    }

    #[tokio::test]
    async fn test_clean_sd_deletes_exact_matches_only() {
        let fx = Fixture::with_ftp(card(), MockTelnet::new());
        let dir = local_dir(&fx);
        fx.place(&dir.join(A), 100);
        fx.place(&dir.join(B), 49);

        let outcome = fx.engine.clean_sd(&dir).await.unwrap();

        assert_eq!(outcome.counts, SdCounts { deleted: 1, mismatched: 1, untouched: 1, ..SdCounts::default() });
        let actions: Vec<SdAction> = outcome.records.iter().map(|e| e.action).collect();
        assert_eq!(actions, vec![SdAction::Deleted, SdAction::Mismatched, SdAction::Untouched]);
        assert!(!fx.ftp.contains(DEFAULT_FTP_DIR, A));
        assert!(fx.ftp.contains(DEFAULT_FTP_DIR, B));
        assert!(fx.ftp.contains(DEFAULT_FTP_DIR, C));
        assert!(fx.ftp.downloads().is_empty());
        assert!(fx.telnet.commands().is_empty());
    }

    #[tokio::test]
    async fn test_clean_sd_falls_back_to_telnet() {
        let fx = Fixture::with_ftp(card().with_failing_delete(A), MockTelnet::new());
        let dir = local_dir(&fx);
        fx.place(&dir.join(A), 100);

        let outcome = fx.engine.clean_sd(&dir).await.unwrap();

        assert_eq!(outcome.counts.deleted, 1);
        assert_eq!(fx.telnet.commands(), vec![format!("rm -f '/mnt/sda0/{A}'\n")]);
    }

    #[tokio::test]
    async fn test_clean_sd_reports_failed_delete() {
        let fx = Fixture::with_ftp(card().with_failing_delete(A), MockTelnet::unreachable());
        let dir = local_dir(&fx);
        fx.place(&dir.join(A), 100);

        let outcome = fx.engine.clean_sd(&dir).await.unwrap();

        assert_eq!(outcome.counts.failed, 1);
        assert_eq!(outcome.counts.deleted, 0);
        assert!(fx.ftp.contains(DEFAULT_FTP_DIR, A));
    }

    #[tokio::test]
    async fn test_clean_sd_keeps_files_with_unsafe_names() {
        let card = MockFtp::with_files(DEFAULT_FTP_DIR, [(A, 100), ("../escape.h264", 5)]);
        let fx = Fixture::with_ftp(card, MockTelnet::new());
        let dir = local_dir(&fx);
        fx.place(&dir.join(A), 100);
        fx.place(&fx.temp_dir.path().join("escape.h264"), 5);

        let outcome = fx.engine.clean_sd(&dir).await.unwrap();

        assert_eq!(outcome.counts, SdCounts { deleted: 1, failed: 1, ..SdCounts::default() });
        assert!(!fx.ftp.contains(DEFAULT_FTP_DIR, A));
        assert!(fx.ftp.contains(DEFAULT_FTP_DIR, "../escape.h264"));
        assert_eq!(fx.ftp.deletes(), vec![format!("/mnt/sda0/{A}")]);
    }

    #[tokio::test]
    async fn test_matching_local_copies() {
        let fx = Fixture::with_ftp(MockFtp::new(), MockTelnet::new());
        let dir = local_dir(&fx);
        fx.place(&dir.join(A), 100);
        fx.place(&dir.join(B), 10);
        let records = [
            RemoteRecord::new(A, 100),
            RemoteRecord::new(B, 50),
            RemoteRecord::new(C, 70),
            RemoteRecord::new("../escape.h264", 1),
        ];

        let matching = fx.engine.matching_local_copies(&records, &dir).await;

        assert_eq!(matching, vec![A.to_string()]);
    }
}
