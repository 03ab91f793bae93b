use super::{Call, Gauge, MockFile, lock, write_payload};
use crate::error::{ErrorKind, Result};
use crate::ftp::{EntryKind, FtpClient, FtpEntry, join_remote};
use crate::status::Status;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::watch;

/// Size reported for directory and link entries.
const NODE_SIZE: u64 = 4096;

struct MockEntry {
    dir: String,
    name: String,
    kind: EntryKind,
    file: MockFile,
}

/// In-memory FTP server.
///
/// Every operation except `connect` fails with
/// [`NotConnected`](ErrorKind::NotConnected) until the client is connected,
/// matching a camera whose FTP daemon must be reached first.
pub struct MockFtp {
    entries: Mutex<Vec<MockEntry>>,
    connected: AtomicBool,
    connects: AtomicUsize,
    calls: Mutex<Vec<Call>>,
    cwd: Mutex<Option<String>>,
    gauge: Gauge,
    status: watch::Sender<Status>,
}

impl Default for MockFtp {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize(dir: &str) -> String {
    let trimmed = dir.trim_end_matches('/');
    if trimmed.is_empty() { "/".to_string() } else { trimmed.to_string() }
}

impl MockFtp {
    pub fn new() -> Self {
        let (status, _) = watch::channel(Status::Cleared);
        Self {
            entries: Mutex::default(),
            connected: AtomicBool::new(false),
            connects: AtomicUsize::new(0),
            calls: Mutex::default(),
            cwd: Mutex::default(),
            gauge: Gauge::default(),
            status,
        }
    }

    /// Create a server whose `dir` holds the given regular files, in order.
    pub fn with_files(dir: &str, files: impl IntoIterator<Item = (impl Into<String>, u64)>) -> Self {
        let ftp = Self::new();
        {
            let mut entries = lock(&ftp.entries);
            for (name, size) in files {
                entries.push(MockEntry {
                    dir: normalize(dir),
                    name: name.into(),
                    kind: EntryKind::File,
                    file: MockFile::new(size),
                });
            }
        }
        ftp
    }

    /// Add a non-file entry such as a directory or link.
    pub fn with_entry(self, dir: &str, name: impl Into<String>, kind: EntryKind) -> Self {
        lock(&self.entries).push(MockEntry {
            dir: normalize(dir),
            name: name.into(),
            kind,
            file: MockFile::new(NODE_SIZE),
        });
        self
    }

    /// Downloads of `name` deliver only `delivered` bytes.
    pub fn with_truncated(self, name: &str, delivered: u64) -> Self {
        self.modify(name, |file| file.delivered = Some(delivered))
    }

    pub fn with_failing_download(self, name: &str) -> Self {
        self.modify(name, |file| file.fail_download = true)
    }

    pub fn with_failing_delete(self, name: &str) -> Self {
        self.modify(name, |file| file.fail_delete = true)
    }

    fn modify(self, name: &str, f: impl FnOnce(&mut MockFile)) -> Self {
        match lock(&self.entries).iter_mut().find(|entry| entry.name == name) {
            Some(entry) => f(&mut entry.file),
            // Test setup is wrong; the test should not pass.
            None => panic!("MockFtp: no such file {name}"),
        }
        self
    }

    pub fn contains(&self, dir: &str, name: &str) -> bool {
        let dir = normalize(dir);
        lock(&self.entries).iter().any(|entry| entry.dir == dir && entry.name == name)
    }

    pub fn calls(&self) -> Vec<Call> {
        lock(&self.calls).clone()
    }

    /// Remote paths passed to `get`, in order.
    pub fn downloads(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Download(path) => Some(path),
                _ => None,
            })
            .collect()
    }

    /// Remote paths that were deleted successfully, in order.
    pub fn deletes(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Delete(path) => Some(path),
                _ => None,
            })
            .collect()
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn current_dir(&self) -> Option<String> {
        lock(&self.cwd).clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.gauge.max()
    }

    pub fn set_status(&self, status: Status) {
        self.status.send_replace(status);
    }

    fn ensure_connected(&self) -> Result<()> {
        if !self.connected.load(Ordering::SeqCst) {
            exn::bail!(ErrorKind::NotConnected);
        }
        Ok(())
    }

    fn record(&self, call: Call) {
        lock(&self.calls).push(call);
    }
}

#[async_trait]
impl FtpClient for MockFtp {
    async fn connect(&self) -> Result<()> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.connected.store(true, Ordering::SeqCst);
        self.status.send_replace(Status::Connected);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        self.status.send_replace(Status::Disconnected);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn cwd(&self, dir: &str) -> Result<()> {
        self.ensure_connected()?;
        *lock(&self.cwd) = Some(normalize(dir));
        Ok(())
    }

    async fn list(&self, dir: &str) -> Result<Vec<FtpEntry>> {
        self.ensure_connected()?;
        self.record(Call::List(dir.to_string()));
        let dir = normalize(dir);
        Ok(lock(&self.entries)
            .iter()
            .filter(|entry| entry.dir == dir)
            .map(|entry| FtpEntry { name: entry.name.clone(), kind: entry.kind, size: entry.file.size })
            .collect())
    }

    async fn get(&self, remote: &str, local: &Path) -> Result<u64> {
        self.ensure_connected()?;
        let _guard = self.gauge.enter();
        self.record(Call::Download(remote.to_string()));
        tokio::task::yield_now().await;
        let (dir, name) = remote.rsplit_once('/').unwrap_or(("/", remote));
        let dir = normalize(dir);
        let found = lock(&self.entries)
            .iter()
            .find(|entry| entry.dir == dir && entry.name == name && entry.kind == EntryKind::File)
            .map(|entry| entry.file.clone());
        let Some(file) = found else {
            exn::bail!(ErrorKind::NotFound(remote.to_string()));
        };
        if file.fail_download {
            exn::bail!(ErrorKind::Network(format!("data connection closed while fetching {remote}")));
        }
        write_payload(local, file.delivered.unwrap_or(file.size)).await
    }

    async fn delete_files(&self, dir: &str, names: &[String]) -> Result<()> {
        self.ensure_connected()?;
        let _guard = self.gauge.enter();
        tokio::task::yield_now().await;
        let normalized = normalize(dir);
        let mut entries = lock(&self.entries);
        for name in names {
            let Some(index) = entries.iter().position(|entry| entry.dir == normalized && &entry.name == name) else {
                exn::bail!(ErrorKind::NotFound(join_remote(dir, name)));
            };
            if entries[index].file.fail_delete {
                exn::bail!(ErrorKind::Rejected(format!("550 cannot delete {name}")));
            }
            entries.remove(index);
            lock(&self.calls).push(Call::Delete(join_remote(dir, name)));
        }
        Ok(())
    }

    fn status(&self) -> watch::Receiver<Status> {
        self.status.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_requires_connection() {
        let ftp = MockFtp::with_files("/mnt/sda0/", [("a.h264", 10)]);
        let err = ftp.list("/mnt/sda0/").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotConnected));
        ftp.connect().await.unwrap();
        assert_eq!(ftp.list("/mnt/sda0").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_files_removes_entries() {
        let ftp = MockFtp::with_files("/mnt/sda0/", [("a.h264", 10), ("b.h264", 20)]);
        ftp.connect().await.unwrap();
        ftp.delete_files("/mnt/sda0/", &["a.h264".to_string()]).await.unwrap();
        assert!(!ftp.contains("/mnt/sda0/", "a.h264"));
        assert!(ftp.contains("/mnt/sda0/", "b.h264"));
        assert_eq!(ftp.deletes(), vec!["/mnt/sda0/a.h264".to_string()]);
    }
}
