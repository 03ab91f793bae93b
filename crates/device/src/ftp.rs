use crate::error::Result;
use crate::status::Status;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::watch;

/// Type column of an FTP directory listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "char", into = "char")]
pub enum EntryKind {
    /// `-`
    File,
    /// `d`
    Directory,
    /// `l`
    Link,
    Other(char),
}
impl From<char> for EntryKind {
    fn from(c: char) -> Self {
        match c {
            '-' => Self::File,
            'd' => Self::Directory,
            'l' => Self::Link,
            other => Self::Other(other),
        }
    }
}
impl From<EntryKind> for char {
    fn from(kind: EntryKind) -> Self {
        match kind {
            EntryKind::File => '-',
            EntryKind::Directory => 'd',
            EntryKind::Link => 'l',
            EntryKind::Other(c) => c,
        }
    }
}

/// One line of an FTP directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FtpEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub size: u64,
}
impl FtpEntry {
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

/// Client for the FTP daemon running on a camera.
///
/// Remote paths are plain `/`-separated strings; they never touch the local
/// path machinery.
#[async_trait]
pub trait FtpClient: Send + Sync {
    async fn connect(&self) -> Result<()>;
    async fn disconnect(&self) -> Result<()>;
    fn is_connected(&self) -> bool;
    async fn cwd(&self, dir: &str) -> Result<()>;
    /// List one directory, without recursing.
    async fn list(&self, dir: &str) -> Result<Vec<FtpEntry>>;
    /// Download `remote` to `local`, returning the number of bytes written.
    async fn get(&self, remote: &str, local: &Path) -> Result<u64>;
    async fn delete_files(&self, dir: &str, names: &[String]) -> Result<()>;
    /// Status stream for this channel; the receiver starts at the current value.
    fn status(&self) -> watch::Receiver<Status>;
}

/// Joins a remote directory and entry name with exactly one `/`.
///
/// ```
/// use camsync_device::join_remote;
/// assert_eq!(join_remote("/mnt/sda0/", "a.h264"), "/mnt/sda0/a.h264");
/// assert_eq!(join_remote("/mnt/sda0", "a.h264"), "/mnt/sda0/a.h264");
/// assert_eq!(join_remote("/", "a.h264"), "/a.h264");
/// ```
pub fn join_remote(dir: &str, name: &str) -> String {
    format!("{}/{}", dir.trim_end_matches('/'), name.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case('-', EntryKind::File)]
    #[case('d', EntryKind::Directory)]
    #[case('l', EntryKind::Link)]
    #[case('p', EntryKind::Other('p'))]
    fn test_entry_kind(#[case] raw: char, #[case] kind: EntryKind) {
        assert_eq!(EntryKind::from(raw), kind);
        assert_eq!(char::from(kind), raw);
    }

    #[test]
    fn test_entry_wire_format() {
        let entry: FtpEntry = serde_json::from_str(r#"{"name":"record","type":"d","size":4096}"#).unwrap();
        assert_eq!(entry.kind, EntryKind::Directory);
        assert!(!entry.is_file());
        assert_eq!(serde_json::to_value(&entry).unwrap()["type"], "d");
    }
}
