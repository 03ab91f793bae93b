//! Local filesystem mirror of camera records.
//!
//! Records are stored under a configured root directory at the location the
//! [`PathTemplate`] renders for them. All filesystem access goes through
//! `tokio::fs`.

use crate::date::RecordDate;
use crate::error::{ErrorKind, Result};
use crate::path::validate as validate_path;
use crate::template::PathTemplate;
use serde::Serialize;
use std::fs::create_dir_all as sync_create_dir;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Extension of the video records cameras write to their SD card.
const RECORD_EXTENSION: &str = "h264";
/// Stand-in filename used to find the directory a date's records land in.
const PROBE_FILENAME: &str = "probe";

/// Location and size of a mirrored record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalFileRef {
    pub filepath: PathBuf,
    pub filesize: u64,
}

/// Contents of one date directory of the mirror.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheListing {
    /// Directory that was listed.
    pub dir: PathBuf,
    /// Record files (`.h264`), sorted by name.
    pub records: Vec<String>,
    /// Subdirectories, sorted by name.
    pub dirs: Vec<String>,
}

/// Local mirror for one device.
///
/// # Examples
///
/// ```no_run
/// use camsync_mirror::{DEFAULT_TEMPLATE, MirrorStore};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MirrorStore::new("/data/logs", "garage", DEFAULT_TEMPLATE.parse()?)?;
/// let path = store.resolve("20240517101500_010.h264").await?;
/// assert!(path.ends_with("garage/2024/05/17/20240517101500_010.h264"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MirrorStore {
    root: PathBuf,
    device: String,
    template: PathTemplate,
}
impl MirrorStore {
    /// Create a mirror rooted at `root` for the named device.
    ///
    /// # Errors
    ///
    /// Returns an error if the root is not absolute, exists but is not a
    /// directory, or cannot be created.
    pub fn new(root: impl AsRef<Path>, device: impl Into<String>, template: PathTemplate) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }
        if root.exists() {
            if !root.is_dir() {
                exn::bail!(ErrorKind::InvalidPath(root));
            }
        } else {
            // Happens once per device configuration; not worth an async constructor.
            sync_create_dir(&root).map_err(|e| Self::map_io_error(e, &root))?;
        }
        Ok(Self { root, device: device.into(), template })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn template(&self) -> &PathTemplate {
        &self.template
    }

    /// `{root}/{device}`, the default local side of SD card sync and cleanup.
    pub fn device_dir(&self) -> Result<PathBuf> {
        Ok(self.root.join(validate_path(&self.device)?))
    }

    /// Where a record belongs, without touching the filesystem.
    pub fn locate(&self, filename: &str) -> Result<PathBuf> {
        let date = RecordDate::from_filename(filename)?;
        self.locate_dated(&date, filename)
    }

    /// Where a record belongs, creating its parent directories if needed.
    ///
    /// Safe to call repeatedly: existing directories are left alone.
    pub async fn resolve(&self, filename: &str) -> Result<PathBuf> {
        let path = self.locate(filename)?;
        self.prepare(&path).await?;
        Ok(path)
    }

    /// Creates the parent directories of `path`, which may lie outside the
    /// mirror layout (caller-supplied destinations, SD card sync targets).
    pub async fn prepare(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| Self::map_io_error(e, parent))?;
        }
        Ok(())
    }

    /// Directory that records captured on `date` are written to.
    pub fn date_dir(&self, date: &RecordDate) -> Result<PathBuf> {
        let probe = self.locate_dated(date, PROBE_FILENAME)?;
        Ok(probe.parent().map(Path::to_path_buf).unwrap_or_else(|| self.root.clone()))
    }

    pub async fn exists(&self, path: &Path) -> Result<bool> {
        Ok(fs::try_exists(path).await.map_err(|e| Self::map_io_error(e, path))?)
    }

    /// Size in bytes of a local file.
    ///
    /// Returns [`NotFound`](ErrorKind::NotFound) if the file does not exist.
    pub async fn size_of(&self, path: &Path) -> Result<u64> {
        let metadata = fs::metadata(path).await.map_err(|e| Self::map_io_error(e, path))?;
        Ok(metadata.len())
    }

    /// Existence and size in one call; `None` when nothing is there.
    pub async fn stat(&self, path: &Path) -> Result<Option<LocalFileRef>> {
        match fs::metadata(path).await {
            Ok(metadata) if metadata.is_file() => {
                Ok(Some(LocalFileRef { filepath: path.to_path_buf(), filesize: metadata.len() }))
            },
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::map_io_error(e, path).into()),
        }
    }

    /// Removes a local file. Missing files are not an error.
    pub async fn remove(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::map_io_error(e, path).into()),
        }
    }

    /// Lists the records and subdirectories mirrored for a given date.
    ///
    /// A date with nothing mirrored yet yields an empty listing, not an error.
    pub async fn list_cache(&self, date: &RecordDate) -> Result<CacheListing> {
        let dir = self.date_dir(date)?;
        let mut listing = CacheListing { dir: dir.clone(), ..CacheListing::default() };
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(listing),
            Err(e) => exn::bail!(Self::map_io_error(e, &dir)),
        };
        while let Some(entry) = entries.next_entry().await.map_err(|e| Self::map_io_error(e, &dir))? {
            let name = entry.file_name().to_string_lossy().into_owned();
            let file_type = entry.file_type().await.map_err(|e| Self::map_io_error(e, &entry.path()))?;
            if file_type.is_dir() {
                listing.dirs.push(name);
            } else if Path::new(&name).extension().is_some_and(|ext| ext == RECORD_EXTENSION) {
                listing.records.push(name);
            }
        }
        listing.records.sort();
        listing.dirs.sort();
        Ok(listing)
    }

    fn locate_dated(&self, date: &RecordDate, filename: &str) -> Result<PathBuf> {
        let relative = self.template.render(&self.device, date, filename)?;
        Ok(self.root.join(relative))
    }

    fn map_io_error(e: std::io::Error, path: &Path) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.to_path_buf()),
            _ => ErrorKind::Io(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::DEFAULT_TEMPLATE;

    const RECORD: &str = "20240517101500_010.h264";

    fn store(root: &Path) -> MirrorStore {
        MirrorStore::new(root, "cam1", DEFAULT_TEMPLATE.parse().unwrap()).unwrap()
    }

    #[test]
    fn test_new_requires_absolute_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(MirrorStore::new(temp_dir.path(), "cam1", DEFAULT_TEMPLATE.parse().unwrap()).is_ok());
        assert!(MirrorStore::new("relative/logs", "cam1", DEFAULT_TEMPLATE.parse().unwrap()).is_err());
    }

    #[test]
    fn test_new_creates_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path().join("nested/logs");
        store(&root);
        assert!(root.is_dir());
    }

    #[test]
    fn test_new_rejects_file_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("not-a-dir");
        std::fs::write(&file, b"x").unwrap();
        let err = MirrorStore::new(&file, "cam1", DEFAULT_TEMPLATE.parse().unwrap()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidPath(_)));
    }

    #[test]
    fn test_locate_has_no_side_effects() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = store(temp_dir.path());
        let path = store.locate(RECORD).unwrap();
        assert_eq!(path, temp_dir.path().join("cam1/2024/05/17").join(RECORD));
        assert!(!temp_dir.path().join("cam1").exists());
    }

    #[tokio::test]
    async fn test_resolve_creates_directories() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = store(temp_dir.path());
        let path = store.resolve(RECORD).await.unwrap();
        assert!(path.parent().unwrap().is_dir());
        assert!(!path.exists());
        // Second call is a no-op on an existing tree.
        assert_eq!(store.resolve(RECORD).await.unwrap(), path);
    }

    #[tokio::test]
    async fn test_resolve_rejects_undated_names() {
        let temp_dir = tempfile::tempdir().unwrap();
        let err = store(temp_dir.path()).resolve("snapshot.jpg").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidRecordName(_)));
    }

    #[tokio::test]
    async fn test_exists_and_size() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = store(temp_dir.path());
        let path = store.resolve(RECORD).await.unwrap();
        assert!(!store.exists(&path).await.unwrap());
        assert!(store.stat(&path).await.unwrap().is_none());
        std::fs::write(&path, vec![0u8; 100]).unwrap();
        assert!(store.exists(&path).await.unwrap());
        assert_eq!(store.size_of(&path).await.unwrap(), 100);
        assert_eq!(store.stat(&path).await.unwrap(), Some(LocalFileRef { filepath: path.clone(), filesize: 100 }));
    }

    #[tokio::test]
    async fn test_size_of_missing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = store(temp_dir.path());
        let err = store.size_of(&temp_dir.path().join("missing.h264")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = store(temp_dir.path());
        let path = store.resolve(RECORD).await.unwrap();
        std::fs::write(&path, b"partial").unwrap();
        store.remove(&path).await.unwrap();
        assert!(!path.exists());
        store.remove(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_cache() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = store(temp_dir.path());
        let date = RecordDate::from_filename(RECORD).unwrap();
        let dir = store.date_dir(&date).unwrap();
        assert_eq!(dir, temp_dir.path().join("cam1/2024/05/17"));
        std::fs::create_dir_all(dir.join("alarms")).unwrap();
        std::fs::write(dir.join("20240517110000_010.h264"), b"b").unwrap();
        std::fs::write(dir.join(RECORD), b"a").unwrap();
        std::fs::write(dir.join("index.db"), b"c").unwrap();
        let listing = store.list_cache(&date).await.unwrap();
        assert_eq!(listing.records, vec![RECORD.to_string(), "20240517110000_010.h264".to_string()]);
        assert_eq!(listing.dirs, vec!["alarms".to_string()]);
    }

    #[tokio::test]
    async fn test_list_cache_empty_date() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = store(temp_dir.path());
        let listing = store.list_cache(&RecordDate::new("2020", "01", "01").unwrap()).await.unwrap();
        assert!(listing.records.is_empty());
        assert!(listing.dirs.is_empty());
    }

    #[test]
    fn test_device_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert_eq!(store(temp_dir.path()).device_dir().unwrap(), temp_dir.path().join("cam1"));
    }
}
