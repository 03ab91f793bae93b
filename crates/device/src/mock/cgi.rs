use super::{Call, Gauge, MockFile, lock, write_payload};
use crate::cgi::{CgiClient, PageRequest};
use crate::error::{ErrorKind, Result};
use crate::record::{RecordPage, RemoteRecord};
use crate::status::Status;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::watch;

const DEFAULT_PAGE_SIZE: u32 = 100;

/// In-memory CGI client.
pub struct MockCgi {
    files: Mutex<Vec<(String, MockFile)>>,
    page_size: u32,
    calls: Mutex<Vec<Call>>,
    gauge: Gauge,
    unlocks: AtomicUsize,
    status: watch::Sender<Status>,
}

impl Default for MockCgi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCgi {
    pub fn new() -> Self {
        Self::with_files(std::iter::empty::<(String, u64)>())
    }

    /// Create a mock camera listing the given records, in order.
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<String>, u64)>) -> Self {
        let files = files.into_iter().map(|(name, size)| (name.into(), MockFile::new(size))).collect();
        let (status, _) = watch::channel(Status::Cleared);
        Self {
            files: Mutex::new(files),
            page_size: DEFAULT_PAGE_SIZE,
            calls: Mutex::default(),
            gauge: Gauge::default(),
            unlocks: AtomicUsize::new(0),
            status,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Downloads of `filename` deliver only `delivered` bytes.
    pub fn with_truncated(self, filename: &str, delivered: u64) -> Self {
        self.modify(filename, |file| file.delivered = Some(delivered))
    }

    pub fn with_failing_download(self, filename: &str) -> Self {
        self.modify(filename, |file| file.fail_download = true)
    }

    pub fn with_failing_delete(self, filename: &str) -> Self {
        self.modify(filename, |file| file.fail_delete = true)
    }

    fn modify(self, filename: &str, f: impl FnOnce(&mut MockFile)) -> Self {
        match lock(&self.files).iter_mut().find(|(name, _)| name == filename) {
            Some((_, file)) => f(file),
            // Test setup is wrong; the test should not pass.
            None => panic!("MockCgi: no such file {filename}"),
        }
        self
    }

    /// Whether the camera still holds `filename`.
    pub fn contains(&self, filename: &str) -> bool {
        lock(&self.files).iter().any(|(name, _)| name == filename)
    }

    pub fn calls(&self) -> Vec<Call> {
        lock(&self.calls).clone()
    }

    /// Filenames passed to `download_record`, in order.
    pub fn downloads(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Download(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    /// Filenames passed to `del_file`, in order.
    pub fn deletes(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Delete(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    /// Highest number of transfers that were ever in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.gauge.max()
    }

    pub fn unlock_count(&self) -> usize {
        self.unlocks.load(Ordering::SeqCst)
    }

    pub fn set_status(&self, status: Status) {
        self.status.send_replace(status);
    }

    fn record(&self, call: Call) {
        lock(&self.calls).push(call);
    }

    fn file(&self, filename: &str) -> Option<MockFile> {
        lock(&self.files).iter().find(|(name, _)| name == filename).map(|(_, file)| file.clone())
    }
}

#[async_trait]
impl CgiClient for MockCgi {
    async fn get_record_files(&self, page: PageRequest) -> Result<RecordPage> {
        self.record(Call::List(page.page_index.to_string()));
        let files = lock(&self.files).clone();
        let record_count = files.len() as u64;
        let page_size = self.page_size;
        let page_count = files.len().div_ceil(page_size as usize) as u32;
        let start = page.page_index as usize * page_size as usize;
        let records = files
            .into_iter()
            .skip(start)
            .take(page_size as usize)
            .map(|(name, file)| RemoteRecord::new(name, file.size))
            .collect();
        Ok(RecordPage {
            records,
            record_num0: start as u64,
            page_index: page.page_index,
            page_size,
            record_count,
            page_count,
        })
    }

    async fn download_record(&self, filename: &str, dest: &Path) -> Result<u64> {
        let _guard = self.gauge.enter();
        self.record(Call::Download(filename.to_string()));
        tokio::task::yield_now().await;
        let Some(file) = self.file(filename) else {
            exn::bail!(ErrorKind::NotFound(filename.to_string()));
        };
        if file.fail_download {
            exn::bail!(ErrorKind::Network(format!("connection reset while fetching {filename}")));
        }
        write_payload(dest, file.delivered.unwrap_or(file.size)).await
    }

    async fn del_file(&self, filename: &str) -> Result<()> {
        let _guard = self.gauge.enter();
        self.record(Call::Delete(filename.to_string()));
        tokio::task::yield_now().await;
        let mut files = lock(&self.files);
        let Some(index) = files.iter().position(|(name, _)| name == filename) else {
            exn::bail!(ErrorKind::NotFound(filename.to_string()));
        };
        if files[index].1.fail_delete {
            exn::bail!(ErrorKind::Rejected(format!("cannot delete {filename}")));
        }
        files.remove(index);
        Ok(())
    }

    fn unlock(&self) {
        self.unlocks.fetch_add(1, Ordering::SeqCst);
    }

    fn status(&self) -> watch::Receiver<Status> {
        self.status.subscribe()
    }
}
