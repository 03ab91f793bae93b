use crate::cgi::PageRequest;
use crate::error::Result;
use crate::record::{RecordPage, RemoteRecord};
use crate::session::DeviceSession;
use tracing::instrument;

/// Authoritative listing of the records stored on a camera.
///
/// Transport errors from the collaborators are passed through unchanged;
/// nothing here retries.
pub struct RemoteFileCatalog<'a> {
    session: &'a DeviceSession,
}

impl<'a> RemoteFileCatalog<'a> {
    pub fn new(session: &'a DeviceSession) -> Self {
        Self { session }
    }

    /// One page of the CGI record listing.
    pub async fn list_page(&self, page_index: u32) -> Result<RecordPage> {
        self.session.cgi().get_record_files(PageRequest::page(page_index)).await
    }

    /// Every record the CGI listing reports, walking pages in order.
    #[instrument(skip_all, fields(device = %self.session.name()))]
    pub async fn list_all(&self) -> Result<Vec<RemoteRecord>> {
        let mut records = Vec::new();
        let mut page_index = 0;
        loop {
            let page = self.list_page(page_index).await?;
            let done = page.records.is_empty() || page_index + 1 >= page.page_count;
            records.extend(page.records);
            if done {
                break;
            }
            page_index += 1;
        }
        tracing::debug!(count = records.len(), pages = page_index + 1, "listed records");
        Ok(records)
    }

    /// Regular files in one FTP directory.
    ///
    /// Directories, links and anything else that is not a plain file are
    /// skipped. The FTP client must already be connected.
    pub async fn list_directory(&self, dir: &str) -> Result<Vec<RemoteRecord>> {
        let entries = self.session.ftp().list(dir).await?;
        Ok(entries
            .into_iter()
            .filter(|entry| {
                let keep = entry.is_file();
                if !keep {
                    tracing::trace!(name = %entry.name, kind = ?entry.kind, "not a file");
                }
                keep
            })
            .map(|entry| RemoteRecord::new(entry.name, entry.size))
            .collect())
    }

    /// Records in the camera's FTP record directory, connecting for the
    /// duration of the call when not already connected.
    #[instrument(skip_all, fields(device = %self.session.name(), dir = %self.session.ftp_dir()))]
    pub async fn list_sd_records(&self) -> Result<Vec<RemoteRecord>> {
        let dir = self.session.ftp_dir();
        self.session.with_ftp_connection(|_| self.list_directory(dir)).await?
    }
}
