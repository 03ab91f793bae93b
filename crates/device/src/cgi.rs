use crate::error::Result;
use crate::record::RecordPage;
use crate::status::Status;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::watch;

/// Paging parameters for [`CgiClient::get_record_files`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    #[serde(rename = "PageIndex", default)]
    pub page_index: u32,
}
impl PageRequest {
    pub fn page(page_index: u32) -> Self {
        Self { page_index }
    }
}

/// Client for a camera's proprietary CGI API.
///
/// Implementations own their HTTP connection and any retry policy; errors
/// returned here are treated as final by callers.
#[async_trait]
pub trait CgiClient: Send + Sync {
    /// Fetch one page of the camera's record listing.
    async fn get_record_files(&self, page: PageRequest) -> Result<RecordPage>;

    /// Download a record to `dest`, returning the number of bytes written.
    ///
    /// A return of zero means nothing usable arrived.
    async fn download_record(&self, filename: &str, dest: &Path) -> Result<u64>;

    /// Delete a record from the camera's SD card.
    async fn del_file(&self, filename: &str) -> Result<()>;

    /// Release the client's internal request lock after a stuck transfer.
    fn unlock(&self);

    /// Status stream for this channel; the receiver starts at the current value.
    fn status(&self) -> watch::Receiver<Status>;
}
