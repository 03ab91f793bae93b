use serde::{Deserialize, Serialize};

/// A record file as listed by the camera.
///
/// Identity is the filename, which encodes the capture date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRecord {
    pub filename: String,
    pub filesize: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filetime: Option<String>,
}
impl RemoteRecord {
    pub fn new(filename: impl Into<String>, filesize: u64) -> Self {
        Self { filename: filename.into(), filesize, filetime: None }
    }
}

/// One page of the camera's CGI record listing.
///
/// Field names follow the camera's own JSON so that pages pass through to
/// callers unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPage {
    pub records: Vec<RemoteRecord>,
    #[serde(default)]
    pub record_num0: u64,
    #[serde(rename = "PageIndex")]
    pub page_index: u32,
    #[serde(rename = "PageSize")]
    pub page_size: u32,
    #[serde(rename = "RecordCount")]
    pub record_count: u64,
    #[serde(rename = "PageCount")]
    pub page_count: u32,
}
