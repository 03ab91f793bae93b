use crate::SyncEngine;
use camsync_device::mock::{MockCgi, MockFtp, MockTelnet};
use camsync_device::{DeviceSession, SessionOptions, TelnetHandle};
use camsync_mirror::{DEFAULT_TEMPLATE, MirrorStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

pub const A: &str = "20240517101500_010.h264";
pub const B: &str = "20240517102000_010.h264";
pub const C: &str = "20240518090000_010.h264";

pub struct Fixture {
    pub temp_dir: TempDir,
    pub engine: SyncEngine,
    pub cgi: Arc<MockCgi>,
    pub ftp: Arc<MockFtp>,
    pub telnet: Arc<MockTelnet>,
}

impl Fixture {
    pub fn new(cgi: MockCgi) -> Self {
        Self::build(cgi, MockFtp::new(), MockTelnet::new())
    }

    pub fn with_ftp(ftp: MockFtp, telnet: MockTelnet) -> Self {
        Self::build(MockCgi::new(), ftp, telnet)
    }

    fn build(cgi: MockCgi, ftp: MockFtp, telnet: MockTelnet) -> Self {
        let temp_dir = tempfile::tempdir().unwrap();
        let cgi = Arc::new(cgi);
        let ftp = Arc::new(ftp);
        let telnet = Arc::new(telnet);
        let session = DeviceSession::new(
            SessionOptions::new("cam1"),
            cgi.clone(),
            ftp.clone(),
            Some(telnet.clone() as TelnetHandle),
        );
        let store = MirrorStore::new(temp_dir.path().join("logs"), "cam1", DEFAULT_TEMPLATE.parse().unwrap()).unwrap();
        let engine = SyncEngine::new(Arc::new(session), Arc::new(store));
        Self { temp_dir, engine, cgi, ftp, telnet }
    }

    /// Mirror path of a record, as the default template lays it out.
    pub fn mirror_path(&self, filename: &str) -> PathBuf {
        self.engine.store().locate(filename).unwrap()
    }

    /// Put a local copy of `filename` of `size` bytes at `path`.
    pub fn place(&self, path: &Path, size: usize) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, vec![1u8; size]).unwrap();
    }
}
