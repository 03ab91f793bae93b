//! Per-camera session state.
//!
//! A [`DeviceSession`] owns the collaborator handles for one camera and
//! republishes their connection status on one `watch` channel per
//! [`Channel`], so late subscribers always see the latest value.

use crate::catalog::RemoteFileCatalog;
use crate::error::{ErrorKind, Result};
use crate::status::{Channel, Status};
use crate::{CgiHandle, FtpHandle, TelnetHandle};
use exn::OptionExt;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;
use tracing::instrument;

/// Directory on the camera's SD card that holds its records.
pub const DEFAULT_FTP_DIR: &str = "/mnt/sda0/";
/// Shell command that starts the camera's FTP daemon in the background.
pub const FTPD_COMMAND: &str = "tcpsvd -vE 0.0.0.0 21 ftpd -w / &\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Device name, also the first component of mirror paths.
    pub name: String,
    /// Record directory on the camera, as seen over FTP.
    pub ftp_dir: String,
}
impl SessionOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ftp_dir: DEFAULT_FTP_DIR.to_string() }
    }

    pub fn with_ftp_dir(mut self, ftp_dir: impl Into<String>) -> Self {
        self.ftp_dir = ftp_dir.into();
        self
    }
}

/// Open connections and status state for one camera.
pub struct DeviceSession {
    options: SessionOptions,
    cgi: CgiHandle,
    ftp: FtpHandle,
    telnet: Option<TelnetHandle>,
    cgi_status: Arc<watch::Sender<Status>>,
    ftp_status: Arc<watch::Sender<Status>>,
    forwarding: Mutex<Forwarding>,
    closed: AtomicBool,
}

/// Status forwarding from the collaborators into the session's channels.
enum Forwarding {
    /// Created outside a runtime; sources are kept until one is available.
    Pending { cgi: watch::Receiver<Status>, ftp: watch::Receiver<Status> },
    Running(Vec<JoinHandle<()>>),
    Stopped,
}
impl Forwarding {
    fn stop(&mut self) {
        if let Self::Running(handles) = std::mem::replace(self, Self::Stopped) {
            for handle in handles {
                handle.abort();
            }
        }
    }
}

impl DeviceSession {
    /// Create a session and start forwarding collaborator status.
    ///
    /// Forwarding runs on the current Tokio runtime. A session created
    /// outside a runtime starts forwarding on the first call made from
    /// inside one; until then its channels hold their initial values.
    pub fn new(options: SessionOptions, cgi: CgiHandle, ftp: FtpHandle, telnet: Option<TelnetHandle>) -> Self {
        let (cgi_tx, _) = watch::channel(Status::Ready);
        let (ftp_tx, _) = watch::channel(Status::Cleared);
        let forwarding = Forwarding::Pending { cgi: cgi.status(), ftp: ftp.status() };
        tracing::debug!(device = %options.name, telnet = telnet.is_some(), "session opened");
        let session = Self {
            options,
            cgi,
            ftp,
            telnet,
            cgi_status: Arc::new(cgi_tx),
            ftp_status: Arc::new(ftp_tx),
            forwarding: Mutex::new(forwarding),
            closed: AtomicBool::new(false),
        };
        session.ensure_forwarding();
        session
    }

    fn forwarding(&self) -> MutexGuard<'_, Forwarding> {
        self.forwarding.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts pending status forwarding if a runtime is now available.
    fn ensure_forwarding(&self) {
        let mut forwarding = self.forwarding();
        if !matches!(*forwarding, Forwarding::Pending { .. }) {
            return;
        }
        let Ok(runtime) = Handle::try_current() else {
            return;
        };
        if let Forwarding::Pending { cgi, ftp } = std::mem::replace(&mut *forwarding, Forwarding::Stopped) {
            *forwarding = Forwarding::Running(vec![
                forward(&runtime, cgi, Arc::clone(&self.cgi_status)),
                forward(&runtime, ftp, Arc::clone(&self.ftp_status)),
            ]);
        }
    }

    pub fn name(&self) -> &str {
        &self.options.name
    }

    pub fn ftp_dir(&self) -> &str {
        &self.options.ftp_dir
    }

    pub fn cgi(&self) -> &CgiHandle {
        &self.cgi
    }

    pub fn ftp(&self) -> &FtpHandle {
        &self.ftp
    }

    pub fn telnet(&self) -> Option<&TelnetHandle> {
        self.telnet.as_ref()
    }

    pub fn catalog(&self) -> RemoteFileCatalog<'_> {
        RemoteFileCatalog::new(self)
    }

    fn sender(&self, channel: Channel) -> &watch::Sender<Status> {
        match channel {
            Channel::Cgi => &self.cgi_status,
            Channel::Ftp => &self.ftp_status,
        }
    }

    /// Subscribe to a channel; the receiver sees the current value immediately.
    pub fn subscribe(&self, channel: Channel) -> watch::Receiver<Status> {
        self.ensure_forwarding();
        self.sender(channel).subscribe()
    }

    /// Last status published on a channel.
    pub fn status(&self, channel: Channel) -> Status {
        *self.sender(channel).borrow()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Start the FTP daemon on the camera through its Telnet shell.
    ///
    /// The command is fire-and-forget: its output is never read. The Telnet
    /// connection is closed again even when sending fails.
    #[instrument(skip_all, fields(device = %self.options.name))]
    pub async fn start_ftp_server(&self) -> Result<()> {
        self.run_shell(FTPD_COMMAND).await?;
        tracing::info!("ftp daemon start requested");
        Ok(())
    }

    /// Delete a file on the camera with a Telnet `rm -f`.
    #[instrument(skip(self), fields(device = %self.options.name))]
    pub async fn delete_via_telnet(&self, dir: &str, filename: &str) -> Result<()> {
        let target = crate::ftp::join_remote(dir, filename);
        self.run_shell(&format!("rm -f {}\n", shell_quote(&target))).await
    }

    async fn run_shell(&self, command: &str) -> Result<()> {
        self.ensure_forwarding();
        let telnet = self.telnet.as_ref().ok_or_raise(|| ErrorKind::TelnetUnavailable)?;
        telnet.connect().await?;
        let sent = telnet.send(command).await;
        let closed = telnet.disconnect().await;
        sent?;
        closed
    }

    /// Run `f` with a connected FTP client.
    ///
    /// Connects first when the client is not connected, and disconnects
    /// afterwards only in that case. A failed disconnect is logged; the
    /// output of `f` is still returned.
    pub async fn with_ftp_connection<F, Fut, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(FtpHandle) -> Fut,
        Fut: Future<Output = T>,
    {
        self.ensure_forwarding();
        let opened = !self.ftp.is_connected();
        if opened {
            self.ftp.connect().await?;
        }
        let output = f(Arc::clone(&self.ftp)).await;
        if opened && let Err(e) = self.ftp.disconnect().await {
            tracing::warn!(device = %self.options.name, error = %e, "ftp disconnect failed");
        }
        Ok(output)
    }

    /// Stop forwarding status, clear both channels and drop the FTP
    /// connection. Calling this more than once is a no-op.
    #[instrument(skip_all, fields(device = %self.options.name))]
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.forwarding().stop();
        self.cgi_status.send_replace(Status::Cleared);
        self.ftp_status.send_replace(Status::Cleared);
        if self.ftp.is_connected()
            && let Err(e) = self.ftp.disconnect().await
        {
            tracing::warn!(error = %e, "ftp disconnect failed during close");
        }
        tracing::debug!("session closed");
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        self.forwarding.get_mut().unwrap_or_else(PoisonError::into_inner).stop();
    }
}

fn forward(runtime: &Handle, mut source: watch::Receiver<Status>, sink: Arc<watch::Sender<Status>>) -> JoinHandle<()> {
    runtime.spawn(async move {
        while source.changed().await.is_ok() {
            let status = *source.borrow_and_update();
            sink.send_replace(status);
        }
    })
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Sessions keyed by device name.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<DeviceSession>>>,
}
impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session under its own name, closing any session it replaces.
    pub async fn insert(&self, session: Arc<DeviceSession>) {
        let replaced = self.sessions.write().await.insert(session.name().to_string(), Arc::clone(&session));
        if let Some(old) = replaced
            && !Arc::ptr_eq(&old, &session)
        {
            old.close().await;
        }
    }

    pub async fn get(&self, name: &str) -> Option<Arc<DeviceSession>> {
        self.sessions.read().await.get(name).cloned()
    }

    /// Remove and close a session.
    pub async fn remove(&self, name: &str) -> Option<Arc<DeviceSession>> {
        let removed = self.sessions.write().await.remove(name);
        if let Some(session) = &removed {
            session.close().await;
        }
        removed
    }

    /// Registered device names, sorted.
    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.sessions.read().await.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FtpClient;
    use crate::mock::{MockCgi, MockFtp, MockTelnet};

    fn session(telnet: Option<Arc<MockTelnet>>) -> (DeviceSession, Arc<MockCgi>, Arc<MockFtp>) {
        let cgi = Arc::new(MockCgi::new());
        let ftp = Arc::new(MockFtp::new());
        let telnet = telnet.map(|t| t as TelnetHandle);
        let session = DeviceSession::new(SessionOptions::new("cam1"), cgi.clone(), ftp.clone(), telnet);
        (session, cgi, ftp)
    }

    #[tokio::test]
    async fn test_initial_status() {
        let (session, _, _) = session(None);
        assert_eq!(session.status(Channel::Cgi), Status::Ready);
        assert_eq!(session.status(Channel::Ftp), Status::Cleared);
        assert_eq!(*session.subscribe(Channel::Cgi).borrow(), Status::Ready);
    }

    #[test]
    fn test_session_created_outside_runtime() {
        let (session, cgi, _) = session(None);
        assert_eq!(session.status(Channel::Cgi), Status::Ready);
        cgi.set_status(Status::Initializing);

        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        runtime.block_on(async {
            let mut rx = session.subscribe(Channel::Cgi);
            cgi.set_status(Status::Login);
            rx.changed().await.unwrap();
            assert_eq!(*rx.borrow_and_update(), Status::Login);
            session.close().await;
        });
        assert_eq!(session.status(Channel::Cgi), Status::Cleared);
    }

    #[tokio::test]
    async fn test_forwards_collaborator_status() {
        let (session, cgi, ftp) = session(None);
        let mut rx = session.subscribe(Channel::Cgi);
        cgi.set_status(Status::Login);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), Status::Login);

        let mut rx = session.subscribe(Channel::Ftp);
        ftp.set_status(Status::Pending);
        rx.changed().await.unwrap();
        assert_eq!(session.status(Channel::Ftp), Status::Pending);
        // Channels are independent.
        assert_eq!(session.status(Channel::Cgi), Status::Login);
    }

    #[tokio::test]
    async fn test_start_ftp_server_sends_command() {
        let telnet = Arc::new(MockTelnet::new());
        let (session, _, _) = session(Some(telnet.clone()));
        session.start_ftp_server().await.unwrap();
        assert_eq!(telnet.commands(), vec![FTPD_COMMAND.to_string()]);
        assert!(!telnet.is_connected());
    }

    #[tokio::test]
    async fn test_start_ftp_server_without_telnet() {
        let (session, _, _) = session(None);
        let err = session.start_ftp_server().await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::TelnetUnavailable));
    }

    #[tokio::test]
    async fn test_delete_via_telnet_quotes_path() {
        let telnet = Arc::new(MockTelnet::new());
        let (session, _, _) = session(Some(telnet.clone()));
        session.delete_via_telnet("/mnt/sda0/", "it's.h264").await.unwrap();
        assert_eq!(telnet.commands(), vec![r"rm -f '/mnt/sda0/it'\''s.h264'".to_string() + "\n"]);
    }

    #[tokio::test]
    async fn test_with_ftp_connection_opens_and_closes() {
        let (session, _, ftp) = session(None);
        let connected = session.with_ftp_connection(|ftp| async move { ftp.is_connected() }).await.unwrap();
        assert!(connected);
        assert!(!ftp.is_connected());
    }

    #[tokio::test]
    async fn test_with_ftp_connection_keeps_existing_connection() {
        let (session, _, ftp) = session(None);
        ftp.connect().await.unwrap();
        session.with_ftp_connection(|_| async {}).await.unwrap();
        assert!(ftp.is_connected());
        assert_eq!(ftp.connect_count(), 1);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (session, cgi, ftp) = session(None);
        ftp.connect().await.unwrap();
        session.close().await;
        session.close().await;
        assert!(session.is_closed());
        assert!(!ftp.is_connected());
        assert_eq!(session.status(Channel::Cgi), Status::Cleared);
        assert_eq!(session.status(Channel::Ftp), Status::Cleared);

        // Forwarding has stopped.
        cgi.set_status(Status::Disconnected);
        tokio::task::yield_now().await;
        assert_eq!(session.status(Channel::Cgi), Status::Cleared);
    }

    #[tokio::test]
    async fn test_registry_replaces_and_removes() {
        let registry = SessionRegistry::new();
        let (first, _, _) = session(None);
        let first = Arc::new(first);
        registry.insert(first.clone()).await;
        let (second, _, _) = session(None);
        registry.insert(Arc::new(second)).await;
        assert!(first.is_closed());
        assert_eq!(registry.names().await, vec!["cam1".to_string()]);

        let removed = registry.remove("cam1").await.unwrap();
        assert!(removed.is_closed());
        assert!(registry.get("cam1").await.is_none());
    }
}
