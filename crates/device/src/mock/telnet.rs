use super::lock;
use crate::error::{ErrorKind, Result};
use crate::telnet::TelnetClient;
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Telnet shell that records every command it is sent.
#[derive(Default)]
pub struct MockTelnet {
    commands: Mutex<Vec<String>>,
    connected: AtomicBool,
    unreachable: bool,
}

impl MockTelnet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A shell that refuses every connection.
    pub fn unreachable() -> Self {
        Self { unreachable: true, ..Self::default() }
    }

    /// Commands sent so far, in order.
    pub fn commands(&self) -> Vec<String> {
        lock(&self.commands).clone()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TelnetClient for MockTelnet {
    async fn connect(&self) -> Result<()> {
        if self.unreachable {
            exn::bail!(ErrorKind::Network("connection refused".to_string()));
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn send(&self, command: &str) -> Result<()> {
        if !self.is_connected() {
            exn::bail!(ErrorKind::NotConnected);
        }
        lock(&self.commands).push(command.to_string());
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}
