use crate::error::Result;
use async_trait::async_trait;

/// Raw shell access to a camera.
///
/// Used fire-and-forget: commands are written, output is never read back.
#[async_trait]
pub trait TelnetClient: Send + Sync {
    async fn connect(&self) -> Result<()>;
    async fn send(&self, command: &str) -> Result<()>;
    async fn disconnect(&self) -> Result<()>;
}
