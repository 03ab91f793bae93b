use crate::error::{ErrorKind, Result};
use camsync_device::{DEFAULT_FTP_DIR, SessionOptions};
use camsync_mirror::{DEFAULT_LOG_DIR, DEFAULT_TEMPLATE, MirrorStore, PathTemplate, validate_path};
use exn::ResultExt;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Connection and mirror settings for one camera.
///
/// Credentials may come from the config file or, preferably, from the
/// environment.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub host: String,
    /// Port of the camera's web (CGI) interface.
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Shell account used for Telnet.
    pub root_user: Option<String>,
    pub root_password: Option<String>,
    pub keepalive_ms: u64,
    /// Root of the local mirror.
    pub log_dir: PathBuf,
    /// Mirror path template, relative to `log_dir`.
    pub log_path: String,
    /// Record directory on the camera's SD card.
    pub ftp_dir: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 80,
            user: None,
            password: None,
            root_user: None,
            root_password: None,
            keepalive_ms: 5000,
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            log_path: DEFAULT_TEMPLATE.to_string(),
            ftp_dir: DEFAULT_FTP_DIR.to_string(),
        }
    }
}

// Passwords stay out of logs.
impl std::fmt::Debug for DeviceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |secret: &Option<String>| secret.as_ref().map(|_| "***");
        f.debug_struct("DeviceConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &redact(&self.password))
            .field("root_user", &self.root_user)
            .field("root_password", &redact(&self.root_password))
            .field("keepalive_ms", &self.keepalive_ms)
            .field("log_dir", &self.log_dir)
            .field("log_path", &self.log_path)
            .field("ftp_dir", &self.ftp_dir)
            .finish()
    }
}

impl DeviceConfig {
    pub fn validate(&self, name: &str) -> Result<()> {
        let invalid = |reason| ErrorKind::InvalidDevice { device: name.to_string(), reason };
        if validate_path(name).is_err() || name.contains('/') {
            exn::bail!(invalid("name must be a single path component"));
        }
        if self.host.trim().is_empty() {
            exn::bail!(invalid("host is required"));
        }
        if !self.log_dir.is_absolute() {
            exn::bail!(invalid("log_dir must be absolute"));
        }
        if self.ftp_dir.is_empty() {
            exn::bail!(invalid("ftp_dir must not be empty"));
        }
        self.template().or_raise(|| invalid("log_path is not a valid template"))?;
        Ok(())
    }

    pub fn template(&self) -> camsync_mirror::error::Result<PathTemplate> {
        self.log_path.parse()
    }

    pub fn keepalive(&self) -> Duration {
        Duration::from_millis(self.keepalive_ms)
    }

    pub fn session_options(&self, name: &str) -> SessionOptions {
        SessionOptions::new(name).with_ftp_dir(self.ftp_dir.clone())
    }

    /// Opens the device's local mirror, creating its root if missing.
    pub fn mirror(&self, name: &str) -> Result<MirrorStore> {
        let mirror_error = || ErrorKind::Mirror(name.to_string());
        let template = self.template().or_raise(mirror_error)?;
        MirrorStore::new(&self.log_dir, name, template).or_raise(mirror_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn device() -> DeviceConfig {
        DeviceConfig { host: "10.0.0.5".into(), ..DeviceConfig::default() }
    }

    #[test]
    fn test_defaults() {
        let config = DeviceConfig::default();
        assert_eq!(config.port, 80);
        assert_eq!(config.keepalive(), Duration::from_secs(5));
        assert_eq!(config.log_path, "{device}/{year}/{month}/{day}/{filename}");
        assert_eq!(config.ftp_dir, "/mnt/sda0/");
        assert!(device().validate("garage").is_ok());
    }

    #[rstest]
    #[case::no_host(DeviceConfig::default(), "garage")]
    #[case::relative_log_dir(DeviceConfig { log_dir: "logs".into(), ..device() }, "garage")]
    #[case::bad_template(DeviceConfig { log_path: "{device}/{hour}".into(), ..device() }, "garage")]
    #[case::empty_ftp_dir(DeviceConfig { ftp_dir: String::new(), ..device() }, "garage")]
    #[case::nested_name(device(), "garage/left")]
    #[case::traversal_name(device(), "..")]
    fn test_validate_rejects(#[case] config: DeviceConfig, #[case] name: &str) {
        let err = config.validate(name).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidDevice { .. }));
    }

    #[test]
    fn test_debug_redacts_passwords() {
        let config = DeviceConfig { password: Some("hunter2".into()), ..device() };
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("***"));
    }

    #[test]
    fn test_mirror_and_session() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = DeviceConfig { log_dir: temp_dir.path().join("logs"), ftp_dir: "/mnt/sdb0/".into(), ..device() };
        let store = config.mirror("garage").unwrap();
        assert_eq!(store.device_dir().unwrap(), temp_dir.path().join("logs/garage"));
        assert_eq!(config.session_options("garage").ftp_dir, "/mnt/sdb0/");
    }
}
