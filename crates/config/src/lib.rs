//! Layered configuration for camera devices.
//!
//! Sources are merged in order, later ones winning:
//!
//! 1. built-in defaults,
//! 2. a config file (TOML, YAML or JSON, chosen by extension),
//! 3. `CAMSYNC_` environment variables, with `__` separating nested keys,
//!    e.g. `CAMSYNC_DEVICES__GARAGE__PASSWORD`.
//!
//! ```toml
//! [devices.garage]
//! host = "192.168.1.20"
//! user = "admin"
//! log_dir = "/data/logs"
//! log_path = "{device}/{year}/{month}/{day}/{filename}"
//! ```

mod device;
pub mod error;

pub use crate::device::DeviceConfig;
use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::{OptionExt, ResultExt};
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Prefix of environment variables read by [`Config::load`].
pub const ENV_PREFIX: &str = "CAMSYNC_";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Devices keyed by name. The name becomes the first component of each
    /// device's mirror paths.
    #[serde(default)]
    pub devices: BTreeMap<String, DeviceConfig>,
}

impl Config {
    /// `config.toml` in the platform's config directory for camsync.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "camsync").map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    /// Loads and validates the configuration.
    ///
    /// Without an explicit `path`, the file at [`default_path`](Self::default_path)
    /// is used when it exists; defaults and environment still apply when it
    /// does not.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config: Self = Self::figment(path)?.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        tracing::debug!(devices = config.devices.len(), "configuration loaded");
        Ok(config)
    }

    /// The merged sources, before extraction.
    pub fn figment(path: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        let file = match path {
            Some(path) if !path.exists() => exn::bail!(ErrorKind::NotFound(path.to_path_buf())),
            Some(path) => Some(path.to_path_buf()),
            None => Self::default_path().filter(|path| path.exists()),
        };
        if let Some(file) = file {
            tracing::debug!(path = %file.display(), "reading config file");
            figment = match file.extension().and_then(|ext| ext.to_str()) {
                Some("toml") => figment.merge(Toml::file(&file)),
                Some("yaml" | "yml") => figment.merge(Yaml::file(&file)),
                Some("json") => figment.merge(Json::file(&file)),
                _ => exn::bail!(ErrorKind::UnsupportedFormat(file)),
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    pub fn validate(&self) -> Result<()> {
        for (name, device) in &self.devices {
            device.validate(name)?;
        }
        Ok(())
    }

    pub fn device(&self, name: &str) -> Result<&DeviceConfig> {
        self.devices.get(name).ok_or_raise(|| ErrorKind::UnknownDevice(name.to_string()))
    }
}
