//! appforge configuration.
//!
//! Loaded from `~/.appforge/config.toml`. Every key is optional; a missing
//! file means defaults.
//!
//! ```toml
//! default-identity = "alice"
//! admins = ["alice"]
//! deploy-timeout-ms = 10000
//! store = "/var/lib/appforge/store.sqlite"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{fs, io};

use serde::{Deserialize, Serialize};

const DEFAULT_DEPLOY_TIMEOUT_MS: u64 = 10_000;

/// appforge configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    /// Identity used when neither `--as` nor `APPFORGE_IDENTITY` is set.
    pub default_identity: Option<String>,

    /// Users allowed to act on anything, regardless of who created it.
    pub admins: Vec<String>,

    /// Deadline for each remote call made by `deploy`.
    pub deploy_timeout_ms: u64,

    /// Store location. Defaults to `~/.appforge/store.sqlite`.
    pub store: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_identity: None,
            admins: Vec::new(),
            deploy_timeout_ms: DEFAULT_DEPLOY_TIMEOUT_MS,
            store: None,
        }
    }
}

impl Config {
    /// Load config from `~/.appforge/config.toml`, or defaults if there is
    /// no such file.
    pub fn load() -> Result<Self, String> {
        match Self::path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load config from `path`. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let contents = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(format!("failed to read {}: {e}", path.display())),
        };

        toml::from_str(&contents).map_err(|e| format!("invalid config at {}: {e}", path.display()))
    }

    /// The config file path: `~/.appforge/config.toml`.
    pub fn path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".appforge").join("config.toml"))
    }

    pub fn deploy_timeout(&self) -> Duration {
        Duration::from_millis(self.deploy_timeout_ms)
    }
}
