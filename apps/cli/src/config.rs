//! CLI configuration management.
//!
//! Configuration is stored as JSON:
//! - Linux: `~/.config/filedock/config.json`
//! - Windows: `%APPDATA%/filedock/config.json`

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use filedock_protocol::MenuId;
use filedock_upload::{DirectoryResolver, UploadConfig};
use serde::{Deserialize, Serialize};

/// CLI configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CliConfig {
    /// Storage server base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Session token, sent verbatim in the `Authorization` header.
    #[serde(default)]
    pub token: String,

    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Engine tuning.
    #[serde(default)]
    pub upload: UploadConfig,

    /// Relative directory → target directory id.
    #[serde(default)]
    pub directories: BTreeMap<String, i64>,
}

fn default_base_url() -> String {
    "http://localhost:8080".into()
}

fn default_timeout_secs() -> u64 {
    15
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: String::new(),
            timeout_secs: default_timeout_secs(),
            upload: UploadConfig::default(),
            directories: BTreeMap::new(),
        }
    }
}

impl CliConfig {
    /// Loads configuration from `path`, or from the default location.
    /// A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => config_path(),
        };

        if !path.exists() {
            tracing::debug!(path = %path.display(), "no configuration file");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let config: CliConfig = serde_json::from_str(&content)?;
        config.upload.validate()?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Builds the directory resolver.
    ///
    /// `default` catches unmatched files. Without it, an empty mapping
    /// sends everything to the storage root and a non-empty one rejects
    /// unmatched files.
    pub fn resolver(&self, default: Option<MenuId>) -> DirectoryResolver {
        let resolver = DirectoryResolver::from_entries(
            self.directories
                .iter()
                .map(|(dir, id)| (dir.as_str(), MenuId(*id))),
        );
        match default {
            Some(id) => resolver.with_default(Some(id)),
            None if resolver.is_empty() => resolver.with_default(None),
            None => resolver,
        }
    }
}

/// Returns the platform-specific configuration file path.
fn config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        PathBuf::from(appdata).join("filedock").join("config.json")
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home)
            .join(".config")
            .join("filedock")
            .join("config.json")
    }
}
