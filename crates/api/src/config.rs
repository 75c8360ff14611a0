#![forbid(unsafe_code)]

use crate::StaticUrlProvider;
use gw_core::RequestContext;
use gw_gitrpc::GitServiceConfig;
use gw_storage::StoreConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub git: GitConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.internal_base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("api.internal_base_url must not be empty"));
        }
        if self.api.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid("api.request_timeout_ms must be positive"));
        }
        if self.storage.busy_timeout_ms == 0 {
            return Err(ConfigError::Invalid("storage.busy_timeout_ms must be positive"));
        }
        if self.git.default_branch.trim().is_empty() {
            return Err(ConfigError::Invalid("git.default_branch must not be empty"));
        }
        Ok(())
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            busy_timeout: Duration::from_millis(self.storage.busy_timeout_ms),
            strict_triggers: self.storage.strict_triggers,
        }
    }

    pub fn git_service_config(&self) -> GitServiceConfig {
        GitServiceConfig {
            repos_root: self.git.repos_root.clone(),
            tmp_dir: self.git.tmp_dir.clone(),
        }
    }

    pub fn url_provider(&self) -> StaticUrlProvider {
        StaticUrlProvider::new(&self.api.internal_base_url)
    }

    /// Fresh context bounded by the configured request timeout.
    pub fn request_context(&self) -> RequestContext {
        RequestContext::with_timeout(Duration::from_millis(self.api.request_timeout_ms))
    }
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// Reject rows carrying trigger names this build does not know.
    #[serde(default)]
    pub strict_triggers: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            busy_timeout_ms: default_busy_timeout_ms(),
            strict_triggers: false,
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

// ---------------------------------------------------------------------------
// Git
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GitConfig {
    #[serde(default = "default_repos_root")]
    pub repos_root: PathBuf,
    #[serde(default = "default_tmp_dir")]
    pub tmp_dir: PathBuf,
    #[serde(default = "default_branch")]
    pub default_branch: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            repos_root: default_repos_root(),
            tmp_dir: default_tmp_dir(),
            default_branch: default_branch(),
        }
    }
}

fn default_repos_root() -> PathBuf {
    PathBuf::from("data/repos")
}

fn default_tmp_dir() -> PathBuf {
    PathBuf::from("data/tmp")
}

fn default_branch() -> String {
    "main".to_string()
}

// ---------------------------------------------------------------------------
// API
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    /// Base URL server-side hooks use to call back into the API.
    #[serde(default = "default_internal_base_url")]
    pub internal_base_url: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            internal_base_url: default_internal_base_url(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

fn default_internal_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_request_timeout_ms() -> u64 {
    30_000
}
