//! Configuration schema for datacache
//!
//! Configuration is stored at `~/.config/datacache/config.toml`

use crate::config::ConfigManager;
use crate::store::{FailurePolicy, DEFAULT_PERSIST_PATTERN, DEFAULT_SNAPSHOT_KEY};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Cache policies
    pub cache: CacheConfig,

    /// Fallback network source
    pub network: NetworkConfig,

    /// Snapshot storage
    pub storage: StorageConfig,

    /// Extra network sources mounted by protocol
    pub sources: Vec<SourceConfig>,

    /// Values served synchronously under the `local:` protocol
    pub local: BTreeMap<String, Value>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            cache: CacheConfig::default(),
            network: NetworkConfig::default(),
            storage: StorageConfig::default(),
            sources: vec![SourceConfig {
                protocol: "cloud".to_string(),
                base_url: "https://www.makecode.com/api/".to_string(),
                expiration_secs: Some(60),
            }],
            local: BTreeMap::new(),
        }
    }
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Cache behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Storage key holding the persisted snapshot
    pub snapshot_key: String,

    /// Regexes selecting which paths are persisted
    pub persist_patterns: Vec<String>,

    /// What to do when a source fails
    pub failure: FailureConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            snapshot_key: DEFAULT_SNAPSHOT_KEY.to_string(),
            persist_patterns: vec![DEFAULT_PERSIST_PATTERN.to_string()],
            failure: FailureConfig::default(),
        }
    }
}

/// Failure handling mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureMode {
    #[default]
    LeaveStale,
    Retry,
}

/// Failure handling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FailureConfig {
    /// "leave-stale" or "retry"
    pub mode: FailureMode,

    /// Retries after the first failed attempt
    pub max_retries: u32,

    /// First backoff delay in milliseconds
    pub initial_backoff_ms: u64,

    /// Backoff ceiling in milliseconds
    pub max_backoff_ms: u64,
}

impl Default for FailureConfig {
    fn default() -> Self {
        Self {
            mode: FailureMode::LeaveStale,
            max_retries: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 30_000,
        }
    }
}

impl FailureConfig {
    /// Policy the store should apply
    pub fn policy(&self) -> FailurePolicy {
        match self.mode {
            FailureMode::LeaveStale => FailurePolicy::LeaveStale,
            FailureMode::Retry => FailurePolicy::Retry {
                max_retries: self.max_retries,
                initial_backoff: Duration::from_millis(self.initial_backoff_ms),
                max_backoff: Duration::from_millis(self.max_backoff_ms),
            },
        }
    }
}

/// Fallback network source settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Base URL for un-prefixed paths
    pub base_url: String,

    /// Freshness in seconds; unset means until invalidated
    pub expiration_secs: Option<u64>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Never fetch from the network
    pub offline: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.makecode.com/api/".to_string(),
            expiration_secs: Some(60),
            timeout_secs: 30,
            offline: false,
        }
    }
}

/// A network source mounted under a protocol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Protocol prefix, without the colon
    pub protocol: String,

    /// Base URL the protocol-less path is appended to
    pub base_url: String,

    /// Freshness in seconds; unset means until invalidated
    #[serde(default)]
    pub expiration_secs: Option<u64>,
}

/// Snapshot storage settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for storage files (defaults to the state directory)
    pub dir: Option<PathBuf>,
}

impl StorageConfig {
    /// Directory storage files live in
    pub fn resolved_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(ConfigManager::storage_dir)
    }
}
