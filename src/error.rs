//! Error types for datacache
//!
//! All modules use `CacheResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for datacache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// All errors that can occur in datacache
#[derive(Error, Debug)]
pub enum CacheError {
    // Path and source errors
    #[error("Protocol missing in path: {0}")]
    ProtocolMissing(String),

    #[error("Data source already mounted for protocol: {0}")]
    SourceExists(String),

    #[error("Data source for {path} is not synchronous")]
    NotSynchronous { path: String },

    // Fetch errors
    #[error("Fetch failed for {path}: {reason}")]
    FetchFailed { path: String, reason: String },

    #[error("Fetch for {0} was abandoned before it completed")]
    FetchAbandoned(String),

    #[error("Data source for {0} is offline and nothing is cached")]
    Offline(String),

    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Network error: {0}")]
    Network(String),

    #[error("{failed} of {total} paths could not be fetched")]
    PartialFailure { failed: usize, total: usize },

    // Persistence errors
    #[error("Invalid persistence pattern {pattern}: {reason}")]
    PatternInvalid { pattern: String, reason: String },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a fetch failure for a path
    pub fn fetch_failed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::FetchFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Check if error is worth retrying
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::FetchAbandoned(_) => true,
            Self::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Offline(_) => Some("Run again without --offline once the network is back"),
            Self::ConfigInvalid { .. } => Some("Run: datacache config init --force"),
            Self::Network(_) => Some("Check network.base_url in your config"),
            _ => None,
        }
    }
}
