//! Data sources ("virtual APIs") that back cache entries
//!
//! A path may carry a `protocol:` prefix that selects which mounted source
//! serves it. Un-prefixed paths, and prefixes nobody mounted, go to the
//! registry's fallback source.

mod local;
mod network;
pub mod registry;

pub use local::LocalSource;
pub use network::NetworkSource;
pub use registry::SourceRegistry;

use crate::error::{CacheError, CacheResult};
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use std::time::Duration;

/// Intervals above this many milliseconds mean "until invalidated"
pub const INFINITE_EXPIRATION_MS: u64 = 10_000_000_000;

static PROTOCOL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([\w-]+):(.*)$").expect("protocol pattern is valid")
});

/// How long a fetched value stays fresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiration {
    /// Fresh from the first successful fetch until explicitly invalidated
    UntilInvalidated,
    /// Fresh for the given interval after each successful fetch
    After(Duration),
}

impl Expiration {
    /// Map a millisecond interval, treating huge values as infinite
    pub fn from_millis(ms: u64) -> Self {
        if ms > INFINITE_EXPIRATION_MS {
            Self::UntilInvalidated
        } else {
            Self::After(Duration::from_millis(ms))
        }
    }

    /// Map an optional interval in seconds; `None` never expires
    pub fn from_secs(secs: Option<u64>) -> Self {
        match secs {
            Some(secs) => Self::from_millis(secs.saturating_mul(1000)),
            None => Self::UntilInvalidated,
        }
    }
}

/// Provider of values for a protocol namespace
///
/// Implementations are either synchronous (values read live on every access,
/// never cached) or asynchronous (values fetched and cached by the store).
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Short name used in log output
    fn name(&self) -> &str;

    /// Whether `path` can be read without awaiting
    fn is_synchronous(&self, _path: &str) -> bool {
        false
    }

    /// Read `path` synchronously; only valid when `is_synchronous` holds
    fn get_synchronous(&self, path: &str) -> CacheResult<Value> {
        Err(CacheError::NotSynchronous {
            path: path.to_string(),
        })
    }

    /// Fetch the current value for `path`
    async fn get_async(&self, path: &str) -> CacheResult<Value>;

    /// Freshness budget for values fetched from `path`
    fn expiration(&self, path: &str) -> Expiration;

    /// Offline sources are never asked to fetch
    fn is_offline(&self) -> bool {
        false
    }

    /// Called once per invalidation that touched one of this source's entries
    fn on_invalidated(&self, _prefix: &str) {}
}

/// Get the protocol prefix of a path, if any
pub fn protocol_of(path: &str) -> Option<&str> {
    PROTOCOL_RE
        .captures(path)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Remove the protocol prefix from a path
pub fn strip_protocol(path: &str) -> CacheResult<&str> {
    PROTOCOL_RE
        .captures(path)
        .and_then(|caps| caps.get(2))
        .map(|m| m.as_str())
        .ok_or_else(|| CacheError::ProtocolMissing(path.to_string()))
}
