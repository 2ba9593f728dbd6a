//! Failure and persistence policies

use crate::error::{CacheError, CacheResult};
use regex::Regex;
use std::time::Duration;

/// Pattern persisted when nothing else is configured
pub const DEFAULT_PERSIST_PATTERN: &str = r"^cloud:(me/settings|ptr-pkg-)";

/// What a fetch does after its source fails
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Log the failure, keep the stale value; the next read fetches again
    #[default]
    LeaveStale,
    /// Retry retryable errors with exponential backoff before giving up
    Retry {
        max_retries: u32,
        initial_backoff: Duration,
        max_backoff: Duration,
    },
}

impl FailurePolicy {
    /// Backoff before retry number `attempt` (1-based), or `None` when out of retries
    pub fn backoff(&self, attempt: u32) -> Option<Duration> {
        match self {
            Self::LeaveStale => None,
            Self::Retry {
                max_retries,
                initial_backoff,
                max_backoff,
            } => {
                if attempt == 0 || attempt > *max_retries {
                    return None;
                }
                let factor = 2u32.saturating_pow(attempt - 1);
                Some(initial_backoff.saturating_mul(factor).min(*max_backoff))
            }
        }
    }
}

/// Allow-list of paths whose data is written to the snapshot
#[derive(Debug, Clone)]
pub struct PersistPolicy {
    patterns: Vec<Regex>,
}

impl PersistPolicy {
    /// Build from regex sources
    pub fn new<I, S>(patterns: I) -> CacheResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| {
                let p = p.as_ref();
                Regex::new(p).map_err(|e| CacheError::PatternInvalid {
                    pattern: p.to_string(),
                    reason: e.to_string(),
                })
            })
            .collect::<CacheResult<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// Persist nothing
    pub fn none() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    /// Whether data under `path` may be persisted
    pub fn matches(&self, path: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(path))
    }
}

impl Default for PersistPolicy {
    fn default() -> Self {
        Self {
            patterns: vec![Regex::new(DEFAULT_PERSIST_PATTERN).expect("default pattern is valid")],
        }
    }
}
