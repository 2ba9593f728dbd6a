//! Per-path cache record

use super::observer::Subscriber;
use crate::source::{DataSource, Expiration};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::time::Instant;

/// Outcome delivered to `get_async` callers waiting on a fetch
pub(crate) type FetchOutcome = Result<Value, String>;

pub(crate) struct CacheEntry {
    pub(crate) path: String,
    /// Distinguishes this entry from one re-created for the same path after `clear`
    pub(crate) generation: u64,
    pub(crate) data: Option<Value>,
    pub(crate) last_refresh: Option<Instant>,
    pub(crate) refreshed_at: Option<DateTime<Utc>>,
    pub(crate) fetch_in_flight: bool,
    /// Invalidated while a fetch was running; that fetch's result is already stale
    pub(crate) invalidated_in_flight: bool,
    pub(crate) last_error: Option<String>,
    pub(crate) waiters: Vec<oneshot::Sender<FetchOutcome>>,
    pub(crate) observers: Vec<Subscriber>,
    pub(crate) source: Arc<dyn DataSource>,
}

impl CacheEntry {
    pub(crate) fn new(path: &str, generation: u64, source: Arc<dyn DataSource>) -> Self {
        Self {
            path: path.to_string(),
            generation,
            data: None,
            last_refresh: None,
            refreshed_at: None,
            fetch_in_flight: false,
            invalidated_in_flight: false,
            last_error: None,
            waiters: Vec::new(),
            observers: Vec::new(),
            source,
        }
    }

    pub(crate) fn is_synchronous(&self) -> bool {
        self.source.is_synchronous(&self.path)
    }

    /// Whether the entry needs a fetch before its data can be trusted
    ///
    /// Data without a `last_refresh` (loaded from a snapshot, or invalidated)
    /// is expired even under `UntilInvalidated`, so persisted data is always
    /// refreshed once per run.
    pub(crate) fn is_expired(&self, now: Instant) -> bool {
        let (Some(_), Some(at)) = (&self.data, self.last_refresh) else {
            return true;
        };
        match self.source.expiration(&self.path) {
            Expiration::UntilInvalidated => false,
            Expiration::After(ttl) => now.saturating_duration_since(at) > ttl,
        }
    }

    /// Data, if it is still fresh
    pub(crate) fn fresh_data(&self, now: Instant) -> Option<Value> {
        if self.is_expired(now) {
            None
        } else {
            self.data.clone()
        }
    }

    pub(crate) fn info(&self) -> EntryInfo {
        EntryInfo {
            path: self.path.clone(),
            source: self.source.name().to_string(),
            has_data: self.data.is_some(),
            fetch_in_flight: self.fetch_in_flight,
            observers: self.observers.len(),
            refreshed_at: self.refreshed_at,
            last_error: self.last_error.clone(),
        }
    }
}

/// Read-only view of an entry for inspection
#[derive(Debug, Clone, Serialize)]
pub struct EntryInfo {
    pub path: String,
    pub source: String,
    pub has_data: bool,
    pub fetch_in_flight: bool,
    pub observers: usize,
    pub refreshed_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheResult;
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Duration;

    struct Fixed(Expiration);

    #[async_trait]
    impl DataSource for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn get_async(&self, _path: &str) -> CacheResult<Value> {
            Ok(Value::Null)
        }

        fn expiration(&self, _path: &str) -> Expiration {
            self.0
        }
    }

    fn entry(exp: Expiration) -> CacheEntry {
        CacheEntry::new("p", 0, Arc::new(Fixed(exp)))
    }

    #[test]
    fn unset_is_expired() {
        let now = Instant::now();
        assert!(entry(Expiration::UntilInvalidated).is_expired(now));
        assert!(entry(Expiration::After(Duration::from_secs(1))).is_expired(now));
    }

    #[test]
    fn loaded_data_without_refresh_is_expired() {
        let mut e = entry(Expiration::UntilInvalidated);
        e.data = Some(json!(1));
        assert!(e.is_expired(Instant::now()));
    }

    #[test]
    fn until_invalidated_stays_fresh() {
        let mut e = entry(Expiration::UntilInvalidated);
        let now = Instant::now();
        e.data = Some(json!(1));
        e.last_refresh = Some(now);
        assert!(!e.is_expired(now + Duration::from_secs(86_400 * 365)));
        assert_eq!(e.fresh_data(now), Some(json!(1)));
    }

    #[test]
    fn interval_expiry() {
        let mut e = entry(Expiration::After(Duration::from_millis(1000)));
        let now = Instant::now();
        e.data = Some(json!(1));
        e.last_refresh = Some(now);
        assert!(!e.is_expired(now + Duration::from_millis(500)));
        assert!(!e.is_expired(now + Duration::from_millis(1000)));
        assert!(e.is_expired(now + Duration::from_millis(1500)));
        assert_eq!(e.fresh_data(now + Duration::from_millis(1500)), None);
    }
}
