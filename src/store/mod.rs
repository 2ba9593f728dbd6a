//! Reactive data cache
//!
//! `CacheStore` keeps one entry per path, fetches through the data source
//! mounted for the path's protocol, and pushes change notifications to
//! subscribed observers.
//!
//! # Freshness
//!
//! | Source expiration | Expired when |
//! |-------------------|--------------|
//! | `UntilInvalidated` | no data, or never refreshed (loaded from snapshot, invalidated) |
//! | `After(ttl)` | no data, never refreshed, or older than `ttl` |
//!
//! At most one fetch per path is in flight; reads that arrive meanwhile
//! wait on it. Fetches run on spawned Tokio tasks, so the synchronous read
//! methods must be called from within a runtime.

mod entry;
mod observer;
mod policy;
mod snapshot;

pub use entry::EntryInfo;
pub use observer::{Observer, Subscriber};
pub use policy::{FailurePolicy, PersistPolicy, DEFAULT_PERSIST_PATTERN};
pub use snapshot::{parse_snapshot, SnapshotRecord, DEFAULT_SNAPSHOT_KEY};

use crate::config::Config;
use crate::error::{CacheError, CacheResult};
use crate::source::{DataSource, Expiration, LocalSource, NetworkSource, SourceRegistry};
use crate::storage::{FileStorage, MemoryStorage, Storage};
use chrono::Utc;
use entry::{CacheEntry, FetchOutcome};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// State of a cached read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    /// Data is stale or missing and a fetch is under way
    Pending,
    /// Data is fresh
    Complete,
    /// Data is stale and the last fetch failed
    Error,
    /// Data is stale and the source is offline, so nothing was queued
    Offline,
}

/// Data plus the status it was read with
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult {
    pub data: Option<Value>,
    pub status: FetchStatus,
}

impl FetchResult {
    fn complete(data: Value) -> Self {
        Self {
            data: Some(data),
            status: FetchStatus::Complete,
        }
    }
}

/// Shared handle to a cache; clones see the same entries
#[derive(Clone)]
pub struct CacheStore {
    inner: Arc<Inner>,
}

struct Inner {
    entries: Mutex<HashMap<String, CacheEntry>>,
    next_generation: AtomicU64,
    registry: RwLock<SourceRegistry>,
    storage: Arc<dyn Storage>,
    persist: PersistPolicy,
    failure: FailurePolicy,
    snapshot_key: String,
    snapshot_lock: tokio::sync::Mutex<()>,
}

/// Builder for `CacheStore`
pub struct CacheStoreBuilder {
    fallback: Arc<dyn DataSource>,
    storage: Option<Arc<dyn Storage>>,
    persist: PersistPolicy,
    failure: FailurePolicy,
    snapshot_key: String,
}

impl CacheStoreBuilder {
    /// Storage for snapshots (in-memory when not set)
    pub fn storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn persist_policy(mut self, persist: PersistPolicy) -> Self {
        self.persist = persist;
        self
    }

    pub fn failure_policy(mut self, failure: FailurePolicy) -> Self {
        self.failure = failure;
        self
    }

    pub fn snapshot_key(mut self, key: impl Into<String>) -> Self {
        self.snapshot_key = key.into();
        self
    }

    pub fn build(self) -> CacheStore {
        CacheStore {
            inner: Arc::new(Inner {
                entries: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(0),
                registry: RwLock::new(SourceRegistry::new(self.fallback)),
                storage: self
                    .storage
                    .unwrap_or_else(|| Arc::new(MemoryStorage::new())),
                persist: self.persist,
                failure: self.failure,
                snapshot_key: self.snapshot_key,
                snapshot_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }
}

impl CacheStore {
    /// Create a store with default policies and in-memory storage
    pub fn new(fallback: Arc<dyn DataSource>) -> Self {
        Self::builder(fallback).build()
    }

    /// Start building a store whose unmatched paths go to `fallback`
    pub fn builder(fallback: Arc<dyn DataSource>) -> CacheStoreBuilder {
        CacheStoreBuilder {
            fallback,
            storage: None,
            persist: PersistPolicy::default(),
            failure: FailurePolicy::default(),
            snapshot_key: DEFAULT_SNAPSHOT_KEY.to_string(),
        }
    }

    /// Build a store from configuration: network fallback, configured
    /// network sources, the `local` table, file storage and policies
    pub async fn from_config(config: &Config) -> CacheResult<Self> {
        let network = &config.network;
        let timeout = Duration::from_secs(network.timeout_secs);

        let fallback = NetworkSource::with_timeout(
            "network",
            &network.base_url,
            Expiration::from_secs(network.expiration_secs),
            timeout,
        );
        fallback.set_offline(network.offline);

        let storage = FileStorage::new(config.storage.resolved_dir()).await?;
        let persist = PersistPolicy::new(&config.cache.persist_patterns)?;

        let store = Self::builder(Arc::new(fallback))
            .storage(Arc::new(storage))
            .persist_policy(persist)
            .failure_policy(config.cache.failure.policy())
            .snapshot_key(&config.cache.snapshot_key)
            .build();

        for source in &config.sources {
            let mounted = NetworkSource::with_timeout(
                &source.protocol,
                &source.base_url,
                Expiration::from_secs(source.expiration_secs),
                timeout,
            );
            mounted.set_offline(network.offline);
            store.try_mount_source(&source.protocol, Arc::new(mounted))?;
        }

        if !config.local.is_empty() {
            let values = config
                .local
                .iter()
                .map(|(key, value)| (format!("local:{}", key), value.clone()))
                .collect();
            store.try_mount_source("local", Arc::new(LocalSource::with_values("local", values)))?;
        }

        Ok(store)
    }

    /// Mount a source under a protocol
    ///
    /// # Panics
    ///
    /// Panics if the protocol is already mounted.
    pub fn mount_source(&self, protocol: &str, source: Arc<dyn DataSource>) {
        self.registry_write().mount(protocol, source);
    }

    /// Mount a source, reporting a duplicate protocol as an error
    pub fn try_mount_source(&self, protocol: &str, source: Arc<dyn DataSource>) -> CacheResult<()> {
        self.registry_write().try_mount(protocol, source)
    }

    /// Source that serves (or would serve) `path`
    pub fn resolve_source(&self, path: &str) -> Arc<dyn DataSource> {
        self.inner
            .registry
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .resolve(path)
    }

    /// Mounted protocol names
    pub fn protocols(&self) -> Vec<String> {
        self.inner
            .registry
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .protocols()
            .into_iter()
            .map(String::from)
            .collect()
    }

    // Subscription

    /// Subscribe an observer to a path; repeated calls are no-ops
    pub fn subscribe(&self, subscriber: &Subscriber, path: &str) {
        let mut entries = self.lock_entries();
        let entry = self.lookup(&mut entries, path);
        if !entry.observers.contains(subscriber) {
            entry.observers.push(subscriber.clone());
            subscriber.record(path);
        }
    }

    /// Remove an observer from every path it observes
    pub fn unsubscribe(&self, subscriber: &Subscriber) {
        let paths = subscriber.take_subscriptions();
        if paths.is_empty() {
            return;
        }

        let mut entries = self.lock_entries();
        for path in paths {
            if let Some(entry) = entries.get_mut(&path) {
                entry.observers.retain(|o| o != subscriber);
            }
        }
    }

    /// Number of observers subscribed to a path
    pub fn observer_count(&self, path: &str) -> usize {
        self.lock_entries()
            .get(path)
            .map_or(0, |entry| entry.observers.len())
    }

    // Reads

    /// Read a path for rendering: subscribes, never blocks
    pub fn get_cached(&self, subscriber: &Subscriber, path: &str) -> Option<Value> {
        self.get_cached_with_status(subscriber, path).data
    }

    /// Like `get_cached`, with the fetch status
    pub fn get_cached_with_status(&self, subscriber: &Subscriber, path: &str) -> FetchResult {
        self.subscribe(subscriber, path);
        self.get_data_with_status(path)
    }

    /// Read a path without subscribing, queueing a background fetch if stale
    pub fn get_data_with_status(&self, path: &str) -> FetchResult {
        let now = Instant::now();
        let mut entries = self.lock_entries();
        let entry = self.lookup(&mut entries, path);

        if entry.is_synchronous() {
            let source = Arc::clone(&entry.source);
            drop(entries);
            return match source.get_synchronous(path) {
                Ok(data) => FetchResult::complete(data),
                Err(e) => {
                    warn!("Synchronous read of {} failed: {}", path, e);
                    FetchResult {
                        data: None,
                        status: FetchStatus::Error,
                    }
                }
            };
        }

        let mut result = FetchResult {
            data: entry.data.clone(),
            status: FetchStatus::Complete,
        };

        if entry.is_expired(now) {
            if entry.source.is_offline() {
                result.status = FetchStatus::Offline;
            } else {
                result.status = if entry.last_error.is_some() {
                    FetchStatus::Error
                } else {
                    FetchStatus::Pending
                };
                self.trigger_fetch(entry);
            }
        }

        result
    }

    /// Read a path, waiting for a fetch when the cached value is stale
    pub async fn get_async(&self, path: &str) -> CacheResult<Value> {
        let receiver = {
            let now = Instant::now();
            let mut entries = self.lock_entries();
            let entry = self.lookup(&mut entries, path);

            if entry.is_synchronous() {
                let source = Arc::clone(&entry.source);
                drop(entries);
                return source.get_synchronous(path);
            }

            if let Some(data) = entry.fresh_data(now) {
                debug!("Cache hit for {}", path);
                return Ok(data);
            }

            if entry.source.is_offline() {
                return entry
                    .data
                    .clone()
                    .ok_or_else(|| CacheError::Offline(path.to_string()));
            }

            let (tx, rx) = oneshot::channel();
            entry.waiters.push(tx);
            self.trigger_fetch(entry);
            rx
        };

        match receiver.await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(reason)) => Err(CacheError::fetch_failed(path, reason)),
            Err(_) => Err(CacheError::FetchAbandoned(path.to_string())),
        }
    }

    // Invalidation

    /// Mark every path starting with `prefix` stale, refetching observed ones
    ///
    /// A trailing `:*` matches the whole protocol. Returns the number of
    /// entries touched.
    pub fn invalidate(&self, prefix: &str) -> usize {
        let prefix = match prefix.strip_suffix('*') {
            Some(stripped) if stripped.ends_with(':') => stripped,
            _ => prefix,
        };

        let mut touched: Vec<Arc<dyn DataSource>> = Vec::new();
        let mut count = 0;
        {
            let mut entries = self.lock_entries();
            for entry in entries.values_mut().filter(|e| e.path.starts_with(prefix)) {
                entry.last_refresh = None;
                count += 1;
                if entry.fetch_in_flight {
                    entry.invalidated_in_flight = true;
                } else if !entry.observers.is_empty() {
                    self.trigger_fetch(entry);
                }
                if !touched.iter().any(|s| Arc::ptr_eq(s, &entry.source)) {
                    touched.push(Arc::clone(&entry.source));
                }
            }
        }

        for source in touched {
            source.on_invalidated(prefix);
        }

        debug!("Invalidated {} entries under {:?}", count, prefix);
        count
    }

    /// Drop every entry and persist an empty snapshot
    ///
    /// Callers still waiting on a fetch get `FetchAbandoned`.
    pub async fn clear(&self) -> CacheResult<()> {
        let dropped = {
            let mut entries = self.lock_entries();
            let count = entries.len();
            entries.clear();
            count
        };
        debug!("Cleared {} cache entries", dropped);
        self.save_snapshot().await?;
        Ok(())
    }

    // Persistence

    /// Entries the persistence policy allows, sorted by path
    pub fn snapshot_records(&self) -> Vec<SnapshotRecord> {
        let entries = self.lock_entries();
        let mut records: Vec<SnapshotRecord> = entries
            .values()
            .filter(|e| self.inner.persist.matches(&e.path))
            .filter_map(|e| {
                e.data.clone().map(|data| SnapshotRecord {
                    path: e.path.clone(),
                    data,
                })
            })
            .collect();
        records.sort_by(|a, b| a.path.cmp(&b.path));
        records
    }

    /// Write the persisted subset to storage; returns the record count
    pub async fn save_snapshot(&self) -> CacheResult<usize> {
        let _guard = self.inner.snapshot_lock.lock().await;
        let records = self.snapshot_records();
        let raw = serde_json::to_string(&records)?;
        self.inner
            .storage
            .set(&self.inner.snapshot_key, &raw)
            .await?;
        debug!("Saved snapshot with {} entries", records.len());
        Ok(records.len())
    }

    /// Seed entries from the persisted snapshot; returns the record count
    ///
    /// Loaded data is served immediately but counts as never refreshed.
    pub async fn load_snapshot(&self) -> usize {
        let raw = match self.inner.storage.get(&self.inner.snapshot_key).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Could not read cache snapshot: {}", e);
                None
            }
        };

        let records = parse_snapshot(raw.as_deref());
        let count = records.len();

        let mut entries = self.lock_entries();
        for record in records {
            let entry = self.lookup(&mut entries, &record.path);
            entry.data = Some(record.data);
        }

        if count > 0 {
            info!("Loaded {} cached entries from snapshot", count);
        }
        count
    }

    // Inspection

    /// State of one entry, if it exists
    pub fn entry_info(&self, path: &str) -> Option<EntryInfo> {
        self.lock_entries().get(path).map(CacheEntry::info)
    }

    /// State of every entry, sorted by path
    pub fn entries_info(&self) -> Vec<EntryInfo> {
        let mut infos: Vec<EntryInfo> = self.lock_entries().values().map(CacheEntry::info).collect();
        infos.sort_by(|a, b| a.path.cmp(&b.path));
        infos
    }

    // Internals

    fn lock_entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.inner.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn registry_write(&self) -> std::sync::RwLockWriteGuard<'_, SourceRegistry> {
        self.inner
            .registry
            .write()
            .unwrap_or_else(|e| e.into_inner())
    }

    fn lookup<'a>(
        &self,
        entries: &'a mut HashMap<String, CacheEntry>,
        path: &str,
    ) -> &'a mut CacheEntry {
        entries
            .entry(path.to_string())
            .or_insert_with(|| {
                let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
                CacheEntry::new(path, generation, self.resolve_source(path))
            })
    }

    fn trigger_fetch(&self, entry: &mut CacheEntry) {
        if entry.fetch_in_flight {
            debug!("Fetch already in flight for {}", entry.path);
            return;
        }
        if entry.source.is_offline() {
            debug!("Source {} is offline, not fetching {}", entry.source.name(), entry.path);
            return;
        }

        entry.fetch_in_flight = true;
        let store = self.clone();
        let path = entry.path.clone();
        let generation = entry.generation;
        let source = Arc::clone(&entry.source);
        tokio::spawn(async move {
            store.run_fetch(path, generation, source).await;
        });
    }

    async fn run_fetch(self, path: String, generation: u64, source: Arc<dyn DataSource>) {
        debug!("Fetching {} from {}", path, source.name());
        let outcome = self.fetch_with_policy(&path, source.as_ref()).await;
        self.complete_fetch(&path, generation, outcome).await;
    }

    async fn fetch_with_policy(&self, path: &str, source: &dyn DataSource) -> CacheResult<Value> {
        if source.is_synchronous(path) {
            return source.get_synchronous(path);
        }

        let mut attempt = 0;
        loop {
            match source.get_async(path).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    attempt += 1;
                    match self.inner.failure.backoff(attempt) {
                        Some(delay) if e.is_retryable() => {
                            debug!(
                                "Fetch of {} failed ({}), retry {} in {:?}",
                                path, e, attempt, delay
                            );
                            tokio::time::sleep(delay).await;
                        }
                        _ => return Err(e),
                    }
                }
            }
        }
    }

    async fn complete_fetch(&self, path: &str, generation: u64, outcome: CacheResult<Value>) {
        let (waiters, observers, delivered, persist) = {
            let mut entries = self.lock_entries();
            let Some(entry) = entries
                .get_mut(path)
                .filter(|entry| entry.generation == generation)
            else {
                debug!("Entry {} was cleared while fetching", path);
                return;
            };

            entry.fetch_in_flight = false;
            let delivered: FetchOutcome = match outcome {
                Ok(value) => {
                    entry.data = Some(value.clone());
                    entry.last_refresh = Some(Instant::now());
                    entry.refreshed_at = Some(Utc::now());
                    entry.last_error = None;
                    Ok(value)
                }
                Err(e) => {
                    warn!("Fetch failed for {}: {}", path, e);
                    let reason = e.to_string();
                    entry.last_error = Some(reason.clone());
                    Err(reason)
                }
            };

            if std::mem::take(&mut entry.invalidated_in_flight) {
                debug!("{} was invalidated while fetching", path);
                entry.last_refresh = None;
                if !entry.observers.is_empty() {
                    self.trigger_fetch(entry);
                }
            }

            let persist = delivered.is_ok() && self.inner.persist.matches(path);
            let observers = if delivered.is_ok() {
                entry.observers.clone()
            } else {
                Vec::new()
            };
            (std::mem::take(&mut entry.waiters), observers, delivered, persist)
        };

        if persist {
            if let Err(e) = self.save_snapshot().await {
                warn!("Failed to save cache snapshot: {}", e);
            }
        }

        for waiter in waiters {
            // Waiter went away; nothing to deliver
            let _ = waiter.send(delivered.clone());
        }

        if !observers.is_empty() {
            let path = path.to_string();
            tokio::spawn(async move {
                for observer in &observers {
                    observer.notify(&path);
                }
            });
        }
    }
}
