//! datacache - reactive data cache
//!
//! Caches values fetched from pluggable data sources keyed by
//! `protocol:path` strings, expires them per source, de-duplicates
//! concurrent fetches, notifies subscribed observers and persists an
//! allow-listed subset between runs.

pub mod cli;
pub mod config;
pub mod error;
pub mod source;
pub mod storage;
pub mod store;
pub mod ui;

pub use error::{CacheError, CacheResult};
pub use source::{DataSource, Expiration};
pub use store::{CacheStore, FetchResult, FetchStatus, Observer, Subscriber};
