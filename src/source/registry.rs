//! Protocol name to data source mapping

use super::{protocol_of, DataSource};
use crate::error::{CacheError, CacheResult};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Registry of mounted data sources with an explicit fallback
pub struct SourceRegistry {
    sources: HashMap<String, Arc<dyn DataSource>>,
    fallback: Arc<dyn DataSource>,
}

impl SourceRegistry {
    /// Create a registry whose unmatched paths go to `fallback`
    pub fn new(fallback: Arc<dyn DataSource>) -> Self {
        Self {
            sources: HashMap::new(),
            fallback,
        }
    }

    /// Mount a source under a protocol name
    ///
    /// # Panics
    ///
    /// Panics if the protocol is already mounted.
    pub fn mount(&mut self, protocol: &str, source: Arc<dyn DataSource>) {
        assert!(
            !self.sources.contains_key(protocol),
            "data source already mounted for protocol {protocol}"
        );
        self.insert(protocol, source);
    }

    /// Mount a source, reporting a duplicate protocol as an error
    pub fn try_mount(&mut self, protocol: &str, source: Arc<dyn DataSource>) -> CacheResult<()> {
        if self.sources.contains_key(protocol) {
            return Err(CacheError::SourceExists(protocol.to_string()));
        }
        self.insert(protocol, source);
        Ok(())
    }

    fn insert(&mut self, protocol: &str, source: Arc<dyn DataSource>) {
        debug!("Mounted source {} under {}:", source.name(), protocol);
        self.sources.insert(protocol.to_string(), source);
    }

    /// Resolve the source serving `path`
    pub fn resolve(&self, path: &str) -> Arc<dyn DataSource> {
        protocol_of(path)
            .and_then(|protocol| self.sources.get(protocol))
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.fallback))
    }

    /// Check whether a protocol is mounted
    pub fn is_mounted(&self, protocol: &str) -> bool {
        self.sources.contains_key(protocol)
    }

    /// Mounted protocol names, sorted
    pub fn protocols(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.sources.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
