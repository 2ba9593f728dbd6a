//! Synchronous in-memory source

use super::{DataSource, Expiration};
use crate::error::CacheResult;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;

/// Source that serves values from an in-memory map, read live on every access
///
/// Keys are full paths (protocol prefix included). Missing keys read as `null`.
pub struct LocalSource {
    name: String,
    values: RwLock<HashMap<String, Value>>,
}

impl LocalSource {
    /// Create an empty local source
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: RwLock::new(HashMap::new()),
        }
    }

    /// Create a local source pre-populated with values
    pub fn with_values(name: impl Into<String>, values: HashMap<String, Value>) -> Self {
        Self {
            name: name.into(),
            values: RwLock::new(values),
        }
    }

    /// Set the value served for a path
    pub fn set(&self, path: impl Into<String>, value: Value) {
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        values.insert(path.into(), value);
    }

    /// Remove the value for a path
    pub fn remove(&self, path: &str) -> Option<Value> {
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        values.remove(path)
    }

    fn read(&self, path: &str) -> Value {
        let values = self.values.read().unwrap_or_else(|e| e.into_inner());
        values.get(path).cloned().unwrap_or(Value::Null)
    }
}

#[async_trait]
impl DataSource for LocalSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_synchronous(&self, _path: &str) -> bool {
        true
    }

    fn get_synchronous(&self, path: &str) -> CacheResult<Value> {
        Ok(self.read(path))
    }

    async fn get_async(&self, path: &str) -> CacheResult<Value> {
        Ok(self.read(path))
    }

    fn expiration(&self, _path: &str) -> Expiration {
        Expiration::UntilInvalidated
    }
}
