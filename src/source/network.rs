//! HTTP-backed JSON source

use super::{protocol_of, strip_protocol, DataSource, Expiration};
use crate::error::{CacheError, CacheResult};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::debug;

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Source that GETs `<base_url><path>` and parses the body as JSON
///
/// The protocol prefix, when present, is stripped before building the URL.
pub struct NetworkSource {
    name: String,
    base_url: String,
    expiration: Expiration,
    offline: AtomicBool,
    agent: ureq::Agent,
}

impl NetworkSource {
    /// Create a network source with the default timeout
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, expiration: Expiration) -> Self {
        Self::with_timeout(name, base_url, expiration, DEFAULT_TIMEOUT)
    }

    /// Create a network source with a request timeout
    pub fn with_timeout(
        name: impl Into<String>,
        base_url: impl Into<String>,
        expiration: Expiration,
        timeout: Duration,
    ) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();

        Self {
            name: name.into(),
            base_url: base_url.into(),
            expiration,
            offline: AtomicBool::new(false),
            agent: ureq::Agent::new_with_config(config),
        }
    }

    /// Mark the source offline (no fetches) or back online
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Relaxed);
    }

    /// Build the request URL for a cache path
    pub fn url_for(&self, path: &str) -> String {
        let rest = if protocol_of(path).is_some() {
            strip_protocol(path).unwrap_or(path)
        } else {
            path
        };
        join_url(&self.base_url, rest)
    }
}

fn join_url(base: &str, rest: &str) -> String {
    match (base.ends_with('/'), rest.starts_with('/')) {
        (true, true) => format!("{}{}", base, &rest[1..]),
        (false, false) if !base.is_empty() && !rest.is_empty() => format!("{}/{}", base, rest),
        _ => format!("{}{}", base, rest),
    }
}

#[async_trait]
impl DataSource for NetworkSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_async(&self, path: &str) -> CacheResult<Value> {
        let url = self.url_for(path);
        let agent = self.agent.clone();
        debug!("GET {}", url);

        tokio::task::spawn_blocking(move || -> CacheResult<Value> {
            let mut response = agent.get(url.as_str()).call().map_err(|e| match e {
                ureq::Error::StatusCode(status) => CacheError::HttpStatus {
                    url: url.clone(),
                    status,
                },
                other => CacheError::Network(other.to_string()),
            })?;

            let body = response
                .body_mut()
                .read_to_string()
                .map_err(|e| CacheError::Network(e.to_string()))?;

            Ok(serde_json::from_str(&body)?)
        })
        .await
        .map_err(|e| CacheError::Internal(format!("fetch task failed: {}", e)))?
    }

    fn expiration(&self, _path: &str) -> Expiration {
        self.expiration
    }

    fn is_offline(&self) -> bool {
        self.offline.load(Ordering::Relaxed)
    }
}
