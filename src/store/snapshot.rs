//! Persisted snapshot layout

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Storage key used when none is configured
pub const DEFAULT_SNAPSHOT_KEY: &str = "api-cache";

/// One persisted entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub path: String,
    pub data: Value,
}

/// Parse a persisted snapshot; corrupt input reads as empty
pub fn parse_snapshot(raw: Option<&str>) -> Vec<SnapshotRecord> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    match serde_json::from_str(raw) {
        Ok(records) => records,
        Err(e) => {
            warn!("Ignoring corrupt cache snapshot: {}", e);
            Vec::new()
        }
    }
}
