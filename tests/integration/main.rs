//! Integration tests for datacache

use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Write a config that keeps storage inside `dir` and never hits the network
fn write_config(dir: &Path) -> PathBuf {
    let storage = dir.join("storage");
    let config = format!(
        r#"
[cache]
persist_patterns = ["^local:"]

[network]
base_url = "http://127.0.0.1:9/"
offline = true

[storage]
dir = "{}"

[local]
greeting = "hello"
answer = 42
"#,
        storage.display().to_string().replace('\\', "\\\\")
    );
    let path = dir.join("config.toml");
    std::fs::write(&path, config).unwrap();
    path
}

mod cli_tests {
    use super::*;
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;

    fn datacache(config: &Path) -> Command {
        let mut cmd = cargo_bin_cmd!("datacache");
        cmd.env("DATACACHE_CONFIG", config);
        cmd
    }

    #[test]
    fn help_displays() {
        let temp = TempDir::new().unwrap();
        datacache(&write_config(temp.path()))
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("data cache"));
    }

    #[test]
    fn version_displays() {
        let temp = TempDir::new().unwrap();
        datacache(&write_config(temp.path()))
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("datacache"));
    }

    #[test]
    fn config_path_uses_override() {
        let temp = TempDir::new().unwrap();
        let config = write_config(temp.path());
        datacache(&config)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let temp = TempDir::new().unwrap();
        datacache(&write_config(temp.path()))
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[cache]"))
            .stdout(predicate::str::contains("greeting"));
    }

    #[test]
    fn get_local_value() {
        let temp = TempDir::new().unwrap();
        datacache(&write_config(temp.path()))
            .args(["get", "local:greeting"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"hello\""));
    }

    #[test]
    fn get_many_prints_object() {
        let temp = TempDir::new().unwrap();
        datacache(&write_config(temp.path()))
            .args(["get", "--compact", "local:greeting", "local:answer"])
            .assert()
            .success()
            .stdout(predicate::str::contains(
                r#"{"local:answer":42,"local:greeting":"hello"}"#,
            ));
    }

    #[test]
    fn get_offline_without_cache_fails() {
        let temp = TempDir::new().unwrap();
        datacache(&write_config(temp.path()))
            .args(["get", "me/settings"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("offline"));
    }

    #[test]
    fn snapshot_show_empty() {
        let temp = TempDir::new().unwrap();
        datacache(&write_config(temp.path()))
            .args(["snapshot", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No persisted entries"));
    }

    #[test]
    fn snapshot_path_under_storage_dir() {
        let temp = TempDir::new().unwrap();
        datacache(&write_config(temp.path()))
            .args(["snapshot", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("api-cache.json"));
    }

    #[test]
    fn invalid_config_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("broken.toml");
        std::fs::write(&path, "[cache\n").unwrap();
        datacache(&path)
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }
}

mod store_tests {
    use super::*;
    use datacache::config::ConfigManager;
    use datacache::storage::{FileStorage, Storage};
    use datacache::store::{parse_snapshot, CacheStore, FetchStatus, DEFAULT_SNAPSHOT_KEY};
    use datacache::CacheError;
    use serde_json::json;

    #[tokio::test]
    async fn store_from_config_serves_local_values() {
        let temp = TempDir::new().unwrap();
        let config = ConfigManager::with_path(write_config(temp.path()))
            .load()
            .await
            .unwrap();

        let store = CacheStore::from_config(&config).await.unwrap();
        assert_eq!(store.get_async("local:greeting").await.unwrap(), json!("hello"));
        assert_eq!(store.get_async("local:missing").await.unwrap(), json!(null));
        assert_eq!(
            store.get_data_with_status("me/settings").status,
            FetchStatus::Offline
        );
        assert!(matches!(
            store.get_async("me/settings").await,
            Err(CacheError::Offline(_))
        ));
        assert_eq!(store.resolve_source("cloud:me").name(), "cloud");
        assert_eq!(store.resolve_source("me").name(), "network");
    }

    #[tokio::test]
    async fn file_snapshot_seeds_new_store() {
        let temp = TempDir::new().unwrap();
        let config = ConfigManager::with_path(write_config(temp.path()))
            .load()
            .await
            .unwrap();

        let storage = FileStorage::new(config.storage.resolved_dir()).await.unwrap();
        storage
            .set(
                DEFAULT_SNAPSHOT_KEY,
                r#"[{"path":"cloud:me/settings","data":{"x":1}}]"#,
            )
            .await
            .unwrap();

        let store = CacheStore::from_config(&config).await.unwrap();
        assert_eq!(store.load_snapshot().await, 1);

        // Offline: the persisted value is served as-is
        let result = store.get_data_with_status("cloud:me/settings");
        assert_eq!(result.data, Some(json!({"x": 1})));
        assert_eq!(result.status, FetchStatus::Offline);
        assert_eq!(
            store.get_async("cloud:me/settings").await.unwrap(),
            json!({"x": 1})
        );

        store.clear().await.unwrap();
        let raw = storage.get(DEFAULT_SNAPSHOT_KEY).await.unwrap();
        assert!(parse_snapshot(raw.as_deref()).is_empty());
    }
}
