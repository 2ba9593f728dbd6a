//! Snapshot command - inspect or clear persisted cache entries

use crate::cli::args::{SnapshotAction, SnapshotArgs};
use crate::config::Config;
use crate::error::CacheResult;
use crate::storage::{FileStorage, Storage};
use crate::store::{parse_snapshot, CacheStore};
use crate::ui::{self, UiContext};

/// Execute the snapshot command
pub async fn execute(args: SnapshotArgs, config: &Config) -> CacheResult<()> {
    match args.action {
        None | Some(SnapshotAction::Show) => show(config).await,
        Some(SnapshotAction::Clear) => clear(config).await,
        Some(SnapshotAction::Path) => {
            let storage = FileStorage::new(config.storage.resolved_dir()).await?;
            println!("{}", storage.key_path(&config.cache.snapshot_key).display());
            Ok(())
        }
    }
}

async fn show(config: &Config) -> CacheResult<()> {
    let storage = FileStorage::new(config.storage.resolved_dir()).await?;
    let raw = storage.get(&config.cache.snapshot_key).await?;
    let records = parse_snapshot(raw.as_deref());

    if records.is_empty() {
        println!("No persisted entries.");
        return Ok(());
    }

    println!("{:<48} {:>10}", "PATH", "BYTES");
    println!("{}", "-".repeat(59));
    for record in &records {
        let size = serde_json::to_string(&record.data)?.len();
        println!("{:<48} {:>10}", record.path, size);
    }
    println!();
    println!("Total: {} entr(ies)", records.len());
    Ok(())
}

async fn clear(config: &Config) -> CacheResult<()> {
    let ctx = UiContext::detect();
    let store = CacheStore::from_config(config).await?;
    let dropped = store.load_snapshot().await;
    store.clear().await?;
    ui::step_ok(&ctx, &format!("Cleared {} persisted entr(ies)", dropped));
    Ok(())
}
