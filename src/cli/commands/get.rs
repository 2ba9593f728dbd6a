//! Get command - fetch paths through the cache and print them

use crate::cli::args::GetArgs;
use crate::config::Config;
use crate::error::{CacheError, CacheResult};
use crate::store::CacheStore;
use futures_util::future::join_all;
use serde_json::{Map, Value};
use tracing::debug;

/// Execute the get command
pub async fn execute(args: GetArgs, config: &Config) -> CacheResult<()> {
    let mut config = config.clone();
    if args.offline {
        config.network.offline = true;
    }

    let store = CacheStore::from_config(&config).await?;
    let loaded = store.load_snapshot().await;
    debug!("Seeded {} entries from snapshot", loaded);

    let mut results = join_all(args.paths.iter().map(|path| store.get_async(path))).await;

    // A single path prints its bare value
    if results.len() == 1 {
        let value = results.remove(0)?;
        return print_value(&value, args.compact);
    }

    let total = results.len();
    let mut values = Map::new();
    let mut failed = 0;
    for (path, result) in args.paths.iter().zip(results) {
        match result {
            Ok(value) => {
                values.insert(path.clone(), value);
            }
            Err(e) => {
                failed += 1;
                eprintln!("{}: {}", path, e);
            }
        }
    }

    print_value(&Value::Object(values), args.compact)?;

    if failed > 0 {
        return Err(CacheError::PartialFailure { failed, total });
    }
    Ok(())
}

fn print_value(value: &Value, compact: bool) -> CacheResult<()> {
    let text = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    println!("{}", text);
    Ok(())
}
