//! Watch command - keep a path observed and report each refresh

use crate::cli::args::WatchArgs;
use crate::config::Config;
use crate::error::CacheResult;
use crate::store::{CacheStore, FetchResult, FetchStatus, Subscriber};
use crate::ui::{self, TaskSpinner, UiContext};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant};

/// Execute the watch command
pub async fn execute(args: WatchArgs, config: &Config) -> CacheResult<()> {
    let ctx = UiContext::detect();
    let store = CacheStore::from_config(config).await?;
    store.load_snapshot().await;

    ui::intro(&ctx, &format!("Watching {}", args.path));

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let subscriber = Subscriber::new(move |path: &str| {
        // Receiver gone means the watch loop has ended
        let _ = tx.send(path.to_string());
    });

    let mut spinner = TaskSpinner::new(&ctx);
    let mut spinning = false;
    let first = store.get_cached_with_status(&subscriber, &args.path);
    if first.status == FetchStatus::Pending {
        spinner.start(&format!("Fetching {}", args.path));
        spinning = true;
    } else {
        report(&ctx, &store, &args.path, &first);
    }

    let period = Duration::from_secs(args.interval.max(1));
    let mut ticker = interval_at(Instant::now() + period, period);
    let mut refreshes = 0u32;

    loop {
        tokio::select! {
            Some(_) = rx.recv() => {
                // Re-read the way a render pass would
                store.unsubscribe(&subscriber);
                let result = store.get_cached_with_status(&subscriber, &args.path);
                if spinning {
                    spinner.stop(&format!("{} fetched", args.path));
                    spinning = false;
                }
                report(&ctx, &store, &args.path, &result);

                refreshes += 1;
                if args.times.is_some_and(|times| refreshes >= times) {
                    break;
                }
            }
            _ = ticker.tick() => {
                // Failed fetches notify nobody, so the spinner is closed here
                if spinning {
                    if let Some(error) = store.entry_info(&args.path).and_then(|i| i.last_error) {
                        spinner.stop_error(&error);
                        spinning = false;
                    }
                }
                store.invalidate(&args.path);
                if store.get_data_with_status(&args.path).status == FetchStatus::Offline {
                    ui::step_warn(&ctx, "Source is offline, nothing to refresh");
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    store.unsubscribe(&subscriber);
    ui::outro(&ctx, &format!("{} refresh(es) observed", refreshes));
    Ok(())
}

fn report(ctx: &UiContext, store: &CacheStore, path: &str, result: &FetchResult) {
    let value = result
        .data
        .as_ref()
        .map(|v| v.to_string())
        .unwrap_or_else(|| "<unset>".to_string());

    match result.status {
        FetchStatus::Complete => ui::step_ok(ctx, &value),
        FetchStatus::Pending => ui::step_warn(ctx, &format!("{} (refreshing)", value)),
        FetchStatus::Offline => ui::step_warn(ctx, &format!("{} (offline)", value)),
        FetchStatus::Error => {
            let detail = store
                .entry_info(path)
                .and_then(|info| info.last_error)
                .unwrap_or_default();
            ui::step_error_detail(ctx, &value, &detail);
        }
    }

    if let Some(at) = store.entry_info(path).and_then(|info| info.refreshed_at) {
        ui::key_value(ctx, "refreshed", &at.format("%Y-%m-%d %H:%M:%S UTC").to_string());
    }
}
