use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use evbet_scanner::config::Config;
use evbet_scanner::feed::{load_feed, log_fetch_stats};
use evbet_scanner::refresh::{report_opportunities, FeedRefresher};
use evbet_scanner::state::FeedStore;
use evbet_scanner::types::{FilterCriteria, LoadStatus};

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    run(cfg).await;
}

async fn run(cfg: Config) {
    let criteria = FilterCriteria::default();
    let store = FeedStore::new();

    // --- Bootstrap: one load before the refresh loop takes over ---
    let generation = store.begin_load();
    let (update, stats) = load_feed(&cfg).await;
    let status = update.status;
    let qualified = update.records.len();
    store.apply(generation, update);

    match status {
        LoadStatus::Failed => error!(
            "[FEED] bootstrap load failed — feed at {} unreachable or malformed, starting empty",
            cfg.feed_url,
        ),
        _ => info!(
            "[FEED] bootstrap complete: {} records from {} (refresh every {}s)",
            qualified, cfg.feed_url, cfg.refresh_interval_secs,
        ),
    }
    if let Some(stats) = stats {
        log_fetch_stats(&stats);
    }

    report_opportunities(&store, &criteria);

    // --- Periodic refresh loop (runs forever) ---
    let refresher = FeedRefresher::new(cfg, Arc::clone(&store), criteria);
    refresher.run().await;
}
