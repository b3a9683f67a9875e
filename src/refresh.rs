use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::time::interval;
use tracing::{info, warn};

use crate::config::Config;
use crate::feed::{load_feed, log_fetch_stats};
use crate::filter::filter_and_sort;
use crate::state::FeedStore;
use crate::types::{display_state, DisplayState, FilterCriteria};

/// Periodically re-fetches the feed and commits the result to the store.
/// Retry is the interval itself — unconditional, no backoff: a failed load
/// clears the snapshot and the next tick tries again.
pub struct FeedRefresher {
    cfg: Config,
    store: Arc<FeedStore>,
    criteria: FilterCriteria,
}

impl FeedRefresher {
    pub fn new(cfg: Config, store: Arc<FeedStore>, criteria: FilterCriteria) -> Self {
        Self {
            cfg,
            store,
            criteria,
        }
    }

    pub async fn run(self) {
        let mut ticker = interval(Duration::from_secs(self.cfg.refresh_interval_secs));
        ticker.tick().await; // skip immediate first tick — bootstrap already ran

        loop {
            ticker.tick().await;
            self.refresh_once().await;
        }
    }

    /// One full cycle: reserve a generation, load, commit, report.
    pub async fn refresh_once(&self) {
        let generation = self.store.begin_load();
        let (update, stats) = load_feed(&self.cfg).await;
        let status = update.status;

        match self.store.apply(generation, update) {
            Some(outcome) => {
                if let Some(stats) = stats {
                    log_fetch_stats(&stats);
                }
                info!(
                    added = outcome.added,
                    removed = outcome.removed,
                    unchanged = outcome.unchanged,
                    total = self.store.record_count(),
                    status = %status,
                    "Feed refresh complete: +{} added, -{} removed, {} unchanged",
                    outcome.added,
                    outcome.removed,
                    outcome.unchanged,
                );
                report_opportunities(&self.store, &self.criteria);
            }
            None => {
                warn!("Feed refresh superseded by a newer load, result dropped");
            }
        }
    }
}

/// Log the current filtered/sorted opportunity table, or an explicit
/// no-opportunities line — never silence.
pub fn report_opportunities(store: &FeedStore, criteria: &FilterCriteria) {
    let records = store.snapshot();
    let visible = filter_and_sort(&records, criteria, now_secs());

    match display_state(store.status(), visible.len()) {
        DisplayState::Loading => {}
        DisplayState::Empty => {
            info!(
                "[REPORT] no betting opportunities match sport={} market={} min_edge={:.1}%",
                criteria.sport, criteria.market, criteria.min_edge,
            );
        }
        DisplayState::Populated => {
            info!(
                "[REPORT] {} opportunities (sport={} market={} min_edge={:.1}%)",
                visible.len(),
                criteria.sport,
                criteria.market,
                criteria.min_edge,
            );
            for r in &visible {
                info!(
                    ev = r.ev,
                    sport = %r.sport,
                    source = %r.source,
                    "[REPORT] {:+.2}% EV | {} | {} | {} | prob {:.2}% | payout {:.2} | {}",
                    r.ev,
                    r.market_name,
                    r.participant,
                    r.market_type,
                    r.implied_probability,
                    r.outcome_payout,
                    r.source,
                );
            }
        }
    }
}

fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
