use std::cmp::Ordering;

use crate::config::EVENT_WINDOW_DAYS;
use crate::types::{BetRecord, FilterCriteria};

/// Forward display window in seconds.
const WINDOW_SECS: f64 = EVENT_WINDOW_DAYS * 86_400.0;

/// Apply all four display predicates and sort the survivors by EV
/// descending. Pure: `now_secs` is an input so the window boundaries are
/// deterministic and testable. Tie order between equal EVs is unspecified.
pub fn filter_and_sort(
    records: &[BetRecord],
    criteria: &FilterCriteria,
    now_secs: f64,
) -> Vec<BetRecord> {
    let mut out: Vec<BetRecord> = records
        .iter()
        .filter(|r| passes(r, criteria, now_secs))
        .cloned()
        .collect();
    out.sort_by(|a, b| b.ev.partial_cmp(&a.ev).unwrap_or(Ordering::Equal));
    out
}

/// Logical AND of the four display predicates.
pub fn passes(record: &BetRecord, criteria: &FilterCriteria, now_secs: f64) -> bool {
    in_event_window(record, now_secs)
        && matches_sport(record, criteria)
        && matches_market(record, criteria)
        && meets_edge(record, criteria)
}

/// Event must start within `[now, now + window]`, inclusive of both
/// bounds. Past events, events more than a window out, and records with an
/// unparseable start time never qualify.
fn in_event_window(record: &BetRecord, now_secs: f64) -> bool {
    match record.event_start_secs {
        Some(start) => start >= now_secs && start <= now_secs + WINDOW_SECS,
        None => false,
    }
}

fn matches_sport(record: &BetRecord, criteria: &FilterCriteria) -> bool {
    criteria.sport == "all" || record.sport.eq_ignore_ascii_case(&criteria.sport)
}

/// Substring containment so a "moneyline" criterion matches a record type
/// of "Game Moneyline".
fn matches_market(record: &BetRecord, criteria: &FilterCriteria) -> bool {
    criteria.market == "all"
        || record
            .market_type
            .to_lowercase()
            .contains(&criteria.market.to_lowercase())
}

/// Inclusive threshold: EV exactly equal to the criterion qualifies.
fn meets_edge(record: &BetRecord, criteria: &FilterCriteria) -> bool {
    record.ev >= criteria.min_edge
}

/// Most recent `lastFoundAt` among the given records, feeding the
/// "last updated" display. None when no record carries a parseable one.
pub fn latest_found_secs(records: &[BetRecord]) -> Option<f64> {
    records
        .iter()
        .filter_map(|r| r.last_found_secs)
        .max_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
