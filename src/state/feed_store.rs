use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};

use crate::types::{BetRecord, FeedUpdate, LoadStatus};

// ---------------------------------------------------------------------------
// FeedStore
// ---------------------------------------------------------------------------

/// Wholesale-replacement diff counts for one committed load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub added: usize,
    pub removed: usize,
    pub unchanged: usize,
}

/// Shared snapshot of the latest feed load.
///
/// Reloads are serialized by generation: `begin_load` hands out a ticket
/// before the fetch starts, `apply` commits only tickets newer than the
/// last committed one. A slow fetch that finishes after a fresher one is
/// dropped, never applied — at most one load wins per generation order.
pub struct FeedStore {
    /// record key → record
    records: DashMap<String, BetRecord>,
    status: RwLock<LoadStatus>,
    /// Last generation handed out by `begin_load`.
    issued: AtomicU64,
    /// Generation of the last committed update. Held as a mutex so a
    /// commit replaces the snapshot atomically with respect to other
    /// commits.
    committed: Mutex<u64>,
}

impl FeedStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Reserve a generation for a load that is about to start.
    pub fn begin_load(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Commit a finished load. Returns None when a newer load already
    /// committed (the stale result is dropped), otherwise the
    /// wholesale-replacement diff. A `Failed` update clears the snapshot:
    /// the loader converts every failure to an empty collection.
    pub fn apply(&self, generation: u64, update: FeedUpdate) -> Option<ApplyOutcome> {
        let mut committed = self.committed.lock();
        if generation <= *committed {
            return None;
        }
        *committed = generation;

        let fresh_keys: HashSet<&str> = update.records.iter().map(|r| r.key.as_str()).collect();
        let stale_keys: Vec<String> = self
            .records
            .iter()
            .filter(|e| !fresh_keys.contains(e.key().as_str()))
            .map(|e| e.key().clone())
            .collect();

        let removed = stale_keys.len();
        for key in stale_keys {
            self.records.remove(&key);
        }

        let mut added = 0usize;
        let mut unchanged = 0usize;
        for record in update.records {
            if self.records.insert(record.key.clone(), record).is_none() {
                added += 1;
            } else {
                unchanged += 1;
            }
        }

        *self.status.write() = update.status;

        Some(ApplyOutcome {
            added,
            removed,
            unchanged,
        })
    }

    /// Clone of the current record snapshot, in no particular order.
    pub fn snapshot(&self) -> Vec<BetRecord> {
        self.records.iter().map(|e| e.value().clone()).collect()
    }

    pub fn status(&self) -> LoadStatus {
        *self.status.read()
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }
}

impl Default for FeedStore {
    fn default() -> Self {
        Self {
            records: DashMap::new(),
            status: RwLock::new(LoadStatus::Loading),
            issued: AtomicU64::new(0),
            committed: Mutex::new(0),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn test_record(key: &str, ev: f64) -> BetRecord {
        BetRecord {
            key: key.to_string(),
            market_name: "Test market".to_string(),
            competition: "Test".to_string(),
            sport: "NFL".to_string(),
            participant: "Side".to_string(),
            market_type: "Moneyline".to_string(),
            source: "BookA".to_string(),
            implied_probability: 50.0,
            outcome_payout: 2.0,
            ev,
            event_start_iso: String::new(),
            event_start_secs: None,
            last_found_iso: String::new(),
            last_found_secs: None,
        }
    }

    fn loaded(records: Vec<BetRecord>) -> FeedUpdate {
        FeedUpdate {
            records,
            status: LoadStatus::Loaded,
        }
    }

    #[test]
    fn starts_empty_and_loading() {
        let store = FeedStore::new();
        assert_eq!(store.status(), LoadStatus::Loading);
        assert_eq!(store.record_count(), 0);
    }

    #[test]
    fn apply_replaces_wholesale_with_diff_counts() {
        let store = FeedStore::new();

        let g1 = store.begin_load();
        let outcome = store
            .apply(g1, loaded(vec![test_record("a", 1.0), test_record("b", 2.0)]))
            .expect("first apply commits");
        assert_eq!(outcome.added, 2);
        assert_eq!(outcome.removed, 0);
        assert_eq!(outcome.unchanged, 0);

        let g2 = store.begin_load();
        let outcome = store
            .apply(g2, loaded(vec![test_record("b", 2.5), test_record("c", 3.0)]))
            .expect("second apply commits");
        assert_eq!(outcome.added, 1, "c is new");
        assert_eq!(outcome.removed, 1, "a is gone");
        assert_eq!(outcome.unchanged, 1, "b refreshed in place");
        assert_eq!(store.record_count(), 2);
        assert_eq!(store.status(), LoadStatus::Loaded);
    }

    #[test]
    fn stale_generation_is_dropped() {
        let store = FeedStore::new();

        let slow = store.begin_load();
        let fast = store.begin_load();

        // The later load finishes first and commits.
        assert!(store.apply(fast, loaded(vec![test_record("fresh", 5.0)])).is_some());

        // The earlier load finishes late — its result must not overwrite.
        assert!(store.apply(slow, loaded(vec![test_record("stale", 1.0)])).is_none());

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].key, "fresh");
    }

    #[test]
    fn failed_update_clears_records_but_stays_distinguishable() {
        let store = FeedStore::new();
        let g1 = store.begin_load();
        store.apply(g1, loaded(vec![test_record("a", 1.0)]));

        let g2 = store.begin_load();
        let outcome = store
            .apply(
                g2,
                FeedUpdate {
                    records: Vec::new(),
                    status: LoadStatus::Failed,
                },
            )
            .expect("failed load still commits");
        assert_eq!(outcome.removed, 1);
        assert_eq!(store.record_count(), 0);
        assert_eq!(store.status(), LoadStatus::Failed);
    }

    #[test]
    fn reapplying_same_generation_is_rejected() {
        let store = FeedStore::new();
        let g = store.begin_load();
        assert!(store.apply(g, loaded(vec![test_record("a", 1.0)])).is_some());
        assert!(store.apply(g, loaded(vec![test_record("b", 2.0)])).is_none());
        assert_eq!(store.snapshot()[0].key, "a");
    }
}
