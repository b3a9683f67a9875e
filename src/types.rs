use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_MIN_EDGE, MIN_EDGE_CEIL, MIN_EDGE_FLOOR};

// ---------------------------------------------------------------------------
// BetRecord
// ---------------------------------------------------------------------------

/// Canonical betting record. Producer payloads drift across feed versions
/// (`participants` array vs singular `participant`, `EV` vs `edge`, an
/// optional `key`); the adapter in `feed` reconciles every variant into
/// this one schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetRecord {
    /// Stable identity: the producer's `key` when present, otherwise
    /// derived from market, participant and event start. Used as the store
    /// key and as display-row identity — never the array position.
    pub key: String,
    pub market_name: String,
    pub competition: String,
    pub sport: String,
    pub participant: String,
    /// Bet market category. Matched by case-insensitive substring, so a
    /// "moneyline" criterion matches a type of "Game Moneyline".
    pub market_type: String,
    /// Originating sportsbook.
    pub source: String,
    /// Implied probability, percent 0–100.
    pub implied_probability: f64,
    /// Decimal payout multiplier.
    pub outcome_payout: f64,
    /// Expected-value edge, percent. May be negative.
    pub ev: f64,
    pub event_start_iso: String,
    /// Unix seconds parsed from `event_start_iso`. None when unparseable;
    /// such records never pass the date-window predicate.
    pub event_start_secs: Option<f64>,
    pub last_found_iso: String,
    pub last_found_secs: Option<f64>,
}

impl BetRecord {
    /// Fallback identity for producers that do not supply `key`.
    pub fn derived_key(market_name: &str, participant: &str, event_start_iso: &str) -> String {
        format!("{market_name}|{participant}|{event_start_iso}")
    }
}

// ---------------------------------------------------------------------------
// Filter criteria
// ---------------------------------------------------------------------------

/// Closed sport options presented by the UI, as (value, label).
pub const SPORT_OPTIONS: &[(&str, &str)] = &[
    ("all", "All Sports"),
    ("nfl", "NFL"),
    ("nba", "NBA"),
    ("mlb", "MLB"),
    ("nhl", "NHL"),
];

/// Closed market options presented by the UI, as (value, label).
pub const MARKET_OPTIONS: &[(&str, &str)] = &[
    ("all", "All Markets"),
    ("moneyline", "Moneyline"),
    ("spread", "Spread"),
    ("totals", "Totals"),
    ("props", "Player Props"),
];

/// Look up the display label for an option value; falls back to the value.
pub fn option_label<'a>(options: &'a [(&'a str, &'a str)], value: &'a str) -> &'a str {
    options
        .iter()
        .find(|(v, _)| *v == value)
        .map(|(_, label)| *label)
        .unwrap_or(value)
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterCriteria {
    /// "all" or a sport value, matched case-insensitively.
    pub sport: String,
    /// "all" or a market fragment, matched by substring containment.
    pub market: String,
    /// Minimum EV percentage, inclusive.
    pub min_edge: f64,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            sport: "all".to_string(),
            market: "moneyline".to_string(),
            min_edge: DEFAULT_MIN_EDGE,
        }
    }
}

impl FilterCriteria {
    pub fn cycle_sport(&mut self, forward: bool) {
        self.sport = cycle_option(SPORT_OPTIONS, &self.sport, forward);
    }

    pub fn cycle_market(&mut self, forward: bool) {
        self.market = cycle_option(MARKET_OPTIONS, &self.market, forward);
    }

    /// Adjust the edge threshold, clamped inclusively to the 0–100 bounds.
    pub fn adjust_min_edge(&mut self, delta: f64) {
        self.min_edge = (self.min_edge + delta).clamp(MIN_EDGE_FLOOR, MIN_EDGE_CEIL);
    }
}

fn cycle_option(options: &[(&str, &str)], current: &str, forward: bool) -> String {
    let len = options.len();
    let idx = options.iter().position(|(v, _)| *v == current).unwrap_or(0);
    let next = if forward { (idx + 1) % len } else { (idx + len - 1) % len };
    options[next].0.to_string()
}

// ---------------------------------------------------------------------------
// Load lifecycle
// ---------------------------------------------------------------------------

/// Outcome of the most recent feed load. A `Failed` load and an empty
/// `Loaded` one render identically (the no-opportunities message) but stay
/// distinguishable here for the header indicator and for tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStatus {
    /// No load attempt has completed yet.
    Loading,
    Loaded,
    Failed,
}

impl std::fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LoadStatus::Loading => "loading",
            LoadStatus::Loaded => "loaded",
            LoadStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Result of one feed load, committed to the store under a generation.
#[derive(Debug, Clone)]
pub struct FeedUpdate {
    pub records: Vec<BetRecord>,
    pub status: LoadStatus,
}

// ---------------------------------------------------------------------------
// Display state
// ---------------------------------------------------------------------------

/// What the presentation layer should show. Driven solely by load
/// completion and the filtered row count; there is no terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayState {
    /// No fetch attempt has completed — show the loading message.
    Loading,
    /// A fetch completed but zero records pass the filter.
    Empty,
    /// One or more records rendered.
    Populated,
}

pub fn display_state(status: LoadStatus, visible_rows: usize) -> DisplayState {
    match (status, visible_rows) {
        (LoadStatus::Loading, _) => DisplayState::Loading,
        (_, 0) => DisplayState::Empty,
        _ => DisplayState::Populated,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn criteria_defaults() {
        let c = FilterCriteria::default();
        assert_eq!(c.sport, "all");
        assert_eq!(c.market, "moneyline");
        assert!((c.min_edge - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn sport_cycles_forward_and_wraps() {
        let mut c = FilterCriteria::default();
        c.cycle_sport(true);
        assert_eq!(c.sport, "nfl");
        for _ in 0..SPORT_OPTIONS.len() - 1 {
            c.cycle_sport(true);
        }
        assert_eq!(c.sport, "all", "full cycle returns to the start");
    }

    #[test]
    fn market_cycles_backward_and_wraps() {
        let mut c = FilterCriteria::default();
        // "moneyline" is index 1; backward lands on "all", then wraps to the end.
        c.cycle_market(false);
        assert_eq!(c.market, "all");
        c.cycle_market(false);
        assert_eq!(c.market, "props");
    }

    #[test]
    fn unknown_option_value_cycles_from_start() {
        let mut c = FilterCriteria {
            sport: "curling".to_string(),
            ..FilterCriteria::default()
        };
        c.cycle_sport(true);
        assert_eq!(c.sport, "nfl");
    }

    #[test]
    fn min_edge_clamps_to_inclusive_bounds() {
        let mut c = FilterCriteria::default();
        c.adjust_min_edge(-500.0);
        assert_eq!(c.min_edge, 0.0);
        c.adjust_min_edge(250.0);
        assert_eq!(c.min_edge, 100.0);
        c.adjust_min_edge(-0.5);
        assert_eq!(c.min_edge, 99.5);
    }

    #[test]
    fn display_state_transitions() {
        assert_eq!(display_state(LoadStatus::Loading, 0), DisplayState::Loading);
        assert_eq!(display_state(LoadStatus::Loading, 5), DisplayState::Loading);
        assert_eq!(display_state(LoadStatus::Loaded, 0), DisplayState::Empty);
        assert_eq!(display_state(LoadStatus::Failed, 0), DisplayState::Empty);
        assert_eq!(display_state(LoadStatus::Loaded, 3), DisplayState::Populated);
    }

    #[test]
    fn option_label_lookup() {
        assert_eq!(option_label(SPORT_OPTIONS, "nba"), "NBA");
        assert_eq!(option_label(MARKET_OPTIONS, "props"), "Player Props");
        assert_eq!(option_label(SPORT_OPTIONS, "rugby"), "rugby");
    }
}
