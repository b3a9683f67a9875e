use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::{Config, REJECT_SAMPLE_CAP};
use crate::error::{AppError, Result};
use crate::types::{BetRecord, FeedUpdate, LoadStatus};

#[derive(Debug, Default)]
pub struct FetchStats {
    /// Elements in the payload before adaptation.
    pub payload_total: usize,
    pub rejected_no_market: usize,
    pub rejected_no_participant: usize,
    pub rejected_bad_ev: usize,
    pub rejected_bad_probability: usize,
    pub qualified: usize,
    /// Sample of rejected payload elements, serialized for diagnostics.
    pub reject_samples: Vec<String>,
}

impl FetchStats {
    pub fn rejected_total(&self) -> usize {
        self.rejected_no_market
            + self.rejected_no_participant
            + self.rejected_bad_ev
            + self.rejected_bad_probability
    }
}

/// Fetch the feed once and adapt every element to the canonical schema.
/// Errors on unreachable host, non-success status, non-JSON bodies and
/// bodies that are neither an array nor an object; individual malformed
/// elements are counted and skipped, never fatal.
pub async fn fetch_feed(cfg: &Config) -> Result<(Vec<BetRecord>, FetchStats)> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(cfg.http_timeout_secs))
        .build()?;

    let resp = client.get(&cfg.feed_url).send().await?;
    if !resp.status().is_success() {
        return Err(AppError::Feed(format!(
            "feed returned HTTP {}",
            resp.status()
        )));
    }
    let body = resp.text().await?;
    let payload: Value = serde_json::from_str(&body)?;

    let items = extract_items(payload)?;

    let mut records = Vec::with_capacity(items.len());
    let mut stats = FetchStats {
        payload_total: items.len(),
        ..FetchStats::default()
    };

    for item in &items {
        match adapt_record(item) {
            Ok(record) => records.push(record),
            Err(rejection) => {
                match rejection {
                    Rejection::NoMarketName => stats.rejected_no_market += 1,
                    Rejection::NoParticipant => stats.rejected_no_participant += 1,
                    Rejection::BadEv => stats.rejected_bad_ev += 1,
                    Rejection::BadProbability => stats.rejected_bad_probability += 1,
                }
                if stats.reject_samples.len() < REJECT_SAMPLE_CAP {
                    stats.reject_samples.push(sample_of(item));
                }
            }
        }
    }

    stats.qualified = records.len();
    Ok((records, stats))
}

/// Uniform failure boundary. Every load failure — unreachable host,
/// timeout, non-2xx status, malformed JSON, unexpected shape — is caught
/// here, logged, and converted to an empty record set with `Failed`
/// status. Callers never see an error and rendering is never interrupted.
pub async fn load_feed(cfg: &Config) -> (FeedUpdate, Option<FetchStats>) {
    match fetch_feed(cfg).await {
        Ok((records, stats)) => (
            FeedUpdate {
                records,
                status: LoadStatus::Loaded,
            },
            Some(stats),
        ),
        Err(e) => {
            warn!("[FEED] load from {} failed, treating as empty: {e}", cfg.feed_url);
            (
                FeedUpdate {
                    records: Vec::new(),
                    status: LoadStatus::Failed,
                },
                None,
            )
        }
    }
}

/// Log per-load adaptation stats in one line, with rejected samples at
/// debug level.
pub fn log_fetch_stats(stats: &FetchStats) {
    if stats.rejected_total() == 0 {
        info!(
            "[FEED] adapted {}/{} payload elements",
            stats.qualified, stats.payload_total
        );
        return;
    }
    info!(
        "[FEED] adapted {}/{} payload elements | rejected: no_market={} no_participant={} bad_ev={} bad_probability={}",
        stats.qualified,
        stats.payload_total,
        stats.rejected_no_market,
        stats.rejected_no_participant,
        stats.rejected_bad_ev,
        stats.rejected_bad_probability,
    );
    for sample in &stats.reject_samples {
        debug!("[FEED] rejected element: {sample}");
    }
}

/// The feed body is an array in most producer versions and a keyed object
/// in at least one; object values are taken in key order. Anything else is
/// a shape error.
fn extract_items(payload: Value) -> Result<Vec<Value>> {
    match payload {
        Value::Array(items) => Ok(items),
        Value::Object(map) => Ok(map.into_iter().map(|(_, v)| v).collect()),
        other => Err(AppError::Feed(format!(
            "feed body was neither array nor object (got {})",
            json_kind(&other)
        ))),
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

enum Rejection {
    NoMarketName,
    NoParticipant,
    BadEv,
    BadProbability,
}

/// Adapt one payload element to the canonical record, reconciling known
/// producer drift: `participants` array vs singular `participant`, `edge`
/// as an older alias for `EV`, optional `key`, numbers as JSON numbers or
/// numeric strings. Unparseable timestamps are kept (as None seconds) so
/// the date-window predicate excludes them; missing identity fields and
/// non-finite numbers reject the element.
fn adapt_record(v: &Value) -> std::result::Result<BetRecord, Rejection> {
    let market_name = str_field(v, "market_name").ok_or(Rejection::NoMarketName)?;

    let participant = str_field(v, "participant")
        .or_else(|| {
            v.get("participants")
                .and_then(|p| p.as_array())
                .and_then(|a| a.first())
                .and_then(|p| p.as_str())
                .map(|s| s.to_string())
        })
        .ok_or(Rejection::NoParticipant)?;

    let ev = num_field(v, "EV")
        .or_else(|| num_field(v, "edge"))
        .filter(|x| x.is_finite())
        .ok_or(Rejection::BadEv)?;

    let implied_probability = num_field(v, "implied_probability")
        .filter(|x| x.is_finite())
        .ok_or(Rejection::BadProbability)?;

    let outcome_payout = num_field(v, "outcome_payout").unwrap_or(0.0);

    let event_start_iso = str_field(v, "event_start_time").unwrap_or_default();
    let last_found_iso = str_field(v, "lastFoundAt").unwrap_or_default();

    let key = str_field(v, "key").unwrap_or_else(|| {
        BetRecord::derived_key(&market_name, &participant, &event_start_iso)
    });

    Ok(BetRecord {
        key,
        competition: str_field(v, "competition_instance_name").unwrap_or_default(),
        sport: str_field(v, "sport").unwrap_or_default(),
        market_type: str_field(v, "type").unwrap_or_default(),
        source: str_field(v, "source").unwrap_or_default(),
        implied_probability,
        outcome_payout,
        ev,
        event_start_secs: parse_iso_to_unix_secs(&event_start_iso),
        event_start_iso,
        last_found_secs: parse_iso_to_unix_secs(&last_found_iso),
        last_found_iso,
        market_name,
        participant,
    })
}

fn str_field(v: &Value, key: &str) -> Option<String> {
    v.get(key)
        .and_then(|x| x.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// Producer numbers arrive as JSON numbers or numeric strings depending on
/// the feed version.
fn num_field(v: &Value, key: &str) -> Option<f64> {
    v.get(key)
        .and_then(|x| x.as_f64().or_else(|| x.as_str().and_then(|s| s.parse().ok())))
}

fn sample_of(v: &Value) -> String {
    let s = v.to_string();
    if s.chars().count() <= 120 {
        s
    } else {
        let cut: String = s.chars().take(119).collect();
        format!("{cut}…")
    }
}

/// Parse an RFC 3339 / ISO 8601 timestamp into Unix seconds without a
/// calendar dependency. Accepts date-only strings and optional fractional
/// seconds; `Z` and numeric offset suffixes are dropped — feed timestamps
/// are UTC.
pub fn parse_iso_to_unix_secs(s: &str) -> Option<f64> {
    let s = s.trim();
    if !s.is_ascii() {
        return None;
    }
    let s = s.strip_suffix('Z').unwrap_or(s);

    let (date, time) = match s.split_once('T') {
        Some((d, t)) => (d, Some(t)),
        None => (s, None),
    };

    if date.len() != 10 {
        return None;
    }
    let year: i64 = date[0..4].parse().ok()?;
    let month: i64 = date[5..7].parse().ok()?;
    let day: i64 = date[8..10].parse().ok()?;
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }

    let (hour, minute, second) = match time {
        Some(t) => {
            // Drop fractional seconds and any trailing offset.
            let t = t.split(['.', '+']).next().unwrap_or(t);
            let t = if t.len() > 8 && t.as_bytes()[8] == b'-' {
                &t[..8]
            } else {
                t
            };
            if t.len() < 8 {
                return None;
            }
            (
                t[0..2].parse::<i64>().ok()?,
                t[3..5].parse::<i64>().ok()?,
                t[6..8].parse::<i64>().ok()?,
            )
        }
        None => (0, 0, 0),
    };

    // Days since the Unix epoch via the Julian day number.
    let a = (14 - month) / 12;
    let y = year + 4800 - a;
    let m = month + 12 * a - 3;
    let jdn = day + (153 * m + 2) / 5 + 365 * y + y / 4 - y / 100 + y / 400 - 32045;
    let unix_days = jdn - 2_440_588;
    Some((unix_days * 86_400 + hour * 3_600 + minute * 60 + second) as f64)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn modern_element() -> Value {
        json!({
            "key": "nfl-chiefs-ml-2026-08-09",
            "market_name": "Chiefs vs Bills",
            "competition_instance_name": "Week 1",
            "event_start_time": "2026-08-09T17:00:00Z",
            "sport": "NFL",
            "participant": "Kansas City Chiefs",
            "type": "Game Moneyline",
            "source": "BookA",
            "implied_probability": 54.35,
            "outcome_payout": 1.84,
            "EV": 3.5,
            "lastFoundAt": "2026-08-07T12:00:00Z"
        })
    }

    #[test]
    fn adapts_modern_element() {
        let record = adapt_record(&modern_element()).ok().unwrap();
        assert_eq!(record.key, "nfl-chiefs-ml-2026-08-09");
        assert_eq!(record.participant, "Kansas City Chiefs");
        assert_eq!(record.market_type, "Game Moneyline");
        assert!((record.ev - 3.5).abs() < 1e-9);
        assert!(record.event_start_secs.is_some());
        assert!(record.last_found_secs.is_some());
    }

    #[test]
    fn adapts_legacy_element_with_participants_array_and_edge() {
        let legacy = json!({
            "market_name": "Lakers vs Celtics",
            "competition_instance_name": "Regular Season",
            "event_start_time": "2026-08-10T00:30:00Z",
            "sport": "NBA",
            "participants": ["Los Angeles Lakers", "Boston Celtics"],
            "type": "Spread",
            "source": "BookB",
            "implied_probability": "47.6",
            "outcome_payout": "2.10",
            "edge": "2.25",
            "lastFoundAt": "2026-08-07T11:58:02Z"
        });
        let record = adapt_record(&legacy).ok().unwrap();
        assert_eq!(record.participant, "Los Angeles Lakers");
        assert!((record.ev - 2.25).abs() < 1e-9, "edge alias feeds EV");
        assert!((record.implied_probability - 47.6).abs() < 1e-9);
        assert_eq!(
            record.key,
            "Lakers vs Celtics|Los Angeles Lakers|2026-08-10T00:30:00Z",
            "missing key derives a stable composite"
        );
    }

    #[test]
    fn rejects_element_without_market_name() {
        let v = json!({ "participant": "X", "EV": 3.0, "implied_probability": 50.0 });
        assert!(matches!(adapt_record(&v), Err(Rejection::NoMarketName)));
    }

    #[test]
    fn rejects_element_without_any_participant_form() {
        let v = json!({
            "market_name": "A vs B",
            "EV": 3.0,
            "implied_probability": 50.0
        });
        assert!(matches!(adapt_record(&v), Err(Rejection::NoParticipant)));
    }

    #[test]
    fn rejects_missing_and_non_finite_ev() {
        let mut v = modern_element();
        v.as_object_mut().unwrap().remove("EV");
        assert!(matches!(adapt_record(&v), Err(Rejection::BadEv)));

        let mut v = modern_element();
        v["EV"] = json!("NaN");
        assert!(matches!(adapt_record(&v), Err(Rejection::BadEv)));
    }

    #[test]
    fn rejects_non_numeric_probability() {
        let mut v = modern_element();
        v["implied_probability"] = json!("n/a");
        assert!(matches!(adapt_record(&v), Err(Rejection::BadProbability)));
    }

    #[test]
    fn unparseable_event_time_is_kept_with_none_seconds() {
        let mut v = modern_element();
        v["event_start_time"] = json!("soon");
        let record = adapt_record(&v).ok().unwrap();
        assert_eq!(record.event_start_iso, "soon");
        assert!(record.event_start_secs.is_none());
    }

    #[test]
    fn extract_items_accepts_array_and_object() {
        let arr = json!([modern_element(), modern_element()]);
        assert_eq!(extract_items(arr).unwrap().len(), 2);

        let obj = json!({ "a": modern_element(), "b": modern_element() });
        assert_eq!(extract_items(obj).unwrap().len(), 2);
    }

    #[test]
    fn extract_items_rejects_scalars() {
        let err = extract_items(json!(42)).unwrap_err();
        assert!(err.to_string().contains("neither array nor object"));
    }

    #[test]
    fn iso_parse_epoch_anchors() {
        assert_eq!(parse_iso_to_unix_secs("1970-01-01T00:00:00Z"), Some(0.0));
        assert_eq!(parse_iso_to_unix_secs("1970-01-02"), Some(86_400.0));
    }

    #[test]
    fn iso_parse_day_arithmetic_and_leap_day() {
        let feb29 = parse_iso_to_unix_secs("2024-02-29T00:00:00Z").unwrap();
        let mar01 = parse_iso_to_unix_secs("2024-03-01T00:00:00Z").unwrap();
        assert_eq!(mar01 - feb29, 86_400.0);
    }

    #[test]
    fn iso_parse_fraction_and_offset_suffixes() {
        let base = parse_iso_to_unix_secs("2026-08-07T12:30:45Z").unwrap();
        assert_eq!(parse_iso_to_unix_secs("2026-08-07T12:30:45.123Z"), Some(base));
        assert_eq!(parse_iso_to_unix_secs("2026-08-07T12:30:45+05:00"), Some(base));
        assert_eq!(parse_iso_to_unix_secs("2026-08-07T12:30:45-05:00"), Some(base));
    }

    #[tokio::test]
    async fn load_failure_becomes_empty_failed_update() {
        // Discard port — connection refused without any network dependency.
        let cfg = Config {
            feed_url: "http://127.0.0.1:9/output7.json".to_string(),
            log_level: "info".to_string(),
            refresh_interval_secs: 300,
            http_timeout_secs: 1,
        };
        let (update, stats) = load_feed(&cfg).await;
        assert!(update.records.is_empty());
        assert_eq!(update.status, LoadStatus::Failed);
        assert!(stats.is_none());
    }

    #[test]
    fn iso_parse_rejects_garbage() {
        assert_eq!(parse_iso_to_unix_secs(""), None);
        assert_eq!(parse_iso_to_unix_secs("tomorrow"), None);
        assert_eq!(parse_iso_to_unix_secs("2026-13-01"), None);
        assert_eq!(parse_iso_to_unix_secs("2026-08-07T25"), None);
    }
}
