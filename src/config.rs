use crate::error::{AppError, Result};

pub const FEED_URL: &str = "http://localhost:8080/output7.json";

/// How far ahead an event may start and still be displayed (days).
/// Events already started or more than this far out are excluded,
/// both bounds inclusive.
pub const EVENT_WINDOW_DAYS: f64 = 7.0;

/// Inclusive bounds for the minimum-edge criterion (percent).
pub const MIN_EDGE_FLOOR: f64 = 0.0;
pub const MIN_EDGE_CEIL: f64 = 100.0;

/// Default minimum-edge criterion (percent).
pub const DEFAULT_MIN_EDGE: f64 = 2.0;

/// Step applied when the TUI adjusts the minimum-edge criterion (percent).
pub const MIN_EDGE_STEP: f64 = 0.5;

/// Feed refresh interval (seconds) — how often to re-fetch the feed.
pub const FEED_REFRESH_INTERVAL_SECS: u64 = 300;

/// HTTP request timeout (seconds).
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// Cap on rejected-payload samples kept per load for diagnostics.
pub const REJECT_SAMPLE_CAP: usize = 10;

#[derive(Debug, Clone)]
pub struct Config {
    /// Feed endpoint returning the JSON record payload (FEED_URL)
    pub feed_url: String,
    pub log_level: String,
    /// Seconds between automatic feed reloads (FEED_REFRESH_SECS)
    pub refresh_interval_secs: u64,
    /// HTTP request timeout in seconds (HTTP_TIMEOUT_SECS)
    pub http_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let refresh_interval_secs = std::env::var("FEED_REFRESH_SECS")
            .unwrap_or_else(|_| FEED_REFRESH_INTERVAL_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| {
                AppError::Config("FEED_REFRESH_SECS must be a positive integer".to_string())
            })?;
        if refresh_interval_secs == 0 {
            return Err(AppError::Config(
                "FEED_REFRESH_SECS must be non-zero".to_string(),
            ));
        }
        Ok(Self {
            feed_url: std::env::var("FEED_URL").unwrap_or_else(|_| FEED_URL.to_string()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            refresh_interval_secs,
            http_timeout_secs: std::env::var("HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| HTTP_TIMEOUT_SECS.to_string())
                .parse::<u64>()
                .unwrap_or(HTTP_TIMEOUT_SECS),
        })
    }
}
