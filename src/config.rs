//! Environment configuration.

use std::env;
use std::str::FromStr;

pub const DEFAULT_CHANNEL_CAPACITY: usize = 100;
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestConfig {
    /// Bound of the frame channel feeding the coordinator.
    pub channel_capacity: usize,
    /// Rejected frames tolerated before the coordinator aborts. `None` never aborts.
    pub max_rejections: Option<u64>,
    /// Filter used when `RUST_LOG` is unset.
    pub log_filter: String,
    pub log_json: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            max_rejections: None,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            log_json: false,
        }
    }
}

impl IngestConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            channel_capacity: env_parse_opt("SPIKE_INGEST_CHANNEL_CAPACITY")
                .filter(|capacity: &usize| *capacity > 0)
                .unwrap_or(defaults.channel_capacity),
            max_rejections: env_parse_opt("SPIKE_INGEST_MAX_REJECTIONS"),
            log_filter: env_string_opt("SPIKE_INGEST_LOG").unwrap_or(defaults.log_filter),
            log_json: env_flag("SPIKE_INGEST_LOG_JSON"),
        }
    }
}

fn env_flag(key: &str) -> bool {
    env::var(key).map(|value| value == "1").unwrap_or(false)
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}

fn env_parse_opt<T: FromStr>(key: &str) -> Option<T> {
    env_string_opt(key).and_then(|value| value.trim().parse().ok())
}
