#![forbid(unsafe_code)]

use std::time::Duration;

const DEFAULT_DB_FILE: &str = "dag_store.db";
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 250;
const DEFAULT_RETRY_INTERVAL_MS: u64 = 20;
const DEFAULT_RETRY_TIMEOUT_MS: u64 = 30_000;

pub const ENV_DB_FILE: &str = "DAG_STORE_DB_FILE";
pub const ENV_BUSY_TIMEOUT_MS: &str = "DAG_STORE_BUSY_TIMEOUT_MS";
pub const ENV_RETRY_INTERVAL_MS: &str = "DAG_STORE_RETRY_INTERVAL_MS";
pub const ENV_RETRY_TIMEOUT_MS: &str = "DAG_STORE_RETRY_TIMEOUT_MS";

/// Connection and contention settings for a [`SqliteStore`](crate::SqliteStore).
///
/// `busy_timeout` is the SQLite-level wait on a locked database. When it
/// expires the write wrapper rolls back, sleeps `retry_interval` and starts
/// over, giving up with `StoreBusy` once `retry_timeout` has elapsed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreConfig {
    pub db_file_name: String,
    pub busy_timeout: Duration,
    pub retry_interval: Duration,
    pub retry_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_file_name: DEFAULT_DB_FILE.to_string(),
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
            retry_interval: Duration::from_millis(DEFAULT_RETRY_INTERVAL_MS),
            retry_timeout: Duration::from_millis(DEFAULT_RETRY_TIMEOUT_MS),
        }
    }
}

impl StoreConfig {
    /// Defaults overridden by `DAG_STORE_*` environment variables. Blank or
    /// unparsable values are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let millis = |name: &str, default: u64| {
            Duration::from_millis(
                read(name)
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(default),
            )
        };

        Self {
            db_file_name: read(ENV_DB_FILE).unwrap_or_else(|| DEFAULT_DB_FILE.to_string()),
            busy_timeout: millis(ENV_BUSY_TIMEOUT_MS, DEFAULT_BUSY_TIMEOUT_MS),
            retry_interval: millis(ENV_RETRY_INTERVAL_MS, DEFAULT_RETRY_INTERVAL_MS),
            retry_timeout: millis(ENV_RETRY_TIMEOUT_MS, DEFAULT_RETRY_TIMEOUT_MS),
        }
    }

    pub fn with_retry(mut self, retry_interval: Duration, retry_timeout: Duration) -> Self {
        self.retry_interval = retry_interval;
        self.retry_timeout = retry_timeout;
        self
    }

    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }
}
