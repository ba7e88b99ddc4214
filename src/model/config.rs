use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration from boardsync.toml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sync: SyncSettings,
    #[serde(default)]
    pub log: LogSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Upper bound for each remote call. A call that does not answer in
    /// time counts as a failure and the move is rolled back.
    #[serde(default = "default_remote_timeout_ms")]
    pub remote_timeout_ms: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            remote_timeout_ms: default_remote_timeout_ms(),
        }
    }
}

impl SyncSettings {
    pub fn remote_timeout(&self) -> Duration {
        Duration::from_millis(self.remote_timeout_ms)
    }
}

fn default_remote_timeout_ms() -> u64 {
    10_000
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogSettings {
    /// `tracing_subscriber::EnvFilter` directive, overridden by BOARDSYNC_LOG
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        LogSettings {
            filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    "warn".to_string()
}
