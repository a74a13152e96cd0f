/// Configuration for the synchronization engine
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_SEEN_CAP: usize = 4096;

/// Engine configuration. Intervals default to the values the marketplace
/// frontend has always polled at; all of them are tunable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Chat-list refresh interval
    pub chat_list_interval: Duration,

    /// Active-conversation message refresh interval
    pub message_interval: Duration,

    /// Notification feed refresh interval
    pub notification_interval: Duration,

    /// Unread-badge recompute interval
    pub unread_interval: Duration,

    /// Data directory for the durable seen-state record
    /// (defaults to `.patitas/user-<id>`)
    pub data_dir: Option<PathBuf>,

    /// Max acknowledged notification ids retained per user; oldest are
    /// dropped on save once the cap is exceeded
    pub seen_cap: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            chat_list_interval: Duration::from_secs(3),
            message_interval: Duration::from_secs(2),
            notification_interval: Duration::from_secs(5),
            unread_interval: Duration::from_secs(5),
            data_dir: None,
            seen_cap: DEFAULT_SEEN_CAP,
        }
    }
}

impl SyncConfig {
    /// Build a config from defaults plus env overrides (nice for scripts)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(ms) = env_ms("PATITAS_CHAT_LIST_MS") {
            config.chat_list_interval = ms;
        }
        if let Some(ms) = env_ms("PATITAS_MESSAGES_MS") {
            config.message_interval = ms;
        }
        if let Some(ms) = env_ms("PATITAS_NOTIFICATIONS_MS") {
            config.notification_interval = ms;
        }
        if let Some(ms) = env_ms("PATITAS_UNREAD_MS") {
            config.unread_interval = ms;
        }
        if let Ok(dir) = std::env::var("PATITAS_DATA_DIR") {
            config.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(cap) = std::env::var("PATITAS_SEEN_CAP")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
        {
            config.seen_cap = cap;
        }

        config
    }
}

fn env_ms(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}
