use std::time::Duration;

use thiserror::Error;

use crate::domain::MinutesRange;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub telegram_bot_token: String,
    pub bot_username: Option<String>,
    pub admin_group_id: Option<i64>,
    pub directories: DirectoryConfig,
    pub logging: LoggingConfig,
    pub timezone: String,
    pub sticky: StickyConfig,
    pub media: MediaConfig,
    pub notices: NoticeConfig,
    pub resilience: ResilienceConfig,
}

#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub logs_dir: String,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Clone)]
pub struct StickyConfig {
    pub debounce: Duration,
    pub minutes: MinutesRange,
}

#[derive(Debug, Clone)]
pub struct MediaConfig {
    pub minutes: MinutesRange,
}

#[derive(Debug, Clone)]
pub struct NoticeConfig {
    /// `None` keeps bot confirmations in the chat.
    pub ttl: Option<Duration>,
    pub cleanup_commands: bool,
}

#[derive(Debug, Clone)]
pub struct ResilienceConfig {
    pub network_error_window: Duration,
    pub network_error_threshold: u32,
    pub alert_cooldown: Duration,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),
    #[error("invalid minute range for {prefix}: min {min} is greater than max {max}")]
    InvalidRange {
        prefix: &'static str,
        min: u32,
        max: u32,
    },
}
