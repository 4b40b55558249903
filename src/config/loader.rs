use std::{env, time::Duration};

use super::env::{
    AppConfig, ConfigError, DirectoryConfig, LoggingConfig, MediaConfig, NoticeConfig,
    ResilienceConfig, StickyConfig,
};
use crate::domain::MinutesRange;

pub fn load_config() -> Result<AppConfig, ConfigError> {
    AppConfig::from_env()
}

impl AppConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let telegram_bot_token = env::var("TELEGRAM_BOT_TOKEN")
            .map_err(|_| ConfigError::Missing("TELEGRAM_BOT_TOKEN"))?;

        let bot_username = env::var("BOT_USERNAME").ok().filter(|v| !v.is_empty());
        let admin_group_id = parse_int("ADMIN_GROUP_ID").map(|id| if id > 0 { -id } else { id });

        let directories = DirectoryConfig {
            logs_dir: env::var("LOGS_DIR").unwrap_or_else(|_| "logs".to_string()),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        };

        let timezone = env::var("BOT_TIMEZONE").unwrap_or_else(|_| "UTC".to_string());

        let sticky = StickyConfig {
            debounce: Duration::from_millis(parse_or("STICKY_DEBOUNCE_MS", 800)),
            minutes: minutes_range("STICKY", (1, 20, 5))?,
        };

        let media = MediaConfig {
            minutes: minutes_range("MEDIA", (1, 60, 5))?,
        };

        let notices = NoticeConfig {
            ttl: Some(parse_or("NOTICE_TTL_SECONDS", 15u64))
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            cleanup_commands: parse_flag(env::var("CLEANUP_COMMANDS").ok().as_deref(), true),
        };

        let resilience = ResilienceConfig {
            network_error_window: Duration::from_secs(parse_or("NETWORK_ERROR_WINDOW_SECS", 60)),
            network_error_threshold: parse_or("NETWORK_ERROR_THRESHOLD", 5),
            alert_cooldown: Duration::from_secs(parse_or("ALERT_COOLDOWN_SECS", 600)),
        };

        Ok(Self {
            telegram_bot_token,
            bot_username,
            admin_group_id,
            directories,
            logging,
            timezone,
            sticky,
            media,
            notices,
            resilience,
        })
    }
}

fn minutes_range(
    prefix: &'static str,
    (min, max, default): (u32, u32, u32),
) -> Result<MinutesRange, ConfigError> {
    let min = parse_or(&format!("{prefix}_MIN_MINUTES"), min);
    let max = parse_or(&format!("{prefix}_MAX_MINUTES"), max);
    let default = parse_or(&format!("{prefix}_DEFAULT_MINUTES"), default);
    MinutesRange::new(min, max, default).ok_or(ConfigError::InvalidRange { prefix, min, max })
}

fn parse_int(key: &str) -> Option<i64> {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<i64>().ok())
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn parse_flag(value: Option<&str>, default: bool) -> bool {
    match value.map(|v| v.trim().to_ascii_lowercase()) {
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => true,
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => false,
        _ => default,
    }
}
