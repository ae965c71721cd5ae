use std::{path::PathBuf, str::FromStr, time::Duration};

use anyhow::{Context, Result};
use chrono::{FixedOffset, TimeDelta};
use tracing::warn;

use crate::liveness::LivenessPolicy;

// ---------------------------------------------------------------------------
// Telegram
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct TelegramConfig {
    pub api_base: String,
    pub bot_token: String,
    pub chat_id: i64,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    /// Path of the monitoring catalog (sites, ladders, message templates).
    pub catalog_path: PathBuf,
    /// Silence in minutes before a sensor is reported offline.
    pub offline_threshold_mins: i64,
    /// Minutes between "still offline" reminders.
    pub offline_reminder_mins: i64,
    /// Offline scan interval in seconds.
    pub scan_interval_secs: u64,
    pub notify_queue_capacity: usize,
    pub notify_workers: usize,
    /// Upper bound for every statement of an ingestion transaction.
    pub statement_timeout_secs: u64,
    /// UTC offset used for human-readable times and "today".
    pub display_offset: FixedOffset,
    /// `None` when the bot token or chat id is missing; alerts are then only logged.
    pub telegram: Option<TelegramConfig>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Builds the config from any variable source. `from_env` passes the process environment.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| var(key).with_context(|| format!("missing required env var: {key}"));
        let optional = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_owned());

        let offset_hours: i32 = parse(&optional("DISPLAY_UTC_OFFSET_HOURS", "7"))
            .context("DISPLAY_UTC_OFFSET_HOURS must be an integer number of hours")?;
        let display_offset = offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .context("DISPLAY_UTC_OFFSET_HOURS must be between -23 and 23")?;

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            server_host: optional("SERVER_HOST", "0.0.0.0"),
            server_port: parse(&optional("SERVER_PORT", "8000"))
                .context("SERVER_PORT must be a valid port number")?,
            catalog_path: PathBuf::from(optional("CATALOG_PATH", "config/catalog.toml")),
            offline_threshold_mins: positive(&optional("OFFLINE_THRESHOLD_MINS", "10"))
                .context("OFFLINE_THRESHOLD_MINS must be a positive integer")?,
            offline_reminder_mins: positive(&optional("OFFLINE_REMINDER_MINS", "60"))
                .context("OFFLINE_REMINDER_MINS must be a positive integer")?,
            scan_interval_secs: positive(&optional("SCAN_INTERVAL_SECS", "60"))
                .context("SCAN_INTERVAL_SECS must be a positive integer")?,
            notify_queue_capacity: positive(&optional("NOTIFY_QUEUE_CAPACITY", "256"))
                .context("NOTIFY_QUEUE_CAPACITY must be a positive integer")?,
            notify_workers: positive(&optional("NOTIFY_WORKERS", "4"))
                .context("NOTIFY_WORKERS must be a positive integer")?,
            statement_timeout_secs: positive(&optional("STATEMENT_TIMEOUT_SECS", "30"))
                .context("STATEMENT_TIMEOUT_SECS must be a positive integer")?,
            display_offset,
            telegram: telegram_from_vars(&var, &optional("TELEGRAM_API_BASE", "https://api.telegram.org")),
        })
    }

    pub fn liveness_policy(&self) -> LivenessPolicy {
        LivenessPolicy {
            offline_after: TimeDelta::minutes(self.offline_threshold_mins),
            remind_every: TimeDelta::minutes(self.offline_reminder_mins),
        }
    }

    pub fn statement_timeout(&self) -> Duration {
        Duration::from_secs(self.statement_timeout_secs)
    }
}

fn telegram_from_vars(var: &impl Fn(&str) -> Option<String>, api_base: &str) -> Option<TelegramConfig> {
    let token = var("TELEGRAM_BOT_TOKEN").filter(|t| !t.trim().is_empty());
    let chat_id = var("TELEGRAM_CHAT_ID").filter(|c| !c.trim().is_empty());

    match (token, chat_id) {
        (Some(bot_token), Some(raw_chat_id)) => match raw_chat_id.trim().parse() {
            Ok(chat_id) => Some(TelegramConfig {
                api_base: api_base.to_owned(),
                bot_token: bot_token.trim().to_owned(),
                chat_id,
            }),
            Err(_) => {
                warn!(chat_id = %raw_chat_id, "TELEGRAM_CHAT_ID is not a numeric chat id; notifications disabled");
                None
            }
        },
        _ => {
            warn!("TELEGRAM_BOT_TOKEN or TELEGRAM_CHAT_ID not set; notifications disabled");
            None
        }
    }
}

fn parse<T: FromStr>(raw: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    Ok(raw.trim().parse::<T>()?)
}

fn positive<T>(raw: &str) -> Result<T>
where
    T: FromStr + PartialOrd + Default,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = parse::<T>(raw)?;
    anyhow::ensure!(value > T::default(), "value must be greater than zero");
    Ok(value)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_database_url_is_set() {
        let c = config(&[("DATABASE_URL", "postgres://localhost/sensors")]).unwrap();
        assert_eq!(c.server_host, "0.0.0.0");
        assert_eq!(c.server_port, 8000);
        assert_eq!(c.catalog_path, PathBuf::from("config/catalog.toml"));
        assert_eq!(c.liveness_policy(), LivenessPolicy::default());
        assert_eq!(c.scan_interval_secs, 60);
        assert_eq!(c.notify_queue_capacity, 256);
        assert_eq!(c.notify_workers, 4);
        assert_eq!(c.statement_timeout(), Duration::from_secs(30));
        assert_eq!(c.display_offset.local_minus_utc(), 7 * 3600);
        assert!(c.telegram.is_none());
    }

    #[test]
    fn database_url_is_required() {
        let err = config(&[]).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn invalid_port_is_rejected() {
        let err = config(&[("DATABASE_URL", "x"), ("SERVER_PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("SERVER_PORT"));
    }

    #[test]
    fn zero_workers_is_rejected() {
        let err = config(&[("DATABASE_URL", "x"), ("NOTIFY_WORKERS", "0")]).unwrap_err();
        assert!(err.to_string().contains("NOTIFY_WORKERS"));
    }

    #[test]
    fn out_of_range_offset_is_rejected() {
        let err = config(&[("DATABASE_URL", "x"), ("DISPLAY_UTC_OFFSET_HOURS", "30")]).unwrap_err();
        assert!(err.to_string().contains("DISPLAY_UTC_OFFSET_HOURS"));
    }

    #[test]
    fn telegram_enabled_with_token_and_chat_id() {
        let c = config(&[
            ("DATABASE_URL", "x"),
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("TELEGRAM_CHAT_ID", "-1001234567890"),
        ])
        .unwrap();
        assert_eq!(
            c.telegram,
            Some(TelegramConfig {
                api_base: "https://api.telegram.org".into(),
                bot_token: "123:abc".into(),
                chat_id: -1001234567890,
            })
        );
    }

    #[test]
    fn telegram_disabled_with_bad_chat_id() {
        let c = config(&[
            ("DATABASE_URL", "x"),
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("TELEGRAM_CHAT_ID", "@channel"),
        ])
        .unwrap();
        assert!(c.telegram.is_none());
    }
}
