use crate::error::{config_error, env_error, BotResult};
use crate::utils::time::normalize_time;
use chrono_tz::Tz;
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use url::Url;

/// Optional per-check toggles file
pub const CHECKS_FILE: &str = "config/checks.toml";

/// Names of the periodic checks that can be toggled
pub mod checks {
    pub const MORNING_SCHEDULE: &str = "morning_schedule";
    pub const REMINDERS: &str = "reminders";
    pub const CHANGE_ALERTS: &str = "change_alerts";
    pub const WEEK_AHEAD: &str = "week_ahead";

    pub const ALL: &[&str] = &[MORNING_SCHEDULE, REMINDERS, CHANGE_ALERTS, WEEK_AHEAD];
}

/// Default morning schedule time
pub const DEFAULT_MORNING_TIME: &str = "09:00";
/// Default reminder lead time in minutes
pub const DEFAULT_REMINDER_MINUTES: u32 = 30;
/// Default length of the upcoming window in days
pub const DEFAULT_UPCOMING_DAYS: u32 = 7;
/// Default change check interval in seconds
pub const DEFAULT_CHANGE_CHECK_INTERVAL: u64 = 300;

/// Main configuration structure for the bot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Discord bot token
    pub discord_token: String,
    /// Discord channel ID that receives every notification
    pub notification_channel_id: u64,
    /// URL of the iCalendar feed to watch
    pub ical_url: String,
    /// Timezone for scheduling and display
    pub timezone: Tz,
    /// Wall-clock time (`HH:MM`) of the daily schedule
    pub morning_schedule_time: String,
    /// Minutes before an event start at which the reminder fires
    pub reminder_minutes: u32,
    /// Length of the upcoming window in days
    pub upcoming_days: u32,
    /// Seconds between change checks
    pub change_check_interval: u64,
    /// Locale of the notification texts
    pub bot_locale: String,
    /// Map of check names to their enabled status
    pub checks: HashMap<String, bool>,
}

impl Config {
    /// Load configuration from environment and config file
    pub fn load() -> BotResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        let mut config = Self::from_lookup(|key| env::var(key).ok())?;

        // Load check toggles from file if it exists
        if let Ok(content) = fs::read_to_string(CHECKS_FILE) {
            config.merge_checks(&content)?;
        }

        Ok(config)
    }

    /// Build configuration from a key lookup (environment variables in production)
    pub fn from_lookup<F>(lookup: F) -> BotResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> BotResult<String> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| env_error(key))
        };
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        // Required environment variables
        let discord_token = required("DISCORD_TOKEN")?;
        let ical_url = required("ICAL_URL")?;
        validate_feed_url(&ical_url)?;

        // Parse numeric values
        let notification_channel_id = required("NOTIFICATION_CHANNEL_ID")?
            .trim()
            .parse::<u64>()
            .map_err(|_| config_error("Invalid NOTIFICATION_CHANNEL_ID format"))?;
        if notification_channel_id == 0 {
            return Err(config_error("NOTIFICATION_CHANNEL_ID must not be zero"));
        }

        let timezone = match optional("TIMEZONE") {
            Some(tz) => tz
                .trim()
                .parse::<Tz>()
                .map_err(|_| config_error(&format!("Invalid TIMEZONE: {}", tz)))?,
            None => chrono_tz::UTC,
        };

        let morning_schedule_time = match optional("MORNING_SCHEDULE_TIME") {
            Some(time) => normalize_time(&time).ok_or_else(|| {
                config_error(&format!("Invalid MORNING_SCHEDULE_TIME, expected HH:MM: {}", time))
            })?,
            None => DEFAULT_MORNING_TIME.to_string(),
        };

        let reminder_minutes = parse_or(
            optional("REMINDER_MINUTES"),
            "REMINDER_MINUTES",
            DEFAULT_REMINDER_MINUTES,
        )?;

        let upcoming_days = parse_or(
            optional("UPCOMING_DAYS"),
            "UPCOMING_DAYS",
            DEFAULT_UPCOMING_DAYS,
        )?;
        if !(1..=31).contains(&upcoming_days) {
            return Err(config_error("UPCOMING_DAYS must be between 1 and 31"));
        }

        let change_check_interval = parse_or(
            optional("CHANGE_CHECK_INTERVAL"),
            "CHANGE_CHECK_INTERVAL",
            DEFAULT_CHANGE_CHECK_INTERVAL,
        )?;
        if change_check_interval < 60 {
            return Err(config_error("CHANGE_CHECK_INTERVAL must be at least 60 seconds"));
        }

        let bot_locale = optional("BOT_LOCALE").unwrap_or_else(|| String::from("en"));

        // Every check is enabled unless the toggles file says otherwise
        let checks = checks::ALL
            .iter()
            .map(|name| (name.to_string(), true))
            .collect();

        Ok(Config {
            discord_token,
            notification_channel_id,
            ical_url,
            timezone,
            morning_schedule_time,
            reminder_minutes,
            upcoming_days,
            change_check_interval,
            bot_locale,
            checks,
        })
    }

    /// Merge check toggles from TOML content over the defaults
    pub fn merge_checks(&mut self, content: &str) -> BotResult<()> {
        let file_checks = toml::from_str::<HashMap<String, bool>>(content)?;
        for (key, value) in file_checks {
            if !checks::ALL.contains(&key.as_str()) {
                tracing::warn!("Unknown check '{}' in {}", key, CHECKS_FILE);
            }
            self.checks.insert(key, value);
        }
        Ok(())
    }

    /// Check if a periodic check is enabled
    pub fn is_check_enabled(&self, name: &str) -> bool {
        *self.checks.get(name).unwrap_or(&false)
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, key: &str, default: T) -> BotResult<T> {
    match value {
        Some(v) => v
            .trim()
            .parse::<T>()
            .map_err(|_| config_error(&format!("Invalid {} format: {}", key, v))),
        None => Ok(default),
    }
}

fn validate_feed_url(raw: &str) -> BotResult<()> {
    let url = Url::parse(raw.trim())
        .map_err(|e| config_error(&format!("Invalid ICAL_URL: {}", e)))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(config_error(&format!(
            "ICAL_URL must use http or https, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("DISCORD_TOKEN", "token"),
        ("NOTIFICATION_CHANNEL_ID", "123456789"),
        ("ICAL_URL", "https://calendar.example.com/basic.ics"),
    ];

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(REQUIRED)).unwrap();
        assert_eq!(config.notification_channel_id, 123456789);
        assert_eq!(config.timezone, chrono_tz::UTC);
        assert_eq!(config.morning_schedule_time, "09:00");
        assert_eq!(config.reminder_minutes, 30);
        assert_eq!(config.upcoming_days, 7);
        assert_eq!(config.change_check_interval, 300);
        assert_eq!(config.bot_locale, "en");
        for name in checks::ALL {
            assert!(config.is_check_enabled(name));
        }
    }

    #[test]
    fn test_overrides_and_normalization() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("TIMEZONE", "Europe/Helsinki"));
        pairs.push(("MORNING_SCHEDULE_TIME", "7:05"));
        pairs.push(("REMINDER_MINUTES", "15"));
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(config.timezone, chrono_tz::Europe::Helsinki);
        assert_eq!(config.morning_schedule_time, "07:05");
        assert_eq!(config.reminder_minutes, 15);
    }

    #[test]
    fn test_missing_required_variable() {
        let err = Config::from_lookup(lookup_from(&REQUIRED[..2])).unwrap_err();
        assert!(err.to_string().contains("ICAL_URL"));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        for (key, value) in [
            ("TIMEZONE", "Mars/Olympus"),
            ("MORNING_SCHEDULE_TIME", "9am"),
            ("REMINDER_MINUTES", "-5"),
            ("UPCOMING_DAYS", "0"),
            ("CHANGE_CHECK_INTERVAL", "10"),
            ("ICAL_URL", "ftp://calendar.example.com/basic.ics"),
            ("NOTIFICATION_CHANNEL_ID", "general"),
            ("NOTIFICATION_CHANNEL_ID", "0"),
        ] {
            let mut pairs: Vec<(&str, &str)> =
                REQUIRED.iter().filter(|(k, _)| *k != key).copied().collect();
            pairs.push((key, value));
            assert!(
                Config::from_lookup(lookup_from(&pairs)).is_err(),
                "{}={} should be rejected",
                key,
                value
            );
        }
    }

    #[test]
    fn test_merge_checks() {
        let mut config = Config::from_lookup(lookup_from(REQUIRED)).unwrap();
        config
            .merge_checks("week_ahead = false\nreminders = true\n")
            .unwrap();
        assert!(!config.is_check_enabled(checks::WEEK_AHEAD));
        assert!(config.is_check_enabled(checks::REMINDERS));
        assert!(!config.is_check_enabled("unknown"));
        assert!(config.merge_checks("reminders = \"yes\"").is_err());
    }
}
