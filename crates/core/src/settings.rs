//! Notification settings: templates, trigger times and the retry policy.
//!
//! There is at most one live [`NotificationConfig`]. It is replaced wholesale
//! on every save; [`NotificationConfigInput`] fills in defaults for the
//! optional fields the way the settings form always has.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ParabensError;

pub const DEFAULT_REMINDER_TEMPLATE: &str =
    "🎉 Lembrete: Amanhã é aniversário de [NOME]!\nCargo: [CARGO]\nNão esqueça de parabenizar! 🎂";
pub const DEFAULT_BIRTHDAY_TEMPLATE: &str =
    "🎂 Hoje é aniversário de [NOME]!\nCargo: [CARGO]\nParabenize nossa equipe! 🎉🎈";

const DEFAULT_REMINDER_TIME: TimeOfDay = TimeOfDay { hour: 8, minute: 0 };
const DEFAULT_BIRTHDAY_TIME: TimeOfDay = TimeOfDay { hour: 9, minute: 0 };
const DEFAULT_RETRY_ATTEMPTS: u32 = 2;
const DEFAULT_RETRY_INTERVAL_MINUTES: u32 = 5;

// ── Time of day ───────────────────────────────────────────────

/// Wall-clock `HH:MM` in the deployment's local zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    hour: u32,
    minute: u32,
}

impl TimeOfDay {
    pub fn new(hour: u32, minute: u32) -> Result<Self, ParabensError> {
        if hour > 23 || minute > 59 {
            return Err(ParabensError::InvalidTime(format!("{hour}:{minute}")));
        }
        Ok(Self { hour, minute })
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }
}

impl FromStr for TimeOfDay {
    type Err = ParabensError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParabensError::InvalidTime(s.to_string());
        let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
        let is_field = |part: &str| {
            (1..=2).contains(&part.len()) && part.bytes().all(|b| b.is_ascii_digit())
        };
        if !is_field(h) || !is_field(m) {
            return Err(invalid());
        }
        let hour = h.parse().map_err(|_| invalid())?;
        let minute = m.parse().map_err(|_| invalid())?;
        Self::new(hour, minute).map_err(|_| invalid())
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = ParabensError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(t: TimeOfDay) -> Self {
        t.to_string()
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

// ── Retry policy ──────────────────────────────────────────────

/// Governs delivery retries: how many sends per contact and the pause between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }
}

// ── Notification config ───────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationConfig {
    pub reminder_template: String,
    pub birthday_template: String,
    pub reminder_time: TimeOfDay,
    pub birthday_time: TimeOfDay,
    pub weekends_enabled: bool,
    pub retry_attempts: u32,
    /// Minutes between delivery attempts.
    pub retry_interval: u32,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            reminder_template: DEFAULT_REMINDER_TEMPLATE.to_string(),
            birthday_template: DEFAULT_BIRTHDAY_TEMPLATE.to_string(),
            reminder_time: DEFAULT_REMINDER_TIME,
            birthday_time: DEFAULT_BIRTHDAY_TIME,
            weekends_enabled: true,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_interval: DEFAULT_RETRY_INTERVAL_MINUTES,
        }
    }
}

impl NotificationConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_attempts,
            Duration::from_secs(u64::from(self.retry_interval) * 60),
        )
    }

    pub fn validate(&self) -> Result<(), ParabensError> {
        if self.retry_attempts < 1 {
            return Err(ParabensError::InvalidConfig(
                "retry_attempts must be at least 1".to_string(),
            ));
        }
        if self.reminder_template.trim().is_empty() || self.birthday_template.trim().is_empty() {
            return Err(ParabensError::InvalidConfig(
                "message templates must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Body of a settings save. Templates are required, everything else falls
/// back to the defaults when omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfigInput {
    pub reminder_template: String,
    pub birthday_template: String,
    #[serde(default)]
    pub reminder_time: Option<String>,
    #[serde(default)]
    pub birthday_time: Option<String>,
    #[serde(default)]
    pub weekends_enabled: Option<bool>,
    #[serde(default)]
    pub retry_attempts: Option<u32>,
    #[serde(default)]
    pub retry_interval: Option<u32>,
}

impl NotificationConfigInput {
    pub fn resolve(self) -> Result<NotificationConfig, ParabensError> {
        let time_or = |value: Option<String>, default: TimeOfDay| match value {
            Some(s) if !s.trim().is_empty() => s.parse::<TimeOfDay>(),
            _ => Ok(default),
        };

        let config = NotificationConfig {
            reminder_template: self.reminder_template,
            birthday_template: self.birthday_template,
            reminder_time: time_or(self.reminder_time, DEFAULT_REMINDER_TIME)?,
            birthday_time: time_or(self.birthday_time, DEFAULT_BIRTHDAY_TIME)?,
            weekends_enabled: self.weekends_enabled.unwrap_or(true),
            retry_attempts: self.retry_attempts.unwrap_or(DEFAULT_RETRY_ATTEMPTS),
            retry_interval: self.retry_interval.unwrap_or(DEFAULT_RETRY_INTERVAL_MINUTES),
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> NotificationConfigInput {
        NotificationConfigInput {
            reminder_template: "Amanhã: [NOME]".to_string(),
            birthday_template: "Hoje: [NOME]".to_string(),
            reminder_time: None,
            birthday_time: None,
            weekends_enabled: None,
            retry_attempts: None,
            retry_interval: None,
        }
    }

    #[test]
    fn time_of_day_parses_and_formats() {
        let t: TimeOfDay = "8:05".parse().unwrap();
        assert_eq!((t.hour(), t.minute()), (8, 5));
        assert_eq!(t.to_string(), "08:05");
        assert_eq!("23:59".parse::<TimeOfDay>().unwrap().to_string(), "23:59");
    }

    #[test]
    fn time_of_day_rejects_garbage() {
        for bad in [
            "", "24:00", "12:60", "noon", "12", "1:2:3", "123:00", "+8:00", "08:+5", "-0:00", "8: 00",
        ] {
            assert!(bad.parse::<TimeOfDay>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn time_of_day_serializes_as_string() {
        let t = TimeOfDay::new(9, 30).unwrap();
        assert_eq!(serde_json::to_string(&t).unwrap(), "\"09:30\"");
        let back: TimeOfDay = serde_json::from_str("\"07:15\"").unwrap();
        assert_eq!(back, TimeOfDay::new(7, 15).unwrap());
        assert!(serde_json::from_str::<TimeOfDay>("\"99:00\"").is_err());
    }

    #[test]
    fn input_fills_defaults() {
        let cfg = input().resolve().unwrap();
        assert_eq!(cfg.reminder_time.to_string(), "08:00");
        assert_eq!(cfg.birthday_time.to_string(), "09:00");
        assert!(cfg.weekends_enabled);
        assert_eq!(cfg.retry_attempts, 2);
        assert_eq!(cfg.retry_interval, 5);
    }

    #[test]
    fn input_keeps_explicit_values() {
        let cfg = NotificationConfigInput {
            reminder_time: Some("07:30".to_string()),
            weekends_enabled: Some(false),
            retry_attempts: Some(4),
            retry_interval: Some(0),
            ..input()
        }
        .resolve()
        .unwrap();
        assert_eq!(cfg.reminder_time, TimeOfDay::new(7, 30).unwrap());
        assert!(!cfg.weekends_enabled);
        assert_eq!(cfg.retry_attempts, 4);
        assert_eq!(cfg.retry_interval, 0);
    }

    #[test]
    fn input_rejects_zero_attempts_and_bad_times() {
        let zero = NotificationConfigInput {
            retry_attempts: Some(0),
            ..input()
        };
        assert!(matches!(zero.resolve(), Err(ParabensError::InvalidConfig(_))));

        let bad_time = NotificationConfigInput {
            birthday_time: Some("25:00".to_string()),
            ..input()
        };
        assert!(matches!(bad_time.resolve(), Err(ParabensError::InvalidTime(_))));
    }

    #[test]
    fn retry_policy_converts_minutes() {
        let cfg = NotificationConfig {
            retry_attempts: 3,
            retry_interval: 2,
            ..Default::default()
        };
        let policy = cfg.retry_policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.backoff, Duration::from_secs(120));
    }
}
