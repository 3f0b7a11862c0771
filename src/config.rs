//! Settings read from the environment (and `.env`, when present).

use std::env;
use std::str::FromStr;

use chrono::FixedOffset;

pub const DEFAULT_SOURCE_UTC_OFFSET: &str = "+03:00";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppMode {
    Debug,
    #[default]
    Production,
    Test,
}

impl FromStr for AppMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "debug" => Ok(AppMode::Debug),
            "production" => Ok(AppMode::Production),
            "test" => Ok(AppMode::Test),
            other => Err(ConfigError::Invalid {
                key: "APP_MODE",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { key: &'static str, value: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{} must be set", key),
            ConfigError::Invalid { key, value } => write!(f, "Invalid {}: {}", key, value),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub mode: AppMode,
    /// Zone the export file names are stamped in
    pub source_utc_offset: FixedOffset,
}

impl Settings {
    /// Load `.env` and read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let mode = match lookup("APP_MODE") {
            Some(value) => value.parse()?,
            None => AppMode::default(),
        };

        let offset = lookup("SOURCE_UTC_OFFSET")
            .unwrap_or_else(|| DEFAULT_SOURCE_UTC_OFFSET.to_string());
        let source_utc_offset = parse_utc_offset(&offset).ok_or(ConfigError::Invalid {
            key: "SOURCE_UTC_OFFSET",
            value: offset,
        })?;

        Ok(Self {
            database_url,
            mode,
            source_utc_offset,
        })
    }

    /// Default log filter for the mode, used when `RUST_LOG` is not set.
    pub fn default_log_filter(&self) -> &'static str {
        match self.mode {
            AppMode::Debug | AppMode::Test => "debug,sqlx=warn",
            AppMode::Production => "info,state_purchases=debug",
        }
    }
}

/// Parses `+HH:MM` / `-HH:MM`.
fn parse_utc_offset(value: &str) -> Option<FixedOffset> {
    let value = value.trim();
    let (sign, rest) = match value.as_bytes().first()? {
        b'+' => (1, &value[1..]),
        b'-' => (-1, &value[1..]),
        _ => return None,
    };
    let (hours, minutes) = rest.split_once(':')?;
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
