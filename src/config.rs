//! Runtime configuration
//!
//! Built once at startup (after `.env` is loaded) and handed to every entry
//! point that needs it. Nothing here is cached globally.

use chrono::Weekday;
use std::env;

use crate::error::TrackerError;
use crate::logging::LoggingConfig;

/// ---------------------------------------------------------------------------
/// Defaults
/// ---------------------------------------------------------------------------

const DEFAULT_DATABASE_URL: &str = "sqlite://life-tracker.db?mode=rwc";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// ---------------------------------------------------------------------------
/// Config Sections
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
  pub url: String,
  pub max_connections: u32,
}

impl Default for DatabaseConfig {
  fn default() -> Self {
    Self {
      url: DEFAULT_DATABASE_URL.to_string(),
      max_connections: DEFAULT_MAX_CONNECTIONS,
    }
  }
}

/// Week resolution for schedule previews
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleSettings {
  /// First day of the planning week; the default week starts on the next one
  pub week_start_day: Weekday,
}

impl Default for ScheduleSettings {
  fn default() -> Self {
    Self {
      week_start_day: Weekday::Sat,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GymSettings {
  /// Reject explicit selections outside a slot's option list (when it has one)
  pub enforce_option_allowlist: bool,
}

#[derive(Debug, Clone, Default)]
pub struct TrackerConfig {
  pub database: DatabaseConfig,
  pub schedule: ScheduleSettings,
  pub gym: GymSettings,
  pub logging: LoggingConfig,
}

impl TrackerConfig {
  /// Read configuration from `APP_*` environment variables
  pub fn from_env() -> Result<Self, TrackerError> {
    let database = DatabaseConfig {
      url: env::var("APP_DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
      max_connections: match env::var("APP_DB_MAX_CONNECTIONS") {
        Ok(raw) => raw.trim().parse().map_err(|_| {
          TrackerError::Config(format!("APP_DB_MAX_CONNECTIONS is not a number: {}", raw))
        })?,
        Err(_) => DEFAULT_MAX_CONNECTIONS,
      },
    };

    let schedule = ScheduleSettings {
      week_start_day: match env::var("APP_WEEK_START_DAY") {
        Ok(raw) => raw.trim().parse::<Weekday>().map_err(|_| {
          TrackerError::Config(format!("APP_WEEK_START_DAY is not a weekday: {}", raw))
        })?,
        Err(_) => Weekday::Sat,
      },
    };

    let gym = GymSettings {
      enforce_option_allowlist: match env::var("APP_ENFORCE_OPTION_ALLOWLIST") {
        Ok(raw) => parse_flag("APP_ENFORCE_OPTION_ALLOWLIST", &raw)?,
        Err(_) => false,
      },
    };

    Ok(Self {
      database,
      schedule,
      gym,
      logging: LoggingConfig::from_env(),
    })
  }
}

fn parse_flag(name: &str, raw: &str) -> Result<bool, TrackerError> {
  match raw.trim().to_lowercase().as_str() {
    "1" | "true" | "yes" | "on" => Ok(true),
    "0" | "false" | "no" | "off" | "" => Ok(false),
    other => Err(TrackerError::Config(format!(
      "{} is not a boolean: {}",
      name, other
    ))),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;

  const VARS: [&str; 4] = [
    "APP_DATABASE_URL",
    "APP_DB_MAX_CONNECTIONS",
    "APP_WEEK_START_DAY",
    "APP_ENFORCE_OPTION_ALLOWLIST",
  ];

  #[test]
  #[serial]
  fn test_defaults_when_unset() {
    temp_env::with_vars_unset(VARS, || {
      let config = TrackerConfig::from_env().expect("defaults should load");
      assert_eq!(config.database.url, DEFAULT_DATABASE_URL);
      assert_eq!(config.database.max_connections, 5);
      assert_eq!(config.schedule.week_start_day, Weekday::Sat);
      assert!(!config.gym.enforce_option_allowlist);
    });
  }

  #[test]
  #[serial]
  fn test_reads_overrides() {
    temp_env::with_vars(
      [
        ("APP_DATABASE_URL", Some("sqlite::memory:")),
        ("APP_DB_MAX_CONNECTIONS", Some("2")),
        ("APP_WEEK_START_DAY", Some("monday")),
        ("APP_ENFORCE_OPTION_ALLOWLIST", Some("true")),
      ],
      || {
        let config = TrackerConfig::from_env().expect("overrides should load");
        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.database.max_connections, 2);
        assert_eq!(config.schedule.week_start_day, Weekday::Mon);
        assert!(config.gym.enforce_option_allowlist);
      },
    );
  }

  #[test]
  #[serial]
  fn test_rejects_garbage_flag() {
    temp_env::with_vars(
      [("APP_ENFORCE_OPTION_ALLOWLIST", Some("sometimes"))],
      || {
        let err = TrackerConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("APP_ENFORCE_OPTION_ALLOWLIST"));
      },
    );
  }

  #[test]
  #[serial]
  fn test_rejects_bad_weekday() {
    temp_env::with_vars([("APP_WEEK_START_DAY", Some("someday"))], || {
      assert!(TrackerConfig::from_env().is_err());
    });
  }
}
