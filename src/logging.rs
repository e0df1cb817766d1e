//! Structured logging setup for the binary

use std::env;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
  Json,
  Pretty,
  Compact,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
  /// Filter directive, e.g. `info` or `life_tracker_lib=debug`
  pub level: String,
  pub format: LogFormat,
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      level: "info".into(),
      format: LogFormat::Compact,
    }
  }
}

impl LoggingConfig {
  pub fn from_env() -> Self {
    let level = env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let format = match env::var("LOG_FORMAT").as_deref() {
      Ok("json") => LogFormat::Json,
      Ok("pretty") => LogFormat::Pretty,
      _ => LogFormat::Compact,
    };
    Self { level, format }
  }
}

/// Install the global subscriber. Logs go to stderr so stdout stays clean
/// for prompt output.
pub fn init_logging(config: &LoggingConfig) {
  let filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));
  let registry = tracing_subscriber::registry().with(filter);

  let result = match config.format {
    LogFormat::Json => registry
      .with(fmt::layer().json().with_writer(std::io::stderr))
      .try_init(),
    LogFormat::Pretty => registry
      .with(fmt::layer().pretty().with_writer(std::io::stderr))
      .try_init(),
    LogFormat::Compact => registry
      .with(fmt::layer().compact().with_writer(std::io::stderr))
      .try_init(),
  };

  if let Err(e) = result {
    eprintln!("Logging already initialized: {}", e);
  }
}
