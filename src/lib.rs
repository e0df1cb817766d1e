pub mod classifier;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod muscles;
pub mod preview;
pub mod recurrence;
pub mod store;
pub mod substitution;

#[cfg(test)]
pub mod test_utils;

pub use config::TrackerConfig;
pub use db::{initialize_db, AppState};
pub use error::{TrackerError, TrackerResult};
pub use logging::init_logging;
