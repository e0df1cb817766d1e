use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::sync::Arc;
use tracing::info;

use crate::config::{DatabaseConfig, TrackerConfig};
use crate::error::TrackerResult;
use crate::store::{GymRepository, SettingsRepository, SqliteStore, TaskRepository};

pub type DbPool = SqlitePool;

/// Everything the service layer reads and writes
pub trait Store: TaskRepository + GymRepository + SettingsRepository {}

impl<T> Store for T where T: TaskRepository + GymRepository + SettingsRepository {}

/// Application state shared by every command
#[derive(Clone)]
pub struct AppState {
  pub store: Arc<dyn Store>,
  pub config: TrackerConfig,
}

impl AppState {
  pub fn new(pool: DbPool, config: TrackerConfig) -> Self {
    Self {
      store: Arc::new(SqliteStore::new(pool)),
      config,
    }
  }
}

/// Initialize the database connection pool and run migrations
pub async fn initialize_db(config: &DatabaseConfig) -> TrackerResult<DbPool> {
  info!("Initializing database at: {}", config.url);

  let pool = SqlitePoolOptions::new()
    .max_connections(config.max_connections)
    .connect(&config.url)
    .await?;

  sqlx::migrate!("./migrations").run(&pool).await?;

  info!("Database initialized successfully");

  Ok(pool)
}
