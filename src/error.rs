//! Error taxonomy shared by the core and the service layer.
//!
//! Core functions only ever produce `NotFound`, `InvalidOperation` and
//! `ConstraintViolation`. The remaining variants wrap failures from the
//! store, migrations, JSON columns and configuration.

use serde::Serialize;

/// ---------------------------------------------------------------------------
/// Error Types
/// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
  #[error("{entity} not found: {id}")]
  NotFound { entity: &'static str, id: String },

  #[error("Invalid operation: {0}")]
  InvalidOperation(String),

  #[error("Constraint violation: {0}")]
  ConstraintViolation(String),

  #[error("Database error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("Migration error: {0}")]
  Migration(#[from] sqlx::migrate::MigrateError),

  #[error("Serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("Configuration error: {0}")]
  Config(String),
}

pub type TrackerResult<T> = Result<T, TrackerError>;

impl TrackerError {
  pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
    Self::NotFound {
      entity,
      id: id.into(),
    }
  }

  /// HTTP-equivalent status for whatever layer renders the error
  pub fn status_code(&self) -> u16 {
    match self {
      Self::NotFound { .. } => 404,
      Self::InvalidOperation(_) => 400,
      Self::ConstraintViolation(_) => 409,
      Self::Database(_) | Self::Migration(_) | Self::Serialization(_) | Self::Config(_) => 500,
    }
  }

  /// Client-visible errors are the caller's fault; everything else is ours
  pub fn is_client_error(&self) -> bool {
    (400..500).contains(&self.status_code())
  }
}

impl Serialize for TrackerError {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: serde::Serializer,
  {
    serializer.serialize_str(&self.to_string())
  }
}
