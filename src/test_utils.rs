//! Test utilities and helpers for integration and unit testing
//!
//! This module provides common test infrastructure including:
//! - Database setup/teardown
//! - Seed helpers for tasks, exercises and slot assignments
//! - Mock data factories

use crate::config::TrackerConfig;
use crate::db::AppState;
use crate::models::{GymExercise, TaskTemplate};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde_json::{json, Value};
use sqlx::SqlitePool;

/// ---------------------------------------------------------------------------
/// Database Test Utilities
/// ---------------------------------------------------------------------------

/// Create an in-memory SQLite database for testing
/// Runs all migrations and returns a ready-to-use pool
///
/// Uses max_connections(1) to prevent multiple pool connections from creating
/// isolated in-memory databases, which would cause intermittent test failures
pub async fn setup_test_db() -> SqlitePool {
  let pool = sqlx::sqlite::SqlitePoolOptions::new()
    .max_connections(1)
    .connect("sqlite::memory:")
    .await
    .expect("Failed to create in-memory database");

  sqlx::migrate!("./migrations")
    .run(&pool)
    .await
    .expect("Failed to run migrations");

  pool
}

/// Close a test database pool
pub async fn teardown_test_db(pool: SqlitePool) {
  pool.close().await;
}

/// App state over a test pool with default configuration
pub fn test_state(pool: &SqlitePool) -> AppState {
  AppState::new(pool.clone(), TrackerConfig::default())
}

/// Seed one task template and return its id
pub async fn seed_test_task(pool: &SqlitePool, id: &str, title: &str, recurrence: Value, metadata: Value) -> String {
  let now = Utc::now();
  sqlx::query(
    r#"
    INSERT INTO task_templates (
      id, title, description, duration_minutes, priority,
      recurrence_json, metadata_json, is_archived, created_at, updated_at
    )
    VALUES (?1, ?2, NULL, 30, 'medium', ?3, ?4, 0, ?5, ?5)
    "#,
  )
  .bind(id)
  .bind(title)
  .bind(recurrence.to_string())
  .bind(metadata.to_string())
  .bind(now)
  .execute(pool)
  .await
  .expect("Failed to insert test task");

  id.to_string()
}

/// Seed one completion for a task
pub async fn seed_test_completion(pool: &SqlitePool, task_id: &str, completed_at: DateTime<Utc>) {
  sqlx::query(
    r#"
    INSERT INTO task_history (id, task_id, completed_at, duration_minutes, note, status)
    VALUES (?1, ?2, ?3, 30, NULL, 'completed')
    "#,
  )
  .bind(uuid::Uuid::new_v4().to_string())
  .bind(task_id)
  .bind(completed_at)
  .execute(pool)
  .await
  .expect("Failed to insert test completion");
}

/// Seed the exercise library used by the gym tests
///
/// | id        | primary    | secondary | active |
/// |-----------|------------|-----------|--------|
/// | ex-squat  | Quadriceps | Glutes    | yes    |
/// | ex-lunge  | Quads      | Glutes    | yes    |
/// | ex-rdl    | Hamstrings | Glutes    | yes    |
/// | ex-bench  | Chest      | Triceps   | yes    |
/// | ex-hack   | Quads      | -         | no     |
pub async fn seed_test_exercises(pool: &SqlitePool) -> Vec<String> {
  let exercises = vec![
    ("ex-squat", "Back Squat", Some("Quadriceps"), Some("Glutes"), true),
    ("ex-lunge", "Walking Lunge", Some("Quads"), Some("Glutes"), true),
    ("ex-rdl", "Romanian Deadlift", Some("Hamstrings"), Some("Glutes"), true),
    ("ex-bench", "Bench Press", Some("Chest"), Some("Triceps"), true),
    ("ex-hack", "Hack Squat", Some("Quads"), None, false),
  ];

  let mut ids = Vec::new();
  let now = Utc::now();

  for (id, name, primary, secondary, active) in exercises {
    sqlx::query(
      r#"
      INSERT INTO gym_exercises (
        id, name, equipment, primary_muscle, secondary_muscle, muscle_groups_json,
        rest_seconds, target_notes, extra_metadata_json, is_active, created_at, updated_at
      )
      VALUES (?1, ?2, NULL, ?3, ?4, '[]', 90, NULL, '{}', ?5, ?6, ?6)
      "#,
    )
    .bind(id)
    .bind(name)
    .bind(primary)
    .bind(secondary)
    .bind(active)
    .bind(now)
    .execute(pool)
    .await
    .expect("Failed to seed exercise");

    ids.push(id.to_string());
  }

  ids
}

/// Seed one slot assignment and return its id
pub async fn seed_test_assignment(
  pool: &SqlitePool,
  id: &str,
  default_exercise_id: Option<&str>,
  options: &[&str],
  metadata: Value,
) -> String {
  sqlx::query(
    r#"
    INSERT INTO gym_day_assignments (
      id, day_key, slot_id, slot_name, slot_subtitle, order_index,
      default_exercise_id, selected_exercise_id, options_json, metadata_json, updated_at
    )
    VALUES (?1, 'monday', ?2, 'Main Lift', NULL, 0, ?3, NULL, ?4, ?5, ?6)
    "#,
  )
  .bind(id)
  .bind(format!("slot-{}", id))
  .bind(default_exercise_id)
  .bind(json!(options).to_string())
  .bind(metadata.to_string())
  .bind(Utc::now())
  .execute(pool)
  .await
  .expect("Failed to seed assignment");

  id.to_string()
}

/// ---------------------------------------------------------------------------
/// Mock Data Factories
/// ---------------------------------------------------------------------------

/// A non-archived task template with the given recurrence
pub fn mock_task(id: &str, title: &str, recurrence: Value) -> TaskTemplate {
  TaskTemplate {
    id: id.to_string(),
    title: title.to_string(),
    description: None,
    duration_minutes: 30,
    priority: "medium".to_string(),
    recurrence,
    metadata: json!({}),
    is_archived: false,
    created_at: datetime_now(),
    updated_at: datetime_now(),
  }
}

/// An active exercise with the given muscles
pub fn mock_exercise(id: &str, name: &str, primary: Option<&str>, secondary: Option<&str>) -> GymExercise {
  GymExercise {
    id: id.to_string(),
    name: name.to_string(),
    equipment: None,
    primary_muscle: primary.map(String::from),
    secondary_muscle: secondary.map(String::from),
    muscle_groups: Vec::new(),
    rest_seconds: None,
    target_notes: None,
    extra_metadata: json!({}),
    is_active: true,
  }
}

/// ---------------------------------------------------------------------------
/// Time Helpers
/// ---------------------------------------------------------------------------

/// Build a calendar date, panicking on an invalid one
pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
  NaiveDate::from_ymd_opt(y, m, d).expect("Should be a valid date")
}

/// Midday UTC on the given date
pub fn noon_utc(day: NaiveDate) -> DateTime<Utc> {
  day
    .and_hms_opt(12, 0, 0)
    .expect("Should be a valid time")
    .and_utc()
}

/// Create a DateTime N days ago from now
pub fn datetime_days_ago(days: i64) -> DateTime<Utc> {
  Utc::now() - Duration::days(days)
}

/// Create a DateTime representing now
pub fn datetime_now() -> DateTime<Utc> {
  Utc::now()
}

/// ---------------------------------------------------------------------------
/// Tests for Test Utilities
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_setup_db_creates_schema() {
    let pool = setup_test_db().await;

    let tables: Vec<(String,)> = sqlx::query_as(
      "SELECT name FROM sqlite_master WHERE type='table' AND name IN ('task_templates', 'task_history', 'gym_exercises', 'gym_day_assignments', 'gym_exercise_history', 'app_settings')"
    )
    .fetch_all(&pool)
    .await
    .expect("Failed to query tables");

    assert_eq!(tables.len(), 6, "Expected 6 tables, got {}", tables.len());

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_seed_exercises_returns_correct_count() {
    let pool = setup_test_db().await;

    let ids = seed_test_exercises(&pool).await;
    assert_eq!(ids.len(), 5);

    let active: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM gym_exercises WHERE is_active = 1")
      .fetch_one(&pool)
      .await
      .expect("Failed to count exercises");

    assert_eq!(active, 4);

    teardown_test_db(pool).await;
  }

  #[test]
  fn test_datetime_helpers_produce_correct_dates() {
    let now = datetime_now();
    let past = datetime_days_ago(7);

    let diff = now - past;
    // Allow for slight timing differences (6-8 days is acceptable)
    assert!(diff.num_days() >= 6 && diff.num_days() <= 8,
            "Expected ~7 days difference, got {}", diff.num_days());

    assert_eq!(noon_utc(date(2026, 10, 17)).date_naive(), date(2026, 10, 17));
  }
}
