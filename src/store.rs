//! Repository abstraction and its SQLite implementation
//!
//! The scheduling and substitution core never touches the database. The
//! service layer reads plain values through these traits, hands them to the
//! core, and writes back whatever the core returns.
//!
//! JSON-shaped columns are stored as TEXT. A column that no longer parses is
//! logged and read as its empty default rather than failing the request.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::warn;

use crate::error::TrackerResult;
use crate::models::{GymDayAssignment, GymExercise, GymExerciseHistory, TaskHistory, TaskTemplate};

/// ---------------------------------------------------------------------------
/// Repository Traits
/// ---------------------------------------------------------------------------

#[async_trait]
pub trait TaskRepository: Send + Sync {
  /// Newest first
  async fn list_tasks(&self, include_archived: bool) -> TrackerResult<Vec<TaskTemplate>>;
  async fn get_task(&self, id: &str) -> TrackerResult<Option<TaskTemplate>>;
  async fn insert_task(&self, task: &TaskTemplate) -> TrackerResult<()>;
  async fn update_task(&self, task: &TaskTemplate) -> TrackerResult<()>;
  async fn delete_task(&self, id: &str) -> TrackerResult<bool>;

  /// Newest first, joined with the task title. `None` lists every task.
  async fn list_history(&self, task_id: Option<&str>, limit: i64) -> TrackerResult<Vec<TaskHistory>>;
  async fn insert_history(&self, entry: &TaskHistory) -> TrackerResult<()>;
  async fn last_completed_at(&self, task_id: &str) -> TrackerResult<Option<DateTime<Utc>>>;
}

#[async_trait]
pub trait GymRepository: Send + Sync {
  /// Ordered by name
  async fn list_exercises(&self) -> TrackerResult<Vec<GymExercise>>;
  async fn get_exercise(&self, id: &str) -> TrackerResult<Option<GymExercise>>;
  async fn insert_exercise(&self, exercise: &GymExercise) -> TrackerResult<()>;
  async fn update_exercise(&self, exercise: &GymExercise) -> TrackerResult<()>;
  async fn update_exercise_metadata(&self, id: &str, extra_metadata: &Value) -> TrackerResult<()>;
  /// Removes its sessions too; slots pointing at it fall back to null
  async fn delete_exercise(&self, id: &str) -> TrackerResult<bool>;

  /// Ordered by day, then slot position
  async fn list_assignments(&self) -> TrackerResult<Vec<GymDayAssignment>>;
  async fn get_assignment(&self, id: &str) -> TrackerResult<Option<GymDayAssignment>>;
  async fn insert_assignment(&self, assignment: &GymDayAssignment) -> TrackerResult<()>;
  async fn set_selected_exercise(&self, assignment_id: &str, exercise_id: Option<&str>) -> TrackerResult<()>;

  /// Newest first
  async fn list_exercise_history(&self, exercise_id: &str) -> TrackerResult<Vec<GymExerciseHistory>>;
  async fn latest_exercise_history(&self, exercise_id: &str) -> TrackerResult<Option<GymExerciseHistory>>;
  async fn get_exercise_history(&self, id: &str) -> TrackerResult<Option<GymExerciseHistory>>;
  async fn insert_exercise_history(&self, entry: &GymExerciseHistory) -> TrackerResult<()>;
  async fn delete_exercise_history(&self, id: &str) -> TrackerResult<bool>;
}

#[async_trait]
pub trait SettingsRepository: Send + Sync {
  async fn get_setting(&self, key: &str) -> TrackerResult<Option<String>>;
  async fn set_setting(&self, key: &str, value: &str) -> TrackerResult<()>;
}

/// ---------------------------------------------------------------------------
/// SQLite Store
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SqliteStore {
  pool: SqlitePool,
}

impl SqliteStore {
  pub fn new(pool: SqlitePool) -> Self {
    Self { pool }
  }
}

fn parse_json_column(table: &str, column: &str, raw: &str, fallback: Value) -> Value {
  match serde_json::from_str(raw) {
    Ok(value) => value,
    Err(e) => {
      warn!("Unreadable {}.{} ({}), using default", table, column, e);
      fallback
    }
  }
}

fn string_list(value: Value) -> Vec<String> {
  match value {
    Value::Array(items) => items
      .into_iter()
      .filter_map(|v| v.as_str().map(String::from))
      .collect(),
    _ => Vec::new(),
  }
}

fn empty_object() -> Value {
  Value::Object(Default::default())
}

/// ---------------------------------------------------------------------------
/// Row Types
/// ---------------------------------------------------------------------------

#[derive(sqlx::FromRow)]
struct TaskRow {
  id: String,
  title: String,
  description: Option<String>,
  duration_minutes: i64,
  priority: String,
  recurrence_json: String,
  metadata_json: String,
  is_archived: bool,
  created_at: DateTime<Utc>,
  updated_at: DateTime<Utc>,
}

impl From<TaskRow> for TaskTemplate {
  fn from(row: TaskRow) -> Self {
    Self {
      recurrence: parse_json_column("task_templates", "recurrence_json", &row.recurrence_json, empty_object()),
      metadata: parse_json_column("task_templates", "metadata_json", &row.metadata_json, empty_object()),
      id: row.id,
      title: row.title,
      description: row.description,
      duration_minutes: row.duration_minutes,
      priority: row.priority,
      is_archived: row.is_archived,
      created_at: row.created_at,
      updated_at: row.updated_at,
    }
  }
}

#[derive(sqlx::FromRow)]
struct HistoryRow {
  id: String,
  task_id: String,
  completed_at: DateTime<Utc>,
  duration_minutes: i64,
  note: Option<String>,
  status: String,
  task_title: Option<String>,
}

impl From<HistoryRow> for TaskHistory {
  fn from(row: HistoryRow) -> Self {
    Self {
      id: row.id,
      task_id: row.task_id,
      completed_at: row.completed_at,
      duration_minutes: row.duration_minutes,
      note: row.note,
      status: row.status,
      task_title: row.task_title,
    }
  }
}

#[derive(sqlx::FromRow)]
struct ExerciseRow {
  id: String,
  name: String,
  equipment: Option<String>,
  primary_muscle: Option<String>,
  secondary_muscle: Option<String>,
  muscle_groups_json: String,
  rest_seconds: Option<i64>,
  target_notes: Option<String>,
  extra_metadata_json: String,
  is_active: bool,
}

impl From<ExerciseRow> for GymExercise {
  fn from(row: ExerciseRow) -> Self {
    Self {
      muscle_groups: string_list(parse_json_column(
        "gym_exercises",
        "muscle_groups_json",
        &row.muscle_groups_json,
        Value::Array(Vec::new()),
      )),
      extra_metadata: parse_json_column("gym_exercises", "extra_metadata_json", &row.extra_metadata_json, empty_object()),
      id: row.id,
      name: row.name,
      equipment: row.equipment,
      primary_muscle: row.primary_muscle,
      secondary_muscle: row.secondary_muscle,
      rest_seconds: row.rest_seconds,
      target_notes: row.target_notes,
      is_active: row.is_active,
    }
  }
}

#[derive(sqlx::FromRow)]
struct AssignmentRow {
  id: String,
  day_key: String,
  slot_id: String,
  slot_name: String,
  slot_subtitle: Option<String>,
  order_index: i64,
  default_exercise_id: Option<String>,
  selected_exercise_id: Option<String>,
  options_json: String,
  metadata_json: String,
}

impl From<AssignmentRow> for GymDayAssignment {
  fn from(row: AssignmentRow) -> Self {
    Self {
      options: string_list(parse_json_column(
        "gym_day_assignments",
        "options_json",
        &row.options_json,
        Value::Array(Vec::new()),
      )),
      metadata: parse_json_column("gym_day_assignments", "metadata_json", &row.metadata_json, empty_object()),
      id: row.id,
      day_key: row.day_key,
      slot_id: row.slot_id,
      slot_name: row.slot_name,
      slot_subtitle: row.slot_subtitle,
      order_index: row.order_index,
      default_exercise_id: row.default_exercise_id,
      selected_exercise_id: row.selected_exercise_id,
    }
  }
}

#[derive(sqlx::FromRow)]
struct ExerciseHistoryRow {
  id: String,
  exercise_id: String,
  recorded_at: DateTime<Utc>,
  day_key: Option<String>,
  slot_id: Option<String>,
  sets_json: String,
  notes: Option<String>,
}

impl From<ExerciseHistoryRow> for GymExerciseHistory {
  fn from(row: ExerciseHistoryRow) -> Self {
    Self {
      sets: parse_json_column("gym_exercise_history", "sets_json", &row.sets_json, Value::Array(Vec::new())),
      id: row.id,
      exercise_id: row.exercise_id,
      recorded_at: row.recorded_at,
      day_key: row.day_key,
      slot_id: row.slot_id,
      notes: row.notes,
    }
  }
}

const TASK_COLUMNS: &str = "id, title, description, duration_minutes, priority, recurrence_json, metadata_json, is_archived, created_at, updated_at";
const EXERCISE_COLUMNS: &str = "id, name, equipment, primary_muscle, secondary_muscle, muscle_groups_json, rest_seconds, target_notes, extra_metadata_json, is_active";
const ASSIGNMENT_COLUMNS: &str = "id, day_key, slot_id, slot_name, slot_subtitle, order_index, default_exercise_id, selected_exercise_id, options_json, metadata_json";
const EXERCISE_HISTORY_COLUMNS: &str = "id, exercise_id, recorded_at, day_key, slot_id, sets_json, notes";

/// ---------------------------------------------------------------------------
/// Tasks
/// ---------------------------------------------------------------------------

#[async_trait]
impl TaskRepository for SqliteStore {
  async fn list_tasks(&self, include_archived: bool) -> TrackerResult<Vec<TaskTemplate>> {
    let sql = format!(
      "SELECT {} FROM task_templates WHERE (? OR is_archived = 0) ORDER BY created_at DESC",
      TASK_COLUMNS
    );
    let rows = sqlx::query_as::<_, TaskRow>(&sql)
      .bind(include_archived)
      .fetch_all(&self.pool)
      .await?;
    Ok(rows.into_iter().map(TaskTemplate::from).collect())
  }

  async fn get_task(&self, id: &str) -> TrackerResult<Option<TaskTemplate>> {
    let sql = format!("SELECT {} FROM task_templates WHERE id = ?", TASK_COLUMNS);
    let row = sqlx::query_as::<_, TaskRow>(&sql)
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(row.map(TaskTemplate::from))
  }

  async fn insert_task(&self, task: &TaskTemplate) -> TrackerResult<()> {
    sqlx::query(
      r#"
      INSERT INTO task_templates (
        id, title, description, duration_minutes, priority,
        recurrence_json, metadata_json, is_archived, created_at, updated_at
      )
      VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
      "#,
    )
    .bind(&task.id)
    .bind(&task.title)
    .bind(&task.description)
    .bind(task.duration_minutes)
    .bind(&task.priority)
    .bind(task.recurrence.to_string())
    .bind(task.metadata.to_string())
    .bind(task.is_archived)
    .bind(task.created_at)
    .bind(task.updated_at)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  async fn update_task(&self, task: &TaskTemplate) -> TrackerResult<()> {
    sqlx::query(
      r#"
      UPDATE task_templates
      SET title = ?1,
          description = ?2,
          duration_minutes = ?3,
          priority = ?4,
          recurrence_json = ?5,
          metadata_json = ?6,
          is_archived = ?7,
          updated_at = ?8
      WHERE id = ?9
      "#,
    )
    .bind(&task.title)
    .bind(&task.description)
    .bind(task.duration_minutes)
    .bind(&task.priority)
    .bind(task.recurrence.to_string())
    .bind(task.metadata.to_string())
    .bind(task.is_archived)
    .bind(task.updated_at)
    .bind(&task.id)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  async fn delete_task(&self, id: &str) -> TrackerResult<bool> {
    let result = sqlx::query("DELETE FROM task_templates WHERE id = ?")
      .bind(id)
      .execute(&self.pool)
      .await?;
    Ok(result.rows_affected() > 0)
  }

  async fn list_history(&self, task_id: Option<&str>, limit: i64) -> TrackerResult<Vec<TaskHistory>> {
    let rows = sqlx::query_as::<_, HistoryRow>(
      r#"
      SELECT h.id, h.task_id, h.completed_at, h.duration_minutes, h.note, h.status,
             t.title AS task_title
      FROM task_history h
      JOIN task_templates t ON t.id = h.task_id
      WHERE (?1 IS NULL OR h.task_id = ?1)
      ORDER BY h.completed_at DESC
      LIMIT ?2
      "#,
    )
    .bind(task_id)
    .bind(limit)
    .fetch_all(&self.pool)
    .await?;
    Ok(rows.into_iter().map(TaskHistory::from).collect())
  }

  async fn insert_history(&self, entry: &TaskHistory) -> TrackerResult<()> {
    sqlx::query(
      r#"
      INSERT INTO task_history (id, task_id, completed_at, duration_minutes, note, status)
      VALUES (?1, ?2, ?3, ?4, ?5, ?6)
      "#,
    )
    .bind(&entry.id)
    .bind(&entry.task_id)
    .bind(entry.completed_at)
    .bind(entry.duration_minutes)
    .bind(&entry.note)
    .bind(&entry.status)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  async fn last_completed_at(&self, task_id: &str) -> TrackerResult<Option<DateTime<Utc>>> {
    let latest: Option<DateTime<Utc>> = sqlx::query_scalar(
      "SELECT completed_at FROM task_history WHERE task_id = ? ORDER BY completed_at DESC LIMIT 1",
    )
    .bind(task_id)
    .fetch_optional(&self.pool)
    .await?;
    Ok(latest)
  }
}

/// ---------------------------------------------------------------------------
/// Gym
/// ---------------------------------------------------------------------------

#[async_trait]
impl GymRepository for SqliteStore {
  async fn list_exercises(&self) -> TrackerResult<Vec<GymExercise>> {
    let sql = format!("SELECT {} FROM gym_exercises ORDER BY name", EXERCISE_COLUMNS);
    let rows = sqlx::query_as::<_, ExerciseRow>(&sql)
      .fetch_all(&self.pool)
      .await?;
    Ok(rows.into_iter().map(GymExercise::from).collect())
  }

  async fn get_exercise(&self, id: &str) -> TrackerResult<Option<GymExercise>> {
    let sql = format!("SELECT {} FROM gym_exercises WHERE id = ?", EXERCISE_COLUMNS);
    let row = sqlx::query_as::<_, ExerciseRow>(&sql)
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(row.map(GymExercise::from))
  }

  async fn insert_exercise(&self, exercise: &GymExercise) -> TrackerResult<()> {
    let now = Utc::now();
    sqlx::query(
      r#"
      INSERT INTO gym_exercises (
        id, name, equipment, primary_muscle, secondary_muscle, muscle_groups_json,
        rest_seconds, target_notes, extra_metadata_json, is_active, created_at, updated_at
      )
      VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
      "#,
    )
    .bind(&exercise.id)
    .bind(&exercise.name)
    .bind(&exercise.equipment)
    .bind(&exercise.primary_muscle)
    .bind(&exercise.secondary_muscle)
    .bind(serde_json::to_string(&exercise.muscle_groups)?)
    .bind(exercise.rest_seconds)
    .bind(&exercise.target_notes)
    .bind(exercise.extra_metadata.to_string())
    .bind(exercise.is_active)
    .bind(now)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  async fn update_exercise(&self, exercise: &GymExercise) -> TrackerResult<()> {
    sqlx::query(
      r#"
      UPDATE gym_exercises
      SET name = ?1, equipment = ?2, primary_muscle = ?3, secondary_muscle = ?4,
          muscle_groups_json = ?5, rest_seconds = ?6, target_notes = ?7,
          extra_metadata_json = ?8, is_active = ?9, updated_at = ?10
      WHERE id = ?11
      "#,
    )
    .bind(&exercise.name)
    .bind(&exercise.equipment)
    .bind(&exercise.primary_muscle)
    .bind(&exercise.secondary_muscle)
    .bind(serde_json::to_string(&exercise.muscle_groups)?)
    .bind(exercise.rest_seconds)
    .bind(&exercise.target_notes)
    .bind(exercise.extra_metadata.to_string())
    .bind(exercise.is_active)
    .bind(Utc::now())
    .bind(&exercise.id)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  async fn update_exercise_metadata(&self, id: &str, extra_metadata: &Value) -> TrackerResult<()> {
    sqlx::query("UPDATE gym_exercises SET extra_metadata_json = ?1, updated_at = ?2 WHERE id = ?3")
      .bind(extra_metadata.to_string())
      .bind(Utc::now())
      .bind(id)
      .execute(&self.pool)
      .await?;
    Ok(())
  }

  async fn delete_exercise(&self, id: &str) -> TrackerResult<bool> {
    let result = sqlx::query("DELETE FROM gym_exercises WHERE id = ?")
      .bind(id)
      .execute(&self.pool)
      .await?;
    Ok(result.rows_affected() > 0)
  }

  async fn list_assignments(&self) -> TrackerResult<Vec<GymDayAssignment>> {
    let sql = format!(
      "SELECT {} FROM gym_day_assignments ORDER BY day_key, order_index",
      ASSIGNMENT_COLUMNS
    );
    let rows = sqlx::query_as::<_, AssignmentRow>(&sql)
      .fetch_all(&self.pool)
      .await?;
    Ok(rows.into_iter().map(GymDayAssignment::from).collect())
  }

  async fn get_assignment(&self, id: &str) -> TrackerResult<Option<GymDayAssignment>> {
    let sql = format!("SELECT {} FROM gym_day_assignments WHERE id = ?", ASSIGNMENT_COLUMNS);
    let row = sqlx::query_as::<_, AssignmentRow>(&sql)
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(row.map(GymDayAssignment::from))
  }

  async fn insert_assignment(&self, assignment: &GymDayAssignment) -> TrackerResult<()> {
    sqlx::query(
      r#"
      INSERT INTO gym_day_assignments (
        id, day_key, slot_id, slot_name, slot_subtitle, order_index,
        default_exercise_id, selected_exercise_id, options_json, metadata_json, updated_at
      )
      VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
      "#,
    )
    .bind(&assignment.id)
    .bind(&assignment.day_key)
    .bind(&assignment.slot_id)
    .bind(&assignment.slot_name)
    .bind(&assignment.slot_subtitle)
    .bind(assignment.order_index)
    .bind(&assignment.default_exercise_id)
    .bind(&assignment.selected_exercise_id)
    .bind(serde_json::to_string(&assignment.options)?)
    .bind(assignment.metadata.to_string())
    .bind(Utc::now())
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  async fn set_selected_exercise(&self, assignment_id: &str, exercise_id: Option<&str>) -> TrackerResult<()> {
    sqlx::query("UPDATE gym_day_assignments SET selected_exercise_id = ?1, updated_at = ?2 WHERE id = ?3")
      .bind(exercise_id)
      .bind(Utc::now())
      .bind(assignment_id)
      .execute(&self.pool)
      .await?;
    Ok(())
  }

  async fn list_exercise_history(&self, exercise_id: &str) -> TrackerResult<Vec<GymExerciseHistory>> {
    let sql = format!(
      "SELECT {} FROM gym_exercise_history WHERE exercise_id = ? ORDER BY recorded_at DESC",
      EXERCISE_HISTORY_COLUMNS
    );
    let rows = sqlx::query_as::<_, ExerciseHistoryRow>(&sql)
      .bind(exercise_id)
      .fetch_all(&self.pool)
      .await?;
    Ok(rows.into_iter().map(GymExerciseHistory::from).collect())
  }

  async fn latest_exercise_history(&self, exercise_id: &str) -> TrackerResult<Option<GymExerciseHistory>> {
    let sql = format!(
      "SELECT {} FROM gym_exercise_history WHERE exercise_id = ? ORDER BY recorded_at DESC LIMIT 1",
      EXERCISE_HISTORY_COLUMNS
    );
    let row = sqlx::query_as::<_, ExerciseHistoryRow>(&sql)
      .bind(exercise_id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(row.map(GymExerciseHistory::from))
  }

  async fn get_exercise_history(&self, id: &str) -> TrackerResult<Option<GymExerciseHistory>> {
    let sql = format!("SELECT {} FROM gym_exercise_history WHERE id = ?", EXERCISE_HISTORY_COLUMNS);
    let row = sqlx::query_as::<_, ExerciseHistoryRow>(&sql)
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(row.map(GymExerciseHistory::from))
  }

  async fn insert_exercise_history(&self, entry: &GymExerciseHistory) -> TrackerResult<()> {
    sqlx::query(
      r#"
      INSERT INTO gym_exercise_history (
        id, exercise_id, recorded_at, day_key, slot_id, sets_json, notes, created_at
      )
      VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
      "#,
    )
    .bind(&entry.id)
    .bind(&entry.exercise_id)
    .bind(entry.recorded_at)
    .bind(&entry.day_key)
    .bind(&entry.slot_id)
    .bind(entry.sets.to_string())
    .bind(&entry.notes)
    .bind(Utc::now())
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  async fn delete_exercise_history(&self, id: &str) -> TrackerResult<bool> {
    let result = sqlx::query("DELETE FROM gym_exercise_history WHERE id = ?")
      .bind(id)
      .execute(&self.pool)
      .await?;
    Ok(result.rows_affected() > 0)
  }
}

/// ---------------------------------------------------------------------------
/// Settings
/// ---------------------------------------------------------------------------

#[async_trait]
impl SettingsRepository for SqliteStore {
  async fn get_setting(&self, key: &str) -> TrackerResult<Option<String>> {
    let value: Option<Option<String>> = sqlx::query_scalar("SELECT value FROM app_settings WHERE key = ?")
      .bind(key)
      .fetch_optional(&self.pool)
      .await?;
    Ok(value.flatten())
  }

  async fn set_setting(&self, key: &str, value: &str) -> TrackerResult<()> {
    sqlx::query(
      r#"
      INSERT INTO app_settings (key, value, updated_at)
      VALUES (?1, ?2, ?3)
      ON CONFLICT(key) DO UPDATE SET
        value = excluded.value,
        updated_at = excluded.updated_at
      "#,
    )
    .bind(key)
    .bind(value)
    .bind(Utc::now())
    .execute(&self.pool)
    .await?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_utils::{mock_task, seed_test_assignment, seed_test_exercises, setup_test_db, teardown_test_db};
  use serde_json::json;

  #[tokio::test]
  async fn test_list_tasks_hides_archived_unless_asked() {
    // Arrange
    let pool = setup_test_db().await;
    let store = SqliteStore::new(pool.clone());
    let active = mock_task("t-1", "Dishes", json!({"mode": "repeat"}));
    let mut archived = mock_task("t-2", "Old", json!({}));
    archived.is_archived = true;
    store.insert_task(&active).await.expect("Should insert");
    store.insert_task(&archived).await.expect("Should insert");

    // Act
    let visible = store.list_tasks(false).await.expect("Should list");
    let everything = store.list_tasks(true).await.expect("Should list");

    // Assert
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].id, "t-1");
    assert_eq!(visible[0].recurrence, json!({"mode": "repeat"}));
    assert_eq!(everything.len(), 2);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_malformed_json_columns_read_as_defaults() {
    let pool = setup_test_db().await;
    let store = SqliteStore::new(pool.clone());
    store
      .insert_task(&mock_task("t-bad", "Broken", json!({})))
      .await
      .expect("Should insert");

    sqlx::query("UPDATE task_templates SET recurrence_json = 'not json', metadata_json = '[1,' WHERE id = 't-bad'")
      .execute(&pool)
      .await
      .expect("Should corrupt row");

    let task = store
      .get_task("t-bad")
      .await
      .expect("Should read")
      .expect("Should exist");
    assert_eq!(task.recurrence, json!({}));
    assert_eq!(task.metadata, json!({}));
    assert_eq!(task.recurrence().start_after_days(), 0);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_assignments_are_ordered_by_day_then_position() {
    let pool = setup_test_db().await;
    let store = SqliteStore::new(pool.clone());
    seed_test_exercises(&pool).await;

    let mut second = GymDayAssignment {
      id: "a-2".to_string(),
      day_key: "monday".to_string(),
      slot_id: "accessory".to_string(),
      slot_name: "Accessory".to_string(),
      slot_subtitle: None,
      order_index: 1,
      default_exercise_id: Some("ex-rdl".to_string()),
      selected_exercise_id: None,
      options: vec!["ex-rdl".to_string(), "ex-lunge".to_string()],
      metadata: json!({"muscles": ["hamstrings"]}),
    };
    store.insert_assignment(&second).await.expect("Should insert");
    second.id = "a-3".to_string();
    second.day_key = "friday".to_string();
    store.insert_assignment(&second).await.expect("Should insert");
    seed_test_assignment(&pool, "a-1", Some("ex-squat"), &[], json!({})).await;

    let listed = store.list_assignments().await.expect("Should list");
    let ids: Vec<&str> = listed.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["a-3", "a-1", "a-2"]);
    assert_eq!(listed[2].options, vec!["ex-rdl".to_string(), "ex-lunge".to_string()]);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_settings_upsert() {
    let pool = setup_test_db().await;
    let store = SqliteStore::new(pool.clone());

    assert!(store.get_setting("k").await.expect("Should read").is_none());
    store.set_setting("k", "v1").await.expect("Should write");
    store.set_setting("k", "v2").await.expect("Should write");
    assert_eq!(store.get_setting("k").await.expect("Should read").as_deref(), Some("v2"));

    teardown_test_db(pool).await;
  }
}
