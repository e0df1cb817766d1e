//! Gym commands: exercise library, slot rotation and selection, session history

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::AppState;
use crate::error::{TrackerError, TrackerResult};
use crate::models::{
  GymDayAssignment, GymExercise, GymExerciseHistory, GymExerciseRead, GymExerciseUpdate, NewGymExerciseHistory,
};
use crate::store::GymRepository;
use crate::substitution::{check_selection, next_substitute, slot_substitutes, ScoredExercise};

/// ---------------------------------------------------------------------------
/// Lookups
/// ---------------------------------------------------------------------------

async fn load_assignment(state: &AppState, assignment_id: &str) -> TrackerResult<GymDayAssignment> {
  state
    .store
    .get_assignment(assignment_id)
    .await?
    .ok_or_else(|| TrackerError::not_found("Assignment", assignment_id))
}

async fn load_exercise(state: &AppState, exercise_id: &str) -> TrackerResult<GymExercise> {
  state
    .store
    .get_exercise(exercise_id)
    .await?
    .ok_or_else(|| TrackerError::not_found("Exercise", exercise_id))
}

/// ---------------------------------------------------------------------------
/// Exercise Library
/// ---------------------------------------------------------------------------

/// Every exercise by name, each with its newest session
pub async fn list_exercises(state: &AppState) -> TrackerResult<Vec<GymExerciseRead>> {
  let exercises = state.store.list_exercises().await?;
  let mut listed = Vec::with_capacity(exercises.len());
  for exercise in exercises {
    let latest = state.store.latest_exercise_history(&exercise.id).await?;
    listed.push(GymExerciseRead::project(exercise, latest.as_ref()));
  }
  Ok(listed)
}

pub async fn get_exercise(state: &AppState, exercise_id: &str) -> TrackerResult<GymExerciseRead> {
  let exercise = load_exercise(state, exercise_id).await?;
  let latest = state.store.latest_exercise_history(exercise_id).await?;
  Ok(GymExerciseRead::project(exercise, latest.as_ref()))
}

/// Add an exercise. An empty id gets a generated one.
pub async fn create_exercise(state: &AppState, mut exercise: GymExercise) -> TrackerResult<GymExercise> {
  if exercise.id.trim().is_empty() {
    exercise.id = Uuid::new_v4().to_string();
  }
  if exercise.name.trim().is_empty() {
    return Err(TrackerError::InvalidOperation("Exercise name is required".to_string()));
  }
  if state.store.get_exercise(&exercise.id).await?.is_some() {
    return Err(TrackerError::InvalidOperation(format!(
      "Exercise already exists: {}",
      exercise.id
    )));
  }
  if !exercise.extra_metadata.is_object() {
    exercise.extra_metadata = Value::Object(Map::new());
  }

  state.store.insert_exercise(&exercise).await?;
  info!("Created exercise {} ({})", exercise.id, exercise.name);
  Ok(exercise)
}

/// Patch an exercise. `extra_metadata` keys are merged, not replaced.
pub async fn update_exercise(
  state: &AppState,
  exercise_id: &str,
  update: GymExerciseUpdate,
) -> TrackerResult<GymExerciseRead> {
  let mut exercise = load_exercise(state, exercise_id).await?;

  if let Some(name) = update.name {
    let name = name.trim();
    if name.is_empty() {
      return Err(TrackerError::InvalidOperation("Exercise name is required".to_string()));
    }
    exercise.name = name.to_string();
  }
  if let Some(extra) = update.extra_metadata {
    let Value::Object(extra) = extra else {
      return Err(TrackerError::InvalidOperation(
        "extra_metadata must be a JSON object".to_string(),
      ));
    };
    let mut merged = match exercise.extra_metadata {
      Value::Object(map) => map,
      _ => Map::new(),
    };
    merged.extend(extra);
    exercise.extra_metadata = Value::Object(merged);
  }
  if update.equipment.is_some() {
    exercise.equipment = update.equipment;
  }
  if update.primary_muscle.is_some() {
    exercise.primary_muscle = update.primary_muscle;
  }
  if update.secondary_muscle.is_some() {
    exercise.secondary_muscle = update.secondary_muscle;
  }
  if let Some(groups) = update.muscle_groups {
    exercise.muscle_groups = groups;
  }
  if update.rest_seconds.is_some() {
    exercise.rest_seconds = update.rest_seconds;
  }
  if update.target_notes.is_some() {
    exercise.target_notes = update.target_notes;
  }
  if let Some(active) = update.is_active {
    exercise.is_active = active;
  }

  state.store.update_exercise(&exercise).await?;
  debug!("Updated exercise {}", exercise.id);

  let latest = state.store.latest_exercise_history(exercise_id).await?;
  Ok(GymExerciseRead::project(exercise, latest.as_ref()))
}

/// Remove an exercise with its sessions. Slots that used it lose the reference.
pub async fn delete_exercise(state: &AppState, exercise_id: &str) -> TrackerResult<()> {
  if !state.store.delete_exercise(exercise_id).await? {
    return Err(TrackerError::not_found("Exercise", exercise_id));
  }
  info!("Deleted exercise {}", exercise_id);
  Ok(())
}

/// ---------------------------------------------------------------------------
/// Slot Assignments
/// ---------------------------------------------------------------------------

pub async fn list_assignments(state: &AppState) -> TrackerResult<Vec<GymDayAssignment>> {
  state.store.list_assignments().await
}

/// Ranked substitutes for a slot, option-list extras last
pub async fn list_substitutes(state: &AppState, assignment_id: &str) -> TrackerResult<Vec<ScoredExercise>> {
  let assignment = load_assignment(state, assignment_id).await?;
  let pool = state.store.list_exercises().await?;
  slot_substitutes(&assignment, &pool)
}

/// Rotate a slot to its next substitute and persist the selection
pub async fn substitute_assignment(state: &AppState, assignment_id: &str) -> TrackerResult<GymDayAssignment> {
  let mut assignment = load_assignment(state, assignment_id).await?;
  let pool = state.store.list_exercises().await?;

  let next = next_substitute(&assignment, &pool)?;
  state.store.set_selected_exercise(&assignment.id, Some(next.as_str())).await?;

  info!(
    "Rotated slot {} ({}) from {} to {}",
    assignment.slot_id,
    assignment.id,
    assignment.current_exercise_id().unwrap_or("-"),
    next
  );
  assignment.selected_exercise_id = Some(next);
  Ok(assignment)
}

/// Explicitly choose the exercise shown in a slot
pub async fn select_exercise(
  state: &AppState,
  assignment_id: &str,
  exercise_id: &str,
) -> TrackerResult<GymDayAssignment> {
  let mut assignment = load_assignment(state, assignment_id).await?;
  let exercise = load_exercise(state, exercise_id).await?;

  check_selection(&assignment, &exercise, &state.config.gym)?;

  state.store.set_selected_exercise(&assignment.id, Some(exercise.id.as_str())).await?;
  debug!("Selected {} for slot {}", exercise.id, assignment.slot_id);
  assignment.selected_exercise_id = Some(exercise.id);
  Ok(assignment)
}

/// Clear the selection so the slot shows its default again
pub async fn reset_assignment(state: &AppState, assignment_id: &str) -> TrackerResult<GymDayAssignment> {
  let mut assignment = load_assignment(state, assignment_id).await?;
  state.store.set_selected_exercise(&assignment.id, None).await?;
  debug!("Reset slot {} to its default", assignment.slot_id);
  assignment.selected_exercise_id = None;
  Ok(assignment)
}

/// ---------------------------------------------------------------------------
/// Session History
/// ---------------------------------------------------------------------------

pub async fn list_exercise_history(state: &AppState, exercise_id: &str) -> TrackerResult<Vec<GymExerciseHistory>> {
  load_exercise(state, exercise_id).await?;
  state.store.list_exercise_history(exercise_id).await
}

/// Cache the newest session time on the exercise, or null without sessions
async fn refresh_last_performed(state: &AppState, exercise: GymExercise) -> TrackerResult<()> {
  let latest = state
    .store
    .latest_exercise_history(&exercise.id)
    .await?
    .map(|entry| Value::String(entry.recorded_at.to_rfc3339()))
    .unwrap_or(Value::Null);

  let mut meta = match exercise.extra_metadata {
    Value::Object(map) => map,
    _ => Map::new(),
  };
  meta.insert("last_performed_on".to_string(), latest);

  state
    .store
    .update_exercise_metadata(&exercise.id, &Value::Object(meta))
    .await
}

pub async fn record_exercise_history(
  state: &AppState,
  payload: NewGymExerciseHistory,
) -> TrackerResult<GymExerciseHistory> {
  let exercise = load_exercise(state, &payload.exercise_id).await?;

  let entry = GymExerciseHistory {
    id: Uuid::new_v4().to_string(),
    exercise_id: exercise.id.clone(),
    recorded_at: payload.recorded_at.unwrap_or_else(Utc::now),
    day_key: payload.day_key,
    slot_id: payload.slot_id,
    sets: payload.sets,
    notes: payload.notes,
  };

  state.store.insert_exercise_history(&entry).await?;
  refresh_last_performed(state, exercise).await?;

  debug!("Recorded session {} for exercise {}", entry.id, entry.exercise_id);
  Ok(entry)
}

pub async fn delete_exercise_history(state: &AppState, history_id: &str) -> TrackerResult<()> {
  let entry = state
    .store
    .get_exercise_history(history_id)
    .await?
    .ok_or_else(|| TrackerError::not_found("History entry", history_id))?;

  state.store.delete_exercise_history(history_id).await?;

  if let Some(exercise) = state.store.get_exercise(&entry.exercise_id).await? {
    refresh_last_performed(state, exercise).await?;
  }
  debug!("Deleted session {} for exercise {}", history_id, entry.exercise_id);
  Ok(())
}
