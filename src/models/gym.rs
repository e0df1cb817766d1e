use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GymExercise {
  pub id: String,
  pub name: String,
  pub equipment: Option<String>,
  pub primary_muscle: Option<String>,
  pub secondary_muscle: Option<String>,
  pub muscle_groups: Vec<String>,
  pub rest_seconds: Option<i64>,
  pub target_notes: Option<String>,
  /// Free-form extras; `last_performed_on` is cached here
  pub extra_metadata: Value,
  pub is_active: bool,
}

impl GymExercise {
  pub fn last_performed_on(&self) -> Option<DateTime<Utc>> {
    self
      .extra_metadata
      .get("last_performed_on")
      .and_then(Value::as_str)
      .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
      .map(|dt| dt.with_timezone(&Utc))
  }
}

/// Exercise patch. Absent fields are left untouched and `extra_metadata`
/// is merged key by key into the stored object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GymExerciseUpdate {
  pub name: Option<String>,
  pub equipment: Option<String>,
  pub primary_muscle: Option<String>,
  pub secondary_muscle: Option<String>,
  pub muscle_groups: Option<Vec<String>>,
  pub rest_seconds: Option<i64>,
  pub target_notes: Option<String>,
  pub extra_metadata: Option<Value>,
  pub is_active: Option<bool>,
}

/// An exercise as shown to callers, with its newest logged session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GymExerciseRead {
  #[serde(flatten)]
  pub exercise: GymExercise,
  pub last_session: Option<Value>,
  pub last_performed_on: Option<DateTime<Utc>>,
}

impl GymExerciseRead {
  /// Prefer the newest session; fall back to the cached metadata timestamp
  pub fn project(exercise: GymExercise, latest: Option<&GymExerciseHistory>) -> Self {
    match latest {
      Some(entry) => Self {
        last_session: Some(entry.sets.clone()),
        last_performed_on: Some(entry.recorded_at),
        exercise,
      },
      None => Self {
        last_session: None,
        last_performed_on: exercise.last_performed_on(),
        exercise,
      },
    }
  }
}

/// One (day, slot) position in the weekly template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GymDayAssignment {
  pub id: String,
  pub day_key: String,
  pub slot_id: String,
  pub slot_name: String,
  pub slot_subtitle: Option<String>,
  pub order_index: i64,
  pub default_exercise_id: Option<String>,
  pub selected_exercise_id: Option<String>,
  /// Explicit allow-list of exercise ids, in display order
  pub options: Vec<String>,
  pub metadata: Value,
}

impl GymDayAssignment {
  /// The exercise currently shown for this slot
  pub fn current_exercise_id(&self) -> Option<&str> {
    self
      .selected_exercise_id
      .as_deref()
      .or(self.default_exercise_id.as_deref())
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GymExerciseHistory {
  pub id: String,
  pub exercise_id: String,
  pub recorded_at: DateTime<Utc>,
  pub day_key: Option<String>,
  pub slot_id: Option<String>,
  pub sets: Value,
  pub notes: Option<String>,
}

/// For logging a session (without id); `recorded_at` defaults to now
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGymExerciseHistory {
  pub exercise_id: String,
  pub recorded_at: Option<DateTime<Utc>>,
  pub day_key: Option<String>,
  pub slot_id: Option<String>,
  #[serde(default = "empty_sets")]
  pub sets: Value,
  pub notes: Option<String>,
}

fn empty_sets() -> Value {
  Value::Array(Vec::new())
}
