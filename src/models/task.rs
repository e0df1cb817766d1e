use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::recurrence::Recurrence;

/// A free-form time window. Opaque to the classifier; only echoed into the
/// rendered prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
  pub day: Option<String>,
  pub start_time: Option<String>,
  pub end_time: Option<String>,
  pub kind: Option<String>,
  pub note: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Importance {
  Must,
  DoIfPossible,
  Flex,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskTemplate {
  pub id: String,
  pub title: String,
  pub description: Option<String>,
  pub duration_minutes: i64,
  pub priority: String,
  /// Raw stored recurrence; see `recurrence()` for the canonical form
  pub recurrence: Value,
  pub metadata: Value,
  pub is_archived: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl TaskTemplate {
  pub fn recurrence(&self) -> Recurrence {
    Recurrence::from_task_json(&self.recurrence, &self.metadata)
  }

  pub fn meta_str(&self, key: &str) -> Option<String> {
    self
      .metadata
      .get(key)
      .and_then(Value::as_str)
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .map(String::from)
  }

  /// Daypart hint such as "mornings"
  pub fn preferred_window(&self) -> Option<String> {
    self
      .meta_str("window")
      .or_else(|| self.meta_str("preferred_window"))
  }

  /// Time windows stored under `key`; malformed entries are dropped
  pub fn meta_windows(&self, key: &str) -> Vec<TimeWindow> {
    match self.metadata.get(key) {
      Some(Value::Array(items)) => items
        .iter()
        .filter_map(|item| serde_json::from_value(item.clone()).ok())
        .collect(),
      _ => Vec::new(),
    }
  }
}

/// Descriptive fields accepted at the top level of create/patch payloads
/// and folded into task metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskDescriptors {
  pub frequency_min_days: Option<u32>,
  pub frequency_max_days: Option<u32>,
  pub preferred_windows: Option<Vec<TimeWindow>>,
  pub busy_windows: Option<Vec<TimeWindow>>,
  pub importance: Option<Importance>,
  pub category: Option<String>,
}

impl TaskDescriptors {
  /// Overlay every present field onto `base`
  pub fn merge_into(&self, base: &Value) -> Result<Value, serde_json::Error> {
    let mut meta: Map<String, Value> = match base {
      Value::Object(map) => map.clone(),
      _ => Map::new(),
    };
    if let Some(v) = self.frequency_min_days {
      meta.insert("frequency_min_days".into(), v.into());
    }
    if let Some(v) = self.frequency_max_days {
      meta.insert("frequency_max_days".into(), v.into());
    }
    if let Some(v) = &self.preferred_windows {
      meta.insert("preferred_windows".into(), serde_json::to_value(v)?);
    }
    if let Some(v) = &self.busy_windows {
      meta.insert("busy_windows".into(), serde_json::to_value(v)?);
    }
    if let Some(v) = self.importance {
      meta.insert("importance".into(), serde_json::to_value(v)?);
    }
    if let Some(v) = &self.category {
      meta.insert("category".into(), Value::String(v.clone()));
    }
    Ok(Value::Object(meta))
  }
}

/// Create/patch payload. On create, absent fields take their defaults; on
/// patch, absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskTemplateInput {
  pub title: Option<String>,
  pub description: Option<String>,
  pub duration_minutes: Option<i64>,
  pub priority: Option<String>,
  pub recurrence: Option<Value>,
  pub metadata: Option<Value>,
  pub is_archived: Option<bool>,
  #[serde(flatten)]
  pub descriptors: TaskDescriptors,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskHistory {
  pub id: String,
  pub task_id: String,
  pub completed_at: DateTime<Utc>,
  pub duration_minutes: i64,
  pub note: Option<String>,
  pub status: String,
  /// Filled in by listings that join the task
  pub task_title: Option<String>,
}

/// For recording a completion (without id)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTaskHistory {
  pub completed_at: DateTime<Utc>,
  pub duration_minutes: i64,
  pub note: Option<String>,
  #[serde(default = "default_history_status")]
  pub status: String,
}

fn default_history_status() -> String {
  "completed".to_string()
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn task_with_meta(metadata: Value) -> TaskTemplate {
    TaskTemplate {
      id: "t1".into(),
      title: "Laundry".into(),
      description: None,
      duration_minutes: 45,
      priority: "medium".into(),
      recurrence: json!({}),
      metadata,
      is_archived: false,
      created_at: Utc::now(),
      updated_at: Utc::now(),
    }
  }

  #[test]
  fn test_preferred_window_prefers_short_key() {
    let task = task_with_meta(json!({"window": "mornings", "preferred_window": "evenings"}));
    assert_eq!(task.preferred_window().as_deref(), Some("mornings"));

    let task = task_with_meta(json!({"preferred_window": " evenings "}));
    assert_eq!(task.preferred_window().as_deref(), Some("evenings"));

    let task = task_with_meta(json!({"window": ""}));
    assert_eq!(task.preferred_window(), None);
  }

  #[test]
  fn test_meta_windows_skips_malformed_entries() {
    let task = task_with_meta(json!({
      "preferred_windows": [
        {"day": "sat", "start_time": "08:00", "end_time": "10:00"},
        "not a window",
      ]
    }));
    let windows = task.meta_windows("preferred_windows");
    assert_eq!(windows.len(), 1);
    assert_eq!(windows[0].day.as_deref(), Some("sat"));
    assert!(task.meta_windows("busy_windows").is_empty());
  }

  #[test]
  fn test_descriptors_merge_keeps_existing_keys() {
    let descriptors = TaskDescriptors {
      importance: Some(Importance::DoIfPossible),
      category: Some("home".into()),
      ..Default::default()
    };
    let merged = descriptors
      .merge_into(&json!({"window": "mornings", "category": "old"}))
      .unwrap();
    assert_eq!(merged["window"], "mornings");
    assert_eq!(merged["category"], "home");
    assert_eq!(merged["importance"], "do_if_possible");
  }

  #[test]
  fn test_input_accepts_flat_descriptors() {
    let input: TaskTemplateInput = serde_json::from_value(json!({
      "title": "Water plants",
      "frequency_min_days": 2,
      "busy_windows": [{"day": "mon"}]
    }))
    .unwrap();
    assert_eq!(input.title.as_deref(), Some("Water plants"));
    assert_eq!(input.descriptors.frequency_min_days, Some(2));
    assert_eq!(input.descriptors.busy_windows.as_ref().map(Vec::len), Some(1));
  }
}
