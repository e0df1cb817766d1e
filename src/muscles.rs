//! Muscle taxonomy
//!
//! Exercise libraries label muscles inconsistently ("Rear Delts", "pecs",
//! "Quadriceps"). Substitution compares exercises on a small canonical
//! vocabulary instead.
//!
//! Matching is a lower-case substring search over an ordered table. The
//! first canonical entry with a matching token wins, so order matters when
//! tokens overlap.

use serde_json::Value;
use std::collections::BTreeSet;

use crate::models::GymExercise;

/// (canonical, synonym tokens), checked top to bottom
pub const MUSCLE_SYNONYMS: &[(&str, &[&str])] = &[
  ("shoulders", &["shoulder", "delt"]),
  ("chest", &["chest", "pec"]),
  ("quads", &["quad"]),
  ("hamstrings", &["hamstring", "ham"]),
  ("glutes", &["glute", "butt"]),
  ("abs", &["abs", "abdom", "core", "oblique"]),
  ("lats", &["lat"]),
  ("traps", &["trap"]),
  ("biceps", &["bicep", "bi"]),
  ("triceps", &["tricep", "tri"]),
  ("calves", &["calf", "calves", "soleus", "gastroc"]),
  ("forearms", &["forearm", "grip", "wrist"]),
  ("upper back", &["upper back", "rhomboid", "mid back"]),
  ("lower back", &["lower back", "erector", "lumbar"]),
  ("full body", &["full body", "full-body", "total body"]),
];

/// Map a free-text label to its canonical muscle, or return the trimmed
/// lower-cased label when nothing matches
pub fn normalize_muscle(label: &str) -> String {
  let lowered = label.trim().to_lowercase();
  if lowered.is_empty() {
    return String::new();
  }
  MUSCLE_SYNONYMS
    .iter()
    .find(|(_, tokens)| tokens.iter().any(|token| lowered.contains(token)))
    .map(|(canonical, _)| canonical.to_string())
    .unwrap_or(lowered)
}

fn normalize_opt(label: Option<&str>) -> String {
  label.map(normalize_muscle).unwrap_or_default()
}

/// Canonical primary muscle, "" when unset
pub fn primary_of(exercise: &GymExercise) -> String {
  normalize_opt(exercise.primary_muscle.as_deref())
}

/// Canonical secondary muscle, "" when unset
pub fn secondary_of(exercise: &GymExercise) -> String {
  normalize_opt(exercise.secondary_muscle.as_deref())
}

/// Every canonical muscle an exercise touches
pub fn exercise_tokens(exercise: &GymExercise) -> BTreeSet<String> {
  let labels = exercise
    .primary_muscle
    .iter()
    .chain(exercise.secondary_muscle.iter())
    .chain(exercise.muscle_groups.iter());
  collect_tokens(labels.map(String::as_str))
}

/// Muscles hinted by a slot's metadata `muscles` entry: object keys, or the
/// string values of a list. Anything else hints nothing.
pub fn slot_tokens(metadata: &Value) -> BTreeSet<String> {
  match metadata.get("muscles") {
    Some(Value::Object(map)) => collect_tokens(map.keys().map(String::as_str)),
    Some(Value::Array(items)) => collect_tokens(items.iter().filter_map(Value::as_str)),
    _ => BTreeSet::new(),
  }
}

fn collect_tokens<'a>(labels: impl Iterator<Item = &'a str>) -> BTreeSet<String> {
  labels
    .map(normalize_muscle)
    .filter(|token| !token.is_empty())
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn exercise(primary: Option<&str>, secondary: Option<&str>, groups: &[&str]) -> GymExercise {
    GymExercise {
      id: "x".into(),
      name: "X".into(),
      equipment: None,
      primary_muscle: primary.map(String::from),
      secondary_muscle: secondary.map(String::from),
      muscle_groups: groups.iter().map(|g| g.to_string()).collect(),
      rest_seconds: None,
      target_notes: None,
      extra_metadata: json!({}),
      is_active: true,
    }
  }

  #[test]
  fn test_normalize_known_labels() {
    assert_eq!(normalize_muscle("Rear Delts"), "shoulders");
    assert_eq!(normalize_muscle("Pecs"), "chest");
    assert_eq!(normalize_muscle("  Quadriceps "), "quads");
    assert_eq!(normalize_muscle("Lats"), "lats");
    assert_eq!(normalize_muscle("Gastrocnemius"), "calves");
    assert_eq!(normalize_muscle("Lower Back"), "lower back");
  }

  #[test]
  fn test_normalize_blank_and_unknown() {
    assert_eq!(normalize_muscle(""), "");
    assert_eq!(normalize_muscle("   "), "");
    assert_eq!(normalize_muscle("unknown-muscle-xyz"), "unknown-muscle-xyz");
    assert_eq!(normalize_muscle(" Neck "), "neck");
  }

  #[test]
  fn test_table_order_breaks_ties() {
    // contains both "bi" and "tri"; biceps is listed first
    assert_eq!(normalize_muscle("bi/tri superset"), "biceps");
    // "delt" beats the later "lat" entry
    assert_eq!(normalize_muscle("lateral delt"), "shoulders");
  }

  #[test]
  fn test_exercise_tokens_are_deduplicated() {
    let ex = exercise(Some("Quadriceps"), Some("Glutes"), &["quads", "Glute Max", ""]);
    let tokens = exercise_tokens(&ex);
    assert_eq!(
      tokens.into_iter().collect::<Vec<_>>(),
      vec!["glutes".to_string(), "quads".to_string()]
    );
  }

  #[test]
  fn test_exercise_without_muscles_has_no_tokens() {
    assert!(exercise_tokens(&exercise(None, None, &[])).is_empty());
    assert_eq!(primary_of(&exercise(None, None, &[])), "");
  }

  #[test]
  fn test_slot_tokens_from_map_and_list() {
    let from_map = slot_tokens(&json!({"muscles": {"Chest": 3, "Front Delts": 2}}));
    assert!(from_map.contains("chest"));
    assert!(from_map.contains("shoulders"));

    let from_list = slot_tokens(&json!({"muscles": ["Hamstrings", 5, "glutes"]}));
    assert_eq!(from_list.len(), 2);
    assert!(from_list.contains("hamstrings"));

    assert!(slot_tokens(&json!({"muscles": "legs"})).is_empty());
    assert!(slot_tokens(&json!({})).is_empty());
  }
}
