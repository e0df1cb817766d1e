//! Weekly schedule preview
//!
//! Classifies every active task against the target week and renders a
//! plain-text brief for an external planner. Nothing here decides concrete
//! times; the prompt only carries the computed constraints.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

use crate::classifier::{classify_week, Classification, WeekRange};
use crate::config::ScheduleSettings;
use crate::error::TrackerResult;
use crate::models::{TaskTemplate, TimeWindow};
use crate::recurrence::RecurrenceMode;

/// ---------------------------------------------------------------------------
/// Request / Response Types
/// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleRequest {
  pub week_start: Option<NaiveDate>,
  pub week_end: Option<NaiveDate>,
  #[serde(default)]
  pub user_busy: Vec<TimeWindow>,
  #[serde(default)]
  pub user_preferences: Vec<TimeWindow>,
}

/// One task projected onto one week
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTaskCandidate {
  pub task_id: String,
  pub title: String,
  pub duration_minutes: i64,
  pub priority: String,
  pub classification: Classification,
  pub mode: RecurrenceMode,
  /// Allowed window used for classification
  pub window_start: NaiveDate,
  pub window_end: NaiveDate,
  pub start_after_days: i64,
  pub end_before_days: i64,
  pub last_completed_on: Option<NaiveDate>,
  pub expected_dates: Vec<NaiveDate>,
  pub description: Option<String>,
  pub preferred_window: Option<String>,
  pub preferred_windows: Vec<TimeWindow>,
  pub busy_windows: Vec<TimeWindow>,
  pub importance: Option<String>,
  pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulePreview {
  pub week_start: NaiveDate,
  pub week_end: NaiveDate,
  pub prompt: String,
  /// User-edited preamble stored in settings, if any
  pub instructions: Option<String>,
  pub tasks: Vec<ScheduledTaskCandidate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleCommitRequest {
  pub week_start: NaiveDate,
  pub week_end: NaiveDate,
  pub plan: Vec<ScheduledTaskCandidate>,
  pub ai_response: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleCommitResponse {
  pub message: String,
  pub stored: bool,
  pub plan: Vec<ScheduledTaskCandidate>,
  pub ai_response: Option<String>,
}

/// ---------------------------------------------------------------------------
/// Candidates
/// ---------------------------------------------------------------------------

pub fn build_candidate(
  task: &TaskTemplate,
  last_completed_on: Option<NaiveDate>,
  week: &WeekRange,
  today: NaiveDate,
) -> ScheduledTaskCandidate {
  let recurrence = task.recurrence();
  if recurrence.is_legacy() {
    warn!(
      task_id = %task.id,
      "Task uses legacy gap recurrence; translated to {}",
      recurrence.to_json()
    );
  }

  let result = classify_week(&recurrence, last_completed_on, week, today);

  ScheduledTaskCandidate {
    task_id: task.id.clone(),
    title: task.title.clone(),
    duration_minutes: task.duration_minutes,
    priority: task.priority.clone(),
    classification: result.classification,
    mode: recurrence.mode,
    window_start: result.window.earliest,
    window_end: result.window.latest,
    start_after_days: recurrence.start_after_days(),
    end_before_days: recurrence.end_before_days(),
    last_completed_on,
    expected_dates: result.expected_dates,
    description: task.description.clone().filter(|d| !d.trim().is_empty()),
    preferred_window: task.preferred_window(),
    preferred_windows: task.meta_windows("preferred_windows"),
    busy_windows: task.meta_windows("busy_windows"),
    importance: task.meta_str("importance"),
    category: task.meta_str("category"),
  }
}

/// Build the preview for all non-archived `tasks`.
///
/// `last_completed` maps task id to the date of its most recent completion.
pub fn build_preview(
  tasks: &[TaskTemplate],
  last_completed: &HashMap<String, NaiveDate>,
  request: &ScheduleRequest,
  today: NaiveDate,
  settings: &ScheduleSettings,
) -> TrackerResult<SchedulePreview> {
  let week = WeekRange::resolve(
    request.week_start,
    request.week_end,
    today,
    settings.week_start_day,
  )?;

  let candidates: Vec<ScheduledTaskCandidate> = tasks
    .iter()
    .filter(|task| !task.is_archived)
    .map(|task| build_candidate(task, last_completed.get(&task.id).copied(), &week, today))
    .collect();

  let prompt = render_prompt(
    &week,
    &candidates,
    &request.user_busy,
    &request.user_preferences,
  );

  Ok(SchedulePreview {
    week_start: week.start,
    week_end: week.end,
    prompt,
    instructions: None,
    tasks: candidates,
  })
}

/// ---------------------------------------------------------------------------
/// Prompt Rendering
/// ---------------------------------------------------------------------------

/// One window line. `label` is the note, else the fallback text.
fn format_window(window: &TimeWindow, label: &str) -> String {
  format!(
    "- {} {}-{} ({})",
    window.day.as_deref().unwrap_or("any"),
    window.start_time.as_deref().unwrap_or(""),
    window.end_time.as_deref().unwrap_or(""),
    window.note.as_deref().unwrap_or(label)
  )
}

fn format_candidate(task: &ScheduledTaskCandidate) -> String {
  let expected = if task.expected_dates.is_empty() {
    "none".to_string()
  } else {
    task
      .expected_dates
      .iter()
      .map(|d| d.to_string())
      .collect::<Vec<_>>()
      .join(", ")
  };
  let last = task
    .last_completed_on
    .map(|d| d.to_string())
    .unwrap_or_else(|| "never".to_string());
  let preferred = task
    .preferred_window
    .as_deref()
    .map(|w| format!(" | preferred window: {}", w))
    .unwrap_or_default();
  let description = task
    .description
    .as_deref()
    .map(|d| format!(" | description: {}", d))
    .unwrap_or_default();

  format!(
    "- {} [{} | mode={}] | {} min | allowed window {} to {} | expected on: {} | allowed {}-{} days after last completion ({}) | priority {}{}{}",
    task.title,
    task.classification,
    task.mode,
    task.duration_minutes,
    task.window_start,
    task.window_end,
    expected,
    task.start_after_days,
    task.end_before_days,
    last,
    task.priority,
    preferred,
    description,
  )
}

/// Render the planner brief. Skipped tasks are left out.
pub fn render_prompt(
  week: &WeekRange,
  tasks: &[ScheduledTaskCandidate],
  busy: &[TimeWindow],
  preferred: &[TimeWindow],
) -> String {
  let mut lines: Vec<String> = vec![
    "You are scheduling tasks for the upcoming week only. Do not place anything outside this range.".into(),
    format!(
      "Week range: {} to {} ({} to {}).",
      week.start,
      week.end,
      week.start.format("%A"),
      week.end.format("%A")
    ),
    "Recurrence rules:".into(),
    "- repeat: chain occurrences from the last completion (or today if none). Each occurrence must be at least start_after_days and at most end_before_days after the previous one. Keep chaining until you pass the week end.".into(),
    "- one_time: place exactly once within its allowed window; if the window misses this week, skip it.".into(),
    "Classifications: must = the allowed window and the week nest inside each other, so it has to happen this week; do_if_possible = the window only partly overlaps this week.".into(),
  ];

  if !busy.is_empty() {
    lines.push("Busy windows to avoid:".into());
    lines.extend(busy.iter().map(|w| format_window(w, "busy")));
  }
  if !preferred.is_empty() {
    lines.push("Preferred windows:".into());
    lines.extend(
      preferred
        .iter()
        .map(|w| format_window(w, w.kind.as_deref().unwrap_or("preferred"))),
    );
  }

  lines.push("Tasks to consider:".into());
  let scheduled: Vec<String> = tasks
    .iter()
    .filter(|t| t.classification != Classification::Skip)
    .map(format_candidate)
    .collect();
  if scheduled.is_empty() {
    lines.push("- (no tasks fall inside this week)".into());
  } else {
    lines.extend(scheduled);
  }

  lines.push("Return a concise plan with a concrete day and time for each scheduled task inside this week. Respect busy windows, keep times inside preferred dayparts when given, and avoid clustering everything on one day.".into());
  lines.push("If you skip a task, state `skipped: <reason>` so the user understands why.".into());
  lines.join("\n")
}

/// ---------------------------------------------------------------------------
/// Commit (not persisted)
/// ---------------------------------------------------------------------------

/// Accept a finished plan. Plans are not stored yet; the request is echoed.
pub fn commit_schedule(request: ScheduleCommitRequest) -> ScheduleCommitResponse {
  ScheduleCommitResponse {
    message: "Plan received; persistence not yet implemented".to_string(),
    stored: false,
    plan: request.plan,
    ai_response: request.ai_response,
  }
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::{Utc, Weekday};
  use serde_json::{json, Value};

  fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  fn task(id: &str, title: &str, recurrence: Value, metadata: Value) -> TaskTemplate {
    TaskTemplate {
      id: id.into(),
      title: title.into(),
      description: None,
      duration_minutes: 30,
      priority: "medium".into(),
      recurrence,
      metadata,
      is_archived: false,
      created_at: Utc::now(),
      updated_at: Utc::now(),
    }
  }

  fn settings() -> ScheduleSettings {
    ScheduleSettings {
      week_start_day: Weekday::Sat,
    }
  }

  #[test]
  fn test_preview_defaults_to_upcoming_saturday_week() {
    let preview = build_preview(
      &[],
      &HashMap::new(),
      &ScheduleRequest::default(),
      date(2026, 10, 19),
      &settings(),
    )
    .unwrap();
    assert_eq!(preview.week_start, date(2026, 10, 24));
    assert_eq!(preview.week_end, date(2026, 10, 30));
    assert!(preview.prompt.contains("2026-10-24 to 2026-10-30 (Saturday to Friday)"));
    assert!(preview.prompt.contains("(no tasks fall inside this week)"));
  }

  #[test]
  fn test_preview_classifies_and_hides_skipped_tasks() {
    let tasks = vec![
      task(
        "weekly",
        "Laundry",
        json!({"mode": "repeat", "config": {"start_after_days": 7, "end_before_days": 7}}),
        json!({"window": "mornings"}),
      ),
      task(
        "far",
        "Passport renewal",
        json!({"mode": "one_time", "config": {"start_after_days": 60, "end_before_days": 90}}),
        json!({}),
      ),
    ];
    let mut last = HashMap::new();
    last.insert("weekly".to_string(), date(2026, 10, 17));

    let preview = build_preview(&tasks, &last, &ScheduleRequest::default(), date(2026, 10, 19), &settings())
      .unwrap();

    let laundry = &preview.tasks[0];
    assert_eq!(laundry.classification, Classification::Must);
    assert_eq!(laundry.expected_dates, vec![date(2026, 10, 24)]);
    assert_eq!(laundry.preferred_window.as_deref(), Some("mornings"));
    assert_eq!(preview.tasks[1].classification, Classification::Skip);

    assert!(preview.prompt.contains("- Laundry [must | mode=repeat] | 30 min"));
    assert!(preview.prompt.contains("expected on: 2026-10-24"));
    assert!(preview.prompt.contains("allowed 7-7 days after last completion (2026-10-17)"));
    assert!(preview.prompt.contains("preferred window: mornings"));
    assert!(!preview.prompt.contains("Passport renewal"));
  }

  #[test]
  fn test_archived_tasks_are_ignored() {
    let mut archived = task("a", "Old chore", json!({}), json!({}));
    archived.is_archived = true;
    let preview = build_preview(
      &[archived],
      &HashMap::new(),
      &ScheduleRequest::default(),
      date(2026, 10, 19),
      &settings(),
    )
    .unwrap();
    assert!(preview.tasks.is_empty());
  }

  #[test]
  fn test_prompt_lists_user_windows() {
    let request = ScheduleRequest {
      week_start: Some(date(2026, 10, 24)),
      week_end: None,
      user_busy: vec![
        TimeWindow {
          day: Some("mon".into()),
          start_time: Some("09:00".into()),
          end_time: Some("17:00".into()),
          kind: None,
          note: Some("work".into()),
        },
        TimeWindow {
          day: Some("wed".into()),
          kind: Some("meeting".into()),
          ..Default::default()
        },
      ],
      user_preferences: vec![TimeWindow {
        kind: Some("morning".into()),
        ..Default::default()
      }],
    };
    let preview = build_preview(&[], &HashMap::new(), &request, date(2026, 10, 19), &settings()).unwrap();
    assert!(preview.prompt.contains("Busy windows to avoid:\n- mon 09:00-17:00 (work)\n- wed - (busy)"));
    assert!(!preview.prompt.contains("meeting"));
    assert!(preview.prompt.contains("Preferred windows:\n- any - (morning)"));
  }

  #[test]
  fn test_inverted_explicit_week_is_rejected() {
    let request = ScheduleRequest {
      week_start: Some(date(2026, 10, 30)),
      week_end: Some(date(2026, 10, 24)),
      ..Default::default()
    };
    let result = build_preview(&[], &HashMap::new(), &request, date(2026, 10, 19), &settings());
    assert!(result.is_err());
  }

  #[test]
  fn test_commit_is_echoed_not_stored() {
    let response = commit_schedule(ScheduleCommitRequest {
      week_start: date(2026, 10, 24),
      week_end: date(2026, 10, 30),
      plan: Vec::new(),
      ai_response: Some("Sat 09:00 Laundry".into()),
    });
    assert!(!response.stored);
    assert_eq!(response.ai_response.as_deref(), Some("Sat 09:00 Laundry"));
    assert!(response.message.contains("not yet implemented"));
  }
}
