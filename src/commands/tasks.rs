//! Task commands: CRUD, completion history and the weekly schedule preview

use chrono::{Local, NaiveDate, TimeZone, Utc};
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::classifier::Classification;
use crate::db::AppState;
use crate::error::{TrackerError, TrackerResult};
use crate::models::{NewTaskHistory, TaskHistory, TaskTemplate, TaskTemplateInput};
use crate::preview::{self, ScheduleCommitRequest, ScheduleCommitResponse, SchedulePreview, ScheduleRequest};
use crate::recurrence::Recurrence;
use crate::store::{SettingsRepository, TaskRepository};

use super::settings::TASKS_PROMPT_KEY;

/// Default page size for the global history listing
pub const DEFAULT_HISTORY_LIMIT: i64 = 250;

/// ---------------------------------------------------------------------------
/// Schedule
/// ---------------------------------------------------------------------------

/// Build the planning preview for a week. `today` is a local date; it
/// anchors the default week and tasks without history.
pub async fn preview_schedule(
  state: &AppState,
  request: ScheduleRequest,
  today: NaiveDate,
) -> TrackerResult<SchedulePreview> {
  preview_schedule_in(state, request, today, &Local).await
}

/// Same as [`preview_schedule`] with completions read on the calendar of
/// `tz`, which must be the clock `today` came from.
pub async fn preview_schedule_in<Tz: TimeZone>(
  state: &AppState,
  request: ScheduleRequest,
  today: NaiveDate,
  tz: &Tz,
) -> TrackerResult<SchedulePreview> {
  let tasks = state.store.list_tasks(false).await?;

  let mut last_completed = HashMap::new();
  for task in &tasks {
    if let Some(completed_at) = state.store.last_completed_at(&task.id).await? {
      last_completed.insert(task.id.clone(), completed_at.with_timezone(tz).date_naive());
    }
  }

  let mut preview = preview::build_preview(&tasks, &last_completed, &request, today, &state.config.schedule)?;
  preview.instructions = state.store.get_setting(TASKS_PROMPT_KEY).await?;

  info!(
    "Schedule preview {}..{}: {} task(s), {} must",
    preview.week_start,
    preview.week_end,
    preview.tasks.len(),
    preview
      .tasks
      .iter()
      .filter(|t| t.classification == Classification::Must)
      .count()
  );

  Ok(preview)
}

/// Accept a finished plan. Nothing is persisted yet.
pub async fn commit_schedule(
  _state: &AppState,
  request: ScheduleCommitRequest,
) -> TrackerResult<ScheduleCommitResponse> {
  if request.week_end < request.week_start {
    return Err(TrackerError::InvalidOperation(format!(
      "week_end {} is before week_start {}",
      request.week_end, request.week_start
    )));
  }
  info!(
    "Received plan for {}..{} with {} task(s)",
    request.week_start,
    request.week_end,
    request.plan.len()
  );
  Ok(preview::commit_schedule(request))
}

/// ---------------------------------------------------------------------------
/// Task Templates
/// ---------------------------------------------------------------------------

pub async fn list_tasks(state: &AppState, include_archived: bool) -> TrackerResult<Vec<TaskTemplate>> {
  state.store.list_tasks(include_archived).await
}

pub async fn get_task(state: &AppState, task_id: &str) -> TrackerResult<TaskTemplate> {
  state
    .store
    .get_task(task_id)
    .await?
    .ok_or_else(|| TrackerError::not_found("Task", task_id))
}

fn require_object(field: &str, value: &serde_json::Value) -> TrackerResult<()> {
  if value.is_object() {
    Ok(())
  } else {
    Err(TrackerError::InvalidOperation(format!("{} must be a JSON object", field)))
  }
}

/// Create a task. Absent fields take their defaults; descriptive fields
/// given at the top level are folded into metadata.
pub async fn create_task(state: &AppState, input: TaskTemplateInput) -> TrackerResult<TaskTemplate> {
  let title = input
    .title
    .as_deref()
    .map(str::trim)
    .filter(|t| !t.is_empty())
    .ok_or_else(|| TrackerError::InvalidOperation("Task title is required".to_string()))?
    .to_string();

  let recurrence = match input.recurrence {
    Some(value) => {
      require_object("recurrence", &value)?;
      value
    }
    None => Recurrence::default().to_json(),
  };

  let base_metadata = input.metadata.unwrap_or_else(|| serde_json::json!({}));
  require_object("metadata", &base_metadata)?;

  let now = Utc::now();
  let task = TaskTemplate {
    id: Uuid::new_v4().to_string(),
    title,
    description: input.description,
    duration_minutes: input.duration_minutes.unwrap_or(30).max(0),
    priority: input.priority.unwrap_or_else(|| "medium".to_string()),
    recurrence,
    metadata: input.descriptors.merge_into(&base_metadata)?,
    is_archived: input.is_archived.unwrap_or(false),
    created_at: now,
    updated_at: now,
  };

  state.store.insert_task(&task).await?;
  info!("Created task {} ({})", task.id, task.title);
  Ok(task)
}

/// Patch a task. Only fields present in `input` change.
pub async fn update_task(state: &AppState, task_id: &str, input: TaskTemplateInput) -> TrackerResult<TaskTemplate> {
  let mut task = get_task(state, task_id).await?;

  if let Some(title) = input.title {
    let title = title.trim();
    if title.is_empty() {
      return Err(TrackerError::InvalidOperation("Task title is required".to_string()));
    }
    task.title = title.to_string();
  }
  if let Some(description) = input.description {
    task.description = Some(description);
  }
  if let Some(duration) = input.duration_minutes {
    task.duration_minutes = duration.max(0);
  }
  if let Some(priority) = input.priority {
    task.priority = priority;
  }
  if let Some(recurrence) = input.recurrence {
    require_object("recurrence", &recurrence)?;
    task.recurrence = recurrence;
  }
  if let Some(archived) = input.is_archived {
    task.is_archived = archived;
  }

  let base_metadata = match input.metadata {
    Some(metadata) => {
      require_object("metadata", &metadata)?;
      metadata
    }
    None => task.metadata.clone(),
  };
  task.metadata = input.descriptors.merge_into(&base_metadata)?;
  task.updated_at = Utc::now();

  state.store.update_task(&task).await?;
  debug!("Updated task {}", task.id);
  Ok(task)
}

pub async fn archive_task(state: &AppState, task_id: &str) -> TrackerResult<TaskTemplate> {
  let input = TaskTemplateInput {
    is_archived: Some(true),
    ..Default::default()
  };
  update_task(state, task_id, input).await
}

/// Delete a task and, with it, its history
pub async fn delete_task(state: &AppState, task_id: &str) -> TrackerResult<()> {
  if !state.store.delete_task(task_id).await? {
    return Err(TrackerError::not_found("Task", task_id));
  }
  info!("Deleted task {}", task_id);
  Ok(())
}

/// ---------------------------------------------------------------------------
/// History
/// ---------------------------------------------------------------------------

pub async fn list_history(state: &AppState, task_id: &str) -> TrackerResult<Vec<TaskHistory>> {
  get_task(state, task_id).await?;
  state.store.list_history(Some(task_id), i64::MAX).await
}

pub async fn list_all_history(state: &AppState, limit: Option<i64>) -> TrackerResult<Vec<TaskHistory>> {
  let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT).max(0);
  state.store.list_history(None, limit).await
}

/// Record a completion (or other outcome) for a task
pub async fn add_history(state: &AppState, task_id: &str, record: NewTaskHistory) -> TrackerResult<TaskHistory> {
  let task = get_task(state, task_id).await?;

  let entry = TaskHistory {
    id: Uuid::new_v4().to_string(),
    task_id: task.id,
    completed_at: record.completed_at,
    duration_minutes: record.duration_minutes,
    note: record.note,
    status: record.status,
    task_title: Some(task.title),
  };

  state.store.insert_history(&entry).await?;
  debug!("Recorded {} for task {} at {}", entry.status, entry.task_id, entry.completed_at);
  Ok(entry)
}
