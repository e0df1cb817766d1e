//! Settings commands

use tracing::info;

use crate::db::AppState;
use crate::error::TrackerResult;
use crate::store::SettingsRepository;

/// Key of the user-edited preamble returned with schedule previews
pub const TASKS_PROMPT_KEY: &str = "tasks_prompt";

/// The stored prompt preamble, empty when never set
pub async fn get_tasks_prompt(state: &AppState) -> TrackerResult<String> {
  Ok(state.store.get_setting(TASKS_PROMPT_KEY).await?.unwrap_or_default())
}

pub async fn set_tasks_prompt(state: &AppState, prompt: &str) -> TrackerResult<String> {
  state.store.set_setting(TASKS_PROMPT_KEY, prompt).await?;
  info!("Updated tasks prompt ({} chars)", prompt.chars().count());
  Ok(prompt.to_string())
}
