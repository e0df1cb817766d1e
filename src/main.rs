//! life-tracker command line
//!
//! Usage:
//! ```bash
//! # Planning prompt for the upcoming week
//! life-tracker preview
//!
//! # Full preview as JSON for an explicit week
//! life-tracker preview --week-start 2026-10-24 --json
//!
//! # Rotate a gym slot to its next substitute
//! life-tracker substitute <assignment-id>
//!
//! # Show or replace the planning preamble
//! life-tracker prompt
//! life-tracker prompt --set "Keep Sunday mornings free."
//! ```

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

use life_tracker_lib::commands::{gym, settings, tasks};
use life_tracker_lib::preview::{ScheduleCommitRequest, ScheduleRequest};
use life_tracker_lib::{init_logging, initialize_db, AppState, TrackerConfig, TrackerError, TrackerResult};

#[derive(Parser)]
#[command(
  name = "life-tracker",
  about = "Weekly chore planning and gym slot rotation",
  version
)]
struct Cli {
  /// Database URL override
  #[arg(long, global = true)]
  database_url: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Classify tasks for a week and render the planning prompt
  Preview {
    #[arg(long)]
    week_start: Option<NaiveDate>,
    #[arg(long)]
    week_end: Option<NaiveDate>,
    /// Pretend today is this date
    #[arg(long)]
    today: Option<NaiveDate>,
    /// Print the whole preview as JSON instead of the prompt
    #[arg(long)]
    json: bool,
  },
  /// Submit a finished plan (JSON file)
  Commit { plan: PathBuf },
  /// Rotate a slot to its next substitute
  Substitute { assignment_id: String },
  /// List ranked substitutes for a slot
  Substitutes { assignment_id: String },
  /// Choose the exercise shown in a slot
  Select { assignment_id: String, exercise_id: String },
  /// Put a slot back on its default exercise
  Reset { assignment_id: String },
  /// List the exercise library with each exercise's last session
  Exercises,
  /// Delete an exercise and its logged sessions
  DeleteExercise { exercise_id: String },
  /// Show or replace the planning preamble
  Prompt {
    #[arg(long)]
    set: Option<String>,
  },
}

fn print_json<T: Serialize>(value: &T) -> TrackerResult<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

async fn run(cli: Cli, config: TrackerConfig) -> TrackerResult<()> {
  let pool = initialize_db(&config.database).await?;
  let state = AppState::new(pool, config);

  match cli.command {
    Command::Preview {
      week_start,
      week_end,
      today,
      json,
    } => {
      let request = ScheduleRequest {
        week_start,
        week_end,
        ..Default::default()
      };
      let today = today.unwrap_or_else(|| Local::now().date_naive());
      let preview = tasks::preview_schedule(&state, request, today).await?;
      if json {
        print_json(&preview)?;
      } else {
        if let Some(instructions) = preview.instructions.as_deref().filter(|i| !i.trim().is_empty()) {
          println!("{}\n", instructions);
        }
        println!("{}", preview.prompt);
      }
    }
    Command::Commit { plan } => {
      let raw = std::fs::read_to_string(&plan)
        .map_err(|e| TrackerError::InvalidOperation(format!("Cannot read {}: {}", plan.display(), e)))?;
      let request: ScheduleCommitRequest = serde_json::from_str(&raw)?;
      print_json(&tasks::commit_schedule(&state, request).await?)?;
    }
    Command::Substitute { assignment_id } => {
      print_json(&gym::substitute_assignment(&state, &assignment_id).await?)?;
    }
    Command::Substitutes { assignment_id } => {
      print_json(&gym::list_substitutes(&state, &assignment_id).await?)?;
    }
    Command::Select {
      assignment_id,
      exercise_id,
    } => {
      print_json(&gym::select_exercise(&state, &assignment_id, &exercise_id).await?)?;
    }
    Command::Reset { assignment_id } => {
      print_json(&gym::reset_assignment(&state, &assignment_id).await?)?;
    }
    Command::Exercises => {
      print_json(&gym::list_exercises(&state).await?)?;
    }
    Command::DeleteExercise { exercise_id } => {
      gym::delete_exercise(&state, &exercise_id).await?;
      println!("Deleted {}", exercise_id);
    }
    Command::Prompt { set } => {
      let prompt = match set {
        Some(text) => settings::set_tasks_prompt(&state, &text).await?,
        None => settings::get_tasks_prompt(&state).await?,
      };
      println!("{}", prompt);
    }
  }

  Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
  // Load environment variables from .env file
  dotenvy::dotenv().ok();

  let cli = Cli::parse();

  let mut config = match TrackerConfig::from_env() {
    Ok(config) => config,
    Err(e) => {
      eprintln!("{}", e);
      return ExitCode::from(2);
    }
  };
  if let Some(url) = cli.database_url.clone() {
    config.database.url = url;
  }

  init_logging(&config.logging);

  match run(cli, config).await {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      error!(status = e.status_code(), "{}", e);
      eprintln!("{}", e);
      if e.is_client_error() {
        ExitCode::from(2)
      } else {
        ExitCode::FAILURE
      }
    }
  }
}
