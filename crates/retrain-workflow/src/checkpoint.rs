//! Suspended runs.

use std::time::Duration;

use chrono::{DateTime, Utc};
use retrain_context::RunContext;
use serde::{Deserialize, Serialize};

use crate::state::State;

/// Everything needed to continue a run in another process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
  pub execution_id: String,
  /// State to run first when resuming.
  pub state: State,
  pub context: RunContext,
  /// Earliest time the run should continue. `None` means immediately.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub resume_after: Option<DateTime<Utc>>,
  /// States executed before the run suspended.
  #[serde(default)]
  pub history: Vec<State>,
}

impl Checkpoint {
  /// How long to wait from `now` before resuming.
  pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
    self
      .resume_after
      .and_then(|at| (at - now).to_std().ok())
      .unwrap_or(Duration::ZERO)
  }

  pub fn to_json(&self) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(self)
  }

  pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
    serde_json::from_str(json)
  }
}

/// Final result of a run that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
  /// The endpoint serves the new model.
  Published(RunResult),
  /// The run stopped at a wait and must be resumed from the checkpoint.
  Suspended(Checkpoint),
}

/// A run that reached `Done`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
  pub execution_id: String,
  pub context: RunContext,
  /// Every state executed, in order, across suspends and resumes.
  pub history: Vec<State>,
}
