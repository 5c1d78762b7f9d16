//! Pipeline states and the transitions between them.

use std::fmt;

use retrain_context::{RunContext, TrainingJobStatus};
use serde::{Deserialize, Serialize};

use crate::error::WorkflowError;

/// A state of the retrain pipeline.
///
/// Transitions are given by [`State::next`]. The two branching points are the
/// status check and the endpoint probe, whose successors come from
/// [`next_after_status`] and [`next_after_probe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum State {
  SetDefaults,
  Validate,
  TransformData,
  SubmitTrainingJob,
  CheckTrainingStatus,
  WaitForTraining,
  RegisterModel,
  CreateEndpointConfig,
  ProbeEndpoint,
  CreateEndpoint,
  UpdateEndpoint,
  Done,
}

impl State {
  /// The state every run starts in.
  pub const START: State = State::SetDefaults;

  /// The state that follows this one once its handler has updated `ctx`.
  ///
  /// This is the whole transition table. Task states move to a fixed
  /// successor; the status check and the endpoint probe branch on what they
  /// recorded. `Done` is absorbing.
  pub fn next(self, ctx: &RunContext) -> Result<State, WorkflowError> {
    match self {
      State::SetDefaults => Ok(State::Validate),
      State::Validate => Ok(State::TransformData),
      State::TransformData => Ok(State::SubmitTrainingJob),
      State::SubmitTrainingJob => Ok(State::CheckTrainingStatus),
      State::CheckTrainingStatus => next_after_status(ctx),
      State::WaitForTraining => Ok(State::CheckTrainingStatus),
      State::RegisterModel => Ok(State::CreateEndpointConfig),
      State::CreateEndpointConfig => Ok(State::ProbeEndpoint),
      State::ProbeEndpoint => next_after_probe(ctx),
      State::CreateEndpoint | State::UpdateEndpoint | State::Done => Ok(State::Done),
    }
  }

  /// Whether reaching this state ends the run successfully.
  pub fn is_terminal(self) -> bool {
    self == State::Done
  }

  /// Whether this state may call an external service that mutates something.
  pub fn is_side_effecting(self) -> bool {
    !matches!(
      self,
      State::SetDefaults | State::Validate | State::WaitForTraining | State::Done
    )
  }

  pub fn as_str(self) -> &'static str {
    match self {
      State::SetDefaults => "SetDefaults",
      State::Validate => "Validate",
      State::TransformData => "TransformData",
      State::SubmitTrainingJob => "SubmitTrainingJob",
      State::CheckTrainingStatus => "CheckTrainingStatus",
      State::WaitForTraining => "WaitForTraining",
      State::RegisterModel => "RegisterModel",
      State::CreateEndpointConfig => "CreateEndpointConfig",
      State::ProbeEndpoint => "ProbeEndpoint",
      State::CreateEndpoint => "CreateEndpoint",
      State::UpdateEndpoint => "UpdateEndpoint",
      State::Done => "Done",
    }
  }
}

impl fmt::Display for State {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Choose the state after a training status check.
///
/// `InProgress` waits and checks again, `Completed` moves on to publishing.
/// Every other status (failed, stopping, stopped, unknown) ends the run.
pub fn next_after_status(ctx: &RunContext) -> Result<State, WorkflowError> {
  match &ctx.training_job_status {
    Some(TrainingJobStatus::InProgress) => Ok(State::WaitForTraining),
    Some(TrainingJobStatus::Completed) => Ok(State::RegisterModel),
    Some(status) => Err(WorkflowError::UnexpectedJobStatus {
      job_name: ctx.training_job_name.clone(),
      status: status.clone(),
    }),
    None => Err(WorkflowError::MissingContext {
      state: State::CheckTrainingStatus,
      field: "training_job_status",
    }),
  }
}

/// Choose between creating and updating the endpoint.
pub fn next_after_probe(ctx: &RunContext) -> Result<State, WorkflowError> {
  match ctx.endpoint_exists {
    Some(false) => Ok(State::CreateEndpoint),
    Some(true) => Ok(State::UpdateEndpoint),
    None => Err(WorkflowError::MissingContext {
      state: State::ProbeEndpoint,
      field: "endpoint_exists",
    }),
  }
}
