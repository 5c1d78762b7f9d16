//! State handlers.
//!
//! Each handler reads the fields it needs from the [`RunContext`], performs
//! at most one kind of external call, and writes its results back.

pub mod defaults;
pub mod poll;
pub mod publish;
pub mod submit;
pub mod transform;
pub mod validate;

use std::sync::Arc;

use retrain_blob::Store;
use retrain_context::RunContext;
use retrain_params::ParameterStore;
use retrain_training::TrainingService;

use crate::error::WorkflowError;
use crate::state::State;

/// The external collaborators the pipeline talks to.
#[derive(Clone)]
pub struct Services {
  pub blobs: Arc<dyn Store>,
  pub parameters: Arc<dyn ParameterStore>,
  pub training: Arc<dyn TrainingService>,
}

impl Services {
  pub fn new(
    blobs: Arc<dyn Store>,
    parameters: Arc<dyn ParameterStore>,
    training: Arc<dyn TrainingService>,
  ) -> Self {
    Self {
      blobs,
      parameters,
      training,
    }
  }
}

/// The assigned training job name, or `MissingContext` if none was assigned.
pub(crate) fn job_name(ctx: &RunContext, state: State) -> Result<&str, WorkflowError> {
  if ctx.training_job_name.is_empty() {
    return Err(WorkflowError::MissingContext {
      state,
      field: "training_job_name",
    });
  }
  Ok(&ctx.training_job_name)
}

/// A derived field written by an earlier state.
pub(crate) fn derived<'a>(
  value: &'a Option<String>,
  state: State,
  field: &'static str,
) -> Result<&'a str, WorkflowError> {
  value
    .as_deref()
    .ok_or(WorkflowError::MissingContext { state, field })
}
