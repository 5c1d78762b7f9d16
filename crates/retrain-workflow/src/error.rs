//! Pipeline errors.

use retrain_context::{RunContext, TrainingJobStatus};
use retrain_dataset::TransformError;
use retrain_training::ServiceError;

use crate::state::State;

/// Errors raised by a single pipeline state.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
  /// Configuration parameters could not be read.
  #[error("failed to read configuration parameters")]
  Parameters(#[from] retrain_params::Error),

  /// Required inputs are still empty after defaults were applied.
  #[error("required fields are empty: {}", fields.join(", "))]
  MissingFields { fields: Vec<&'static str> },

  /// A state ran before the state that writes one of its inputs.
  #[error("state {state} requires '{field}' which has not been set")]
  MissingContext { state: State, field: &'static str },

  /// Reading or writing a blob failed.
  #[error("blob storage operation failed")]
  Blob(#[from] retrain_blob::Error),

  /// The sales table could not be converted.
  #[error("failed to transform training data")]
  Transform(#[from] TransformError),

  /// A training or hosting service call failed.
  #[error("{operation} failed")]
  Service {
    operation: &'static str,
    #[source]
    source: ServiceError,
  },

  /// The training job reached a status the pipeline does not continue from.
  #[error("training job '{job_name}' ended with status '{status}'")]
  UnexpectedJobStatus {
    job_name: String,
    status: TrainingJobStatus,
  },

  /// The endpoint probe failed and the probe policy does not tolerate it.
  #[error("could not determine whether endpoint '{endpoint_name}' exists: {reason}")]
  EndpointProbe { endpoint_name: String, reason: String },

  /// Execution was cancelled.
  #[error("execution cancelled")]
  Cancelled,
}

impl WorkflowError {
  pub(crate) fn service(operation: &'static str, source: ServiceError) -> Self {
    Self::Service { operation, source }
  }

  /// The message of this error and every source below it, joined by `": "`.
  pub fn report(&self) -> String {
    let mut message = self.to_string();
    let mut source = std::error::Error::source(self);
    while let Some(cause) = source {
      message.push_str(": ");
      message.push_str(&cause.to_string());
      source = cause.source();
    }
    message
  }
}

/// A run that stopped in a failing state.
///
/// Carries the state that failed and the context as it was when the failure
/// happened, so the caller can report or inspect what was already done.
#[derive(Debug, thiserror::Error)]
#[error("pipeline failed in state {state}")]
pub struct RunFailure {
  pub execution_id: String,
  pub state: State,
  pub context: Box<RunContext>,
  #[source]
  pub source: WorkflowError,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_report_includes_sources() {
    let err = WorkflowError::service("create_model", ServiceError::rejected("bad role"));
    assert_eq!(err.report(), "create_model failed: request rejected: bad role");
  }

  #[test]
  fn test_missing_fields_message() {
    let err = WorkflowError::MissingFields {
      fields: vec!["region", "training_role"],
    };
    assert_eq!(err.to_string(), "required fields are empty: region, training_role");
  }
}
