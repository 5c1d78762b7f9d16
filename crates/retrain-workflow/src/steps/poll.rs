use std::time::Duration;

use retrain_context::RunContext;
use retrain_training::TrainingService;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use super::job_name;
use crate::error::WorkflowError;
use crate::state::State;

/// Interval between training status checks.
pub const POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Query the training job and record its status.
#[instrument(name = "check_training_status", skip_all, fields(job_name = %ctx.training_job_name))]
pub async fn check_training_status(
  training: &dyn TrainingService,
  ctx: &mut RunContext,
) -> Result<(), WorkflowError> {
  let name = job_name(ctx, State::CheckTrainingStatus)?;
  let status = training
    .describe_training_job(name)
    .await
    .map_err(|e| WorkflowError::service("describe_training_job", e))?;

  info!(status = %status, "training status");
  ctx.training_job_status = Some(status);
  Ok(())
}

/// Sleep for `interval`, returning early with `Cancelled` if the token fires.
pub async fn wait_for_training(
  interval: Duration,
  cancel: &CancellationToken,
) -> Result<(), WorkflowError> {
  tokio::select! {
    _ = tokio::time::sleep(interval) => Ok(()),
    _ = cancel.cancelled() => Err(WorkflowError::Cancelled),
  }
}

#[cfg(test)]
mod tests {
  use retrain_context::TrainingJobStatus;
  use retrain_training::{InMemoryTrainingService, ServiceError};

  use super::*;

  #[tokio::test]
  async fn test_records_status() {
    let service = InMemoryTrainingService::new().with_in_progress_polls(1);
    service
      .create_training_job(&sample_request("SalesForecast-1"))
      .await
      .unwrap();
    let mut ctx = RunContext {
      training_job_name: "SalesForecast-1".to_string(),
      ..RunContext::default()
    };

    check_training_status(&service, &mut ctx).await.unwrap();
    assert_eq!(ctx.training_job_status, Some(TrainingJobStatus::InProgress));

    check_training_status(&service, &mut ctx).await.unwrap();
    assert_eq!(ctx.training_job_status, Some(TrainingJobStatus::Completed));
  }

  #[tokio::test]
  async fn test_requires_job_name() {
    let service = InMemoryTrainingService::new();
    let mut ctx = RunContext::new();

    let err = check_training_status(&service, &mut ctx).await.unwrap_err();
    assert!(matches!(
      err,
      WorkflowError::MissingContext {
        state: State::CheckTrainingStatus,
        field: "training_job_name"
      }
    ));
  }

  #[tokio::test]
  async fn test_unknown_job_is_a_service_error() {
    let service = InMemoryTrainingService::new();
    let mut ctx = RunContext {
      training_job_name: "SalesForecast-404".to_string(),
      ..RunContext::default()
    };

    let err = check_training_status(&service, &mut ctx).await.unwrap_err();
    match err {
      WorkflowError::Service { operation, source } => {
        assert_eq!(operation, "describe_training_job");
        assert!(matches!(source, ServiceError::NotFound { .. }));
      }
      other => panic!("unexpected error: {other}"),
    }
  }

  #[tokio::test(start_paused = true)]
  async fn test_wait_sleeps_for_interval() {
    let cancel = CancellationToken::new();
    let started = tokio::time::Instant::now();

    wait_for_training(POLL_INTERVAL, &cancel).await.unwrap();

    assert!(started.elapsed() >= Duration::from_secs(30));
  }

  #[tokio::test(start_paused = true)]
  async fn test_wait_observes_cancellation() {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
      tokio::time::sleep(Duration::from_secs(5)).await;
      trigger.cancel();
    });

    let err = wait_for_training(POLL_INTERVAL, &cancel).await.unwrap_err();
    assert!(matches!(err, WorkflowError::Cancelled));
  }

  fn sample_request(job_name: &str) -> retrain_training::TrainingJobRequest {
    let ctx = RunContext {
      training_job_name: job_name.to_string(),
      training_file_json: Some("SageMaker/train.json".to_string()),
      ..RunContext::default()
    };
    crate::steps::submit::training_job_request(&ctx).unwrap()
  }
}
