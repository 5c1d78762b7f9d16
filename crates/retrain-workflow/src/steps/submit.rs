use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use retrain_context::RunContext;
use retrain_training::{
  AlgorithmSpecification, Channel, CompressionType, ResourceConfig, S3DataDistribution,
  S3DataSource, S3DataType, TrainingInputMode, TrainingJobRequest, TrainingService,
};
use tracing::{info, instrument};

use super::derived;
use crate::error::WorkflowError;
use crate::state::State;

pub const JOB_NAME_PREFIX: &str = "SalesForecast";
pub const INSTANCE_TYPE: &str = "ml.m4.xlarge";
pub const VOLUME_SIZE_GB: u32 = 5;
pub const MAX_RUNTIME_SECONDS: u32 = 3600;
pub const TRAIN_CHANNEL: &str = "train";
/// Prefix, inside the training bucket, under which model artifacts land.
pub const MODEL_PREFIX: &str = "SageMaker/model";

/// Fixed algorithm hyperparameters.
pub const HYPERPARAMETERS: [(&str, &str); 11] = [
  ("context_length", "72"),
  ("dropout_rate", "0.05"),
  ("early_stopping_patience", "10"),
  ("epochs", "20"),
  ("learning_rate", "0.001"),
  ("likelihood", "gaussian"),
  ("mini_batch_size", "32"),
  ("num_cells", "40"),
  ("num_layers", "3"),
  ("prediction_length", "90"),
  ("time_freq", "D"),
];

/// Job name derived from a nanosecond UTC timestamp.
pub fn job_name_at(now: DateTime<Utc>) -> String {
  let nanos = now
    .timestamp_nanos_opt()
    .unwrap_or_else(|| now.timestamp_micros().saturating_mul(1_000));
  format!("{JOB_NAME_PREFIX}-{nanos}")
}

/// Build the training job request for an already-named job.
pub fn training_job_request(ctx: &RunContext) -> Result<TrainingJobRequest, WorkflowError> {
  let training_file = derived(
    &ctx.training_file_json,
    State::SubmitTrainingJob,
    "training_file_json",
  )?;
  let job_name = super::job_name(ctx, State::SubmitTrainingJob)?;

  let hyperparameters: BTreeMap<String, String> = HYPERPARAMETERS
    .iter()
    .map(|(name, value)| (name.to_string(), value.to_string()))
    .collect();

  Ok(TrainingJobRequest {
    job_name: job_name.to_string(),
    algorithm: AlgorithmSpecification {
      training_image: ctx.training_image.clone(),
      training_input_mode: TrainingInputMode::File,
    },
    role_arn: ctx.training_role.clone(),
    output_path: format!("s3://{}/{MODEL_PREFIX}", ctx.training_bucket),
    resources: ResourceConfig {
      instance_count: 1,
      instance_type: INSTANCE_TYPE.to_string(),
      volume_size_gb: VOLUME_SIZE_GB,
    },
    max_runtime_seconds: MAX_RUNTIME_SECONDS,
    hyperparameters,
    input_channels: vec![Channel {
      channel_name: TRAIN_CHANNEL.to_string(),
      compression: CompressionType::None,
      data_source: S3DataSource {
        s3_uri: format!("s3://{}/{training_file}", ctx.training_bucket),
        s3_data_type: S3DataType::S3Prefix,
        distribution: S3DataDistribution::FullyReplicated,
      },
    }],
  })
}

/// Name and submit a new training job.
///
/// Every call starts a fresh job; the previous name in the context, if any,
/// is replaced.
#[instrument(name = "submit_training_job", skip_all)]
pub async fn submit_training_job(
  training: &dyn TrainingService,
  ctx: &mut RunContext,
) -> Result<(), WorkflowError> {
  ctx.training_job_name = job_name_at(Utc::now());
  let request = training_job_request(ctx)?;

  let arn = training
    .create_training_job(&request)
    .await
    .map_err(|e| WorkflowError::service("create_training_job", e))?;

  info!(job_name = %request.job_name, job_arn = %arn, "training job submitted");
  ctx.training_job_arn = Some(arn);
  Ok(())
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use retrain_training::{InMemoryTrainingService, ServiceCall, ServiceError};

  use super::*;

  fn context() -> RunContext {
    RunContext {
      training_bucket: "training".to_string(),
      training_image: "forecasting-deepar:1".to_string(),
      training_role: "role/retrain".to_string(),
      training_file_json: Some("SageMaker/train.json".to_string()),
      ..RunContext::default()
    }
  }

  #[test]
  fn test_job_name_uses_nanosecond_timestamp() {
    let now = Utc.timestamp_opt(1_700_000_000, 123).unwrap();
    assert_eq!(job_name_at(now), "SalesForecast-1700000000000000123");
  }

  #[test]
  fn test_request_shape() {
    let mut ctx = context();
    ctx.training_job_name = "SalesForecast-1".to_string();

    let request = training_job_request(&ctx).unwrap();

    assert_eq!(request.job_name, "SalesForecast-1");
    assert_eq!(request.algorithm.training_image, "forecasting-deepar:1");
    assert_eq!(request.algorithm.training_input_mode, TrainingInputMode::File);
    assert_eq!(request.role_arn, "role/retrain");
    assert_eq!(request.output_path, "s3://training/SageMaker/model");
    assert_eq!(request.resources.instance_count, 1);
    assert_eq!(request.resources.instance_type, "ml.m4.xlarge");
    assert_eq!(request.resources.volume_size_gb, 5);
    assert_eq!(request.max_runtime_seconds, 3600);
    assert_eq!(request.hyperparameters.len(), 11);
    assert_eq!(request.hyperparameters["prediction_length"], "90");
    assert_eq!(request.hyperparameters["likelihood"], "gaussian");

    let channel = &request.input_channels[0];
    assert_eq!(request.input_channels.len(), 1);
    assert_eq!(channel.channel_name, "train");
    assert_eq!(channel.compression, CompressionType::None);
    assert_eq!(channel.data_source.s3_uri, "s3://training/SageMaker/train.json");
    assert_eq!(channel.data_source.s3_data_type, S3DataType::S3Prefix);
    assert_eq!(
      channel.data_source.distribution,
      S3DataDistribution::FullyReplicated
    );
  }

  #[test]
  fn test_request_needs_training_file() {
    let mut ctx = context();
    ctx.training_job_name = "SalesForecast-1".to_string();
    ctx.training_file_json = None;

    let err = training_job_request(&ctx).unwrap_err();
    assert!(matches!(
      err,
      WorkflowError::MissingContext {
        field: "training_file_json",
        ..
      }
    ));
  }

  #[tokio::test]
  async fn test_submit_records_name_and_arn() {
    let service = InMemoryTrainingService::new().with_region("us-west-2");
    let mut ctx = context();

    submit_training_job(&service, &mut ctx).await.unwrap();

    assert!(ctx.training_job_name.starts_with("SalesForecast-"));
    let arn = ctx.training_job_arn.as_deref().unwrap();
    assert!(arn.starts_with("arn:aws:sagemaker:us-west-2:"));
    match &service.calls()[..] {
      [ServiceCall::CreateTrainingJob(request)] => {
        assert_eq!(request.job_name, ctx.training_job_name);
      }
      calls => panic!("unexpected calls: {calls:?}"),
    }
  }

  #[tokio::test]
  async fn test_service_error_is_propagated() {
    let service = InMemoryTrainingService::new()
      .with_failure("create_training_job", ServiceError::rejected("quota exceeded"));
    let mut ctx = context();

    let err = submit_training_job(&service, &mut ctx).await.unwrap_err();

    assert!(matches!(
      err,
      WorkflowError::Service {
        operation: "create_training_job",
        ..
      }
    ));
    assert!(ctx.training_job_arn.is_none());
  }
}
