use retrain_context::RunContext;
use retrain_training::{
  EndpointConfigRequest, EndpointRequest, ModelRequest, ProductionVariant, TrainingService,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::{derived, job_name};
use crate::error::WorkflowError;
use crate::state::State;
use crate::steps::submit::{INSTANCE_TYPE, MODEL_PREFIX};

pub const VARIANT_NAME: &str = "AllTraffic";

/// Result of asking the service whether the endpoint exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
  Found,
  NotFound,
  /// The service could not answer; the endpoint may or may not exist.
  ProbeFailed(String),
}

/// What to do when the endpoint probe itself fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeFailurePolicy {
  /// Treat the endpoint as absent and try to create it.
  #[default]
  AssumeAbsent,
  /// Fail the run.
  Abort,
}

/// Public URL of the model artifact the training job wrote.
pub fn model_data_url(ctx: &RunContext) -> String {
  format!(
    "https://s3-{}.amazonaws.com/{}/{MODEL_PREFIX}/{}/output/model.tar.gz",
    ctx.region, ctx.training_bucket, ctx.training_job_name
  )
}

/// Register the trained artifact as a model named after the job.
#[instrument(name = "register_model", skip_all, fields(job_name = %ctx.training_job_name))]
pub async fn register_model(
  training: &dyn TrainingService,
  ctx: &mut RunContext,
) -> Result<(), WorkflowError> {
  let name = job_name(ctx, State::RegisterModel)?;
  let request = ModelRequest {
    model_name: name.to_string(),
    execution_role_arn: ctx.training_role.clone(),
    image: ctx.training_image.clone(),
    model_data_url: model_data_url(ctx),
  };

  let arn = training
    .create_model(&request)
    .await
    .map_err(|e| WorkflowError::service("create_model", e))?;

  info!(model_arn = %arn, "model registered");
  ctx.model_arn = Some(arn);
  Ok(())
}

/// Create an endpoint configuration that routes all traffic to the new model.
#[instrument(name = "create_endpoint_config", skip_all, fields(job_name = %ctx.training_job_name))]
pub async fn create_endpoint_config(
  training: &dyn TrainingService,
  ctx: &mut RunContext,
) -> Result<(), WorkflowError> {
  derived(&ctx.model_arn, State::CreateEndpointConfig, "model_arn")?;
  let name = job_name(ctx, State::CreateEndpointConfig)?;
  let request = EndpointConfigRequest {
    endpoint_config_name: name.to_string(),
    production_variants: vec![ProductionVariant {
      variant_name: VARIANT_NAME.to_string(),
      model_name: name.to_string(),
      instance_type: INSTANCE_TYPE.to_string(),
      initial_instance_count: 1,
      initial_variant_weight: 1.0,
    }],
  };

  let arn = training
    .create_endpoint_config(&request)
    .await
    .map_err(|e| WorkflowError::service("create_endpoint_config", e))?;

  info!(endpoint_config_arn = %arn, "endpoint config created");
  ctx.endpoint_config_arn = Some(arn);
  Ok(())
}

/// Ask the service whether an endpoint named `endpoint_name` exists.
///
/// A description whose name differs from the one requested counts as absent.
pub async fn probe_endpoint(training: &dyn TrainingService, endpoint_name: &str) -> ProbeOutcome {
  match training.describe_endpoint(endpoint_name).await {
    Ok(description) if description.endpoint_name == endpoint_name => ProbeOutcome::Found,
    Ok(_) => ProbeOutcome::NotFound,
    Err(e) if e.is_not_found() => ProbeOutcome::NotFound,
    Err(e) => ProbeOutcome::ProbeFailed(e.to_string()),
  }
}

/// Turn a probe outcome into `endpoint_exists` under `policy`.
pub fn resolve_probe(
  outcome: ProbeOutcome,
  policy: ProbeFailurePolicy,
  endpoint_name: &str,
) -> Result<bool, WorkflowError> {
  match (outcome, policy) {
    (ProbeOutcome::Found, _) => Ok(true),
    (ProbeOutcome::NotFound, _) => Ok(false),
    (ProbeOutcome::ProbeFailed(reason), ProbeFailurePolicy::AssumeAbsent) => {
      warn!(
        endpoint_name,
        reason = %reason,
        "endpoint probe failed, assuming endpoint does not exist"
      );
      Ok(false)
    }
    (ProbeOutcome::ProbeFailed(reason), ProbeFailurePolicy::Abort) => {
      Err(WorkflowError::EndpointProbe {
        endpoint_name: endpoint_name.to_string(),
        reason,
      })
    }
  }
}

/// Probe the endpoint and record whether it exists.
#[instrument(name = "probe_endpoint", skip_all, fields(endpoint_name = %ctx.endpoint_name))]
pub async fn check_endpoint(
  training: &dyn TrainingService,
  policy: ProbeFailurePolicy,
  ctx: &mut RunContext,
) -> Result<(), WorkflowError> {
  let outcome = probe_endpoint(training, &ctx.endpoint_name).await;
  let exists = resolve_probe(outcome, policy, &ctx.endpoint_name)?;

  info!(exists, "endpoint probed");
  ctx.endpoint_exists = Some(exists);
  Ok(())
}

fn endpoint_request(ctx: &RunContext, state: State) -> Result<EndpointRequest, WorkflowError> {
  derived(&ctx.endpoint_config_arn, state, "endpoint_config_arn")?;
  Ok(EndpointRequest {
    endpoint_name: ctx.endpoint_name.clone(),
    endpoint_config_name: job_name(ctx, state)?.to_string(),
  })
}

/// Create the endpoint, bound to the new configuration.
#[instrument(name = "create_endpoint", skip_all, fields(endpoint_name = %ctx.endpoint_name))]
pub async fn create_endpoint(
  training: &dyn TrainingService,
  ctx: &mut RunContext,
) -> Result<(), WorkflowError> {
  let request = endpoint_request(ctx, State::CreateEndpoint)?;
  let arn = training
    .create_endpoint(&request)
    .await
    .map_err(|e| WorkflowError::service("create_endpoint", e))?;

  info!(endpoint_arn = %arn, "endpoint created");
  ctx.endpoint_arn = Some(arn);
  Ok(())
}

/// Point the existing endpoint at the new configuration.
#[instrument(name = "update_endpoint", skip_all, fields(endpoint_name = %ctx.endpoint_name))]
pub async fn update_endpoint(
  training: &dyn TrainingService,
  ctx: &mut RunContext,
) -> Result<(), WorkflowError> {
  let request = endpoint_request(ctx, State::UpdateEndpoint)?;
  let arn = training
    .update_endpoint(&request)
    .await
    .map_err(|e| WorkflowError::service("update_endpoint", e))?;

  info!(endpoint_arn = %arn, "endpoint updated");
  ctx.endpoint_arn = Some(arn);
  Ok(())
}

#[cfg(test)]
mod tests {
  use async_trait::async_trait;
  use retrain_context::TrainingJobStatus;
  use retrain_training::{
    EndpointConfigRequest, EndpointDescription, InMemoryTrainingService, ModelRequest,
    ServiceCall, ServiceError, TrainingJobRequest,
  };

  use super::*;

  /// Describes every endpoint under a fixed name, whatever was asked for.
  struct RenamingService {
    described_name: &'static str,
  }

  #[async_trait]
  impl TrainingService for RenamingService {
    async fn create_training_job(&self, _: &TrainingJobRequest) -> Result<String, ServiceError> {
      Err(ServiceError::rejected("unsupported"))
    }

    async fn describe_training_job(&self, _: &str) -> Result<TrainingJobStatus, ServiceError> {
      Err(ServiceError::rejected("unsupported"))
    }

    async fn create_model(&self, _: &ModelRequest) -> Result<String, ServiceError> {
      Err(ServiceError::rejected("unsupported"))
    }

    async fn create_endpoint_config(
      &self,
      _: &EndpointConfigRequest,
    ) -> Result<String, ServiceError> {
      Err(ServiceError::rejected("unsupported"))
    }

    async fn describe_endpoint(&self, _: &str) -> Result<EndpointDescription, ServiceError> {
      Ok(EndpointDescription {
        endpoint_name: self.described_name.to_string(),
        endpoint_arn: format!("arn:endpoint/{}", self.described_name),
        endpoint_config_name: "old-config".to_string(),
      })
    }

    async fn create_endpoint(&self, _: &EndpointRequest) -> Result<String, ServiceError> {
      Err(ServiceError::rejected("unsupported"))
    }

    async fn update_endpoint(&self, _: &EndpointRequest) -> Result<String, ServiceError> {
      Err(ServiceError::rejected("unsupported"))
    }
  }

  fn trained() -> RunContext {
    RunContext {
      training_bucket: "training".to_string(),
      training_job_name: "SalesForecast-42".to_string(),
      training_image: "forecasting-deepar:1".to_string(),
      training_role: "role/retrain".to_string(),
      endpoint_name: "SalesForecast".to_string(),
      region: "us-west-2".to_string(),
      ..RunContext::default()
    }
  }

  #[test]
  fn test_model_data_url() {
    assert_eq!(
      model_data_url(&trained()),
      "https://s3-us-west-2.amazonaws.com/training/SageMaker/model/SalesForecast-42/output/model.tar.gz"
    );
  }

  #[tokio::test]
  async fn test_register_and_configure() {
    let service = InMemoryTrainingService::new();
    let mut ctx = trained();

    register_model(&service, &mut ctx).await.unwrap();
    create_endpoint_config(&service, &mut ctx).await.unwrap();

    assert!(ctx.model_arn.is_some());
    assert!(ctx.endpoint_config_arn.is_some());
    match &service.calls()[..] {
      [ServiceCall::CreateModel(model), ServiceCall::CreateEndpointConfig(config)] => {
        assert_eq!(model.model_name, "SalesForecast-42");
        assert_eq!(model.execution_role_arn, "role/retrain");
        assert_eq!(model.image, "forecasting-deepar:1");
        assert_eq!(config.endpoint_config_name, "SalesForecast-42");
        let variant = &config.production_variants[0];
        assert_eq!(config.production_variants.len(), 1);
        assert_eq!(variant.variant_name, "AllTraffic");
        assert_eq!(variant.model_name, "SalesForecast-42");
        assert_eq!(variant.instance_type, "ml.m4.xlarge");
        assert_eq!(variant.initial_instance_count, 1);
        assert_eq!(variant.initial_variant_weight, 1.0);
      }
      calls => panic!("unexpected calls: {calls:?}"),
    }
  }

  #[tokio::test]
  async fn test_endpoint_config_needs_model() {
    let service = InMemoryTrainingService::new();
    let mut ctx = trained();

    let err = create_endpoint_config(&service, &mut ctx).await.unwrap_err();
    assert!(matches!(
      err,
      WorkflowError::MissingContext {
        field: "model_arn",
        ..
      }
    ));
    assert!(service.calls().is_empty());
  }

  #[tokio::test]
  async fn test_probe_outcomes() {
    let existing = InMemoryTrainingService::new().with_endpoint("SalesForecast", "old-config");
    assert_eq!(
      probe_endpoint(&existing, "SalesForecast").await,
      ProbeOutcome::Found
    );

    let empty = InMemoryTrainingService::new();
    assert_eq!(
      probe_endpoint(&empty, "SalesForecast").await,
      ProbeOutcome::NotFound
    );

    let broken = InMemoryTrainingService::new()
      .with_failure("describe_endpoint", ServiceError::unavailable("throttled"));
    assert!(matches!(
      probe_endpoint(&broken, "SalesForecast").await,
      ProbeOutcome::ProbeFailed(_)
    ));
  }

  #[tokio::test]
  async fn test_probe_requires_exact_name() {
    let other = RenamingService {
      described_name: "Other",
    };
    assert_eq!(
      probe_endpoint(&other, "SalesForecast").await,
      ProbeOutcome::NotFound
    );

    let mut ctx = trained();
    check_endpoint(&other, ProbeFailurePolicy::Abort, &mut ctx)
      .await
      .unwrap();
    assert_eq!(ctx.endpoint_exists, Some(false));

    let case_only = RenamingService {
      described_name: "salesforecast",
    };
    assert_eq!(
      probe_endpoint(&case_only, "SalesForecast").await,
      ProbeOutcome::NotFound
    );

    let same = RenamingService {
      described_name: "SalesForecast",
    };
    assert_eq!(
      probe_endpoint(&same, "SalesForecast").await,
      ProbeOutcome::Found
    );
  }

  #[test]
  fn test_probe_failure_policies() {
    let failed = ProbeOutcome::ProbeFailed("throttled".to_string());

    assert!(!resolve_probe(failed.clone(), ProbeFailurePolicy::AssumeAbsent, "ep").unwrap());
    assert!(matches!(
      resolve_probe(failed, ProbeFailurePolicy::Abort, "ep"),
      Err(WorkflowError::EndpointProbe { .. })
    ));
    assert!(resolve_probe(ProbeOutcome::Found, ProbeFailurePolicy::Abort, "ep").unwrap());
    assert!(!resolve_probe(ProbeOutcome::NotFound, ProbeFailurePolicy::Abort, "ep").unwrap());
  }

  #[tokio::test]
  async fn test_check_endpoint_defaults_to_absent_on_failure() {
    let service = InMemoryTrainingService::new()
      .with_failure("describe_endpoint", ServiceError::rejected("access denied"));
    let mut ctx = trained();

    check_endpoint(&service, ProbeFailurePolicy::default(), &mut ctx)
      .await
      .unwrap();

    assert_eq!(ctx.endpoint_exists, Some(false));
  }

  #[tokio::test]
  async fn test_create_then_update_endpoint() {
    let service = InMemoryTrainingService::new();
    let mut ctx = trained();
    ctx.endpoint_config_arn = Some("arn:config".to_string());

    create_endpoint(&service, &mut ctx).await.unwrap();
    let created = service.endpoint("SalesForecast").unwrap();
    assert_eq!(created.endpoint_config_name, "SalesForecast-42");
    assert_eq!(ctx.endpoint_arn.as_deref(), Some(created.endpoint_arn.as_str()));

    ctx.training_job_name = "SalesForecast-43".to_string();
    update_endpoint(&service, &mut ctx).await.unwrap();
    let updated = service.endpoint("SalesForecast").unwrap();
    assert_eq!(updated.endpoint_config_name, "SalesForecast-43");
  }

  #[tokio::test]
  async fn test_create_existing_endpoint_fails() {
    let service = InMemoryTrainingService::new().with_endpoint("SalesForecast", "old-config");
    let mut ctx = trained();
    ctx.endpoint_config_arn = Some("arn:config".to_string());

    let err = create_endpoint(&service, &mut ctx).await.unwrap_err();
    assert!(matches!(
      err,
      WorkflowError::Service {
        operation: "create_endpoint",
        ..
      }
    ));
  }
}
