use std::collections::HashMap;

use retrain_context::RunContext;
use retrain_params::ParameterStore;
use tracing::{debug, instrument};

use crate::error::WorkflowError;

/// Parameter holding the bucket used for both results and training data.
pub const BUCKET_PARAMETER: &str = "/SalesForecast/BucketName";
/// Parameter holding the execution role for training and hosting.
pub const ROLE_PARAMETER: &str = "/SalesForecast/SageMakerRole";
/// Parameter holding the algorithm container image.
pub const IMAGE_PARAMETER: &str = "/SalesForecast/SageMakerTrainingContainer";

pub const DEFAULT_ENDPOINT_NAME: &str = "SalesForecast";
pub const DEFAULT_SOURCE_CSV_PATH: &str = "SageMaker/train.csv";
pub const DEFAULT_REGION: &str = "us-west-2";

/// Fill every empty input field from the parameter store or a literal default.
///
/// Fields the caller already supplied are never overwritten, so applying
/// defaults twice is the same as applying them once. The three parameters
/// are read in a single call whether or not they end up being used.
#[instrument(name = "set_defaults", skip_all)]
pub async fn apply_defaults(
  parameters: &dyn ParameterStore,
  ctx: &mut RunContext,
) -> Result<(), WorkflowError> {
  let names = [BUCKET_PARAMETER, ROLE_PARAMETER, IMAGE_PARAMETER];
  let values = parameters.get_parameters(&names).await?;

  let bucket = parameter(&values, BUCKET_PARAMETER)?;
  let role = parameter(&values, ROLE_PARAMETER)?;
  let image = parameter(&values, IMAGE_PARAMETER)?;

  let mut filled = Vec::new();
  let mut fill = |name: &'static str, field: &mut String, value: &str| {
    if RunContext::fill_if_empty(field, value) {
      filled.push(name);
    }
  };

  fill("results_bucket", &mut ctx.results_bucket, bucket);
  fill("training_bucket", &mut ctx.training_bucket, bucket);
  fill("training_role", &mut ctx.training_role, role);
  fill("training_image", &mut ctx.training_image, image);
  fill("endpoint_name", &mut ctx.endpoint_name, DEFAULT_ENDPOINT_NAME);
  fill("source_csv_path", &mut ctx.source_csv_path, DEFAULT_SOURCE_CSV_PATH);
  fill("region", &mut ctx.region, DEFAULT_REGION);

  debug!(filled = ?filled, "applied defaults");
  Ok(())
}

fn parameter<'a>(values: &'a HashMap<String, String>, name: &str) -> Result<&'a str, WorkflowError> {
  values.get(name).map(String::as_str).ok_or_else(|| {
    WorkflowError::Parameters(retrain_params::Error::NotFound {
      names: vec![name.to_string()],
    })
  })
}

#[cfg(test)]
mod tests {
  use retrain_params::InMemoryParameterStore;

  use super::*;

  fn store() -> InMemoryParameterStore {
    InMemoryParameterStore::new()
      .with(BUCKET_PARAMETER, "sales-bucket")
      .with(ROLE_PARAMETER, "arn:aws:iam::1:role/retrain")
      .with(IMAGE_PARAMETER, "forecasting-deepar:1")
  }

  #[tokio::test]
  async fn test_fills_empty_context() {
    let store = store();
    let mut ctx = RunContext::new();

    apply_defaults(&store, &mut ctx).await.unwrap();

    assert_eq!(ctx.results_bucket, "sales-bucket");
    assert_eq!(ctx.training_bucket, "sales-bucket");
    assert_eq!(ctx.training_role, "arn:aws:iam::1:role/retrain");
    assert_eq!(ctx.training_image, "forecasting-deepar:1");
    assert_eq!(ctx.endpoint_name, "SalesForecast");
    assert_eq!(ctx.source_csv_path, "SageMaker/train.csv");
    assert_eq!(ctx.region, "us-west-2");
    assert!(ctx.training_job_name.is_empty());
    assert_eq!(store.reads(), 1);
  }

  #[tokio::test]
  async fn test_supplied_fields_are_kept() {
    let mut ctx = RunContext {
      results_bucket: "raw".to_string(),
      endpoint_name: "Canary".to_string(),
      ..RunContext::default()
    };

    apply_defaults(&store(), &mut ctx).await.unwrap();

    assert_eq!(ctx.results_bucket, "raw");
    assert_eq!(ctx.training_bucket, "sales-bucket");
    assert_eq!(ctx.endpoint_name, "Canary");
  }

  #[tokio::test]
  async fn test_applying_twice_changes_nothing() {
    let store = store();
    let mut ctx = RunContext::new();
    apply_defaults(&store, &mut ctx).await.unwrap();
    let once = ctx.clone();

    apply_defaults(&store, &mut ctx).await.unwrap();

    assert_eq!(ctx, once);
  }

  #[tokio::test]
  async fn test_missing_parameter_is_fatal() {
    let store = InMemoryParameterStore::new()
      .with(BUCKET_PARAMETER, "sales-bucket")
      .with(ROLE_PARAMETER, "role");
    let mut ctx = RunContext::new();

    let err = apply_defaults(&store, &mut ctx).await.unwrap_err();

    match err {
      WorkflowError::Parameters(retrain_params::Error::NotFound { names }) => {
        assert_eq!(names, vec![IMAGE_PARAMETER.to_string()]);
      }
      other => panic!("unexpected error: {other}"),
    }
    assert_eq!(ctx, RunContext::new());
  }
}
