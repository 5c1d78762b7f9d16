//! Local training service simulator.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use retrain_context::TrainingJobStatus;
use tracing::debug;

use crate::error::ServiceError;
use crate::types::{
  EndpointConfigRequest, EndpointDescription, EndpointRequest, ModelRequest, TrainingJobRequest,
};
use crate::TrainingService;

/// A recorded call against the simulator.
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceCall {
  CreateTrainingJob(TrainingJobRequest),
  DescribeTrainingJob(String),
  CreateModel(ModelRequest),
  CreateEndpointConfig(EndpointConfigRequest),
  DescribeEndpoint(String),
  CreateEndpoint(EndpointRequest),
  UpdateEndpoint(EndpointRequest),
}

impl ServiceCall {
  /// Operation name, as used by [`InMemoryTrainingService::with_failure`].
  pub fn operation(&self) -> &'static str {
    match self {
      Self::CreateTrainingJob(_) => "create_training_job",
      Self::DescribeTrainingJob(_) => "describe_training_job",
      Self::CreateModel(_) => "create_model",
      Self::CreateEndpointConfig(_) => "create_endpoint_config",
      Self::DescribeEndpoint(_) => "describe_endpoint",
      Self::CreateEndpoint(_) => "create_endpoint",
      Self::UpdateEndpoint(_) => "update_endpoint",
    }
  }
}

#[derive(Debug, Default)]
struct Inner {
  /// Job name -> number of status queries served.
  jobs: HashMap<String, usize>,
  models: HashMap<String, ModelRequest>,
  endpoint_configs: HashMap<String, EndpointConfigRequest>,
  endpoints: HashMap<String, EndpointDescription>,
  calls: Vec<ServiceCall>,
}

/// In-memory training and hosting service.
///
/// Every training job reports the configured status script, one entry per
/// status query; the last entry repeats once the script is exhausted.
/// Endpoints behave like the real service: creating an existing endpoint or
/// updating a missing one is rejected.
#[derive(Debug)]
pub struct InMemoryTrainingService {
  region: String,
  status_script: Vec<TrainingJobStatus>,
  failures: HashMap<&'static str, ServiceError>,
  inner: Mutex<Inner>,
}

impl Default for InMemoryTrainingService {
  fn default() -> Self {
    Self::new()
  }
}

impl InMemoryTrainingService {
  /// A simulator whose jobs complete on the first status query.
  pub fn new() -> Self {
    Self {
      region: "local".to_string(),
      status_script: vec![TrainingJobStatus::Completed],
      failures: HashMap::new(),
      inner: Mutex::new(Inner::default()),
    }
  }

  /// Report `InProgress` for the first `polls` queries, then `Completed`.
  pub fn with_in_progress_polls(self, polls: usize) -> Self {
    let mut script = vec![TrainingJobStatus::InProgress; polls];
    script.push(TrainingJobStatus::Completed);
    self.with_status_script(script)
  }

  /// Replace the status script. An empty script behaves like `[Completed]`.
  pub fn with_status_script(mut self, script: Vec<TrainingJobStatus>) -> Self {
    self.status_script = if script.is_empty() {
      vec![TrainingJobStatus::Completed]
    } else {
      script
    };
    self
  }

  /// Region used when minting resource identifiers.
  pub fn with_region(mut self, region: &str) -> Self {
    self.region = region.to_string();
    self
  }

  /// Seed an endpoint that already exists before the run.
  pub fn with_endpoint(self, endpoint_name: &str, endpoint_config_name: &str) -> Self {
    let description = EndpointDescription {
      endpoint_name: endpoint_name.to_string(),
      endpoint_arn: self.arn("endpoint", endpoint_name),
      endpoint_config_name: endpoint_config_name.to_string(),
    };
    self
      .lock()
      .endpoints
      .insert(endpoint_name.to_string(), description);
    self
  }

  /// Seed a training job that was submitted before this instance existed.
  ///
  /// Its status queries start at the beginning of the status script.
  pub fn with_job(self, job_name: &str) -> Self {
    self.lock().jobs.entry(job_name.to_string()).or_insert(0);
    self
  }

  /// Make every call to `operation` fail with `error`.
  pub fn with_failure(mut self, operation: &'static str, error: ServiceError) -> Self {
    self.failures.insert(operation, error);
    self
  }

  /// All calls received so far, in order.
  pub fn calls(&self) -> Vec<ServiceCall> {
    self.lock().calls.clone()
  }

  /// The current description of an endpoint, if it exists.
  pub fn endpoint(&self, endpoint_name: &str) -> Option<EndpointDescription> {
    self.lock().endpoints.get(endpoint_name).cloned()
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
    self.inner.lock().unwrap_or_else(|e| e.into_inner())
  }

  fn arn(&self, resource: &str, name: &str) -> String {
    format!(
      "arn:aws:sagemaker:{}:000000000000:{}/{}",
      self.region,
      resource,
      name.to_lowercase()
    )
  }

  /// Record the call and return the injected failure for it, if any.
  fn record(&self, inner: &mut Inner, call: ServiceCall) -> Result<(), ServiceError> {
    let operation = call.operation();
    debug!(operation, "training service call");
    inner.calls.push(call);
    match self.failures.get(operation) {
      Some(error) => Err(error.clone()),
      None => Ok(()),
    }
  }
}

#[async_trait]
impl TrainingService for InMemoryTrainingService {
  async fn create_training_job(&self, request: &TrainingJobRequest) -> Result<String, ServiceError> {
    let mut inner = self.lock();
    self.record(&mut inner, ServiceCall::CreateTrainingJob(request.clone()))?;

    if inner.jobs.contains_key(&request.job_name) {
      return Err(ServiceError::rejected(format!(
        "training job '{}' already exists",
        request.job_name
      )));
    }
    inner.jobs.insert(request.job_name.clone(), 0);
    Ok(self.arn("training-job", &request.job_name))
  }

  async fn describe_training_job(
    &self,
    job_name: &str,
  ) -> Result<TrainingJobStatus, ServiceError> {
    let mut inner = self.lock();
    self.record(&mut inner, ServiceCall::DescribeTrainingJob(job_name.to_string()))?;

    let polls = inner
      .jobs
      .get_mut(job_name)
      .ok_or_else(|| ServiceError::not_found("training job", job_name))?;
    let index = (*polls).min(self.status_script.len() - 1);
    *polls += 1;
    Ok(self.status_script[index].clone())
  }

  async fn create_model(&self, request: &ModelRequest) -> Result<String, ServiceError> {
    let mut inner = self.lock();
    self.record(&mut inner, ServiceCall::CreateModel(request.clone()))?;

    inner
      .models
      .insert(request.model_name.clone(), request.clone());
    Ok(self.arn("model", &request.model_name))
  }

  async fn create_endpoint_config(
    &self,
    request: &EndpointConfigRequest,
  ) -> Result<String, ServiceError> {
    let mut inner = self.lock();
    self.record(&mut inner, ServiceCall::CreateEndpointConfig(request.clone()))?;

    for variant in &request.production_variants {
      if !inner.models.contains_key(&variant.model_name) {
        return Err(ServiceError::rejected(format!(
          "could not find model '{}'",
          variant.model_name
        )));
      }
    }
    inner
      .endpoint_configs
      .insert(request.endpoint_config_name.clone(), request.clone());
    Ok(self.arn("endpoint-config", &request.endpoint_config_name))
  }

  async fn describe_endpoint(
    &self,
    endpoint_name: &str,
  ) -> Result<EndpointDescription, ServiceError> {
    let mut inner = self.lock();
    self.record(&mut inner, ServiceCall::DescribeEndpoint(endpoint_name.to_string()))?;

    inner
      .endpoints
      .get(endpoint_name)
      .cloned()
      .ok_or_else(|| ServiceError::not_found("endpoint", endpoint_name))
  }

  async fn create_endpoint(&self, request: &EndpointRequest) -> Result<String, ServiceError> {
    let mut inner = self.lock();
    self.record(&mut inner, ServiceCall::CreateEndpoint(request.clone()))?;

    if inner.endpoints.contains_key(&request.endpoint_name) {
      return Err(ServiceError::rejected(format!(
        "cannot create already existing endpoint '{}'",
        request.endpoint_name
      )));
    }
    let description = EndpointDescription {
      endpoint_name: request.endpoint_name.clone(),
      endpoint_arn: self.arn("endpoint", &request.endpoint_name),
      endpoint_config_name: request.endpoint_config_name.clone(),
    };
    let arn = description.endpoint_arn.clone();
    inner
      .endpoints
      .insert(request.endpoint_name.clone(), description);
    Ok(arn)
  }

  async fn update_endpoint(&self, request: &EndpointRequest) -> Result<String, ServiceError> {
    let mut inner = self.lock();
    self.record(&mut inner, ServiceCall::UpdateEndpoint(request.clone()))?;

    let endpoint = inner
      .endpoints
      .get_mut(&request.endpoint_name)
      .ok_or_else(|| ServiceError::not_found("endpoint", &request.endpoint_name))?;
    endpoint.endpoint_config_name = request.endpoint_config_name.clone();
    Ok(endpoint.endpoint_arn.clone())
  }
}
