//! Retrain Training
//!
//! The contract the retrain pipeline consumes from a managed training and
//! hosting service: submit a training job, poll its status, register the
//! resulting model, and publish it behind a named endpoint.
//!
//! The [`TrainingService`] trait is vendor-neutral. Requests are plain data
//! types so implementations can map them onto whatever API they front.
//! [`InMemoryTrainingService`] is a local simulator that records every call.

mod error;
mod memory;
mod types;

pub use error::ServiceError;
pub use memory::{InMemoryTrainingService, ServiceCall};
pub use types::{
  AlgorithmSpecification, Channel, CompressionType, EndpointConfigRequest, EndpointDescription,
  EndpointRequest, ModelRequest, ProductionVariant, ResourceConfig, S3DataDistribution,
  S3DataSource, S3DataType, TrainingInputMode, TrainingJobRequest,
};

use async_trait::async_trait;
use retrain_context::TrainingJobStatus;

/// Managed training and hosting operations used by the pipeline.
///
/// Every call is a single request; implementations must not retry
/// internally. Transient failures are reported as errors and left to the
/// host's retry policy.
#[async_trait]
pub trait TrainingService: Send + Sync {
  /// Submit a training job. Returns the job identifier (ARN).
  async fn create_training_job(&self, request: &TrainingJobRequest) -> Result<String, ServiceError>;

  /// Query the current status of a training job by name.
  async fn describe_training_job(&self, job_name: &str)
  -> Result<TrainingJobStatus, ServiceError>;

  /// Register a model artifact. Returns the model identifier.
  async fn create_model(&self, request: &ModelRequest) -> Result<String, ServiceError>;

  /// Create an endpoint configuration. Returns its identifier.
  async fn create_endpoint_config(
    &self,
    request: &EndpointConfigRequest,
  ) -> Result<String, ServiceError>;

  /// Describe a named endpoint.
  ///
  /// Returns [`ServiceError::NotFound`] when no endpoint has that name.
  async fn describe_endpoint(&self, endpoint_name: &str)
  -> Result<EndpointDescription, ServiceError>;

  /// Create a new endpoint. Returns its identifier.
  async fn create_endpoint(&self, request: &EndpointRequest) -> Result<String, ServiceError>;

  /// Point an existing endpoint at a new configuration. Returns its identifier.
  async fn update_endpoint(&self, request: &EndpointRequest) -> Result<String, ServiceError>;
}
