use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// How training data is delivered to the algorithm container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrainingInputMode {
  File,
  Pipe,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmSpecification {
  pub training_image: String,
  pub training_input_mode: TrainingInputMode,
}

/// Compute shape of the training cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceConfig {
  pub instance_count: u32,
  pub instance_type: String,
  pub volume_size_gb: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompressionType {
  None,
  Gzip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum S3DataType {
  S3Prefix,
  ManifestFile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum S3DataDistribution {
  FullyReplicated,
  ShardedByS3Key,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct S3DataSource {
  pub s3_uri: String,
  pub s3_data_type: S3DataType,
  pub distribution: S3DataDistribution,
}

/// A named input channel of a training job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
  pub channel_name: String,
  pub compression: CompressionType,
  pub data_source: S3DataSource,
}

/// Everything needed to submit one training job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingJobRequest {
  pub job_name: String,
  pub algorithm: AlgorithmSpecification,
  pub role_arn: String,
  /// Prefix under which the service writes `{job_name}/output/model.tar.gz`.
  pub output_path: String,
  pub resources: ResourceConfig,
  pub max_runtime_seconds: u32,
  pub hyperparameters: BTreeMap<String, String>,
  pub input_channels: Vec<Channel>,
}

/// Registers a trained model artifact under a name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRequest {
  pub model_name: String,
  pub execution_role_arn: String,
  pub image: String,
  pub model_data_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionVariant {
  pub variant_name: String,
  pub model_name: String,
  pub instance_type: String,
  pub initial_instance_count: u32,
  pub initial_variant_weight: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointConfigRequest {
  pub endpoint_config_name: String,
  pub production_variants: Vec<ProductionVariant>,
}

/// Used for both creating and updating an endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointRequest {
  pub endpoint_name: String,
  pub endpoint_config_name: String,
}

/// What the service reports about an existing endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointDescription {
  pub endpoint_name: String,
  pub endpoint_arn: String,
  pub endpoint_config_name: String,
}
