use serde::{Deserialize, Serialize};

use crate::status::TrainingJobStatus;

/// Names of the input fields that must be non-empty before the first
/// side-effecting state runs.
pub const REQUIRED_FIELDS: [&str; 7] = [
  "source_csv_path",
  "results_bucket",
  "training_bucket",
  "training_image",
  "training_role",
  "endpoint_name",
  "region",
];

/// The single mutable record carried through every pipeline state.
///
/// Input fields are plain strings where empty means "not supplied". Derived
/// fields start as `None` and are written by exactly one state each.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunContext {
  /// Key of the raw sales CSV inside the results bucket.
  pub source_csv_path: String,
  /// Bucket holding the raw sales CSV.
  pub results_bucket: String,
  /// Bucket receiving the training dataset and model artifacts.
  pub training_bucket: String,
  /// Training job name, assigned at submission time.
  pub training_job_name: String,
  /// Algorithm container image reference.
  pub training_image: String,
  /// Execution role identity used by training and hosting.
  pub training_role: String,
  /// Name of the serving endpoint to create or update.
  pub endpoint_name: String,
  pub region: String,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub training_file_json: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub training_job_arn: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub training_job_status: Option<TrainingJobStatus>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub model_arn: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub endpoint_config_arn: Option<String>,
  /// `None` until the endpoint has been probed.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub endpoint_exists: Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub endpoint_arn: Option<String>,
}

impl RunContext {
  /// Create an empty context.
  pub fn new() -> Self {
    Self::default()
  }

  /// Required input fields that are currently empty, in declaration order.
  pub fn missing_required(&self) -> Vec<&'static str> {
    let values = [
      &self.source_csv_path,
      &self.results_bucket,
      &self.training_bucket,
      &self.training_image,
      &self.training_role,
      &self.endpoint_name,
      &self.region,
    ];

    REQUIRED_FIELDS
      .iter()
      .zip(values)
      .filter(|(_, value)| value.trim().is_empty())
      .map(|(name, _)| *name)
      .collect()
  }

  /// Overwrite `field` with `value` only if it is currently empty.
  ///
  /// Whitespace counts as a value here, so a blank `" "` is kept and then
  /// rejected by [`RunContext::missing_required`].
  ///
  /// Returns `true` when the field was changed.
  pub fn fill_if_empty(field: &mut String, value: &str) -> bool {
    if field.is_empty() {
      *field = value.to_string();
      true
    } else {
      false
    }
  }
}
