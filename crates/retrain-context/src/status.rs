use std::fmt;

use serde::{Deserialize, Serialize};

/// Status of a training job as reported by the training service.
///
/// Values the pipeline does not know about are kept verbatim in `Other`
/// so they can be surfaced in errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TrainingJobStatus {
  InProgress,
  Completed,
  Failed,
  Stopping,
  Stopped,
  Other(String),
}

impl TrainingJobStatus {
  /// The wire representation used by the training service.
  pub fn as_str(&self) -> &str {
    match self {
      Self::InProgress => "InProgress",
      Self::Completed => "Completed",
      Self::Failed => "Failed",
      Self::Stopping => "Stopping",
      Self::Stopped => "Stopped",
      Self::Other(value) => value,
    }
  }
}

impl From<&str> for TrainingJobStatus {
  fn from(value: &str) -> Self {
    match value {
      "InProgress" => Self::InProgress,
      "Completed" => Self::Completed,
      "Failed" => Self::Failed,
      "Stopping" => Self::Stopping,
      "Stopped" => Self::Stopped,
      other => Self::Other(other.to_string()),
    }
  }
}

impl From<String> for TrainingJobStatus {
  fn from(value: String) -> Self {
    Self::from(value.as_str())
  }
}

impl From<TrainingJobStatus> for String {
  fn from(status: TrainingJobStatus) -> Self {
    status.as_str().to_string()
  }
}

impl fmt::Display for TrainingJobStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_known_statuses_parse() {
    assert_eq!(TrainingJobStatus::from("InProgress"), TrainingJobStatus::InProgress);
    assert_eq!(TrainingJobStatus::from("Completed"), TrainingJobStatus::Completed);
    assert_eq!(TrainingJobStatus::from("Stopped"), TrainingJobStatus::Stopped);
  }

  #[test]
  fn test_unknown_status_is_preserved() {
    let status = TrainingJobStatus::from("Interrupted");
    assert_eq!(status, TrainingJobStatus::Other("Interrupted".to_string()));
    assert_eq!(status.to_string(), "Interrupted");
  }

  #[test]
  fn test_serializes_as_plain_string() {
    let json = serde_json::to_string(&TrainingJobStatus::Failed).unwrap();
    assert_eq!(json, "\"Failed\"");

    let parsed: TrainingJobStatus = serde_json::from_str("\"InProgress\"").unwrap();
    assert_eq!(parsed, TrainingJobStatus::InProgress);
  }
}
