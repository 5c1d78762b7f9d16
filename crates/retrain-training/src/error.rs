//! Service errors.

/// Errors returned by a [`TrainingService`](crate::TrainingService).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ServiceError {
  /// The named resource does not exist.
  #[error("{resource} '{name}' not found")]
  NotFound { resource: String, name: String },

  /// The request was rejected (bad permissions, malformed request, conflict).
  #[error("request rejected: {message}")]
  Rejected { message: String },

  /// The service could not be reached or throttled the request.
  #[error("service unavailable: {message}")]
  Unavailable { message: String },
}

impl ServiceError {
  pub fn not_found(resource: impl Into<String>, name: impl Into<String>) -> Self {
    Self::NotFound {
      resource: resource.into(),
      name: name.into(),
    }
  }

  pub fn rejected(message: impl Into<String>) -> Self {
    Self::Rejected {
      message: message.into(),
    }
  }

  pub fn unavailable(message: impl Into<String>) -> Self {
    Self::Unavailable {
      message: message.into(),
    }
  }

  /// Whether this error means the resource is absent.
  pub fn is_not_found(&self) -> bool {
    matches!(self, Self::NotFound { .. })
  }
}
