//! Named configuration values for the retrain pipeline.
//!
//! This crate provides:
//! - The [`ParameterStore`] trait, one batched lookup of named values
//! - An in-memory implementation for tests and embedding
//! - A file-backed implementation reading a flat JSON object
//!
//! A lookup fails if any requested name is absent. Missing configuration is a
//! deployment error, so callers are not expected to retry.

mod file;
mod memory;

pub use file::FileParameterStore;
pub use memory::InMemoryParameterStore;

use std::collections::HashMap;

use async_trait::async_trait;

/// Errors that can occur while reading parameters.
#[derive(Debug, thiserror::Error)]
pub enum Error {
  /// One or more requested parameters do not exist.
  #[error("parameters not found: {}", names.join(", "))]
  NotFound { names: Vec<String> },

  /// The backing file could not be read.
  #[error("failed to read parameter file: {0}")]
  Io(#[from] std::io::Error),

  /// The backing file is not a flat JSON object of strings.
  #[error("invalid parameter file: {message}")]
  InvalidFormat { message: String },
}

/// Trait for batched lookup of named configuration values.
#[async_trait]
pub trait ParameterStore: Send + Sync {
  /// Fetch every name in `names` in one call.
  ///
  /// The returned map contains exactly the requested names. If any name is
  /// absent the whole call fails with [`Error::NotFound`].
  async fn get_parameters(&self, names: &[&str]) -> Result<HashMap<String, String>, Error>;
}

/// Select `names` out of `values`, failing with every absent name.
pub(crate) fn select(
  values: &HashMap<String, String>,
  names: &[&str],
) -> Result<HashMap<String, String>, Error> {
  let missing: Vec<String> = names
    .iter()
    .filter(|name| !values.contains_key(**name))
    .map(|name| name.to_string())
    .collect();

  if !missing.is_empty() {
    return Err(Error::NotFound { names: missing });
  }

  Ok(
    names
      .iter()
      .filter_map(|name| values.get(*name).map(|v| (name.to_string(), v.clone())))
      .collect(),
  )
}
