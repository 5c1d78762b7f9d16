use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::{Error, ParameterStore, select};

/// In-memory parameter store.
///
/// Counts lookups so callers can assert how often the store was consulted.
#[derive(Debug, Default)]
pub struct InMemoryParameterStore {
  values: HashMap<String, String>,
  reads: AtomicUsize,
}

impl InMemoryParameterStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Builder-style insert.
  pub fn with(mut self, name: &str, value: &str) -> Self {
    self.set(name, value);
    self
  }

  /// Set a value.
  pub fn set(&mut self, name: &str, value: &str) {
    self.values.insert(name.to_string(), value.to_string());
  }

  /// Number of `get_parameters` calls served so far.
  pub fn reads(&self) -> usize {
    self.reads.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl ParameterStore for InMemoryParameterStore {
  async fn get_parameters(&self, names: &[&str]) -> Result<HashMap<String, String>, Error> {
    self.reads.fetch_add(1, Ordering::SeqCst);
    select(&self.values, names)
  }
}
