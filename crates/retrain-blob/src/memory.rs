use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use crate::{ByteStream, Error, Store, collect, stream_from_bytes};

/// A stored object with the content type it was written with.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
  pub data: Bytes,
  pub content_type: String,
}

/// In-memory blob store.
///
/// Suitable for tests and single-process runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
  objects: Mutex<HashMap<(String, String), StoredObject>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Seed an object directly, bypassing the stream interface.
  pub fn insert(&self, bucket: &str, key: &str, data: impl Into<Bytes>, content_type: &str) {
    let mut objects = self.objects.lock().unwrap_or_else(|e| e.into_inner());
    objects.insert(
      (bucket.to_string(), key.to_string()),
      StoredObject {
        data: data.into(),
        content_type: content_type.to_string(),
      },
    );
  }

  /// Look up an object without going through the stream interface.
  pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
    let objects = self.objects.lock().unwrap_or_else(|e| e.into_inner());
    objects
      .get(&(bucket.to_string(), key.to_string()))
      .cloned()
  }

  /// Number of stored objects.
  pub fn len(&self) -> usize {
    self.objects.lock().unwrap_or_else(|e| e.into_inner()).len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

#[async_trait]
impl Store for MemoryStore {
  async fn get(&self, bucket: &str, key: &str) -> Result<ByteStream, Error> {
    let object = self.object(bucket, key).ok_or_else(|| Error::NotFound {
      bucket: bucket.to_string(),
      key: key.to_string(),
    })?;
    Ok(stream_from_bytes(object.data))
  }

  async fn put(
    &self,
    bucket: &str,
    key: &str,
    data: ByteStream,
    content_type: &str,
  ) -> Result<(), Error> {
    let data = collect(data).await?;
    self.insert(bucket, key, data, content_type);
    Ok(())
  }
}
