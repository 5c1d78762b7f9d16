//! Retrain Blob
//!
//! This crate provides the blob storage trait and implementations used by the
//! retrain pipeline. Blobs are addressed by `(bucket, key)` and carry a
//! content type on write.
//!
//! The [`Store`] trait is the seam to the object-storage service. The
//! pipeline only needs `get` and `put`; implementations handle the actual
//! storage (local filesystem, memory, a cloud bucket).
//!
//! The trait uses async streaming so multi-megabyte CSV and JSON Lines
//! objects are not forced through a single buffer by the backend.

mod fs;
mod memory;

pub use fs::FsStore;
pub use memory::{MemoryStore, StoredObject};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use std::pin::Pin;

/// A boxed stream of bytes for blob data.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, Error>> + Send>>;

/// Error type for blob storage operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
  /// The requested object was not found.
  #[error("object not found: {bucket}/{key}")]
  NotFound { bucket: String, key: String },

  /// The bucket or key cannot be mapped onto the backend.
  #[error("invalid object location {bucket}/{key}: {message}")]
  InvalidLocation {
    bucket: String,
    key: String,
    message: String,
  },

  /// An I/O error occurred.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

/// Blob storage trait.
#[async_trait]
pub trait Store: Send + Sync {
  /// Retrieve an object as a stream of bytes.
  async fn get(&self, bucket: &str, key: &str) -> Result<ByteStream, Error>;

  /// Store an object, replacing any existing one at the same location.
  async fn put(
    &self,
    bucket: &str,
    key: &str,
    data: ByteStream,
    content_type: &str,
  ) -> Result<(), Error>;
}

/// Wrap an in-memory buffer as a single-chunk [`ByteStream`].
pub fn stream_from_bytes(data: impl Into<Bytes>) -> ByteStream {
  let data = data.into();
  Box::pin(futures::stream::once(async move { Ok(data) }))
}

/// Drain a [`ByteStream`] into one contiguous buffer.
pub async fn collect(mut stream: ByteStream) -> Result<Bytes, Error> {
  let mut buffer = BytesMut::new();
  while let Some(chunk) = stream.next().await {
    buffer.extend_from_slice(&chunk?);
  }
  Ok(buffer.freeze())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_collect_joins_chunks() {
    let chunks = vec![
      Ok(Bytes::from_static(b"date,store")),
      Ok(Bytes::from_static(b",item,demand\n")),
    ];
    let stream: ByteStream = Box::pin(futures::stream::iter(chunks));

    let data = collect(stream).await.unwrap();
    assert_eq!(&data[..], b"date,store,item,demand\n");
  }

  #[tokio::test]
  async fn test_collect_propagates_stream_errors() {
    let chunks = vec![
      Ok(Bytes::from_static(b"partial")),
      Err(Error::Io(std::io::Error::other("connection reset"))),
    ];
    let stream: ByteStream = Box::pin(futures::stream::iter(chunks));

    assert!(matches!(collect(stream).await, Err(Error::Io(_))));
  }
}
