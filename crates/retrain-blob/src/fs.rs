use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use futures::StreamExt;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;

use crate::{ByteStream, Error, Store};

/// Filesystem-based blob store.
///
/// Each object is stored at `{base_path}/{bucket}/{key}`. Parent directories
/// are created automatically. Content types are not persisted.
pub struct FsStore {
  base_path: PathBuf,
}

impl FsStore {
  /// Create a new filesystem store with the given base path.
  pub fn new(base_path: impl Into<PathBuf>) -> Self {
    Self {
      base_path: base_path.into(),
    }
  }

  fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, Error> {
    let invalid = |message: &str| Error::InvalidLocation {
      bucket: bucket.to_string(),
      key: key.to_string(),
      message: message.to_string(),
    };

    if bucket.is_empty() || bucket.contains(['/', '\\']) || bucket == "." || bucket == ".." {
      return Err(invalid("bucket must be a single path segment"));
    }

    let key_path = Path::new(key);
    if key.is_empty() || !key_path.components().all(|c| matches!(c, Component::Normal(_))) {
      return Err(invalid("key must be a relative path without '..'"));
    }

    Ok(self.base_path.join(bucket).join(key_path))
  }
}

#[async_trait]
impl Store for FsStore {
  async fn get(&self, bucket: &str, key: &str) -> Result<ByteStream, Error> {
    let path = self.object_path(bucket, key)?;
    let file = File::open(&path).await.map_err(|e| {
      if e.kind() == std::io::ErrorKind::NotFound {
        Error::NotFound {
          bucket: bucket.to_string(),
          key: key.to_string(),
        }
      } else {
        Error::Io(e)
      }
    })?;
    let stream = ReaderStream::new(file).map(|r| r.map_err(Error::Io));
    Ok(Box::pin(stream))
  }

  async fn put(
    &self,
    bucket: &str,
    key: &str,
    data: ByteStream,
    _content_type: &str,
  ) -> Result<(), Error> {
    let path = self.object_path(bucket, key)?;

    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).await?;
    }

    // Readers never observe a half-written object.
    let staging = staging_path(&path);
    let result = match write_file(&staging, data).await {
      Ok(()) => fs::rename(&staging, &path).await.map_err(Error::Io),
      Err(e) => Err(e),
    };
    if result.is_err() {
      let _ = fs::remove_file(&staging).await;
    }
    result
  }
}

/// `train.json` stages as `train.json.partial`.
fn staging_path(path: &Path) -> PathBuf {
  let mut name = path.file_name().unwrap_or_default().to_os_string();
  name.push(".partial");
  path.with_file_name(name)
}

async fn write_file(path: &Path, mut data: ByteStream) -> Result<(), Error> {
  let mut file = File::create(path).await?;
  while let Some(chunk) = data.next().await {
    file.write_all(&chunk?).await?;
  }
  file.flush().await?;
  Ok(())
}
