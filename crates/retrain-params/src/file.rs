use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::{Error, ParameterStore, select};

/// Parameter store backed by a JSON file.
///
/// The file holds a flat object mapping parameter names to string values:
///
/// ```json
/// { "/SalesForecast/BucketName": "sales-forecast-data" }
/// ```
///
/// The file is re-read on every lookup so edits take effect without restart.
pub struct FileParameterStore {
  path: PathBuf,
}

impl FileParameterStore {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  async fn load(&self) -> Result<HashMap<String, String>, Error> {
    let content = match tokio::fs::read_to_string(&self.path).await {
      Ok(content) => content,
      // An absent file is an empty store: every lookup reports its names.
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
      Err(e) => return Err(Error::Io(e)),
    };

    serde_json::from_str(&content).map_err(|e| Error::InvalidFormat {
      message: format!("{}: {}", self.path.display(), e),
    })
  }
}

#[async_trait]
impl ParameterStore for FileParameterStore {
  async fn get_parameters(&self, names: &[&str]) -> Result<HashMap<String, String>, Error> {
    let values = self.load().await?;
    select(&values, names)
  }
}
