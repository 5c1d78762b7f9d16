use retrain_blob::{Store, collect, stream_from_bytes};
use retrain_context::RunContext;
use retrain_dataset::{Dataset, TransformOptions};
use tracing::{info, instrument};

use crate::error::WorkflowError;

/// Key the training dataset is written to inside the training bucket.
pub const TRAINING_FILE_KEY: &str = "SageMaker/train.json";
pub const TRAINING_FILE_CONTENT_TYPE: &str = "application/json";

/// Convert the raw sales CSV into the JSON Lines training file.
///
/// The whole output is built before anything is written, so a parse failure
/// leaves the training bucket untouched.
#[instrument(
  name = "transform_data",
  skip_all,
  fields(bucket = %ctx.results_bucket, key = %ctx.source_csv_path)
)]
pub async fn transform_data(
  blobs: &dyn Store,
  options: &TransformOptions,
  ctx: &mut RunContext,
) -> Result<(), WorkflowError> {
  let stream = blobs.get(&ctx.results_bucket, &ctx.source_csv_path).await?;
  let raw = collect(stream).await?;
  let csv = std::str::from_utf8(&raw).map_err(retrain_dataset::TransformError::from)?;

  let dataset = Dataset::from_csv(csv, options)?;
  let output = dataset.to_json_lines()?;

  info!(
    total_stores = dataset.total_stores,
    total_items = dataset.total_items,
    records = dataset.records.len(),
    bytes = output.len(),
    "converted sales data"
  );

  blobs
    .put(
      &ctx.training_bucket,
      TRAINING_FILE_KEY,
      stream_from_bytes(output),
      TRAINING_FILE_CONTENT_TYPE,
    )
    .await?;

  ctx.training_file_json = Some(TRAINING_FILE_KEY.to_string());
  Ok(())
}
