/// Errors raised while converting the sales table.
///
/// Line numbers are 1-based and count the header.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
  #[error("source data is not valid UTF-8: {0}")]
  Encoding(#[from] std::str::Utf8Error),

  #[error("malformed CSV: {0}")]
  Csv(#[from] csv::Error),

  #[error("line {line}: expected {expected} columns, found {found}")]
  ColumnCount {
    line: usize,
    expected: usize,
    found: usize,
  },

  #[error("line {line}: {column} '{value}' is not an integer identifier")]
  InvalidIdentifier {
    line: usize,
    column: &'static str,
    value: String,
  },

  #[error("line {line}: demand '{value}' is not numeric")]
  InvalidDemand { line: usize, value: String },

  #[error("failed to serialize series: {0}")]
  Serialize(#[from] serde_json::Error),
}
