use csv::StringRecord;
use serde_json::Number;

use crate::error::TransformError;

const COLUMNS: usize = 4;

/// One parsed row of the sales table.
#[derive(Debug, Clone, PartialEq)]
pub struct SalesRow {
  /// 1-based line number in the source, counting the header.
  pub line: usize,
  pub date: String,
  pub store: String,
  pub item: String,
  /// Integral demand stays an integer so it serializes without a fraction.
  pub demand: Number,
}

impl SalesRow {
  /// The store identifier as an integer.
  pub fn store_id(&self) -> Result<i64, TransformError> {
    parse_identifier(self.line, "store", &self.store)
  }

  /// The item identifier as an integer.
  pub fn item_id(&self) -> Result<i64, TransformError> {
    parse_identifier(self.line, "item", &self.item)
  }
}

/// Parse `date,store,item,demand` rows.
///
/// The first record is always treated as the header and skipped, whatever
/// its shape. Blank lines are ignored, fields may be quoted and surrounding
/// whitespace is trimmed. Every data row must have exactly four columns.
pub fn parse_rows(text: &str) -> Result<Vec<SalesRow>, TransformError> {
  let mut reader = csv::ReaderBuilder::new()
    .has_headers(true)
    .flexible(true)
    .trim(csv::Trim::All)
    .from_reader(text.as_bytes());

  reader
    .records()
    .map(|record| {
      let record = record.map_err(TransformError::from)?;
      let line = record.position().map_or(0, |p| p.line() as usize);
      parse_row(line, &record)
    })
    .collect()
}

fn parse_row(line: usize, record: &StringRecord) -> Result<SalesRow, TransformError> {
  if record.len() != COLUMNS {
    return Err(TransformError::ColumnCount {
      line,
      expected: COLUMNS,
      found: record.len(),
    });
  }

  Ok(SalesRow {
    line,
    date: record[0].to_string(),
    store: record[1].to_string(),
    item: record[2].to_string(),
    demand: parse_demand(line, &record[3])?,
  })
}

fn parse_demand(line: usize, value: &str) -> Result<Number, TransformError> {
  if let Ok(integer) = value.parse::<i64>() {
    return Ok(Number::from(integer));
  }

  value
    .parse::<f64>()
    .ok()
    .and_then(Number::from_f64)
    .ok_or_else(|| TransformError::InvalidDemand {
      line,
      value: value.to_string(),
    })
}

fn parse_identifier(line: usize, column: &'static str, value: &str) -> Result<i64, TransformError> {
  value
    .parse::<i64>()
    .map_err(|_| TransformError::InvalidIdentifier {
      line,
      column,
      value: value.to_string(),
    })
}
