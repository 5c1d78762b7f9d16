//! Retrain Dataset
//!
//! Converts the row-oriented sales table into the per-series JSON Lines
//! format expected by the forecasting algorithm.
//!
//! # Input
//!
//! ```text
//! date,store,item,demand
//! 2013-01-01,1,1,13
//! 2013-01-01,1,2,33
//! ```
//!
//! # Output
//!
//! One compact JSON object per `(store, item)` series, store-major then
//! item-minor, each terminated by a newline:
//!
//! ```text
//! {"start":"2013-01-01 00:00:00","target":[13],"cat":[0]}
//! {"start":"2013-01-01 00:00:00","target":[33],"cat":[1]}
//! ```
//!
//! # Series indexing
//!
//! [`SeriesIndexing::Ordinal`] (the default) walks stores `1..=S` and items
//! `1..=I`, where `S` and `I` are the number of *distinct* store and item
//! values in the data. A series is matched by comparing those ordinals with
//! the integer identifiers in each row, so data whose identifiers are not a
//! dense `1..=N` range is grouped incorrectly: series for identifiers above
//! `N` are dropped and empty series are emitted in their place.
//! [`SeriesIndexing::Observed`] groups by the identifiers actually present,
//! in first-appearance order, and always yields the same `S x I` shape.

mod error;
mod rows;
mod series;

pub use error::TransformError;
pub use rows::{SalesRow, parse_rows};
pub use series::{Dataset, SERIES_START, SeriesIndexing, TimeSeriesRecord, TransformOptions};

/// Convert a sales CSV into JSON Lines in one call.
pub fn convert_to_json_lines(csv: &str, options: &TransformOptions) -> Result<String, TransformError> {
  Dataset::from_csv(csv, options)?.to_json_lines()
}
