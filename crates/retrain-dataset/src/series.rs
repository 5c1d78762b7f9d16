use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Number;

use crate::rows::{SalesRow, parse_rows};
use crate::error::TransformError;

/// Start timestamp written on every series: the first day of the dataset.
pub const SERIES_START: &str = "2013-01-01 00:00:00";

/// How rows are assigned to `(store, item)` series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesIndexing {
  /// Match integer identifiers against ordinals `1..=distinct count`.
  #[default]
  Ordinal,
  /// Group by the identifier values present, in first-appearance order.
  Observed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformOptions {
  /// Value of the `start` field on every record.
  pub series_start: String,
  pub indexing: SeriesIndexing,
}

impl Default for TransformOptions {
  fn default() -> Self {
    Self {
      series_start: SERIES_START.to_string(),
      indexing: SeriesIndexing::default(),
    }
  }
}

/// One training record: a single `(store, item)` demand series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesRecord {
  pub start: String,
  pub target: Vec<Number>,
  /// Dense 0-based category index, not the store or item identifier.
  pub cat: [usize; 1],
}

/// The converted training dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
  pub total_stores: usize,
  pub total_items: usize,
  /// Exactly `total_stores * total_items` records, store-major.
  pub records: Vec<TimeSeriesRecord>,
}

impl Dataset {
  /// Parse the sales CSV and group it into series.
  pub fn from_csv(csv: &str, options: &TransformOptions) -> Result<Self, TransformError> {
    let rows = parse_rows(csv)?;
    Self::from_rows(&rows, options)
  }

  /// Group already-parsed rows into series.
  pub fn from_rows(rows: &[SalesRow], options: &TransformOptions) -> Result<Self, TransformError> {
    let stores = distinct_in_order(rows.iter().map(|r| r.store.as_str()));
    let items = distinct_in_order(rows.iter().map(|r| r.item.as_str()));

    let targets = match options.indexing {
      SeriesIndexing::Ordinal => ordinal_targets(rows, stores.len(), items.len())?,
      SeriesIndexing::Observed => observed_targets(rows, &stores, &items),
    };

    let records = targets
      .into_iter()
      .enumerate()
      .map(|(category, target)| TimeSeriesRecord {
        start: options.series_start.clone(),
        target,
        cat: [category],
      })
      .collect();

    Ok(Self {
      total_stores: stores.len(),
      total_items: items.len(),
      records,
    })
  }

  /// Serialize every record as one compact JSON object per line.
  pub fn to_json_lines(&self) -> Result<String, TransformError> {
    let mut output = String::new();
    for record in &self.records {
      output.push_str(&serde_json::to_string(record)?);
      output.push('\n');
    }
    Ok(output)
  }
}

/// Targets for stores `1..=total_stores` x items `1..=total_items`.
fn ordinal_targets(
  rows: &[SalesRow],
  total_stores: usize,
  total_items: usize,
) -> Result<Vec<Vec<Number>>, TransformError> {
  let mut by_pair: HashMap<(i64, i64), Vec<Number>> = HashMap::new();
  for row in rows {
    let key = (row.store_id()?, row.item_id()?);
    by_pair.entry(key).or_default().push(row.demand.clone());
  }

  let mut targets = Vec::with_capacity(total_stores * total_items);
  for store in 1..=total_stores as i64 {
    for item in 1..=total_items as i64 {
      targets.push(by_pair.remove(&(store, item)).unwrap_or_default());
    }
  }
  Ok(targets)
}

/// Targets for the cross product of observed store and item identifiers.
fn observed_targets(rows: &[SalesRow], stores: &[&str], items: &[&str]) -> Vec<Vec<Number>> {
  let mut by_pair: HashMap<(&str, &str), Vec<Number>> = HashMap::new();
  for row in rows {
    by_pair
      .entry((row.store.as_str(), row.item.as_str()))
      .or_default()
      .push(row.demand.clone());
  }

  stores
    .iter()
    .flat_map(|store| items.iter().map(move |item| (*store, *item)))
    .map(|pair| by_pair.remove(&pair).unwrap_or_default())
    .collect()
}

fn distinct_in_order<'a>(values: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
  let mut seen = HashSet::new();
  values.filter(|value| seen.insert(*value)).collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn csv(rows: &[(&str, u32, u32, u32)]) -> String {
    let mut out = String::from("date,store,item,demand\n");
    for (date, store, item, demand) in rows {
      out.push_str(&format!("{date},{store},{item},{demand}\n"));
    }
    out
  }

  fn targets(dataset: &Dataset) -> Vec<Vec<u64>> {
    dataset
      .records
      .iter()
      .map(|r| r.target.iter().filter_map(Number::as_u64).collect())
      .collect()
  }

  #[test]
  fn test_emits_stores_times_items_with_dense_categories() {
    let mut rows = Vec::new();
    for store in 1..=3 {
      for item in 1..=4 {
        rows.push(("2013-01-01", store, item, store * 10 + item));
      }
    }

    let dataset = Dataset::from_csv(&csv(&rows), &TransformOptions::default()).unwrap();

    assert_eq!(dataset.total_stores, 3);
    assert_eq!(dataset.total_items, 4);
    assert_eq!(dataset.records.len(), 12);
    let categories: Vec<usize> = dataset.records.iter().map(|r| r.cat[0]).collect();
    assert_eq!(categories, (0..12).collect::<Vec<_>>());
  }

  #[test]
  fn test_store_major_item_minor_order_and_row_order() {
    // Rows deliberately interleaved and out of series order.
    let data = csv(&[
      ("2013-01-01", 2, 1, 21),
      ("2013-01-01", 1, 2, 12),
      ("2013-01-01", 1, 1, 11),
      ("2013-01-02", 1, 1, 110),
      ("2013-01-02", 2, 2, 220),
      ("2013-01-02", 1, 2, 120),
      ("2013-01-01", 2, 2, 22),
      ("2013-01-02", 2, 1, 210),
    ]);

    let dataset = Dataset::from_csv(&data, &TransformOptions::default()).unwrap();

    assert_eq!(
      targets(&dataset),
      vec![vec![11, 110], vec![12, 120], vec![21, 210], vec![220, 22]]
    );
  }

  #[test]
  fn test_ordinal_indexing_with_sparse_identifiers() {
    // Stores 1 and 5: two distinct stores, so ordinals 1..=2 are visited and
    // store 5's rows never match.
    let data = csv(&[("2013-01-01", 1, 1, 3), ("2013-01-01", 5, 1, 9)]);

    let dataset = Dataset::from_csv(&data, &TransformOptions::default()).unwrap();

    assert_eq!(dataset.records.len(), 2);
    assert_eq!(targets(&dataset), vec![vec![3], vec![]]);
  }

  #[test]
  fn test_observed_indexing_with_sparse_identifiers() {
    let data = csv(&[
      ("2013-01-01", 5, 7, 1),
      ("2013-01-01", 1, 7, 2),
      ("2013-01-02", 5, 7, 3),
    ]);
    let options = TransformOptions {
      indexing: SeriesIndexing::Observed,
      ..TransformOptions::default()
    };

    let dataset = Dataset::from_csv(&data, &options).unwrap();

    assert_eq!(targets(&dataset), vec![vec![1, 3], vec![2]]);
    assert_eq!(dataset.records[1].cat, [1]);
  }

  #[test]
  fn test_ordinal_indexing_rejects_non_integer_identifiers() {
    let err = Dataset::from_csv("h\n2013-01-01,A,1,4\n", &TransformOptions::default()).unwrap_err();
    assert!(matches!(err, TransformError::InvalidIdentifier { line: 2, column: "store", .. }));
  }

  #[test]
  fn test_json_lines_are_compact_and_newline_terminated() {
    let dataset = Dataset::from_csv(
      &csv(&[("2013-01-01", 1, 1, 4)]),
      &TransformOptions {
        series_start: "2017-06-01 00:00:00".to_string(),
        indexing: SeriesIndexing::Ordinal,
      },
    )
    .unwrap();

    assert_eq!(
      dataset.to_json_lines().unwrap(),
      "{\"start\":\"2017-06-01 00:00:00\",\"target\":[4],\"cat\":[0]}\n"
    );
  }

  #[test]
  fn test_empty_table_produces_empty_output() {
    let dataset = Dataset::from_csv("date,store,item,demand\n", &TransformOptions::default()).unwrap();
    assert!(dataset.records.is_empty());
    assert_eq!(dataset.to_json_lines().unwrap(), "");
  }
}
