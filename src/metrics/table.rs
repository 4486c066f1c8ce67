use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::resolve::parse_number;
use crate::sheets::{Row, SheetBatch};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
  Asc,
  #[default]
  Desc,
}

/// Which rows the table shows and how they are ordered.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableRequest {
  /// Restrict to one sheet; all sheets when unset or `"all"`
  pub sheet: Option<String>,
  pub sort_by: Option<String>,
  pub sort_order: SortOrder,
}

#[derive(Debug, Clone, Serialize)]
pub struct Table {
  pub headers: Vec<String>,
  pub rows: Vec<Row>,
}

/// Visible headers: one sheet's, or the union over all batches in first-seen
/// order. Synthetic `_`-prefixed names are never shown.
pub fn table_headers(batches: &[SheetBatch], sheet: Option<&str>) -> Vec<String> {
  let mut headers: Vec<String> = Vec::new();
  for batch in batches {
    if sheet.is_some_and(|s| s != batch.sheet_name) {
      continue;
    }
    for header in &batch.headers {
      if !header.starts_with('_') && !headers.contains(header) {
        headers.push(header.clone());
      }
    }
  }
  headers
}

/// Numbers compare numerically when both cells parse, as text when neither
/// does. A number orders before any text, so mixed columns still sort totally.
pub fn compare_cells(a: &str, b: &str) -> Ordering {
  match (parse_number(a), parse_number(b)) {
    (Some(x), Some(y)) => x.total_cmp(&y),
    (Some(_), None) => Ordering::Less,
    (None, Some(_)) => Ordering::Greater,
    (None, None) => a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b)),
  }
}

pub fn sort_rows(rows: &mut [&Row], column: &str, order: SortOrder) {
  rows.sort_by(|a, b| {
    let ord = compare_cells(a.get(column).unwrap_or(""), b.get(column).unwrap_or(""));
    match order {
      SortOrder::Asc => ord,
      SortOrder::Desc => ord.reverse(),
    }
  });
}

pub fn build_table(batches: &[SheetBatch], rows: &[&Row], request: &TableRequest) -> Table {
  let sheet = request
    .sheet
    .as_deref()
    .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("all"));

  let mut selected: Vec<&Row> = rows
    .iter()
    .copied()
    .filter(|row| sheet.map_or(true, |s| row.sheet_name == s))
    .collect();

  if let Some(column) = request.sort_by.as_deref().filter(|c| !c.is_empty()) {
    sort_rows(&mut selected, column, request.sort_order);
  }

  Table {
    headers: table_headers(batches, sheet),
    rows: selected.into_iter().cloned().collect(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::sheets::testing::strings;
  use crate::sheets::types::flatten;
  use chrono::Utc;

  fn batches() -> Vec<SheetBatch> {
    vec![
      SheetBatch::from_values(
        "s1",
        "DRIP",
        vec![
          strings(&["Name", "Sent"]),
          strings(&["b", "9"]),
          strings(&["A", "10"]),
        ],
        Utc::now(),
      )
      .unwrap(),
      SheetBatch::from_values(
        "s1",
        "Calling",
        vec![strings(&["Name", "Calls", "_hidden"]), strings(&["c", "x"])],
        Utc::now(),
      )
      .unwrap(),
    ]
  }

  fn names(table: &Table) -> Vec<&str> {
    table.rows.iter().map(|r| r.get("Name").unwrap()).collect()
  }

  #[test]
  fn test_headers_union_skips_synthetic() {
    let b = batches();
    assert_eq!(table_headers(&b, None), vec!["Name", "Sent", "Calls"]);
    assert_eq!(table_headers(&b, Some("Calling")), vec!["Name", "Calls"]);
  }

  #[test]
  fn test_numeric_sort_descending_by_default() {
    let b = batches();
    let refs = flatten(&b);
    let request = TableRequest {
      sort_by: Some("Sent".to_string()),
      ..Default::default()
    };
    let table = build_table(&b, &refs, &request);
    // The calling row has no Sent; text sorts after numbers, so first when descending
    assert_eq!(names(&table), vec!["c", "A", "b"]);
  }

  #[test]
  fn test_text_sort_and_sheet_selection() {
    let b = batches();
    let refs = flatten(&b);
    let request = TableRequest {
      sheet: Some("DRIP".to_string()),
      sort_by: Some("Name".to_string()),
      sort_order: SortOrder::Asc,
    };
    let table = build_table(&b, &refs, &request);
    assert_eq!(names(&table), vec!["A", "b"]);
    assert_eq!(table.headers, vec!["Name", "Sent"]);
  }

  #[test]
  fn test_compare_cells() {
    assert_eq!(compare_cells("9", "10"), Ordering::Less);
    assert_eq!(compare_cells("9", "x"), Ordering::Less);
    assert_eq!(compare_cells("1a", "10"), Ordering::Greater);
    assert_eq!(compare_cells("", "5"), Ordering::Greater);
    assert_eq!(compare_cells("apple", "Banana"), Ordering::Less);
  }
}
