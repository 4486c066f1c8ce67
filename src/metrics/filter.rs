//! Row filters and the values offered for them.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::dates::row_date;
use crate::resolve::find_column;
use crate::sheets::Row;

/// Header spellings of the alias (sender persona) column.
pub const ALIAS_COLUMNS: [&str; 2] = ["Alias", "Aliases"];

const CATEGORY_KEYWORDS: [&str; 3] = ["category", "type", "edm"];
const REGION_KEYWORDS: [&str; 2] = ["region", "location"];
const ALIAS_KEYWORDS: [&str; 1] = ["alias"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateRange {
  #[default]
  #[serde(rename = "all")]
  All,
  #[serde(rename = "7d")]
  Last7Days,
  #[serde(rename = "30d")]
  Last30Days,
  #[serde(rename = "custom")]
  Custom,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Filters {
  pub date_range: DateRange,
  pub custom_start_date: Option<NaiveDate>,
  pub custom_end_date: Option<NaiveDate>,
  /// `"all"` or empty means no filter, for the three below
  pub alias: Option<String>,
  pub category: Option<String>,
  pub region: Option<String>,
}

fn active(value: &Option<String>) -> Option<&str> {
  value
    .as_deref()
    .map(str::trim)
    .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
}

impl Filters {
  /// Inclusive date window, relative to `today`. `None` bounds are open.
  fn window(&self, today: NaiveDate) -> (Option<NaiveDate>, Option<NaiveDate>) {
    match self.date_range {
      DateRange::All => (None, None),
      DateRange::Last7Days => (Some(today - Duration::days(7)), Some(today)),
      DateRange::Last30Days => (Some(today - Duration::days(30)), Some(today)),
      DateRange::Custom => (self.custom_start_date, self.custom_end_date),
    }
  }

  pub fn matches(&self, row: &Row, today: NaiveDate) -> bool {
    if self.date_range != DateRange::All {
      let Some(Ok(date)) = row_date(row, today.year()) else {
        return false;
      };
      let (from, to) = self.window(today);
      if from.is_some_and(|f| date < f) || to.is_some_and(|t| date > t) {
        return false;
      }
    }

    if let Some(alias) = active(&self.alias) {
      let headers: Vec<&str> = row.fields().map(|(h, _)| h).collect();
      let value = find_column(&headers[..], &ALIAS_COLUMNS).and_then(|c| row.get(c));
      if value.map(str::trim) != Some(alias) {
        return false;
      }
    }

    for wanted in [active(&self.category), active(&self.region)].into_iter().flatten() {
      if !row.fields().any(|(_, v)| v == wanted) {
        return false;
      }
    }

    true
  }

  pub fn apply<'a>(&self, rows: &[&'a Row], today: NaiveDate) -> Vec<&'a Row> {
    rows
      .iter()
      .copied()
      .filter(|row| self.matches(row, today))
      .collect()
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterOptions {
  pub aliases: Vec<String>,
  pub categories: Vec<String>,
  pub regions: Vec<String>,
}

fn distinct_values<'a>(rows: impl Iterator<Item = &'a Row>, keywords: &[&str]) -> Vec<String> {
  let mut seen: Vec<String> = Vec::new();
  for row in rows {
    for (header, value) in row.fields() {
      let header = header.to_lowercase();
      let value = value.trim();
      if value.is_empty() || !keywords.iter().any(|k| header.contains(k)) {
        continue;
      }
      if !seen.iter().any(|s| s == value) {
        seen.push(value.to_string());
      }
    }
  }
  seen
}

/// Distinct non-empty values of alias, category-like and region-like columns,
/// in first-seen order.
pub fn filter_options(rows: &[&Row]) -> FilterOptions {
  FilterOptions {
    aliases: distinct_values(rows.iter().copied(), &ALIAS_KEYWORDS),
    categories: distinct_values(rows.iter().copied(), &CATEGORY_KEYWORDS),
    regions: distinct_values(rows.iter().copied(), &REGION_KEYWORDS),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 20).unwrap()
  }

  fn rows() -> Vec<Row> {
    vec![
      Row::with_fields(
        "DRIP",
        &[("Date", "2026-03-18"), ("Alias", "Sam"), ("Region", "EMEA"), ("EDM", "Drip")],
      ),
      Row::with_fields(
        "DRIP",
        &[("Date", "1 Mar"), ("Alias", "Ana"), ("Region", "APAC"), ("EDM", "Drip")],
      ),
      Row::with_fields("Calling", &[("Date", ""), ("Alias", "Sam"), ("Region", "EMEA")]),
    ]
  }

  fn run(filters: &Filters, rows: &[Row]) -> Vec<String> {
    let refs: Vec<&Row> = rows.iter().collect();
    filters
      .apply(&refs, today())
      .into_iter()
      .map(|r| r.get("Alias").unwrap_or_default().to_string())
      .collect()
  }

  #[test]
  fn test_default_filters_keep_everything() {
    let rows = rows();
    assert_eq!(run(&Filters::default(), &rows).len(), 3);
  }

  #[test]
  fn test_last_seven_days_drops_old_and_undated() {
    let rows = rows();
    let filters = Filters {
      date_range: DateRange::Last7Days,
      ..Default::default()
    };
    assert_eq!(run(&filters, &rows), vec!["Sam"]);

    let filters = Filters {
      date_range: DateRange::Last30Days,
      ..Default::default()
    };
    assert_eq!(run(&filters, &rows), vec!["Sam", "Ana"]);
  }

  #[test]
  fn test_custom_range_inclusive() {
    let rows = rows();
    let filters = Filters {
      date_range: DateRange::Custom,
      custom_start_date: NaiveDate::from_ymd_opt(2026, 3, 1),
      custom_end_date: NaiveDate::from_ymd_opt(2026, 3, 1),
      ..Default::default()
    };
    assert_eq!(run(&filters, &rows), vec!["Ana"]);
  }

  #[test]
  fn test_alias_and_region() {
    let rows = rows();
    let filters = Filters {
      alias: Some("Sam".to_string()),
      region: Some("EMEA".to_string()),
      ..Default::default()
    };
    assert_eq!(run(&filters, &rows).len(), 2);

    let filters = Filters {
      alias: Some("all".to_string()),
      category: Some("Drip".to_string()),
      ..Default::default()
    };
    assert_eq!(run(&filters, &rows), vec!["Sam", "Ana"]);
  }

  #[test]
  fn test_filters_from_json() {
    let filters: Filters = serde_json::from_str(
      r#"{"dateRange": "custom", "customStartDate": "2026-03-01", "region": "all"}"#,
    )
    .unwrap();
    assert_eq!(filters.date_range, DateRange::Custom);
    assert_eq!(filters.custom_start_date, NaiveDate::from_ymd_opt(2026, 3, 1));
    assert!(filters.custom_end_date.is_none());
    assert!(active(&filters.region).is_none());
  }

  #[test]
  fn test_filter_options() {
    let rows = rows();
    let refs: Vec<&Row> = rows.iter().collect();
    let options = filter_options(&refs);
    assert_eq!(options.aliases, vec!["Sam", "Ana"]);
    assert_eq!(options.regions, vec!["EMEA", "APAC"]);
    assert_eq!(options.categories, vec!["Drip"]);
  }
}
