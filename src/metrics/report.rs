use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::channel::Classifier;
use super::dates::{monthly_engagement, weekly_activity, MonthlyPoint, WeeklyPoint};
use super::filter::{filter_options, FilterOptions, Filters};
use super::funnel::{
  all_funnels, channel_comparison, channel_distribution, kpis, leads_distribution,
  ChannelComparison, ChannelSlice, Funnel, Kpis,
};
use super::table::{build_table, Table, TableRequest};
use crate::sheets::types::flatten;
use crate::sheets::SheetBatch;

/// What to compute besides the fixed views.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReportOptions {
  pub filters: Filters,
  /// Table view; omitted from the report when unset
  pub table: Option<TableRequest>,
}

/// Every derived view of a batch set, after filtering.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardReport {
  pub total_rows: usize,
  pub filtered_rows: usize,
  pub kpis: Kpis,
  pub funnels: Vec<Funnel>,
  pub channel_distribution: Vec<ChannelSlice>,
  pub channel_comparison: ChannelComparison,
  pub leads_distribution: Vec<ChannelSlice>,
  pub weekly_activity: Vec<WeeklyPoint>,
  pub monthly_engagement: Vec<MonthlyPoint>,
  /// Computed over all rows, so choices don't vanish while filtering
  pub filter_options: FilterOptions,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub table: Option<Table>,
}

impl DashboardReport {
  /// `today` anchors relative date ranges and completes year-less dates.
  pub fn build(
    batches: &[SheetBatch],
    classifier: &Classifier,
    options: &ReportOptions,
    today: NaiveDate,
  ) -> Self {
    let all = flatten(batches);
    let rows = options.filters.apply(&all, today);
    let classified = classifier.classify_all(&rows);
    let year = today.year();

    Self {
      total_rows: all.len(),
      filtered_rows: rows.len(),
      kpis: kpis(rows.iter().copied()),
      funnels: all_funnels(&classified),
      channel_distribution: channel_distribution(&classified),
      channel_comparison: channel_comparison(&classified),
      leads_distribution: leads_distribution(&classified),
      weekly_activity: weekly_activity(&classified, year),
      monthly_engagement: monthly_engagement(rows.iter().copied(), year),
      filter_options: filter_options(&all),
      table: options
        .table
        .as_ref()
        .map(|request| build_table(batches, &rows, request)),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::metrics::channel::{Campaign, Channel};
  use crate::metrics::filter::DateRange;
  use crate::sheets::testing::strings;
  use chrono::Utc;

  fn batches() -> Vec<SheetBatch> {
    let now = Utc::now();
    vec![
      SheetBatch::from_values(
        "test-sheet-1",
        "1-1 email outreacxh",
        vec![
          strings(&["From Date", "Sent", "Open", "Click", "Leads", "Alias"]),
          strings(&["3 Jan", "100", "50", "10", "2", "Sam"]),
          strings(&["12 Jan", "60", "30", "3", "1", "Ana"]),
        ],
        now,
      )
      .unwrap(),
      SheetBatch::from_values(
        "test-sheet-1",
        "Calling",
        vec![
          strings(&["Date", "Call Made", "Voicemail", "Connect", "Leads"]),
          strings(&["5 Jan", "40", "10", "8", "1"]),
        ],
        now,
      )
      .unwrap(),
    ]
  }

  fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 14).unwrap()
  }

  #[test]
  fn test_report_over_all_rows() {
    let b = batches();
    let report = DashboardReport::build(&b, &Classifier::default(), &ReportOptions::default(), today());

    assert_eq!(report.total_rows, 3);
    assert_eq!(report.kpis.total_sent, 160.0);
    assert_eq!(report.kpis.total_calls, 200.0);
    assert_eq!(report.kpis.open_rate, 50.0);

    let email = report
      .funnels
      .iter()
      .find(|f| f.campaign == Campaign::OneToOneEmail)
      .unwrap();
    assert_eq!(email.stages[0].value, 160.0);
    let calling = report
      .funnels
      .iter()
      .find(|f| f.campaign == Campaign::Calling)
      .unwrap();
    assert_eq!(calling.stages[0].value, 40.0);

    assert_eq!(report.channel_distribution.len(), 2);
    assert_eq!(report.channel_distribution[1].name, Channel::Calling);
    assert_eq!(report.weekly_activity.len(), 3);
    assert_eq!(report.monthly_engagement[0].month, "2026-01");
    assert_eq!(report.filter_options.aliases, vec!["Sam", "Ana"]);
    assert!(report.table.is_none());
  }

  #[test]
  fn test_filters_narrow_every_view_but_options() {
    let b = batches();
    let options = ReportOptions {
      filters: Filters {
        date_range: DateRange::Last7Days,
        ..Default::default()
      },
      table: Some(TableRequest::default()),
    };
    let report = DashboardReport::build(&b, &Classifier::default(), &options, today());

    assert_eq!(report.filtered_rows, 1);
    assert_eq!(report.kpis.total_sent, 60.0);
    assert_eq!(report.filter_options.aliases.len(), 2);
    let table = report.table.unwrap();
    assert_eq!(table.rows.len(), 1);
    assert!(table.headers.contains(&"Call Made".to_string()));
  }

  #[test]
  fn test_options_from_json() {
    let options: ReportOptions = serde_json::from_str(
      r#"{"filters": {"dateRange": "30d"}, "table": {"sortBy": "Sent", "sortOrder": "asc"}}"#,
    )
    .unwrap();
    assert_eq!(options.filters.date_range, DateRange::Last30Days);
    assert_eq!(options.table.unwrap().sort_by.as_deref(), Some("Sent"));
  }
}
