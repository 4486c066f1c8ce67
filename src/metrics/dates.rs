//! Loose date parsing and calendar bucketing.
//!
//! Sheet dates are typed by hand: `2025-08-04`, `8/4/2025`, `Aug 4, 2025`,
//! and often just `4 Aug` with no year. Standard formats are tried first; the
//! year-less `<day> <month>` form falls back to the supplied current year.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Weekday};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

use super::channel::{Campaign, ClassifiedRow};
use super::funnel::{calls, CLICK, OPEN, SENT};
use crate::resolve::{first_text, resolve_numeric};
use crate::sheets::Row;

/// Fields holding a row's date, in preference order.
pub const DATE_FIELDS: [&str; 3] = ["From Date", "To Date", "Date"];

const MONTH_ABBR: [&str; 12] = [
  "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

const DATE_FORMATS: &[&str] = &[
  "%Y-%m-%d",
  "%m/%d/%Y",
  "%B %d, %Y",
  "%B %d %Y",
  "%d %B %Y",
  "%d %B, %Y",
];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DateParseError {
  #[error("empty date")]
  Empty,
  #[error("unrecognized date: {0}")]
  Unrecognized(String),
  #[error("no such day: {0}")]
  OutOfRange(String),
}

fn month_number(name: &str) -> Option<u32> {
  let month = match name.trim_end_matches(['.', ',']).to_lowercase().as_str() {
    "january" | "jan" => 1,
    "february" | "feb" => 2,
    "march" | "mar" => 3,
    "april" | "apr" => 4,
    "may" => 5,
    "june" | "jun" => 6,
    "july" | "jul" => 7,
    "august" | "aug" => 8,
    "september" | "sep" | "sept" => 9,
    "october" | "oct" => 10,
    "november" | "nov" => 11,
    "december" | "dec" => 12,
    _ => return None,
  };
  Some(month)
}

fn parse_standard(raw: &str) -> Option<NaiveDate> {
  if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
    return Some(dt.date_naive());
  }
  if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
    return Some(dt.date_naive());
  }
  if let Some(dt) = DATETIME_FORMATS
    .iter()
    .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())
  {
    return Some(dt.date());
  }
  DATE_FORMATS
    .iter()
    .find_map(|f| NaiveDate::parse_from_str(raw, f).ok())
}

/// Parse a sheet date. `current_year` completes dates written without one.
pub fn parse_date(raw: &str, current_year: i32) -> Result<NaiveDate, DateParseError> {
  let raw = raw.trim();
  if raw.is_empty() {
    return Err(DateParseError::Empty);
  }
  if let Some(date) = parse_standard(raw) {
    return Ok(date);
  }

  // "<day> <month-name>", e.g. "21 July" or "1 Aug"
  let mut tokens = raw.split_whitespace();
  let (Some(day), Some(month)) = (tokens.next(), tokens.next()) else {
    return Err(DateParseError::Unrecognized(raw.to_string()));
  };
  let digits: String = day.chars().take_while(char::is_ascii_digit).collect();
  let (Ok(day), Some(month)) = (digits.parse::<u32>(), month_number(month)) else {
    return Err(DateParseError::Unrecognized(raw.to_string()));
  };

  NaiveDate::from_ymd_opt(current_year, month, day)
    .ok_or_else(|| DateParseError::OutOfRange(raw.to_string()))
}

/// Date of a row: the first non-empty date field, parsed. `None` when the row
/// has no date at all.
pub fn row_date(row: &Row, current_year: i32) -> Option<Result<NaiveDate, DateParseError>> {
  first_text(row, &DATE_FIELDS).map(|raw| parse_date(raw, current_year))
}

fn first_of_month(year: i32, month: u32) -> Option<NaiveDate> {
  NaiveDate::from_ymd_opt(year, month, 1)
}

fn days_in_month(year: i32, month: u32) -> u32 {
  let next = if month == 12 {
    first_of_month(year + 1, 1)
  } else {
    first_of_month(year, month + 1)
  };
  next
    .and_then(|d| d.pred_opt())
    .map(|d| d.day())
    .unwrap_or(31)
}

/// Weekday of the 1st, Monday = 1 through Sunday = 7.
fn first_weekday(year: i32, month: u32) -> u32 {
  first_of_month(year, month)
    .map(|d| d.weekday())
    .unwrap_or(Weekday::Mon)
    .number_from_monday()
}

/// Week of the month a date falls in. Weeks start on Monday; the partial
/// week holding the 1st is week 1.
pub fn week_of_month(date: NaiveDate) -> u32 {
  let offset = first_weekday(date.year(), date.month());
  (date.day() + offset - 1).div_ceil(7)
}

/// `"D Mon - D Mon"` span of a week of the month, clipped to the month.
pub fn week_label(year: i32, month: u32, week: u32) -> String {
  let offset = first_weekday(year, month) as i64;
  let start = 1 - (offset - 1) + (week as i64 - 1) * 7;
  let first = start.max(1);
  let last = (start + 6).min(days_in_month(year, month) as i64);
  let abbr = MONTH_ABBR[(month as usize).saturating_sub(1) % 12];
  format!("{} {} - {} {}", first, abbr, last, abbr)
}

// ============================================================================
// Series
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyPoint {
  pub label: String,
  pub year: i32,
  pub month: u32,
  pub week: u32,
  pub calls: f64,
  pub linkedin: f64,
  pub email: f64,
}

#[derive(Default)]
struct WeekTotals {
  calls: f64,
  linkedin: f64,
  email: f64,
}

/// Outreach volume per week of month: calls, LinkedIn sent and email sent.
/// Rows without a usable date are left out.
pub fn weekly_activity(rows: &[ClassifiedRow], current_year: i32) -> Vec<WeeklyPoint> {
  let mut weeks: BTreeMap<(i32, u32, u32), WeekTotals> = BTreeMap::new();

  for r in rows {
    let Some(Ok(date)) = row_date(r.row, current_year) else {
      continue;
    };
    let totals = weeks
      .entry((date.year(), date.month(), week_of_month(date)))
      .or_default();
    match r.campaign {
      Some(Campaign::Calling) => totals.calls += calls(r.row),
      Some(Campaign::LinkedIn) => totals.linkedin += resolve_numeric(r.row, SENT).value_or_zero(),
      Some(Campaign::OneToOneEmail | Campaign::Drip) => {
        totals.email += resolve_numeric(r.row, SENT).value_or_zero()
      }
      None => {}
    }
  }

  weeks
    .into_iter()
    .map(|((year, month, week), t)| WeeklyPoint {
      label: week_label(year, month, week),
      year,
      month,
      week,
      calls: t.calls,
      linkedin: t.linkedin,
      email: t.email,
    })
    .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyPoint {
  /// `YYYY-MM`
  pub month: String,
  pub sent: f64,
  pub open: f64,
  pub click: f64,
}

/// How many months the engagement series keeps, counting back from the latest.
pub const ENGAGEMENT_MONTHS: usize = 6;

/// Sent, open and click per calendar month, most recent months only.
pub fn monthly_engagement<'a>(
  rows: impl IntoIterator<Item = &'a Row>,
  current_year: i32,
) -> Vec<MonthlyPoint> {
  let mut months: BTreeMap<String, MonthlyPoint> = BTreeMap::new();

  for row in rows {
    let Some(Ok(date)) = row_date(row, current_year) else {
      continue;
    };
    let key = format!("{:04}-{:02}", date.year(), date.month());
    let point = months.entry(key.clone()).or_insert_with(|| MonthlyPoint {
      month: key,
      sent: 0.0,
      open: 0.0,
      click: 0.0,
    });
    point.sent += resolve_numeric(row, SENT).value_or_zero();
    point.open += resolve_numeric(row, OPEN).value_or_zero();
    point.click += resolve_numeric(row, CLICK).value_or_zero();
  }

  let skip = months.len().saturating_sub(ENGAGEMENT_MONTHS);
  months.into_values().skip(skip).collect()
}
