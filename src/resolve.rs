//! Tolerant mapping from loosely named sheet headers to metric values.
//!
//! Sheets are maintained by hand, so the same metric shows up as `Sent`,
//! `Sent ` or `SENT`, and calls as `Calls`, `Call Made` or `Call`. Lookups run
//! in two phases over the candidate spellings:
//!
//! 1. exact match, case-insensitive, ignoring surrounding whitespace
//! 2. substring match in either direction, case-insensitive
//!
//! Within a phase candidates are tried in order, and for each candidate only
//! the first matching header counts.

use crate::sheets::Row;

/// Outcome of a numeric lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
  Found { header: String, value: f64 },
  Missing,
}

impl Resolved {
  pub fn value(&self) -> Option<f64> {
    match self {
      Resolved::Found { value, .. } => Some(*value),
      Resolved::Missing => None,
    }
  }

  pub fn value_or_zero(&self) -> f64 {
    self.value().unwrap_or(0.0)
  }

  pub fn is_found(&self) -> bool {
    matches!(self, Resolved::Found { .. })
  }
}

fn exact_match(header: &str, candidate: &str) -> bool {
  header.trim().to_lowercase() == candidate.trim().to_lowercase()
}

fn substring_match(header: &str, candidate: &str) -> bool {
  // An empty header would be contained in every candidate
  if header.trim().is_empty() {
    return false;
  }
  let header = header.to_lowercase();
  let candidate = candidate.to_lowercase();
  header.contains(&candidate) || candidate.contains(&header)
}

/// Strict numeric coercion of a cell.
pub fn parse_number(raw: &str) -> Option<f64> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return None;
  }
  trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Resolve a numeric value from a row.
///
/// A header that matches but holds an empty or non-numeric cell does not
/// stop the search.
pub fn resolve_numeric(row: &Row, candidates: &[&str]) -> Resolved {
  for matcher in [exact_match as fn(&str, &str) -> bool, substring_match] {
    for candidate in candidates {
      let Some((header, raw)) = row.fields().find(|(h, _)| matcher(h, candidate)) else {
        continue;
      };
      if let Some(value) = parse_number(raw) {
        return Resolved::Found {
          header: header.to_string(),
          value,
        };
      }
    }
  }
  Resolved::Missing
}

/// Find the header a set of candidate spellings refers to, without looking
/// at any values.
pub fn find_column<'a, S: AsRef<str>>(headers: &'a [S], candidates: &[&str]) -> Option<&'a str> {
  for matcher in [exact_match as fn(&str, &str) -> bool, substring_match] {
    for candidate in candidates {
      if let Some(found) = headers.iter().find(|h| matcher(h.as_ref(), candidate)) {
        return Some(found.as_ref());
      }
    }
  }
  None
}

/// First non-empty value among exact-named fields.
pub fn first_text<'a>(row: &'a Row, names: &[&str]) -> Option<&'a str> {
  names
    .iter()
    .filter_map(|name| row.get(name))
    .map(str::trim)
    .find(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_exact_match_ignores_case_and_padding() {
    let row = Row::with_fields("DRIP", &[("Sent ", "120"), ("Open", "30")]);
    assert_eq!(
      resolve_numeric(&row, &["Sent", "sent", "SENT"]),
      Resolved::Found {
        header: "Sent ".to_string(),
        value: 120.0
      }
    );
  }

  #[test]
  fn test_substring_phase_finds_call_made() {
    let row = Row::with_fields("Calling", &[("Call Made", "5")]);
    let resolved = resolve_numeric(&row, &["Calls", "Call", "CALL"]);
    assert_eq!(resolved.value(), Some(5.0));
  }

  #[test]
  fn test_exact_phase_wins_over_substring() {
    let row = Row::with_fields("Calling", &[("Call Made", "5"), ("Calls", "9")]);
    assert_eq!(resolve_numeric(&row, &["Call", "Calls"]).value(), Some(9.0));
  }

  #[test]
  fn test_candidate_order_decides() {
    let row = Row::with_fields("Calling", &[("Calls", "9"), ("Sent", "4")]);
    assert_eq!(resolve_numeric(&row, &["Sent", "Calls"]).value(), Some(4.0));
  }

  #[test]
  fn test_empty_or_text_cell_continues_search() {
    let row = Row::with_fields("Calling", &[("Calls", ""), ("Call Made", "n/a"), ("Sent", "7")]);
    assert_eq!(resolve_numeric(&row, &["Calls", "Call Made", "Sent"]).value(), Some(7.0));

    let row = Row::with_fields("Calling", &[("Calls", "")]);
    assert_eq!(resolve_numeric(&row, &["Calls"]), Resolved::Missing);
  }

  #[test]
  fn test_explicit_zero_is_found() {
    let row = Row::with_fields("DRIP", &[("Leads", "0")]);
    let resolved = resolve_numeric(&row, &["Leads"]);
    assert!(resolved.is_found());
    assert_eq!(resolved.value_or_zero(), 0.0);

    let missing = resolve_numeric(&row, &["Open"]);
    assert!(!missing.is_found());
    assert_eq!(missing.value_or_zero(), 0.0);
  }

  #[test]
  fn test_empty_header_does_not_match_everything() {
    let row = Row::with_fields("DRIP", &[("", "3")]);
    assert_eq!(resolve_numeric(&row, &["Sent"]), Resolved::Missing);
  }

  #[test]
  fn test_parse_number() {
    assert_eq!(parse_number(" 12.5 "), Some(12.5));
    assert_eq!(parse_number("-3"), Some(-3.0));
    assert_eq!(parse_number(""), None);
    assert_eq!(parse_number("1,200"), None);
    assert_eq!(parse_number("inf"), None);
    assert_eq!(parse_number("NaN"), None);
  }

  #[test]
  fn test_find_column() {
    let headers = vec!["From Date".to_string(), "Alias Name".to_string(), "EDM".to_string()];
    assert_eq!(find_column(&headers[..], &["alias"]), Some("Alias Name"));
    assert_eq!(find_column(&headers[..], &["edm", "category"]), Some("EDM"));
    assert_eq!(find_column(&headers[..], &["Region"]), None);
  }

  #[test]
  fn test_first_text() {
    let row = Row::with_fields("DRIP", &[("From Date", " "), ("To Date", "3 Jan")]);
    assert_eq!(first_text(&row, &["From Date", "To Date", "Date"]), Some("3 Jan"));
    assert_eq!(first_text(&row, &["Date"]), None);
  }
}
