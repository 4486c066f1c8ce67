//! Serde-deserializable types matching Google Sheets API responses.
//!
//! These types are separate from domain types to allow clean deserialization
//! while keeping domain types focused on application needs.

use serde::Deserialize;
use serde_json::Value;

/// Response of `spreadsheets.values.get`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiValueRange {
  #[serde(default)]
  pub range: String,
  /// Absent entirely when the range is empty
  #[serde(default)]
  pub values: Vec<Vec<Value>>,
}

impl ApiValueRange {
  /// Cells as display strings, row-major.
  pub fn into_rows(self) -> Vec<Vec<String>> {
    self
      .values
      .into_iter()
      .map(|row| row.into_iter().map(cell_to_string).collect())
      .collect()
  }
}

fn cell_to_string(value: Value) -> String {
  match value {
    Value::String(s) => s,
    Value::Null => String::new(),
    Value::Bool(b) => if b { "TRUE" } else { "FALSE" }.to_string(),
    other => other.to_string(),
  }
}

// ============================================================================
// Error envelope
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
  pub error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
  #[serde(default)]
  pub code: u16,
  #[serde(default)]
  pub message: String,
  /// Canonical status, e.g. "RESOURCE_EXHAUSTED"
  #[serde(default)]
  pub status: String,
}
