//! In-memory `RangeReader` for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::time::Instant;

use super::client::RangeReader;
use super::error::SheetError;

#[derive(Debug, Clone)]
pub enum FakeResponse {
  Rows(Vec<Vec<String>>),
  RateLimited,
  PermissionDenied,
  NotFound,
  MissingCredentials,
}

impl FakeResponse {
  fn into_result(self, range: &str) -> Result<Vec<Vec<String>>, SheetError> {
    match self {
      FakeResponse::Rows(rows) => Ok(rows),
      FakeResponse::RateLimited => Err(SheetError::RateLimited(format!("quota for {}", range))),
      FakeResponse::PermissionDenied => Err(SheetError::PermissionDenied(range.to_string())),
      FakeResponse::NotFound => Err(SheetError::NotFound(range.to_string())),
      FakeResponse::MissingCredentials => Err(SheetError::MissingCredentials),
    }
  }
}

/// Answers by A1 range, ignoring the spreadsheet id. Unknown ranges are
/// not found. Every call is recorded with the (tokio) time it was made.
#[derive(Default)]
pub struct FakeReader {
  responses: HashMap<String, FakeResponse>,
  calls: Mutex<Vec<(String, Instant)>>,
}

impl FakeReader {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with(mut self, range: &str, response: FakeResponse) -> Self {
    self.responses.insert(range.to_string(), response);
    self
  }

  pub fn calls(&self) -> Vec<(String, Instant)> {
    self.calls.lock().unwrap().clone()
  }
}

impl RangeReader for FakeReader {
  async fn read_range(
    &self,
    _spreadsheet_id: &str,
    range: &str,
  ) -> Result<Vec<Vec<String>>, SheetError> {
    self
      .calls
      .lock()
      .unwrap()
      .push((range.to_string(), Instant::now()));

    self
      .responses
      .get(range)
      .cloned()
      .unwrap_or(FakeResponse::NotFound)
      .into_result(range)
  }
}

pub fn strings(cells: &[&str]) -> Vec<String> {
  cells.iter().map(|c| c.to_string()).collect()
}

/// A small outreach sheet: a header row and two data rows.
pub fn sheet_values() -> Vec<Vec<String>> {
  vec![
    strings(&["Date", "Sent", "Open", "Click", "Leads"]),
    strings(&["1 Aug", "120", "30", "6", "2"]),
    strings(&["8 Aug", "80", "20", "4", "1"]),
  ]
}
