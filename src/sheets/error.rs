//! Errors raised while reading sheets.
//!
//! Classified by how a batch reacts:
//! - Fatal: credentials missing, malformed or rejected. The whole request fails.
//! - Per-sheet: quota, permission, not-found and everything else. Logged and skipped.

use thiserror::Error;

use super::api_types::ApiErrorResponse;
use crate::config::CREDENTIAL_VARS;

#[derive(Debug, Error)]
pub enum SheetError {
  #[error("Service account credentials are not configured")]
  MissingCredentials,

  #[error("Invalid service account JSON: {0}")]
  InvalidCredentials(String),

  #[error("Could not obtain an access token: {0}")]
  Auth(String),

  #[error("Quota exceeded: {0}")]
  RateLimited(String),

  #[error("Permission denied: {0}")]
  PermissionDenied(String),

  #[error("Not found: {0}")]
  NotFound(String),

  #[error("Sheets API error {status}: {message}")]
  Api { status: u16, message: String },

  #[error("HTTP: {0}")]
  Http(#[from] reqwest::Error),

  #[error("Unexpected response: {0}")]
  Decode(String),
}

impl SheetError {
  /// Classify a non-success response of the Sheets API.
  pub fn from_response(status: u16, body: &str) -> Self {
    let parsed = serde_json::from_str::<ApiErrorResponse>(body).ok();
    let (status, api_status, message) = match parsed {
      Some(p) => {
        let code = if p.error.code != 0 { p.error.code } else { status };
        (code, p.error.status, p.error.message)
      }
      None => (status, String::new(), body.trim().to_string()),
    };
    let message = if message.is_empty() {
      format!("HTTP {}", status)
    } else {
      message
    };
    let lower = message.to_lowercase();

    if status == 429
      || api_status == "RESOURCE_EXHAUSTED"
      || lower.contains("quota")
      || lower.contains("rate limit")
    {
      SheetError::RateLimited(message)
    } else if status == 401 || api_status == "UNAUTHENTICATED" {
      SheetError::Auth(message)
    } else if status == 403 || api_status == "PERMISSION_DENIED" {
      SheetError::PermissionDenied(message)
    } else if status == 404
      || api_status == "NOT_FOUND"
      || (status == 400 && lower.contains("unable to parse range"))
    {
      // A missing tab comes back as 400 "Unable to parse range"
      SheetError::NotFound(message)
    } else {
      SheetError::Api { status, message }
    }
  }

  /// Errors that abort a whole batch instead of a single sheet.
  pub fn is_fatal(&self) -> bool {
    matches!(
      self,
      SheetError::MissingCredentials | SheetError::InvalidCredentials(_) | SheetError::Auth(_)
    )
  }

  pub fn is_rate_limited(&self) -> bool {
    matches!(self, SheetError::RateLimited(_))
  }

  /// What an operator should do about it, if anything obvious.
  pub fn remediation(&self) -> Option<String> {
    match self {
      SheetError::MissingCredentials => Some(format!(
        "Set {} (or {}) to the service account JSON.",
        CREDENTIAL_VARS[0], CREDENTIAL_VARS[1]
      )),
      SheetError::InvalidCredentials(_) => {
        Some("Check that the service account variable holds the full key JSON.".to_string())
      }
      SheetError::Auth(_) => {
        Some("Check that the service account key is valid and not revoked.".to_string())
      }
      SheetError::PermissionDenied(_) => {
        Some("Share the spreadsheet with the service account email.".to_string())
      }
      SheetError::RateLimited(_) => Some("Wait a minute and refresh.".to_string()),
      _ => None,
    }
  }
}
