use color_eyre::{eyre::eyre, Result};
use std::future::Future;
use std::time::Duration;
use tokio::sync::OnceCell;
use url::Url;
use yup_oauth2::authenticator::DefaultAuthenticator;
use yup_oauth2::ServiceAccountAuthenticator;

use crate::config::Config;
use crate::sheets::api_types::ApiValueRange;
use crate::sheets::error::SheetError;

/// Read-only access to spreadsheet cells.
pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets.readonly";

const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/";

/// Something that can read a rectangular range of a spreadsheet.
pub trait RangeReader: Send + Sync + 'static {
  /// Read `range` (A1 notation, e.g. `DRIP!A:Z`) as rows of display strings.
  fn read_range(
    &self,
    spreadsheet_id: &str,
    range: &str,
  ) -> impl Future<Output = std::result::Result<Vec<Vec<String>>, SheetError>> + Send;
}

/// Google Sheets v4 client authenticated as a service account.
///
/// Credentials are read from the environment on first use, so a server can
/// start without them and report the problem per request.
pub struct SheetsClient {
  http: reqwest::Client,
  base_url: Url,
  auth: OnceCell<DefaultAuthenticator>,
}

impl SheetsClient {
  pub fn new() -> Result<Self> {
    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;
    let base_url =
      Url::parse(SHEETS_BASE_URL).map_err(|e| eyre!("Invalid Sheets API URL: {}", e))?;

    Ok(Self {
      http,
      base_url,
      auth: OnceCell::new(),
    })
  }

  async fn authenticator(&self) -> std::result::Result<&DefaultAuthenticator, SheetError> {
    self
      .auth
      .get_or_try_init(|| async {
        let json = Config::get_service_account().ok_or(SheetError::MissingCredentials)?;
        let key = yup_oauth2::parse_service_account_key(json.as_bytes())
          .map_err(|e| SheetError::InvalidCredentials(e.to_string()))?;
        ServiceAccountAuthenticator::builder(key)
          .build()
          .await
          .map_err(|e| SheetError::Auth(e.to_string()))
      })
      .await
  }

  async fn access_token(&self) -> std::result::Result<String, SheetError> {
    let auth = self.authenticator().await?;
    let token = auth
      .token(&[SHEETS_SCOPE])
      .await
      .map_err(|e| SheetError::Auth(e.to_string()))?;

    token
      .token()
      .map(str::to_string)
      .ok_or_else(|| SheetError::Auth("token response carried no access token".to_string()))
  }

  fn values_url(&self, spreadsheet_id: &str, range: &str) -> std::result::Result<Url, SheetError> {
    values_url(&self.base_url, spreadsheet_id, range)
  }
}

/// `{base}/v4/spreadsheets/{id}/values/{range}` with each segment escaped.
fn values_url(base: &Url, spreadsheet_id: &str, range: &str) -> std::result::Result<Url, SheetError> {
  let mut url = base.clone();
  url
    .path_segments_mut()
    .map_err(|_| SheetError::Decode(format!("{} cannot carry a path", base)))?
    .pop_if_empty()
    .extend(["v4", "spreadsheets", spreadsheet_id, "values", range]);
  url.query_pairs_mut().append_pair("majorDimension", "ROWS");
  Ok(url)
}

impl RangeReader for SheetsClient {
  async fn read_range(
    &self,
    spreadsheet_id: &str,
    range: &str,
  ) -> std::result::Result<Vec<Vec<String>>, SheetError> {
    let token = self.access_token().await?;
    let url = self.values_url(spreadsheet_id, range)?;

    let response = self.http.get(url).bearer_auth(token).send().await?;
    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(SheetError::from_response(status.as_u16(), &body));
    }

    let values: ApiValueRange = response
      .json()
      .await
      .map_err(|e| SheetError::Decode(format!("{}: {}", range, e)))?;

    tracing::debug!(range = %values.range, rows = values.values.len(), "range read");
    Ok(values.into_rows())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_values_url_escapes_range() {
    let base = Url::parse(SHEETS_BASE_URL).unwrap();
    let url = values_url(&base, "sheet-id_1", "'1-1 email outreacxh'!A:Z").unwrap();
    assert_eq!(
      url.as_str(),
      "https://sheets.googleapis.com/v4/spreadsheets/sheet-id_1/values/'1-1%20email%20outreacxh'!A:Z?majorDimension=ROWS"
    );
  }

  #[test]
  fn test_values_url_plain_range() {
    let base = Url::parse(SHEETS_BASE_URL).unwrap();
    let url = values_url(&base, "abc", "DRIP!A:Z").unwrap();
    assert_eq!(url.path(), "/v4/spreadsheets/abc/values/DRIP!A:Z");
  }
}
