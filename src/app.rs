//! HTTP surface: sheet fetch endpoints and the dashboard report.

use axum::{
  extract::{
    rejection::{JsonRejection, QueryRejection},
    Query, State,
  },
  http::StatusCode,
  response::{IntoResponse, Response},
  routing::{get, post},
  Json, Router,
};
use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::cache::{Clock, SystemClock};
use crate::config::{Config, SheetConfig};
use crate::metrics::channel::{Campaign, Classifier};
use crate::metrics::filter::Filters;
use crate::metrics::table::TableRequest;
use crate::metrics::{DashboardReport, ReportOptions};
use crate::refresh;
use crate::sheets::types::fingerprint;
use crate::sheets::{RangeReader, Row, SheetBatch, SheetError, SheetFetcher, SheetsClient};

/// Shared by every request.
pub struct AppState<R: RangeReader> {
  pub fetcher: Arc<SheetFetcher<R>>,
  pub classifier: Classifier,
  /// Decides what "today" is for date filters
  pub clock: Arc<dyn Clock>,
}

impl<R: RangeReader> AppState<R> {
  pub fn new(fetcher: SheetFetcher<R>, clock: Arc<dyn Clock>) -> Self {
    let classifier = Classifier::new(fetcher.sources());
    Self {
      fetcher: Arc::new(fetcher),
      classifier,
      clock,
    }
  }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum ApiError {
  #[error("{0}")]
  BadRequest(String),

  #[error("{0}")]
  NotFound(String),

  #[error(transparent)]
  Sheet(#[from] SheetError),
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::Sheet(e) if e.is_fatal() => StatusCode::INTERNAL_SERVER_ERROR,
      ApiError::Sheet(SheetError::RateLimited(_)) => StatusCode::TOO_MANY_REQUESTS,
      ApiError::Sheet(SheetError::PermissionDenied(_)) => StatusCode::FORBIDDEN,
      ApiError::Sheet(SheetError::NotFound(_)) => StatusCode::NOT_FOUND,
      ApiError::Sheet(_) => StatusCode::BAD_GATEWAY,
    }
  }

  fn message(&self) -> String {
    match self {
      ApiError::Sheet(e) => match e.remediation() {
        Some(hint) => format!("{} {}", e, hint),
        None => e.to_string(),
      },
      other => other.to_string(),
    }
  }
}

#[derive(Serialize)]
struct ErrorBody {
  error: String,
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      error!(status = status.as_u16(), error = %self, "request failed");
    } else {
      warn!(status = status.as_u16(), error = %self, "request rejected");
    }
    (
      status,
      Json(ErrorBody {
        error: self.message(),
      }),
    )
      .into_response()
  }
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self {
    ApiError::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
  }
}

impl From<QueryRejection> for ApiError {
  fn from(rejection: QueryRejection) -> Self {
    ApiError::BadRequest(format!("Invalid query: {}", rejection.body_text()))
  }
}

// ============================================================================
// Request / response types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetQuery {
  pub source_id: String,
  pub sheet_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetResponse {
  pub source_id: String,
  pub sheet_name: String,
  pub headers: Vec<String>,
  pub data: Vec<Row>,
  pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
  pub source_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
  pub data: Vec<SheetBatch>,
  pub last_updated: DateTime<Utc>,
  pub fingerprint: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSummary {
  pub id: String,
  pub name: String,
  pub sheets: Vec<SheetSummary>,
}

#[derive(Debug, Serialize)]
pub struct SheetSummary {
  pub name: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub gid: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub campaign: Option<Campaign>,
}

impl From<&SheetConfig> for SheetSummary {
  fn from(sheet: &SheetConfig) -> Self {
    Self {
      name: sheet.name.clone(),
      gid: sheet.gid.clone(),
      campaign: sheet.campaign,
    }
  }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardRequest {
  pub source_ids: Vec<String>,
  #[serde(default)]
  pub filters: Filters,
  #[serde(default)]
  pub table: Option<TableRequest>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
  #[serde(flatten)]
  pub report: DashboardReport,
  pub last_updated: DateTime<Utc>,
  pub fingerprint: String,
}

// ============================================================================
// Handlers
// ============================================================================

async fn get_sheet<R: RangeReader>(
  State(state): State<Arc<AppState<R>>>,
  query: Result<Query<SheetQuery>, QueryRejection>,
) -> Result<Json<SheetResponse>, ApiError> {
  let Query(query) = query?;

  let source = state
    .fetcher
    .source(&query.source_id)
    .ok_or_else(|| ApiError::BadRequest(format!("Invalid source ID: {}", query.source_id)))?;
  let sheet = source
    .sheet(&query.sheet_name)
    .ok_or_else(|| ApiError::NotFound(format!("Sheet not found: {}", query.sheet_name)))?;

  let response = match state.fetcher.fetch_sheet(source, sheet).await? {
    Some(batch) => SheetResponse {
      source_id: batch.source_id,
      sheet_name: batch.sheet_name,
      headers: batch.headers,
      data: batch.data,
      last_updated: batch.fetched_at,
    },
    None => SheetResponse {
      source_id: source.id.clone(),
      sheet_name: sheet.name.clone(),
      headers: Vec::new(),
      data: Vec::new(),
      last_updated: state.clock.now(),
    },
  };
  Ok(Json(response))
}

async fn fetch_batch<R: RangeReader>(
  State(state): State<Arc<AppState<R>>>,
  body: Result<Json<BatchRequest>, JsonRejection>,
) -> Result<Json<BatchResponse>, ApiError> {
  let Json(request) = body?;
  let batches = state.fetcher.fetch_all(&request.source_ids).await?;

  Ok(Json(BatchResponse {
    fingerprint: fingerprint(&batches),
    data: batches,
    last_updated: state.clock.now(),
  }))
}

async fn list_sources<R: RangeReader>(
  State(state): State<Arc<AppState<R>>>,
) -> Json<Vec<SourceSummary>> {
  let sources = state
    .fetcher
    .sources()
    .iter()
    .map(|source| SourceSummary {
      id: source.id.clone(),
      name: source.display_name().to_string(),
      sheets: source.sheets.iter().map(SheetSummary::from).collect(),
    })
    .collect();
  Json(sources)
}

async fn dashboard<R: RangeReader>(
  State(state): State<Arc<AppState<R>>>,
  body: Result<Json<DashboardRequest>, JsonRejection>,
) -> Result<Json<DashboardResponse>, ApiError> {
  let Json(request) = body?;
  let batches = state.fetcher.fetch_all(&request.source_ids).await?;

  let now = state.clock.now();
  let options = ReportOptions {
    filters: request.filters,
    table: request.table,
  };
  let report = DashboardReport::build(&batches, &state.classifier, &options, now.date_naive());

  Ok(Json(DashboardResponse {
    report,
    last_updated: now,
    fingerprint: fingerprint(&batches),
  }))
}

pub fn router<R: RangeReader>(state: Arc<AppState<R>>) -> Router {
  Router::new()
    .route("/api/sheets", get(get_sheet::<R>).post(fetch_batch::<R>))
    .route("/api/sources", get(list_sources::<R>))
    .route("/api/dashboard", post(dashboard::<R>))
    .layer(TraceLayer::new_for_http())
    .layer(CorsLayer::permissive())
    .with_state(state)
}

/// Serve the API until interrupted.
pub async fn serve(config: &Config, bind: SocketAddr) -> Result<()> {
  let client = SheetsClient::new()?;
  let fetcher = SheetFetcher::new(client, config);
  let state = Arc::new(AppState::new(fetcher, Arc::new(SystemClock)));

  let refresher = config.refresh.interval_secs.map(|secs| {
    refresh::spawn(
      Arc::clone(&state.fetcher),
      std::time::Duration::from_secs(secs),
      config.refresh_sources(),
    )
  });

  let listener = TcpListener::bind(bind)
    .await
    .map_err(|e| eyre!("Failed to bind {}: {}", bind, e))?;
  info!(address = %bind, sources = config.sources.len(), "listening");

  axum::serve(listener, router(state))
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| eyre!("Server error: {}", e))?;

  if let Some(handle) = refresher {
    handle.abort();
  }
  info!("server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    error!(error = %e, "failed to listen for shutdown signal");
  }
}
