//! Paced, cache-first sheet fetching.

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::cache::{CacheLayer, CacheStorage, Cacheable, ConfiguredStorage};
use crate::config::{Config, FetchConfig, SheetConfig, SourceConfig};

use super::cache::batch_key;
use super::client::RangeReader;
use super::error::SheetError;
use super::types::SheetBatch;

/// Reads configured sheets through the response cache.
///
/// Remote calls within one batch run strictly one after another, with a fixed
/// pause between them. Cache hits cost neither a call nor a pause.
pub struct SheetFetcher<R: RangeReader, S: CacheStorage = ConfiguredStorage> {
  reader: R,
  cache: CacheLayer<S>,
  sources: Vec<SourceConfig>,
  column_span: String,
  pacing: Duration,
  /// Sheet keys whose quota error has been logged already
  quota_logged: Mutex<HashSet<String>>,
}

impl<R: RangeReader> SheetFetcher<R> {
  pub fn new(reader: R, config: &Config) -> Self {
    let cache =
      CacheLayer::new(ConfiguredStorage::new(config.cache.enabled)).with_ttl(config.cache.ttl());
    Self::with_cache(reader, cache, config.sources.clone(), &config.fetch)
  }
}

impl<R: RangeReader, S: CacheStorage> SheetFetcher<R, S> {
  pub fn with_cache(
    reader: R,
    cache: CacheLayer<S>,
    sources: Vec<SourceConfig>,
    fetch: &FetchConfig,
  ) -> Self {
    Self {
      reader,
      cache,
      sources,
      column_span: fetch.column_span.clone(),
      pacing: fetch.pacing(),
      quota_logged: Mutex::new(HashSet::new()),
    }
  }

  pub fn sources(&self) -> &[SourceConfig] {
    &self.sources
  }

  pub fn source(&self, id: &str) -> Option<&SourceConfig> {
    self.sources.iter().find(|s| s.id == id)
  }

  #[cfg(test)]
  pub(crate) fn reader(&self) -> &R {
    &self.reader
  }

  /// Fetch every sheet of the given sources, in declared order.
  ///
  /// Unknown source ids are skipped. A failing sheet is logged and left out;
  /// only credential problems fail the whole call.
  pub async fn fetch_all(&self, source_ids: &[String]) -> Result<Vec<SheetBatch>, SheetError> {
    let mut batches = Vec::new();
    let mut remote_calls = 0usize;

    for source_id in source_ids {
      let Some(source) = self.source(source_id) else {
        warn!(source_id = %source_id, "unknown source, skipping");
        continue;
      };

      for sheet in &source.sheets {
        let key = batch_key(&source.id, &sheet.name);

        match self.cache.get::<SheetBatch>(&key) {
          Ok(Some(hit)) => {
            debug!(key = %key, cached_at = ?hit.cached_at, "cache hit");
            batches.push(hit.data);
            continue;
          }
          Ok(None) => {}
          Err(e) => warn!(key = %key, error = %e, "cache lookup failed, treating as miss"),
        }

        if remote_calls > 0 {
          tokio::time::sleep(self.pacing).await;
        }
        remote_calls += 1;

        match self.read_batch(source, sheet).await {
          Ok(Some(batch)) => {
            if let Err(e) = self.cache.put(&batch.cache_key(), &batch) {
              warn!(key = %key, error = %e, "failed to cache sheet");
            }
            batches.push(batch);
          }
          Ok(None) => debug!(key = %key, "sheet is empty, skipping"),
          Err(e) if e.is_fatal() => return Err(e),
          Err(e) => {
            self.report_failure(&key, &e);
          }
        }
      }
    }

    info!(
      sources = source_ids.len(),
      sheets = batches.len(),
      remote_calls,
      "batch fetch finished"
    );
    Ok(batches)
  }

  /// Fetch one sheet through the cache. Errors are returned to the caller.
  ///
  /// `None` means the sheet exists but holds no rows.
  pub async fn fetch_sheet(
    &self,
    source: &SourceConfig,
    sheet: &SheetConfig,
  ) -> Result<Option<SheetBatch>, SheetError> {
    let key = batch_key(&source.id, &sheet.name);
    let result = self
      .cache
      .fetch_one(&key, || self.read_batch(source, sheet))
      .await?;

    Ok(result.map(|r| {
      debug!(key = %key, cached = r.is_cached(), "sheet fetched");
      r.data
    }))
  }

  async fn read_batch(
    &self,
    source: &SourceConfig,
    sheet: &SheetConfig,
  ) -> Result<Option<SheetBatch>, SheetError> {
    let range = a1_range(&sheet.name, &self.column_span);
    debug!(source = %source.id, range = %range, "reading range");

    let values = self.reader.read_range(&source.spreadsheet_id, &range).await?;
    Ok(SheetBatch::from_values(
      &source.id,
      &sheet.name,
      values,
      Utc::now(),
    ))
  }

  /// Log a per-sheet failure. Quota errors are logged once per sheet for the
  /// life of the process; returns whether anything was logged.
  fn report_failure(&self, key: &str, err: &SheetError) -> bool {
    if err.is_rate_limited() {
      let first = self
        .quota_logged
        .lock()
        .map(|mut seen| seen.insert(key.to_string()))
        .unwrap_or(true);
      if first {
        warn!(key, error = %err, "quota exceeded; repeats for this sheet will not be logged");
      }
      return first;
    }

    match err {
      SheetError::PermissionDenied(_) => {
        error!(key, error = %err, "permission denied; is the sheet shared with the service account?");
        true
      }
      SheetError::NotFound(_) => {
        error!(key, error = %err, "sheet or spreadsheet not found");
        true
      }
      _ => {
        error!(key, error = %err, "failed to fetch sheet");
        true
      }
    }
  }
}

/// A1 range for a whole column span of one tab. Names that are not plain
/// alphanumerics are quoted, with embedded quotes doubled.
pub fn a1_range(sheet_name: &str, column_span: &str) -> String {
  if sheet_name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
    format!("{}!{}", sheet_name, column_span)
  } else {
    format!("'{}'!{}", sheet_name.replace('\'', "''"), column_span)
  }
}
