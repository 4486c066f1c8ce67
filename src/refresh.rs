//! Background cache warming.
//!
//! A single task runs `fetch_all` for the configured sources on a fixed
//! interval. Ticks never overlap: a slow round delays the next one.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::cache::CacheStorage;
use crate::sheets::{RangeReader, SheetFetcher};

/// Start the refresh loop. The first round runs immediately.
pub fn spawn<R, S>(
  fetcher: Arc<SheetFetcher<R, S>>,
  every: Duration,
  sources: Vec<String>,
) -> JoinHandle<()>
where
  R: RangeReader,
  S: CacheStorage + 'static,
{
  info!(
    interval_secs = every.as_secs(),
    sources = ?sources,
    "background refresh enabled"
  );

  tokio::spawn(async move {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
      ticker.tick().await;
      refresh_once(&fetcher, &sources).await;
    }
  })
}

/// One refresh round. Returns how many sheets are now warm.
pub async fn refresh_once<R: RangeReader, S: CacheStorage>(
  fetcher: &SheetFetcher<R, S>,
  sources: &[String],
) -> usize {
  match fetcher.fetch_all(sources).await {
    Ok(batches) => {
      debug!(sheets = batches.len(), "refresh round done");
      batches.len()
    }
    Err(e) => {
      error!(error = %e, hint = %e.remediation().unwrap_or_default(), "refresh round failed");
      0
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{CacheLayer, MemoryStorage};
  use crate::config::{FetchConfig, SheetConfig, SourceConfig};
  use crate::sheets::testing::{sheet_values, FakeReader, FakeResponse};

  fn fetcher(reader: FakeReader) -> SheetFetcher<FakeReader, MemoryStorage> {
    let source = SourceConfig {
      id: "s1".to_string(),
      name: None,
      spreadsheet_id: "doc".to_string(),
      sheets: vec![SheetConfig {
        name: "DRIP".to_string(),
        gid: None,
        campaign: None,
      }],
    };
    SheetFetcher::with_cache(
      reader,
      CacheLayer::new(MemoryStorage::new()),
      vec![source],
      &FetchConfig::default(),
    )
  }

  #[tokio::test]
  async fn test_refresh_once_counts_sheets() {
    let f = fetcher(FakeReader::new().with("DRIP!A:Z", FakeResponse::Rows(sheet_values())));
    assert_eq!(refresh_once(&f, &["s1".to_string()]).await, 1);

    let f = fetcher(FakeReader::new().with("DRIP!A:Z", FakeResponse::MissingCredentials));
    assert_eq!(refresh_once(&f, &["s1".to_string()]).await, 0);
  }

  #[tokio::test(start_paused = true)]
  async fn test_spawned_loop_serves_warm_cache() {
    let f = Arc::new(fetcher(
      FakeReader::new().with("DRIP!A:Z", FakeResponse::Rows(sheet_values())),
    ));
    let handle = spawn(Arc::clone(&f), Duration::from_secs(30), vec!["s1".to_string()]);

    // First tick fires immediately
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(f.reader().calls().len(), 1);

    // Second tick is within the 60s cache lifetime, so it is served from cache
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(f.reader().calls().len(), 1);

    handle.abort();
  }
}
