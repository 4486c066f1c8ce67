//! Cache layer that applies expiry on top of a storage backend.

use chrono::Duration;
use color_eyre::Result;
use std::future::Future;
use std::sync::Arc;

use super::storage::CacheStorage;
use super::traits::{CacheResult, Cacheable, Clock, SystemClock};

/// Cache layer that manages expiry and network fetching.
///
/// Entries are valid while `now - cached_at < ttl`. Expired entries are
/// removed lazily, on the lookup that finds them; there is no sweeper.
pub struct CacheLayer<S: CacheStorage> {
  storage: Arc<S>,
  /// How long a stored payload is served before it counts as absent
  ttl: Duration,
  clock: Arc<dyn Clock>,
}

impl<S: CacheStorage> CacheLayer<S> {
  /// Create a new cache layer with the given storage backend.
  pub fn new(storage: S) -> Self {
    Self {
      storage: Arc::new(storage),
      ttl: Duration::seconds(60),
      clock: Arc::new(SystemClock),
    }
  }

  /// Set how long entries stay valid.
  pub fn with_ttl(mut self, ttl: Duration) -> Self {
    self.ttl = ttl;
    self
  }

  /// Replace the clock used for expiry checks.
  #[allow(dead_code)]
  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  fn is_expired(&self, cached_at: chrono::DateTime<chrono::Utc>) -> bool {
    self.clock.now() - cached_at >= self.ttl
  }

  /// Look up an unexpired payload.
  pub fn get<T: Cacheable>(&self, key: &str) -> Result<Option<CacheResult<T>>> {
    let Some(cached) = self.storage.get::<T>(key)? else {
      return Ok(None);
    };

    if self.is_expired(cached.cached_at) {
      self.storage.remove(key)?;
      return Ok(None);
    }

    Ok(Some(CacheResult::from_cache(cached.entity, cached.cached_at)))
  }

  /// Store a payload, stamped with the current time.
  pub fn put<T: Cacheable>(&self, key: &str, entity: &T) -> Result<()> {
    self.storage.store(key, entity, self.clock.now())
  }

  /// Fetch a single payload with cache-first strategy.
  ///
  /// 1. Check cache - if unexpired, return immediately
  /// 2. Otherwise call the fetcher
  /// 3. Store a successful result; errors are passed through untouched
  ///
  /// A fetcher may return `None` for "nothing to cache".
  pub async fn fetch_one<T, E, F, Fut>(
    &self,
    key: &str,
    fetcher: F,
  ) -> std::result::Result<Option<CacheResult<T>>, E>
  where
    T: Cacheable,
    F: FnOnce() -> Fut,
    Fut: Future<Output = std::result::Result<Option<T>, E>>,
  {
    match self.get::<T>(key) {
      Ok(Some(hit)) => return Ok(Some(hit)),
      Ok(None) => {}
      Err(e) => tracing::warn!(key, error = %e, "cache lookup failed, treating as miss"),
    }

    let Some(data) = fetcher().await? else {
      return Ok(None);
    };

    if let Err(e) = self.put(key, &data) {
      tracing::warn!(key, error = %e, "failed to store {}", T::entity_type());
    }
    Ok(Some(CacheResult::from_network(data)))
  }
}

impl<S: CacheStorage> Clone for CacheLayer<S> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      ttl: self.ttl,
      clock: Arc::clone(&self.clock),
    }
  }
}
