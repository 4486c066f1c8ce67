//! Cache storage trait and in-memory implementation.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use std::collections::HashMap;
use std::sync::Mutex;

use super::traits::Cacheable;

/// A single cached payload.
#[derive(Debug, Clone)]
pub struct CachedEntity<T> {
  /// The cached payload
  pub entity: T,
  /// When the payload was cached
  pub cached_at: DateTime<Utc>,
}

/// Trait for cache storage backends.
pub trait CacheStorage: Send + Sync {
  /// Store a payload under `key`, replacing any previous entry.
  fn store<T: Cacheable>(&self, key: &str, entity: &T, cached_at: DateTime<Utc>) -> Result<()>;

  /// Get the payload stored under `key`, regardless of age.
  fn get<T: Cacheable>(&self, key: &str) -> Result<Option<CachedEntity<T>>>;

  /// Drop the entry stored under `key`.
  fn remove(&self, key: &str) -> Result<()>;
}

/// Storage implementation that doesn't cache anything.
/// Used when caching is disabled - all operations are no-ops.
pub struct NoopStorage;

impl CacheStorage for NoopStorage {
  fn store<T: Cacheable>(&self, _key: &str, _entity: &T, _cached_at: DateTime<Utc>) -> Result<()> {
    Ok(()) // Discard
  }

  fn get<T: Cacheable>(&self, _key: &str) -> Result<Option<CachedEntity<T>>> {
    Ok(None) // Always miss
  }

  fn remove(&self, _key: &str) -> Result<()> {
    Ok(())
  }
}

struct StoredEntry {
  entity_type: &'static str,
  data: Vec<u8>,
  cached_at: DateTime<Utc>,
}

/// Process-local storage. Payloads are kept serialized so one store can hold
/// any `Cacheable` type; everything is lost on restart.
#[derive(Default)]
pub struct MemoryStorage {
  entries: Mutex<HashMap<String, StoredEntry>>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }

  /// Number of entries currently held, expired ones included.
  #[allow(dead_code)]
  pub fn len(&self) -> usize {
    self.entries.lock().map(|e| e.len()).unwrap_or(0)
  }
}

impl CacheStorage for MemoryStorage {
  fn store<T: Cacheable>(&self, key: &str, entity: &T, cached_at: DateTime<Utc>) -> Result<()> {
    let data =
      serde_json::to_vec(entity).map_err(|e| eyre!("Failed to serialize entity: {}", e))?;

    let mut entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    entries.insert(
      key.to_string(),
      StoredEntry {
        entity_type: T::entity_type(),
        data,
        cached_at,
      },
    );

    Ok(())
  }

  fn get<T: Cacheable>(&self, key: &str) -> Result<Option<CachedEntity<T>>> {
    let entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    match entries.get(key) {
      Some(stored) if stored.entity_type == T::entity_type() => {
        let entity: T = serde_json::from_slice(&stored.data)
          .map_err(|e| eyre!("Failed to deserialize entity: {}", e))?;
        Ok(Some(CachedEntity {
          entity,
          cached_at: stored.cached_at,
        }))
      }
      _ => Ok(None),
    }
  }

  fn remove(&self, key: &str) -> Result<()> {
    let mut entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    entries.remove(key);
    Ok(())
  }
}

/// Storage picked at startup from `cache.enabled`.
pub enum ConfiguredStorage {
  Memory(MemoryStorage),
  Disabled(NoopStorage),
}

impl ConfiguredStorage {
  pub fn new(enabled: bool) -> Self {
    if enabled {
      Self::Memory(MemoryStorage::new())
    } else {
      Self::Disabled(NoopStorage)
    }
  }
}

impl CacheStorage for ConfiguredStorage {
  fn store<T: Cacheable>(&self, key: &str, entity: &T, cached_at: DateTime<Utc>) -> Result<()> {
    match self {
      Self::Memory(s) => s.store(key, entity, cached_at),
      Self::Disabled(s) => s.store(key, entity, cached_at),
    }
  }

  fn get<T: Cacheable>(&self, key: &str) -> Result<Option<CachedEntity<T>>> {
    match self {
      Self::Memory(s) => s.get(key),
      Self::Disabled(s) => s.get(key),
    }
  }

  fn remove(&self, key: &str) -> Result<()> {
    match self {
      Self::Memory(s) => s.remove(key),
      Self::Disabled(s) => s.remove(key),
    }
  }
}
