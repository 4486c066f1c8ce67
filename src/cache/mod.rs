//! Short-lived response cache.
//!
//! This module provides a source-agnostic caching mechanism that:
//! - Caches serializable payloads under string keys
//! - Expires entries after a fixed time-to-live, checked against an injected clock
//! - Evicts lazily on lookup, with no capacity bound

mod layer;
mod storage;
mod traits;

pub use layer::CacheLayer;
pub use storage::{CacheStorage, ConfiguredStorage, MemoryStorage};
pub use traits::{Cacheable, Clock, SystemClock};

#[cfg(test)]
pub(crate) use traits::testing::ManualClock;
