//! Process-local time-to-live cache in front of network fetches.
//!
//! This module provides a backend-agnostic caching mechanism that:
//! - Stores one JSON payload per cache key together with when it was stored
//! - Serves the payload without touching the network while it is younger than `max_age`
//! - Falls through to the fetcher on forced refresh, expiry or a miss
//! - Leaves an existing entry untouched when the fetcher fails

mod layer;
mod storage;
mod traits;

pub use layer::{CacheLayer, ReadOptions};
pub use storage::{CacheStorage, MemoryStorage, NoopStorage};
pub use traits::QueryKey;

#[cfg(test)]
pub use storage::CacheEntry;
