//! Cache layer that orchestrates caching logic with network fetching.

use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::storage::{CacheEntry, CacheStorage};
use super::traits::{CacheResult, QueryKey};

/// Per-read switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOptions {
  /// Skip any stored entry and go to the network
  pub force_refresh: bool,
}

impl ReadOptions {
  pub fn forced() -> Self {
    Self {
      force_refresh: true,
    }
  }
}

/// Cache layer that manages caching logic and network fetching.
///
/// Cloning is cheap and clones share the same storage, so one layer can be
/// handed to every view of a session and cleared in one place on logout.
pub struct CacheLayer<S: CacheStorage> {
  storage: Arc<S>,
  /// How long a stored entry may be served
  max_age: Duration,
}

impl<S: CacheStorage> CacheLayer<S> {
  /// Create a new cache layer with the given storage backend.
  pub fn new(storage: S) -> Self {
    Self {
      storage: Arc::new(storage),
      max_age: Duration::from_secs(5 * 60),
    }
  }

  /// Set the maximum age for cached data.
  pub fn with_max_age(mut self, max_age: Duration) -> Self {
    self.max_age = max_age;
    self
  }


  /// Read through the cache.
  ///
  /// 1. Unless forced, return a stored entry younger than `max_age` (or the
  ///    key's own max age)
  /// 2. Otherwise call `fetcher`
  /// 3. On success store the result with the current time and return it
  /// 4. On failure leave any stored entry alone and return the failure
  ///
  /// Storage problems never fail a read: they are logged and the read
  /// behaves like a miss.
  pub async fn read<K, T, E, F, Fut>(
    &self,
    key: &K,
    fetcher: F,
    options: ReadOptions,
  ) -> Result<CacheResult<T>, E>
  where
    K: QueryKey + ?Sized,
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
  {
    let cache_key = key.cache_key();

    if !options.force_refresh {
      let max_age = key.max_age().unwrap_or(self.max_age);
      if let Some(hit) = self.lookup::<T>(&cache_key, max_age) {
        debug!(key = %key.description(), age_ms = hit.age.as_millis() as u64, "Cache hit");
        return Ok(hit);
      }
    }

    debug!(key = %key.description(), forced = options.force_refresh, "Cache miss, fetching");
    let data = fetcher().await?;
    self.store(&cache_key, &data);
    Ok(CacheResult::from_network(data))
  }

  fn lookup<T: DeserializeOwned>(
    &self,
    cache_key: &str,
    max_age: Duration,
  ) -> Option<CacheResult<T>> {
    let entry = match self.storage.get(cache_key) {
      Ok(Some(entry)) => entry,
      Ok(None) => return None,
      Err(e) => {
        warn!(key = cache_key, error = %e, "Cache lookup failed");
        return None;
      }
    };

    if entry.stored_at.elapsed() >= max_age {
      return None;
    }

    match serde_json::from_value(entry.value) {
      Ok(data) => Some(CacheResult::from_cache(data, entry.stored_at.elapsed())),
      Err(e) => {
        warn!(key = cache_key, error = %e, "Cached entry has unexpected shape");
        None
      }
    }
  }

  fn store<T: Serialize>(&self, cache_key: &str, data: &T) {
    let value = match serde_json::to_value(data) {
      Ok(value) => value,
      Err(e) => {
        warn!(key = cache_key, error = %e, "Failed to serialize value for cache");
        return;
      }
    };

    if let Err(e) = self.storage.put(cache_key, CacheEntry::new(value)) {
      warn!(key = cache_key, error = %e, "Failed to store cache entry");
    }
  }

  /// Drop a single entry, e.g. after a mutation made it wrong.
  pub fn invalidate<K: QueryKey + ?Sized>(&self, key: &K) {
    if let Err(e) = self.storage.remove(&key.cache_key()) {
      warn!(key = %key.description(), error = %e, "Failed to invalidate cache entry");
    }
  }

  /// Drop every entry whose key starts with `prefix`.
  pub fn invalidate_prefix(&self, prefix: &str) {
    if let Err(e) = self.storage.remove_prefix(prefix) {
      warn!(prefix, error = %e, "Failed to invalidate cache entries");
    }
  }

  /// Drop everything. Called on logout and session expiry.
  pub fn clear(&self) {
    if let Err(e) = self.storage.clear() {
      warn!(error = %e, "Failed to clear cache");
    }
  }
}

impl<S: CacheStorage> Clone for CacheLayer<S> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      max_age: self.max_age,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use super::super::traits::CacheSource;
  use crate::cache::{MemoryStorage, NoopStorage};
  use std::sync::atomic::{AtomicU32, Ordering};

  #[derive(Debug, Clone, PartialEq, Serialize, serde::Deserialize)]
  struct Room {
    number: String,
    beds: u32,
  }

  fn rooms() -> Vec<Room> {
    vec![
      Room {
        number: "101".to_string(),
        beds: 2,
      },
      Room {
        number: "102".to_string(),
        beds: 3,
      },
    ]
  }

  fn layer() -> CacheLayer<MemoryStorage> {
    CacheLayer::new(MemoryStorage::new()).with_max_age(Duration::from_millis(300_000))
  }

  async fn fetch_rooms(calls: &AtomicU32) -> Result<Vec<Room>, String> {
    calls.fetch_add(1, Ordering::SeqCst);
    Ok(rooms())
  }

  #[tokio::test(start_paused = true)]
  async fn test_second_read_within_max_age_is_served_from_cache() {
    let cache = layer();
    let calls = AtomicU32::new(0);

    let first = cache
      .read("rooms", || fetch_rooms(&calls), ReadOptions::default())
      .await
      .unwrap();
    tokio::time::advance(Duration::from_millis(900)).await;
    let second = cache
      .read("rooms", || fetch_rooms(&calls), ReadOptions::default())
      .await
      .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(first.source, CacheSource::Network);
    assert_eq!(second.source, CacheSource::Cache);
    assert_eq!(first.data, second.data);
  }

  #[tokio::test(start_paused = true)]
  async fn test_read_after_max_age_fetches_again() {
    let cache = layer();
    let calls = AtomicU32::new(0);

    cache
      .read("rooms", || fetch_rooms(&calls), ReadOptions::default())
      .await
      .unwrap();
    tokio::time::advance(Duration::from_millis(300_000)).await;
    let result = cache
      .read("rooms", || fetch_rooms(&calls), ReadOptions::default())
      .await
      .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(!result.is_cached());
  }

  #[tokio::test(start_paused = true)]
  async fn test_forced_refresh_bypasses_valid_entry() {
    let cache = layer();
    let calls = AtomicU32::new(0);

    cache
      .read("hostel", || fetch_rooms(&calls), ReadOptions::default())
      .await
      .unwrap();
    let result = cache
      .read("hostel", || fetch_rooms(&calls), ReadOptions::forced())
      .await
      .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(result.source, CacheSource::Network);
  }

  #[tokio::test(start_paused = true)]
  async fn test_failed_refresh_keeps_previous_entry() {
    let cache = layer();
    let calls = AtomicU32::new(0);

    cache
      .read("rooms", || fetch_rooms(&calls), ReadOptions::default())
      .await
      .unwrap();

    let failed: Result<CacheResult<Vec<Room>>, String> = cache
      .read(
        "rooms",
        || async { Err("Unable to connect".to_string()) },
        ReadOptions::forced(),
      )
      .await;
    assert_eq!(failed.unwrap_err(), "Unable to connect");

    let again = cache
      .read("rooms", || fetch_rooms(&calls), ReadOptions::default())
      .await
      .unwrap();
    assert!(again.is_cached());
    assert_eq!(again.data, rooms());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_failed_first_fetch_stores_nothing() {
    let cache = layer();
    let failed: Result<CacheResult<Vec<Room>>, String> = cache
      .read(
        "rooms",
        || async { Err("timeout".to_string()) },
        ReadOptions::default(),
      )
      .await;
    assert!(failed.is_err());

    let calls = AtomicU32::new(0);
    cache
      .read("rooms", || fetch_rooms(&calls), ReadOptions::default())
      .await
      .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_invalidate_and_clear() {
    let cache = layer();
    let calls = AtomicU32::new(0);

    cache
      .read("rooms", || fetch_rooms(&calls), ReadOptions::default())
      .await
      .unwrap();
    cache.invalidate("rooms");
    cache
      .read("rooms", || fetch_rooms(&calls), ReadOptions::default())
      .await
      .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let shared = cache.clone();
    shared.clear();
    cache
      .read("rooms", || fetch_rooms(&calls), ReadOptions::default())
      .await
      .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test(start_paused = true)]
  async fn test_noop_storage_always_fetches() {
    let cache = CacheLayer::new(NoopStorage);
    let calls = AtomicU32::new(0);

    for _ in 0..3 {
      cache
        .read("rooms", || fetch_rooms(&calls), ReadOptions::default())
        .await
        .unwrap();
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3);
  }

  struct SlowChanging;

  impl QueryKey for SlowChanging {
    fn cache_key(&self) -> String {
      "reviews".to_string()
    }

    fn description(&self) -> String {
      "reviews".to_string()
    }

    fn max_age(&self) -> Option<Duration> {
      Some(Duration::from_secs(15 * 60))
    }
  }

  #[tokio::test(start_paused = true)]
  async fn test_key_max_age_overrides_layer_default() {
    let cache = layer();
    let calls = AtomicU32::new(0);

    cache
      .read(&SlowChanging, || fetch_rooms(&calls), ReadOptions::default())
      .await
      .unwrap();

    // Past the layer's five minutes, inside the key's fifteen
    tokio::time::advance(Duration::from_secs(10 * 60)).await;
    let result = cache
      .read(&SlowChanging, || fetch_rooms(&calls), ReadOptions::default())
      .await
      .unwrap();
    assert!(result.is_cached());

    tokio::time::advance(Duration::from_secs(5 * 60)).await;
    cache
      .read(&SlowChanging, || fetch_rooms(&calls), ReadOptions::default())
      .await
      .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }
}
