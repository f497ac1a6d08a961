//! Cache storage trait and in-memory implementation.

use color_eyre::{eyre::eyre, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::time::Instant;

/// One cached payload and when it was stored.
#[derive(Debug, Clone)]
pub struct CacheEntry {
  /// Serialized payload
  pub value: Value,
  /// When the payload was stored
  pub stored_at: Instant,
}

impl CacheEntry {
  pub fn new(value: Value) -> Self {
    Self {
      value,
      stored_at: Instant::now(),
    }
  }
}

/// Trait for cache storage backends.
pub trait CacheStorage: Send + Sync {
  /// Get the entry stored under `key`, regardless of its age.
  fn get(&self, key: &str) -> Result<Option<CacheEntry>>;

  /// Store (or overwrite) the entry under `key`.
  fn put(&self, key: &str, entry: CacheEntry) -> Result<()>;

  /// Drop the entry under `key`.
  fn remove(&self, key: &str) -> Result<()>;

  /// Drop every entry whose key starts with `prefix`.
  fn remove_prefix(&self, prefix: &str) -> Result<()>;

  /// Drop everything.
  fn clear(&self) -> Result<()>;
}

impl<S: CacheStorage + ?Sized> CacheStorage for Box<S> {
  fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
    (**self).get(key)
  }

  fn put(&self, key: &str, entry: CacheEntry) -> Result<()> {
    (**self).put(key, entry)
  }

  fn remove(&self, key: &str) -> Result<()> {
    (**self).remove(key)
  }

  fn remove_prefix(&self, prefix: &str) -> Result<()> {
    (**self).remove_prefix(prefix)
  }

  fn clear(&self) -> Result<()> {
    (**self).clear()
  }
}

/// Storage implementation that doesn't cache anything.
/// Used when caching is disabled - all operations are no-ops.
pub struct NoopStorage;

impl CacheStorage for NoopStorage {
  fn get(&self, _key: &str) -> Result<Option<CacheEntry>> {
    Ok(None) // Always miss
  }

  fn put(&self, _key: &str, _entry: CacheEntry) -> Result<()> {
    Ok(()) // Discard
  }

  fn remove(&self, _key: &str) -> Result<()> {
    Ok(())
  }

  fn remove_prefix(&self, _prefix: &str) -> Result<()> {
    Ok(())
  }

  fn clear(&self) -> Result<()> {
    Ok(())
  }
}

/// Process-local cache storage. No capacity bound: the key space is a
/// handful of named resources.
#[derive(Default)]
pub struct MemoryStorage {
  entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }

  fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, CacheEntry>>> {
    self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))
  }

  #[cfg(test)]
  pub fn len(&self) -> usize {
    self.entries().map(|e| e.len()).unwrap_or(0)
  }
}

impl CacheStorage for MemoryStorage {
  fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
    Ok(self.entries()?.get(key).cloned())
  }

  fn put(&self, key: &str, entry: CacheEntry) -> Result<()> {
    self.entries()?.insert(key.to_string(), entry);
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<()> {
    self.entries()?.remove(key);
    Ok(())
  }

  fn remove_prefix(&self, prefix: &str) -> Result<()> {
    self.entries()?.retain(|key, _| !key.starts_with(prefix));
    Ok(())
  }

  fn clear(&self) -> Result<()> {
    self.entries()?.clear();
    Ok(())
  }
}
