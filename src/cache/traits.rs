//! Core traits and types for the caching system.

use std::time::Duration;

/// Anything that can name a cache slot.
///
/// Implementors must produce a stable key: the same logical request must
/// always map to the same string.
pub trait QueryKey {
  /// Key used for storage lookup (e.g. "rooms", "tenants:3f2a...")
  fn cache_key(&self) -> String;

  /// Human-readable description for logs
  fn description(&self) -> String;

  /// How long this slot may be served, when it differs from the layer default
  fn max_age(&self) -> Option<Duration> {
    None
  }
}

impl QueryKey for str {
  fn cache_key(&self) -> String {
    self.to_string()
  }

  fn description(&self) -> String {
    self.to_string()
  }
}

impl QueryKey for String {
  fn cache_key(&self) -> String {
    self.clone()
  }

  fn description(&self) -> String {
    self.clone()
  }
}

/// Result from a cache read, including data and metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// Age of the entry when it was served (zero for network data)
  pub age: Duration,
}

impl<T> CacheResult<T> {
  /// Create a new cache result from fresh network data.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      age: Duration::ZERO,
    }
  }

  /// Create a new cache result from a stored entry.
  pub fn from_cache(data: T, age: Duration) -> Self {
    Self {
      data,
      source: CacheSource::Cache,
      age,
    }
  }

  pub fn is_cached(&self) -> bool {
    self.source == CacheSource::Cache
  }
}

/// Indicates where data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from network
  Network,
  /// Data from cache, still younger than max age
  Cache,
}
