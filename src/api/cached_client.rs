//! Hostel service that wraps HostelClient with caching and retry.

use color_eyre::Result;
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use tracing::{debug, warn};

use crate::cache::{CacheLayer, CacheStorage, MemoryStorage, NoopStorage, QueryKey, ReadOptions};
use crate::config::Config;
use crate::retry::{retry, RetryPolicy};
use crate::session::SessionStore;

use super::cache::{ResourceKey, TRANSACTIONS_PREFIX};
use super::client::HostelClient;
use super::error::ApiError;
use super::types::{
  popular_reviews, Hostel, HostelInput, HostelStats, MaintenanceTicket, MessMenu, Payment,
  Profile, Review, Room, RoomUpdate, Tenant, TenantPage, TenantQuery, TenantUpdate,
};

pub type SharedCache = CacheLayer<Box<dyn CacheStorage>>;

/// Hostel backend access with transparent caching and retry.
///
/// Reads are served from the cache while fresh and retried on transient
/// failure. Writes go straight to the network once and drop the cache
/// entries they make stale. Any authentication failure ends the session:
/// the cache is cleared and the stored session removed.
#[derive(Clone)]
pub struct HostelService {
  inner: HostelClient,
  cache: SharedCache,
  retry: RetryPolicy,
  sessions: Option<SessionStore>,
}

impl HostelService {
  pub fn new(
    inner: HostelClient,
    cache: SharedCache,
    retry: RetryPolicy,
    sessions: Option<SessionStore>,
  ) -> Self {
    Self {
      inner,
      cache,
      retry,
      sessions,
    }
  }

  /// Build the service from configuration and the current token.
  pub fn from_config(
    config: &Config,
    token: Option<String>,
    sessions: Option<SessionStore>,
  ) -> Result<Self> {
    let inner = HostelClient::new(&config.api.url, config.request_timeout())?.with_token(token);

    let storage: Box<dyn CacheStorage> = if config.cache.enabled {
      Box::new(MemoryStorage::new())
    } else {
      Box::new(NoopStorage)
    };
    let cache = CacheLayer::new(storage).with_max_age(config.cache_max_age());

    Ok(Self::new(inner, cache, config.retry.policy(), sessions))
  }

  pub fn clear_cache(&self) {
    self.cache.clear();
  }

  async fn cached<T, F, Fut>(
    &self,
    key: &ResourceKey,
    options: ReadOptions,
    operation: F,
  ) -> Result<T, ApiError>
  where
    T: Serialize + DeserializeOwned,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
  {
    let policy = self.retry;
    let result = self
      .cache
      .read(key, || async move { retry(&policy, operation).await }, options)
      .await
      .map(|r| {
        if r.is_cached() {
          debug!(key = %key.description(), "Served from cache");
        }
        r.data
      });
    self.observe(result)
  }

  /// Run a mutation once and drop the cache entries it made stale.
  async fn write<Fut>(
    &self,
    request: Fut,
    stale: &[ResourceKey],
    stale_prefixes: &[&str],
  ) -> Result<String, ApiError>
  where
    Fut: Future<Output = Result<String, ApiError>>,
  {
    let result = request.await;
    if result.is_ok() {
      for key in stale {
        self.cache.invalidate(key);
      }
      for prefix in stale_prefixes {
        self.cache.invalidate_prefix(prefix);
      }
    }
    self.observe(result)
  }

  fn observe<T>(&self, result: Result<T, ApiError>) -> Result<T, ApiError> {
    if let Err(err) = &result {
      if err.is_auth() {
        self.end_session();
      }
    }
    result
  }

  fn end_session(&self) {
    warn!("Authentication failed, ending session");
    self.cache.clear();
    if let Some(sessions) = &self.sessions {
      if let Err(e) = sessions.clear() {
        warn!(error = %e, "Failed to remove session file");
      }
    }
  }

  pub async fn hostel(&self, options: ReadOptions) -> Result<Option<Hostel>, ApiError> {
    self
      .cached(&ResourceKey::Hostel, options, || self.inner.get_hostel())
      .await
  }

  pub async fn stats(&self, options: ReadOptions) -> Result<HostelStats, ApiError> {
    self
      .cached(&ResourceKey::Stats, options, || self.inner.get_stats())
      .await
  }

  pub async fn mess_menu(&self, options: ReadOptions) -> Result<MessMenu, ApiError> {
    self
      .cached(&ResourceKey::MessMenu, options, || self.inner.get_mess_menu())
      .await
  }

  pub async fn rooms(&self, options: ReadOptions) -> Result<Vec<Room>, ApiError> {
    self
      .cached(&ResourceKey::Rooms, options, || self.inner.get_rooms())
      .await
  }

  /// Tenant pages are always fetched fresh and never stored: each search
  /// and page would be a cache slot of its own.
  pub async fn tenants(&self, query: &TenantQuery) -> Result<TenantPage, ApiError> {
    let result = retry(&self.retry, || self.inner.list_tenants(query)).await;
    self.observe(result)
  }

  pub async fn profile(&self, options: ReadOptions) -> Result<Profile, ApiError> {
    self
      .cached(&ResourceKey::Profile, options, || self.inner.get_profile())
      .await
  }

  /// Testimonials rated 4 or better, best first. The filtered list is what
  /// gets cached.
  pub async fn reviews(&self, options: ReadOptions) -> Result<Vec<Review>, ApiError> {
    let inner = &self.inner;
    self
      .cached(&ResourceKey::Reviews, options, || async move {
        inner.list_reviews().await.map(popular_reviews)
      })
      .await
  }

  pub async fn transactions(
    &self,
    tenant_id: &str,
    options: ReadOptions,
  ) -> Result<Vec<Payment>, ApiError> {
    let key = ResourceKey::Transactions {
      tenant_id: tenant_id.to_string(),
    };
    self
      .cached(&key, options, || self.inner.tenant_transactions(tenant_id))
      .await
  }

  pub async fn tickets(&self, options: ReadOptions) -> Result<Vec<MaintenanceTicket>, ApiError> {
    self
      .cached(&ResourceKey::Maintenance, options, || {
        self.inner.list_tickets()
      })
      .await
  }

  pub async fn create_hostel(&self, hostel: &HostelInput) -> Result<String, ApiError> {
    self
      .write(
        self.inner.create_hostel(hostel),
        &[ResourceKey::Hostel, ResourceKey::Stats],
        &[],
      )
      .await
  }

  pub async fn edit_hostel(&self, hostel: &HostelInput) -> Result<String, ApiError> {
    self
      .write(
        self.inner.edit_hostel(hostel),
        &[ResourceKey::Hostel, ResourceKey::Stats],
        &[],
      )
      .await
  }

  /// Removing the hostel removes everything under it.
  pub async fn remove_hostel(&self) -> Result<String, ApiError> {
    let result = self.write(self.inner.remove_hostel(), &[], &[]).await;
    if result.is_ok() {
      self.cache.clear();
    }
    result
  }

  pub async fn add_room(&self, room: &Room) -> Result<String, ApiError> {
    self
      .write(
        self.inner.add_room(room),
        &[ResourceKey::Rooms, ResourceKey::Stats],
        &[],
      )
      .await
  }

  pub async fn edit_room(&self, room_number: &str, update: &RoomUpdate) -> Result<String, ApiError> {
    self
      .write(
        self.inner.edit_room(room_number, update),
        &[ResourceKey::Rooms, ResourceKey::Stats],
        &[],
      )
      .await
  }

  pub async fn remove_room(&self, room_number: &str) -> Result<String, ApiError> {
    self
      .write(
        self.inner.remove_room(room_number),
        &[ResourceKey::Rooms, ResourceKey::Stats],
        &[],
      )
      .await
  }

  /// Tenants occupy beds, so tenant changes also make rooms stale.
  pub async fn add_tenant(&self, tenant: &Tenant) -> Result<String, ApiError> {
    self
      .write(
        self.inner.add_tenant(tenant),
        &[ResourceKey::Rooms, ResourceKey::Stats],
        &[],
      )
      .await
  }

  pub async fn update_tenant(&self, id: &str, update: &TenantUpdate) -> Result<String, ApiError> {
    self
      .write(
        self.inner.update_tenant(id, update),
        &[ResourceKey::Rooms, ResourceKey::Stats],
        &[],
      )
      .await
  }

  pub async fn delete_tenant(&self, id: &str) -> Result<String, ApiError> {
    let transactions = ResourceKey::Transactions {
      tenant_id: id.to_string(),
    };
    self
      .write(
        self.inner.delete_tenant(id),
        &[ResourceKey::Rooms, ResourceKey::Stats, transactions],
        &[],
      )
      .await
  }

  pub async fn record_payment(&self, payment: &Payment) -> Result<String, ApiError> {
    let transactions = ResourceKey::Transactions {
      tenant_id: payment.tenant_id.clone(),
    };
    self
      .write(
        self.inner.record_payment(payment),
        &[ResourceKey::Stats, transactions],
        &[],
      )
      .await
  }

  /// The owning tenant is unknown here, so every transaction list goes.
  pub async fn delete_payment(&self, transaction_id: &str) -> Result<String, ApiError> {
    self
      .write(
        self.inner.delete_payment(transaction_id),
        &[ResourceKey::Stats],
        &[TRANSACTIONS_PREFIX],
      )
      .await
  }

  pub async fn create_ticket(&self, ticket: &MaintenanceTicket) -> Result<String, ApiError> {
    self
      .write(
        self.inner.create_ticket(ticket),
        &[ResourceKey::Maintenance, ResourceKey::Stats],
        &[],
      )
      .await
  }

  pub async fn update_ticket(&self, id: &str, ticket: &MaintenanceTicket) -> Result<String, ApiError> {
    self
      .write(
        self.inner.update_ticket(id, ticket),
        &[ResourceKey::Maintenance, ResourceKey::Stats],
        &[],
      )
      .await
  }

  pub async fn delete_ticket(&self, id: &str) -> Result<String, ApiError> {
    self
      .write(
        self.inner.delete_ticket(id),
        &[ResourceKey::Maintenance, ResourceKey::Stats],
        &[],
      )
      .await
  }
}
