//! Cache keys for hostel backend resources.
//!
//! Tenant pages are not here: the server pages and filters them, every
//! search would be a slot of its own, and the list is always read fresh.

use std::time::Duration;

use crate::cache::QueryKey;

/// Prefix shared by every transaction list key.
pub const TRANSACTIONS_PREFIX: &str = "transactions:";

/// Testimonials change rarely and are kept longer than the rest.
pub const REVIEWS_MAX_AGE: Duration = Duration::from_secs(15 * 60);

/// Resources the console reads through the cache.
#[derive(Clone, Debug)]
pub enum ResourceKey {
  Hostel,
  Rooms,
  Stats,
  MessMenu,
  Maintenance,
  /// The logged-in owner
  Profile,
  /// Well-rated testimonials
  Reviews,
  /// Payment history of one tenant
  Transactions { tenant_id: String },
}

impl QueryKey for ResourceKey {
  fn cache_key(&self) -> String {
    match self {
      Self::Hostel => "hostel".to_string(),
      Self::Rooms => "rooms".to_string(),
      Self::Stats => "stats".to_string(),
      Self::MessMenu => "mess".to_string(),
      Self::Maintenance => "maintenance".to_string(),
      Self::Profile => "profile".to_string(),
      Self::Reviews => "reviews".to_string(),
      Self::Transactions { tenant_id } => format!("{}{}", TRANSACTIONS_PREFIX, tenant_id),
    }
  }

  fn description(&self) -> String {
    match self {
      Self::Hostel => "hostel".to_string(),
      Self::Rooms => "rooms".to_string(),
      Self::Stats => "dashboard stats".to_string(),
      Self::MessMenu => "mess menu".to_string(),
      Self::Maintenance => "maintenance tickets".to_string(),
      Self::Profile => "owner profile".to_string(),
      Self::Reviews => "reviews".to_string(),
      Self::Transactions { tenant_id } => format!("transactions of tenant {}", tenant_id),
    }
  }

  fn max_age(&self) -> Option<Duration> {
    match self {
      Self::Reviews => Some(REVIEWS_MAX_AGE),
      _ => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_named_keys() {
    assert_eq!(ResourceKey::Hostel.cache_key(), "hostel");
    assert_eq!(ResourceKey::Rooms.cache_key(), "rooms");
    assert_eq!(ResourceKey::Profile.cache_key(), "profile");
    assert_eq!(
      ResourceKey::Transactions {
        tenant_id: "t1".to_string()
      }
      .cache_key(),
      "transactions:t1"
    );
  }

  #[test]
  fn test_only_reviews_override_max_age() {
    assert_eq!(ResourceKey::Reviews.max_age(), Some(REVIEWS_MAX_AGE));
    assert_eq!(ResourceKey::Rooms.max_age(), None);
    assert_eq!(ResourceKey::Profile.max_age(), None);
  }
}
