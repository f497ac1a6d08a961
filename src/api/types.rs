use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::api_types::{lenient_f64, lenient_string, lenient_u32};

/// The hostel the logged-in owner manages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hostel {
  #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
  pub id: Option<String>,
  pub name: String,
  #[serde(default)]
  pub category: String, // "Men", "Women" or "Co-living"
  #[serde(default, deserialize_with = "lenient_u32")]
  pub total_rooms: u32,
  #[serde(default, deserialize_with = "lenient_u32")]
  pub max_capacity: u32,
}

/// Body for creating or editing the hostel
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostelInput {
  pub name: String,
  pub category: String,
  pub total_rooms: u32,
  pub max_capacity: u32,
}

/// A room and its bed availability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
  #[serde(deserialize_with = "lenient_string")]
  pub room_number: String,
  #[serde(default)]
  pub sharing_type: String,
  #[serde(default, deserialize_with = "lenient_u32")]
  pub total_beds: u32,
  #[serde(default, deserialize_with = "lenient_u32")]
  pub available_beds: u32,
  #[serde(default, deserialize_with = "lenient_f64")]
  pub rent: f64,
}

impl Room {
  pub fn status(&self) -> RoomStatus {
    if self.available_beds == 0 {
      RoomStatus::Occupied
    } else {
      RoomStatus::Available
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomStatus {
  Available,
  Occupied,
}

impl std::fmt::Display for RoomStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      RoomStatus::Available => write!(f, "Available"),
      RoomStatus::Occupied => write!(f, "Occupied"),
    }
  }
}

/// Number of beds implied by a sharing type label
pub fn beds_for_sharing(sharing_type: &str) -> Option<u32> {
  match sharing_type {
    "Single Sharing" => Some(1),
    "Two Sharing" => Some(2),
    "Three Sharing" => Some(3),
    "Four Sharing" => Some(4),
    _ => None,
  }
}

/// Editable fields of an existing room
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomUpdate {
  pub sharing_type: String,
  pub rent: f64,
  pub total_beds: u32,
  pub available_beds: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
  #[serde(default)]
  pub street: String,
  #[serde(default)]
  pub city: String,
  #[serde(default)]
  pub state: String,
  #[serde(default)]
  pub pincode: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmergencyContact {
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub relationship: String,
  #[serde(default)]
  pub mobile: String,
}

/// A tenant living in one of the rooms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
  #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
  pub id: Option<String>,
  pub tenant_name: String,
  #[serde(default, deserialize_with = "lenient_string")]
  pub room_number: String,
  #[serde(default)]
  pub move_in_date: Option<String>,
  #[serde(default)]
  pub agreement_start_date: Option<String>,
  #[serde(default, deserialize_with = "lenient_f64")]
  pub rent_amount: f64,
  #[serde(default)]
  pub contact: String,
  #[serde(default)]
  pub email: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub aadhaar_number: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub date_of_birth: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub permanent_address: Option<Address>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub current_address: Option<Address>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub emergency_contact: Option<EmergencyContact>,
}

/// Editable fields of an existing tenant; unset fields are left alone
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantUpdate {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub tenant_name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub room_number: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub rent_amount: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub contact: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub email: Option<String>,
}

impl TenantUpdate {
  pub fn is_empty(&self) -> bool {
    self == &Self::default()
  }
}

/// One page of the tenant list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantPage {
  pub tenants: Vec<Tenant>,
  pub total: u64,
}

/// A rent payment recorded against a tenant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
  #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
  pub id: Option<String>,
  pub tenant_id: String,
  #[serde(default)]
  pub tenant_name: String,
  #[serde(default, deserialize_with = "lenient_string")]
  pub room_number: String,
  #[serde(default, deserialize_with = "lenient_f64")]
  pub payment_amount: f64,
  #[serde(default, deserialize_with = "lenient_f64")]
  pub due_amount: f64,
  #[serde(default, deserialize_with = "lenient_f64")]
  pub rent_amount: f64,
  #[serde(default)]
  pub payment_date: Option<String>,
  #[serde(default)]
  pub due_date: Option<String>,
  #[serde(default)]
  pub payment_mode: String, // "Cash", "UPI", "Bank Transfer", ...
  #[serde(default)]
  pub transaction_id: String,
  #[serde(default)]
  pub rent_status: String, // "Paid", "Due", "Partial"
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub remarks: Option<String>,
}

impl Payment {
  /// A new payment with the console's defaults: cash, rent still due, and a
  /// generated `TXN-<millis>` transaction id.
  pub fn new(tenant: &Tenant, amount: f64, now: DateTime<Utc>) -> Self {
    Self {
      id: None,
      tenant_id: tenant.id.clone().unwrap_or_default(),
      tenant_name: tenant.tenant_name.clone(),
      room_number: tenant.room_number.clone(),
      payment_amount: amount,
      due_amount: (tenant.rent_amount - amount).max(0.0),
      rent_amount: tenant.rent_amount,
      payment_date: Some(now.format("%Y-%m-%d").to_string()),
      due_date: None,
      payment_mode: "Cash".to_string(),
      transaction_id: format!("TXN-{}", now.timestamp_millis()),
      rent_status: "Due".to_string(),
      remarks: None,
    }
  }
}

/// A maintenance ticket raised for a room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceTicket {
  #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
  pub id: Option<String>,
  #[serde(deserialize_with = "lenient_string")]
  pub room_no: String,
  pub issue: String,
  #[serde(default = "default_ticket_status")]
  pub status: String, // "Pending", "In Progress", "Resolved"
  #[serde(default)]
  pub remarks: String,
  #[serde(default = "default_ticket_priority")]
  pub priority: String, // "Low", "Medium", "High"
  #[serde(default)]
  pub requested_by: String,
  #[serde(default)]
  pub assigned_to: String,
  #[serde(default)]
  pub created_date: Option<String>,
}

fn default_ticket_status() -> String {
  "Pending".to_string()
}

fn default_ticket_priority() -> String {
  "Medium".to_string()
}

impl MaintenanceTicket {
  pub fn is_resolved(&self) -> bool {
    self.status.eq_ignore_ascii_case("resolved")
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoomStats {
  #[serde(default)]
  pub total: u64,
  #[serde(default)]
  pub occupied: u64,
  #[serde(default)]
  pub vacant: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentStats {
  #[serde(default)]
  pub paid: f64,
  #[serde(default)]
  pub unpaid: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TenantStats {
  #[serde(default)]
  pub total: u64,
  #[serde(default)]
  pub current: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TicketStats {
  #[serde(default)]
  pub total: u64,
  #[serde(default)]
  pub unresolved: u64,
}

/// Dashboard summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostelStats {
  #[serde(default)]
  pub rooms: RoomStats,
  #[serde(default)]
  pub payments: PaymentStats,
  #[serde(default)]
  pub tenants: TenantStats,
  #[serde(default)]
  pub tickets: TicketStats,
  #[serde(default)]
  pub visitors: Vec<serde_json::Value>,
}

/// Today's mess menu
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessMenu {
  #[serde(default)]
  pub breakfast: Vec<String>,
  #[serde(default)]
  pub lunch: Vec<String>,
  #[serde(default)]
  pub dinner: Vec<String>,
}

/// The logged-in owner, as shown in the header
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub email: String,
  #[serde(default, deserialize_with = "lenient_string")]
  pub contact: String,
  #[serde(default)]
  pub avatar: Option<String>,
}

/// A testimonial left by a resident
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
  #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
  pub id: Option<String>,
  #[serde(default)]
  pub name: String,
  #[serde(default, deserialize_with = "lenient_f64")]
  pub rating: f64,
  #[serde(default, alias = "comment", alias = "feedback")]
  pub review: String,
}

/// Lowest rating shown as a testimonial
pub const MIN_TESTIMONIAL_RATING: f64 = 4.0;

/// Keep reviews rated 4 or better, best first. Equal ratings keep server order.
pub fn popular_reviews(reviews: Vec<Review>) -> Vec<Review> {
  let mut popular: Vec<Review> = reviews
    .into_iter()
    .filter(|r| r.rating >= MIN_TESTIMONIAL_RATING)
    .collect();
  popular.sort_by(|a, b| b.rating.total_cmp(&a.rating));
  popular
}

/// Sort direction for list endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
  Asc,
  #[default]
  Desc,
}

impl std::str::FromStr for SortOrder {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "asc" => Ok(SortOrder::Asc),
      "desc" => Ok(SortOrder::Desc),
      other => Err(format!("unknown sort order '{}', use asc or desc", other)),
    }
  }
}

impl SortOrder {
  pub fn as_str(&self) -> &'static str {
    match self {
      SortOrder::Asc => "asc",
      SortOrder::Desc => "desc",
    }
  }
}

/// Paging, sorting and filtering for the tenant list
#[derive(Debug, Clone, PartialEq)]
pub struct TenantQuery {
  pub page: u32,
  pub limit: u32,
  pub sort_by: String,
  pub sort_order: SortOrder,
  pub search: Option<String>,
  pub room_number: Option<String>,
  pub join_date_from: Option<String>,
  pub join_date_to: Option<String>,
  pub rent_amount_min: Option<f64>,
  pub rent_amount_max: Option<f64>,
}

impl Default for TenantQuery {
  fn default() -> Self {
    Self {
      page: 1,
      limit: 5,
      sort_by: "joinDate".to_string(),
      sort_order: SortOrder::Desc,
      search: None,
      room_number: None,
      join_date_from: None,
      join_date_to: None,
      rent_amount_min: None,
      rent_amount_max: None,
    }
  }
}

impl TenantQuery {
  pub fn with_search(mut self, search: &str) -> Self {
    let trimmed = search.trim();
    self.search = (!trimmed.is_empty()).then(|| trimmed.to_string());
    self.page = 1;
    self
  }

  /// Query string pairs, skipping filters that are not set
  pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
    let mut pairs = vec![
      ("page", self.page.to_string()),
      ("limit", self.limit.to_string()),
      ("sortBy", self.sort_by.clone()),
      ("sortOrder", self.sort_order.as_str().to_string()),
    ];

    let optional = [
      ("search", self.search.clone()),
      ("roomNumber", self.room_number.clone()),
      ("joinDateFrom", self.join_date_from.clone()),
      ("joinDateTo", self.join_date_to.clone()),
      ("rentAmountMin", self.rent_amount_min.map(|v| v.to_string())),
      ("rentAmountMax", self.rent_amount_max.map(|v| v.to_string())),
    ];
    pairs.extend(
      optional
        .into_iter()
        .filter_map(|(name, value)| value.filter(|v| !v.is_empty()).map(|v| (name, v))),
    );

    pairs
  }

  pub fn total_pages(&self, total: u64) -> u64 {
    if self.limit == 0 {
      return 1;
    }
    total.div_ceil(self.limit as u64).max(1)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_beds_for_sharing() {
    assert_eq!(beds_for_sharing("Single Sharing"), Some(1));
    assert_eq!(beds_for_sharing("Four Sharing"), Some(4));
    assert_eq!(beds_for_sharing("Dormitory"), None);
  }

  #[test]
  fn test_tenant_query_default_pairs() {
    let pairs = TenantQuery::default().to_pairs();
    assert_eq!(
      pairs,
      vec![
        ("page", "1".to_string()),
        ("limit", "5".to_string()),
        ("sortBy", "joinDate".to_string()),
        ("sortOrder", "desc".to_string()),
      ]
    );
  }

  #[test]
  fn test_tenant_query_with_search_resets_page() {
    let query = TenantQuery {
      page: 4,
      room_number: Some("101".to_string()),
      ..TenantQuery::default()
    }
    .with_search("  asha ");

    assert_eq!(query.page, 1);
    let pairs = query.to_pairs();
    assert!(pairs.contains(&("search", "asha".to_string())));
    assert!(pairs.contains(&("roomNumber", "101".to_string())));
  }

  #[test]
  fn test_blank_search_is_dropped() {
    let query = TenantQuery::default().with_search("   ");
    assert!(query.search.is_none());
  }

  #[test]
  fn test_total_pages() {
    let query = TenantQuery::default();
    assert_eq!(query.total_pages(0), 1);
    assert_eq!(query.total_pages(5), 1);
    assert_eq!(query.total_pages(11), 3);
  }

  #[test]
  fn test_new_payment_defaults() {
    let tenant: Tenant = serde_json::from_str(
      r#"{"_id": "t1", "tenantName": "Asha", "roomNumber": "101", "rentAmount": 6500}"#,
    )
    .unwrap();
    let now = DateTime::parse_from_rfc3339("2024-06-01T10:00:00Z")
      .unwrap()
      .with_timezone(&Utc);

    let payment = Payment::new(&tenant, 5000.0, now);
    assert_eq!(payment.tenant_id, "t1");
    assert_eq!(payment.payment_mode, "Cash");
    assert_eq!(payment.rent_status, "Due");
    assert_eq!(payment.due_amount, 1500.0);
    assert_eq!(payment.transaction_id, format!("TXN-{}", now.timestamp_millis()));
    assert_eq!(payment.payment_date.as_deref(), Some("2024-06-01"));
  }

  #[test]
  fn test_tenant_update_skips_unset_fields() {
    let update = TenantUpdate {
      rent_amount: Some(7000.0),
      ..TenantUpdate::default()
    };
    assert!(!update.is_empty());
    assert_eq!(
      serde_json::to_value(&update).unwrap(),
      serde_json::json!({"rentAmount": 7000.0})
    );
    assert!(TenantUpdate::default().is_empty());
  }

  #[test]
  fn test_ticket_defaults() {
    let ticket: MaintenanceTicket =
      serde_json::from_str(r#"{"roomNo": 204, "issue": "Hot water is broken"}"#).unwrap();
    assert_eq!(ticket.room_no, "204");
    assert_eq!(ticket.status, "Pending");
    assert_eq!(ticket.priority, "Medium");
    assert!(!ticket.is_resolved());
  }

  #[test]
  fn test_popular_reviews_filter_and_order() {
    let reviews: Vec<Review> = serde_json::from_value(serde_json::json!([
      {"_id": "r1", "name": "Asha", "rating": 4, "review": "Clean rooms"},
      {"_id": "r2", "name": "Ravi", "rating": 2, "review": "Noisy"},
      {"_id": "r3", "name": "Meera", "rating": "5", "comment": "Great food"},
      {"_id": "r4", "name": "Kiran", "rating": 3.9}
    ]))
    .unwrap();

    let popular = popular_reviews(reviews);
    let names: Vec<&str> = popular.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Meera", "Asha"]);
    assert_eq!(popular[0].review, "Great food");
  }

  #[test]
  fn test_sort_order_from_str() {
    assert_eq!("ASC".parse::<SortOrder>(), Ok(SortOrder::Asc));
    assert_eq!("desc".parse::<SortOrder>(), Ok(SortOrder::Desc));
    assert!("up".parse::<SortOrder>().is_err());
  }
}
