use crate::api::api_types::{
  ApiMessage, ErrorBody, LoginRequest, LoginResponse, ProfileResponse, TenantListResponse,
  TransactionsResponse,
};
use crate::api::error::ApiError;
use crate::api::types::{
  Hostel, HostelInput, HostelStats, MaintenanceTicket, MessMenu, Payment, Profile, Review, Room,
  RoomUpdate, Tenant, TenantPage, TenantQuery, TenantUpdate,
};
use color_eyre::{eyre::eyre, Result};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Hostel backend API client
#[derive(Clone)]
pub struct HostelClient {
  http: reqwest::Client,
  base_url: Url,
  token: Option<String>,
  timeout: Duration,
}

impl HostelClient {
  pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
    let base_url =
      Url::parse(base_url).map_err(|e| eyre!("Invalid API url {}: {}", base_url, e))?;

    // No client-level timeout: `execute` races each exchange itself
    let http = reqwest::Client::builder()
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      base_url,
      token: None,
      timeout,
    })
  }

  pub fn with_token(mut self, token: Option<String>) -> Self {
    self.token = token;
    self
  }

  fn url(&self, path: &str) -> Result<Url, ApiError> {
    self
      .base_url
      .join(path)
      .map_err(|e| ApiError::Decode(format!("bad endpoint {}: {}", path, e)))
  }

  /// Send one request and classify the outcome.
  ///
  /// The whole exchange (connect, headers and body) is raced against the
  /// configured timeout; losing the race is a transient failure.
  async fn execute<B: Serialize + ?Sized>(
    &self,
    method: Method,
    path: &str,
    query: &[(&str, String)],
    body: Option<&B>,
    authenticated: bool,
  ) -> Result<Vec<u8>, ApiError> {
    let mut request = self
      .http
      .request(method.clone(), self.url(path)?)
      .header("Accept", "application/json");

    if authenticated {
      let token = self.token.as_deref().ok_or_else(ApiError::missing_token)?;
      request = request.bearer_auth(token);
    }
    if !query.is_empty() {
      request = request.query(query);
    }
    if let Some(body) = body {
      request = request.json(body);
    }

    let exchange = async {
      let response = request.send().await?;
      let status = response.status();
      let bytes = response.bytes().await?;
      Ok::<_, reqwest::Error>((status, bytes))
    };

    let (status, bytes) = tokio::time::timeout(self.timeout, exchange)
      .await
      .map_err(|_| ApiError::timeout())??;

    debug!(%method, path, status = status.as_u16(), "API response");

    if status.is_success() {
      Ok(bytes.to_vec())
    } else {
      Err(ApiError::from_status(
        status.as_u16(),
        ErrorBody::message_from(&bytes),
      ))
    }
  }

  /// GET that needs no session, e.g. the public testimonials
  async fn get_public<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
    let bytes = self
      .execute::<()>(Method::GET, path, &[], None, false)
      .await?;
    decode(&bytes)
  }

  async fn get<T: DeserializeOwned>(
    &self,
    path: &str,
    query: &[(&str, String)],
  ) -> Result<T, ApiError> {
    let bytes = self
      .execute::<()>(Method::GET, path, query, None, true)
      .await?;
    decode(&bytes)
  }

  /// Mutations answer with `{ message }`; an empty or non-JSON body is fine.
  async fn mutate<B: Serialize + ?Sized>(
    &self,
    method: Method,
    path: &str,
    body: Option<&B>,
  ) -> Result<String, ApiError> {
    let bytes = self.execute(method, path, &[], body, true).await?;
    let message = serde_json::from_slice::<ApiMessage>(&bytes)
      .ok()
      .and_then(|m| m.message)
      .unwrap_or_else(|| "Done".to_string());
    Ok(message)
  }

  /// Exchange credentials for a token
  pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
    let body = LoginRequest { email, password };
    let bytes = self
      .execute(Method::POST, "/api/auth/login", &[], Some(&body), false)
      .await?;
    decode(&bytes)
  }

  /// Get the hostel; `None` when the owner has not created one yet
  pub async fn get_hostel(&self) -> Result<Option<Hostel>, ApiError> {
    self.get("/api/hostel/view", &[]).await
  }

  pub async fn get_stats(&self) -> Result<HostelStats, ApiError> {
    self.get("/api/hostel/stats", &[]).await
  }

  pub async fn get_mess_menu(&self) -> Result<MessMenu, ApiError> {
    self.get("/api/mess/today", &[]).await
  }

  pub async fn create_hostel(&self, hostel: &HostelInput) -> Result<String, ApiError> {
    self.mutate(Method::POST, "/api/hostel/add", Some(hostel)).await
  }

  pub async fn edit_hostel(&self, hostel: &HostelInput) -> Result<String, ApiError> {
    self.mutate(Method::PATCH, "/api/hostel/edit", Some(hostel)).await
  }

  pub async fn remove_hostel(&self) -> Result<String, ApiError> {
    self
      .mutate::<()>(Method::DELETE, "/api/hostel/remove", None)
      .await
  }

  pub async fn get_rooms(&self) -> Result<Vec<Room>, ApiError> {
    let rooms: Option<Vec<Room>> = self.get("/api/hostel/room/get", &[]).await?;
    Ok(rooms.unwrap_or_default())
  }

  pub async fn add_room(&self, room: &Room) -> Result<String, ApiError> {
    self
      .mutate(Method::POST, "/api/hostel/room/add", Some(room))
      .await
  }

  pub async fn edit_room(&self, room_number: &str, update: &RoomUpdate) -> Result<String, ApiError> {
    let path = format!("/api/hostel/room/edit/{}", room_number);
    self.mutate(Method::PATCH, &path, Some(update)).await
  }

  pub async fn remove_room(&self, room_number: &str) -> Result<String, ApiError> {
    let path = format!("/api/hostel/room/remove/{}", room_number);
    self.mutate::<()>(Method::DELETE, &path, None).await
  }

  pub async fn list_tenants(&self, query: &TenantQuery) -> Result<TenantPage, ApiError> {
    let response: Option<TenantListResponse> =
      self.get("/api/tenants/all", &query.to_pairs()).await?;
    Ok(
      response
        .map(TenantPage::from)
        .unwrap_or(TenantPage {
          tenants: Vec::new(),
          total: 0,
        }),
    )
  }

  pub async fn add_tenant(&self, tenant: &Tenant) -> Result<String, ApiError> {
    self.mutate(Method::POST, "/api/tenants/add", Some(tenant)).await
  }

  pub async fn update_tenant(&self, id: &str, update: &TenantUpdate) -> Result<String, ApiError> {
    let path = format!("/api/tenants/update/{}", id);
    self.mutate(Method::PUT, &path, Some(update)).await
  }

  pub async fn delete_tenant(&self, id: &str) -> Result<String, ApiError> {
    let path = format!("/api/tenants/delete/{}", id);
    self.mutate::<()>(Method::DELETE, &path, None).await
  }

  pub async fn record_payment(&self, payment: &Payment) -> Result<String, ApiError> {
    self
      .mutate(Method::POST, "/api/payments/create", Some(payment))
      .await
  }

  pub async fn tenant_transactions(&self, tenant_id: &str) -> Result<Vec<Payment>, ApiError> {
    let path = format!("/api/payments/tenant/{}", tenant_id);
    let response: TransactionsResponse = self.get(&path, &[]).await?;
    Ok(response.data)
  }

  pub async fn delete_payment(&self, transaction_id: &str) -> Result<String, ApiError> {
    let path = format!("/api/payments/delete/{}", transaction_id);
    self.mutate::<()>(Method::DELETE, &path, None).await
  }

  pub async fn list_tickets(&self) -> Result<Vec<MaintenanceTicket>, ApiError> {
    let tickets: Option<Vec<MaintenanceTicket>> = self.get("/api/maintenance/all", &[]).await?;
    Ok(tickets.unwrap_or_default())
  }

  pub async fn create_ticket(&self, ticket: &MaintenanceTicket) -> Result<String, ApiError> {
    self
      .mutate(Method::POST, "/api/maintenance/create", Some(ticket))
      .await
  }

  pub async fn update_ticket(&self, id: &str, ticket: &MaintenanceTicket) -> Result<String, ApiError> {
    let path = format!("/api/maintenance/update/{}", id);
    self.mutate(Method::PUT, &path, Some(ticket)).await
  }

  pub async fn delete_ticket(&self, id: &str) -> Result<String, ApiError> {
    let path = format!("/api/maintenance/delete/{}", id);
    self.mutate::<()>(Method::DELETE, &path, None).await
  }

  pub async fn get_profile(&self) -> Result<Profile, ApiError> {
    let response: ProfileResponse = self.get("/api/user/view-profile", &[]).await?;
    Ok(response.profile_info)
  }

  /// All reviews, unfiltered. `null` reads as none.
  pub async fn list_reviews(&self) -> Result<Vec<Review>, ApiError> {
    let reviews: Option<Vec<Review>> = self.get_public("/api/review/view").await?;
    Ok(reviews.unwrap_or_default())
  }
}

/// Decode a success body. An empty body reads as JSON `null`.
fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ApiError> {
  if bytes.iter().all(|b| b.is_ascii_whitespace()) {
    return Ok(serde_json::from_slice(b"null")?);
  }
  Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::error::TransientKind;
  use serde_json::json;
  use wiremock::matchers::{body_json, header, method, path, query_param};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  async fn client(server: &MockServer) -> HostelClient {
    HostelClient::new(&server.uri(), Duration::from_secs(2))
      .unwrap()
      .with_token(Some("tok-123".to_string()))
  }

  #[tokio::test]
  async fn test_get_rooms_sends_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/hostel/room/get"))
      .and(header("Authorization", "Bearer tok-123"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!([
        {"roomNumber": "101", "sharingType": "Two Sharing", "totalBeds": 2, "availableBeds": 1, "rent": 6500}
      ])))
      .expect(1)
      .mount(&server)
      .await;

    let rooms = client(&server).await.get_rooms().await.unwrap();
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0].room_number, "101");
  }

  #[tokio::test]
  async fn test_missing_token_fails_before_request() {
    let server = MockServer::start().await;
    let client = HostelClient::new(&server.uri(), Duration::from_secs(2)).unwrap();

    let err = client.get_rooms().await.unwrap_err();
    assert!(err.is_auth());
    assert!(server.received_requests().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_401_is_classified_as_auth() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/hostel/view"))
      .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "jwt expired"})))
      .mount(&server)
      .await;

    let err = client(&server).await.get_hostel().await.unwrap_err();
    assert_eq!(
      err,
      ApiError::Auth {
        message: "jwt expired".to_string()
      }
    );
  }

  #[tokio::test]
  async fn test_null_hostel_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/hostel/view"))
      .respond_with(ResponseTemplate::new(200).set_body_string("null"))
      .mount(&server)
      .await;

    assert_eq!(client(&server).await.get_hostel().await.unwrap(), None);
  }

  #[tokio::test]
  async fn test_validation_message_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/api/hostel/room/add"))
      .respond_with(
        ResponseTemplate::new(400).set_body_json(json!({"message": "Room already exists"})),
      )
      .mount(&server)
      .await;

    let room = Room {
      room_number: "101".to_string(),
      sharing_type: "Two Sharing".to_string(),
      total_beds: 2,
      available_beds: 2,
      rent: 6500.0,
    };
    let err = client(&server).await.add_room(&room).await.unwrap_err();
    assert_eq!(err.to_string(), "Room already exists");
    assert!(matches!(err, ApiError::Validation { status: 400, .. }));
  }

  #[tokio::test]
  async fn test_slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/hostel/stats"))
      .respond_with(
        ResponseTemplate::new(200)
          .set_body_json(json!({}))
          .set_delay(Duration::from_secs(2)),
      )
      .mount(&server)
      .await;

    let client = HostelClient::new(&server.uri(), Duration::from_millis(100))
      .unwrap()
      .with_token(Some("tok-123".to_string()));
    let started = std::time::Instant::now();
    let err = client.get_stats().await.unwrap_err();
    assert!(matches!(
      err,
      ApiError::Transient {
        kind: TransientKind::Timeout,
        ..
      }
    ));
    assert_eq!(err, ApiError::timeout());
    // The request timer fires, not the server delay
    assert!(started.elapsed() < Duration::from_secs(1));
  }

  #[tokio::test]
  async fn test_unreachable_server_is_transient() {
    // Nothing listens on port 9 of localhost in the test environment
    let client = HostelClient::new("http://127.0.0.1:9", Duration::from_secs(2))
      .unwrap()
      .with_token(Some("tok-123".to_string()));
    let err = client.get_rooms().await.unwrap_err();
    assert!(matches!(err, ApiError::Transient { .. }));
  }

  #[tokio::test]
  async fn test_tenant_query_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/tenants/all"))
      .and(query_param("page", "2"))
      .and(query_param("search", "asha"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "tenants": [{"_id": "t1", "tenantName": "Asha Rao", "roomNumber": "101"}],
        "total": 6
      })))
      .expect(1)
      .mount(&server)
      .await;

    let query = TenantQuery {
      page: 2,
      search: Some("asha".to_string()),
      ..TenantQuery::default()
    };
    let page = client(&server).await.list_tenants(&query).await.unwrap();
    assert_eq!(page.total, 6);
    assert_eq!(page.tenants[0].id.as_deref(), Some("t1"));
  }

  #[tokio::test]
  async fn test_login_posts_credentials_without_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/api/auth/login"))
      .and(body_json(json!({"email": "owner@example.com", "password": "secret"})))
      .respond_with(
        ResponseTemplate::new(200)
          .set_body_json(json!({"message": "Login successful", "jwtToken": "new-token"})),
      )
      .mount(&server)
      .await;

    let client = HostelClient::new(&server.uri(), Duration::from_secs(2)).unwrap();
    let response = client.login("owner@example.com", "secret").await.unwrap();
    assert_eq!(response.jwt_token, "new-token");
  }

  #[tokio::test]
  async fn test_mutation_message_and_empty_body() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
      .and(path("/api/tenants/delete/t1"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Tenant removed"})))
      .mount(&server)
      .await;
    Mock::given(method("DELETE"))
      .and(path("/api/maintenance/delete/m1"))
      .respond_with(ResponseTemplate::new(204))
      .mount(&server)
      .await;

    let client = client(&server).await;
    assert_eq!(client.delete_tenant("t1").await.unwrap(), "Tenant removed");
    assert_eq!(client.delete_ticket("m1").await.unwrap(), "Done");
  }

  #[tokio::test]
  async fn test_transactions_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/payments/tenant/t1"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "data": [{"_id": "p1", "tenantId": "t1", "paymentAmount": "6500", "rentStatus": "Paid"}]
      })))
      .mount(&server)
      .await;

    let payments = client(&server).await.tenant_transactions("t1").await.unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].payment_amount, 6500.0);
  }

  #[tokio::test]
  async fn test_profile_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/user/view-profile"))
      .and(header("Authorization", "Bearer tok-123"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "profileInfo": {"name": "Lakshmi", "email": "owner@example.com", "contact": 9876543210u64}
      })))
      .mount(&server)
      .await;

    let profile = client(&server).await.get_profile().await.unwrap();
    assert_eq!(profile.name, "Lakshmi");
    assert_eq!(profile.contact, "9876543210");
  }

  #[tokio::test]
  async fn test_reviews_need_no_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/review/view"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!([
        {"_id": "r1", "name": "Asha", "rating": 5, "review": "Homely food"}
      ])))
      .mount(&server)
      .await;

    let anonymous = HostelClient::new(&server.uri(), Duration::from_secs(2)).unwrap();
    let reviews = anonymous.list_reviews().await.unwrap();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0].rating, 5.0);
  }
}
