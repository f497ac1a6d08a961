//! Wire envelopes of the hostel backend and lenient field decoders.
//!
//! The backend stores form input as-is, so numeric fields arrive either as
//! JSON numbers or as numeric strings depending on which screen wrote them.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::types::{Payment, Profile, Tenant, TenantPage};

/// `{ message }` body of a failed request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
  #[serde(default)]
  pub message: Option<String>,
}

impl ErrorBody {
  /// Extract the message from a raw error body, if it is JSON with one.
  pub fn message_from(bytes: &[u8]) -> Option<String> {
    serde_json::from_slice::<ErrorBody>(bytes)
      .ok()
      .and_then(|b| b.message)
      .filter(|m| !m.trim().is_empty())
  }
}

/// `{ message }` body of a successful mutation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiMessage {
  #[serde(default)]
  pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
  pub email: &'a str,
  pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
  #[serde(default)]
  pub message: Option<String>,
  pub jwt_token: String,
}

/// `{ profileInfo }` answer of the profile endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
  pub profile_info: Profile,
}

/// The tenant list endpoint answers with a page object when paging
/// parameters are understood and with a bare array otherwise.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TenantListResponse {
  Paged { tenants: Vec<Tenant>, total: u64 },
  List(Vec<Tenant>),
}

impl From<TenantListResponse> for TenantPage {
  fn from(response: TenantListResponse) -> Self {
    match response {
      TenantListResponse::Paged { tenants, total } => TenantPage { tenants, total },
      TenantListResponse::List(tenants) => TenantPage {
        total: tenants.len() as u64,
        tenants,
      },
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionsResponse {
  #[serde(default)]
  pub data: Vec<Payment>,
}

pub(crate) fn lenient_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
  D: Deserializer<'de>,
{
  let value = Value::deserialize(deserializer)?;
  match &value {
    Value::Null => Ok(0),
    Value::Number(n) => n
      .as_u64()
      .and_then(|n| u32::try_from(n).ok())
      .ok_or_else(|| serde::de::Error::custom(format!("expected unsigned integer, got {}", n))),
    Value::String(s) if s.trim().is_empty() => Ok(0),
    Value::String(s) => s
      .trim()
      .parse()
      .map_err(|_| serde::de::Error::custom(format!("expected unsigned integer, got {:?}", s))),
    other => Err(serde::de::Error::custom(format!(
      "expected unsigned integer, got {}",
      other
    ))),
  }
}

pub(crate) fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
  D: Deserializer<'de>,
{
  let value = Value::deserialize(deserializer)?;
  match &value {
    Value::Null => Ok(0.0),
    Value::Number(n) => n
      .as_f64()
      .ok_or_else(|| serde::de::Error::custom(format!("expected number, got {}", n))),
    Value::String(s) if s.trim().is_empty() => Ok(0.0),
    Value::String(s) => s
      .trim()
      .parse()
      .map_err(|_| serde::de::Error::custom(format!("expected number, got {:?}", s))),
    other => Err(serde::de::Error::custom(format!(
      "expected number, got {}",
      other
    ))),
  }
}

pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
  D: Deserializer<'de>,
{
  let value = Value::deserialize(deserializer)?;
  match value {
    Value::Null => Ok(String::new()),
    Value::String(s) => Ok(s),
    Value::Number(n) => Ok(n.to_string()),
    other => Err(serde::de::Error::custom(format!(
      "expected string, got {}",
      other
    ))),
  }
}
