//! Failure taxonomy for calls against the hostel backend.
//!
//! Every failure is tagged with its category where it happens (status code,
//! transport error, local precondition) so that callers never have to guess
//! from message text whether something is worth retrying.

use crate::retry::Retryable;
use thiserror::Error;

/// Why a transient failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientKind {
  /// Could not reach the server at all
  Connect,
  /// Request raced against the timer and lost, or the server said 408/504
  Timeout,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
  /// Expired session or missing credential. Never retried.
  #[error("{message}")]
  Auth { message: String },

  /// Connectivity loss or timeout. Eligible for retry.
  #[error("{message}")]
  Transient { kind: TransientKind, message: String },

  /// 4xx with a message meant for the user. Never retried.
  #[error("{message}")]
  Validation { status: u16, message: String },

  /// 5xx from the backend.
  #[error("Server error: {status}{}", .message.as_deref().map(|m| format!(" ({})", m)).unwrap_or_default())]
  Server { status: u16, message: Option<String> },

  /// The response body did not have the expected shape.
  #[error("Invalid response from server: {0}")]
  Decode(String),
}

impl ApiError {
  pub fn session_expired() -> Self {
    Self::Auth {
      message: "Session expired. Please log in again.".to_string(),
    }
  }

  pub fn missing_token() -> Self {
    Self::Auth {
      message: "No authentication token found. Run `pgdesk login` first.".to_string(),
    }
  }

  pub fn timeout() -> Self {
    Self::Transient {
      kind: TransientKind::Timeout,
      message: "Request timed out. Server is responding slowly.".to_string(),
    }
  }

  pub fn connect(detail: impl std::fmt::Display) -> Self {
    Self::Transient {
      kind: TransientKind::Connect,
      message: format!("Unable to connect to server: {}", detail),
    }
  }

  /// Classify a non-2xx response. `message` is the `{ message }` field of the
  /// error body, if the server sent one.
  pub fn from_status(status: u16, message: Option<String>) -> Self {
    match status {
      401 => match message {
        Some(message) => Self::Auth { message },
        None => Self::session_expired(),
      },
      403 => Self::Validation {
        status,
        message: message
          .unwrap_or_else(|| "Access denied - insufficient permissions".to_string()),
      },
      408 | 504 => Self::Transient {
        kind: TransientKind::Timeout,
        message: message.unwrap_or_else(|| "Request timed out. Please try again.".to_string()),
      },
      400..=499 => Self::Validation {
        status,
        message: message.unwrap_or_else(|| format!("Request rejected ({})", status)),
      },
      _ => Self::Server { status, message },
    }
  }

  pub fn is_auth(&self) -> bool {
    matches!(self, Self::Auth { .. })
  }
}

impl Retryable for ApiError {
  fn is_retryable(&self) -> bool {
    matches!(self, Self::Transient { .. })
  }
}

impl From<reqwest::Error> for ApiError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_timeout() {
      Self::timeout()
    } else if err.is_connect() || err.is_request() {
      Self::connect(err)
    } else if err.is_decode() {
      Self::Decode(err.to_string())
    } else if let Some(status) = err.status() {
      Self::from_status(status.as_u16(), None)
    } else {
      Self::connect(err)
    }
  }
}

impl From<serde_json::Error> for ApiError {
  fn from(err: serde_json::Error) -> Self {
    Self::Decode(err.to_string())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_401_is_auth() {
    let err = ApiError::from_status(401, None);
    assert!(err.is_auth());
    assert!(!err.is_retryable());
  }

  #[test]
  fn test_401_keeps_server_message() {
    let err = ApiError::from_status(401, Some("Token expired".to_string()));
    assert_eq!(err.to_string(), "Token expired");
  }

  #[test]
  fn test_timeouts_are_transient() {
    assert!(ApiError::from_status(408, None).is_retryable());
    assert!(ApiError::from_status(504, None).is_retryable());
    assert!(ApiError::timeout().is_retryable());
  }

  #[test]
  fn test_business_failures_are_not_retried() {
    let err = ApiError::from_status(409, Some("Room 101 already exists".to_string()));
    assert_eq!(
      err,
      ApiError::Validation {
        status: 409,
        message: "Room 101 already exists".to_string()
      }
    );
    assert!(!err.is_retryable());
    assert!(!ApiError::from_status(403, None).is_retryable());
  }

  #[test]
  fn test_server_errors_are_not_retried() {
    let err = ApiError::from_status(500, None);
    assert!(!err.is_retryable());
    assert_eq!(err.to_string(), "Server error: 500");

    let err = ApiError::from_status(502, Some("bad gateway".to_string()));
    assert_eq!(err.to_string(), "Server error: 502 (bad gateway)");
  }
}
