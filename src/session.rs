//! Persisted login session.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use color_eyre::{eyre::eyre, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{info, warn};

use crate::api::{HostelClient, HostelService};
use crate::retry::{retry, RetryPolicy};

/// How long a token is trusted after login
pub const SESSION_LIFETIME_HOURS: i64 = 6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
  pub token: String,
  pub email: String,
  pub logged_in_at: DateTime<Utc>,
  pub expires_at: DateTime<Utc>,
}

impl Session {
  pub fn new(token: String, email: String, now: DateTime<Utc>) -> Self {
    Self {
      token,
      email,
      logged_in_at: now,
      expires_at: now + ChronoDuration::hours(SESSION_LIFETIME_HOURS),
    }
  }

  pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
    now >= self.expires_at
  }
}

/// Where the session file lives. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SessionStore {
  path: PathBuf,
}

impl SessionStore {
  /// `$XDG_DATA_HOME/pgdesk/session.json`
  pub fn open() -> Result<Self> {
    let data_dir = dirs::data_dir().ok_or_else(|| eyre!("Could not determine data directory"))?;
    Ok(Self::at(data_dir.join("pgdesk").join("session.json")))
  }

  pub fn at(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Load the stored session. An expired session is removed and reads as none.
  pub fn load(&self) -> Result<Option<Session>> {
    self.load_at(Utc::now())
  }

  fn load_at(&self, now: DateTime<Utc>) -> Result<Option<Session>> {
    if !self.path.exists() {
      return Ok(None);
    }

    let contents = std::fs::read_to_string(&self.path)
      .map_err(|e| eyre!("Failed to read session file {}: {}", self.path.display(), e))?;

    let session: Session = match serde_json::from_str(&contents) {
      Ok(session) => session,
      Err(e) => {
        warn!(path = %self.path.display(), error = %e, "Discarding unreadable session file");
        self.clear()?;
        return Ok(None);
      }
    };

    if session.is_expired(now) {
      info!(email = %session.email, "Stored session has expired");
      self.clear()?;
      return Ok(None);
    }

    Ok(Some(session))
  }

  pub fn save(&self, session: &Session) -> Result<()> {
    if let Some(parent) = self.path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create {}: {}", parent.display(), e))?;
    }

    let contents = serde_json::to_string_pretty(session)?;
    std::fs::write(&self.path, contents)
      .map_err(|e| eyre!("Failed to write session file {}: {}", self.path.display(), e))
  }

  /// Remove the session file. Missing file is fine.
  pub fn clear(&self) -> Result<()> {
    match std::fs::remove_file(&self.path) {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
      Err(e) => Err(eyre!(
        "Failed to remove session file {}: {}",
        self.path.display(),
        e
      )),
    }
  }
}

fn email_pattern() -> &'static Regex {
  static PATTERN: OnceLock<Regex> = OnceLock::new();
  PATTERN.get_or_init(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap_or_else(|_| unreachable!("static pattern"))
  })
}

pub fn is_valid_email(email: &str) -> bool {
  email_pattern().is_match(email.trim())
}

/// Login retries: up to two more attempts, about 1 s and then 1.5 to 2 s apart.
pub fn login_policy() -> RetryPolicy {
  RetryPolicy::new(3, Duration::from_secs(1), Duration::from_secs(2))
}

/// Exchange credentials for a token and persist the session.
pub async fn login(
  client: &HostelClient,
  store: &SessionStore,
  email: &str,
  password: &str,
  policy: &RetryPolicy,
) -> Result<Session> {
  let email = email.trim();
  if !is_valid_email(email) {
    return Err(eyre!("Invalid email address: {}", email));
  }
  if password.is_empty() {
    return Err(eyre!("Password must not be empty"));
  }

  let response = retry(policy, || client.login(email, password)).await?;
  let session = Session::new(response.jwt_token, email.to_string(), Utc::now());
  store.save(&session)?;

  info!(
    email,
    expires_at = %session.expires_at,
    path = %store.path().display(),
    server_message = response.message.as_deref().unwrap_or(""),
    "Logged in"
  );
  Ok(session)
}

/// End the session: forget the token and everything cached under it.
pub fn logout(store: &SessionStore, service: Option<&HostelService>) -> Result<()> {
  if let Some(service) = service {
    service.clear_cache();
  }
  store.clear()?;
  info!("Logged out");
  Ok(())
}

#[cfg(test)]
pub(crate) fn temp_store(name: &str) -> SessionStore {
  let path = std::env::temp_dir()
    .join(format!("pgdesk-test-{}-{}", std::process::id(), name))
    .join("session.json");
  let _ = std::fs::remove_file(&path);
  SessionStore::at(path)
}
