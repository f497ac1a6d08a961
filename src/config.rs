use crate::retry::RetryPolicy;
use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  /// Custom title for header (defaults to the backend host if not set)
  pub title: Option<String>,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub retry: RetryConfig,
  #[serde(default)]
  pub tenants: TenantsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  pub url: String,
  /// Email used by `pgdesk login` when none is given on the command line
  pub email: Option<String>,
  /// Per-request timeout in seconds
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
  8
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// How long a fetched resource may be served without going to the network
  #[serde(default = "default_max_age_secs")]
  pub max_age_secs: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      max_age_secs: default_max_age_secs(),
    }
  }
}

fn default_true() -> bool {
  true
}

fn default_max_age_secs() -> u64 {
  5 * 60
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
  #[serde(default = "default_max_attempts")]
  pub max_attempts: u32,
  #[serde(default = "default_initial_delay_ms")]
  pub initial_delay_ms: u64,
  #[serde(default = "default_max_delay_ms")]
  pub max_delay_ms: u64,
}

impl Default for RetryConfig {
  fn default() -> Self {
    Self {
      max_attempts: default_max_attempts(),
      initial_delay_ms: default_initial_delay_ms(),
      max_delay_ms: default_max_delay_ms(),
    }
  }
}

fn default_max_attempts() -> u32 {
  3
}

fn default_initial_delay_ms() -> u64 {
  1000
}

fn default_max_delay_ms() -> u64 {
  10_000
}

impl RetryConfig {
  pub fn policy(&self) -> RetryPolicy {
    RetryPolicy::new(
      self.max_attempts,
      Duration::from_millis(self.initial_delay_ms),
      Duration::from_millis(self.max_delay_ms),
    )
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TenantsConfig {
  /// Page size for the tenant list
  #[serde(default = "default_per_page")]
  pub per_page: u32,
}

impl Default for TenantsConfig {
  fn default() -> Self {
    Self {
      per_page: default_per_page(),
    }
  }
}

fn default_per_page() -> u32 {
  5
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./pgdesk.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/pgdesk/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/pgdesk/config.yaml\n\
                 See config.example.yaml for the format."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("pgdesk.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("pgdesk").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn from_yaml(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    if config.api.url.trim().is_empty() {
      return Err(eyre!("api.url must not be empty"));
    }
    Ok(config)
  }

  pub fn request_timeout(&self) -> Duration {
    Duration::from_secs(self.api.timeout_secs)
  }

  pub fn cache_max_age(&self) -> Duration {
    Duration::from_secs(self.cache.max_age_secs)
  }

  /// Get an API token override from the environment.
  ///
  /// Checks PGDESK_TOKEN. When set it takes precedence over the stored session.
  pub fn token_override() -> Option<String> {
    std::env::var("PGDESK_TOKEN")
      .ok()
      .filter(|t| !t.trim().is_empty())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_minimal_config_uses_defaults() {
    let config = Config::from_yaml("api:\n  url: http://localhost:5000\n").unwrap();

    assert_eq!(config.api.url, "http://localhost:5000");
    assert_eq!(config.request_timeout(), Duration::from_secs(8));
    assert!(config.cache.enabled);
    assert_eq!(config.cache_max_age(), Duration::from_secs(300));
    assert_eq!(config.retry.policy(), RetryPolicy::default());
    assert_eq!(config.tenants.per_page, 5);
  }

  #[test]
  fn test_full_config() {
    let yaml = r#"
api:
  url: https://pg.example.com
  email: owner@example.com
  timeout_secs: 30
title: Sunrise PG
cache:
  enabled: false
  max_age_secs: 60
retry:
  max_attempts: 5
  initial_delay_ms: 200
  max_delay_ms: 4000
tenants:
  per_page: 20
"#;
    let config = Config::from_yaml(yaml).unwrap();

    assert_eq!(config.api.email.as_deref(), Some("owner@example.com"));
    assert_eq!(config.title.as_deref(), Some("Sunrise PG"));
    assert!(!config.cache.enabled);
    let policy = config.retry.policy();
    assert_eq!(policy.max_attempts, 5);
    assert_eq!(policy.initial_delay, Duration::from_millis(200));
    assert_eq!(policy.max_delay, Duration::from_millis(4000));
    assert_eq!(config.tenants.per_page, 20);
  }

  #[test]
  fn test_empty_url_is_rejected() {
    assert!(Config::from_yaml("api:\n  url: \"\"\n").is_err());
  }

  #[test]
  fn test_missing_file_is_an_error() {
    let err = Config::load(Some(Path::new("/nonexistent/pgdesk.yaml"))).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
  }
}
