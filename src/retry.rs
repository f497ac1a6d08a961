//! Bounded retry with exponential backoff and jitter.
//!
//! Only failures that classify themselves as retryable are retried; anything
//! else (expired sessions, rejected input) is returned on the first attempt.

use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{error, warn};

/// Lower bound of the jitter factor applied to each grown delay.
pub const JITTER_MIN: f64 = 0.75;
/// Exclusive upper bound of the jitter factor.
pub const JITTER_MAX: f64 = 1.25;

/// Failures that know whether another attempt could succeed.
pub trait Retryable {
  fn is_retryable(&self) -> bool;
}

/// How many times to try and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  /// Total number of attempts, including the first one
  pub max_attempts: u32,
  /// Wait before the second attempt
  pub initial_delay: Duration,
  /// Ceiling for any single wait
  pub max_delay: Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_attempts: 3,
      initial_delay: Duration::from_millis(1000),
      max_delay: Duration::from_millis(10_000),
    }
  }
}

impl RetryPolicy {
  pub fn new(max_attempts: u32, initial_delay: Duration, max_delay: Duration) -> Self {
    Self {
      max_attempts: max_attempts.max(1),
      initial_delay,
      max_delay: max_delay.max(initial_delay),
    }
  }

  /// A policy that runs the operation exactly once.
  #[cfg(test)]
  pub fn no_retry() -> Self {
    Self::new(1, Duration::ZERO, Duration::ZERO)
  }

  pub fn backoff(&self) -> Backoff {
    Backoff {
      next: self.initial_delay,
      max: self.max_delay,
    }
  }
}

/// Delay schedule for one executor call.
///
/// The first delay is exactly the initial delay. Every later delay is the
/// previous one doubled, scaled by a jitter factor in `[0.75, 1.25)` and
/// capped at the ceiling, so delays strictly grow until they hit the cap.
#[derive(Debug, Clone)]
pub struct Backoff {
  next: Duration,
  max: Duration,
}

impl Backoff {
  pub fn next_delay<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Duration {
    let current = self.next.min(self.max);
    let jitter = rng.gen_range(JITTER_MIN..JITTER_MAX);
    self.next = current.mul_f64(2.0 * jitter).min(self.max);
    current
  }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// the policy runs out of attempts. The last failure is returned unchanged.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T, E>
where
  E: Retryable + Display,
  F: FnMut() -> Fut,
  Fut: Future<Output = Result<T, E>>,
{
  let max_attempts = policy.max_attempts.max(1);
  let mut backoff = policy.backoff();
  let mut attempt = 0u32;

  loop {
    attempt += 1;
    match operation().await {
      Ok(value) => return Ok(value),
      Err(err) if !err.is_retryable() => return Err(err),
      Err(err) if attempt >= max_attempts => {
        error!(attempts = attempt, error = %err, "All retry attempts failed");
        return Err(err);
      }
      Err(err) => {
        let delay = backoff.next_delay(&mut rand::thread_rng());
        warn!(
          attempt,
          delay_ms = delay.as_millis() as u64,
          error = %err,
          "Attempt failed, retrying"
        );
        tokio::time::sleep(delay).await;
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::ApiError;
  use rand::rngs::StdRng;
  use rand::SeedableRng;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::sync::{Arc, Mutex};
  use tokio::time::Instant;

  #[test]
  fn test_default_policy() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.max_attempts, 3);
    assert_eq!(policy.initial_delay, Duration::from_millis(1000));
    assert_eq!(policy.max_delay, Duration::from_millis(10_000));
  }

  #[test]
  fn test_backoff_first_delay_is_initial() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut backoff = RetryPolicy::default().backoff();
    assert_eq!(backoff.next_delay(&mut rng), Duration::from_millis(1000));
  }

  #[test]
  fn test_backoff_grows_strictly_until_ceiling() {
    let max = Duration::from_millis(10_000);
    for seed in 0..50 {
      let mut rng = StdRng::seed_from_u64(seed);
      let mut backoff = RetryPolicy::default().backoff();
      let mut prev = backoff.next_delay(&mut rng);
      for _ in 0..12 {
        let next = backoff.next_delay(&mut rng);
        assert!(next <= max, "delay {:?} above ceiling", next);
        if prev < max {
          assert!(next > prev, "delay did not grow: {:?} -> {:?}", prev, next);
        } else {
          assert_eq!(next, max);
        }
        prev = next;
      }
      assert_eq!(prev, max);
    }
  }

  #[test]
  fn test_second_delay_within_jitter_band() {
    for seed in 0..50 {
      let mut rng = StdRng::seed_from_u64(seed);
      let mut backoff = RetryPolicy::default().backoff();
      backoff.next_delay(&mut rng);
      let second = backoff.next_delay(&mut rng);
      assert!(second >= Duration::from_millis(1500));
      assert!(second < Duration::from_millis(2500));
    }
  }

  #[tokio::test(start_paused = true)]
  async fn test_auth_failure_is_not_retried() {
    let calls = AtomicU32::new(0);
    let result: Result<(), ApiError> = retry(&RetryPolicy::default(), || {
      calls.fetch_add(1, Ordering::SeqCst);
      async { Err(ApiError::session_expired()) }
    })
    .await;

    assert!(result.unwrap_err().is_auth());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_validation_failure_is_not_retried() {
    let calls = AtomicU32::new(0);
    let result: Result<(), ApiError> = retry(&RetryPolicy::default(), || {
      calls.fetch_add(1, Ordering::SeqCst);
      async { Err(ApiError::from_status(400, Some("Room number is required".into()))) }
    })
    .await;

    assert_eq!(result.unwrap_err().to_string(), "Room number is required");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_transient_failure_exhausts_attempts_with_growing_delays() {
    let stamps = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&stamps);

    let result: Result<(), ApiError> = retry(&RetryPolicy::default(), || {
      recorder.lock().unwrap().push(Instant::now());
      async { Err(ApiError::connect("connection refused")) }
    })
    .await;

    let err = result.unwrap_err();
    assert!(err.is_retryable());

    let stamps = stamps.lock().unwrap();
    assert_eq!(stamps.len(), 3);

    let first_gap = stamps[1] - stamps[0];
    let second_gap = stamps[2] - stamps[1];
    assert_eq!(first_gap, Duration::from_millis(1000));
    assert!(second_gap > first_gap);
    assert!(second_gap <= Duration::from_millis(10_000));
  }

  #[tokio::test(start_paused = true)]
  async fn test_succeeds_after_two_connect_failures() {
    let calls = AtomicU32::new(0);
    let result = retry(&RetryPolicy::default(), || {
      let n = calls.fetch_add(1, Ordering::SeqCst);
      async move {
        if n < 2 {
          Err(ApiError::connect("Failed to fetch"))
        } else {
          Ok("rooms")
        }
      }
    })
    .await;

    assert_eq!(result.unwrap(), "rooms");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test(start_paused = true)]
  async fn test_no_retry_policy_runs_once() {
    let calls = AtomicU32::new(0);
    let result: Result<(), ApiError> = retry(&RetryPolicy::no_retry(), || {
      calls.fetch_add(1, Ordering::SeqCst);
      async { Err(ApiError::timeout()) }
    })
    .await;

    assert!(result.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }
}
