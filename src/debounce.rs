//! Quiet-period debouncing for keystroke-driven requests.

use std::time::Duration;
use tokio::time::Instant;

/// Quiet period before a typed search is sent
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Fires once after input has been quiet for `delay`.
///
/// `touch` on every change, `poll_ready` on every tick.
#[derive(Debug, Clone)]
pub struct Debouncer {
  delay: Duration,
  last_change: Option<Instant>,
}

impl Debouncer {
  pub fn new(delay: Duration) -> Self {
    Self {
      delay,
      last_change: None,
    }
  }

  /// Record a change, restarting the quiet period.
  pub fn touch(&mut self) {
    self.last_change = Some(Instant::now());
  }

  /// Forget a pending change.
  pub fn cancel(&mut self) {
    self.last_change = None;
  }

  pub fn is_pending(&self) -> bool {
    self.last_change.is_some()
  }

  /// True exactly once per burst of changes, after the quiet period.
  pub fn poll_ready(&mut self) -> bool {
    match self.last_change {
      Some(at) if at.elapsed() >= self.delay => {
        self.last_change = None;
        true
      }
      _ => false,
    }
  }
}

impl Default for Debouncer {
  fn default() -> Self {
    Self::new(SEARCH_DEBOUNCE)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test(start_paused = true)]
  async fn test_fires_after_quiet_period() {
    let mut debouncer = Debouncer::default();
    assert!(!debouncer.poll_ready());

    debouncer.touch();
    tokio::time::advance(Duration::from_millis(299)).await;
    assert!(!debouncer.poll_ready());

    tokio::time::advance(Duration::from_millis(1)).await;
    assert!(debouncer.poll_ready());
    assert!(!debouncer.poll_ready());
  }

  #[tokio::test(start_paused = true)]
  async fn test_typing_restarts_quiet_period() {
    let mut debouncer = Debouncer::default();

    for _ in 0..5 {
      debouncer.touch();
      tokio::time::advance(Duration::from_millis(200)).await;
      assert!(!debouncer.poll_ready());
    }

    tokio::time::advance(Duration::from_millis(100)).await;
    assert!(debouncer.poll_ready());
  }

  #[tokio::test(start_paused = true)]
  async fn test_cancel_drops_pending_change() {
    let mut debouncer = Debouncer::default();
    debouncer.touch();
    debouncer.cancel();
    tokio::time::advance(SEARCH_DEBOUNCE).await;
    assert!(!debouncer.poll_ready());
    assert!(!debouncer.is_pending());
  }
}
