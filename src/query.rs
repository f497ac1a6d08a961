//! Async query abstraction for view data fetching.
//!
//! A `Query<T>` owns a fetcher closure and the state of its latest request.
//! The fetcher receives the cache read options, so the same query can be
//! served from cache or forced to the network. Views start requests from key
//! handlers and collect results on each tick:
//!
//! ```ignore
//! let service = service.clone();
//! let mut rooms = Query::new(move |options| {
//!     let service = service.clone();
//!     async move { service.rooms(options).await }
//! });
//!
//! rooms.fetch();   // cached if fresh
//! rooms.refresh(); // always from the network
//!
//! // In event loop tick
//! if rooms.poll() {
//!     // State changed, trigger re-render
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use tokio::sync::mpsc;
use tracing::debug;

use crate::api::ApiError;
use crate::cache::ReadOptions;

/// The state of a query
#[derive(Debug, Clone)]
pub enum QueryState<T> {
  /// Query has not been started
  Idle,
  /// Query is currently fetching data
  Loading,
  /// Query completed successfully
  Success(T),
  /// Query failed
  Error(ApiError),
}

impl<T> QueryState<T> {
  pub fn is_loading(&self) -> bool {
    matches!(self, QueryState::Loading)
  }

  pub fn error(&self) -> Option<&ApiError> {
    match self {
      QueryState::Error(e) => Some(e),
      _ => None,
    }
  }
}

type BoxFuture<T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send>>;

type FetcherFn<T> = Box<dyn Fn(ReadOptions) -> BoxFuture<T> + Send + Sync>;

/// Async query for data fetching with state management.
///
/// Only the latest request counts: `refresh` drops the receiver of the
/// request in flight, so its result is discarded when it arrives. The
/// request itself is not aborted.
pub struct Query<T> {
  state: QueryState<T>,
  fetcher: FetcherFn<T>,
  receiver: Option<mpsc::UnboundedReceiver<Result<T, ApiError>>>,
  /// Data of the last successful request, kept while a newer one loads
  last_data: Option<T>,
}

impl<T: Clone + Send + 'static> Query<T> {
  /// Create a new query with the given fetcher function.
  ///
  /// The fetcher is called each time a request is started.
  pub fn new<F, Fut>(fetcher: F) -> Self
  where
    F: Fn(ReadOptions) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    Self {
      state: QueryState::Idle,
      fetcher: Box::new(move |options| Box::pin(fetcher(options))),
      receiver: None,
      last_data: None,
    }
  }

  pub fn state(&self) -> &QueryState<T> {
    &self.state
  }

  /// Data of the current state, or of the last success while loading.
  pub fn data(&self) -> Option<&T> {
    match &self.state {
      QueryState::Success(data) => Some(data),
      QueryState::Loading => self.last_data.as_ref(),
      _ => None,
    }
  }

  pub fn is_loading(&self) -> bool {
    self.state.is_loading()
  }

  pub fn error(&self) -> Option<&ApiError> {
    self.state.error()
  }

  /// True when the last request failed because the session is gone.
  pub fn is_auth_error(&self) -> bool {
    self.error().is_some_and(ApiError::is_auth)
  }

  /// Start fetching data if not already loading.
  pub fn fetch(&mut self) {
    if self.state.is_loading() {
      return;
    }
    self.start_fetch(ReadOptions::default());
  }

  /// Re-issue the request bypassing the cache. A request still in flight
  /// is superseded.
  pub fn refresh(&mut self) {
    self.supersede();
    self.start_fetch(ReadOptions::forced());
  }

  fn supersede(&mut self) {
    if self.receiver.take().is_some() {
      debug!("Superseding in-flight request");
    }
  }

  /// Poll for results from a pending fetch.
  ///
  /// Returns `true` if the state changed. Call this on every tick.
  pub fn poll(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    match receiver.try_recv() {
      Ok(Ok(data)) => {
        self.last_data = Some(data.clone());
        self.state = QueryState::Success(data);
        self.receiver = None;
        true
      }
      Ok(Err(error)) => {
        self.state = QueryState::Error(error);
        self.receiver = None;
        true
      }
      Err(mpsc::error::TryRecvError::Empty) => false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        self.state = QueryState::Error(ApiError::Decode("Request was cancelled".to_string()));
        self.receiver = None;
        true
      }
    }
  }

  fn start_fetch(&mut self, options: ReadOptions) {
    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    if let QueryState::Success(data) = &self.state {
      self.last_data = Some(data.clone());
    }
    self.state = QueryState::Loading;

    let future = (self.fetcher)(options);
    tokio::spawn(async move {
      let result = future.await;
      // Receiver is gone when the request was superseded
      let _ = tx.send(result);
    });
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("state", &self.state)
      .finish_non_exhaustive()
  }
}
