//! REST access to the hostel backend.

mod api_types;
pub mod cache;
mod cached_client;
mod client;
mod error;
pub mod types;

pub use cached_client::{HostelService, SharedCache};
pub use client::HostelClient;
pub use error::ApiError;
