//! HTTP API integration: client, authentication, and the sync transport.

pub mod auth;
pub mod client;
pub mod errors;
pub mod transport;

pub use auth::{AccessTokenProvider, KeyringTokenStore, StaticTokenProvider};
pub use client::{ApiClient, ApiClientConfig};
pub use errors::ApiError;
pub use transport::{ApiResponse, ApiTransport};
