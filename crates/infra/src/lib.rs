//! # Tempo Infra
//!
//! Infrastructure adapters for the capture-and-forward core: SQLite-backed
//! observation queues, the HTTP sync transport, browser activity resolvers,
//! the screenshot file queue, platform probes, and the capture/idle
//! services that wire the pure state machines in `tempo-core` to the
//! outside world.

pub mod api;
pub mod browser;
pub mod config;
pub mod database;
pub mod paths;
pub mod platform;
pub mod policy;
pub mod screenshots;
pub mod tracking;

pub use api::auth::{AccessTokenProvider, KeyringTokenStore, StaticTokenProvider};
pub use api::client::{ApiClient, ApiClientConfig};
pub use api::transport::ApiTransport;
pub use database::manager::DbManager;
pub use paths::DataLayout;
