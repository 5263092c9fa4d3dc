//! Port interfaces for the sync engine
//!
//! These traits define the boundary between the generic queue processor and
//! the per-kind infrastructure (SQLite repositories, the screenshot file
//! queue, and the HTTP transport).

use async_trait::async_trait;
use serde_json::Value;
use tempo_domain::Result;

/// One queued observation ready to forward.
///
/// The backlog builds the API payload up front so the processor stays
/// oblivious to per-kind field rules (sentinel task ids, empty URLs).
#[derive(Debug, Clone)]
pub struct PendingUpload {
    /// Backlog-scoped identifier: a row id for database queues, a file name
    /// for the screenshot queue.
    pub id: String,
    /// Payload for one element of the request's `data` array.
    pub body: Value,
}

/// A durable queue of pending observations.
#[async_trait]
pub trait SyncBacklog: Send + Sync {
    /// Fetch up to `limit` pending records, oldest first.
    async fn pending(&self, limit: usize) -> Result<Vec<PendingUpload>>;

    /// Remove one acknowledged record.
    ///
    /// Called only after the remote endpoint returned `success: true` for
    /// the record; this is the durability guarantee.
    async fn remove(&self, id: &str) -> Result<()>;
}

/// Acknowledgment returned by the remote endpoint.
#[derive(Debug, Clone, Default)]
pub struct SyncAck {
    pub success: bool,
    pub message: String,
}

/// Outbound transport for one record at a time.
#[async_trait]
pub trait SyncTransport: Send + Sync {
    /// POST one record payload to the given endpoint path.
    async fn submit(&self, endpoint: &str, record: &Value) -> Result<SyncAck>;
}
