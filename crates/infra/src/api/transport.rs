//! Sync transport over the ingestion API
//!
//! Each pending row is submitted individually as `{"data": [payload]}` to
//! its kind's endpoint. The server answers with an envelope whose `success`
//! flag decides whether the local row may be deleted.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tempo_core::sync::SyncAck;
use tempo_domain::errors::{Result, TempoError};

use super::client::ApiClient;

/// Standard response envelope returned by every ingestion endpoint.
///
/// The explicit bound keeps the derived impl from demanding `T: Default`
/// for the defaulted `data` field; payload types only need `Deserialize`.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ApiResponse<T = Value> {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<T>,
}

/// [`tempo_core::sync::SyncTransport`] backed by the shared [`ApiClient`].
pub struct ApiTransport {
    client: Arc<ApiClient>,
}

impl ApiTransport {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl tempo_core::sync::SyncTransport for ApiTransport {
    async fn submit(&self, endpoint: &str, record: &Value) -> Result<SyncAck> {
        let envelope = json!({ "data": [record] });
        let response: ApiResponse = self
            .client
            .post(endpoint, &envelope)
            .await
            .map_err(TempoError::from)?;
        Ok(SyncAck {
            success: response.success,
            message: response.message.unwrap_or_default(),
        })
    }
}
