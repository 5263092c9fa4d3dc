//! HTTP client for the ingestion API
//!
//! Thin wrapper over `reqwest` that attaches the access token, joins paths
//! onto the configured base URL, and maps non-success statuses onto the
//! [`ApiError`] taxonomy.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::auth::AccessTokenProvider;
use super::errors::ApiError;

#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl ApiClientConfig {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self { base_url: base_url.into(), timeout }
    }
}

pub struct ApiClient {
    http: reqwest::Client,
    auth: Arc<dyn AccessTokenProvider>,
    config: ApiClientConfig,
}

impl ApiClient {
    pub fn new(
        config: ApiClientConfig,
        auth: Arc<dyn AccessTokenProvider>,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, auth, config })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let mut builder = self.http.request(method, self.url(path));
        let token = self.auth.access_token().await?;
        if !token.is_empty() {
            // The server expects the raw token, not a Bearer scheme.
            builder = builder.header(reqwest::header::AUTHORIZATION, token);
        }
        Ok(builder)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.request(Method::GET, path).await?.send().await?;
        Self::handle_response(path, response).await
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T, ApiError> {
        let response = self.request(Method::POST, path).await?.json(body).send().await?;
        Self::handle_response(path, response).await
    }

    async fn handle_response<T: DeserializeOwned>(
        path: &str,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let message = response.text().await.unwrap_or_default();
        debug!(path, status = status.as_u16(), "request rejected");
        Err(Self::status_error(status, message))
    }

    fn status_error(status: StatusCode, message: String) -> ApiError {
        let message = if message.is_empty() {
            status.canonical_reason().unwrap_or("request failed").to_string()
        } else {
            message
        };
        ApiError::from_status(status.as_u16(), message)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::api::auth::StaticTokenProvider;

    fn client(base_url: &str, token: &str) -> ApiClient {
        ApiClient::new(
            ApiClientConfig::new(base_url, Duration::from_secs(5)),
            Arc::new(StaticTokenProvider::new(token)),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn sends_raw_token_in_authorization_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/configuration"))
            .and(header("Authorization", "raw-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server.uri(), "raw-token");
        let body: Value = client.get("/configuration").await.unwrap();
        assert_eq!(body["ok"], true);
    }

    #[tokio::test]
    async fn omits_authorization_header_without_a_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/configuration"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = client(&server.uri(), "");
        let err = client.get::<Value>("/configuration").await.unwrap_err();
        assert!(matches!(err, ApiError::Auth(_)));
        let requests = server.received_requests().await.unwrap();
        assert!(!requests[0].headers.contains_key("authorization"));
    }

    #[tokio::test]
    async fn maps_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/activities"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = client(&server.uri(), "t");
        let err = client
            .post::<Value>("/activities", &serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Server { status: 500, .. }));
    }

    #[test]
    fn url_join_handles_slashes() {
        let client = client("http://example.test/api/", "t");
        assert_eq!(client.url("/activities"), "http://example.test/api/activities");
        assert_eq!(client.url("activities"), "http://example.test/api/activities");
    }
}
