//! Access token storage
//!
//! Tokens live in the operating system keychain; a process-local cache
//! avoids hitting the keychain on every request. Nothing here owns a global
//! instance: callers construct a store and pass it to whatever needs it.

use std::sync::RwLock;

use async_trait::async_trait;
use keyring::Entry;
use tracing::debug;

use super::errors::ApiError;

/// Supplies the access token attached to outbound requests.
///
/// An empty token means "not authenticated"; the client then sends the
/// request without an `Authorization` header and lets the server reject it.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String, ApiError>;
}

/// Keychain-backed token store with an in-process read cache.
pub struct KeyringTokenStore {
    service: String,
    account: String,
    cached: RwLock<Option<String>>,
}

impl KeyringTokenStore {
    pub fn new(service: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            account: account.into(),
            cached: RwLock::new(None),
        }
    }

    fn entry(&self) -> Result<Entry, ApiError> {
        Entry::new(&self.service, &self.account)
            .map_err(|e| ApiError::Config(format!("keychain entry unavailable: {e}")))
    }

    /// Store a token in the keychain and refresh the cache.
    pub fn set_token(&self, token: &str) -> Result<(), ApiError> {
        self.entry()?
            .set_password(token)
            .map_err(|e| ApiError::Config(format!("failed to store token: {e}")))?;
        if let Ok(mut guard) = self.cached.write() {
            *guard = Some(token.to_string());
        }
        debug!("access token updated in keychain");
        Ok(())
    }

    /// Current token, or `None` when no token has been stored.
    pub fn token(&self) -> Option<String> {
        if let Ok(guard) = self.cached.read() {
            if let Some(token) = guard.as_ref() {
                return Some(token.clone());
            }
        }

        match self.entry().ok()?.get_password() {
            Ok(token) => {
                if let Ok(mut guard) = self.cached.write() {
                    *guard = Some(token.clone());
                }
                Some(token)
            }
            Err(keyring::Error::NoEntry) => None,
            Err(e) => {
                debug!(error = %e, "keychain read failed");
                None
            }
        }
    }

    /// Remove the stored token. Missing entries are not an error.
    pub fn clear(&self) -> Result<(), ApiError> {
        if let Ok(mut guard) = self.cached.write() {
            *guard = None;
        }
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(ApiError::Config(format!("failed to clear token: {e}"))),
        }
    }
}

#[async_trait]
impl AccessTokenProvider for KeyringTokenStore {
    async fn access_token(&self) -> Result<String, ApiError> {
        Ok(self.token().unwrap_or_default())
    }
}

/// Fixed-token provider for tests and headless environments without a
/// keychain service.
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

#[async_trait]
impl AccessTokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String, ApiError> {
        Ok(self.token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_provider_returns_its_token() {
        let provider = StaticTokenProvider::new("tok-123");
        assert_eq!(provider.access_token().await.unwrap(), "tok-123");
    }

    #[tokio::test]
    async fn empty_static_token_means_unauthenticated() {
        let provider = StaticTokenProvider::new("");
        assert_eq!(provider.access_token().await.unwrap(), "");
    }
}
