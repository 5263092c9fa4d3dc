//! API error types

use tempo_domain::errors::TempoError;
use thiserror::Error;

/// Errors surfaced by the HTTP layer, classified by response status.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("rate limited: {0}")]
    RateLimit(String),

    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("client error ({status}): {message}")]
    Client { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// Map a non-success HTTP status to the matching error variant.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 | 403 => Self::Auth(message),
            429 => Self::RateLimit(message),
            500..=599 => Self::Server { status, message },
            _ => Self::Client { status, message },
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<ApiError> for TempoError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Auth(msg) => TempoError::Auth(msg),
            ApiError::Config(msg) => TempoError::Config(msg),
            ApiError::InvalidResponse(msg) => TempoError::InvalidFormat(msg),
            other => TempoError::Network(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert!(matches!(ApiError::from_status(401, String::new()), ApiError::Auth(_)));
        assert!(matches!(ApiError::from_status(403, String::new()), ApiError::Auth(_)));
        assert!(matches!(ApiError::from_status(429, String::new()), ApiError::RateLimit(_)));
        assert!(matches!(
            ApiError::from_status(503, String::new()),
            ApiError::Server { status: 503, .. }
        ));
        assert!(matches!(
            ApiError::from_status(404, String::new()),
            ApiError::Client { status: 404, .. }
        ));
    }

    #[test]
    fn auth_errors_convert_to_domain_auth() {
        let domain: TempoError = ApiError::Auth("expired".to_string()).into();
        assert!(matches!(domain, TempoError::Auth(_)));
    }
}
