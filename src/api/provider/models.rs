use serde::Deserialize;
use thiserror::Error;

/// Upstream path for the current user's transactions (paged, GET)
pub const FIND_BY_USER_PATH: &str = "/transaction/find-by-user";
/// Upstream path for filtered search (POST)
pub const SEARCH_PATH: &str = "/transaction/search";

/// Names of the authentication headers, after the configured prefix is applied
#[derive(Debug, Clone)]
pub struct AuthHeaderNames {
    pub key: String,
    pub timestamp: String,
    pub sign: String,
}

impl AuthHeaderNames {
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            key: format!("{}API-KEY", prefix),
            timestamp: format!("{}API-TIMESTAMP", prefix),
            sign: format!("{}API-SIGN", prefix),
        }
    }
}

/// Error body some provider endpoints return
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub error: Option<String>,
    pub message: Option<String>,
}

/// Failure of a single upstream call
///
/// Status-bearing variants keep the upstream body for logging. It is never
/// sent back to callers; `BadRequest` shows only the provider's own message.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("Bad Request: {message}")]
    BadRequest { message: String, body: String },
    #[error("Unauthorized")]
    Unauthorized { body: String },
    #[error("Forbidden")]
    Forbidden { body: String },
    #[error("Not Found")]
    NotFound { body: String },
    #[error("Rate Limited")]
    RateLimited { body: String },
    #[error("Server Error ({status})")]
    ServerError { status: u16, body: String },
    #[error("HTTP Error ({status})")]
    HttpError { status: u16, body: String },
    #[error("Request Error: {0}")]
    Request(String),
    #[error("Deserialization Error: {0}")]
    Deserialization(String),
}

impl ProviderError {
    /// Classify a non-success response
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            400 => {
                let message = serde_json::from_str::<ErrorResponse>(&body)
                    .ok()
                    .and_then(|e| e.message.or(e.error))
                    .unwrap_or_else(|| "request rejected".to_string());
                ProviderError::BadRequest { message, body }
            }
            401 => ProviderError::Unauthorized { body },
            403 => ProviderError::Forbidden { body },
            404 => ProviderError::NotFound { body },
            429 => ProviderError::RateLimited { body },
            500..=599 => ProviderError::ServerError { status, body },
            _ => ProviderError::HttpError { status, body },
        }
    }

    /// Upstream HTTP status, when the provider answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::BadRequest { .. } => Some(400),
            ProviderError::Unauthorized { .. } => Some(401),
            ProviderError::Forbidden { .. } => Some(403),
            ProviderError::NotFound { .. } => Some(404),
            ProviderError::RateLimited { .. } => Some(429),
            ProviderError::ServerError { status, .. } | ProviderError::HttpError { status, .. } => {
                Some(*status)
            }
            ProviderError::Request(_) | ProviderError::Deserialization(_) => None,
        }
    }

    /// Raw upstream body, for logs only
    pub fn upstream_body(&self) -> Option<&str> {
        match self {
            ProviderError::BadRequest { body, .. }
            | ProviderError::Unauthorized { body }
            | ProviderError::Forbidden { body }
            | ProviderError::NotFound { body }
            | ProviderError::RateLimited { body }
            | ProviderError::ServerError { body, .. }
            | ProviderError::HttpError { body, .. } => Some(body),
            ProviderError::Request(_) | ProviderError::Deserialization(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            ProviderError::from_status(401, String::new()),
            ProviderError::Unauthorized { .. }
        ));
        assert!(matches!(
            ProviderError::from_status(429, String::new()),
            ProviderError::RateLimited { .. }
        ));
        assert!(matches!(
            ProviderError::from_status(503, String::new()),
            ProviderError::ServerError { status: 503, .. }
        ));
        assert!(matches!(
            ProviderError::from_status(418, String::new()),
            ProviderError::HttpError { status: 418, .. }
        ));
        for status in [400u16, 401, 403, 404, 429, 502, 418] {
            assert_eq!(ProviderError::from_status(status, String::new()).status(), Some(status));
        }
        assert_eq!(ProviderError::Request("timeout".into()).status(), None);
    }

    #[test]
    fn test_bad_request_message_from_json_body() {
        let err = ProviderError::from_status(400, r#"{"message":"invalid page"}"#.to_string());
        match &err {
            ProviderError::BadRequest { message, .. } => assert_eq!(message, "invalid page"),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(err.to_string(), "Bad Request: invalid page");

        let err = ProviderError::from_status(400, "<html>nope</html>".to_string());
        match &err {
            ProviderError::BadRequest { message, .. } => assert_eq!(message, "request rejected"),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(err.upstream_body(), Some("<html>nope</html>"));
        assert_eq!(err.to_string(), "Bad Request: request rejected");
    }

    #[test]
    fn test_display_does_not_include_body() {
        let err = ProviderError::from_status(503, "internal stack trace".to_string());
        assert_eq!(err.to_string(), "Server Error (503)");
    }

    #[test]
    fn test_header_names() {
        let names = AuthHeaderNames::with_prefix("ACME-");
        assert_eq!(names.key, "ACME-API-KEY");
        assert_eq!(names.timestamp, "ACME-API-TIMESTAMP");
        assert_eq!(names.sign, "ACME-API-SIGN");
        assert_eq!(AuthHeaderNames::with_prefix("").sign, "API-SIGN");
    }
}
