//! Request dispatch errors.
//!
//! Callers must be able to tell three situations apart: the request never
//! left (unknown entity type), the server answered with an error status (body
//! preserved), and the request never completed (reason only).

use serde_json::Value;

use crate::resources::ResolveError;

/// Why a request did not complete.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportFailure {
    #[error("request timed out")]
    Timeout,

    #[error("request cancelled")]
    Cancelled,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("invalid response body: {0}")]
    Decode(String),

    #[error("request error: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportFailure {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connection(err.to_string())
        } else if err.is_decode() || err.is_body() {
            Self::Decode(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}

/// Error returned by every non-panicking [`StripeClient`](super::StripeClient) call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    #[error("unrecognized entity type for '{input}'")]
    UnrecognizedEntityType { input: String },

    #[error("HTTP status {status}{}", upstream_message(.body))]
    HttpStatus { status: u16, body: Value },

    #[error("transport failure: {0}")]
    TransportFailure(#[from] TransportFailure),
}

impl From<ResolveError> for ApiError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::UnrecognizedEntityType { input } => Self::UnrecognizedEntityType { input },
        }
    }
}

impl ApiError {
    /// The HTTP status, if the server responded.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The upstream error body, if the server responded.
    #[must_use]
    pub fn body(&self) -> Option<&Value> {
        match self {
            Self::HttpStatus { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Errors the caller can fix (unknown type or 4xx).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::UnrecognizedEntityType { .. } => true,
            Self::HttpStatus { status, .. } => (400..500).contains(status),
            Self::TransportFailure(_) => false,
        }
    }

    /// Upstream 5xx responses.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::HttpStatus { status, .. } if *status >= 500)
    }
}

/// `": {message}"` from a Stripe error body, or nothing.
fn upstream_message(body: &Value) -> String {
    body.get("error")
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .map(|message| format!(": {message}"))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_display() {
        let err = ApiError::HttpStatus {
            status: 400,
            body: json!({"error": {"message": "Invalid email"}}),
        };
        assert_eq!(err.to_string(), "HTTP status 400: Invalid email");

        let err = ApiError::HttpStatus {
            status: 502,
            body: Value::String("<html>bad gateway</html>".to_string()),
        };
        assert_eq!(err.to_string(), "HTTP status 502");

        let err = ApiError::TransportFailure(TransportFailure::Timeout);
        assert_eq!(err.to_string(), "transport failure: request timed out");

        let err = ApiError::UnrecognizedEntityType {
            input: "foo_1".to_string(),
        };
        assert_eq!(err.to_string(), "unrecognized entity type for 'foo_1'");
    }

    #[test]
    fn test_error_classification() {
        let not_found = ApiError::HttpStatus {
            status: 404,
            body: json!({}),
        };
        assert!(not_found.is_client_error());
        assert!(!not_found.is_server_error());
        assert_eq!(not_found.status(), Some(404));

        let unavailable = ApiError::HttpStatus {
            status: 503,
            body: json!({}),
        };
        assert!(!unavailable.is_client_error());
        assert!(unavailable.is_server_error());

        let cancelled = ApiError::from(TransportFailure::Cancelled);
        assert!(!cancelled.is_client_error());
        assert!(!cancelled.is_server_error());
        assert_eq!(cancelled.status(), None);
        assert!(cancelled.body().is_none());
    }

    #[test]
    fn test_from_resolve_error() {
        let err: ApiError = ResolveError::UnrecognizedEntityType {
            input: "widgets".to_string(),
        }
        .into();
        assert!(matches!(err, ApiError::UnrecognizedEntityType { input } if input == "widgets"));
    }
}
