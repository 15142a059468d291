use crate::client::ApiError;
use crate::resources::TableError;
use crate::webhooks::SignatureError;

/// Errors raised while constructing clients, gateways and configuration.
///
/// Per-call failures use the narrower types ([`ApiError`], [`SignatureError`]);
/// they convert into this one for applications that want a single error type.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Invalid API key: {reason}")]
    InvalidApiKey { reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid resource table: {0}")]
    Table(#[from] TableError),

    #[error(transparent)]
    Signature(#[from] SignatureError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl GatewayError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid_api_key(reason: impl Into<String>) -> Self {
        Self::InvalidApiKey {
            reason: reason.into(),
        }
    }
}

/// Result type alias for construction-time APIs
pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::TransportFailure;

    #[test]
    fn test_error_display() {
        let err = GatewayError::config("API key is not configured");
        assert_eq!(err.to_string(), "Configuration error: API key is not configured");

        let err = GatewayError::invalid_api_key("too short");
        assert_eq!(err.to_string(), "Invalid API key: too short");
    }

    #[test]
    fn test_conversions_keep_kind() {
        let err: GatewayError = SignatureError::InvalidSecretFormat.into();
        assert!(matches!(err, GatewayError::Signature(SignatureError::InvalidSecretFormat)));

        let err: GatewayError = ApiError::from(TransportFailure::Timeout).into();
        assert!(matches!(
            err,
            GatewayError::Api(ApiError::TransportFailure(TransportFailure::Timeout))
        ));
    }
}
