//! HTTP transport.
//!
//! The dispatcher only composes requests; sending them is delegated to a
//! [`Transport`]. [`HttpTransport`] is the production implementation.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use url::Url;

use super::error::TransportFailure;
use super::request::{ApiRequest, ApiResponse, Method, encode_params};
use crate::config::validate_api_key;
use crate::error::{GatewayError, Result};

/// Default API host.
pub const DEFAULT_BASE_URL: &str = "https://api.stripe.com";

/// Sends a composed request and returns whatever the server answered.
///
/// Implementations must not retry and must not interpret the status code;
/// an error status is still `Ok(ApiResponse)` here.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> std::result::Result<ApiResponse, TransportFailure>;
}

/// reqwest-backed transport with bearer authentication.
///
/// The API key is held in a [`SecretString`] and never appears in debug output.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
    api_key: SecretString,
    api_version: Option<String>,
}

impl HttpTransport {
    /// Create a transport for `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL does not parse or the API key format is invalid.
    pub fn new(base_url: &str, api_key: impl Into<SecretString>) -> Result<Self> {
        let api_key: SecretString = api_key.into();
        validate_api_key(api_key.expose_secret())?;

        let base_url = Url::parse(base_url)
            .map_err(|e| GatewayError::config(format!("Invalid API base URL '{base_url}': {e}")))?;

        Ok(Self {
            client: Self::build_client(),
            base_url,
            api_key,
            api_version: None,
        })
    }

    /// Pin the upstream API version (`Stripe-Version` header).
    #[must_use]
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    fn build_client() -> reqwest::Client {
        reqwest::Client::builder()
            .user_agent(concat!("stripe-gateway/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Whether the configured key is a test mode key.
    #[must_use]
    pub fn is_test_mode(&self) -> bool {
        let key = self.api_key.expose_secret();
        key.starts_with("sk_test_") || key.starts_with("rk_test_")
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url.as_str())
            .field("api_version", &self.api_version)
            .field("is_test_mode", &self.is_test_mode())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> std::result::Result<ApiResponse, TransportFailure> {
        let url = self
            .base_url
            .join(&request.path)
            .map_err(|e| TransportFailure::Request(format!("invalid path '{}': {e}", request.path)))?;

        let pairs = encode_params(&request.params);
        let mut builder = match request.method {
            Method::Get => self.client.get(url).query(&pairs),
            Method::Post => self.client.post(url).form(&pairs),
            Method::Delete => self.client.delete(url).query(&pairs),
        };

        builder = builder.bearer_auth(self.api_key.expose_secret());
        if let Some(ref version) = self.api_version {
            builder = builder.header("Stripe-Version", version);
        }
        if let Some(ref key) = request.idempotency_key {
            builder = builder.header("Idempotency-Key", key);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let bytes = response.bytes().await?;

        Ok(ApiResponse {
            status,
            headers,
            body: decode_body(&bytes),
        })
    }
}

/// Decode a JSON body. Bodies that are not JSON (proxies, load balancers,
/// plain-text health answers) are kept as a string: the request completed, so
/// the caller still gets the response.
fn decode_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }

    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

/// In-memory transport for tests.
#[cfg(any(test, feature = "test-util"))]
pub mod test {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records every request and replays scripted results in order.
    ///
    /// When the script runs out, answers `200 {}`.
    #[derive(Default)]
    pub struct MockTransport {
        requests: Mutex<Vec<ApiRequest>>,
        script: Mutex<VecDeque<std::result::Result<ApiResponse, TransportFailure>>>,
        delay: Option<Duration>,
    }

    impl MockTransport {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Sleep before answering, to exercise timeouts and cancellation.
        #[must_use]
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        /// Queue a response.
        pub fn push_response(&self, status: u16, body: Value) {
            self.script
                .lock()
                .unwrap()
                .push_back(Ok(ApiResponse::new(status, body)));
        }

        /// Queue a transport failure.
        pub fn push_failure(&self, failure: TransportFailure) {
            self.script.lock().unwrap().push_back(Err(failure));
        }

        /// Requests received so far (for test assertions).
        pub fn requests(&self) -> Vec<ApiRequest> {
            self.requests.lock().unwrap().clone()
        }

        pub fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send(&self, request: ApiRequest) -> std::result::Result<ApiResponse, TransportFailure> {
            self.requests.lock().unwrap().push(request);

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(ApiResponse::new(200, serde_json::json!({}))))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_KEY: &str = "sk_test_1234567890abcdefghij";

    #[test]
    fn test_new_rejects_bad_key() {
        assert!(matches!(
            HttpTransport::new(DEFAULT_BASE_URL, "pk_test_1234567890abcdefghij"),
            Err(GatewayError::InvalidApiKey { .. })
        ));
    }

    #[test]
    fn test_new_rejects_bad_url() {
        assert!(matches!(
            HttpTransport::new("not a url", TEST_KEY),
            Err(GatewayError::Config(_))
        ));
    }

    #[test]
    fn test_debug_hides_key() {
        let transport = HttpTransport::new(DEFAULT_BASE_URL, TEST_KEY).unwrap();
        let debug = format!("{:?}", transport);
        assert!(!debug.contains(TEST_KEY));
        assert!(debug.contains("is_test_mode: true"));
    }

    #[test]
    fn test_decode_body() {
        assert_eq!(decode_body(b""), Value::Null);
        assert_eq!(decode_body(br#"{"id":"cus_1"}"#)["id"], "cus_1");
        assert_eq!(decode_body(b"Bad Gateway"), Value::String("Bad Gateway".to_string()));
    }

    #[test]
    fn test_non_json_success_body_kept_as_text() {
        assert_eq!(decode_body(b"<html>"), Value::String("<html>".to_string()));
        assert_eq!(decode_body(b"OK"), Value::String("OK".to_string()));
    }
}
