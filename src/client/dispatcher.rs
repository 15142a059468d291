//! CRUD dispatch against resolved resources.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::error::{ApiError, TransportFailure};
use super::request::{ApiRequest, ApiResponse, Method, Params};
use super::transport::{HttpTransport, Transport};
use crate::config::Config;
use crate::error::{GatewayError, Result};
use crate::resources::{EntityRef, EntityResolver};

/// Default per-call timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default page size used by [`StripeClient::list_all`] when none is given.
const DEFAULT_PAGE_LIMIT: u32 = 100;
/// Default upper bound on pages fetched by [`StripeClient::list_all`].
const DEFAULT_MAX_PAGES: u32 = 100;

/// Resource-oriented client: identifiers pick their own collection.
///
/// Every call returns `Result<ApiResponse, ApiError>`; the `must_*` variants
/// panic instead. Cloning is cheap and clones share the transport.
///
/// # Example
///
/// ```rust,ignore
/// use stripe_gateway::{ConfigBuilder, StripeClient, EntityRef};
/// use serde_json::json;
///
/// let config = ConfigBuilder::new().from_env().build()?;
/// let client = StripeClient::from_config(&config)?;
///
/// let customer = client.read("cus_123", &Default::default()).await?;
/// let created = client
///     .create("customers", json!({"email": "a@b.com"}).as_object().unwrap())
///     .await?;
/// let page = client
///     .read(EntityRef::collection("invoices"), json!({"limit": 10}).as_object().unwrap())
///     .await?;
/// ```
#[derive(Clone)]
pub struct StripeClient {
    resolver: EntityResolver,
    transport: Arc<dyn Transport>,
    timeout: Duration,
    page_limit: u32,
    max_pages: u32,
    cancel: Option<CancellationToken>,
}

impl StripeClient {
    /// Create a client over an explicit resolver and transport.
    #[must_use]
    pub fn new(resolver: EntityResolver, transport: Arc<dyn Transport>) -> Self {
        Self {
            resolver,
            transport,
            timeout: DEFAULT_TIMEOUT,
            page_limit: DEFAULT_PAGE_LIMIT,
            max_pages: DEFAULT_MAX_PAGES,
            cancel: None,
        }
    }

    /// Create an HTTP client from configuration.
    ///
    /// # Errors
    ///
    /// Fails if no API key is configured, the key or base URL is invalid, or
    /// the resource table does not validate.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| GatewayError::config("API key is not configured"))?;

        let mut transport = HttpTransport::new(&config.api.base_url, api_key)?;
        if let Some(ref version) = config.api.api_version {
            transport = transport.with_api_version(version.clone());
        }

        Ok(Self::new(EntityResolver::standard()?, Arc::new(transport))
            .with_timeout(Duration::from_secs(config.api.timeout_seconds))
            .with_page_limit(config.api.page_limit)
            .with_max_pages(config.api.max_pages))
    }

    /// Bound every call by `timeout`; expiry yields [`TransportFailure::Timeout`].
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Abort in-flight calls when `token` fires; yields [`TransportFailure::Cancelled`].
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    #[must_use]
    pub fn with_page_limit(mut self, limit: u32) -> Self {
        self.page_limit = limit;
        self
    }

    #[must_use]
    pub fn with_max_pages(mut self, pages: u32) -> Self {
        self.max_pages = pages;
        self
    }

    #[must_use]
    pub fn resolver(&self) -> &EntityResolver {
        &self.resolver
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Retrieve an instance, or list a collection.
    ///
    /// For a type token, `params` become the query string verbatim, so
    /// cursor fields such as `limit` and `starting_after` pass straight through.
    pub async fn read<'a>(
        &self,
        target: impl Into<EntityRef<'a>>,
        params: &Params,
    ) -> std::result::Result<ApiResponse, ApiError> {
        let resource = self.resolver.resolve(target)?;
        let request = ApiRequest::new(Method::Get, &resource, params.clone());
        self.execute("read", request).await
    }

    /// Create an instance in the collection named by `type_token`.
    pub async fn create(
        &self,
        type_token: &str,
        params: &Params,
    ) -> std::result::Result<ApiResponse, ApiError> {
        let resource = self.resolver.resolve_collection(type_token)?;
        let request = ApiRequest::new(Method::Post, &resource, params.clone())
            .with_idempotency_key(idempotency_key("create"));
        self.execute("create", request).await
    }

    /// Update an instance. The API uses `POST` for updates.
    pub async fn update(
        &self,
        id: &str,
        params: &Params,
    ) -> std::result::Result<ApiResponse, ApiError> {
        let resource = self.resolver.resolve_id(id)?;
        let request = ApiRequest::new(Method::Post, &resource, params.clone())
            .with_idempotency_key(idempotency_key("update"));
        self.execute("update", request).await
    }

    /// Delete an instance.
    pub async fn delete(&self, id: &str) -> std::result::Result<ApiResponse, ApiError> {
        let resource = self.resolver.resolve_id(id)?;
        let request = ApiRequest::new(Method::Delete, &resource, Params::new());
        self.execute("delete", request).await
    }

    /// Fetch every object in a collection by following list cursors.
    ///
    /// Uses `limit` from `params` when given, otherwise the configured page
    /// size. Pages backwards when `ending_before` is set. Stops at the page cap.
    pub async fn list_all(
        &self,
        type_token: &str,
        params: &Params,
    ) -> std::result::Result<Vec<Value>, ApiError> {
        let mut query = params.clone();
        query
            .entry("limit")
            .or_insert_with(|| Value::from(self.page_limit));
        let backwards = query.contains_key("ending_before");

        let mut objects = Vec::new();
        for _ in 0..self.max_pages {
            let page = self.read(EntityRef::Type(type_token), &query).await?;

            let data = page
                .body
                .get("data")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            let has_more = page
                .body
                .get("has_more")
                .and_then(Value::as_bool)
                .unwrap_or(false);

            let edge = if backwards { data.first() } else { data.last() };
            let cursor = edge
                .and_then(|object| object.get("id"))
                .and_then(Value::as_str)
                .map(str::to_string);

            objects.extend(data);

            match (has_more, cursor) {
                (true, Some(cursor)) => {
                    let key = if backwards { "ending_before" } else { "starting_after" };
                    query.insert(key.to_string(), Value::String(cursor));
                }
                _ => return Ok(objects),
            }
        }

        tracing::warn!(
            target: "stripe_gateway::client",
            type_token = type_token,
            max_pages = self.max_pages,
            fetched = objects.len(),
            "Stopped listing at page cap"
        );
        Ok(objects)
    }

    /// Like [`read`](Self::read), but panics on any error.
    pub async fn must_read<'a>(&self, target: impl Into<EntityRef<'a>>, params: &Params) -> ApiResponse {
        raise("read", self.read(target, params).await)
    }

    /// Like [`create`](Self::create), but panics on any error.
    pub async fn must_create(&self, type_token: &str, params: &Params) -> ApiResponse {
        raise("create", self.create(type_token, params).await)
    }

    /// Like [`update`](Self::update), but panics on any error.
    pub async fn must_update(&self, id: &str, params: &Params) -> ApiResponse {
        raise("update", self.update(id, params).await)
    }

    /// Like [`delete`](Self::delete), but panics on any error.
    pub async fn must_delete(&self, id: &str) -> ApiResponse {
        raise("delete", self.delete(id).await)
    }

    async fn execute(
        &self,
        operation: &'static str,
        request: ApiRequest,
    ) -> std::result::Result<ApiResponse, ApiError> {
        let method = request.method;
        let path = request.path.clone();

        let call = tokio::time::timeout(self.timeout, self.transport.send(request));
        let result = match self.cancel {
            Some(ref token) => tokio::select! {
                biased;
                () = token.cancelled() => Err(TransportFailure::Cancelled),
                outcome = call => outcome.unwrap_or(Err(TransportFailure::Timeout)),
            },
            None => call.await.unwrap_or(Err(TransportFailure::Timeout)),
        };

        let response = match result {
            Ok(response) => response,
            Err(failure) => {
                tracing::warn!(
                    target: "stripe_gateway::client",
                    operation = operation,
                    method = %method,
                    path = %path,
                    error = %failure,
                    "Request did not complete"
                );
                return Err(failure.into());
            }
        };

        if !response.is_success() {
            tracing::warn!(
                target: "stripe_gateway::client",
                operation = operation,
                method = %method,
                path = %path,
                status = response.status,
                request_id = response.request_id().unwrap_or("-"),
                "API returned error status"
            );
            return Err(ApiError::HttpStatus {
                status: response.status,
                body: response.body,
            });
        }

        tracing::debug!(
            target: "stripe_gateway::client",
            operation = operation,
            method = %method,
            path = %path,
            status = response.status,
            "API request completed"
        );
        Ok(response)
    }
}

impl std::fmt::Debug for StripeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeClient")
            .field("timeout", &self.timeout)
            .field("page_limit", &self.page_limit)
            .field("max_pages", &self.max_pages)
            .field("cancellable", &self.cancel.is_some())
            .finish_non_exhaustive()
    }
}

/// Generate an idempotency key for a mutating operation.
#[inline]
fn idempotency_key(operation: &str) -> String {
    format!("{}_{}", operation, uuid::Uuid::new_v4())
}

/// The single place where request errors become panics.
fn raise(operation: &str, result: std::result::Result<ApiResponse, ApiError>) -> ApiResponse {
    match result {
        Ok(response) => response,
        Err(err) => panic!("{operation} failed: {err}"),
    }
}
