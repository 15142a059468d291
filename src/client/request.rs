//! Outbound request and inbound response types.

use reqwest::header::HeaderMap;
use serde_json::Value;
use std::fmt;

use crate::resources::ResolvedResource;

/// API version prefix for every path.
pub const API_PREFIX: &str = "/v1";

/// Query or body parameters. Nested objects and arrays are sent using
/// bracket notation (`metadata[plan]=pro`, `items[0][price]=price_1`).
pub type Params = serde_json::Map<String, Value>;

/// HTTP methods used by the API. Updates are `POST`, never `PUT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl Method {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully composed API call, ready for a [`Transport`](super::Transport).
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Absolute path, e.g. `/v1/customers/cus_123`.
    pub path: String,
    pub params: Params,
    /// Sent as the `Idempotency-Key` header when present.
    pub idempotency_key: Option<String>,
}

impl ApiRequest {
    /// Compose a request against a resolved resource.
    #[must_use]
    pub fn new(method: Method, resource: &ResolvedResource, params: Params) -> Self {
        Self {
            method,
            path: resource_path(resource),
            params,
            idempotency_key: None,
        }
    }

    #[must_use]
    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// A completed HTTP exchange. Error statuses are still responses at this level.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: HeaderMap,
    /// Decoded JSON body; `null` when the body was empty.
    pub body: Value,
}

impl ApiResponse {
    #[must_use]
    pub fn new(status: u16, body: Value) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status < 400
    }

    /// First value of a header, looked up case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// All values of a header, in the order received.
    #[must_use]
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect()
    }

    /// The upstream `Request-Id` header, useful when reporting failures.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.header("request-id")
    }
}

/// Build `/v1/{collection_path}[/{instance_id}]`.
fn resource_path(resource: &ResolvedResource) -> String {
    match &resource.instance_id {
        Some(id) => format!(
            "{}/{}/{}",
            API_PREFIX,
            resource.collection_path,
            encode_path_segment(id)
        ),
        None => format!("{}/{}", API_PREFIX, resource.collection_path),
    }
}

/// Percent-encode everything outside the RFC 3986 unreserved set.
fn encode_path_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char);
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

/// Flatten parameters into form/query pairs using bracket notation.
///
/// `null` becomes an empty value, which the API treats as "unset".
#[must_use]
pub fn encode_params(params: &Params) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (key, value) in params {
        flatten(key.clone(), value, &mut pairs);
    }
    pairs
}

fn flatten(key: String, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Null => out.push((key, String::new())),
        Value::Bool(b) => out.push((key, b.to_string())),
        Value::Number(n) => out.push((key, n.to_string())),
        Value::String(s) => out.push((key, s.clone())),
        Value::Array(items) if items.is_empty() => out.push((key, String::new())),
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                flatten(format!("{key}[{index}]"), item, out);
            }
        }
        Value::Object(map) if map.is_empty() => out.push((key, String::new())),
        Value::Object(map) => {
            for (field, item) in map {
                flatten(format!("{key}[{field}]"), item, out);
            }
        }
    }
}
