use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::client::DEFAULT_BASE_URL;
use crate::error::{GatewayError, Result};
use crate::utils::{get_env_parsed, get_env_with_prefix};
use crate::webhooks::signature::{DEFAULT_TOLERANCE_SECONDS, validate_secret};

/// Main configuration for clients and webhook gateways
///
/// Secrets are not serialized and are redacted from debug output.
#[derive(Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(skip)]
    pub api_key: Option<SecretString>,
    #[serde(skip)]
    pub webhook_secret: Option<SecretString>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Pinned upstream API version, sent as `Stripe-Version`
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Page size used when listing without an explicit `limit`
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,
    /// Upper bound on pages fetched by a single listing
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebhookConfig {
    /// Accepted clock skew between signer and receiver
    #[serde(default = "default_tolerance_seconds")]
    pub tolerance_seconds: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_json")]
    pub json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            webhook: WebhookConfig::default(),
            logging: LoggingConfig::default(),
            api_key: None,
            webhook_secret: None,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_version: None,
            timeout_seconds: default_timeout_seconds(),
            page_limit: default_page_limit(),
            max_pages: default_max_pages(),
        }
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            tolerance_seconds: default_tolerance_seconds(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: default_json(),
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api", &self.api)
            .field("webhook", &self.webhook)
            .field("logging", &self.logging)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("webhook_secret", &self.webhook_secret.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_page_limit() -> u32 {
    100
}

fn default_max_pages() -> u32 {
    100
}

fn default_tolerance_seconds() -> u64 {
    DEFAULT_TOLERANCE_SECONDS
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_json() -> bool {
    false
}

/// Validate a Stripe API key format.
///
/// Valid formats:
/// - `sk_test_*` - Test mode secret key
/// - `sk_live_*` - Live mode secret key
/// - `rk_test_*` - Test mode restricted key
/// - `rk_live_*` - Live mode restricted key
pub fn validate_api_key(key: &str) -> Result<()> {
    const MIN_KEY_LENGTH: usize = 20;

    if key.is_empty() {
        return Err(GatewayError::invalid_api_key("API key cannot be empty"));
    }

    if key.len() < MIN_KEY_LENGTH {
        return Err(GatewayError::invalid_api_key(format!(
            "API key too short (minimum {} characters)",
            MIN_KEY_LENGTH
        )));
    }

    let valid_prefixes = ["sk_test_", "sk_live_", "rk_test_", "rk_live_"];
    if !valid_prefixes.iter().any(|prefix| key.starts_with(prefix)) {
        return Err(GatewayError::invalid_api_key(
            "API key must start with sk_test_, sk_live_, rk_test_, or rk_live_",
        ));
    }

    Ok(())
}

/// Builder for Config with environment variable support
#[must_use = "builder does nothing until you call build()"]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(SecretString::from(key.into()));
        self
    }

    pub fn with_webhook_secret(mut self, secret: impl Into<String>) -> Self {
        self.config.webhook_secret = Some(SecretString::from(secret.into()));
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api.base_url = url.into();
        self
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.config.api.api_version = Some(version.into());
        self
    }

    pub fn with_timeout_seconds(mut self, seconds: u64) -> Self {
        self.config.api.timeout_seconds = seconds;
        self
    }

    pub fn with_page_limit(mut self, limit: u32) -> Self {
        self.config.api.page_limit = limit;
        self
    }

    pub fn with_max_pages(mut self, pages: u32) -> Self {
        self.config.api.max_pages = pages;
        self
    }

    pub fn with_webhook_tolerance(mut self, seconds: u64) -> Self {
        self.config.webhook.tolerance_seconds = seconds;
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn with_json_logging(mut self, enabled: bool) -> Self {
        self.config.logging.json = enabled;
        self
    }

    /// Load configuration from environment variables with GATEWAY_ prefix
    ///
    /// Each key is looked up as `GATEWAY_{KEY}` first, then `{KEY}`.
    /// Unparseable numbers are ignored and the previous value is kept.
    pub fn from_env(mut self) -> Self {
        if let Some(key) = get_env_with_prefix("STRIPE_API_KEY") {
            self.config.api_key = Some(SecretString::from(key));
        }
        if let Some(secret) = get_env_with_prefix("STRIPE_WEBHOOK_SECRET") {
            self.config.webhook_secret = Some(SecretString::from(secret));
        }
        if let Some(base_url) = get_env_with_prefix("STRIPE_API_BASE") {
            self.config.api.base_url = base_url;
        }
        if let Some(version) = get_env_with_prefix("STRIPE_API_VERSION") {
            self.config.api.api_version = Some(version);
        }
        if let Some(t) = get_env_parsed("STRIPE_TIMEOUT_SECONDS") {
            self.config.api.timeout_seconds = t;
        }
        if let Some(l) = get_env_parsed("STRIPE_PAGE_LIMIT") {
            self.config.api.page_limit = l;
        }
        if let Some(t) = get_env_parsed("STRIPE_WEBHOOK_TOLERANCE") {
            self.config.webhook.tolerance_seconds = t;
        }
        if let Some(level) = get_env_with_prefix("LOG_LEVEL") {
            self.config.logging.level = level;
        }
        if let Some(json) = get_env_with_prefix("LOG_JSON") {
            self.config.logging.json = json.parse().unwrap_or(false);
        }

        self
    }

    /// Build the configuration, validating all settings
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration is invalid:
    /// - Unparseable API base URL
    /// - Zero timeout
    /// - Page limit outside 1..=100, or zero page cap
    /// - Invalid log level
    /// - Malformed API key or webhook secret (when set)
    pub fn build(self) -> Result<Config> {
        url::Url::parse(&self.config.api.base_url).map_err(|e| {
            GatewayError::config(format!(
                "Invalid API base URL {} - {}",
                self.config.api.base_url, e
            ))
        })?;

        if self.config.api.timeout_seconds == 0 {
            return Err(GatewayError::config("Request timeout must be greater than 0"));
        }

        if !(1..=100).contains(&self.config.api.page_limit) {
            return Err(GatewayError::config(format!(
                "Page limit must be between 1 and 100, got: {}",
                self.config.api.page_limit
            )));
        }

        if self.config.api.max_pages == 0 {
            return Err(GatewayError::config("Page cap must be greater than 0"));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.config.logging.level.to_lowercase().as_str()) {
            return Err(GatewayError::config(format!(
                "Invalid log level: {}. Must be one of: {}",
                self.config.logging.level,
                valid_log_levels.join(", ")
            )));
        }

        if let Some(ref key) = self.config.api_key {
            validate_api_key(key.expose_secret())?;
        }

        if let Some(ref secret) = self.config.webhook_secret {
            validate_secret(secret.expose_secret())?;
        }

        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
