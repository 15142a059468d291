//! stripe-gateway - Stripe API client and webhook intake
//!
//! Two halves, sharing configuration, error types and logging:
//!
//! - **Outbound**: [`StripeClient`] maps an object identifier (`cus_123`) or a
//!   type token (`customers`) to its collection via a validated prefix table,
//!   then performs CRUD calls over a pluggable [`Transport`](client::Transport).
//! - **Inbound**: [`WebhookGateway`](webhooks::WebhookGateway) verifies the
//!   `Stripe-Signature` header, dispatches the event to the handler registered
//!   for its type, and decides the acknowledgment.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use stripe_gateway::webhooks::{EventRegistry, WebhookGateway, router};
//! use stripe_gateway::{ConfigBuilder, StripeClient};
//!
//! # async fn run() -> stripe_gateway::Result<()> {
//! stripe_gateway::init_tracing();
//!
//! let config = ConfigBuilder::new().from_env().build()?;
//!
//! let client = StripeClient::from_config(&config)?;
//! let customer = client.read("cus_123", &Default::default()).await?;
//! println!("{}", customer.body);
//!
//! let registry = EventRegistry::builder()
//!     .on("invoice.paid", |event| async move {
//!         tracing::info!(invoice = ?event.object_id(), "invoice paid");
//!         Ok(())
//!     })
//!     .build();
//! let gateway = WebhookGateway::from_config(&config, Arc::new(registry))?;
//! let app = router("/webhooks/stripe", Arc::new(gateway));
//! # let _ = app;
//! # Ok(())
//! # }
//! ```

pub mod client;
mod config;
mod error;
pub mod resources;
pub mod utils;
pub mod webhooks;

pub use client::{ApiError, ApiResponse, Params, StripeClient, TransportFailure};
pub use config::{ApiConfig, Config, ConfigBuilder, LoggingConfig, WebhookConfig, validate_api_key};
pub use error::{GatewayError, Result};
pub use resources::{EntityRef, EntityResolver, PrefixTable, ResourceType};

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing from the environment.
///
/// The filter comes from `RUST_LOG` (default `info`); set `GATEWAY_LOG_JSON=true`
/// for JSON output. Does nothing if a global subscriber is already installed.
///
/// # Example
///
/// ```rust,no_run
/// #[tokio::main]
/// async fn main() {
///     stripe_gateway::init_tracing();
///     // ... rest of your app
/// }
/// ```
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_logs = std::env::var("GATEWAY_LOG_JSON")
        .map(|v| v.parse::<bool>().unwrap_or(false))
        .unwrap_or(false);

    install(env_filter, json_logs);
}

/// Initialize tracing from [`LoggingConfig`].
pub fn init_tracing_with_config(config: &Config) {
    install(EnvFilter::new(&config.logging.level), config.logging.json);
}

fn install(env_filter: EnvFilter, json: bool) {
    let result = if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
    };

    if result.is_err() {
        tracing::debug!("Global tracing subscriber already installed");
    }
}
