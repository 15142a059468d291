//! Verified webhook intake.
//!
//! [`WebhookGateway`] authenticates a delivery, dispatches it through the
//! [`EventRegistry`] and turns the result into an acknowledgment. Once a
//! delivery is authentic it is acknowledged, whatever its handler does, so
//! Stripe does not keep retrying a handler bug. Handler failures are logged
//! and passed to the optional failure hook.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures::FutureExt;
use secrecy::ExposeSecret;
use serde_json::json;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use super::event::Event;
use super::registry::{DispatchOutcome, EventRegistry};
use super::signature::{SignatureError, SignatureVerifier};
use crate::config::Config;
use crate::error::{GatewayError, Result};

/// Why a delivery was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WebhookRejection {
    #[error(transparent)]
    Signature(#[from] SignatureError),

    #[error("invalid event payload: {0}")]
    InvalidPayload(String),
}

/// What happened to an accepted delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchSummary {
    Handled,
    HandlerFailed,
    HandlerPanicked,
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayOutcome {
    Accepted(DispatchSummary),
    Rejected(WebhookRejection),
}

impl GatewayOutcome {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Accepted(_) => StatusCode::OK,
            Self::Rejected(_) => StatusCode::BAD_REQUEST,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }
}

impl IntoResponse for GatewayOutcome {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            Self::Accepted(_) => json!({ "received": true }),
            Self::Rejected(reason) => json!({ "error": reason.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

/// Details passed to the failure hook.
#[derive(Debug, Clone)]
pub struct HandlerFailure<'a> {
    pub event_type: &'a str,
    pub event_id: &'a str,
    pub message: String,
    pub panicked: bool,
}

type FailureHook = dyn Fn(&HandlerFailure<'_>) + Send + Sync;

/// Authenticates deliveries and dispatches them.
///
/// # Example
///
/// ```rust,ignore
/// use stripe_gateway::webhooks::{EventRegistry, SignatureVerifier, WebhookGateway};
///
/// let registry = EventRegistry::builder()
///     .on("invoice.paid", |event| async move {
///         println!("paid: {:?}", event.object_id());
///         Ok(())
///     })
///     .build();
///
/// let gateway = WebhookGateway::new(SignatureVerifier::new("whsec_...")?, Arc::new(registry))
///     .on_handler_failure(|failure| alert(failure.event_id, &failure.message));
///
/// let outcome = gateway.handle(&body, signature_header).await;
/// ```
#[derive(Clone)]
pub struct WebhookGateway {
    verifier: SignatureVerifier,
    registry: Arc<EventRegistry>,
    on_failure: Option<Arc<FailureHook>>,
}

impl WebhookGateway {
    pub fn new(verifier: SignatureVerifier, registry: Arc<EventRegistry>) -> Self {
        Self {
            verifier,
            registry,
            on_failure: None,
        }
    }

    /// Build a gateway from the configured secret and tolerance.
    ///
    /// # Errors
    ///
    /// Fails if no webhook secret is configured or it is malformed.
    pub fn from_config(config: &Config, registry: Arc<EventRegistry>) -> Result<Self> {
        let secret = config
            .webhook_secret
            .as_ref()
            .ok_or_else(|| GatewayError::config("Webhook secret is not configured"))?;

        let verifier = SignatureVerifier::new(secret.expose_secret())?
            .with_tolerance(config.webhook.tolerance_seconds);

        Ok(Self::new(verifier, registry))
    }

    /// Call `hook` whenever a handler returns an error or panics.
    pub fn on_handler_failure<F>(mut self, hook: F) -> Self
    where
        F: Fn(&HandlerFailure<'_>) + Send + Sync + 'static,
    {
        self.on_failure = Some(Arc::new(hook));
        self
    }

    pub fn verifier(&self) -> &SignatureVerifier {
        &self.verifier
    }

    pub fn registry(&self) -> &EventRegistry {
        &self.registry
    }

    /// Verify `payload` and dispatch an already-decoded event.
    ///
    /// The registry is not consulted when verification fails.
    pub async fn process(
        &self,
        payload: &[u8],
        signature_header: &str,
        event_type: &str,
        event: &Event,
    ) -> GatewayOutcome {
        if let Err(e) = self.verify(payload, signature_header) {
            return GatewayOutcome::Rejected(e);
        }
        GatewayOutcome::Accepted(self.dispatch(event_type, event).await)
    }

    /// Verify `payload`, decode it as an [`Event`] and dispatch it by its type.
    pub async fn handle(&self, payload: &[u8], signature_header: &str) -> GatewayOutcome {
        if let Err(e) = self.verify(payload, signature_header) {
            return GatewayOutcome::Rejected(e);
        }

        let event = match Event::from_slice(payload) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(
                    target: "stripe_gateway::webhooks",
                    error = %e,
                    "Verified webhook payload is not an event"
                );
                return GatewayOutcome::Rejected(WebhookRejection::InvalidPayload(e.to_string()));
            }
        };

        GatewayOutcome::Accepted(self.dispatch(&event.event_type, &event).await)
    }

    fn verify(&self, payload: &[u8], signature_header: &str) -> std::result::Result<(), WebhookRejection> {
        self.verifier.verify(payload, signature_header).map_err(|e| {
            tracing::warn!(
                target: "stripe_gateway::webhooks",
                error = %e,
                "Rejected webhook delivery"
            );
            WebhookRejection::Signature(e)
        })
    }

    async fn dispatch(&self, event_type: &str, event: &Event) -> DispatchSummary {
        let outcome = AssertUnwindSafe(self.registry.dispatch(event_type, event))
            .catch_unwind()
            .await;

        match outcome {
            Ok(DispatchOutcome::Handled) => DispatchSummary::Handled,
            Ok(DispatchOutcome::Ignored) => DispatchSummary::Ignored,
            Ok(DispatchOutcome::HandlerFailed(e)) => {
                self.report(event_type, event, format!("{e:#}"), false);
                DispatchSummary::HandlerFailed
            }
            Err(panic) => {
                self.report(event_type, event, panic_message(panic.as_ref()), true);
                DispatchSummary::HandlerPanicked
            }
        }
    }

    fn report(&self, event_type: &str, event: &Event, message: String, panicked: bool) {
        tracing::error!(
            target: "stripe_gateway::webhooks",
            event_type,
            event_id = %event.id,
            error = %message,
            panicked,
            "Webhook handler failed"
        );

        if let Some(ref hook) = self.on_failure {
            hook(&HandlerFailure {
                event_type,
                event_id: &event.id,
                message,
                panicked,
            });
        }
    }
}

impl std::fmt::Debug for WebhookGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookGateway")
            .field("verifier", &self.verifier)
            .field("registry", &self.registry)
            .field("on_failure", &self.on_failure.is_some())
            .finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}
