//! Inbound webhook handling.
//!
//! - [`signature`]: authenticates deliveries against the endpoint secret(s)
//! - [`registry`]: maps event types to handlers
//! - [`gateway`]: verifies, dispatches and decides the acknowledgment
//! - [`route`]: mounts the gateway on an axum router

pub mod event;
pub mod gateway;
pub mod registry;
pub mod route;
pub mod signature;

pub use event::{Event, EventData};
pub use gateway::{DispatchSummary, GatewayOutcome, HandlerFailure, WebhookGateway, WebhookRejection};
pub use registry::{
    DispatchOutcome, EventHandler, EventRegistry, EventRegistryBuilder, Handler, HandlerError,
    HandlerResult,
};
pub use route::router;
pub use signature::{
    DEFAULT_TOLERANCE_SECONDS, SIGNATURE_HEADER, SignatureError, SignatureHeader, SignatureVerifier,
    compute_signature, signature_header, validate_secret, verify,
};
