//! axum adapter for the webhook endpoint.

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use std::sync::Arc;

use super::gateway::{GatewayOutcome, WebhookGateway, WebhookRejection};
use super::signature::{SIGNATURE_HEADER, SignatureError};

/// Router serving `POST {path}` with `gateway`.
///
/// ```rust,ignore
/// let app = Router::new()
///     .merge(stripe_gateway::webhooks::router("/webhooks/stripe", Arc::new(gateway)));
/// ```
pub fn router(path: &str, gateway: Arc<WebhookGateway>) -> Router {
    Router::new()
        .route(path, post(receive_webhook))
        .with_state(gateway)
}

/// Handler for a single delivery. The raw body is verified byte for byte.
pub async fn receive_webhook(
    State(gateway): State<Arc<WebhookGateway>>,
    headers: HeaderMap,
    body: Bytes,
) -> GatewayOutcome {
    let Some(signature) = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
    else {
        tracing::warn!(
            target: "stripe_gateway::webhooks",
            "Webhook delivery without a readable signature header"
        );
        return GatewayOutcome::Rejected(WebhookRejection::Signature(
            SignatureError::MalformedSignature("missing stripe-signature header".to_string()),
        ));
    };

    gateway.handle(&body, signature).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::webhooks::registry::EventRegistry;
    use crate::webhooks::signature::SignatureVerifier;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_missing_signature_header_is_bad_request() {
        let gateway = WebhookGateway::new(
            SignatureVerifier::new("whsec_route").unwrap(),
            Arc::new(EventRegistry::default()),
        );
        let app = router("/webhooks", Arc::new(gateway));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhooks")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
