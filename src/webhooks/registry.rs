//! Event type to handler bindings.
//!
//! Handlers are registered on an [`EventRegistryBuilder`] and frozen by
//! [`EventRegistryBuilder::build`]. The built registry is immutable and is
//! shared across request tasks behind an `Arc`.

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use super::event::Event;

/// Error type returned by handlers.
pub type HandlerError = anyhow::Error;

/// Result type returned by handlers.
pub type HandlerResult = Result<(), HandlerError>;

/// Trait for handler objects that carry their own state.
///
/// # Example
///
/// ```rust,ignore
/// use stripe_gateway::webhooks::{Event, EventHandler, HandlerResult};
///
/// struct InvoicePaid {
///     ledger: Ledger,
/// }
///
/// #[async_trait]
/// impl EventHandler for InvoicePaid {
///     async fn handle_event(&self, event: &Event) -> HandlerResult {
///         self.ledger.record(event.object_id()).await?;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle_event(&self, event: &Event) -> HandlerResult;
}

type HandlerFn = dyn Fn(Event) -> BoxFuture<'static, HandlerResult> + Send + Sync;

/// A registered handler: a plain async function or a handler object.
#[derive(Clone)]
pub enum Handler {
    Function(Arc<HandlerFn>),
    Module(Arc<dyn EventHandler>),
}

impl Handler {
    pub fn function<F, Fut>(f: F) -> Self
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self::Function(Arc::new(move |event| f(event).boxed()))
    }

    pub fn module(handler: Arc<dyn EventHandler>) -> Self {
        Self::Module(handler)
    }

    async fn invoke(&self, event: &Event) -> HandlerResult {
        match self {
            Self::Function(f) => f(event.clone()).await,
            Self::Module(handler) => handler.handle_event(event).await,
        }
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Function(_) => f.write_str("Handler::Function"),
            Self::Module(_) => f.write_str("Handler::Module"),
        }
    }
}

/// Result of dispatching one event.
#[derive(Debug)]
pub enum DispatchOutcome {
    Handled,
    HandlerFailed(HandlerError),
    /// No handler is registered for the event type.
    Ignored,
}

impl DispatchOutcome {
    pub fn is_handled(&self) -> bool {
        matches!(self, Self::Handled)
    }

    pub fn is_ignored(&self) -> bool {
        matches!(self, Self::Ignored)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::HandlerFailed(_))
    }
}

#[derive(Default)]
pub struct EventRegistryBuilder {
    bindings: Vec<(String, Handler)>,
}

impl EventRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an async function for `event_type`.
    pub fn on<F, Fut>(self, event_type: impl Into<String>, f: F) -> Self
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.handler(event_type, Handler::function(f))
    }

    /// Register a handler object for `event_type`.
    pub fn module<H: EventHandler + 'static>(self, event_type: impl Into<String>, handler: Arc<H>) -> Self {
        self.handler(event_type, Handler::Module(handler))
    }

    pub fn handler(mut self, event_type: impl Into<String>, handler: Handler) -> Self {
        self.bindings.push((event_type.into(), handler));
        self
    }

    /// Freeze the bindings. A later registration replaces an earlier one.
    pub fn build(self) -> EventRegistry {
        let mut handlers = HashMap::with_capacity(self.bindings.len());
        for (event_type, handler) in self.bindings {
            if handlers.contains_key(&event_type) {
                tracing::debug!(
                    target: "stripe_gateway::webhooks",
                    event_type = %event_type,
                    "Handler registration shadows an earlier one"
                );
            }
            handlers.insert(event_type, handler);
        }
        EventRegistry { handlers }
    }
}

/// Immutable map from exact event type to handler.
#[derive(Debug, Clone, Default)]
pub struct EventRegistry {
    handlers: HashMap<String, Handler>,
}

impl EventRegistry {
    pub fn builder() -> EventRegistryBuilder {
        EventRegistryBuilder::new()
    }

    /// Run the handler bound to `event_type`, if any.
    ///
    /// Matching is exact; `*` has no wildcard meaning. Panics inside the
    /// handler propagate to the caller.
    pub async fn dispatch(&self, event_type: &str, event: &Event) -> DispatchOutcome {
        let Some(handler) = self.handlers.get(event_type) else {
            tracing::debug!(
                target: "stripe_gateway::webhooks",
                event_type,
                event_id = %event.id,
                "No handler registered, ignoring event"
            );
            return DispatchOutcome::Ignored;
        };

        match handler.invoke(event).await {
            Ok(()) => {
                tracing::debug!(
                    target: "stripe_gateway::webhooks",
                    event_type,
                    event_id = %event.id,
                    "Event handled"
                );
                DispatchOutcome::Handled
            }
            Err(e) => DispatchOutcome::HandlerFailed(e),
        }
    }

    pub fn contains(&self, event_type: &str) -> bool {
        self.handlers.contains_key(event_type)
    }

    /// Registered event types, sorted.
    pub fn event_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
