//! Request dispatch.
//!
//! [`StripeClient`] resolves the target collection from an identifier or type
//! token, composes the CRUD request, and sends it through a [`Transport`].
//! HTTP error statuses, transport failures and resolution failures come back
//! as distinct [`ApiError`] variants.

pub mod dispatcher;
pub mod error;
pub mod request;
pub mod transport;

pub use dispatcher::StripeClient;
pub use error::{ApiError, TransportFailure};
pub use request::{API_PREFIX, ApiRequest, ApiResponse, Method, Params, encode_params};
pub use transport::{DEFAULT_BASE_URL, HttpTransport, Transport};

#[cfg(any(test, feature = "test-util"))]
pub use transport::test::MockTransport;
