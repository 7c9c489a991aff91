//! API middleware components

pub mod auth;
pub mod logging;
pub mod metrics;
pub mod security;

pub use auth::{
    authenticate, extract_bearer_token, optional_identity, require_identity, AuthFailure,
    AuthOutcome, Identity, OptionalIdentity,
};
pub use logging::logging_middleware;
pub use metrics::metrics_middleware;
pub use security::security_headers_middleware;
