//! Bearer-token authentication gate.
//!
//! [`authenticate`] is a pure decision over the request headers. The strict
//! and optional middlewares only differ in what they do with an
//! [`AuthOutcome::Unauthenticated`] result: strict rejects with 401, optional
//! lets the request through anonymously.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::ApiError;
use crate::domain::token::{IdentityContext, TokenLifecycle};
use crate::domain::DomainError;
use crate::infrastructure::observability::record_gate_decision;

const BEARER_PREFIX: &str = "Bearer ";

/// Why a request carries no usable identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    MissingHeader,
    InvalidScheme,
    EmptyToken,
    InvalidToken,
    WrongTokenType,
}

impl AuthFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingHeader => "missing_header",
            Self::InvalidScheme => "invalid_scheme",
            Self::EmptyToken => "empty_token",
            Self::InvalidToken => "invalid_token",
            Self::WrongTokenType => "wrong_token_type",
        }
    }

    /// Client-facing message. Token failures never reveal their cause.
    pub fn message(&self) -> &'static str {
        match self {
            Self::MissingHeader => "Authorization header is required",
            Self::InvalidScheme => "Authorization header must start with 'Bearer '",
            Self::EmptyToken => "Token is required",
            Self::InvalidToken => "Invalid or expired token",
            Self::WrongTokenType => "Invalid token type",
        }
    }
}

impl From<AuthFailure> for ApiError {
    fn from(failure: AuthFailure) -> Self {
        ApiError::unauthorized(failure.message()).with_code(failure.as_str())
    }
}

/// Result of running the gate over one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Authenticated(IdentityContext),
    Unauthenticated(AuthFailure),
}

/// Pull the raw token out of `Authorization: Bearer <token>`
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AuthFailure> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthFailure::MissingHeader)?;

    // A header that isn't visible ASCII cannot carry the scheme
    let value = value.to_str().map_err(|_| AuthFailure::InvalidScheme)?;

    if value.is_empty() {
        return Err(AuthFailure::MissingHeader);
    }

    let token = value
        .strip_prefix(BEARER_PREFIX)
        .ok_or(AuthFailure::InvalidScheme)?
        .trim();

    if token.is_empty() {
        return Err(AuthFailure::EmptyToken);
    }

    Ok(token)
}

/// Decide whether the request carries a valid access token
pub fn authenticate(headers: &HeaderMap, tokens: &dyn TokenLifecycle) -> AuthOutcome {
    let token = match extract_bearer_token(headers) {
        Ok(token) => token,
        Err(failure) => return AuthOutcome::Unauthenticated(failure),
    };

    match tokens.validate_access(token) {
        Ok(claims) => AuthOutcome::Authenticated(claims.into()),
        Err(DomainError::WrongTokenType { .. }) => {
            AuthOutcome::Unauthenticated(AuthFailure::WrongTokenType)
        }
        Err(_) => AuthOutcome::Unauthenticated(AuthFailure::InvalidToken),
    }
}

/// Strict gate: reject unless a valid access token is presented
pub async fn require_identity(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    match authenticate(request.headers(), state.tokens.as_ref()) {
        AuthOutcome::Authenticated(identity) => {
            debug!(user_id = %identity.user_id, "Request authenticated");
            record_gate_decision("strict", "authenticated");
            request.extensions_mut().insert(identity);
            Ok(next.run(request).await)
        }
        AuthOutcome::Unauthenticated(failure) => {
            debug!(reason = failure.as_str(), "Request rejected");
            record_gate_decision("strict", "rejected");
            Err(failure.into())
        }
    }
}

/// Optional gate: attach identity when possible, never reject
pub async fn optional_identity(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match authenticate(request.headers(), state.tokens.as_ref()) {
        AuthOutcome::Authenticated(identity) => {
            record_gate_decision("optional", "authenticated");
            request.extensions_mut().insert(identity);
        }
        AuthOutcome::Unauthenticated(failure) => {
            debug!(reason = failure.as_str(), "Continuing anonymously");
            record_gate_decision("optional", "anonymous");
        }
    }

    next.run(request).await
}

/// Identity attached by [`require_identity`]
#[derive(Debug, Clone)]
pub struct Identity(pub IdentityContext);

impl<S: Send + Sync> FromRequestParts<S> for Identity {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<IdentityContext>()
            .cloned()
            .map(Identity)
            .ok_or_else(|| AuthFailure::MissingHeader.into())
    }
}

/// Identity attached by [`optional_identity`], if any
#[derive(Debug, Clone)]
pub struct OptionalIdentity(pub Option<IdentityContext>);

impl<S: Send + Sync> FromRequestParts<S> for OptionalIdentity {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalIdentity(parts.extensions.get::<IdentityContext>().cloned()))
    }
}
