//! Paired access/refresh token issuance, validation and rotation

use std::fmt::Debug;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use super::codec::TokenCodec;
use crate::domain::token::{Claims, TokenKind, TokenLifecycle, TokenPair};
use crate::domain::user::UserId;
use crate::domain::DomainError;
use crate::infrastructure::observability::record_token_issued;

const MAX_TOKEN_LIFETIME_DAYS: i64 = 3650;

/// Secret key and token lifetimes. Immutable once constructed.
#[derive(Clone)]
pub struct SigningContext {
    secret: Vec<u8>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl Debug for SigningContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningContext")
            .field("secret", &"[hidden]")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

impl SigningContext {
    /// Create a signing context; both lifetimes must be at least one second
    /// and at most ten years
    pub fn new(
        secret: impl Into<Vec<u8>>,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Result<Self, DomainError> {
        let secret = secret.into();

        if secret.is_empty() {
            return Err(DomainError::configuration("Signing secret cannot be empty"));
        }

        for ttl in [access_ttl, refresh_ttl] {
            if ttl < Duration::seconds(1) || ttl > Duration::days(MAX_TOKEN_LIFETIME_DAYS) {
                return Err(DomainError::configuration(format!(
                    "Token lifetimes must be between 1 second and {} days",
                    MAX_TOKEN_LIFETIME_DAYS
                )));
            }
        }

        Ok(Self {
            secret,
            access_ttl,
            refresh_ttl,
        })
    }

    /// Create a signing context with lifetimes given in seconds
    pub fn from_secs(
        secret: impl Into<Vec<u8>>,
        access_ttl_secs: u64,
        refresh_ttl_secs: u64,
    ) -> Result<Self, DomainError> {
        let to_duration = |secs: u64| {
            i64::try_from(secs)
                .ok()
                .and_then(Duration::try_seconds)
                .ok_or_else(|| DomainError::configuration(format!("Token lifetime {}s is too large", secs)))
        };

        Self::new(secret, to_duration(access_ttl_secs)?, to_duration(refresh_ttl_secs)?)
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }
}

/// Stateless token lifecycle manager.
///
/// Owns the signing context; the raw secret never leaves this type.
#[derive(Debug, Clone)]
pub struct TokenManager {
    codec: TokenCodec,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenManager {
    /// Create a manager from a signing context
    pub fn new(context: SigningContext) -> Self {
        Self {
            codec: TokenCodec::new(&context.secret),
            access_ttl: context.access_ttl,
            refresh_ttl: context.refresh_ttl,
        }
    }

    /// Issue a pair as of `now`
    pub fn issue_pair_at(
        &self,
        user_id: UserId,
        email: &str,
        username: &str,
        now: DateTime<Utc>,
    ) -> Result<TokenPair, DomainError> {
        let access = Claims::new(user_id, email, username, TokenKind::Access, now, self.access_ttl);
        let refresh = Claims::new(user_id, email, username, TokenKind::Refresh, now, self.refresh_ttl);

        let access_token = self.codec.sign(&access)?;
        let refresh_token = self.codec.sign(&refresh)?;

        record_token_issued(TokenKind::Access);
        record_token_issued(TokenKind::Refresh);

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: self.access_ttl.num_seconds(),
        })
    }

    /// Verify a token and require the given kind
    pub fn validate(&self, token: &str, expected: TokenKind) -> Result<Claims, DomainError> {
        let claims = self.codec.verify(token)?;

        if claims.kind != expected {
            debug!(expected = %expected, actual = %claims.kind, "Token kind mismatch");
            return Err(DomainError::wrong_token_type(expected.as_str()));
        }

        Ok(claims)
    }
}

impl TokenLifecycle for TokenManager {
    fn issue_pair(
        &self,
        user_id: UserId,
        email: &str,
        username: &str,
    ) -> Result<TokenPair, DomainError> {
        self.issue_pair_at(user_id, email, username, Utc::now())
    }

    fn validate_access(&self, token: &str) -> Result<Claims, DomainError> {
        self.validate(token, TokenKind::Access)
    }

    fn refresh(&self, refresh_token: &str) -> Result<TokenPair, DomainError> {
        let claims = self.validate(refresh_token, TokenKind::Refresh)?;

        self.issue_pair(claims.user_id, &claims.email, &claims.username)
    }
}
