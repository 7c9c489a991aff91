//! Token claims and the values built from them

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::user::UserId;

/// Fixed issuer written into every token minted by this service
pub const TOKEN_ISSUER: &str = "session-auth";

/// Kind of a signed token. Carried as the `type` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Short-lived token authorizing API calls
    Access,
    /// Longer-lived token used only to mint a new pair
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signed payload of a token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Numeric user identifier
    pub user_id: UserId,
    /// Email at issuance time
    pub email: String,
    /// Username at issuance time
    pub username: String,
    /// Access or refresh
    #[serde(rename = "type")]
    pub kind: TokenKind,
    /// Issued at (Unix epoch seconds)
    pub iat: i64,
    /// Not before (Unix epoch seconds)
    pub nbf: i64,
    /// Expires at (Unix epoch seconds)
    pub exp: i64,
    /// Issuer, always [`TOKEN_ISSUER`]
    pub iss: String,
    /// Subject, the decimal user id
    pub sub: String,
}

impl Claims {
    /// Build claims valid from `now` for `ttl`
    pub fn new(
        user_id: UserId,
        email: impl Into<String>,
        username: impl Into<String>,
        kind: TokenKind,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        let iat = now.timestamp();

        Self {
            user_id,
            email: email.into(),
            username: username.into(),
            kind,
            iat,
            nbf: iat,
            exp: (now + ttl).timestamp(),
            iss: TOKEN_ISSUER.to_string(),
            sub: user_id.to_string(),
        }
    }

    /// Whether the claims are outside their validity window at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Access and refresh tokens issued together for one subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

/// Identity attached to a request after the access token was accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityContext {
    pub user_id: UserId,
    pub email: String,
    pub username: String,
    pub claims: Claims,
}

impl From<Claims> for IdentityContext {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.user_id,
            email: claims.email.clone(),
            username: claims.username.clone(),
            claims,
        }
    }
}
