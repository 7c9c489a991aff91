//! Compact signed token encoding and verification (HMAC-SHA256 JWT)

use std::fmt::Debug;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tracing::debug;

use crate::domain::token::{Claims, TOKEN_ISSUER};
use crate::domain::DomainError;

/// The only accepted signing algorithm. Tokens declaring anything else are rejected.
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// Signs claims into tokens and verifies tokens back into claims
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &SIGNING_ALGORITHM)
            .field("encoding_key", &"[hidden]")
            .field("decoding_key", &"[hidden]")
            .finish()
    }
}

impl TokenCodec {
    /// Create a codec bound to a symmetric secret
    pub(super) fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.set_issuer(&[TOKEN_ISSUER]);
        validation.set_required_spec_claims(&["exp", "nbf", "iss", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Sign claims into a compact, URL-safe token
    pub fn sign(&self, claims: &Claims) -> Result<String, DomainError> {
        encode(&Header::new(SIGNING_ALGORITHM), claims, &self.encoding_key)
            .map_err(|e| DomainError::upstream(format!("Failed to sign token: {}", e)))
    }

    /// Verify signature, algorithm, issuer and validity window.
    ///
    /// Every failure collapses to [`DomainError::InvalidToken`]; the reason is
    /// only visible in debug logs.
    pub fn verify(&self, token: &str) -> Result<Claims, DomainError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(reason = ?e.kind(), "Token verification failed");
                DomainError::InvalidToken
            })?;

        if claims.is_expired() {
            debug!("Token expired");
            return Err(DomainError::InvalidToken);
        }

        if claims.exp <= claims.iat || claims.sub != claims.user_id.to_string() {
            debug!("Token claims are inconsistent");
            return Err(DomainError::InvalidToken);
        }

        Ok(claims)
    }
}
