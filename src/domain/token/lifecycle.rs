//! Token lifecycle trait

use std::fmt::Debug;

use super::claims::{Claims, TokenPair};
use crate::domain::user::UserId;
use crate::domain::DomainError;

/// Issues, validates and rotates signed token pairs.
///
/// Implementations are pure functions of their inputs and an immutable
/// signing context, so a single instance is shared across all requests.
pub trait TokenLifecycle: Send + Sync + Debug {
    /// Issue an access + refresh pair for the given identity snapshot
    fn issue_pair(
        &self,
        user_id: UserId,
        email: &str,
        username: &str,
    ) -> Result<TokenPair, DomainError>;

    /// Verify a token and require it to be an access token
    fn validate_access(&self, token: &str) -> Result<Claims, DomainError>;

    /// Verify a refresh token and mint a brand-new pair from its claims.
    ///
    /// The new pair reuses the email/username stored in the refresh token;
    /// account changes made after it was issued are not picked up.
    fn refresh(&self, refresh_token: &str) -> Result<TokenPair, DomainError>;
}
