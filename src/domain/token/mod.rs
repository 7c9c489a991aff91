//! Token domain
//!
//! Typed claims, token pairs, the request identity built from them, and the
//! lifecycle trait implemented by the signing infrastructure.

mod claims;
mod lifecycle;

pub use claims::{Claims, IdentityContext, TokenKind, TokenPair, TOKEN_ISSUER};
pub use lifecycle::TokenLifecycle;
