//! Domain layer - Core business logic and entities

pub mod error;
pub mod token;
pub mod user;

pub use error::DomainError;
pub use token::{Claims, IdentityContext, TokenKind, TokenLifecycle, TokenPair, TOKEN_ISSUER};
pub use user::{NewUser, User, UserId, UserProfile, UserRepository};
