//! User infrastructure module
//!
//! Password hashing with Argon2, in-memory and PostgreSQL user stores, and the
//! account service that issues sessions on top of them.

mod password;
mod postgres_repository;
mod repository;
mod service;

pub use password::{Argon2Hasher, PasswordHasher};
pub use postgres_repository::PostgresUserRepository;
pub use repository::InMemoryUserRepository;
pub use service::{AccountOperations, AccountService, AuthSession, ProfileUpdate, RegisterRequest};
