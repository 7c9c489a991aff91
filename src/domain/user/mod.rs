//! User domain
//!
//! This module provides domain types and traits for user accounts,
//! including user entities, validation, and repository traits.

mod entity;
mod repository;
mod validation;

pub use entity::{NewUser, User, UserId, UserProfile};
pub use repository::UserRepository;
pub use validation::{
    validate_email, validate_password, validate_user_id, validate_username, UserValidationError,
};

#[cfg(test)]
pub use repository::mock::MockUserRepository;
