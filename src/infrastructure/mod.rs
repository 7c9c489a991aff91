//! Infrastructure layer - Token signing, user stores, logging and metrics

pub mod auth;
pub mod logging;
pub mod observability;
pub mod user;
