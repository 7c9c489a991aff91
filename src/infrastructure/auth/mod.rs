//! Authentication infrastructure module
//!
//! This module provides the signed token codec and the stateless
//! access/refresh token lifecycle built on top of it.

mod codec;
mod manager;

pub use codec::{TokenCodec, SIGNING_ALGORITHM};
pub use manager::{SigningContext, TokenManager};
