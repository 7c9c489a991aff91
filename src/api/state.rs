//! Application state for shared services

use std::sync::Arc;

use crate::domain::token::TokenLifecycle;
use crate::infrastructure::user::AccountOperations;

/// Shared services behind dynamic dispatch; cloned into every request
#[derive(Debug, Clone)]
pub struct AppState {
    pub accounts: Arc<dyn AccountOperations>,
    pub tokens: Arc<dyn TokenLifecycle>,
}

impl AppState {
    pub fn new(accounts: Arc<dyn AccountOperations>, tokens: Arc<dyn TokenLifecycle>) -> Self {
        Self { accounts, tokens }
    }
}
