//! Session Auth
//!
//! Stateless session tokens for a user-account service:
//! - Paired HS256 access/refresh tokens with typed claims
//! - Strict and optional bearer-token authentication gates
//! - Registration, login, refresh, profile and external-identity linking
//! - In-memory or PostgreSQL user storage

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use tracing::{info, warn};

use api::state::AppState;
use domain::token::TokenLifecycle;
use infrastructure::auth::TokenManager;
use infrastructure::user::{
    AccountOperations, AccountService, Argon2Hasher, InMemoryUserRepository,
    PostgresUserRepository,
};

/// Create the application state with default configuration (in-memory store)
pub async fn create_app_state() -> anyhow::Result<AppState> {
    create_app_state_with_config(&AppConfig::default()).await
}

/// Create the application state with custom configuration
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    let signing_context = config.auth.signing_context()?;
    let tokens: Arc<dyn TokenLifecycle> = Arc::new(TokenManager::new(signing_context));
    let hasher = Arc::new(Argon2Hasher::new());

    let accounts: Arc<dyn AccountOperations> = match &config.database.url {
        Some(url) => {
            info!("Connecting to PostgreSQL...");
            let repository =
                PostgresUserRepository::connect(url, config.database.max_connections).await?;
            info!("PostgreSQL user store ready");

            Arc::new(AccountService::new(Arc::new(repository), hasher, tokens.clone()))
        }
        None => {
            warn!("database.url not set, using in-memory user store; accounts are lost on restart");

            Arc::new(AccountService::new(
                Arc::new(InMemoryUserRepository::new()),
                hasher,
                tokens.clone(),
            ))
        }
    };

    Ok(AppState::new(accounts, tokens))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_app_state_in_memory() {
        let state = create_app_state().await.unwrap();

        let session = state
            .accounts
            .register(infrastructure::user::RegisterRequest {
                email: "a@x.com".to_string(),
                username: "alice".to_string(),
                password: "secret1".to_string(),
            })
            .await
            .unwrap();

        assert!(state.tokens.validate_access(&session.tokens.access_token).is_ok());
        assert!(state.accounts.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_create_app_state_rejects_bad_ttl() {
        let mut config = AppConfig::default();
        config.auth.refresh_token_ttl_secs = 0;

        assert!(create_app_state_with_config(&config).await.is_err());
    }
}
