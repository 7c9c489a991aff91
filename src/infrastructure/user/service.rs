//! Account service: registration, login, session refresh and profile management

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::domain::token::{TokenLifecycle, TokenPair};
use crate::domain::user::{
    validate_email, validate_password, validate_username, NewUser, User, UserId, UserProfile,
    UserRepository,
};
use crate::domain::DomainError;
use crate::infrastructure::observability::record_login;

use super::password::PasswordHasher;

const PLACEHOLDER_PASSWORD: &str = "placeholder-password-for-unknown-accounts";

/// Request for registering a new account
#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

/// Partial update of profile fields; `None` leaves a field untouched
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub email: Option<String>,
    pub username: Option<String>,
}

/// Profile plus freshly issued tokens
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub user: UserProfile,
    pub tokens: TokenPair,
}

/// Account operations exposed to the HTTP layer
#[async_trait]
pub trait AccountOperations: Send + Sync + std::fmt::Debug {
    async fn register(&self, request: RegisterRequest) -> Result<AuthSession, DomainError>;

    async fn login(&self, email: &str, password: &str) -> Result<AuthSession, DomainError>;

    async fn refresh_session(&self, refresh_token: &str) -> Result<TokenPair, DomainError>;

    async fn get_profile(&self, id: UserId) -> Result<UserProfile, DomainError>;

    async fn update_profile(
        &self,
        id: UserId,
        update: ProfileUpdate,
    ) -> Result<UserProfile, DomainError>;

    async fn link_external_identity(
        &self,
        id: UserId,
        external_id: i64,
    ) -> Result<UserProfile, DomainError>;

    async fn get_by_external_identity(&self, external_id: i64)
        -> Result<UserProfile, DomainError>;

    /// Cheap store round trip for readiness probes
    async fn ping(&self) -> Result<(), DomainError>;
}

/// Account service over a user store, a password hasher and the token lifecycle
#[derive(Debug)]
pub struct AccountService<R: UserRepository, H: PasswordHasher> {
    repository: Arc<R>,
    hasher: Arc<H>,
    tokens: Arc<dyn TokenLifecycle>,
    placeholder_hash: OnceLock<String>,
}

impl<R: UserRepository, H: PasswordHasher> AccountService<R, H> {
    pub fn new(repository: Arc<R>, hasher: Arc<H>, tokens: Arc<dyn TokenLifecycle>) -> Self {
        Self {
            repository,
            hasher,
            tokens,
            placeholder_hash: OnceLock::new(),
        }
    }

    /// Unknown emails pay for one hash verification like a wrong password does
    fn verify_placeholder(&self, password: &str) {
        let hash = self
            .placeholder_hash
            .get_or_init(|| self.hasher.hash(PLACEHOLDER_PASSWORD).unwrap_or_default());

        self.hasher.verify(password, hash);
    }

    async fn require_user(&self, id: UserId) -> Result<User, DomainError> {
        self.repository
            .get(id)
            .await
            .inspect_err(log_upstream)?
            .ok_or_else(|| DomainError::not_found(format!("User '{}' not found", id)))
    }

    fn issue_session(&self, user: &User) -> Result<AuthSession, DomainError> {
        let tokens = self
            .tokens
            .issue_pair(user.id(), user.email(), user.username())
            .inspect_err(log_upstream)?;

        Ok(AuthSession {
            user: user.profile(),
            tokens,
        })
    }
}

#[async_trait]
impl<R: UserRepository, H: PasswordHasher> AccountOperations for AccountService<R, H> {
    async fn register(&self, request: RegisterRequest) -> Result<AuthSession, DomainError> {
        validate_email(&request.email).map_err(|e| DomainError::validation(e.to_string()))?;
        validate_username(&request.username)
            .map_err(|e| DomainError::validation(e.to_string()))?;
        validate_password(&request.password)
            .map_err(|e| DomainError::validation(e.to_string()))?;

        // Fast-path checks; the store's own uniqueness guard settles races
        if self.repository.email_exists(&request.email).await? {
            return Err(DomainError::conflict(format!(
                "Email '{}' already exists",
                request.email
            )));
        }

        if self.repository.username_exists(&request.username).await? {
            return Err(DomainError::conflict(format!(
                "Username '{}' already exists",
                request.username
            )));
        }

        let password_hash = self.hasher.hash(&request.password).inspect_err(log_upstream)?;

        let user = self
            .repository
            .create(NewUser {
                email: request.email,
                username: request.username,
                password_hash,
            })
            .await
            .inspect_err(log_upstream)?;

        info!(user_id = %user.id(), "Account registered");

        self.issue_session(&user)
    }

    async fn login(&self, email: &str, password: &str) -> Result<AuthSession, DomainError> {
        let user = self
            .repository
            .get_by_email(email)
            .await
            .inspect_err(log_upstream)?;

        let Some(user) = user else {
            self.verify_placeholder(password);
            return Err(reject_login());
        };

        if !self.hasher.verify(password, user.password_hash()) {
            return Err(reject_login());
        }

        record_login(true);
        info!(user_id = %user.id(), "Login succeeded");

        self.issue_session(&user)
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<TokenPair, DomainError> {
        self.tokens.refresh(refresh_token)
    }

    async fn get_profile(&self, id: UserId) -> Result<UserProfile, DomainError> {
        Ok(self.require_user(id).await?.profile())
    }

    async fn update_profile(
        &self,
        id: UserId,
        update: ProfileUpdate,
    ) -> Result<UserProfile, DomainError> {
        let mut user = self.require_user(id).await?;

        if let Some(email) = update.email.filter(|e| e != user.email()) {
            validate_email(&email).map_err(|e| DomainError::validation(e.to_string()))?;

            if self.repository.email_exists(&email).await? {
                return Err(DomainError::conflict(format!("Email '{}' already exists", email)));
            }

            user.set_email(email);
        }

        if let Some(username) = update.username.filter(|u| u != user.username()) {
            validate_username(&username).map_err(|e| DomainError::validation(e.to_string()))?;

            if self.repository.username_exists(&username).await? {
                return Err(DomainError::conflict(format!(
                    "Username '{}' already exists",
                    username
                )));
            }

            user.set_username(username);
        }

        let updated = self.repository.update(&user).await.inspect_err(log_upstream)?;

        info!(user_id = %id, "Profile updated");

        Ok(updated.profile())
    }

    async fn link_external_identity(
        &self,
        id: UserId,
        external_id: i64,
    ) -> Result<UserProfile, DomainError> {
        if let Some(owner) = self
            .repository
            .get_by_external_id(external_id)
            .await
            .inspect_err(log_upstream)?
        {
            if owner.id() != id {
                return Err(DomainError::conflict(
                    "External identity is linked to another account",
                ));
            }
        }

        self.require_user(id).await?;

        self.repository
            .link_external_id(id, external_id)
            .await
            .inspect_err(log_upstream)?;

        info!(user_id = %id, "External identity linked");

        self.get_profile(id).await
    }

    async fn get_by_external_identity(
        &self,
        external_id: i64,
    ) -> Result<UserProfile, DomainError> {
        self.repository
            .get_by_external_id(external_id)
            .await
            .inspect_err(log_upstream)?
            .map(|user| user.profile())
            .ok_or_else(|| {
                DomainError::not_found(format!("No account linked to external identity {}", external_id))
            })
    }

    async fn ping(&self) -> Result<(), DomainError> {
        self.repository.count().await.map(|_| ())
    }
}

fn log_upstream(e: &DomainError) {
    if e.is_upstream() {
        error!(error = %e, "Account operation failed");
    }
}

fn reject_login() -> DomainError {
    warn!("Login rejected");
    record_login(false);
    DomainError::InvalidCredentials
}
