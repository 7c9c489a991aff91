//! User repository trait

use async_trait::async_trait;
use std::fmt::Debug;

use super::entity::{NewUser, User, UserId};
use crate::domain::DomainError;

/// Repository trait for user storage.
///
/// Every call is an independent, possibly remote operation. Implementations
/// must enforce uniqueness of email, username and external id themselves and
/// report violations as [`DomainError::Conflict`]; callers only pre-check.
#[async_trait]
pub trait UserRepository: Send + Sync + Debug {
    /// Create a new user, assigning its id and timestamps
    async fn create(&self, user: NewUser) -> Result<User, DomainError>;

    /// Get a user by their ID
    async fn get(&self, id: UserId) -> Result<Option<User>, DomainError>;

    /// Get a user by their email (for login)
    async fn get_by_email(&self, email: &str) -> Result<Option<User>, DomainError>;

    /// Get a user by their username
    async fn get_by_username(&self, username: &str) -> Result<Option<User>, DomainError>;

    /// Get a user by their linked external identity
    async fn get_by_external_id(&self, external_id: i64) -> Result<Option<User>, DomainError>;

    /// Update email/username of an existing user
    async fn update(&self, user: &User) -> Result<User, DomainError>;

    /// Link an external identity to a user
    async fn link_external_id(&self, id: UserId, external_id: i64) -> Result<(), DomainError>;

    /// Count stored users
    async fn count(&self) -> Result<usize, DomainError>;

    /// Check if an email exists
    async fn email_exists(&self, email: &str) -> Result<bool, DomainError> {
        Ok(self.get_by_email(email).await?.is_some())
    }

    /// Check if a username exists
    async fn username_exists(&self, username: &str) -> Result<bool, DomainError> {
        Ok(self.get_by_username(username).await?.is_some())
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    /// Mock user repository for testing
    #[derive(Debug, Default)]
    pub struct MockUserRepository {
        users: Arc<RwLock<HashMap<i64, User>>>,
        should_fail: Arc<RwLock<bool>>,
    }

    impl MockUserRepository {
        /// Create a new mock repository
        pub fn new() -> Self {
            Self::default()
        }

        /// Set whether operations should fail
        pub async fn set_should_fail(&self, fail: bool) {
            *self.should_fail.write().await = fail;
        }

        async fn check_should_fail(&self) -> Result<(), DomainError> {
            if *self.should_fail.read().await {
                return Err(DomainError::upstream("Mock repository configured to fail"));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl UserRepository for MockUserRepository {
        async fn create(&self, user: NewUser) -> Result<User, DomainError> {
            self.check_should_fail().await?;
            let mut users = self.users.write().await;

            if users
                .values()
                .any(|u| u.email() == user.email || u.username() == user.username)
            {
                return Err(DomainError::conflict("User already exists"));
            }

            let next_id = users.keys().max().copied().unwrap_or(0) + 1;
            let id = UserId::new(next_id).map_err(|e| DomainError::upstream(e.to_string()))?;
            let created = User::create(id, user, Utc::now());

            users.insert(next_id, created.clone());
            Ok(created)
        }

        async fn get(&self, id: UserId) -> Result<Option<User>, DomainError> {
            self.check_should_fail().await?;
            let users = self.users.read().await;
            Ok(users.get(&id.value()).cloned())
        }

        async fn get_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
            self.check_should_fail().await?;
            let users = self.users.read().await;
            Ok(users.values().find(|u| u.email() == email).cloned())
        }

        async fn get_by_username(&self, username: &str) -> Result<Option<User>, DomainError> {
            self.check_should_fail().await?;
            let users = self.users.read().await;
            Ok(users.values().find(|u| u.username() == username).cloned())
        }

        async fn get_by_external_id(&self, external_id: i64) -> Result<Option<User>, DomainError> {
            self.check_should_fail().await?;
            let users = self.users.read().await;
            Ok(users
                .values()
                .find(|u| u.external_id() == Some(external_id))
                .cloned())
        }

        async fn update(&self, user: &User) -> Result<User, DomainError> {
            self.check_should_fail().await?;
            let mut users = self.users.write().await;
            let id = user.id().value();

            if !users.contains_key(&id) {
                return Err(DomainError::not_found(format!("User '{}' not found", id)));
            }

            users.insert(id, user.clone());
            Ok(user.clone())
        }

        async fn link_external_id(&self, id: UserId, external_id: i64) -> Result<(), DomainError> {
            self.check_should_fail().await?;
            let mut users = self.users.write().await;

            match users.get_mut(&id.value()) {
                Some(user) => {
                    user.link_external_id(external_id);
                    Ok(())
                }
                None => Err(DomainError::not_found(format!("User '{}' not found", id))),
            }
        }

        async fn count(&self) -> Result<usize, DomainError> {
            self.check_should_fail().await?;
            Ok(self.users.read().await.len())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn new_user(email: &str, username: &str) -> NewUser {
            NewUser {
                email: email.to_string(),
                username: username.to_string(),
                password_hash: "hashed_password".to_string(),
            }
        }

        #[tokio::test]
        async fn test_create_assigns_sequential_ids() {
            let repo = MockUserRepository::new();

            let first = repo.create(new_user("a@x.com", "alice")).await.unwrap();
            let second = repo.create(new_user("b@x.com", "bob")).await.unwrap();

            assert_eq!(first.id().value(), 1);
            assert_eq!(second.id().value(), 2);
            assert!(repo.email_exists("a@x.com").await.unwrap());
            assert!(repo.username_exists("bob").await.unwrap());
        }

        #[tokio::test]
        async fn test_should_fail() {
            let repo = MockUserRepository::new();
            repo.set_should_fail(true).await;

            let result = repo.get_by_email("a@x.com").await;
            assert!(matches!(result, Err(DomainError::Upstream { .. })));
        }
    }
}
