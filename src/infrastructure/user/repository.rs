//! In-memory user repository implementation

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::user::{NewUser, User, UserId, UserRepository};
use crate::domain::DomainError;

#[derive(Debug, Default)]
struct Store {
    users: HashMap<i64, User>,
    /// email -> user id
    email_index: HashMap<String, i64>,
    /// username -> user id
    username_index: HashMap<String, i64>,
    /// external id -> user id
    external_index: HashMap<i64, i64>,
    next_id: i64,
}

impl Store {
    fn ensure_unique(&self, email: &str, username: &str, owner: Option<i64>) -> Result<(), DomainError> {
        let taken_by_other = |holder: Option<&i64>| holder.is_some_and(|id| Some(*id) != owner);

        if taken_by_other(self.email_index.get(email)) {
            return Err(DomainError::conflict(format!("Email '{}' already exists", email)));
        }

        if taken_by_other(self.username_index.get(username)) {
            return Err(DomainError::conflict(format!(
                "Username '{}' already exists",
                username
            )));
        }

        Ok(())
    }
}

/// In-memory implementation of UserRepository.
///
/// All uniqueness checks and writes happen under one write lock, so concurrent
/// registrations of the same email or username cannot both succeed.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserRepository {
    store: Arc<RwLock<Store>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: NewUser) -> Result<User, DomainError> {
        let mut store = self.store.write().await;

        store.ensure_unique(&user.email, &user.username, None)?;

        store.next_id += 1;
        let id = UserId::new(store.next_id).map_err(|e| DomainError::upstream(e.to_string()))?;
        let created = User::create(id, user, Utc::now());

        store.email_index.insert(created.email().to_string(), id.value());
        store
            .username_index
            .insert(created.username().to_string(), id.value());
        store.users.insert(id.value(), created.clone());

        Ok(created)
    }

    async fn get(&self, id: UserId) -> Result<Option<User>, DomainError> {
        let store = self.store.read().await;
        Ok(store.users.get(&id.value()).cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        let store = self.store.read().await;
        Ok(store
            .email_index
            .get(email)
            .and_then(|id| store.users.get(id))
            .cloned())
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, DomainError> {
        let store = self.store.read().await;
        Ok(store
            .username_index
            .get(username)
            .and_then(|id| store.users.get(id))
            .cloned())
    }

    async fn get_by_external_id(&self, external_id: i64) -> Result<Option<User>, DomainError> {
        let store = self.store.read().await;
        Ok(store
            .external_index
            .get(&external_id)
            .and_then(|id| store.users.get(id))
            .cloned())
    }

    async fn update(&self, user: &User) -> Result<User, DomainError> {
        let mut store = self.store.write().await;
        let id = user.id().value();

        let Some(existing) = store.users.get(&id).cloned() else {
            return Err(DomainError::not_found(format!("User '{}' not found", id)));
        };

        store.ensure_unique(user.email(), user.username(), Some(id))?;

        store.email_index.remove(existing.email());
        store.username_index.remove(existing.username());
        store.email_index.insert(user.email().to_string(), id);
        store.username_index.insert(user.username().to_string(), id);

        // Keep the stored password hash and external link; only profile fields change
        let updated = User::restore(
            user.id(),
            user.email().to_string(),
            user.username().to_string(),
            existing.password_hash().to_string(),
            existing.external_id(),
            existing.created_at(),
            user.updated_at(),
        );
        store.users.insert(id, updated.clone());

        Ok(updated)
    }

    async fn link_external_id(&self, id: UserId, external_id: i64) -> Result<(), DomainError> {
        let mut store = self.store.write().await;

        if store
            .external_index
            .get(&external_id)
            .is_some_and(|owner| *owner != id.value())
        {
            return Err(DomainError::conflict(format!(
                "External identity {} is linked to another account",
                external_id
            )));
        }

        let Some(user) = store.users.get_mut(&id.value()) else {
            return Err(DomainError::not_found(format!("User '{}' not found", id)));
        };

        let previous = user.external_id();
        user.link_external_id(external_id);

        if let Some(previous) = previous {
            store.external_index.remove(&previous);
        }
        store.external_index.insert(external_id, id.value());

        Ok(())
    }

    async fn count(&self) -> Result<usize, DomainError> {
        Ok(self.store.read().await.users.len())
    }
}
