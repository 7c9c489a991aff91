//! PostgreSQL user repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

use crate::domain::user::{NewUser, User, UserId, UserRepository};
use crate::domain::DomainError;

/// Schema for the users table. The UNIQUE constraints are the authoritative
/// guard against concurrent duplicate registrations and links.
const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id BIGSERIAL PRIMARY KEY,
    email VARCHAR(254) NOT NULL,
    username VARCHAR(50) NOT NULL,
    password_hash TEXT NOT NULL,
    external_id BIGINT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT users_email_key UNIQUE (email),
    CONSTRAINT users_username_key UNIQUE (username),
    CONSTRAINT users_external_id_key UNIQUE (external_id)
)
"#;

const USER_COLUMNS: &str =
    "id, email, username, password_hash, external_id, created_at, updated_at";

/// PostgreSQL implementation of UserRepository
#[derive(Debug, Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a pool and make sure the users table exists
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, DomainError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(std::time::Duration::from_secs(5))
            .connect(url)
            .await
            .map_err(|e| DomainError::upstream(format!("Failed to connect to PostgreSQL: {}", e)))?;

        let repository = Self::new(pool);
        repository.ensure_schema().await?;

        Ok(repository)
    }

    /// Create the users table if it doesn't exist
    pub async fn ensure_schema(&self) -> Result<(), DomainError> {
        sqlx::query(CREATE_USERS_TABLE)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::upstream(format!("Failed to create users table: {}", e)))?;

        Ok(())
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn create(&self, user: NewUser) -> Result<User, DomainError> {
        let sql = format!(
            "INSERT INTO users (email, username, password_hash) VALUES ($1, $2, $3) RETURNING {}",
            USER_COLUMNS
        );

        let row = sqlx::query(&sql)
            .bind(&user.email)
            .bind(&user.username)
            .bind(&user.password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_write_error(e, "create user"))?;

        row_to_user(&row)
    }

    async fn get(&self, id: UserId) -> Result<Option<User>, DomainError> {
        let row = sqlx::query(&select_by("id"))
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::upstream(format!("Failed to get user by id: {}", e)))?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        let row = sqlx::query(&select_by("email"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::upstream(format!("Failed to get user by email: {}", e)))?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, DomainError> {
        let row = sqlx::query(&select_by("username"))
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::upstream(format!("Failed to get user by username: {}", e)))?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn get_by_external_id(&self, external_id: i64) -> Result<Option<User>, DomainError> {
        let row = sqlx::query(&select_by("external_id"))
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::upstream(format!("Failed to get user by external_id: {}", e)))?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn update(&self, user: &User) -> Result<User, DomainError> {
        let sql = format!(
            "UPDATE users SET email = $2, username = $3, updated_at = $4 WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );

        let row = sqlx::query(&sql)
            .bind(user.id().value())
            .bind(user.email())
            .bind(user.username())
            .bind(user.updated_at())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_write_error(e, "update user"))?;

        match row {
            Some(row) => row_to_user(&row),
            None => Err(DomainError::not_found(format!("User '{}' not found", user.id()))),
        }
    }

    async fn link_external_id(&self, id: UserId, external_id: i64) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE users SET external_id = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id.value())
        .bind(external_id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "link external identity"))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(format!("User '{}' not found", id)));
        }

        Ok(())
    }

    async fn count(&self) -> Result<usize, DomainError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::upstream(format!("Failed to count users: {}", e)))?;

        Ok(usize::try_from(count).unwrap_or_default())
    }
}

fn select_by(column: &str) -> String {
    format!("SELECT {} FROM users WHERE {} = $1", USER_COLUMNS, column)
}

/// Map unique violations to conflicts, everything else to upstream failures
fn map_write_error(error: sqlx::Error, action: &str) -> DomainError {
    if let Some(db_error) = error.as_database_error() {
        if db_error.is_unique_violation() {
            return conflict_for_constraint(db_error.constraint());
        }
    }

    DomainError::upstream(format!("Failed to {}: {}", action, error))
}

fn conflict_for_constraint(constraint: Option<&str>) -> DomainError {
    match constraint {
        Some("users_email_key") => DomainError::conflict("Email already exists"),
        Some("users_username_key") => DomainError::conflict("Username already exists"),
        Some("users_external_id_key") => {
            DomainError::conflict("External identity is linked to another account")
        }
        _ => DomainError::conflict("User already exists"),
    }
}

fn row_to_user(row: &PgRow) -> Result<User, DomainError> {
    let read = |e: sqlx::Error| DomainError::upstream(format!("Invalid user row: {}", e));

    let id: i64 = row.try_get("id").map_err(read)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(read)?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(read)?;

    let user_id = UserId::new(id)
        .map_err(|e| DomainError::upstream(format!("Invalid user ID in database: {}", e)))?;

    Ok(User::restore(
        user_id,
        row.try_get("email").map_err(read)?,
        row.try_get("username").map_err(read)?,
        row.try_get("password_hash").map_err(read)?,
        row.try_get("external_id").map_err(read)?,
        created_at,
        updated_at,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_for_constraint() {
        let cases = [
            (Some("users_email_key"), "Email already exists"),
            (Some("users_username_key"), "Username already exists"),
            (
                Some("users_external_id_key"),
                "External identity is linked to another account",
            ),
            (None, "User already exists"),
        ];

        for (constraint, expected) in cases {
            match conflict_for_constraint(constraint) {
                DomainError::Conflict { message } => assert_eq!(message, expected),
                other => panic!("unexpected error: {:?}", other),
            }
        }
    }

    #[test]
    fn test_non_database_errors_are_upstream() {
        let error = map_write_error(sqlx::Error::PoolTimedOut, "create user");
        assert!(error.is_upstream());
    }

    #[test]
    fn test_schema_declares_unique_constraints() {
        for constraint in ["users_email_key", "users_username_key", "users_external_id_key"] {
            assert!(CREATE_USERS_TABLE.contains(constraint));
        }
    }
}
