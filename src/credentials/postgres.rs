use async_trait::async_trait;
use sqlx::PgPool;

use super::{CredentialStore, User};
use crate::auth::{hash_password, verify_password};
use crate::error::{AppError, AuthError};

const USER_COLUMNS: &str = "id, username, password_hash, email, is_active, created_at, updated_at";

/// Credential store backed by the `users` table (see `migrations/`)
#[derive(Debug, Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
    bcrypt_cost: u32,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool, bcrypt_cost: u32) -> Self {
        Self { pool, bcrypt_cost }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn create_user(
        &self,
        username: &str,
        password: &str,
        email: &str,
    ) -> Result<User, AppError> {
        let password_hash = hash_password(password, self.bcrypt_cost)?;

        // Unique violations (SQLSTATE 23505) become a conflict via From<sqlx::Error>.
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, password_hash, email)
            VALUES ($1, $2, $3)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(username)
        .bind(&password_hash)
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(user_id = user.id, "User created");
        Ok(user)
    }

    async fn authenticate_user(&self, username: &str, password: &str) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE username = $1",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials.into());
        }

        if !user.is_active {
            return Err(AuthError::AccountInactive.into());
        }

        Ok(user)
    }

    async fn get_user_by_id(&self, id: i64) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }
}
