//! Credential store boundary
//!
//! User records and password verification live behind [`CredentialStore`].
//! The token core only ever sees a [`User`] whose password hash it cannot
//! read.

mod memory;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;

use crate::error::AppError;

pub use memory::InMemoryCredentialStore;
pub use postgres::PgCredentialStore;

#[derive(Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub(crate) password_hash: String,
    pub email: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("password_hash", &"[redacted]")
            .field("email", &self.email)
            .field("is_active", &self.is_active)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Durable user storage with one-way password hashing.
///
/// Errors follow the service taxonomy:
/// - `create_user`: `DatabaseError::UniqueConstraintViolation` when the
///   username or email is taken
/// - `authenticate_user`: `AuthError::InvalidCredentials` for an unknown user
///   or wrong password, `AuthError::AccountInactive` for a disabled account
/// - `get_user_by_id`: `DatabaseError::NotFound`
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn create_user(&self, username: &str, password: &str, email: &str)
        -> Result<User, AppError>;

    async fn authenticate_user(&self, username: &str, password: &str) -> Result<User, AppError>;

    async fn get_user_by_id(&self, id: i64) -> Result<User, AppError>;
}
