use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::RwLock;

use super::{CredentialStore, User};
use crate::auth::{hash_password, verify_password};
use crate::error::{AppError, AuthError, DatabaseError};

#[derive(Debug, Default)]
struct Users {
    next_id: i64,
    by_id: HashMap<i64, User>,
}

/// Credential store kept in process memory.
///
/// Used by tests and when no database is configured. Users vanish on
/// restart.
#[derive(Debug)]
pub struct InMemoryCredentialStore {
    users: RwLock<Users>,
    bcrypt_cost: u32,
}

impl InMemoryCredentialStore {
    pub fn new(bcrypt_cost: u32) -> Self {
        Self {
            users: RwLock::new(Users::default()),
            bcrypt_cost,
        }
    }

    /// Enable or disable an account
    pub fn set_active(&self, id: i64, is_active: bool) -> Result<(), AppError> {
        let mut users = self
            .users
            .write()
            .map_err(|_| AppError::Internal("credential store lock poisoned".to_string()))?;
        let user = users
            .by_id
            .get_mut(&id)
            .ok_or_else(|| DatabaseError::NotFound(format!("user {}", id)))?;
        user.is_active = is_active;
        user.updated_at = Utc::now();
        Ok(())
    }

    fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let users = self
            .users
            .read()
            .map_err(|_| AppError::Internal("credential store lock poisoned".to_string()))?;
        Ok(users
            .by_id
            .values()
            .find(|user| user.username == username)
            .cloned())
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn create_user(
        &self,
        username: &str,
        password: &str,
        email: &str,
    ) -> Result<User, AppError> {
        // Hash outside the lock.
        let password_hash = hash_password(password, self.bcrypt_cost)?;

        let mut users = self
            .users
            .write()
            .map_err(|_| AppError::Internal("credential store lock poisoned".to_string()))?;

        let taken = users
            .by_id
            .values()
            .any(|user| user.username == username || user.email == email);
        if taken {
            return Err(DatabaseError::UniqueConstraintViolation(
                "Username or email already exists".to_string(),
            )
            .into());
        }

        users.next_id += 1;
        let now = Utc::now();
        let user = User {
            id: users.next_id,
            username: username.to_string(),
            password_hash,
            email: email.to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        users.by_id.insert(user.id, user.clone());

        Ok(user)
    }

    async fn authenticate_user(&self, username: &str, password: &str) -> Result<User, AppError> {
        let user = self
            .find_by_username(username)?
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
        let users = self
            .users
            .read()
            .map_err(|_| AppError::Internal("credential store lock poisoned".to_string()))?;
        users
            .by_id
            .get(&id)
            .cloned()
            .ok_or_else(|| DatabaseError::NotFound(format!("user {}", id)).into())
    }
}
