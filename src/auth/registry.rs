//! Refresh Token Registry
//!
//! The authoritative record of which refresh tokens are live. A refresh token
//! with a valid signature is still rejected unless it is registered here.
//! Tokens are:
//! - Keyed by their SHA-256 digest (the plaintext is never held)
//! - Removed on revocation, including implicit revocation by rotation
//! - Evicted once expired, either lazily or by the background sweeper

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Registry failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Token is unknown, already revoked or expired
    NotFound,
    /// Token was already registered. Tokens are unique per issuance, so this
    /// indicates a bug rather than a client error.
    Duplicate,
    /// Storage backend failed
    Backend(String),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::NotFound => write!(f, "refresh token not found"),
            RegistryError::Duplicate => write!(f, "refresh token already registered"),
            RegistryError::Backend(msg) => write!(f, "registry backend error: {}", msg),
        }
    }
}

impl std::error::Error for RegistryError {}

/// Liveness store for refresh tokens.
///
/// Implementations must make each operation atomic per token: of several
/// concurrent `revoke` calls on one token, exactly one may succeed.
#[async_trait]
pub trait RefreshTokenRegistry: Send + Sync {
    /// Record a freshly issued token for `user_id`, live until `expires_at`
    async fn register(&self, token: &str, user_id: i64, expires_at: i64)
        -> Result<(), RegistryError>;

    /// Owning user id if the token is registered and unexpired
    async fn is_live(&self, token: &str) -> Result<Option<i64>, RegistryError>;

    /// Remove the token, returning its owner
    async fn revoke(&self, token: &str) -> Result<i64, RegistryError>;

    /// Drop every entry that expired at or before `now`, returning how many
    async fn purge_expired(&self, now: i64) -> Result<usize, RegistryError>;
}

/// Hash a refresh token using SHA-256
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone, Copy)]
struct RegistryEntry {
    user_id: i64,
    expires_at: i64,
}

/// Process-local registry; everything is lost on restart.
///
/// One mutex guards the whole map, so every operation is a single critical
/// section and never observes a half-applied revoke.
#[derive(Debug, Default)]
pub struct InMemoryRefreshTokenRegistry {
    entries: Mutex<HashMap<String, RegistryEntry>>,
}

impl InMemoryRefreshTokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently held, expired or not
    pub fn len(&self) -> Result<usize, RegistryError> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, RegistryError> {
        Ok(self.lock()?.is_empty())
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, RegistryEntry>>, RegistryError> {
        self.entries
            .lock()
            .map_err(|_| RegistryError::Backend("registry lock poisoned".to_string()))
    }
}

#[async_trait]
impl RefreshTokenRegistry for InMemoryRefreshTokenRegistry {
    async fn register(
        &self,
        token: &str,
        user_id: i64,
        expires_at: i64,
    ) -> Result<(), RegistryError> {
        let mut entries = self.lock()?;
        let key = hash_token(token);
        if entries.contains_key(&key) {
            return Err(RegistryError::Duplicate);
        }
        entries.insert(key, RegistryEntry { user_id, expires_at });
        Ok(())
    }

    async fn is_live(&self, token: &str) -> Result<Option<i64>, RegistryError> {
        let now = chrono::Utc::now().timestamp();
        let mut entries = self.lock()?;
        let key = hash_token(token);

        match entries.get(&key).copied() {
            Some(entry) if entry.expires_at > now => Ok(Some(entry.user_id)),
            Some(_) => {
                entries.remove(&key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn revoke(&self, token: &str) -> Result<i64, RegistryError> {
        self.lock()?
            .remove(&hash_token(token))
            .map(|entry| entry.user_id)
            .ok_or(RegistryError::NotFound)
    }

    async fn purge_expired(&self, now: i64) -> Result<usize, RegistryError> {
        let mut entries = self.lock()?;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        Ok(before - entries.len())
    }
}

/// Periodically evict expired refresh tokens.
///
/// Runs until the returned handle is aborted or the runtime shuts down.
pub fn spawn_sweeper(
    registry: Arc<dyn RefreshTokenRegistry>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let now = chrono::Utc::now().timestamp();
            match registry.purge_expired(now).await {
                Ok(0) => {}
                Ok(evicted) => {
                    tracing::info!(evicted = evicted, "Evicted expired refresh tokens");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Refresh token sweep failed");
                }
            }
        }
    })
}
