//! Token validation
//!
//! Every failure collapses into [`AuthError::TokenInvalid`]; the underlying
//! [`TokenError`] is only logged, so callers cannot tell an expired token
//! from a revoked or forged one.

use std::sync::Arc;

use crate::auth::claims::Claims;
use crate::auth::codec::TokenCodec;
use crate::auth::registry::RefreshTokenRegistry;
use crate::error::{AuthError, TokenError};

pub struct TokenValidator {
    codec: Arc<TokenCodec>,
    registry: Arc<dyn RefreshTokenRegistry>,
}

impl TokenValidator {
    pub fn new(codec: Arc<TokenCodec>, registry: Arc<dyn RefreshTokenRegistry>) -> Self {
        Self { codec, registry }
    }

    /// Signature and expiry check for either token kind
    pub fn validate_access_or_refresh(&self, token: &str) -> Result<Claims, AuthError> {
        self.codec.verify(token).map_err(|reason| {
            tracing::debug!(reason = %reason, "Token rejected");
            AuthError::from(reason)
        })
    }

    /// Full refresh token check: signature, expiry, kind and registry
    /// membership. Returns the owning user id.
    pub async fn validate_refresh(&self, token: &str) -> Result<i64, AuthError> {
        self.check_refresh(token).await.map_err(|reason| {
            tracing::warn!(reason = %reason, "Refresh token rejected");
            AuthError::from(reason)
        })
    }

    async fn check_refresh(&self, token: &str) -> Result<i64, TokenError> {
        let claims = self.codec.verify(token)?;
        if !claims.is_refresh() {
            return Err(TokenError::WrongKind);
        }

        let owner = self.registry.is_live(token).await.map_err(|e| {
            tracing::error!(error = %e, "Refresh token registry lookup failed");
            TokenError::NotRegistered
        })?;

        match owner {
            Some(user_id) if user_id == claims.user_id => Ok(user_id),
            Some(_) => Err(TokenError::SubjectMismatch),
            None => Err(TokenError::NotRegistered),
        }
    }
}
