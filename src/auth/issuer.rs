//! Access and refresh token issuance.

use serde::Serialize;
use std::sync::Arc;

use crate::auth::claims::{Claims, TokenKind};
use crate::auth::codec::TokenCodec;
use crate::auth::registry::RefreshTokenRegistry;
use crate::configuration::JwtSettings;
use crate::error::AppError;

/// Access token paired with the refresh token that can renew it
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Mints tokens. Refresh tokens are registered as they are minted.
pub struct TokenIssuer {
    codec: Arc<TokenCodec>,
    registry: Arc<dyn RefreshTokenRegistry>,
    access_token_expiry: i64,
    refresh_token_expiry: i64,
}

impl TokenIssuer {
    pub fn new(
        codec: Arc<TokenCodec>,
        registry: Arc<dyn RefreshTokenRegistry>,
        config: &JwtSettings,
    ) -> Self {
        Self {
            codec,
            registry,
            access_token_expiry: config.access_token_expiry,
            refresh_token_expiry: config.refresh_token_expiry,
        }
    }

    /// Access token lifetime in seconds
    pub fn access_token_expiry(&self) -> i64 {
        self.access_token_expiry
    }

    fn claims(&self, user_id: i64, kind: TokenKind, expiry: i64) -> Result<Claims, AppError> {
        Claims::try_new(user_id, kind, expiry).ok_or_else(|| {
            tracing::error!(user_id = user_id, expiry = expiry, "Token expiry overflows");
            AppError::Internal("Token expiry out of range".to_string())
        })
    }

    /// Stateless access token; it cannot be revoked on its own.
    pub fn issue_access_token(&self, user_id: i64) -> Result<String, AppError> {
        let claims = self.claims(user_id, TokenKind::Access, self.access_token_expiry)?;
        self.codec.sign(&claims)
    }

    /// Issue an access token and a registered refresh token
    ///
    /// # Errors
    /// Returns `AppError::Internal` if signing or registration fails
    pub async fn issue_pair(&self, user_id: i64) -> Result<TokenPair, AppError> {
        let access_token = self.issue_access_token(user_id)?;

        let claims = self.claims(user_id, TokenKind::Refresh, self.refresh_token_expiry)?;
        let refresh_token = self.codec.sign(&claims)?;

        self.registry
            .register(&refresh_token, user_id, claims.exp)
            .await
            .map_err(|e| {
                tracing::error!(user_id = user_id, error = %e, "Failed to register refresh token");
                AppError::Internal(format!("Refresh token registration failed: {}", e))
            })?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }
}
