//! Auth gateway
//!
//! Entry point for the public operations: Signup, Login, VerifyToken,
//! RefreshToken and Logout. Each call validates its input before touching
//! the credential store or the token layer.

use serde::Serialize;
use std::sync::Arc;

use crate::auth::{
    RefreshTokenRegistry, RegistryError, TokenCodec, TokenIssuer, TokenPair, TokenValidator,
};
use crate::configuration::JwtSettings;
use crate::credentials::CredentialStore;
use crate::error::{AppError, AuthError, ConfigError, ErrorContext, ValidationError};

/// Result of a successful signup
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NewUser {
    pub user_id: i64,
    pub username: String,
    pub email: String,
}

/// Result of VerifyToken. Invalid tokens are reported here, not as errors.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Verification {
    pub valid: bool,
    pub username: String,
}

impl Verification {
    fn invalid() -> Self {
        Self {
            valid: false,
            username: String::new(),
        }
    }
}

fn require(field: &str, value: &str) -> Result<(), AppError> {
    if value.is_empty() {
        return Err(ValidationError::EmptyField(field.to_string()).into());
    }
    Ok(())
}

pub struct AuthGateway {
    credentials: Arc<dyn CredentialStore>,
    registry: Arc<dyn RefreshTokenRegistry>,
    issuer: TokenIssuer,
    validator: TokenValidator,
}

impl AuthGateway {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        registry: Arc<dyn RefreshTokenRegistry>,
        issuer: TokenIssuer,
        validator: TokenValidator,
    ) -> Self {
        Self {
            credentials,
            registry,
            issuer,
            validator,
        }
    }

    /// Wire the token layer from settings.
    ///
    /// # Errors
    /// Returns `ConfigError::MissingRequired` when no signing secret is set,
    /// `ConfigError::InvalidValue` when a token lifetime is out of range
    pub fn from_settings(
        config: &JwtSettings,
        credentials: Arc<dyn CredentialStore>,
        registry: Arc<dyn RefreshTokenRegistry>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let codec = Arc::new(TokenCodec::new(config.signing_secret()?)?);
        let issuer = TokenIssuer::new(codec.clone(), registry.clone(), config);
        let validator = TokenValidator::new(codec, registry.clone());
        Ok(Self::new(credentials, registry, issuer, validator))
    }

    /// Access token lifetime in seconds
    pub fn access_token_expiry(&self) -> i64 {
        self.issuer.access_token_expiry()
    }

    pub async fn signup(
        &self,
        username: &str,
        password: &str,
        email: &str,
    ) -> Result<NewUser, AppError> {
        require("username", username)?;
        require("password", password)?;
        require("email", email)?;

        let user = self
            .credentials
            .create_user(username, password, email)
            .await?;

        tracing::info!(user_id = user.id, "User signed up");

        Ok(NewUser {
            user_id: user.id,
            username: user.username,
            email: user.email,
        })
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair, AppError> {
        require("username", username)?;
        require("password", password)?;

        let user = self
            .credentials
            .authenticate_user(username, password)
            .await
            .map_err(|e| match e {
                AppError::Auth(AuthError::AccountInactive) => {
                    tracing::info!("Login attempt on inactive account");
                    AppError::Auth(AuthError::InvalidCredentials)
                }
                other => other,
            })?;

        let pair = self.issuer.issue_pair(user.id).await?;

        tracing::info!(user_id = user.id, "User logged in");
        Ok(pair)
    }

    /// Never fails for a bad token; only an empty one is an input error.
    pub async fn verify_token(&self, token: &str) -> Result<Verification, AppError> {
        require("token", token)?;

        let claims = match self.validator.validate_access_or_refresh(token) {
            Ok(claims) => claims,
            Err(_) => return Ok(Verification::invalid()),
        };

        match self.credentials.get_user_by_id(claims.user_id).await {
            Ok(user) => Ok(Verification {
                valid: true,
                username: user.username,
            }),
            Err(e) => {
                tracing::debug!(user_id = claims.user_id, error = %e, "Token subject lookup failed");
                Ok(Verification::invalid())
            }
        }
    }

    /// Rotate a refresh token into a fresh pair.
    ///
    /// The new pair is issued before the old token is revoked. If the old
    /// token is already gone at that point, a concurrent rotation won: the
    /// new refresh token is withdrawn and the call fails, so a refresh token
    /// is never spent twice. Any other revocation failure is only logged.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenPair, AppError> {
        require("refresh_token", refresh_token)?;
        let context = ErrorContext::new("token_refresh");

        let user_id = self.validator.validate_refresh(refresh_token).await?;
        let context = context.with_user_id(user_id);

        let pair = self.issuer.issue_pair(user_id).await?;

        match self.registry.revoke(refresh_token).await {
            Ok(_) => {}
            Err(RegistryError::NotFound) => {
                if let Err(e) = self.registry.revoke(&pair.refresh_token).await {
                    tracing::warn!(
                        user_id = user_id,
                        error = %e,
                        "Failed to withdraw refresh token from a lost rotation"
                    );
                }
                let err = AppError::Auth(AuthError::TokenInvalid);
                context.log_error(&err);
                return Err(err);
            }
            Err(e) => {
                tracing::warn!(
                    user_id = user_id,
                    error = %e,
                    "Failed to revoke old refresh token"
                );
            }
        }

        tracing::info!(
            request_id = %context.request_id,
            user_id = user_id,
            "Refresh token rotated"
        );
        Ok(pair)
    }

    /// Revoke a refresh token. Access tokens already issued stay valid
    /// until they expire.
    pub async fn logout(&self, refresh_token: &str) -> Result<(), AppError> {
        require("refresh_token", refresh_token)?;

        let user_id = self.validator.validate_refresh(refresh_token).await?;
        self.registry.revoke(refresh_token).await.map_err(|e| {
            tracing::debug!(user_id = user_id, error = %e, "Logout revoke failed");
            AppError::Auth(AuthError::TokenInvalid)
        })?;

        tracing::info!(user_id = user_id, "Refresh token revoked");
        Ok(())
    }
}
