//! Authentication Routes
//!
//! JSON surface for signup, login, token verification, refresh and logout.
//! Missing body fields deserialize as empty strings so they are rejected by
//! the gateway's input validation with a uniform 400.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::TokenPair;
use crate::error::AppError;
use crate::gateway::AuthGateway;

#[derive(Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub token: String,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: String,
}

/// Token pair response
#[derive(Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl AuthResponse {
    fn new(pair: TokenPair, expires_in: i64) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: "Bearer".to_string(),
            expires_in,
        }
    }
}

/// POST /auth/signup
///
/// # Errors
/// - 400: a field is empty
/// - 409: username or email already taken
pub async fn signup(
    form: web::Json<SignupRequest>,
    gateway: web::Data<AuthGateway>,
) -> Result<HttpResponse, AppError> {
    let user = gateway
        .signup(&form.username, &form.password, &form.email)
        .await?;

    Ok(HttpResponse::Created().json(user))
}

/// POST /auth/login
///
/// # Errors
/// - 400: a field is empty
/// - 401: unknown user, wrong password or inactive account (indistinguishable)
pub async fn login(
    form: web::Json<LoginRequest>,
    gateway: web::Data<AuthGateway>,
) -> Result<HttpResponse, AppError> {
    let pair = gateway.login(&form.username, &form.password).await?;

    Ok(HttpResponse::Ok().json(AuthResponse::new(pair, gateway.access_token_expiry())))
}

/// POST /auth/verify
///
/// Always 200 for a non-empty token; validity is in the body.
pub async fn verify(
    form: web::Json<VerifyRequest>,
    gateway: web::Data<AuthGateway>,
) -> Result<HttpResponse, AppError> {
    let verification = gateway.verify_token(&form.token).await?;

    Ok(HttpResponse::Ok().json(verification))
}

/// POST /auth/refresh
///
/// Rotates the refresh token: the presented token stops working.
///
/// # Errors
/// - 400: token is empty
/// - 401: invalid, expired, revoked or already rotated refresh token
pub async fn refresh(
    form: web::Json<RefreshRequest>,
    gateway: web::Data<AuthGateway>,
) -> Result<HttpResponse, AppError> {
    let pair = gateway.refresh_token(&form.refresh_token).await?;

    Ok(HttpResponse::Ok().json(AuthResponse::new(pair, gateway.access_token_expiry())))
}

/// POST /auth/logout
pub async fn logout(
    form: web::Json<RefreshRequest>,
    gateway: web::Data<AuthGateway>,
) -> Result<HttpResponse, AppError> {
    gateway.logout(&form.refresh_token).await?;

    Ok(HttpResponse::NoContent().finish())
}
