//! Handlers for the `/auth/jwt` resource (create, refresh, verify).

use authapi_core::error::CoreError;
use authapi_core::types::DbId;
use authapi_db::models::session::CreateSession;
use authapi_db::repositories::{SessionRepo, UserRepo};
use axum::extract::State;
use axum::http::header::USER_AGENT;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::jwt::{
    generate_access_token, generate_refresh_token, hash_jti, validate_token,
    validate_token_of_type, TokenType,
};
use crate::auth::password::{verify_dummy_password, verify_password};
use crate::error::{AppError, AppResult, ErrorBody};
use crate::state::AppState;
use crate::validation::{present, ValidJson};

pub const NO_ACTIVE_ACCOUNT: &str = "No active account found with the given credentials";
pub const TOKEN_INVALID: &str = "Token is invalid or expired";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/jwt/create/`.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct TokenObtainPair {
    #[validate(required(message = "This field is required."))]
    pub email: Option<String>,
    #[validate(required(message = "This field is required."))]
    pub password: Option<String>,
}

/// Request body for `POST /auth/jwt/refresh/`.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct TokenRefresh {
    #[validate(required(message = "This field is required."))]
    pub refresh: Option<String>,
}

/// Request body for `POST /auth/jwt/verify/`.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct TokenVerify {
    #[validate(required(message = "This field is required."))]
    pub token: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// `refresh` is present only when refresh tokens rotate.
#[derive(Debug, Serialize, ToSchema)]
pub struct TokenRefreshResponse {
    pub access: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenVerifyResponse {}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Exchange email and password for an access / refresh token pair.
#[utoipa::path(
    post,
    path = "/api/v1/auth/jwt/create/",
    tag = "jwt",
    request_body = TokenObtainPair,
    responses((status = 200, body = TokenPair), (status = 401, body = ErrorBody))
)]
pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    ValidJson(input): ValidJson<TokenObtainPair>,
) -> AppResult<Json<TokenPair>> {
    let password = present(&input.password);
    let Some(user) = UserRepo::find_by_email(&state.pool, present(&input.email)).await? else {
        verify_dummy_password(password);
        return Err(no_active_account());
    };

    let password_valid = verify_password(password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !password_valid || !user.is_active {
        tracing::debug!(user_id = user.id, "Rejected token request");
        return Err(no_active_account());
    }

    if state.config.jwt.update_last_login {
        UserRepo::record_login(&state.pool, user.id).await?;
    }

    let access = access_token(&state, user.id)?;
    let refresh = start_session(&state, user.id, &headers).await?;
    tracing::info!(user_id = user.id, "Token pair issued");

    Ok(Json(TokenPair { access, refresh }))
}

/// Exchange a refresh token for a new access token, rotating the refresh
/// token when configured.
#[utoipa::path(
    post,
    path = "/api/v1/auth/jwt/refresh/",
    tag = "jwt",
    request_body = TokenRefresh,
    responses((status = 200, body = TokenRefreshResponse), (status = 401, body = ErrorBody))
)]
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    ValidJson(input): ValidJson<TokenRefresh>,
) -> AppResult<Json<TokenRefreshResponse>> {
    let jwt = &state.config.jwt;
    let claims = validate_token_of_type(present(&input.refresh), TokenType::Refresh, jwt)
        .ok_or_else(token_invalid)?;

    let session = SessionRepo::find_by_refresh_token_hash(&state.pool, &hash_jti(&claims.jti))
        .await?
        .ok_or_else(token_invalid)?;

    let user = UserRepo::find_by_id(&state.pool, session.user_id)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(no_active_account)?;

    let access = access_token(&state, user.id)?;

    if !jwt.rotate_refresh_tokens {
        return Ok(Json(TokenRefreshResponse {
            access,
            refresh: None,
        }));
    }

    // Revocation is conditional, so a concurrent refresh with the same token loses.
    if !SessionRepo::revoke(&state.pool, session.id).await? {
        return Err(token_invalid());
    }
    let refresh = start_session(&state, user.id, &headers).await?;

    Ok(Json(TokenRefreshResponse {
        access,
        refresh: Some(refresh),
    }))
}

/// Check that a token is validly signed and unexpired. Refresh tokens must
/// also belong to a live session.
#[utoipa::path(
    post,
    path = "/api/v1/auth/jwt/verify/",
    tag = "jwt",
    request_body = TokenVerify,
    responses((status = 200, body = TokenVerifyResponse), (status = 401, body = ErrorBody))
)]
pub async fn verify(
    State(state): State<AppState>,
    ValidJson(input): ValidJson<TokenVerify>,
) -> AppResult<Json<TokenVerifyResponse>> {
    let claims =
        validate_token(present(&input.token), &state.config.jwt).map_err(|_| token_invalid())?;

    if claims.token_type == TokenType::Refresh {
        SessionRepo::find_by_refresh_token_hash(&state.pool, &hash_jti(&claims.jti))
            .await?
            .ok_or_else(token_invalid)?;
    }
    Ok(Json(TokenVerifyResponse {}))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn no_active_account() -> AppError {
    AppError::Core(CoreError::Unauthorized(NO_ACTIVE_ACCOUNT.into()))
}

fn token_invalid() -> AppError {
    AppError::Core(CoreError::Unauthorized(TOKEN_INVALID.into()))
}

fn access_token(state: &AppState, user_id: DbId) -> AppResult<String> {
    generate_access_token(user_id, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))
}

/// Issue a refresh token and persist its session row.
async fn start_session(state: &AppState, user_id: DbId, headers: &HeaderMap) -> AppResult<String> {
    let issued = generate_refresh_token(user_id, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    let session = CreateSession {
        user_id,
        refresh_token_hash: hash_jti(&issued.jti),
        expires_at: issued.expires_at,
        user_agent: headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        ip_address: None,
    };
    SessionRepo::create(&state.pool, &session).await?;

    Ok(issued.token)
}
