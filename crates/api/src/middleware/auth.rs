//! JWT-based authentication extractor for Axum handlers.

use authapi_core::error::CoreError;
use authapi_db::models::user::User;
use authapi_db::repositories::UserRepo;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::auth::jwt::{token_from_header, validate_token_of_type, TokenType};
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated, active user resolved from the access token in the
/// `Authorization` header.
///
/// ```ignore
/// async fn my_handler(auth: AuthUser) -> AppResult<Json<()>> {
///     tracing::info!(user_id = auth.user.id, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
}

fn unauthorized(message: &str) -> AppError {
    AppError::Core(CoreError::Unauthorized(message.to_string()))
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jwt = &state.config.jwt;

        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| unauthorized("Authentication credentials were not provided."))?;

        let token = token_from_header(header, jwt).ok_or_else(|| {
            unauthorized(&format!(
                "Invalid Authorization format. Expected: {} <token>",
                jwt.auth_header_types.join("|")
            ))
        })?;

        let claims = validate_token_of_type(token, TokenType::Access, jwt)
            .ok_or_else(|| unauthorized("Given token not valid for any token type"))?;

        let user = UserRepo::find_by_id(&state.pool, claims.user_id)
            .await?
            .ok_or_else(|| unauthorized("User not found"))?;

        if !user.is_active {
            return Err(unauthorized("User is inactive"));
        }

        Ok(AuthUser { user })
    }
}
