//! Route definitions for the `/auth/jwt` resource.

use axum::routing::post;
use axum::Router;

use crate::handlers::jwt;
use crate::state::AppState;

/// ```text
/// POST /auth/jwt/create/   -> create (public)
/// POST /auth/jwt/refresh/  -> refresh (public)
/// POST /auth/jwt/verify/   -> verify (public)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/jwt/create/", post(jwt::create))
        .route("/auth/jwt/refresh/", post(jwt::refresh))
        .route("/auth/jwt/verify/", post(jwt::verify))
}
