pub mod admin;
pub mod health;
pub mod jwt;
pub mod schema;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /auth/users/...                  account flows (see routes::users)
/// /auth/jwt/create|refresh|verify/ token endpoints
/// /admin/users[/{id}[/password]]   admin panel (admin only)
/// /schema/                         OpenAPI document
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(users::router())
        .merge(jwt::router())
        .merge(schema::router())
        .nest("/admin", admin::router())
}
