//! Route definitions for the `/admin` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::admin;
use crate::state::AppState;

/// Routes mounted at `/admin` (admin only).
///
/// ```text
/// GET, POST          /users                 list, create
/// GET, PUT, DELETE   /users/{id}            get, update, delete
/// POST               /users/{id}/password   set password
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/users",
            get(admin::list_users).post(admin::create_user),
        )
        .route(
            "/users/{id}",
            get(admin::get_user)
                .put(admin::update_user)
                .delete(admin::delete_user),
        )
        .route("/users/{id}/password", post(admin::set_user_password))
}
