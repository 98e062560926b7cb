//! Route definitions for the `/auth/users` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::users;
use crate::state::AppState;

/// Account routes. Paths keep their trailing slash.
///
/// ```text
/// GET, POST                 /auth/users/                         list (auth), create (public)
/// POST                      /auth/users/activation/              activate (public)
/// POST                      /auth/users/resend_activation/       resend activation (public)
/// GET, PUT, PATCH, DELETE   /auth/users/me/                      current user
/// POST                      /auth/users/set_password/            change password (auth)
/// POST                      /auth/users/reset_password/          request reset (public)
/// POST                      /auth/users/reset_password_confirm/  confirm reset (public)
/// GET, PUT, PATCH, DELETE   /auth/users/{id}/                    self or admin
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/users/", get(users::list).post(users::create))
        .route("/auth/users/activation/", post(users::activation))
        .route(
            "/auth/users/resend_activation/",
            post(users::resend_activation),
        )
        .route(
            "/auth/users/me/",
            get(users::me)
                .put(users::update_me)
                .patch(users::update_me)
                .delete(users::delete_me),
        )
        .route("/auth/users/set_password/", post(users::set_password))
        .route("/auth/users/reset_password/", post(users::reset_password))
        .route(
            "/auth/users/reset_password_confirm/",
            post(users::reset_password_confirm),
        )
        .route(
            "/auth/users/{id}/",
            get(users::retrieve)
                .put(users::update)
                .patch(users::update)
                .delete(users::destroy),
        )
}
