//! Handlers for the `/admin/users` resource.
//!
//! All handlers require an admin account via [`RequireAdmin`].

use authapi_core::email::normalize_email;
use authapi_core::error::{CoreError, FieldErrors};
use authapi_core::types::DbId;
use authapi_db::models::user::{CreateUser, UpdateUser, User};
use authapi_db::repositories::{SessionRepo, UserRepo};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::password::{check_password_strength, check_retype};
use crate::error::{AppError, AppResult, ErrorBody};
use crate::handlers::users::{email_conflict, hash_new_password, EMAIL_TAKEN};
use crate::middleware::rbac::RequireAdmin;
use crate::query::AdminUserListParams;
use crate::state::AppState;
use crate::validation::{present, ValidJson};

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// A user as shown in the admin panel.
#[derive(Debug, Serialize, ToSchema)]
pub struct AdminUser {
    pub id: DbId,
    pub email: String,
    pub name: String,
    pub is_admin: bool,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for AdminUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            is_admin: user.is_admin,
            is_active: user.is_active,
            last_login_at: user.last_login_at,
            created_at: user.created_at,
        }
    }
}

/// One page of the admin user list.
#[derive(Debug, Serialize, ToSchema)]
pub struct AdminUserList {
    pub data: Vec<AdminUser>,
    /// Number of users matching the filter, ignoring pagination.
    pub total: i64,
}

/// Request body for `POST /admin/users`.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AdminUserCreate {
    #[validate(
        required(message = "This field is required."),
        email(message = "Enter a valid email address.")
    )]
    pub email: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_admin: bool,
    #[validate(required(message = "This field is required."))]
    pub password1: Option<String>,
    pub password2: Option<String>,
}

/// Request body for `PUT /admin/users/{id}`.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AdminUserUpdate {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: Option<String>,
    pub name: Option<String>,
    pub is_admin: Option<bool>,
    pub is_active: Option<bool>,
}

/// Request body for `POST /admin/users/{id}/password`.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AdminSetPassword {
    #[validate(required(message = "This field is required."))]
    pub password1: Option<String>,
    pub password2: Option<String>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// List users, ordered by email.
#[utoipa::path(
    get,
    path = "/api/v1/admin/users",
    tag = "admin",
    security(("jwt" = [])),
    params(AdminUserListParams),
    responses((status = 200, body = AdminUserList), (status = 403, body = ErrorBody))
)]
pub async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(params): Query<AdminUserListParams>,
) -> AppResult<Json<AdminUserList>> {
    let filter = params.to_filter();
    let users = UserRepo::list(&state.pool, &filter).await?;
    let total = UserRepo::count(&state.pool, &filter).await?;

    Ok(Json(AdminUserList {
        data: users.into_iter().map(AdminUser::from).collect(),
        total,
    }))
}

/// Create an active user.
#[utoipa::path(
    post,
    path = "/api/v1/admin/users",
    tag = "admin",
    security(("jwt" = [])),
    request_body = AdminUserCreate,
    responses((status = 201, body = AdminUser), (status = 400, body = ErrorBody))
)]
pub async fn create_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ValidJson(input): ValidJson<AdminUserCreate>,
) -> AppResult<(StatusCode, Json<AdminUser>)> {
    let email = normalize_email(present(&input.email));
    let password = present(&input.password1);

    let mut errors = FieldErrors::new();
    if UserRepo::find_by_email(&state.pool, &email).await?.is_some() {
        errors.add("email", EMAIL_TAKEN);
    }
    check_retype(&mut errors, password, input.password2.as_deref(), "password2", "password2");
    check_password_strength(
        &mut errors,
        "password2",
        password,
        &[("email", email.as_str()), ("name", input.name.as_str())],
    );
    errors.into_result()?;

    let user = UserRepo::create(
        &state.pool,
        &CreateUser {
            email,
            name: input.name,
            password_hash: hash_new_password(password)?,
            is_active: true,
            is_admin: input.is_admin,
        },
    )
    .await
    .map_err(email_conflict)?;

    tracing::info!(user_id = user.id, created_by = admin.user.id, "Admin created user");
    Ok((StatusCode::CREATED, Json(AdminUser::from(user))))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/users/{id}",
    tag = "admin",
    security(("jwt" = [])),
    params(("id" = i64, Path, description = "User id")),
    responses((status = 200, body = AdminUser), (status = 404, body = ErrorBody))
)]
pub async fn get_user(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<Json<AdminUser>> {
    let user = find_user(&state, id).await?;
    Ok(Json(AdminUser::from(user)))
}

/// Update profile fields and flags (not the password).
#[utoipa::path(
    put,
    path = "/api/v1/admin/users/{id}",
    tag = "admin",
    security(("jwt" = [])),
    params(("id" = i64, Path, description = "User id")),
    request_body = AdminUserUpdate,
    responses(
        (status = 200, body = AdminUser),
        (status = 400, body = ErrorBody),
        (status = 404, body = ErrorBody),
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
    ValidJson(input): ValidJson<AdminUserUpdate>,
) -> AppResult<Json<AdminUser>> {
    let email = input.email.as_deref().map(normalize_email);
    if let Some(email) = &email {
        let taken = UserRepo::find_by_email(&state.pool, email)
            .await?
            .is_some_and(|existing| existing.id != id);
        if taken {
            return Err(FieldErrors::single("email", EMAIL_TAKEN).into());
        }
    }

    let update = UpdateUser {
        email,
        name: input.name,
        is_active: input.is_active,
        is_admin: input.is_admin,
    };
    let user = UserRepo::update(&state.pool, id, &update)
        .await
        .map_err(email_conflict)?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "User", id }))?;

    if !user.is_active {
        SessionRepo::revoke_all_for_user(&state.pool, id).await?;
    }
    Ok(Json(AdminUser::from(user)))
}

/// Replace a user's password and revoke their refresh sessions.
#[utoipa::path(
    post,
    path = "/api/v1/admin/users/{id}/password",
    tag = "admin",
    security(("jwt" = [])),
    params(("id" = i64, Path, description = "User id")),
    request_body = AdminSetPassword,
    responses(
        (status = 204),
        (status = 400, body = ErrorBody),
        (status = 404, body = ErrorBody),
    )
)]
pub async fn set_user_password(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
    ValidJson(input): ValidJson<AdminSetPassword>,
) -> AppResult<StatusCode> {
    let user = find_user(&state, id).await?;
    let password = present(&input.password1);

    let mut errors = FieldErrors::new();
    check_retype(&mut errors, password, input.password2.as_deref(), "password2", "password2");
    check_password_strength(&mut errors, "password2", password, &user.password_attributes());
    errors.into_result()?;

    UserRepo::update_password(&state.pool, id, &hash_new_password(password)?).await?;
    SessionRepo::revoke_all_for_user(&state.pool, id).await?;

    tracing::info!(user_id = id, changed_by = admin.user.id, "Admin set user password");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/users/{id}",
    tag = "admin",
    security(("jwt" = [])),
    params(("id" = i64, Path, description = "User id")),
    responses((status = 204), (status = 404, body = ErrorBody))
)]
pub async fn delete_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !UserRepo::delete(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::NotFound { entity: "User", id }));
    }
    tracing::info!(user_id = id, deleted_by = admin.user.id, "Admin deleted user");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn find_user(state: &AppState, id: DbId) -> AppResult<User> {
    UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "User", id }))
}
