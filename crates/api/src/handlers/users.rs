//! Handlers for the `/auth/users` resource: registration, activation,
//! profile management, and the password change / reset flows.

use authapi_core::email::normalize_email;
use authapi_core::error::{CoreError, FieldErrors, NON_FIELD_ERRORS};
use authapi_core::tokens::{decode_uid, encode_uid};
use authapi_core::types::DbId;
use authapi_db::models::user::{CreateUser, UpdateUser, User};
use authapi_db::repositories::{SessionRepo, UserRepo};
use authapi_mail::templates::{EmailContext, EmailKind};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::password::{check_password_strength, check_retype, hash_password, verify_password};
use crate::error::{AppError, AppResult, ErrorBody};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;
use crate::validation::{present, ValidJson};

pub const EMAIL_TAKEN: &str = "user with this email already exists.";
pub const INVALID_UID: &str = "Invalid user id or user doesn't exist.";
pub const INVALID_TOKEN: &str = "Invalid token for given user.";
pub const STALE_TOKEN: &str = "Stale token for given user.";
pub const EMAIL_NOT_FOUND: &str = "User with given email does not exist.";
pub const INVALID_PASSWORD: &str = "Invalid password.";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Public representation of a user.
#[derive(Debug, Serialize, ToSchema)]
#[schema(as = User)]
pub struct UserResponse {
    pub id: DbId,
    pub email: String,
    pub name: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
        }
    }
}

/// Request body for `POST /auth/users/`.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UserCreate {
    #[validate(
        required(message = "This field is required."),
        email(message = "Enter a valid email address.")
    )]
    pub email: Option<String>,
    #[serde(default)]
    pub name: String,
    #[validate(required(message = "This field is required."))]
    pub password: Option<String>,
    /// Required when password retyping is enabled.
    pub re_password: Option<String>,
}

/// Request body for `PUT|PATCH /auth/users/me/` and `/auth/users/{id}/`.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UserUpdate {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: Option<String>,
    pub name: Option<String>,
}

/// Request body for deleting an account.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UserDelete {
    #[validate(required(message = "This field is required."))]
    pub current_password: Option<String>,
}

/// Request body for `POST /auth/users/activation/`.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct Activation {
    #[validate(required(message = "This field is required."))]
    pub uid: Option<String>,
    #[validate(required(message = "This field is required."))]
    pub token: Option<String>,
}

/// Request body for `reset_password` and `resend_activation`.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PasswordReset {
    #[validate(
        required(message = "This field is required."),
        email(message = "Enter a valid email address.")
    )]
    pub email: Option<String>,
}

/// Request body for `POST /auth/users/set_password/`.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SetPassword {
    #[validate(required(message = "This field is required."))]
    pub current_password: Option<String>,
    #[validate(required(message = "This field is required."))]
    pub new_password: Option<String>,
    pub re_new_password: Option<String>,
}

/// Request body for `POST /auth/users/reset_password_confirm/`.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PasswordResetConfirm {
    #[validate(required(message = "This field is required."))]
    pub uid: Option<String>,
    #[validate(required(message = "This field is required."))]
    pub token: Option<String>,
    #[validate(required(message = "This field is required."))]
    pub new_password: Option<String>,
    pub re_new_password: Option<String>,
}

// ---------------------------------------------------------------------------
// Registration and activation
// ---------------------------------------------------------------------------

/// Register a new account.
///
/// The account starts inactive and receives an activation link when
/// activation emails are enabled.
#[utoipa::path(
    post,
    path = "/api/v1/auth/users/",
    tag = "users",
    request_body = UserCreate,
    responses(
        (status = 201, body = UserResponse),
        (status = 400, body = ErrorBody),
    )
)]
pub async fn create(
    State(state): State<AppState>,
    ValidJson(input): ValidJson<UserCreate>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let accounts = &state.config.accounts;
    let email = normalize_email(present(&input.email));
    let password = present(&input.password);

    let mut errors = FieldErrors::new();
    if UserRepo::find_by_email(&state.pool, &email).await?.is_some() {
        errors.add("email", EMAIL_TAKEN);
    }
    if accounts.user_create_password_retype {
        check_retype(
            &mut errors,
            password,
            input.re_password.as_deref(),
            "re_password",
            NON_FIELD_ERRORS,
        );
    }
    check_password_strength(
        &mut errors,
        "password",
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
            is_active: !accounts.send_activation_email,
            is_admin: false,
        },
    )
    .await
    .map_err(email_conflict)?;

    tracing::info!(user_id = user.id, "User registered");

    if accounts.send_activation_email {
        send_account_email(&state, EmailKind::Activation, &user).await?;
    } else if accounts.send_confirmation_email {
        send_account_email(&state, EmailKind::Confirmation, &user).await?;
    }

    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

/// Activate an account from the `{uid, token}` pair in the activation email.
#[utoipa::path(
    post,
    path = "/api/v1/auth/users/activation/",
    tag = "users",
    request_body = Activation,
    responses(
        (status = 204),
        (status = 400, body = ErrorBody),
        (status = 403, body = ErrorBody),
    )
)]
pub async fn activation(
    State(state): State<AppState>,
    ValidJson(input): ValidJson<Activation>,
) -> AppResult<StatusCode> {
    let user = user_from_link(&state, present(&input.uid), present(&input.token)).await?;

    // The token survives activation, so a second use must be refused.
    if user.is_active || !UserRepo::set_active(&state.pool, user.id, true).await? {
        return Err(AppError::Core(CoreError::Forbidden(STALE_TOKEN.into())));
    }

    tracing::info!(user_id = user.id, "User activated");

    if state.config.accounts.send_confirmation_email {
        send_account_email(&state, EmailKind::Confirmation, &user).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Send the activation email again to an inactive account.
#[utoipa::path(
    post,
    path = "/api/v1/auth/users/resend_activation/",
    tag = "users",
    request_body = PasswordReset,
    responses(
        (status = 204),
        (status = 400, body = ErrorBody),
    )
)]
pub async fn resend_activation(
    State(state): State<AppState>,
    ValidJson(input): ValidJson<PasswordReset>,
) -> AppResult<StatusCode> {
    if !state.config.accounts.send_activation_email {
        return Err(AppError::BadRequest("Account activation is disabled".into()));
    }

    let user = UserRepo::find_by_email(&state.pool, present(&input.email))
        .await?
        .filter(|u| !u.is_active);

    match user {
        Some(user) => send_account_email(&state, EmailKind::Activation, &user).await?,
        None => email_not_found(&state)?,
    }
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Current user
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/v1/auth/users/me/",
    tag = "users",
    security(("jwt" = [])),
    responses((status = 200, body = UserResponse), (status = 401, body = ErrorBody))
)]
pub async fn me(auth: AuthUser) -> Json<UserResponse> {
    Json(UserResponse::from(&auth.user))
}

/// `PUT` and `PATCH` both apply a partial update.
#[utoipa::path(
    patch,
    path = "/api/v1/auth/users/me/",
    tag = "users",
    security(("jwt" = [])),
    request_body = UserUpdate,
    responses((status = 200, body = UserResponse), (status = 400, body = ErrorBody))
)]
pub async fn update_me(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidJson(input): ValidJson<UserUpdate>,
) -> AppResult<Json<UserResponse>> {
    let user = apply_update(&state, &auth.user, input).await?;
    Ok(Json(UserResponse::from(&user)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/auth/users/me/",
    tag = "users",
    security(("jwt" = [])),
    request_body = UserDelete,
    responses((status = 204), (status = 400, body = ErrorBody))
)]
pub async fn delete_me(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidJson(input): ValidJson<UserDelete>,
) -> AppResult<StatusCode> {
    delete_account(&state, &auth.user, &auth.user, present(&input.current_password)).await
}

// ---------------------------------------------------------------------------
// Users by id
// ---------------------------------------------------------------------------

/// Admins see every user; everyone else sees only themselves.
#[utoipa::path(
    get,
    path = "/api/v1/auth/users/",
    tag = "users",
    security(("jwt" = [])),
    responses((status = 200, body = Vec<UserResponse>), (status = 401, body = ErrorBody))
)]
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<Vec<UserResponse>>> {
    if !auth.user.is_admin {
        return Ok(Json(vec![UserResponse::from(&auth.user)]));
    }
    let users = UserRepo::list_all(&state.pool).await?;
    Ok(Json(users.iter().map(UserResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/users/{id}/",
    tag = "users",
    security(("jwt" = [])),
    params(("id" = i64, Path, description = "User id")),
    responses((status = 200, body = UserResponse), (status = 404, body = ErrorBody))
)]
pub async fn retrieve(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<UserResponse>> {
    let user = visible_user(&state, &auth, id).await?;
    Ok(Json(UserResponse::from(&user)))
}

#[utoipa::path(
    patch,
    path = "/api/v1/auth/users/{id}/",
    tag = "users",
    security(("jwt" = [])),
    params(("id" = i64, Path, description = "User id")),
    request_body = UserUpdate,
    responses(
        (status = 200, body = UserResponse),
        (status = 400, body = ErrorBody),
        (status = 404, body = ErrorBody),
    )
)]
pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    ValidJson(input): ValidJson<UserUpdate>,
) -> AppResult<Json<UserResponse>> {
    let target = visible_user(&state, &auth, id).await?;
    let user = apply_update(&state, &target, input).await?;
    Ok(Json(UserResponse::from(&user)))
}

/// Requires the requester's own `current_password`.
#[utoipa::path(
    delete,
    path = "/api/v1/auth/users/{id}/",
    tag = "users",
    security(("jwt" = [])),
    params(("id" = i64, Path, description = "User id")),
    request_body = UserDelete,
    responses(
        (status = 204),
        (status = 400, body = ErrorBody),
        (status = 404, body = ErrorBody),
    )
)]
pub async fn destroy(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    ValidJson(input): ValidJson<UserDelete>,
) -> AppResult<StatusCode> {
    let target = visible_user(&state, &auth, id).await?;
    delete_account(&state, &auth.user, &target, present(&input.current_password)).await
}

// ---------------------------------------------------------------------------
// Passwords
// ---------------------------------------------------------------------------

/// Change the current user's password. Every refresh token is revoked.
#[utoipa::path(
    post,
    path = "/api/v1/auth/users/set_password/",
    tag = "users",
    security(("jwt" = [])),
    request_body = SetPassword,
    responses((status = 204), (status = 400, body = ErrorBody))
)]
pub async fn set_password(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidJson(input): ValidJson<SetPassword>,
) -> AppResult<StatusCode> {
    let user = &auth.user;
    let new_password = present(&input.new_password);

    let mut errors = FieldErrors::new();
    if !verify(present(&input.current_password), &user.password_hash)? {
        errors.add("current_password", INVALID_PASSWORD);
    }
    if state.config.accounts.set_password_retype {
        check_retype(
            &mut errors,
            new_password,
            input.re_new_password.as_deref(),
            "re_new_password",
            NON_FIELD_ERRORS,
        );
    }
    check_password_strength(&mut errors, "new_password", new_password, &user.password_attributes());
    errors.into_result()?;

    replace_password(&state, user, new_password).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Email a password reset link to an active account.
#[utoipa::path(
    post,
    path = "/api/v1/auth/users/reset_password/",
    tag = "users",
    request_body = PasswordReset,
    responses((status = 204), (status = 400, body = ErrorBody))
)]
pub async fn reset_password(
    State(state): State<AppState>,
    ValidJson(input): ValidJson<PasswordReset>,
) -> AppResult<StatusCode> {
    let user = UserRepo::find_by_email(&state.pool, present(&input.email))
        .await?
        .filter(|u| u.is_active);

    match user {
        Some(user) => send_account_email(&state, EmailKind::PasswordReset, &user).await?,
        None => email_not_found(&state)?,
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Set a new password from the `{uid, token}` pair in the reset email.
#[utoipa::path(
    post,
    path = "/api/v1/auth/users/reset_password_confirm/",
    tag = "users",
    request_body = PasswordResetConfirm,
    responses((status = 204), (status = 400, body = ErrorBody))
)]
pub async fn reset_password_confirm(
    State(state): State<AppState>,
    ValidJson(input): ValidJson<PasswordResetConfirm>,
) -> AppResult<StatusCode> {
    let user = user_from_link(&state, present(&input.uid), present(&input.token)).await?;
    let new_password = present(&input.new_password);

    let mut errors = FieldErrors::new();
    if state.config.accounts.password_reset_confirm_retype {
        check_retype(
            &mut errors,
            new_password,
            input.re_new_password.as_deref(),
            "re_new_password",
            NON_FIELD_ERRORS,
        );
    }
    check_password_strength(&mut errors, "new_password", new_password, &user.password_attributes());
    errors.into_result()?;

    replace_password(&state, &user, new_password).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A concurrent signup can pass the lookup above and still lose the insert
/// on `uq_users_email`. Report that as the usual field error.
pub fn email_conflict(err: sqlx::Error) -> AppError {
    let duplicate = err.as_database_error().is_some_and(|db| {
        db.code().as_deref() == Some("23505") && db.constraint() == Some("uq_users_email")
    });
    if duplicate {
        FieldErrors::single("email", EMAIL_TAKEN).into()
    } else {
        AppError::Database(err)
    }
}

pub(crate) fn hash_new_password(password: &str) -> AppResult<String> {
    hash_password(password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))
}

fn verify(password: &str, password_hash: &str) -> AppResult<bool> {
    verify_password(password, password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))
}

/// Render and deliver an account email. Activation and reset emails carry
/// a fresh `{uid}/{token}` link.
pub(crate) async fn send_account_email(
    state: &AppState,
    kind: EmailKind,
    user: &User,
) -> AppResult<()> {
    let site = &state.config.site;
    let accounts = &state.config.accounts;
    let mut context = EmailContext::new(
        &user.email,
        &user.name,
        &site.domain,
        &site.name,
        &site.protocol,
    );

    let link = match kind {
        EmailKind::Activation => Some(&accounts.activation_url),
        EmailKind::PasswordReset => Some(&accounts.password_reset_confirm_url),
        EmailKind::Confirmation | EmailKind::PasswordChangedConfirmation => None,
    };
    if let Some(pattern) = link {
        let uid = encode_uid(user.id);
        let token = state.tokens.make_token(&user.token_subject());
        context = context.with_link(&uid, &token, pattern);
    }

    state.emails.send(kind, &user.email, &context).await?;
    Ok(())
}

/// Resolve the user behind an emailed `{uid}/{token}` link.
async fn user_from_link(state: &AppState, uid: &str, token: &str) -> AppResult<User> {
    let user = match decode_uid(uid) {
        Some(id) => UserRepo::find_by_id(&state.pool, id).await?,
        None => None,
    }
    .ok_or_else(|| FieldErrors::single("uid", INVALID_UID))?;

    if !state.tokens.check_token(&user.token_subject(), token) {
        return Err(FieldErrors::single("token", INVALID_TOKEN).into());
    }
    Ok(user)
}

/// Unknown email on reset / resend: reveal it or stay silent per config.
fn email_not_found(state: &AppState) -> AppResult<()> {
    if state.config.accounts.password_reset_show_email_not_found {
        return Err(FieldErrors::single("email", EMAIL_NOT_FOUND).into());
    }
    Ok(())
}

/// The requester, or any user when the requester is an admin. Others are
/// reported as missing.
async fn visible_user(state: &AppState, auth: &AuthUser, id: DbId) -> AppResult<User> {
    if auth.user.id == id {
        return Ok(auth.user.clone());
    }
    let not_found = || AppError::Core(CoreError::NotFound { entity: "User", id });
    if !auth.user.is_admin {
        return Err(not_found());
    }
    UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(not_found)
}

/// Apply a profile update. Changing the email of an account deactivates it
/// and sends a new activation link when activation emails are enabled.
async fn apply_update(state: &AppState, user: &User, input: UserUpdate) -> AppResult<User> {
    let email = input.email.as_deref().map(normalize_email);
    let changed_email = email
        .as_deref()
        .filter(|e| !e.eq_ignore_ascii_case(&user.email));

    if let Some(new_email) = changed_email {
        let taken = UserRepo::find_by_email(&state.pool, new_email)
            .await?
            .is_some_and(|existing| existing.id != user.id);
        if taken {
            return Err(FieldErrors::single("email", EMAIL_TAKEN).into());
        }
    }

    let email_changed = changed_email.is_some();
    let reactivate = email_changed && state.config.accounts.send_activation_email;
    let updated = UserRepo::update(
        &state.pool,
        user.id,
        &UpdateUser {
            email,
            name: input.name,
            is_active: reactivate.then_some(false),
            is_admin: None,
        },
    )
    .await
    .map_err(email_conflict)?
    .ok_or(AppError::Core(CoreError::NotFound {
        entity: "User",
        id: user.id,
    }))?;

    if reactivate {
        send_account_email(state, EmailKind::Activation, &updated).await?;
    }
    Ok(updated)
}

/// Delete `target` after checking the requester's password.
async fn delete_account(
    state: &AppState,
    requester: &User,
    target: &User,
    current_password: &str,
) -> AppResult<StatusCode> {
    if !verify(current_password, &requester.password_hash)? {
        return Err(FieldErrors::single("current_password", INVALID_PASSWORD).into());
    }
    UserRepo::delete(&state.pool, target.id).await?;
    tracing::info!(user_id = target.id, deleted_by = requester.id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Store a new password hash, revoke every refresh session, and send the
/// password-changed confirmation when enabled.
async fn replace_password(state: &AppState, user: &User, new_password: &str) -> AppResult<()> {
    UserRepo::update_password(&state.pool, user.id, &hash_new_password(new_password)?).await?;
    let revoked = SessionRepo::revoke_all_for_user(&state.pool, user.id).await?;
    tracing::info!(user_id = user.id, revoked_sessions = revoked, "Password changed");

    if state.config.accounts.password_changed_email_confirmation {
        send_account_email(state, EmailKind::PasswordChangedConfirmation, user).await?;
    }
    Ok(())
}
