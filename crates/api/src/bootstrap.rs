//! Startup provisioning of the initial admin account.

use authapi_core::email::normalize_email;
use authapi_db::models::user::CreateUser;
use authapi_db::repositories::UserRepo;
use sqlx::PgPool;

use crate::auth::password::hash_password;
use crate::config::SuperuserConfig;
use crate::error::{AppError, AppResult};

/// Create the configured superuser if no account with that email exists.
///
/// Returns `true` when a new account was created. An existing account is
/// left untouched, even if it is not an admin.
pub async fn ensure_superuser(pool: &PgPool, superuser: &SuperuserConfig) -> AppResult<bool> {
    let email = normalize_email(&superuser.email);

    if let Some(existing) = UserRepo::find_by_email(pool, &email).await? {
        if !existing.is_admin {
            tracing::warn!(user_id = existing.id, "Superuser email belongs to a non-admin account");
        }
        return Ok(false);
    }

    let password_hash = hash_password(&superuser.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let user = UserRepo::create(
        pool,
        &CreateUser {
            email,
            name: superuser.name.clone(),
            password_hash,
            is_active: true,
            is_admin: true,
        },
    )
    .await?;

    tracing::info!(user_id = user.id, "Superuser created");
    Ok(true)
}
