//! User entity model and DTOs.

use authapi_core::tokens::TokenSubject;
use authapi_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// Full user row from the `users` table.
///
/// Contains the password hash -- NEVER serialize this to API responses directly.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: DbId,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub is_active: bool,
    pub is_admin: bool,
    pub last_login_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    /// The fields activation and password-reset tokens are bound to.
    pub fn token_subject(&self) -> TokenSubject<'_> {
        TokenSubject {
            id: self.id,
            email: &self.email,
            password_hash: &self.password_hash,
            last_login: self.last_login_at,
        }
    }

    /// `(attribute, value)` pairs checked by the password similarity rule.
    pub fn password_attributes(&self) -> [(&str, &str); 2] {
        [("email", self.email.as_str()), ("name", self.name.as_str())]
    }
}

/// DTO for creating a new user.
#[derive(Debug)]
pub struct CreateUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub is_active: bool,
    pub is_admin: bool,
}

/// DTO for updating an existing user. All fields are optional.
#[derive(Debug, Default)]
pub struct UpdateUser {
    pub email: Option<String>,
    pub name: Option<String>,
    pub is_active: Option<bool>,
    pub is_admin: Option<bool>,
}

/// Filters for listing users in the admin panel.
#[derive(Debug, Default, Clone)]
pub struct UserListFilter {
    /// Case-insensitive substring match on email.
    pub search: Option<String>,
    pub is_admin: Option<bool>,
    pub limit: i64,
    pub offset: i64,
}
