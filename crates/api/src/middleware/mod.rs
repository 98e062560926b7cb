//! Authentication and authorization extractors.
//!
//! - [`auth::AuthUser`] -- Loads the user behind a `JWT <access token>` header.
//! - [`rbac::RequireAdmin`] -- Requires an admin account.

pub mod auth;
pub mod rbac;
