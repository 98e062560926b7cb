//! Request handlers.
//!
//! - [`users`] -- registration, activation, profile, and password flows.
//! - [`jwt`] -- token pair issuance, refresh, and verification.
//! - [`admin`] -- admin-only user management.

pub mod admin;
pub mod jwt;
pub mod users;
