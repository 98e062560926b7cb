//! Authentication primitives.
//!
//! - [`password`] -- Argon2id password hashing and verification.
//! - [`jwt`] -- access/refresh JWT issuance, validation, and header parsing.

pub mod jwt;
pub mod password;
