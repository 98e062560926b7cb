//! Domain building blocks shared by the database, mail, and API crates.
//!
//! Nothing in here performs I/O: password rules, account token signing,
//! and the error vocabulary are all pure functions over plain data.

pub mod email;
pub mod error;
pub mod password_validation;
pub mod tokens;
pub mod types;
