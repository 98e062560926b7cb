//! Argon2id password hashing, verification, and new-password checks.
//!
//! Hashes are stored in PHC string format so the algorithm parameters and
//! salt travel with the hash.

use std::sync::OnceLock;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use authapi_core::error::FieldErrors;
use authapi_core::password_validation::validate_password;

use crate::validation::REQUIRED;

/// Hash a plaintext password using Argon2id with a random salt.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a plaintext password against a stored PHC hash.
///
/// Returns `Ok(false)` on mismatch; `Err` only for a malformed hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed_hash = PasswordHash::new(hash)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Run one verification against a throwaway hash, so a login for an unknown
/// account costs the same as a wrong password for a real one.
pub fn verify_dummy_password(password: &str) {
    if let Some(hash) = dummy_hash() {
        let _ = verify_password(password, hash);
    }
}

fn dummy_hash() -> Option<&'static str> {
    static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();
    DUMMY_HASH
        .get_or_init(|| hash_password("unusable-dummy-password").ok())
        .as_deref()
}

/// Message used when a password and its retype differ.
pub const PASSWORD_MISMATCH: &str = "The two password fields didn't match.";

/// Run the password validators and record failures under `field`.
///
/// `attributes` are the `(name, value)` pairs the similarity rule compares against.
pub fn check_password_strength(
    errors: &mut FieldErrors,
    field: &str,
    password: &str,
    attributes: &[(&str, &str)],
) {
    if let Err(messages) = validate_password(password, attributes) {
        errors.extend(field, messages);
    }
}

/// Require `retyped` to be present and equal to `password`.
///
/// A missing retype is reported under `retype_field`; a mismatch under
/// `mismatch_field`.
pub fn check_retype(
    errors: &mut FieldErrors,
    password: &str,
    retyped: Option<&str>,
    retype_field: &str,
    mismatch_field: &str,
) {
    match retyped {
        None => errors.add(retype_field, REQUIRED),
        Some(retyped) if retyped != password => errors.add(mismatch_field, PASSWORD_MISMATCH),
        Some(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use authapi_core::error::NON_FIELD_ERRORS;

    use super::*;

    #[test]
    fn hash_and_verify() {
        let hash = hash_password("correct-horse-battery-staple").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct-horse-battery-staple", &hash).unwrap());
    }

    #[test]
    fn wrong_password_fails() {
        let hash = hash_password("real-password").unwrap();
        assert!(!verify_password("wrong-password", &hash).unwrap());
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let a = hash_password("same").unwrap();
        let b = hash_password("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn dummy_hash_uses_the_real_parameters() {
        let real = hash_password("whatever").unwrap();
        let dummy = dummy_hash().expect("dummy hash");
        let params = |phc: &str| phc.split('$').take(4).collect::<Vec<_>>().join("$");
        assert_eq!(params(dummy), params(&real));
        assert!(!verify_password("whatever", dummy).unwrap());
        verify_dummy_password("whatever");
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_password("anything", "not-a-phc-string").is_err());
    }

    #[test]
    fn weak_password_collects_messages_under_field() {
        let mut errors = FieldErrors::new();
        check_password_strength(&mut errors, "password", "123", &[("email", "a@b.com")]);
        let messages = errors.get("password").expect("password errors");
        assert!(messages.len() >= 2, "too short and entirely numeric: {messages:?}");
    }

    #[test]
    fn strong_password_adds_nothing() {
        let mut errors = FieldErrors::new();
        check_password_strength(&mut errors, "password", "k9!vQz#2mLp", &[]);
        assert!(errors.is_empty());
    }

    #[test]
    fn retype_rules() {
        let mut errors = FieldErrors::new();
        check_retype(&mut errors, "a", None, "re_password", NON_FIELD_ERRORS);
        assert_eq!(errors.get("re_password"), Some(&[REQUIRED.to_string()][..]));

        let mut errors = FieldErrors::new();
        check_retype(&mut errors, "a", Some("b"), "re_password", NON_FIELD_ERRORS);
        assert_eq!(
            errors.get(NON_FIELD_ERRORS),
            Some(&[PASSWORD_MISMATCH.to_string()][..])
        );

        let mut errors = FieldErrors::new();
        check_retype(&mut errors, "a", Some("a"), "re_password", NON_FIELD_ERRORS);
        assert!(errors.is_empty());
    }
}
