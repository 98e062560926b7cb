//! Email address normalisation.

/// Trim surrounding whitespace and lowercase the domain part.
///
/// The local part is left untouched since some mail servers treat it as
/// case-sensitive. Addresses without an `@` are returned trimmed only.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{local}@{}", domain.to_lowercase()),
        None => email.to_string(),
    }
}
