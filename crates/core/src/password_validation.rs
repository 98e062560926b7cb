//! Password strength rules applied on registration, password change, and reset.
//!
//! [`validate_password`] runs every default validator and collects all
//! failure messages so the client sees the full list at once.

use std::collections::{HashMap, HashSet};

/// A single password rule.
pub trait PasswordValidator: Send + Sync {
    /// Check `password`, given the user's identifying attributes as
    /// `(attribute_name, value)` pairs.
    fn validate(&self, password: &str, attributes: &[(&str, &str)]) -> Result<(), String>;

    /// Human-readable description of the rule.
    fn help_text(&self) -> String;
}

/// Rejects passwords shorter than `min_length` characters.
#[derive(Debug, Clone)]
pub struct MinimumLengthValidator {
    pub min_length: usize,
}

impl Default for MinimumLengthValidator {
    fn default() -> Self {
        Self { min_length: 8 }
    }
}

impl PasswordValidator for MinimumLengthValidator {
    fn validate(&self, password: &str, _attributes: &[(&str, &str)]) -> Result<(), String> {
        if password.chars().count() < self.min_length {
            return Err(format!(
                "This password is too short. It must contain at least {} characters.",
                self.min_length
            ));
        }
        Ok(())
    }

    fn help_text(&self) -> String {
        format!(
            "Your password must contain at least {} characters.",
            self.min_length
        )
    }
}

/// Rejects passwords found in a list of frequently used passwords.
#[derive(Debug, Clone)]
pub struct CommonPasswordValidator {
    pub common_passwords: HashSet<String>,
}

/// One lowercase password per line.
const COMMON_PASSWORDS: &str = include_str!("common_passwords.txt");

impl Default for CommonPasswordValidator {
    fn default() -> Self {
        Self {
            common_passwords: COMMON_PASSWORDS
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

impl PasswordValidator for CommonPasswordValidator {
    fn validate(&self, password: &str, _attributes: &[(&str, &str)]) -> Result<(), String> {
        let lower = password.trim().to_lowercase();
        if self.common_passwords.contains(&lower) {
            return Err("This password is too common.".to_string());
        }
        Ok(())
    }

    fn help_text(&self) -> String {
        "Your password can't be a commonly used password.".to_string()
    }
}

/// Rejects passwords made only of digits.
#[derive(Debug, Clone, Default)]
pub struct NumericPasswordValidator;

impl PasswordValidator for NumericPasswordValidator {
    fn validate(&self, password: &str, _attributes: &[(&str, &str)]) -> Result<(), String> {
        if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
            return Err("This password is entirely numeric.".to_string());
        }
        Ok(())
    }

    fn help_text(&self) -> String {
        "Your password can't be entirely numeric.".to_string()
    }
}

/// Rejects passwords too similar to one of the user's attributes.
#[derive(Debug, Clone)]
pub struct UserAttributeSimilarityValidator {
    /// Similarity ratio (0.0 - 1.0) at or above which a password is rejected.
    pub max_similarity: f64,
}

impl Default for UserAttributeSimilarityValidator {
    fn default() -> Self {
        Self {
            max_similarity: 0.7,
        }
    }
}

impl PasswordValidator for UserAttributeSimilarityValidator {
    fn validate(&self, password: &str, attributes: &[(&str, &str)]) -> Result<(), String> {
        let password_lower = password.to_lowercase();
        for (name, value) in attributes {
            if value.is_empty() {
                continue;
            }
            let value_lower = value.to_lowercase();
            let parts = value_lower
                .split(|c: char| !(c.is_alphanumeric() || c == '_'))
                .filter(|p| !p.is_empty())
                .chain(std::iter::once(value_lower.as_str()));

            for part in parts {
                if exceeds_maximum_length_ratio(&password_lower, self.max_similarity, part) {
                    continue;
                }
                if similarity_ratio(part, &password_lower) >= self.max_similarity {
                    let verbose = name.replace('_', " ");
                    return Err(format!("The password is too similar to the {verbose}."));
                }
            }
        }
        Ok(())
    }

    fn help_text(&self) -> String {
        "Your password can't be too similar to your other personal information.".to_string()
    }
}

/// True when `value` is so much shorter than the password that the
/// similarity ratio can never reach `max_similarity`.
fn exceeds_maximum_length_ratio(password: &str, max_similarity: f64, value: &str) -> bool {
    let pwd_len = password.chars().count() as f64;
    let value_len = value.chars().count() as f64;
    let length_bound_similarity = max_similarity / 2.0 * pwd_len;
    pwd_len >= 10.0 * value_len && value_len < length_bound_similarity
}

/// `2 * M / (len(a) + len(b))`, where `M` counts the characters the two
/// strings share, ignoring order. In `0.0..=1.0`.
fn similarity_ratio(a: &str, b: &str) -> f64 {
    let mut available: HashMap<char, usize> = HashMap::new();
    let mut b_len = 0;
    for c in b.chars() {
        *available.entry(c).or_default() += 1;
        b_len += 1;
    }

    let mut a_len = 0;
    let mut matches = 0;
    for c in a.chars() {
        a_len += 1;
        if let Some(left) = available.get_mut(&c).filter(|n| **n > 0) {
            *left -= 1;
            matches += 1;
        }
    }

    if a_len + b_len == 0 {
        return 1.0;
    }
    (2 * matches) as f64 / (a_len + b_len) as f64
}

/// The validator chain applied to every new password.
pub fn default_validators() -> Vec<Box<dyn PasswordValidator>> {
    vec![
        Box::new(UserAttributeSimilarityValidator::default()),
        Box::new(MinimumLengthValidator::default()),
        Box::new(CommonPasswordValidator::default()),
        Box::new(NumericPasswordValidator),
    ]
}

/// Run every default validator, returning all failure messages.
pub fn validate_password(password: &str, attributes: &[(&str, &str)]) -> Result<(), Vec<String>> {
    let errors: Vec<String> = default_validators()
        .iter()
        .filter_map(|v| v.validate(password, attributes).err())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ATTRS: &[(&str, &str)] = &[("email", "jane.doe@example.com"), ("name", "Jane Doe")];

    #[test]
    fn strong_password_passes_all_validators() {
        assert!(validate_password("correct-horse-battery", ATTRS).is_ok());
    }

    #[test]
    fn short_password_is_rejected() {
        let errors = validate_password("xK9#q", ATTRS).unwrap_err();
        assert_eq!(
            errors,
            vec!["This password is too short. It must contain at least 8 characters."]
        );
    }

    #[test]
    fn common_password_is_case_insensitive() {
        let errors = validate_password("PassWord123", &[]).unwrap_err();
        assert_eq!(errors, vec!["This password is too common."]);
    }

    #[test]
    fn embedded_list_covers_more_than_the_obvious() {
        let validator = CommonPasswordValidator::default();
        assert!(validator.common_passwords.len() > 500);
        for password in ["tinkerbell", "Mustang1", " 1qazxsw2 "] {
            assert!(validator.validate(password, &[]).is_err(), "{password}");
        }
        assert!(validator.validate("v3ry-Unusual-passphrase", &[]).is_ok());
    }

    #[test]
    fn numeric_password_collects_every_failure() {
        let errors = validate_password("12345678", &[]).unwrap_err();
        assert!(errors.contains(&"This password is too common.".to_string()));
        assert!(errors.contains(&"This password is entirely numeric.".to_string()));
    }

    #[test]
    fn password_similar_to_email_is_rejected() {
        let errors = validate_password("jane.doe@example", ATTRS).unwrap_err();
        assert_eq!(errors, vec!["The password is too similar to the email."]);
    }

    #[test]
    fn password_similar_to_name_part_is_rejected() {
        let validator = UserAttributeSimilarityValidator::default();
        let result = validator.validate("janedoe1", &[("name", "Jane Doe")]);
        assert_eq!(
            result.unwrap_err(),
            "The password is too similar to the name."
        );
    }

    #[test]
    fn reordered_attribute_is_still_too_similar() {
        let validator = UserAttributeSimilarityValidator::default();
        let result = validator.validate("eodenaj1", &[("name", "Jane Doe")]);
        assert_eq!(
            result.unwrap_err(),
            "The password is too similar to the name."
        );
    }

    #[test]
    fn short_attribute_parts_are_skipped_for_long_passwords() {
        let validator = UserAttributeSimilarityValidator::default();
        // "a" is far too short to ever reach the similarity bound.
        assert!(validator
            .validate("an-unrelated-long-passphrase", &[("name", "a")])
            .is_ok());
    }

    #[test]
    fn similarity_ratio_bounds() {
        assert_eq!(similarity_ratio("abc", "abc"), 1.0);
        assert_eq!(similarity_ratio("abc", "xyz"), 0.0);
        assert!((similarity_ratio("abcd", "abxy") - 0.5).abs() < f64::EPSILON);
        // Order does not matter, repeated characters only match once each.
        assert_eq!(similarity_ratio("abc", "cba"), 1.0);
        assert!((similarity_ratio("aab", "abb") - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn help_texts_are_present() {
        for validator in default_validators() {
            assert!(!validator.help_text().is_empty());
        }
    }
}
