//! One-time tokens for account activation and password reset links.
//!
//! A token has the form `"{timestamp_base36}-{signature}"`. The timestamp is
//! seconds since 2001-01-01 UTC; the signature is a truncated HMAC-SHA256 over
//! the user's id, password hash, last login, email, and that timestamp.
//! Nothing is stored server-side: changing any of the signed fields (e.g.
//! setting a new password) invalidates every outstanding token.
//!
//! The user id travels next to the token as a `uid`, the URL-safe base64
//! encoding of its decimal representation.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{TimeZone, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::types::{DbId, Timestamp};

/// Default token validity: 3 days.
pub const DEFAULT_TOKEN_TIMEOUT_SECS: i64 = 259_200;

const KEY_SALT: &str = "authapi.tokens.AccountTokenGenerator";

/// Encode a user id for use in activation / reset URLs.
pub fn encode_uid(id: DbId) -> String {
    URL_SAFE_NO_PAD.encode(id.to_string())
}

/// Decode a `uid` produced by [`encode_uid`]. Returns `None` for anything malformed.
pub fn decode_uid(uid: &str) -> Option<DbId> {
    let bytes = URL_SAFE_NO_PAD.decode(uid.trim_end_matches('=')).ok()?;
    let text = String::from_utf8(bytes).ok()?;
    text.parse().ok()
}

/// The user state a token is bound to.
#[derive(Debug, Clone, Copy)]
pub struct TokenSubject<'a> {
    pub id: DbId,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub last_login: Option<Timestamp>,
}

/// Stateless generator and checker for activation / password-reset tokens.
#[derive(Debug, Clone)]
pub struct AccountTokenGenerator {
    secret: String,
    /// Token validity period in seconds.
    pub timeout_secs: i64,
}

impl AccountTokenGenerator {
    pub fn new(secret: impl Into<String>, timeout_secs: i64) -> Self {
        Self {
            secret: secret.into(),
            timeout_secs,
        }
    }

    /// Create a token for `subject`, valid from now.
    pub fn make_token(&self, subject: &TokenSubject<'_>) -> String {
        self.make_token_at(subject, Utc::now())
    }

    /// Check a token against the subject's current state.
    pub fn check_token(&self, subject: &TokenSubject<'_>, token: &str) -> bool {
        self.check_token_at(subject, token, Utc::now())
    }

    pub fn make_token_at(&self, subject: &TokenSubject<'_>, now: Timestamp) -> String {
        self.token_with_timestamp(subject, seconds_since_epoch_2001(now))
    }

    pub fn check_token_at(&self, subject: &TokenSubject<'_>, token: &str, now: Timestamp) -> bool {
        let Some((ts_b36, _)) = token.split_once('-') else {
            return false;
        };
        let Some(ts) = base36_decode(ts_b36) else {
            return false;
        };

        let expected = self.token_with_timestamp(subject, ts);
        if !constant_time_eq(expected.as_bytes(), token.as_bytes()) {
            return false;
        }

        let age = seconds_since_epoch_2001(now) - ts;
        (0..=self.timeout_secs).contains(&age)
    }

    fn token_with_timestamp(&self, subject: &TokenSubject<'_>, ts: i64) -> String {
        let last_login = subject
            .last_login
            .map(|dt| dt.timestamp().to_string())
            .unwrap_or_default();
        let value = format!(
            "{}{}{}{}{}",
            subject.id, subject.password_hash, last_login, ts, subject.email
        );

        // Derive a purpose-specific key so these signatures never collide with
        // anything else signed by the same secret.
        let key = Sha256::digest(format!("{KEY_SALT}{}", self.secret).as_bytes());
        let mut mac =
            Hmac::<Sha256>::new_from_slice(&key).expect("HMAC accepts keys of any length");
        mac.update(value.as_bytes());
        let digest = format!("{:x}", mac.finalize().into_bytes());
        let truncated: String = digest.chars().step_by(2).collect();

        format!("{}-{truncated}", base36_encode(ts))
    }
}

fn seconds_since_epoch_2001(now: Timestamp) -> i64 {
    let epoch = Utc
        .with_ymd_and_hms(2001, 1, 1, 0, 0, 0)
        .single()
        .map(|dt| dt.timestamp())
        .unwrap_or(978_307_200);
    now.timestamp() - epoch
}

fn base36_encode(mut n: i64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n <= 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

fn base36_decode(s: &str) -> Option<i64> {
    // Anything longer than 13 base36 digits cannot be a sane timestamp.
    if s.is_empty() || s.len() > 13 {
        return None;
    }
    i64::from_str_radix(s, 36).ok()
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
