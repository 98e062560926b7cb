//! JWT access/refresh token generation and validation.
//!
//! Both token types are HS256-signed JWTs carrying a [`Claims`] payload and
//! distinguished by `token_type`. Each refresh token is backed by a
//! `user_sessions` row keyed by the SHA-256 of its `jti`, so refresh tokens
//! can be revoked (rotation, password change) while access tokens stay
//! stateless.

use authapi_core::types::{DbId, Timestamp};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Default access token lifetime in minutes.
pub const DEFAULT_ACCESS_LIFETIME_MINS: i64 = 5;
/// Default refresh token lifetime in days.
pub const DEFAULT_REFRESH_LIFETIME_DAYS: i64 = 1;
/// Default `Authorization` scheme.
pub const DEFAULT_AUTH_HEADER_TYPE: &str = "JWT";

/// Which kind of token a JWT is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT claims embedded in every token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub token_type: TokenType,
    /// The user's internal database id.
    pub user_id: DbId,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// Unique token identifier (UUID v4, simple form).
    pub jti: String,
}

/// Configuration for JWT token generation and validation.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HMAC-SHA256 secret used to sign and verify tokens.
    pub secret: String,
    pub access_token_lifetime_mins: i64,
    pub refresh_token_lifetime_days: i64,
    /// Issue a new refresh token (and revoke the old one) on every refresh.
    pub rotate_refresh_tokens: bool,
    /// Record `last_login_at` when a token pair is obtained.
    pub update_last_login: bool,
    /// Accepted `Authorization` schemes, e.g. `["JWT"]`.
    pub auth_header_types: Vec<String>,
}

/// A freshly signed refresh token and the data needed to persist its session.
#[derive(Debug, Clone)]
pub struct IssuedRefreshToken {
    pub token: String,
    pub jti: String,
    pub expires_at: Timestamp,
}

fn sign(
    token_type: TokenType,
    user_id: DbId,
    lifetime: Duration,
    config: &JwtConfig,
) -> Result<(String, Claims), jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = Claims {
        token_type,
        user_id,
        exp: (now + lifetime).timestamp(),
        iat: now.timestamp(),
        jti: Uuid::new_v4().simple().to_string(),
    };
    let token = encode(
        &Header::default(), // HS256
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )?;
    Ok((token, claims))
}

/// Generate a signed access token for the given user.
pub fn generate_access_token(
    user_id: DbId,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let lifetime = Duration::minutes(config.access_token_lifetime_mins);
    sign(TokenType::Access, user_id, lifetime, config).map(|(token, _)| token)
}

/// Generate a signed refresh token for the given user.
///
/// The caller persists a session row with [`hash_jti`] of the returned `jti`.
pub fn generate_refresh_token(
    user_id: DbId,
    config: &JwtConfig,
) -> Result<IssuedRefreshToken, jsonwebtoken::errors::Error> {
    let lifetime = Duration::days(config.refresh_token_lifetime_days);
    let (token, claims) = sign(TokenType::Refresh, user_id, lifetime, config)?;
    let expires_at =
        DateTime::from_timestamp(claims.exp, 0).unwrap_or_else(|| Utc::now() + lifetime);
    Ok(IssuedRefreshToken {
        token,
        jti: claims.jti,
        expires_at,
    })
}

/// Validate the signature and expiry of any token, returning its [`Claims`].
pub fn validate_token(
    token: &str,
    config: &JwtConfig,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::default(); // HS256, validates exp
    validation.leeway = 0;
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )?;
    Ok(token_data.claims)
}

/// Like [`validate_token`] but also requires the given `token_type`.
///
/// Returns `None` for any invalid, expired, or wrong-type token.
pub fn validate_token_of_type(
    token: &str,
    expected: TokenType,
    config: &JwtConfig,
) -> Option<Claims> {
    validate_token(token, config)
        .ok()
        .filter(|claims| claims.token_type == expected)
}

/// SHA-256 hex digest of a refresh token's `jti`, as stored in `user_sessions`.
pub fn hash_jti(jti: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(jti.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Extract the token from an `Authorization` header value.
///
/// The scheme must be one of `config.auth_header_types` followed by a single
/// space and a non-empty token.
pub fn token_from_header<'a>(header: &'a str, config: &JwtConfig) -> Option<&'a str> {
    let (scheme, token) = header.split_once(' ')?;
    let token = token.trim();
    if token.is_empty() || token.contains(' ') {
        return None;
    }
    config
        .auth_header_types
        .iter()
        .any(|accepted| accepted == scheme)
        .then_some(token)
}
