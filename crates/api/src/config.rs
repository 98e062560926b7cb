use std::ops::RangeInclusive;
use std::str::FromStr;

use authapi_core::tokens::DEFAULT_TOKEN_TIMEOUT_SECS;
use authapi_mail::config::{parse_bool, EmailConfig, EmailConfigError};

use crate::auth::jwt::{
    JwtConfig, DEFAULT_ACCESS_LIFETIME_MINS, DEFAULT_AUTH_HEADER_TYPE,
    DEFAULT_REFRESH_LIFETIME_DAYS,
};

/// Upper bounds for durations read from the environment. Each is far inside
/// what `chrono::TimeDelta` and `tokio::time` can represent.
const MAX_ACCESS_LIFETIME_MINS: i64 = 60 * 24 * 365;
const MAX_REFRESH_LIFETIME_DAYS: i64 = 365 * 10;
const MAX_TOKEN_TIMEOUT_SECS: i64 = 60 * 60 * 24 * 365;
const MAX_SERVER_TIMEOUT_SECS: u64 = 60 * 60 * 24;

/// Error raised when the environment does not describe a usable server.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set in the environment")]
    Missing(&'static str),

    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },

    #[error(transparent)]
    Email(#[from] EmailConfigError),
}

/// Server configuration loaded from environment variables.
///
/// All fields except `DATABASE_URL` and `SECRET_KEY` have defaults suitable
/// for local development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8000`).
    pub port: u16,
    /// PostgreSQL connection string.
    pub database_url: String,
    /// Verbose logging defaults when `true`.
    pub debug: bool,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Grace period for background tasks after the listener stops (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// How often expired or revoked sessions are purged (default: `3600`).
    pub session_cleanup_interval_secs: u64,
    /// JWT token configuration (secret, lifetimes, rotation).
    pub jwt: JwtConfig,
    /// Registration / activation / reset behaviour.
    pub accounts: AccountsConfig,
    /// Values used to build links in outgoing emails.
    pub site: SiteConfig,
    pub email: EmailConfig,
    /// OpenAPI document metadata.
    pub schema: SchemaConfig,
    /// Admin account created at startup when missing.
    pub superuser: Option<SuperuserConfig>,
}

/// Switches for the account flows.
#[derive(Debug, Clone)]
pub struct AccountsConfig {
    /// Frontend path of the activation page; `{uid}` and `{token}` are substituted.
    pub activation_url: String,
    /// Frontend path of the password reset page; `{uid}` and `{token}` are substituted.
    pub password_reset_confirm_url: String,
    /// New users start inactive and receive an activation link.
    pub send_activation_email: bool,
    /// Send a confirmation once an account is activated.
    pub send_confirmation_email: bool,
    /// Send a confirmation after a password change or reset.
    pub password_changed_email_confirmation: bool,
    /// Registration requires `re_password`.
    pub user_create_password_retype: bool,
    /// `set_password` requires `re_new_password`.
    pub set_password_retype: bool,
    /// `reset_password_confirm` requires `re_new_password`.
    pub password_reset_confirm_retype: bool,
    /// Reveal unknown emails on reset / resend requests with a 400.
    pub password_reset_show_email_not_found: bool,
    /// Lifetime of activation and reset links.
    pub password_reset_timeout_secs: i64,
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            activation_url: "activate/{uid}/{token}".to_string(),
            password_reset_confirm_url: "password-reset/{uid}/{token}".to_string(),
            send_activation_email: true,
            send_confirmation_email: true,
            password_changed_email_confirmation: true,
            user_create_password_retype: true,
            set_password_retype: true,
            password_reset_confirm_retype: false,
            password_reset_show_email_not_found: true,
            password_reset_timeout_secs: DEFAULT_TOKEN_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub domain: String,
    pub name: String,
    pub protocol: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            domain: "localhost:8000".to_string(),
            name: "Auth API".to_string(),
            protocol: "http".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SchemaConfig {
    pub title: String,
    pub description: String,
    pub version: String,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            title: "Auth API".to_string(),
            description: "Auth API".to_string(),
            version: "1.0.0".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SuperuserConfig {
    pub email: String,
    pub password: String,
    pub name: String,
}

impl ServerConfig {
    /// Load configuration from the process environment (after `.env`).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// | Env Var                              | Default                                       |
    /// |--------------------------------------|-----------------------------------------------|
    /// | `HOST`                               | `0.0.0.0`                                     |
    /// | `PORT`                               | `8000`                                        |
    /// | `DATABASE_URL`                       | **required**                                  |
    /// | `SECRET_KEY`                         | **required**                                  |
    /// | `DEBUG`                              | `false`                                       |
    /// | `CORS_ORIGINS`                       | `http://localhost:8000,http://127.0.0.1:3000` |
    /// | `REQUEST_TIMEOUT_SECS`               | `30`                                          |
    /// | `SHUTDOWN_TIMEOUT_SECS`              | `30`                                          |
    /// | `SESSION_CLEANUP_INTERVAL_SECS`      | `3600`                                        |
    /// | `JWT_ACCESS_TOKEN_LIFETIME_MINS`     | `5`                                           |
    /// | `JWT_REFRESH_TOKEN_LIFETIME_DAYS`    | `1`                                           |
    /// | `JWT_ROTATE_REFRESH_TOKENS`          | `true`                                        |
    /// | `JWT_UPDATE_LAST_LOGIN`              | `false`                                       |
    /// | `JWT_AUTH_HEADER_TYPES`              | `JWT`                                         |
    /// | `SITE_DOMAIN` / `SITE_NAME`          | `localhost:8000` / `Auth API`                 |
    /// | `SITE_PROTOCOL`                      | `http`                                        |
    /// | `ACTIVATION_URL`                     | `activate/{uid}/{token}`                      |
    /// | `PASSWORD_RESET_CONFIRM_URL`         | `password-reset/{uid}/{token}`                |
    /// | `SEND_ACTIVATION_EMAIL`              | `true`                                        |
    /// | `SEND_CONFIRMATION_EMAIL`            | `true`                                        |
    /// | `PASSWORD_CHANGED_EMAIL_CONFIRMATION`| `true`                                        |
    /// | `USER_CREATE_PASSWORD_RETYPE`        | `true`                                        |
    /// | `SET_PASSWORD_RETYPE`                | `true`                                        |
    /// | `PASSWORD_RESET_CONFIRM_RETYPE`      | `false`                                       |
    /// | `PASSWORD_RESET_SHOW_EMAIL_NOT_FOUND`| `true`                                        |
    /// | `PASSWORD_RESET_TIMEOUT_SECS`        | `259200`                                      |
    /// | `SCHEMA_TITLE` / `SCHEMA_DESCRIPTION`| `Auth API`                                    |
    /// | `SCHEMA_VERSION`                     | `1.0.0`                                       |
    /// | `SUPERUSER_EMAIL` / `SUPERUSER_PASSWORD` / `SUPERUSER_NAME` | unset          |
    ///
    /// Email settings are documented on [`EmailConfig::from_lookup`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup: &lookup };

        let secret = env.required("SECRET_KEY")?;
        let database_url = env.required("DATABASE_URL")?;

        let auth_header_types = env.list("JWT_AUTH_HEADER_TYPES", DEFAULT_AUTH_HEADER_TYPE);
        if auth_header_types.is_empty() {
            return Err(ConfigError::Invalid {
                name: "JWT_AUTH_HEADER_TYPES",
                value: String::new(),
            });
        }

        let jwt = JwtConfig {
            secret,
            access_token_lifetime_mins: env.bounded(
                "JWT_ACCESS_TOKEN_LIFETIME_MINS",
                DEFAULT_ACCESS_LIFETIME_MINS,
                1..=MAX_ACCESS_LIFETIME_MINS,
            )?,
            refresh_token_lifetime_days: env.bounded(
                "JWT_REFRESH_TOKEN_LIFETIME_DAYS",
                DEFAULT_REFRESH_LIFETIME_DAYS,
                1..=MAX_REFRESH_LIFETIME_DAYS,
            )?,
            rotate_refresh_tokens: env.flag("JWT_ROTATE_REFRESH_TOKENS", true)?,
            update_last_login: env.flag("JWT_UPDATE_LAST_LOGIN", false)?,
            auth_header_types,
        };

        let defaults = AccountsConfig::default();
        let accounts = AccountsConfig {
            activation_url: env.string("ACTIVATION_URL", &defaults.activation_url),
            password_reset_confirm_url: env
                .string("PASSWORD_RESET_CONFIRM_URL", &defaults.password_reset_confirm_url),
            send_activation_email: env.flag("SEND_ACTIVATION_EMAIL", true)?,
            send_confirmation_email: env.flag("SEND_CONFIRMATION_EMAIL", true)?,
            password_changed_email_confirmation: env
                .flag("PASSWORD_CHANGED_EMAIL_CONFIRMATION", true)?,
            user_create_password_retype: env.flag("USER_CREATE_PASSWORD_RETYPE", true)?,
            set_password_retype: env.flag("SET_PASSWORD_RETYPE", true)?,
            password_reset_confirm_retype: env.flag("PASSWORD_RESET_CONFIRM_RETYPE", false)?,
            password_reset_show_email_not_found: env
                .flag("PASSWORD_RESET_SHOW_EMAIL_NOT_FOUND", true)?,
            password_reset_timeout_secs: env.bounded(
                "PASSWORD_RESET_TIMEOUT_SECS",
                DEFAULT_TOKEN_TIMEOUT_SECS,
                1..=MAX_TOKEN_TIMEOUT_SECS,
            )?,
        };

        let site_defaults = SiteConfig::default();
        let site = SiteConfig {
            domain: env.string("SITE_DOMAIN", &site_defaults.domain),
            name: env.string("SITE_NAME", &site_defaults.name),
            protocol: env.string("SITE_PROTOCOL", &site_defaults.protocol),
        };

        let schema_defaults = SchemaConfig::default();
        let schema = SchemaConfig {
            title: env.string("SCHEMA_TITLE", &schema_defaults.title),
            description: env.string("SCHEMA_DESCRIPTION", &schema_defaults.description),
            version: env.string("SCHEMA_VERSION", &schema_defaults.version),
        };

        let superuser = match (env.optional("SUPERUSER_EMAIL"), env.optional("SUPERUSER_PASSWORD")) {
            (Some(email), Some(password)) => Some(SuperuserConfig {
                email,
                password,
                name: env.string("SUPERUSER_NAME", ""),
            }),
            _ => None,
        };

        Ok(Self {
            host: env.string("HOST", "0.0.0.0"),
            port: env.parse("PORT", 8000)?,
            database_url,
            debug: env.flag("DEBUG", false)?,
            cors_origins: env.list("CORS_ORIGINS", "http://localhost:8000,http://127.0.0.1:3000"),
            request_timeout_secs: env.bounded(
                "REQUEST_TIMEOUT_SECS",
                30,
                1..=MAX_SERVER_TIMEOUT_SECS,
            )?,
            shutdown_timeout_secs: env.bounded(
                "SHUTDOWN_TIMEOUT_SECS",
                30,
                1..=MAX_SERVER_TIMEOUT_SECS,
            )?,
            session_cleanup_interval_secs: env.bounded(
                "SESSION_CLEANUP_INTERVAL_SECS",
                3600,
                1..=MAX_SERVER_TIMEOUT_SECS,
            )?,
            jwt,
            accounts,
            site,
            email: EmailConfig::from_lookup(&lookup)?,
            schema,
            superuser,
        })
    }
}

/// Typed accessors over a string lookup.
struct Env<'a, F> {
    lookup: &'a F,
}

impl<F> Env<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    /// A set, non-blank value.
    fn optional(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.trim().is_empty())
    }

    fn required(&self, name: &'static str) -> Result<String, ConfigError> {
        self.optional(name).ok_or(ConfigError::Missing(name))
    }

    fn string(&self, name: &str, default: &str) -> String {
        self.optional(name).unwrap_or_else(|| default.to_string())
    }

    fn parse<T: FromStr>(&self, name: &'static str, default: T) -> Result<T, ConfigError> {
        match self.optional(name) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { name, value: raw }),
            None => Ok(default),
        }
    }

    /// Like [`Env::parse`], but values outside `range` are rejected too.
    fn bounded<T>(
        &self,
        name: &'static str,
        default: T,
        range: RangeInclusive<T>,
    ) -> Result<T, ConfigError>
    where
        T: FromStr + PartialOrd + ToString,
    {
        let value = self.parse(name, default)?;
        if range.contains(&value) {
            Ok(value)
        } else {
            Err(ConfigError::Invalid {
                name,
                value: value.to_string(),
            })
        }
    }

    fn flag(&self, name: &'static str, default: bool) -> Result<bool, ConfigError> {
        match self.optional(name) {
            Some(raw) => parse_bool(&raw).ok_or(ConfigError::Invalid { name, value: raw }),
            None => Ok(default),
        }
    }

    /// Comma-separated list with blanks dropped.
    fn list(&self, name: &str, default: &str) -> Vec<String> {
        self.string(name, default)
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let mut map: HashMap<String, String> = HashMap::from([
            ("SECRET_KEY".to_string(), "test-secret".to_string()),
            ("DATABASE_URL".to_string(), "postgres://localhost/test".to_string()),
        ]);
        for (k, v) in pairs {
            map.insert(k.to_string(), v.to_string());
        }
        ServerConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_match_project_settings() {
        let config = load(&[]).unwrap();

        assert_eq!(config.port, 8000);
        assert!(!config.debug);
        assert_eq!(
            config.cors_origins,
            vec!["http://localhost:8000", "http://127.0.0.1:3000"]
        );
        assert_eq!(config.jwt.access_token_lifetime_mins, 5);
        assert_eq!(config.jwt.refresh_token_lifetime_days, 1);
        assert!(config.jwt.rotate_refresh_tokens);
        assert!(!config.jwt.update_last_login);
        assert_eq!(config.jwt.auth_header_types, vec!["JWT"]);
        assert_eq!(config.accounts.activation_url, "activate/{uid}/{token}");
        assert!(config.accounts.send_activation_email);
        assert!(config.accounts.password_reset_show_email_not_found);
        assert!(!config.accounts.password_reset_confirm_retype);
        assert_eq!(config.schema.version, "1.0.0");
        assert!(config.superuser.is_none());
    }

    #[test]
    fn missing_secret_is_an_error() {
        let result = ServerConfig::from_lookup(|key| {
            (key == "DATABASE_URL").then(|| "postgres://localhost/test".to_string())
        });
        assert_matches!(result, Err(ConfigError::Missing("SECRET_KEY")));
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = load(&[("PORT", "  "), ("SITE_NAME", "")]).unwrap();
        assert_eq!(config.port, 8000);
        assert_eq!(config.site.name, "Auth API");
    }

    #[test]
    fn overrides_are_parsed() {
        let config = load(&[
            ("PORT", "9000"),
            ("DEBUG", "True"),
            ("JWT_AUTH_HEADER_TYPES", "JWT, Bearer"),
            ("JWT_ROTATE_REFRESH_TOKENS", "false"),
            ("SEND_ACTIVATION_EMAIL", "0"),
            ("ACTIVATION_URL", "/activate/{uid}/{token}"),
            ("SUPERUSER_EMAIL", "root@example.com"),
            ("SUPERUSER_PASSWORD", "a-long-root-password"),
        ])
        .unwrap();

        assert_eq!(config.port, 9000);
        assert!(config.debug);
        assert_eq!(config.jwt.auth_header_types, vec!["JWT", "Bearer"]);
        assert!(!config.jwt.rotate_refresh_tokens);
        assert!(!config.accounts.send_activation_email);
        assert_eq!(config.accounts.activation_url, "/activate/{uid}/{token}");
        let superuser = config.superuser.expect("superuser configured");
        assert_eq!(superuser.email, "root@example.com");
        assert_eq!(superuser.name, "");
    }

    #[test]
    fn invalid_values_name_the_variable() {
        assert_matches!(
            load(&[("PORT", "eighty")]),
            Err(ConfigError::Invalid { name: "PORT", .. })
        );
        assert_matches!(
            load(&[("DEBUG", "maybe")]),
            Err(ConfigError::Invalid { name: "DEBUG", .. })
        );
        assert_matches!(
            load(&[("JWT_AUTH_HEADER_TYPES", " , ")]),
            Err(ConfigError::Invalid { name: "JWT_AUTH_HEADER_TYPES", .. })
        );
    }

    #[test]
    fn durations_must_be_positive_and_bounded() {
        let cases = [
            ("SESSION_CLEANUP_INTERVAL_SECS", "0"),
            ("REQUEST_TIMEOUT_SECS", "0"),
            ("SHUTDOWN_TIMEOUT_SECS", "172800"),
            ("JWT_ACCESS_TOKEN_LIFETIME_MINS", "9223372036854775807"),
            ("JWT_ACCESS_TOKEN_LIFETIME_MINS", "0"),
            ("JWT_REFRESH_TOKEN_LIFETIME_DAYS", "-1"),
            ("JWT_REFRESH_TOKEN_LIFETIME_DAYS", "106751991167"),
            ("PASSWORD_RESET_TIMEOUT_SECS", "-5"),
        ];
        for (key, value) in cases {
            match load(&[(key, value)]) {
                Err(ConfigError::Invalid { name, value: shown }) => {
                    assert_eq!(name, key);
                    assert_eq!(shown, value);
                }
                other => panic!("{key}={value} was accepted: {other:?}"),
            }
        }

        let config = load(&[
            ("JWT_ACCESS_TOKEN_LIFETIME_MINS", "60"),
            ("JWT_REFRESH_TOKEN_LIFETIME_DAYS", "3650"),
            ("SESSION_CLEANUP_INTERVAL_SECS", "1"),
        ])
        .unwrap();
        assert_eq!(config.jwt.access_token_lifetime_mins, 60);
        assert_eq!(config.jwt.refresh_token_lifetime_days, 3650);
        assert_eq!(config.session_cleanup_interval_secs, 1);
    }
}
