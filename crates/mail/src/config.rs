//! Email delivery configuration.

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Default sender address when `DEFAULT_FROM_EMAIL` is not set.
const DEFAULT_FROM_ADDRESS: &str = "webmaster@localhost";

/// Where outgoing mail goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailBackend {
    /// Deliver through an SMTP relay.
    Smtp,
    /// Write the message to the log instead of sending it.
    Console,
    /// Keep messages in memory (tests).
    Memory,
}

impl EmailBackend {
    /// Parse a backend name. Accepts short names and dotted paths ending in
    /// the backend name, e.g. `smtp` or `mail.backends.smtp.EmailBackend`.
    pub fn parse(value: &str) -> Option<Self> {
        let lower = value.trim().to_lowercase();
        let matches = |name: &str| {
            lower == name || lower.split('.').any(|segment| segment == name)
        };
        if matches("smtp") {
            Some(Self::Smtp)
        } else if matches("console") {
            Some(Self::Console)
        } else if matches("memory") || matches("locmem") {
            Some(Self::Memory)
        } else {
            None
        }
    }
}

/// Configuration for account email delivery.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub backend: EmailBackend,
    /// SMTP server hostname.
    pub smtp_host: String,
    /// SMTP server port (defaults to 587).
    pub smtp_port: u16,
    /// Optional SMTP username.
    pub smtp_user: Option<String>,
    /// Optional SMTP password.
    pub smtp_password: Option<String>,
    /// Use STARTTLS when talking to the relay.
    pub use_tls: bool,
    /// RFC 5322 "From" address.
    pub from_address: String,
}

/// Raised when an email setting is present but unusable.
#[derive(Debug, thiserror::Error)]
pub enum EmailConfigError {
    #[error("Unknown EMAIL_BACKEND '{0}' (expected smtp, console, or memory)")]
    UnknownBackend(String),

    #[error("EMAIL_HOST must be set when EMAIL_BACKEND is smtp")]
    MissingHost,

    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

impl EmailConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, EmailConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// | Variable              | Required        | Default               |
    /// |-----------------------|-----------------|-----------------------|
    /// | `EMAIL_BACKEND`       | no              | `console`             |
    /// | `EMAIL_HOST`          | for `smtp`      | --                    |
    /// | `EMAIL_PORT`          | no              | `587`                 |
    /// | `EMAIL_HOST_USER`     | no              | --                    |
    /// | `EMAIL_HOST_PASSWORD` | no              | --                    |
    /// | `EMAIL_USE_TLS`       | no              | `true`                |
    /// | `DEFAULT_FROM_EMAIL`  | no              | `webmaster@localhost` |
    pub fn from_lookup<F>(lookup: F) -> Result<Self, EmailConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = match lookup("EMAIL_BACKEND") {
            Some(raw) => {
                EmailBackend::parse(&raw).ok_or(EmailConfigError::UnknownBackend(raw))?
            }
            None => EmailBackend::Console,
        };

        let smtp_host = lookup("EMAIL_HOST").unwrap_or_default();
        if backend == EmailBackend::Smtp && smtp_host.is_empty() {
            return Err(EmailConfigError::MissingHost);
        }

        let smtp_port = match lookup("EMAIL_PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| EmailConfigError::Invalid {
                name: "EMAIL_PORT",
                value: raw,
            })?,
            None => DEFAULT_SMTP_PORT,
        };

        let use_tls = match lookup("EMAIL_USE_TLS") {
            Some(raw) => parse_bool(&raw).ok_or(EmailConfigError::Invalid {
                name: "EMAIL_USE_TLS",
                value: raw,
            })?,
            None => true,
        };

        Ok(Self {
            backend,
            smtp_host,
            smtp_port,
            smtp_user: lookup("EMAIL_HOST_USER").filter(|s| !s.is_empty()),
            smtp_password: lookup("EMAIL_HOST_PASSWORD").filter(|s| !s.is_empty()),
            use_tls,
            from_address: lookup("DEFAULT_FROM_EMAIL")
                .unwrap_or_else(|| DEFAULT_FROM_ADDRESS.to_string()),
        })
    }

    /// An in-memory configuration for tests.
    pub fn memory() -> Self {
        Self {
            backend: EmailBackend::Memory,
            smtp_host: String::new(),
            smtp_port: DEFAULT_SMTP_PORT,
            smtp_user: None,
            smtp_password: None,
            use_tls: false,
            from_address: DEFAULT_FROM_ADDRESS.to_string(),
        }
    }
}

/// Parse the usual spellings of a boolean setting.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_to_console_backend() {
        let config = EmailConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.backend, EmailBackend::Console);
        assert_eq!(config.smtp_port, 587);
        assert_eq!(config.from_address, "webmaster@localhost");
        assert!(config.use_tls);
    }

    #[test]
    fn smtp_backend_reads_all_settings() {
        let config = EmailConfig::from_lookup(lookup(&[
            ("EMAIL_BACKEND", "django.core.mail.backends.smtp.EmailBackend"),
            ("EMAIL_HOST", "smtp.example.com"),
            ("EMAIL_PORT", "2525"),
            ("EMAIL_HOST_USER", "mailer"),
            ("EMAIL_HOST_PASSWORD", "s3cret"),
            ("EMAIL_USE_TLS", "False"),
            ("DEFAULT_FROM_EMAIL", "noreply@example.com"),
        ]))
        .unwrap();

        assert_eq!(config.backend, EmailBackend::Smtp);
        assert_eq!(config.smtp_host, "smtp.example.com");
        assert_eq!(config.smtp_port, 2525);
        assert_eq!(config.smtp_user.as_deref(), Some("mailer"));
        assert_eq!(config.smtp_password.as_deref(), Some("s3cret"));
        assert!(!config.use_tls);
        assert_eq!(config.from_address, "noreply@example.com");
    }

    #[test]
    fn smtp_without_host_is_rejected() {
        let result = EmailConfig::from_lookup(lookup(&[("EMAIL_BACKEND", "smtp")]));
        assert_matches!(result, Err(EmailConfigError::MissingHost));
    }

    #[test]
    fn invalid_values_are_reported() {
        assert_matches!(
            EmailConfig::from_lookup(lookup(&[("EMAIL_BACKEND", "pigeon")])),
            Err(EmailConfigError::UnknownBackend(_))
        );
        assert_matches!(
            EmailConfig::from_lookup(lookup(&[("EMAIL_PORT", "not-a-port")])),
            Err(EmailConfigError::Invalid { name: "EMAIL_PORT", .. })
        );
    }

    #[test]
    fn backend_aliases() {
        assert_eq!(EmailBackend::parse("locmem"), Some(EmailBackend::Memory));
        assert_eq!(EmailBackend::parse(" Console "), Some(EmailBackend::Console));
        assert_eq!(EmailBackend::parse("smtps"), None);
    }
}
