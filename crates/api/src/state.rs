use std::sync::Arc;

use authapi_core::tokens::AccountTokenGenerator;
use authapi_mail::AccountEmails;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: authapi_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Renders and delivers activation / reset / confirmation emails.
    pub emails: AccountEmails,
    /// Signs and checks the `{uid}/{token}` links in account emails.
    pub tokens: Arc<AccountTokenGenerator>,
}

impl AppState {
    pub fn new(pool: authapi_db::DbPool, config: ServerConfig, emails: AccountEmails) -> Self {
        let tokens = AccountTokenGenerator::new(
            config.jwt.secret.clone(),
            config.accounts.password_reset_timeout_secs,
        );
        Self {
            pool,
            config: Arc::new(config),
            emails,
            tokens: Arc::new(tokens),
        }
    }
}
