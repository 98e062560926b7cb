//! Account emails: configuration, template rendering, and delivery backends.
//!
//! - [`config`] -- `EMAIL_*` environment settings and backend selection.
//! - [`templates`] -- the four account email kinds and their tera templates.
//! - [`backend`] -- the [`Mailer`](backend::Mailer) trait with SMTP, console,
//!   and in-memory implementations.
//! - [`AccountEmails`] -- renders a template and hands it to a mailer.

pub mod backend;
pub mod config;
pub mod templates;

use std::sync::Arc;

use backend::{Mailer, OutgoingEmail};
use templates::{EmailContext, EmailKind, EmailRenderer};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for email rendering and delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// A template failed to parse or render.
    #[error("Email template error: {0}")]
    Template(#[from] tera::Error),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),
}

// ---------------------------------------------------------------------------
// AccountEmails
// ---------------------------------------------------------------------------

/// Renders account emails and sends them through the configured [`Mailer`].
#[derive(Clone)]
pub struct AccountEmails {
    renderer: Arc<EmailRenderer>,
    mailer: Arc<dyn Mailer>,
    from_address: String,
}

impl AccountEmails {
    pub fn new(renderer: EmailRenderer, mailer: Arc<dyn Mailer>, from_address: String) -> Self {
        Self {
            renderer: Arc::new(renderer),
            mailer,
            from_address,
        }
    }

    /// Render `kind` with `context` and deliver it to `to`.
    pub async fn send(
        &self,
        kind: EmailKind,
        to: &str,
        context: &EmailContext,
    ) -> Result<(), EmailError> {
        let rendered = self.renderer.render(kind, context)?;
        let email = OutgoingEmail {
            kind,
            from: self.from_address.clone(),
            to: to.to_string(),
            subject: rendered.subject,
            text_body: rendered.text_body,
            html_body: rendered.html_body,
        };
        self.mailer.send(&email).await?;
        tracing::info!(to, kind = kind.as_str(), "Account email sent");
        Ok(())
    }
}
