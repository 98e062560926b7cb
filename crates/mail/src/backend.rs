//! Mail delivery backends.
//!
//! [`SmtpMailer`] wraps the `lettre` async SMTP transport. [`ConsoleMailer`]
//! writes messages to the log, useful during local development.
//! [`MemoryMailer`] keeps an outbox that tests can inspect.

use std::sync::Arc;

use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tokio::sync::Mutex;

use crate::config::{EmailBackend, EmailConfig};
use crate::templates::EmailKind;
use crate::EmailError;

/// A rendered message addressed to a single recipient.
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub kind: EmailKind,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

impl OutgoingEmail {
    /// Build a multipart/alternative MIME message (plain text + HTML).
    pub fn to_message(&self) -> Result<Message, EmailError> {
        let from: Mailbox = self.from.parse()?;
        let to: Mailbox = self.to.parse()?;
        Message::builder()
            .from(from)
            .to(to)
            .subject(self.subject.clone())
            .multipart(MultiPart::alternative_plain_html(
                self.text_body.clone(),
                self.html_body.clone(),
            ))
            .map_err(|e| EmailError::Build(e.to_string()))
    }
}

/// Delivers [`OutgoingEmail`]s.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError>;
}

// ---------------------------------------------------------------------------
// SMTP
// ---------------------------------------------------------------------------

/// Sends mail through an SMTP relay.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: &EmailConfig) -> Result<Self, EmailError> {
        let builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
        };
        let mut builder = builder.port(config.smtp_port);

        if let (Some(user), Some(pass)) = (&config.smtp_user, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError> {
        let message = email.to_message()?;
        self.transport.send(message).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Console
// ---------------------------------------------------------------------------

/// Logs each message instead of delivering it.
#[derive(Debug, Default)]
pub struct ConsoleMailer;

#[async_trait]
impl Mailer for ConsoleMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError> {
        // Still build the MIME message so address errors surface in development.
        email.to_message()?;
        tracing::info!(
            from = %email.from,
            to = %email.to,
            subject = %email.subject,
            kind = email.kind.as_str(),
            "\n{}",
            email.text_body
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Memory
// ---------------------------------------------------------------------------

/// Collects messages in an in-memory outbox.
#[derive(Debug, Default)]
pub struct MemoryMailer {
    outbox: Mutex<Vec<OutgoingEmail>>,
}

impl MemoryMailer {
    /// Snapshot of every message sent so far.
    pub async fn outbox(&self) -> Vec<OutgoingEmail> {
        self.outbox.lock().await.clone()
    }

    /// Remove and return every message sent so far.
    pub async fn drain(&self) -> Vec<OutgoingEmail> {
        std::mem::take(&mut *self.outbox.lock().await)
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError> {
        email.to_message()?;
        self.outbox.lock().await.push(email.clone());
        Ok(())
    }
}

/// Construct the mailer selected by `config.backend`.
pub fn build_mailer(config: &EmailConfig) -> Result<Arc<dyn Mailer>, EmailError> {
    let mailer: Arc<dyn Mailer> = match config.backend {
        EmailBackend::Smtp => Arc::new(SmtpMailer::new(config)?),
        EmailBackend::Console => Arc::new(ConsoleMailer),
        EmailBackend::Memory => Arc::new(MemoryMailer::default()),
    };
    Ok(mailer)
}
