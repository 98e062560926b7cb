//! The four account emails and their templates.
//!
//! Every kind has three templates under `account/email/`: the HTML body
//! (`{kind}.html`), a plain-text body (`{kind}.txt`), and a one-line subject
//! (`{kind}_subject.txt`). Templates are compiled into the binary.

use serde::Serialize;
use tera::Tera;

use crate::EmailError;

/// Which account email to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmailKind {
    /// Sent after registration; carries the activation link.
    Activation,
    /// Sent once the account has been activated.
    Confirmation,
    /// Carries the password reset link.
    PasswordReset,
    /// Sent after the password was changed or reset.
    PasswordChangedConfirmation,
}

impl EmailKind {
    pub const ALL: [EmailKind; 4] = [
        EmailKind::Activation,
        EmailKind::Confirmation,
        EmailKind::PasswordReset,
        EmailKind::PasswordChangedConfirmation,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EmailKind::Activation => "activation",
            EmailKind::Confirmation => "confirmation",
            EmailKind::PasswordReset => "password_reset",
            EmailKind::PasswordChangedConfirmation => "password_changed_confirmation",
        }
    }

    /// Path of the HTML body template.
    pub fn template_name(self) -> String {
        format!("account/email/{}.html", self.as_str())
    }

    fn text_template_name(self) -> String {
        format!("account/email/{}.txt", self.as_str())
    }

    fn subject_template_name(self) -> String {
        format!("account/email/{}_subject.txt", self.as_str())
    }
}

/// Variables available to every account email template.
#[derive(Debug, Clone, Serialize)]
pub struct EmailContext {
    pub email: String,
    pub name: String,
    pub domain: String,
    pub site_name: String,
    pub protocol: String,
    pub uid: Option<String>,
    pub token: Option<String>,
    /// Path of the frontend page, with `{uid}` / `{token}` filled in and no leading slash.
    pub url: Option<String>,
}

impl EmailContext {
    pub fn new(
        email: impl Into<String>,
        name: impl Into<String>,
        domain: impl Into<String>,
        site_name: impl Into<String>,
        protocol: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
            domain: domain.into(),
            site_name: site_name.into(),
            protocol: protocol.into(),
            uid: None,
            token: None,
            url: None,
        }
    }

    /// Attach a `uid`/`token` pair and fill them into `url_pattern`.
    pub fn with_link(mut self, uid: &str, token: &str, url_pattern: &str) -> Self {
        let url = url_pattern
            .replace("{uid}", uid)
            .replace("{token}", token)
            .trim_start_matches('/')
            .to_string();
        self.uid = Some(uid.to_string());
        self.token = Some(token.to_string());
        self.url = Some(url);
        self
    }
}

/// A fully rendered email, ready to hand to a mailer.
#[derive(Debug, Clone)]
pub struct RenderedEmail {
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

/// Tera-backed renderer holding every account template.
pub struct EmailRenderer {
    tera: Tera,
}

macro_rules! template {
    ($path:literal) => {
        ($path, include_str!(concat!("../templates/", $path)))
    };
}

const TEMPLATES: &[(&str, &str)] = &[
    template!("account/email/base.html"),
    template!("account/email/activation.html"),
    template!("account/email/activation.txt"),
    template!("account/email/activation_subject.txt"),
    template!("account/email/confirmation.html"),
    template!("account/email/confirmation.txt"),
    template!("account/email/confirmation_subject.txt"),
    template!("account/email/password_reset.html"),
    template!("account/email/password_reset.txt"),
    template!("account/email/password_reset_subject.txt"),
    template!("account/email/password_changed_confirmation.html"),
    template!("account/email/password_changed_confirmation.txt"),
    template!("account/email/password_changed_confirmation_subject.txt"),
];

impl EmailRenderer {
    /// Compile the built-in templates.
    pub fn new() -> Result<Self, EmailError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(TEMPLATES.iter().copied())?;
        Ok(Self { tera })
    }

    pub fn render(&self, kind: EmailKind, context: &EmailContext) -> Result<RenderedEmail, EmailError> {
        let ctx = tera::Context::from_serialize(context)?;

        // Subjects must be a single line.
        let subject = self
            .tera
            .render(&kind.subject_template_name(), &ctx)?
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        Ok(RenderedEmail {
            subject,
            text_body: self.tera.render(&kind.text_template_name(), &ctx)?,
            html_body: self.tera.render(&kind.template_name(), &ctx)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> EmailContext {
        EmailContext::new("jane@example.com", "Jane <Doe>", "example.com", "Example", "https")
    }

    #[test]
    fn template_paths_follow_account_layout() {
        assert_eq!(
            EmailKind::Activation.template_name(),
            "account/email/activation.html"
        );
        assert_eq!(
            EmailKind::PasswordChangedConfirmation.template_name(),
            "account/email/password_changed_confirmation.html"
        );
    }

    #[test]
    fn with_link_fills_pattern_and_strips_leading_slash() {
        let ctx = context().with_link("MQ", "abc-123", "/activate/{uid}/{token}");
        assert_eq!(ctx.url.as_deref(), Some("activate/MQ/abc-123"));
        assert_eq!(ctx.uid.as_deref(), Some("MQ"));
    }

    #[test]
    fn every_kind_renders() {
        let renderer = EmailRenderer::new().unwrap();
        let ctx = context().with_link("MQ", "abc-123", "password-reset/{uid}/{token}");
        for kind in EmailKind::ALL {
            let rendered = renderer.render(kind, &ctx).unwrap();
            assert!(!rendered.subject.is_empty(), "{kind:?} subject");
            assert!(!rendered.subject.contains('\n'), "{kind:?} subject is one line");
            assert!(rendered.html_body.contains("<html"), "{kind:?} html");
            assert!(!rendered.text_body.is_empty(), "{kind:?} text");
        }
    }

    #[test]
    fn reset_email_contains_link() {
        let renderer = EmailRenderer::new().unwrap();
        let ctx = context().with_link("MQ", "abc-123", "password-reset/{uid}/{token}");
        let rendered = renderer.render(EmailKind::PasswordReset, &ctx).unwrap();
        assert!(rendered
            .text_body
            .contains("https://example.com/password-reset/MQ/abc-123"));
        assert!(rendered.subject.contains("Example"));
    }

    #[test]
    fn html_body_escapes_user_input() {
        let renderer = EmailRenderer::new().unwrap();
        let rendered = renderer.render(EmailKind::Confirmation, &context()).unwrap();
        assert!(rendered.html_body.contains("Jane &lt;Doe&gt;"));
        assert!(!rendered.html_body.contains("Jane <Doe>"));
    }
}
