//! Email notification delivery via SMTP.
//!
//! [`EmailDelivery`] wraps the `lettre` async SMTP transport to send the
//! plain-text assignment e-mails produced by the lifecycle service.
//! Configuration is loaded from environment variables; if `SMTP_HOST` is not
//! set, [`EmailConfig::from_env`] returns `None` and no mailer is built.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use taskboard_core::error::CoreError;
use taskboard_core::store::{EmailMessage, Mailer};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for email delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),
}

impl From<EmailError> for CoreError {
    fn from(err: EmailError) -> Self {
        CoreError::Upstream(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Default sender address when `SMTP_FROM` is not set.
const DEFAULT_FROM_ADDRESS: &str = "noreply@taskboard.local";

/// Configuration for the SMTP email delivery service.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// SMTP server hostname.
    pub smtp_host: String,
    /// SMTP server port (defaults to 587).
    pub smtp_port: u16,
    /// RFC 5322 "From" address.
    pub from_address: String,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
}

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `SMTP_HOST` is not set, signalling that assignment
    /// e-mails are disabled.
    ///
    /// | Variable        | Required | Default                    |
    /// |-----------------|----------|----------------------------|
    /// | `SMTP_HOST`     | yes      | none                       |
    /// | `SMTP_PORT`     | no       | `587`                      |
    /// | `SMTP_FROM`     | no       | `noreply@taskboard.local`  |
    /// | `SMTP_USER`     | no       | none                       |
    /// | `SMTP_PASSWORD` | no       | none                       |
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST").ok()?;
        Some(Self {
            smtp_host,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string()),
            smtp_user: std::env::var("SMTP_USER").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
        })
    }
}

// ---------------------------------------------------------------------------
// EmailDelivery
// ---------------------------------------------------------------------------

/// Assemble a plain-text MIME message from `from` to `message.to`.
pub fn build_message(from: &str, message: &EmailMessage) -> Result<Message, EmailError> {
    Message::builder()
        .from(from.parse()?)
        .to(message.to.parse()?)
        .subject(message.subject.clone())
        .header(ContentType::TEXT_PLAIN)
        .body(message.body.clone())
        .map_err(|e| EmailError::Build(e.to_string()))
}

/// Sends e-mails over a pooled STARTTLS SMTP connection.
pub struct EmailDelivery {
    from_address: String,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl EmailDelivery {
    /// Build the SMTP transport. No connection is opened until the first send.
    pub fn new(config: EmailConfig) -> Result<Self, EmailError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port);

        if let (Some(user), Some(pass)) = (config.smtp_user, config.smtp_password) {
            builder = builder.credentials(Credentials::new(user, pass));
        }

        Ok(Self {
            from_address: config.from_address,
            transport: builder.build(),
        })
    }

    /// Send one message.
    pub async fn deliver(&self, message: &EmailMessage) -> Result<(), EmailError> {
        let email = build_message(&self.from_address, message)?;
        self.transport.send(email).await?;

        tracing::info!(to = %message.to, subject = %message.subject, "Notification email sent");
        Ok(())
    }
}

#[async_trait]
impl Mailer for EmailDelivery {
    async fn send(&self, message: EmailMessage) -> Result<(), CoreError> {
        self.deliver(&message).await.map_err(CoreError::from)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn message(to: &str) -> EmailMessage {
        EmailMessage {
            to: to.to_string(),
            subject: "New task assigned: Inspect the roof".to_string(),
            body: "Hi Ravi,\n\nUma assigned you a new task.\n".to_string(),
        }
    }

    #[test]
    fn builds_plain_text_message() {
        let email = build_message(DEFAULT_FROM_ADDRESS, &message("ravi@example.com")).unwrap();
        let raw = String::from_utf8(email.formatted()).unwrap();
        assert!(raw.contains("To: ravi@example.com"));
        assert!(raw.contains("Subject: New task assigned: Inspect the roof"));
        assert!(raw.contains("Content-Type: text/plain"));
    }

    #[test]
    fn rejects_unparseable_recipient() {
        let err = build_message(DEFAULT_FROM_ADDRESS, &message("not-an-email")).unwrap_err();
        assert_matches!(err, EmailError::Address(_));
        assert!(err.to_string().contains("Email address parse error"));
    }

    #[test]
    fn delivery_errors_surface_as_upstream() {
        let err: CoreError = EmailError::Build("missing body".to_string()).into();
        assert_matches!(err, CoreError::Upstream(msg) if msg == "Email build error: missing body");
    }
}
