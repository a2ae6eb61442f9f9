//! Outbound mail.
//!
//! Services depend on [`MailSender`] only. The server wires either the SMTP
//! transport or, when no relay is configured, a sender that just logs.

use std::sync::Arc;

use async_trait::async_trait;
use keyward_common::config::MailConfig;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use thiserror::Error;

/// Mail delivery failure.
#[derive(Debug, Error)]
pub enum MailError {
    /// Sender or recipient address could not be parsed.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// The message could not be assembled.
    #[error("failed to build message: {0}")]
    Build(String),

    /// The relay rejected the message or could not be reached.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Sends an HTML mail. No delivery receipt.
#[async_trait]
pub trait MailSender: Send + Sync {
    /// Hand one message to the transport.
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), MailError>;
}

/// Shared mail sender handle.
pub type SharedMailSender = Arc<dyn MailSender>;

/// SMTP relay via lettre.
#[derive(Clone)]
pub struct SmtpMailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailSender {
    /// Build a sender from configuration.
    pub fn from_config(config: &MailConfig) -> Result<Self, MailError> {
        let builder = if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
        }
        .map_err(|e| MailError::Transport(e.to_string()))?;

        let mut builder = builder.port(config.smtp_port);
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        let address = config
            .from_address
            .parse()
            .map_err(|e: lettre::address::AddressError| MailError::InvalidAddress(e.to_string()))?;

        Ok(Self {
            transport: builder.build(),
            from: Mailbox::new(Some(config.from_name.clone()), address),
        })
    }
}

#[async_trait]
impl MailSender for SmtpMailSender {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), MailError> {
        let to: Mailbox = to
            .parse()
            .map_err(|e: lettre::address::AddressError| MailError::InvalidAddress(e.to_string()))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body.to_string())
            .map_err(|e| MailError::Build(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        Ok(())
    }
}

/// Sender used when no relay is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailSender;

#[async_trait]
impl MailSender for LogMailSender {
    async fn send(&self, to: &str, subject: &str, _html_body: &str) -> Result<(), MailError> {
        tracing::info!(to = %to, subject = %subject, "Mail relay not configured, message dropped");
        Ok(())
    }
}
