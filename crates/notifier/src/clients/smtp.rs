//! SMTP relay client built on lettre's async transport.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use uuid::Uuid;

use tenancy_common::config::AppConfig;
use tenancy_common::types::EmailMessage;

use super::Mailer;
use crate::error::{ChannelError, Result};

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Implicit TLS when true, STARTTLS otherwise
    pub secure: bool,
    pub from: String,
    pub timeout: Option<Duration>,
}

impl SmtpConfig {
    /// Extract SMTP settings; `None` when the email channel is not ready.
    pub fn from_app_config(config: &AppConfig) -> Option<Self> {
        Some(Self {
            host: config.smtp_host.clone()?,
            port: config.smtp_port,
            username: config.smtp_user.clone()?,
            password: config.smtp_pass.clone()?,
            secure: config.smtp_secure,
            from: config.sender_address()?.to_string(),
            timeout: config.smtp_timeout_secs.map(Duration::from_secs),
        })
    }
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Build the transport. Must run inside a Tokio runtime: the connection
    /// pool spawns its housekeeping task on creation.
    pub fn new(config: SmtpConfig) -> Result<Self> {
        let builder = if config.secure {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
        }
        .map_err(|e| {
            ChannelError::configuration(format!("invalid SMTP relay {}: {e}", config.host))
        })?;

        let mut builder = builder
            .port(config.port)
            .credentials(Credentials::new(config.username, config.password));
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(Some(timeout));
        }

        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e| ChannelError::invalid_address(format!("sender {}: {e}", config.from)))?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    fn message_id(&self) -> String {
        format!("<{}@{}>", Uuid::new_v4(), self.from.email.domain())
    }

    /// Assemble the MIME message: text/HTML alternatives plus attachments.
    fn build_message(&self, email: &EmailMessage, message_id: &str) -> Result<Message> {
        let to: Mailbox = email
            .to
            .trim()
            .parse()
            .map_err(|e| ChannelError::invalid_address(format!("recipient {}: {e}", email.to)))?;

        let content = match (&email.html, &email.text) {
            (Some(html), Some(text)) => {
                MultiPart::alternative_plain_html(text.clone(), html.clone())
            }
            (Some(html), None) => {
                MultiPart::alternative().singlepart(SinglePart::html(html.clone()))
            }
            (None, text) => MultiPart::alternative()
                .singlepart(SinglePart::plain(text.clone().unwrap_or_default())),
        };

        let mut body = MultiPart::mixed().multipart(content);
        for attachment in &email.attachments {
            let content_type = ContentType::parse(&attachment.content_type).map_err(|e| {
                ChannelError::build(format!(
                    "attachment {} has invalid content type {}: {e}",
                    attachment.filename, attachment.content_type
                ))
            })?;
            body = body.singlepart(
                Attachment::new(attachment.filename.clone())
                    .body(attachment.content.clone(), content_type),
            );
        }

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject.clone())
            .message_id(Some(message_id.to_string()))
            .multipart(body)
            .map_err(|e| ChannelError::build(e.to_string()))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &EmailMessage) -> Result<String> {
        let message_id = self.message_id();
        let message = self.build_message(email, &message_id)?;

        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| ChannelError::smtp(e.to_string()))?;

        tracing::debug!(
            message_id = %message_id,
            code = %response.code(),
            "SMTP relay accepted message"
        );
        Ok(message_id)
    }
}
