use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Subject used when the caller does not supply one.
pub const DEFAULT_SUBJECT: &str = "Notification";

/// Failure reason for a request without a recipient.
pub const MISSING_RECIPIENT: &str = "missing recipient";

/// Failure reason when no WhatsApp provider is configured.
pub const NO_PROVIDER_CONFIGURED: &str = "no provider configured";

/// The external service that accepted a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    /// SMTP relay
    Smtp,
    /// WhatsApp provider A
    Twilio,
    /// WhatsApp provider B
    MetaCloud,
    /// Email channel disabled; the message was skipped
    Noop,
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::Smtp => write!(f, "smtp"),
            Provider::Twilio => write!(f, "twilio"),
            Provider::MetaCloud => write!(f, "meta_cloud"),
            Provider::Noop => write!(f, "noop"),
        }
    }
}

/// Terminal result of a single delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Sent {
        provider: Provider,
        message_id: String,
    },
    Failed {
        reason: String,
    },
}

impl DeliveryOutcome {
    pub fn sent(provider: Provider, message_id: impl Into<String>) -> Self {
        Self::Sent {
            provider,
            message_id: message_id.into(),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    /// Outcome for an email skipped because the channel is not configured.
    pub fn skipped() -> Self {
        Self::sent(Provider::Noop, "")
    }

    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent { .. })
    }

    pub fn provider(&self) -> Option<Provider> {
        match self {
            Self::Sent { provider, .. } => Some(*provider),
            Self::Failed { .. } => None,
        }
    }

    /// Convert into a `Result` for callers that treat a failed delivery as fatal.
    pub fn into_result(self) -> Result<(Provider, String), AppError> {
        match self {
            Self::Sent {
                provider,
                message_id,
            } => Ok((provider, message_id)),
            Self::Failed { reason } if reason == NO_PROVIDER_CONFIGURED => {
                Err(AppError::Unavailable(reason))
            }
            Self::Failed { reason } if reason == MISSING_RECIPIENT => {
                Err(AppError::Validation(reason))
            }
            Self::Failed { reason } => Err(AppError::Delivery(reason)),
        }
    }
}

/// A file attached to an outgoing email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    /// MIME type, e.g. `application/pdf`
    pub content_type: String,
    pub content: Vec<u8>,
}

/// An email ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: Option<String>,
    pub text: Option<String>,
    pub attachments: Vec<Attachment>,
}

impl EmailMessage {
    pub fn new(to: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: DEFAULT_SUBJECT.to_string(),
            html: None,
            text: None,
            attachments: Vec::new(),
        }
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Whether the message names a non-blank recipient.
    pub fn has_recipient(&self) -> bool {
        !self.to.trim().is_empty()
    }
}
