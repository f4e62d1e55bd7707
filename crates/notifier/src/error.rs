//! Error types for channel client operations.
//!
//! Every failure a channel client can report is one of these variants. The
//! dispatcher never propagates them as faults: they are converted into a
//! `DeliveryOutcome::Failed` carrying the rendered message.

use thiserror::Error;

use tenancy_common::error::AppError;

/// Maximum number of response body bytes kept in a provider error.
const MAX_BODY_LEN: usize = 512;

/// Result type alias for channel operations.
pub type Result<T> = std::result::Result<T, ChannelError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// Client could not be constructed from its settings.
    #[error("invalid channel configuration: {message}")]
    Configuration { message: String },

    /// Recipient or sender address could not be parsed.
    #[error("invalid address: {message}")]
    InvalidAddress { message: String },

    /// Outgoing message could not be assembled.
    #[error("failed to build message: {message}")]
    Build { message: String },

    /// Connection-level failure talking to the provider.
    #[error("network connection failed: {message}")]
    Network { message: String },

    /// The client's own timeout elapsed.
    #[error("request timed out")]
    Timeout,

    /// Provider answered with a non-success HTTP status.
    #[error("provider rejected request: HTTP {status_code}: {body}")]
    Provider { status_code: u16, body: String },

    /// SMTP relay refused the message or the session failed.
    #[error("SMTP error: {message}")]
    Smtp { message: String },

    /// Provider answered 2xx but the body was not understood.
    #[error("unexpected provider response: {message}")]
    UnexpectedResponse { message: String },
}

impl ChannelError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn invalid_address(message: impl Into<String>) -> Self {
        Self::InvalidAddress {
            message: message.into(),
        }
    }

    pub fn build(message: impl Into<String>) -> Self {
        Self::Build {
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn smtp(message: impl Into<String>) -> Self {
        Self::Smtp {
            message: message.into(),
        }
    }

    pub fn unexpected_response(message: impl Into<String>) -> Self {
        Self::UnexpectedResponse {
            message: message.into(),
        }
    }

    /// Provider error with the response body cut down to a loggable size.
    pub fn provider(status_code: u16, body: impl Into<String>) -> Self {
        let mut body = body.into();
        if body.len() > MAX_BODY_LEN {
            let mut cut = MAX_BODY_LEN;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }
        Self::Provider { status_code, body }
    }

    /// Classify a transport error from the HTTP client.
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::network(format!("connection failed: {err}"))
        } else {
            Self::network(err.to_string())
        }
    }
}

impl From<ChannelError> for AppError {
    fn from(err: ChannelError) -> Self {
        match err {
            ChannelError::Configuration { .. } => AppError::Config(err.to_string()),
            ChannelError::InvalidAddress { .. } => AppError::Validation(err.to_string()),
            _ => AppError::Delivery(err.to_string()),
        }
    }
}
