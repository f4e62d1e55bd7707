//! Channel clients for the external delivery services.
//!
//! Each client wraps one provider and exposes a single "deliver one message"
//! operation. The dispatcher only sees the traits below, so tests swap in
//! fakes and production wires the real clients through [`crate::Notifier`].

pub mod cloud_api;
pub mod smtp;
pub mod twilio;

use std::time::Duration;

use async_trait::async_trait;

use tenancy_common::types::{EmailMessage, Provider};

use crate::error::{ChannelError, Result};

pub use cloud_api::{CloudApiClient, CloudApiConfig};
pub use smtp::{SmtpConfig, SmtpMailer};
pub use twilio::{TwilioClient, TwilioConfig};

/// Delivers a single email and returns the provider message id.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<String>;
}

/// Delivers a single WhatsApp text message.
#[async_trait]
pub trait WhatsAppClient: Send + Sync {
    /// Which provider this client talks to.
    fn provider(&self) -> Provider;

    /// Send `body` to `to`, already normalized for this provider.
    ///
    /// Returns the provider-assigned message id.
    async fn send(&self, to: &str, body: &str) -> Result<String>;
}

/// Build the shared HTTP client for a WhatsApp provider.
///
/// Without a timeout, reqwest's own default applies.
pub(crate) fn http_client(timeout: Option<Duration>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .user_agent(concat!("tenancy-notifier/", env!("CARGO_PKG_VERSION")));
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| ChannelError::configuration(format!("failed to build HTTP client: {e}")))
}

/// Turn a non-2xx response into a provider error.
pub(crate) async fn reject(response: reqwest::Response) -> ChannelError {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string());
    ChannelError::provider(status, body)
}
