//! Notification facade used by the rest of the application.

use std::sync::Arc;
use std::time::Duration;

use tenancy_common::config::{AppConfig, ReadinessFlags};
use tenancy_common::types::{DeliveryOutcome, EmailMessage};

use crate::clients::{
    CloudApiClient, CloudApiConfig, Mailer, SmtpConfig, SmtpMailer, TwilioClient, TwilioConfig,
    WhatsAppClient,
};
use crate::error::Result;
use crate::queue::{DeliveryHandle, EmailQueue};
use crate::whatsapp::WhatsAppDispatcher;

/// Entry point for sending email and WhatsApp notifications.
///
/// Cheap to clone; clones share the email queue.
#[derive(Clone)]
pub struct Notifier {
    email: EmailQueue,
    whatsapp: WhatsAppDispatcher,
}

impl Notifier {
    pub fn new(email: EmailQueue, whatsapp: WhatsAppDispatcher) -> Self {
        Self { email, whatsapp }
    }

    /// Build real channel clients for every channel whose credentials are set.
    ///
    /// Must run inside a Tokio runtime when the email channel is configured.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let email = match SmtpConfig::from_app_config(config) {
            Some(smtp) => {
                let mailer: Arc<dyn Mailer> = Arc::new(SmtpMailer::new(smtp)?);
                EmailQueue::new(mailer, Duration::from_millis(config.email_pacing_ms))
            }
            None => EmailQueue::disabled(),
        };

        let primary = TwilioConfig::from_app_config(config)
            .map(TwilioClient::new)
            .transpose()?
            .map(|client| Arc::new(client) as Arc<dyn WhatsAppClient>);
        let fallback = CloudApiConfig::from_app_config(config)
            .map(CloudApiClient::new)
            .transpose()?
            .map(|client| Arc::new(client) as Arc<dyn WhatsAppClient>);

        let notifier = Self::new(email, WhatsAppDispatcher::new(primary, fallback));
        let readiness = notifier.readiness();
        tracing::info!(
            email = readiness.email,
            whatsapp_primary = readiness.provider_a,
            whatsapp_fallback = readiness.provider_b,
            "Notifier initialized"
        );
        Ok(notifier)
    }

    /// Queue an email. Returns immediately; await the handle for the outcome.
    pub fn send_email(&self, message: EmailMessage) -> DeliveryHandle {
        self.email.enqueue(message)
    }

    /// Send a WhatsApp text through the provider fallback chain.
    pub async fn send_whatsapp(&self, phone: &str, text: &str) -> DeliveryOutcome {
        self.whatsapp.send(phone, text).await
    }

    pub fn readiness(&self) -> ReadinessFlags {
        ReadinessFlags {
            email: self.email.is_enabled(),
            provider_a: self.whatsapp.primary_ready(),
            provider_b: self.whatsapp.fallback_ready(),
        }
    }

    pub fn email_queue(&self) -> &EmailQueue {
        &self.email
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_from_config_matches_readiness() {
        let config = AppConfig {
            smtp_host: Some("smtp.example.com".to_string()),
            smtp_port: 587,
            smtp_user: Some("bot@example.com".to_string()),
            smtp_pass: Some("secret".to_string()),
            email_pacing_ms: 1000,
            whatsapp_token: Some("token".to_string()),
            whatsapp_phone_number_id: Some("1055".to_string()),
            whatsapp_api_base: "https://graph.facebook.com".to_string(),
            whatsapp_api_version: "v18.0".to_string(),
            ..Default::default()
        };

        let notifier = Notifier::from_config(&config).unwrap();
        assert_eq!(notifier.readiness(), config.readiness());
        assert_eq!(notifier.email_queue().pacing(), Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn test_unconfigured_notifier_degrades() {
        let notifier = Notifier::from_config(&AppConfig::default()).unwrap();
        assert_eq!(notifier.readiness(), ReadinessFlags::default());

        let outcome = notifier
            .send_email(EmailMessage::new("tenant@example.com").text("Welcome"))
            .await;
        assert_eq!(outcome, DeliveryOutcome::skipped());

        let outcome = notifier.send_whatsapp("919999999999", "Welcome").await;
        assert!(!outcome.is_sent());
    }
}
