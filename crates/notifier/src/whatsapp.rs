//! Ordered-fallback WhatsApp dispatch.
//!
//! The primary provider is tried first when configured. Its failure is logged
//! and swallowed so the fallback provider gets a chance; the fallback's
//! failure is terminal and reported to the caller. No queueing or pacing
//! applies to this channel.

use std::sync::Arc;

use tenancy_common::types::{DeliveryOutcome, MISSING_RECIPIENT, NO_PROVIDER_CONFIGURED};

use crate::clients::WhatsAppClient;
use crate::phone;

#[derive(Clone, Default)]
pub struct WhatsAppDispatcher {
    primary: Option<Arc<dyn WhatsAppClient>>,
    fallback: Option<Arc<dyn WhatsAppClient>>,
}

impl WhatsAppDispatcher {
    /// A provider passed as `None` is treated as not configured.
    pub fn new(
        primary: Option<Arc<dyn WhatsAppClient>>,
        fallback: Option<Arc<dyn WhatsAppClient>>,
    ) -> Self {
        Self { primary, fallback }
    }

    pub fn primary_ready(&self) -> bool {
        self.primary.is_some()
    }

    pub fn fallback_ready(&self) -> bool {
        self.fallback.is_some()
    }

    pub async fn send(&self, phone: &str, text: &str) -> DeliveryOutcome {
        if phone::digits(phone).is_empty() {
            return DeliveryOutcome::failed(MISSING_RECIPIENT);
        }

        let mut primary_failure = None;

        if let Some(client) = &self.primary {
            match attempt(client.as_ref(), phone, text).await {
                Ok(outcome) => return outcome,
                Err(reason) => {
                    tracing::warn!(
                        provider = %client.provider(),
                        reason = %reason,
                        fallback_ready = self.fallback.is_some(),
                        "Primary WhatsApp provider failed"
                    );
                    primary_failure = Some(reason);
                }
            }
        }

        if let Some(client) = &self.fallback {
            return match attempt(client.as_ref(), phone, text).await {
                Ok(outcome) => outcome,
                Err(reason) => {
                    tracing::error!(
                        provider = %client.provider(),
                        reason = %reason,
                        "Fallback WhatsApp provider failed"
                    );
                    DeliveryOutcome::failed(reason)
                }
            };
        }

        match primary_failure {
            Some(reason) => DeliveryOutcome::failed(reason),
            None => {
                tracing::warn!("No WhatsApp provider configured, message not sent");
                DeliveryOutcome::failed(NO_PROVIDER_CONFIGURED)
            }
        }
    }
}

/// One provider attempt; the error side is the composed failure reason.
async fn attempt(
    client: &dyn WhatsAppClient,
    phone: &str,
    text: &str,
) -> Result<DeliveryOutcome, String> {
    let provider = client.provider();
    let to = phone::for_provider(provider, phone);

    match client.send(&to, text).await {
        Ok(message_id) => {
            tracing::info!(
                provider = %provider,
                message_id = %message_id,
                "WhatsApp message sent"
            );
            Ok(DeliveryOutcome::sent(provider, message_id))
        }
        Err(e) => Err(format!("{provider}: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ChannelError, Result};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tenancy_common::types::Provider;

    struct FakeClient {
        provider: Provider,
        fail: bool,
        calls: Mutex<Vec<String>>,
    }

    impl FakeClient {
        fn new(provider: Provider, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                provider,
                fail,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl WhatsAppClient for FakeClient {
        fn provider(&self) -> Provider {
            self.provider
        }

        async fn send(&self, to: &str, _body: &str) -> Result<String> {
            self.calls.lock().unwrap().push(to.to_string());
            if self.fail {
                Err(ChannelError::provider(503, "unavailable"))
            } else {
                Ok(format!("{}-1", self.provider))
            }
        }
    }

    #[tokio::test]
    async fn test_primary_success_skips_fallback() {
        let a = FakeClient::new(Provider::Twilio, false);
        let b = FakeClient::new(Provider::MetaCloud, false);
        let dispatcher = WhatsAppDispatcher::new(Some(a.clone()), Some(b.clone()));

        let outcome = dispatcher.send("919999999999", "hi").await;
        assert_eq!(outcome, DeliveryOutcome::sent(Provider::Twilio, "twilio-1"));
        assert_eq!(a.calls(), ["whatsapp:+919999999999"]);
        assert!(b.calls().is_empty());
    }

    #[tokio::test]
    async fn test_primary_failure_falls_back() {
        let a = FakeClient::new(Provider::Twilio, true);
        let b = FakeClient::new(Provider::MetaCloud, false);
        let dispatcher = WhatsAppDispatcher::new(Some(a.clone()), Some(b.clone()));

        let outcome = dispatcher.send("+91 99999 99999", "hi").await;
        assert_eq!(outcome.provider(), Some(Provider::MetaCloud));
        assert_eq!(a.calls().len(), 1);
        assert_eq!(b.calls(), ["+919999999999"]);
    }

    #[tokio::test]
    async fn test_fallback_failure_is_terminal() {
        let a = FakeClient::new(Provider::Twilio, true);
        let b = FakeClient::new(Provider::MetaCloud, true);
        let dispatcher = WhatsAppDispatcher::new(Some(a), Some(b));

        match dispatcher.send("919999999999", "hi").await {
            DeliveryOutcome::Failed { reason } => {
                assert!(reason.starts_with("meta_cloud:"));
                assert!(reason.contains("503"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_primary_failure_without_fallback_reports_primary_reason() {
        let a = FakeClient::new(Provider::Twilio, true);
        let dispatcher = WhatsAppDispatcher::new(Some(a), None);

        match dispatcher.send("919999999999", "hi").await {
            DeliveryOutcome::Failed { reason } => assert!(reason.starts_with("twilio:")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_no_provider_configured() {
        let dispatcher = WhatsAppDispatcher::default();
        assert_eq!(
            dispatcher.send("919999999999", "hi").await,
            DeliveryOutcome::failed(NO_PROVIDER_CONFIGURED)
        );
    }

    #[tokio::test]
    async fn test_missing_recipient_attempts_nothing() {
        let a = FakeClient::new(Provider::Twilio, false);
        let dispatcher = WhatsAppDispatcher::new(Some(a.clone()), None);

        for phone in ["", "   ", "whatsapp:+"] {
            assert_eq!(
                dispatcher.send(phone, "hi").await,
                DeliveryOutcome::failed(MISSING_RECIPIENT)
            );
        }
        assert!(a.calls().is_empty());
    }
}
