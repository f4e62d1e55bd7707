//! WhatsApp provider A: Twilio Messages API.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use tenancy_common::config::AppConfig;
use tenancy_common::types::Provider;

use super::{WhatsAppClient, http_client, reject};
use crate::error::{ChannelError, Result};
use crate::phone;

#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    /// Sender number, with or without the `whatsapp:` prefix
    pub from: String,
    pub api_base: String,
    pub timeout: Option<Duration>,
}

impl TwilioConfig {
    /// Extract provider A settings; `None` when any credential is missing.
    pub fn from_app_config(config: &AppConfig) -> Option<Self> {
        Some(Self {
            account_sid: config.twilio_account_sid.clone()?,
            auth_token: config.twilio_auth_token.clone()?,
            from: config.twilio_whatsapp_from.clone()?,
            api_base: config.twilio_api_base.clone(),
            timeout: config.whatsapp_timeout_secs.map(Duration::from_secs),
        })
    }
}

#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: String,
    #[serde(default)]
    status: Option<String>,
}

pub struct TwilioClient {
    client: reqwest::Client,
    config: TwilioConfig,
}

impl TwilioClient {
    pub fn new(config: TwilioConfig) -> Result<Self> {
        let client = http_client(config.timeout)?;
        Ok(Self { client, config })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.api_base.trim_end_matches('/'),
            self.config.account_sid
        )
    }

    fn form_fields(&self, to: &str, body: &str) -> [(&'static str, String); 3] {
        [
            ("From", phone::twilio_address(&self.config.from)),
            ("To", to.to_string()),
            ("Body", body.to_string()),
        ]
    }
}

#[async_trait]
impl WhatsAppClient for TwilioClient {
    fn provider(&self) -> Provider {
        Provider::Twilio
    }

    async fn send(&self, to: &str, body: &str) -> Result<String> {
        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&self.form_fields(to, body))
            .send()
            .await
            .map_err(ChannelError::from_reqwest)?;

        if !response.status().is_success() {
            return Err(reject(response).await);
        }

        let message: MessageResource = response
            .json()
            .await
            .map_err(|e| ChannelError::unexpected_response(e.to_string()))?;

        tracing::debug!(
            sid = %message.sid,
            status = message.status.as_deref().unwrap_or("unknown"),
            "Twilio accepted WhatsApp message"
        );
        Ok(message.sid)
    }
}
