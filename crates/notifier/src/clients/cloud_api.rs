//! WhatsApp provider B: Meta WhatsApp Cloud API.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use tenancy_common::config::AppConfig;
use tenancy_common::types::Provider;

use super::{WhatsAppClient, http_client, reject};
use crate::error::{ChannelError, Result};

#[derive(Debug, Clone)]
pub struct CloudApiConfig {
    pub access_token: String,
    /// Sender phone number id registered with the business account
    pub phone_number_id: String,
    pub api_base: String,
    pub api_version: String,
    pub timeout: Option<Duration>,
}

impl CloudApiConfig {
    /// Extract provider B settings; `None` when any credential is missing.
    pub fn from_app_config(config: &AppConfig) -> Option<Self> {
        Some(Self {
            access_token: config.whatsapp_token.clone()?,
            phone_number_id: config.whatsapp_phone_number_id.clone()?,
            api_base: config.whatsapp_api_base.clone(),
            api_version: config.whatsapp_api_version.clone(),
            timeout: config.whatsapp_timeout_secs.map(Duration::from_secs),
        })
    }
}

#[derive(Debug, Serialize)]
struct TextMessageRequest<'a> {
    messaging_product: &'static str,
    to: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    text: TextBody<'a>,
}

#[derive(Debug, Serialize)]
struct TextBody<'a> {
    body: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    #[serde(default)]
    messages: Vec<SentMessage>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    id: String,
    #[serde(default)]
    message_status: Option<String>,
}

pub struct CloudApiClient {
    client: reqwest::Client,
    config: CloudApiConfig,
}

impl CloudApiClient {
    pub fn new(config: CloudApiConfig) -> Result<Self> {
        let client = http_client(config.timeout)?;
        Ok(Self { client, config })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/{}/{}/messages",
            self.config.api_base.trim_end_matches('/'),
            self.config.api_version,
            self.config.phone_number_id
        )
    }

    fn request_body<'a>(to: &'a str, body: &'a str) -> TextMessageRequest<'a> {
        TextMessageRequest {
            messaging_product: "whatsapp",
            to,
            kind: "text",
            text: TextBody { body },
        }
    }
}

#[async_trait]
impl WhatsAppClient for CloudApiClient {
    fn provider(&self) -> Provider {
        Provider::MetaCloud
    }

    async fn send(&self, to: &str, body: &str) -> Result<String> {
        let response = self
            .client
            .post(self.messages_url())
            .bearer_auth(&self.config.access_token)
            .json(&Self::request_body(to, body))
            .send()
            .await
            .map_err(ChannelError::from_reqwest)?;

        if !response.status().is_success() {
            return Err(reject(response).await);
        }

        let parsed: SendMessageResponse = response
            .json()
            .await
            .map_err(|e| ChannelError::unexpected_response(e.to_string()))?;

        let message = parsed
            .messages
            .into_iter()
            .next()
            .ok_or_else(|| ChannelError::unexpected_response("response listed no messages"))?;

        tracing::debug!(
            message_id = %message.id,
            status = message.message_status.as_deref().unwrap_or("unknown"),
            "Cloud API accepted WhatsApp message"
        );
        Ok(message.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CloudApiConfig {
        CloudApiConfig {
            access_token: "token".to_string(),
            phone_number_id: "1055".to_string(),
            api_base: "https://graph.facebook.com".to_string(),
            api_version: "v18.0".to_string(),
            timeout: None,
        }
    }

    #[test]
    fn test_messages_url() {
        let client = CloudApiClient::new(config()).unwrap();
        assert_eq!(
            client.messages_url(),
            "https://graph.facebook.com/v18.0/1055/messages"
        );
    }

    #[test]
    fn test_request_body_shape() {
        let body =
            serde_json::to_value(CloudApiClient::request_body("+919999999999", "hi")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "messaging_product": "whatsapp",
                "to": "+919999999999",
                "type": "text",
                "text": { "body": "hi" }
            })
        );
    }

    #[test]
    fn test_response_parsing() {
        let raw = r#"{
            "messaging_product": "whatsapp",
            "contacts": [{"input": "+919999999999", "wa_id": "919999999999"}],
            "messages": [{"id": "wamid.HBgL", "message_status": "accepted"}]
        }"#;
        let parsed: SendMessageResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.messages[0].id, "wamid.HBgL");

        let empty: SendMessageResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.messages.is_empty());
    }

    #[test]
    fn test_config_requires_token_and_sender() {
        let app = AppConfig {
            whatsapp_token: Some("token".to_string()),
            ..Default::default()
        };
        assert!(CloudApiConfig::from_app_config(&app).is_none());
    }
}
