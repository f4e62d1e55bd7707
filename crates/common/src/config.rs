use std::str::FromStr;

use serde::Deserialize;

/// Global application configuration loaded from environment variables.
///
/// Channel credentials are all optional: a missing credential disables the
/// channel for the lifetime of the process instead of failing startup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppConfig {
    /// SMTP relay hostname
    pub smtp_host: Option<String>,

    /// SMTP relay port (default: 587)
    pub smtp_port: u16,

    /// SMTP username
    pub smtp_user: Option<String>,

    /// SMTP password
    pub smtp_pass: Option<String>,

    /// Use implicit TLS instead of STARTTLS (default: false)
    pub smtp_secure: bool,

    /// Sender address for outgoing email (falls back to `smtp_user`)
    pub email_from: Option<String>,

    /// Minimum delay between consecutive email sends in milliseconds (default: 1000)
    pub email_pacing_ms: u64,

    /// SMTP command timeout in seconds; `None` keeps the transport default
    pub smtp_timeout_secs: Option<u64>,

    /// Twilio account SID (WhatsApp provider A)
    pub twilio_account_sid: Option<String>,

    /// Twilio auth token
    pub twilio_auth_token: Option<String>,

    /// Twilio WhatsApp sender number
    pub twilio_whatsapp_from: Option<String>,

    /// Twilio REST API base URL
    pub twilio_api_base: String,

    /// WhatsApp Cloud API access token (WhatsApp provider B)
    pub whatsapp_token: Option<String>,

    /// WhatsApp Cloud API phone number id used as sender
    pub whatsapp_phone_number_id: Option<String>,

    /// WhatsApp Cloud API base URL
    pub whatsapp_api_base: String,

    /// WhatsApp Cloud API graph version
    pub whatsapp_api_version: String,

    /// HTTP timeout for WhatsApp provider calls in seconds; `None` keeps the client default
    pub whatsapp_timeout_secs: Option<u64>,

    /// Port the API server binds to (default: 3000)
    pub api_port: u16,
}

/// Which delivery channels have enough configuration to be attempted.
///
/// Computed once from [`AppConfig`] and never mutated afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadinessFlags {
    pub email: bool,
    pub provider_a: bool,
    pub provider_b: bool,
}

impl ReadinessFlags {
    /// Whether at least one WhatsApp provider can be attempted.
    pub fn any_whatsapp(&self) -> bool {
        self.provider_a || self.provider_b
    }
}

impl Default for AppConfig {
    /// Defaults applied when a variable is unset: no channel credentials.
    fn default() -> Self {
        Self {
            smtp_host: None,
            smtp_port: 587,
            smtp_user: None,
            smtp_pass: None,
            smtp_secure: false,
            email_from: None,
            email_pacing_ms: 1000,
            smtp_timeout_secs: None,
            twilio_account_sid: None,
            twilio_auth_token: None,
            twilio_whatsapp_from: None,
            twilio_api_base: "https://api.twilio.com".to_string(),
            whatsapp_token: None,
            whatsapp_phone_number_id: None,
            whatsapp_api_base: "https://graph.facebook.com".to_string(),
            whatsapp_api_version: "v18.0".to_string(),
            whatsapp_timeout_secs: None,
            api_port: 3000,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// Blank values are treated the same as missing ones.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let defaults = Self::default();
        Ok(Self {
            smtp_host: get("SMTP_HOST"),
            smtp_port: parse_or(get("SMTP_PORT"), "SMTP_PORT", defaults.smtp_port)?,
            smtp_user: get("SMTP_USER"),
            smtp_pass: get("SMTP_PASS"),
            smtp_secure: parse_bool(get("SMTP_SECURE").as_deref())
                .ok_or_else(|| anyhow::anyhow!("SMTP_SECURE must be true or false"))?,
            email_from: get("EMAIL_FROM"),
            email_pacing_ms: parse_or(
                get("EMAIL_PACING_MS"),
                "EMAIL_PACING_MS",
                defaults.email_pacing_ms,
            )?,
            smtp_timeout_secs: parse_opt(get("SMTP_TIMEOUT_SECS"), "SMTP_TIMEOUT_SECS")?,
            twilio_account_sid: get("TWILIO_ACCOUNT_SID"),
            twilio_auth_token: get("TWILIO_AUTH_TOKEN"),
            twilio_whatsapp_from: get("TWILIO_WHATSAPP_FROM"),
            twilio_api_base: get("TWILIO_API_BASE").unwrap_or(defaults.twilio_api_base),
            whatsapp_token: get("WHATSAPP_TOKEN"),
            whatsapp_phone_number_id: get("WHATSAPP_PHONE_NUMBER_ID"),
            whatsapp_api_base: get("WHATSAPP_API_BASE").unwrap_or(defaults.whatsapp_api_base),
            whatsapp_api_version: get("WHATSAPP_API_VERSION")
                .unwrap_or(defaults.whatsapp_api_version),
            whatsapp_timeout_secs: parse_opt(
                get("WHATSAPP_TIMEOUT_SECS"),
                "WHATSAPP_TIMEOUT_SECS",
            )?,
            api_port: parse_or(get("API_PORT"), "API_PORT", defaults.api_port)?,
        })
    }

    /// Derive channel readiness from the credentials that are present.
    pub fn readiness(&self) -> ReadinessFlags {
        ReadinessFlags {
            email: self.smtp_host.is_some() && self.smtp_user.is_some() && self.smtp_pass.is_some(),
            provider_a: self.twilio_account_sid.is_some()
                && self.twilio_auth_token.is_some()
                && self.twilio_whatsapp_from.is_some(),
            provider_b: self.whatsapp_token.is_some() && self.whatsapp_phone_number_id.is_some(),
        }
    }

    /// Sender address for outgoing email.
    pub fn sender_address(&self) -> Option<&str> {
        self.email_from.as_deref().or(self.smtp_user.as_deref())
    }

    /// Emit a one-time summary of the notification configuration.
    ///
    /// Secrets are never logged, only whether they are set.
    pub fn log_summary(&self) {
        let readiness = self.readiness();
        tracing::info!(
            smtp_host = self.smtp_host.as_deref().unwrap_or("<unset>"),
            smtp_port = self.smtp_port,
            smtp_user = self.smtp_user.as_deref().unwrap_or("<unset>"),
            smtp_pass = redact(&self.smtp_pass),
            smtp_secure = self.smtp_secure,
            email_from = self.sender_address().unwrap_or("<unset>"),
            email_pacing_ms = self.email_pacing_ms,
            email_ready = readiness.email,
            "Email channel configuration"
        );
        tracing::info!(
            twilio_account_sid = redact(&self.twilio_account_sid),
            twilio_auth_token = redact(&self.twilio_auth_token),
            twilio_whatsapp_from = self.twilio_whatsapp_from.as_deref().unwrap_or("<unset>"),
            whatsapp_token = redact(&self.whatsapp_token),
            whatsapp_phone_number_id =
                self.whatsapp_phone_number_id.as_deref().unwrap_or("<unset>"),
            provider_a_ready = readiness.provider_a,
            provider_b_ready = readiness.provider_b,
            "WhatsApp channel configuration"
        );
    }
}

fn parse_or<T: FromStr>(value: Option<String>, key: &str, default: T) -> anyhow::Result<T> {
    Ok(parse_opt(value, key)?.unwrap_or(default))
}

fn parse_opt<T: FromStr>(value: Option<String>, key: &str) -> anyhow::Result<Option<T>> {
    value
        .map(|v| v.parse())
        .transpose()
        .map_err(|_| anyhow::anyhow!("{key} has an invalid value"))
}

fn parse_bool(value: Option<&str>) -> Option<bool> {
    match value.map(str::to_ascii_lowercase).as_deref() {
        None => Some(false),
        Some("true" | "1" | "yes") => Some(true),
        Some("false" | "0" | "no") => Some(false),
        Some(_) => None,
    }
}

fn redact(value: &Option<String>) -> &'static str {
    if value.is_some() { "<set>" } else { "<unset>" }
}
