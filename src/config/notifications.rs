//! WhatsApp gateway configuration from environment variables.
//!
//! Notifications are optional: unless `WHATSAPP_ENABLED=true` and a gateway URL is
//! configured, the application falls back to a notifier that only logs.

use std::env;

/// Settings for the WhatsApp HTTP gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhatsAppSettings {
    /// Base URL of the gateway, messages are POSTed to `{gateway_url}/send`
    pub gateway_url: String,
    /// Bearer token for the gateway, if it requires one
    pub api_token: Option<String>,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Application name used in message footers
    pub app_name: String,
    /// Support contact used in message footers
    pub support_contact: String,
}

/// Reads the WhatsApp settings from the environment.
///
/// Returns `None` when notifications are disabled or no gateway URL is set.
#[must_use]
pub fn whatsapp_settings_from_env() -> Option<WhatsAppSettings> {
    let enabled = env::var("WHATSAPP_ENABLED").is_ok_and(|v| v.eq_ignore_ascii_case("true"));
    if !enabled {
        return None;
    }

    let gateway_url = env::var("WHATSAPP_GATEWAY_URL").ok()?;
    let timeout_secs = env::var("WHATSAPP_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(10);

    Some(WhatsAppSettings {
        gateway_url: gateway_url.trim_end_matches('/').to_string(),
        api_token: env::var("WHATSAPP_API_TOKEN").ok(),
        timeout_secs,
        app_name: app_name(),
        support_contact: env::var("SUPPORT_CONTACT")
            .unwrap_or_else(|_| "support@example.com".to_string()),
    })
}

/// Application name shown in notification messages.
#[must_use]
pub fn app_name() -> String {
    env::var("APP_NAME").unwrap_or_else(|_| "Borrow Tracker".to_string())
}
