//! WhatsApp delivery through an HTTP automation gateway.
//!
//! Messages are POSTed as JSON to `{gateway_url}/send` with the chat id and rendered
//! text. The HTTP client carries its own timeout on top of the one applied by
//! [`super::notify_best_effort`].

use super::{NotificationKind, NotificationPayload, Notifier, templates};
use crate::config::notifications::WhatsAppSettings;
use crate::errors::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    to: &'a str,
    text: &'a str,
}

/// Notifier backed by a WhatsApp HTTP gateway
#[derive(Debug, Clone)]
pub struct WhatsAppNotifier {
    client: Client,
    settings: WhatsAppSettings,
}

impl WhatsAppNotifier {
    /// Builds the notifier and its HTTP client.
    pub fn new(settings: WhatsAppSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| Error::Config {
                message: format!("Failed to build WhatsApp HTTP client: {e}"),
            })?;
        Ok(Self { client, settings })
    }

    fn endpoint(&self) -> String {
        format!("{}/send", self.settings.gateway_url)
    }
}

#[async_trait]
impl Notifier for WhatsAppNotifier {
    async fn send(
        &self,
        to: &str,
        kind: NotificationKind,
        payload: &NotificationPayload,
    ) -> Result<()> {
        let chat_id = templates::whatsapp_chat_id(to)?;
        let text = templates::render_message(
            kind,
            payload,
            &self.settings.app_name,
            &self.settings.support_contact,
        );

        let mut request = self.client.post(self.endpoint()).json(&SendMessageRequest {
            to: &chat_id,
            text: &text,
        });
        if let Some(token) = &self.settings.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| Error::Notification {
            message: format!("WhatsApp gateway request failed: {e}"),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Notification {
                message: format!("WhatsApp gateway responded with {status}"),
            });
        }

        info!("WhatsApp {:?} message sent to {}", kind, chat_id);
        Ok(())
    }
}
