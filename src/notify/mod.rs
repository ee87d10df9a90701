//! Borrower and admin notifications.
//!
//! The lending core talks to a [`Notifier`] trait object and never to a concrete
//! transport. Delivery is best-effort: [`notify_best_effort`] bounds every send with a
//! timeout and logs failures instead of returning them, so a broken gateway can never fail
//! or roll back a borrow.

pub mod templates;
pub mod whatsapp;

use crate::errors::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Which message template to render
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Sent to the borrower after a request is recorded
    BorrowRequested,
    /// Sent to the admin who has to decide on a request
    BorrowRequestReceived,
    /// Sent to the borrower when the request is approved
    BorrowApproved,
    /// Sent to the borrower when the request is declined
    BorrowRejected,
    /// Sent to the borrower when the item is checked back in
    ItemReturned,
}

/// Values substituted into a message template
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationPayload {
    /// Name of the person receiving the message
    pub recipient_name: String,
    /// Name of the borrowing user
    pub borrower_name: String,
    pub item_name: String,
    pub date_borrow: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    pub late_days: Option<i64>,
}

/// Delivers a rendered notification to a contact.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends one message. `to` is the recipient's phone number as stored on the user.
    async fn send(
        &self,
        to: &str,
        kind: NotificationKind,
        payload: &NotificationPayload,
    ) -> Result<()>;
}

/// Notifier used when no gateway is configured. Messages are only logged.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn send(
        &self,
        to: &str,
        kind: NotificationKind,
        payload: &NotificationPayload,
    ) -> Result<()> {
        debug!(
            "Notifications disabled, dropping {:?} for {} ({})",
            kind, payload.recipient_name, to
        );
        Ok(())
    }
}

/// Sends a notification, swallowing failures and timeouts.
///
/// Returns whether the message was delivered. Callers are expected to ignore the result
/// beyond logging; it exists so tests can observe delivery.
pub async fn notify_best_effort(
    notifier: &dyn Notifier,
    to: &str,
    kind: NotificationKind,
    payload: &NotificationPayload,
    timeout: Duration,
) -> bool {
    match tokio::time::timeout(timeout, notifier.send(to, kind, payload)).await {
        Ok(Ok(())) => {
            debug!("Sent {:?} notification to {}", kind, to);
            true
        }
        Ok(Err(e)) => {
            warn!("Failed to send {:?} notification to {}: {}", kind, to, e);
            false
        }
        Err(_) => {
            warn!(
                "Timed out after {:?} sending {:?} notification to {}",
                timeout, kind, to
            );
            false
        }
    }
}
