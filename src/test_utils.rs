//! Shared test utilities for the borrow tracker.
//!
//! This module provides helpers for setting up in-memory databases, creating test
//! entities with sensible defaults, and notifier doubles that record or fail deliveries.

#![allow(clippy::unwrap_used)]

use crate::{
    config::app::LoanPolicy,
    core::{borrow::BorrowService, inventory, user},
    entities::{self, UserRole},
    errors::{Error, Result},
    notify::{NotificationKind, NotificationPayload, Notifier},
};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use sea_orm::DatabaseConnection;
use std::sync::{Arc, Mutex};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a test user with sensible defaults.
///
/// # Defaults
/// * `email`: `"{username}@example.com"`
/// * `number`: a unique `08…` number derived from the username
/// * `password`: `"hash"`
pub async fn create_test_user(
    db: &DatabaseConnection,
    username: &str,
    role: UserRole,
) -> Result<entities::user::Model> {
    let suffix: u32 = username.bytes().map(u32::from).sum();
    user::create_user(
        db,
        user::NewUser {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            number: format!("0812{suffix:08}{}", username.len()),
            password: "hash".to_string(),
            role,
        },
    )
    .await
}

/// Creates a test inventory item named after its code.
pub async fn create_test_item(
    db: &DatabaseConnection,
    code: &str,
    quantity: i32,
) -> Result<entities::inventory::Model> {
    inventory::create_inventory(db, format!("Item {code}"), code.to_string(), quantity).await
}

/// Sets up a database with a borrower and an admin.
/// Returns (db, borrower, admin).
pub async fn setup_with_people() -> Result<(
    DatabaseConnection,
    entities::user::Model,
    entities::user::Model,
)> {
    let db = setup_test_db().await?;
    let borrower = create_test_user(&db, "ana", UserRole::Borrower).await?;
    let admin = create_test_user(&db, "admin", UserRole::Admin).await?;
    Ok((db, borrower, admin))
}

/// Builds a borrow service over `db` with the default policy and the given notifier.
pub fn test_service(db: &DatabaseConnection, notifier: Arc<dyn Notifier>) -> BorrowService {
    BorrowService::new(db.clone(), notifier, LoanPolicy::default())
}

/// A payload with fixed dates: borrowed 10 January 2024, due 17 January 2024.
pub fn sample_payload() -> NotificationPayload {
    NotificationPayload {
        recipient_name: "admin".to_string(),
        borrower_name: "ana".to_string(),
        item_name: "Projector".to_string(),
        date_borrow: Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap(),
        due_date: Some(Utc.with_ymd_and_hms(2024, 1, 17, 9, 0, 0).unwrap()),
        late_days: None,
    }
}

/// One recorded delivery: (contact, kind, payload)
pub type SentNotification = (String, NotificationKind, NotificationPayload);

/// Notifier that records every message it is asked to send.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentNotification>>,
}

impl RecordingNotifier {
    /// Snapshot of everything sent so far.
    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent.lock().unwrap().clone()
    }

    /// Kinds sent so far, in order.
    pub fn kinds(&self) -> Vec<NotificationKind> {
        self.sent().into_iter().map(|(_, kind, _)| kind).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(
        &self,
        to: &str,
        kind: NotificationKind,
        payload: &NotificationPayload,
    ) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), kind, payload.clone()));
        Ok(())
    }
}

/// Notifier whose gateway is always down.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn send(
        &self,
        _to: &str,
        _kind: NotificationKind,
        _payload: &NotificationPayload,
    ) -> Result<()> {
        Err(Error::Notification {
            message: "gateway unavailable".to_string(),
        })
    }
}
