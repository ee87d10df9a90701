//! Unified error type for the borrow tracker.
//!
//! Every fallible operation returns [`Result`]. Each [`Error`] variant maps onto one
//! [`ErrorKind`], which is what an API layer uses to pick a status code and what the
//! [`crate::response::ApiResponse`] envelope reports back to clients.

use crate::entities::{BorrowStatus, InventoryCondition};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse error taxonomy exposed to callers of the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Bad input shape or range
    Validation,
    /// An id did not resolve
    NotFound,
    /// Insufficient stock, invalid state transition, duplicate unique value or stale edit
    Conflict,
    /// Delete blocked by dependent rows
    Dependency,
    /// Actor lacks the role required for the operation
    Forbidden,
    /// Persistence or infrastructure failure
    Server,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Insufficient quantity in inventory: {available} available, {requested} requested")]
    InsufficientStock { available: i32, requested: i32 },

    #[error("Item is not available for borrowing (condition: {condition})")]
    NotAvailable { condition: InventoryCondition },

    #[error("Borrow cannot be updated. Current status is {current}, requested {requested}")]
    InvalidTransition {
        current: BorrowStatus,
        requested: BorrowStatus,
    },

    #[error("{entity} with {field} '{value}' already exists")]
    AlreadyExists {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("Cannot delete {entity} because it has {count} related {dependents}")]
    Dependency {
        entity: &'static str,
        count: u64,
        dependents: &'static str,
    },

    #[error("Permission denied: {message}")]
    Forbidden { message: String },

    #[error("Notification error: {message}")]
    Notification { message: String },

    #[error("{entity} {id} was changed by another request, reload it and try again")]
    StaleWrite { entity: &'static str, id: i64 },

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl Error {
    /// Maps this error onto the public taxonomy.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InsufficientStock { .. }
            | Self::NotAvailable { .. }
            | Self::InvalidTransition { .. }
            | Self::AlreadyExists { .. }
            | Self::StaleWrite { .. } => ErrorKind::Conflict,
            Self::Dependency { .. } => ErrorKind::Dependency,
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::Config { .. } | Self::Notification { .. } | Self::Database(_) => ErrorKind::Server,
        }
    }

    /// Shorthand for a validation failure.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for an unresolved id.
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
