//! User entity - Borrowers and the staff who approve their requests.
//!
//! The lending core only reads `id`, `username`, `number` and `role`; the password
//! column holds an opaque hash produced by whatever authentication layer sits in front.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of a user account
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    /// Full access, approves and rejects borrow requests
    #[sea_orm(string_value = "ADMIN")]
    Admin,
    /// Manages users and their own borrows
    #[sea_orm(string_value = "EDITOR")]
    Editor,
    /// Regular borrower
    #[sea_orm(string_value = "BORROWER")]
    Borrower,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Admin => "ADMIN",
            Self::Editor => "EDITOR",
            Self::Borrower => "BORROWER",
        };
        f.write_str(label)
    }
}

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name, also used in notification messages
    #[sea_orm(unique)]
    pub username: String,
    #[sea_orm(unique)]
    pub email: String,
    /// Phone number used as the WhatsApp contact
    #[sea_orm(unique)]
    pub number: String,
    /// Password hash, never serialized back out
    #[serde(skip_serializing, default)]
    pub password: String,
    pub role: UserRole,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between User and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One user has many borrows
    #[sea_orm(has_many = "super::borrow::Entity")]
    Borrows,
}

impl Related<super::borrow::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Borrows.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
