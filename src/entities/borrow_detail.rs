//! Borrow detail entity - One line of a borrow and its lifecycle status.
//!
//! The `status` column is the authoritative state of the loan line and is only changed
//! through the transition rules in `core::status`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a borrow line
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "UPPERCASE")]
pub enum BorrowStatus {
    /// Requested, awaiting an admin decision
    #[sea_orm(string_value = "PENDING")]
    Pending,
    /// Approved and out on loan
    #[sea_orm(string_value = "ACTIVE")]
    Active,
    /// Declined by an admin
    #[sea_orm(string_value = "REJECTED")]
    Rejected,
    /// Physically returned
    #[sea_orm(string_value = "RETURNED")]
    Returned,
}

impl fmt::Display for BorrowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "PENDING",
            Self::Active => "ACTIVE",
            Self::Rejected => "REJECTED",
            Self::Returned => "RETURNED",
        };
        f.write_str(label)
    }
}

/// Borrow detail database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "borrow_details")]
pub struct Model {
    /// Unique identifier for the line
    #[sea_orm(primary_key)]
    pub id: i64,
    pub borrow_id: i64,
    pub inventory_id: i64,
    /// Units reserved for this line
    pub quantity: i32,
    pub status: BorrowStatus,
    /// When the item physically came back, set on transition to `RETURNED`
    pub returned_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between `BorrowDetail` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each line belongs to one borrow
    #[sea_orm(
        belongs_to = "super::borrow::Entity",
        from = "Column::BorrowId",
        to = "super::borrow::Column::Id"
    )]
    Borrow,
    /// Each line references one inventory item
    #[sea_orm(
        belongs_to = "super::inventory::Entity",
        from = "Column::InventoryId",
        to = "super::inventory::Column::Id"
    )]
    Inventory,
}

impl Related<super::borrow::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Borrow.def()
    }
}

impl Related<super::inventory::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Inventory.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
