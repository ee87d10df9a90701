//! Inventory entity - Items that can be lent out.
//!
//! Each item carries a stock `quantity` and a `condition`. The pair is kept consistent
//! by the inventory ledger in `core::inventory`: an item is `Out of Stock` exactly when
//! its quantity is zero.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Physical/availability condition of an inventory item
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum InventoryCondition {
    /// In stock and lendable
    #[sea_orm(string_value = "Available")]
    Available,
    /// Quantity is zero
    #[sea_orm(string_value = "Out of Stock")]
    #[serde(rename = "Out of Stock")]
    OutOfStock,
    /// Held back by an admin
    #[sea_orm(string_value = "Reserved")]
    Reserved,
    #[sea_orm(string_value = "Damaged")]
    Damaged,
    #[sea_orm(string_value = "Discontinued")]
    Discontinued,
}

impl fmt::Display for InventoryCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Available => "Available",
            Self::OutOfStock => "Out of Stock",
            Self::Reserved => "Reserved",
            Self::Damaged => "Damaged",
            Self::Discontinued => "Discontinued",
        };
        f.write_str(label)
    }
}

/// Inventory item database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventories")]
pub struct Model {
    /// Unique identifier for the item
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Human-readable name (e.g., "Projector", "HDMI Cable")
    pub name: String,
    /// Unique inventory code printed on the item label
    #[sea_orm(unique)]
    pub code: String,
    /// Units currently on the shelf, never negative
    pub quantity: i32,
    pub condition: InventoryCondition,
    /// When the quantity last crossed the out-of-stock boundary
    pub last_stock_update: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Inventory and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One item appears on many borrow lines
    #[sea_orm(has_many = "super::borrow_detail::Entity")]
    BorrowDetails,
}

impl Related<super::borrow_detail::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BorrowDetails.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
