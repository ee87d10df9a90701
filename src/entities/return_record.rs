//! Return record entity - Return-side bookkeeping for a borrow.
//!
//! A placeholder is written when the borrow is created, carrying the loan dates. When a
//! line is returned the record gets its `returned_at` timestamp and the cached
//! `late_days` value.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Return record database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "return_records")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub borrow_id: i64,
    pub quantity: i32,
    pub date_borrow: DateTimeUtc,
    /// Due date snapshot taken at borrow time
    pub date_return: DateTimeUtc,
    /// Actual return time, `None` while the items are still out
    pub returned_at: Option<DateTimeUtc>,
    /// Whole days past the due date, recomputed on return
    pub late_days: i32,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between `ReturnRecord` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each return record belongs to one borrow
    #[sea_orm(
        belongs_to = "super::borrow::Entity",
        from = "Column::BorrowId",
        to = "super::borrow::Column::Id"
    )]
    Borrow,
}

impl Related<super::borrow::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Borrow.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
