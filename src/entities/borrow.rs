//! Borrow entity - The loan header.
//!
//! A borrow links a borrower to the admin responsible for approving it and carries the
//! loan dates. `date_return` is always the *due* date; when an item physically comes
//! back the time is recorded on the borrow line and the return record instead.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Borrow database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "borrows")]
pub struct Model {
    /// Unique identifier for the borrow
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Total units across all borrow lines
    pub quantity: i32,
    /// When the loan starts
    pub date_borrow: DateTimeUtc,
    /// Due date, `None` falls back to the policy's default loan period
    pub date_return: Option<DateTimeUtc>,
    /// Borrowing user
    pub user_id: i64,
    /// Admin who receives the request
    pub admin_id: i64,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Borrow and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each borrow belongs to the borrowing user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    /// Each borrow names the admin handling it
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AdminId",
        to = "super::user::Column::Id"
    )]
    Admin,
    /// One borrow has many lines
    #[sea_orm(has_many = "super::borrow_detail::Entity")]
    BorrowDetails,
    /// One borrow has many return records
    #[sea_orm(has_many = "super::return_record::Entity")]
    ReturnRecords,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::borrow_detail::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BorrowDetails.def()
    }
}

impl Related<super::return_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ReturnRecords.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
