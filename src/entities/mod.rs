//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod borrow;
pub mod borrow_detail;
pub mod inventory;
pub mod return_record;
pub mod user;

// Re-export specific types to avoid conflicts
pub use borrow::{Column as BorrowColumn, Entity as Borrow, Model as BorrowModel};
pub use borrow_detail::{
    BorrowStatus, Column as BorrowDetailColumn, Entity as BorrowDetail, Model as BorrowDetailModel,
};
pub use inventory::{
    Column as InventoryColumn, Entity as Inventory, InventoryCondition, Model as InventoryModel,
};
pub use return_record::{
    Column as ReturnRecordColumn, Entity as ReturnRecord, Model as ReturnRecordModel,
};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel, UserRole};
