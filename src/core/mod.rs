//! Framework-agnostic lending logic.
//!
//! Every function here takes a database connection and returns structured data, so an
//! HTTP layer, a CLI or a test can drive the same operations.

pub mod borrow;
pub mod deletion;
pub mod inventory;
pub mod late_fee;
pub mod report;
pub mod return_record;
pub mod status;
pub mod user;
