//! Return records - Due dates, return times and late days per borrow.

use crate::{
    core::late_fee,
    entities::{
        Borrow, BorrowDetail, BorrowStatus, Inventory, ReturnRecord, borrow, borrow_detail,
        return_record,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

/// A return record with its live lateness and the lines it covers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReturnView {
    pub record: return_record::Model,
    /// Late days as of the query date
    pub late_days: i64,
    pub lines: Vec<ReturnLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReturnLine {
    pub detail_id: i64,
    pub inventory_id: i64,
    pub item_name: Option<String>,
    pub quantity: i32,
    pub status: BorrowStatus,
}

/// Manual corrections to a return record
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ReturnPatch {
    pub quantity: Option<i32>,
    pub date_borrow: Option<DateTime<Utc>>,
    pub date_return: Option<DateTime<Utc>>,
    pub returned_at: Option<DateTime<Utc>>,
    pub late_days: Option<i32>,
}

impl ReturnPatch {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.quantity.is_none()
            && self.date_borrow.is_none()
            && self.date_return.is_none()
            && self.returned_at.is_none()
            && self.late_days.is_none()
    }
}

/// Finds a return record by id.
pub async fn get_return_by_id(
    db: &DatabaseConnection,
    return_id: i64,
) -> Result<Option<return_record::Model>> {
    ReturnRecord::find_by_id(return_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves every return record, latest due date first.
pub async fn get_all_returns(db: &DatabaseConnection) -> Result<Vec<return_record::Model>> {
    ReturnRecord::find()
        .order_by_desc(return_record::Column::DateReturn)
        .order_by_desc(return_record::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Late days for one record as of `today`.
///
/// With lines present the worst line counts. Without lines the record's own return
/// time is measured against its due date.
#[must_use]
pub fn record_late_days(
    record: &return_record::Model,
    parent: Option<&borrow::Model>,
    details: &[borrow_detail::Model],
    today: NaiveDate,
    default_loan_days: i64,
) -> i64 {
    let borrow_due = parent.and_then(|b| b.date_return);

    if details.is_empty() {
        let due = late_fee::resolve_due_date(
            borrow_due,
            Some(record.date_return),
            BorrowStatus::Active,
            record.date_borrow,
            default_loan_days,
        );
        return late_fee::compute_late_days(
            due.date_naive(),
            record.returned_at.map(|at| at.date_naive()),
            today,
        );
    }

    details
        .iter()
        .map(|detail| {
            let due = late_fee::resolve_due_date(
                borrow_due,
                Some(record.date_return),
                detail.status,
                record.date_borrow,
                default_loan_days,
            );
            late_fee::line_late_days(detail.status, due, detail.returned_at, today)
        })
        .max()
        .unwrap_or(0)
}

/// Retrieves a user's return records with live late days, latest due date first.
pub async fn get_returns_for_user(
    db: &DatabaseConnection,
    user_id: i64,
    today: NaiveDate,
    default_loan_days: i64,
) -> Result<Vec<ReturnView>> {
    let borrows: HashMap<i64, borrow::Model> = Borrow::find()
        .filter(borrow::Column::UserId.eq(user_id))
        .all(db)
        .await?
        .into_iter()
        .map(|b| (b.id, b))
        .collect();
    if borrows.is_empty() {
        return Ok(Vec::new());
    }
    let borrow_ids: Vec<i64> = borrows.keys().copied().collect();

    let records = ReturnRecord::find()
        .filter(return_record::Column::BorrowId.is_in(borrow_ids.clone()))
        .order_by_desc(return_record::Column::DateReturn)
        .order_by_desc(return_record::Column::Id)
        .all(db)
        .await?;

    let mut details_by_borrow: HashMap<i64, Vec<borrow_detail::Model>> = HashMap::new();
    for detail in BorrowDetail::find()
        .filter(borrow_detail::Column::BorrowId.is_in(borrow_ids))
        .order_by_asc(borrow_detail::Column::Id)
        .all(db)
        .await?
    {
        details_by_borrow
            .entry(detail.borrow_id)
            .or_default()
            .push(detail);
    }

    let item_names: HashMap<i64, String> = Inventory::find()
        .all(db)
        .await?
        .into_iter()
        .map(|item| (item.id, item.name))
        .collect();

    let views = records
        .into_iter()
        .map(|record| {
            let details = details_by_borrow
                .get(&record.borrow_id)
                .map(Vec::as_slice)
                .unwrap_or_default();
            let late_days = record_late_days(
                &record,
                borrows.get(&record.borrow_id),
                details,
                today,
                default_loan_days,
            );
            let lines = details
                .iter()
                .map(|d| ReturnLine {
                    detail_id: d.id,
                    inventory_id: d.inventory_id,
                    item_name: item_names.get(&d.inventory_id).cloned(),
                    quantity: d.quantity,
                    status: d.status,
                })
                .collect();
            ReturnView {
                record,
                late_days,
                lines,
            }
        })
        .collect();

    Ok(views)
}

/// Applies a manual correction to a return record.
pub async fn update_return(
    db: &DatabaseConnection,
    return_id: i64,
    patch: ReturnPatch,
) -> Result<return_record::Model> {
    if patch.is_empty() {
        return Err(Error::validation("No fields to update"));
    }
    if patch.quantity.is_some_and(|q| q <= 0) {
        return Err(Error::validation("Quantity must be a positive number"));
    }
    if patch.late_days.is_some_and(|d| d < 0) {
        return Err(Error::validation("Late days cannot be negative"));
    }

    let existing = get_return_by_id(db, return_id)
        .await?
        .ok_or_else(|| Error::not_found("ReturnRecord", return_id))?;

    let date_borrow = patch.date_borrow.unwrap_or(existing.date_borrow);
    let date_return = patch.date_return.unwrap_or(existing.date_return);
    if date_return <= date_borrow {
        return Err(Error::validation(
            "Return date must be after the borrow date",
        ));
    }

    let mut active: return_record::ActiveModel = existing.into();
    if let Some(quantity) = patch.quantity {
        active.quantity = Set(quantity);
    }
    active.date_borrow = Set(date_borrow);
    active.date_return = Set(date_return);
    if let Some(returned_at) = patch.returned_at {
        active.returned_at = Set(Some(returned_at));
    }
    if let Some(late_days) = patch.late_days {
        active.late_days = Set(late_days);
    }
    active.updated_at = Set(Utc::now());

    let updated = active.update(db).await?;
    info!("Return record {} corrected", updated.id);
    Ok(updated)
}

/// Deletes a return record.
pub async fn delete_return(db: &DatabaseConnection, return_id: i64) -> Result<()> {
    let result = ReturnRecord::delete_by_id(return_id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::not_found("ReturnRecord", return_id));
    }
    info!("Return record {} deleted", return_id);
    Ok(())
}
