//! Late-day calculation for borrow lines.
//!
//! Everything in this module is pure: callers pass in "today" explicitly, which keeps the
//! arithmetic independent of the clock. Dates are compared at day granularity (time of
//! day is dropped before subtracting) so a return at 23:59 on the due date is on time.

use crate::entities::BorrowStatus;
use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Whole days `actual` (or `today`, while the item is still out) lies past `due`.
///
/// Returns zero when returned on or before the due date.
#[must_use]
pub fn compute_late_days(due: NaiveDate, actual: Option<NaiveDate>, today: NaiveDate) -> i64 {
    let compared = actual.unwrap_or(today);
    (compared - due).num_days().max(0)
}

/// Late days for a single borrow line given its status.
///
/// Returned lines are measured against their return time. Lines still awaiting a
/// decision or out on loan accrue a live estimate against `today`. Rejected lines never
/// left the shelf and a returned line without a timestamp has nothing to measure, so
/// both yield zero.
#[must_use]
pub fn line_late_days(
    status: BorrowStatus,
    due: DateTime<Utc>,
    returned_at: Option<DateTime<Utc>>,
    today: NaiveDate,
) -> i64 {
    match (returned_at, status) {
        (Some(returned), _) => {
            compute_late_days(due.date_naive(), Some(returned.date_naive()), today)
        }
        (None, BorrowStatus::Pending | BorrowStatus::Active) => {
            compute_late_days(due.date_naive(), None, today)
        }
        (None, BorrowStatus::Rejected | BorrowStatus::Returned) => 0,
    }
}

/// Picks the due date for a line.
///
/// Precedence: the borrow's own due date, then the return record's due date while the
/// line is not yet returned, then `date_borrow + default_loan_days`.
#[must_use]
pub fn resolve_due_date(
    borrow_due: Option<DateTime<Utc>>,
    record_due: Option<DateTime<Utc>>,
    status: BorrowStatus,
    date_borrow: DateTime<Utc>,
    default_loan_days: i64,
) -> DateTime<Utc> {
    if let Some(due) = borrow_due {
        return due;
    }
    match record_due {
        Some(due) if status != BorrowStatus::Returned => due,
        _ => date_borrow + Duration::days(default_loan_days),
    }
}

/// Narrows a late-day count to the width stored in the database.
#[must_use]
pub fn clamp_late_days(days: i64) -> i32 {
    i32::try_from(days.max(0)).unwrap_or(i32::MAX)
}
