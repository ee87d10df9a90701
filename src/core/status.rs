//! Borrow line state machine.
//!
//! ```text
//! PENDING ──► ACTIVE ──► RETURNED
//!    │                      ▲
//!    ├──► REJECTED          │
//!    └──────────────────────┘  (admin shortcut, policy controlled)
//! ```
//!
//! `REJECTED` and `RETURNED` are terminal.

use crate::{
    entities::BorrowStatus,
    errors::{Error, Result},
};

/// Whether no further transition is possible out of `status`.
#[must_use]
pub const fn is_terminal(status: BorrowStatus) -> bool {
    matches!(status, BorrowStatus::Rejected | BorrowStatus::Returned)
}

/// Whether the move from `current` to `target` is legal.
///
/// `allow_pending_return` enables the `PENDING → RETURNED` shortcut, a deliberate
/// relaxation for admins recording a hand-over that was never formally approved.
#[must_use]
pub const fn can_transition(
    current: BorrowStatus,
    target: BorrowStatus,
    allow_pending_return: bool,
) -> bool {
    match (current, target) {
        (BorrowStatus::Pending, BorrowStatus::Active | BorrowStatus::Rejected)
        | (BorrowStatus::Active, BorrowStatus::Returned) => true,
        (BorrowStatus::Pending, BorrowStatus::Returned) => allow_pending_return,
        _ => false,
    }
}

/// Validates a transition, echoing the current status back on failure.
pub fn check_transition(
    current: BorrowStatus,
    target: BorrowStatus,
    allow_pending_return: bool,
) -> Result<()> {
    if can_transition(current, target, allow_pending_return) {
        Ok(())
    } else {
        Err(Error::InvalidTransition {
            current,
            requested: target,
        })
    }
}

/// Whether entering `target` puts the reserved units back on the shelf.
#[must_use]
pub const fn releases_stock(target: BorrowStatus, restock_on_reject: bool) -> bool {
    match target {
        BorrowStatus::Returned => true,
        BorrowStatus::Rejected => restock_on_reject,
        BorrowStatus::Pending | BorrowStatus::Active => false,
    }
}
