//! Borrow orchestration - Creating loans and moving their lines through the lifecycle.
//!
//! [`BorrowService`] is the entry point for anything that changes stock: creating a
//! borrow reserves inventory, and rejecting or returning a line releases it again. Every
//! such change runs inside one database transaction, so a failure at any step leaves
//! no partial borrow and no lost units behind. Notifications go out only after commit
//! and never affect the outcome.
//!
//! Read-only queries over borrows are plain functions at the bottom of this module.

use crate::{
    config::app::LoanPolicy,
    core::{inventory, late_fee, status, user},
    entities::{
        Borrow, BorrowDetail, BorrowStatus, Inventory, InventoryCondition, ReturnRecord, User,
        UserRole, borrow, borrow_detail, return_record,
    },
    errors::{Error, Result},
    notify::{NotificationKind, NotificationPayload, Notifier, notify_best_effort},
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    DatabaseTransaction, QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr,
};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};
use tracing::{info, warn};

/// One requested inventory line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowLine {
    pub inventory_id: i64,
    pub quantity: i32,
}

/// A request to borrow one or more items
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowRequest {
    /// Borrowing user
    pub user_id: i64,
    /// Admin who decides on the request
    pub admin_id: i64,
    pub lines: Vec<BorrowLine>,
    pub date_borrow: DateTime<Utc>,
    /// Due date
    pub date_return: Option<DateTime<Utc>>,
}

impl BorrowRequest {
    /// A request for a single inventory line.
    #[must_use]
    pub fn single(
        user_id: i64,
        admin_id: i64,
        inventory_id: i64,
        quantity: i32,
        date_borrow: DateTime<Utc>,
        date_return: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            user_id,
            admin_id,
            lines: vec![BorrowLine {
                inventory_id,
                quantity,
            }],
            date_borrow,
            date_return,
        }
    }
}

/// Rows written by a successful [`BorrowService::create_borrow`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BorrowOutcome {
    pub borrow: borrow::Model,
    pub details: Vec<borrow_detail::Model>,
    pub return_record: return_record::Model,
}

impl BorrowOutcome {
    #[must_use]
    pub const fn borrow_id(&self) -> i64 {
        self.borrow.id
    }

    #[must_use]
    pub fn detail_ids(&self) -> Vec<i64> {
        self.details.iter().map(|d| d.id).collect()
    }
}

/// Result of moving one borrow line to a new status
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionOutcome {
    pub previous: BorrowStatus,
    pub detail: borrow_detail::Model,
    /// The item after units were put back, if the transition released stock
    pub inventory: Option<crate::entities::inventory::Model>,
    /// The updated return record, for transitions to `RETURNED`
    pub return_record: Option<return_record::Model>,
}

/// A borrow together with its lines and display names
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BorrowWithDetails {
    pub borrow: borrow::Model,
    pub borrower_name: Option<String>,
    pub details: Vec<DetailWithItem>,
}

/// A borrow line with the name of the item it references
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailWithItem {
    pub detail: borrow_detail::Model,
    pub item_name: Option<String>,
}

/// Checks the loan dates against the policy.
///
/// The due date, when present, must be strictly after the borrow date and, if the
/// policy sets a ceiling, no more than `max_loan_days` later.
pub fn validate_loan_dates(
    date_borrow: DateTime<Utc>,
    date_return: Option<DateTime<Utc>>,
    policy: &LoanPolicy,
) -> Result<()> {
    let Some(due) = date_return else {
        return Ok(());
    };

    if due <= date_borrow {
        return Err(Error::validation(
            "Return date must be after the borrow date",
        ));
    }

    if let Some(max_days) = policy.max_loan_days {
        if due - date_borrow > Duration::days(max_days) {
            return Err(Error::validation(format!(
                "Loan period cannot exceed {max_days} days"
            )));
        }
    }

    Ok(())
}

/// Checks the requested lines and returns the total quantity.
pub fn validate_lines(lines: &[BorrowLine]) -> Result<i32> {
    if lines.is_empty() {
        return Err(Error::validation("At least one inventory item is required"));
    }

    let mut total: i32 = 0;
    for (index, line) in lines.iter().enumerate() {
        if line.quantity <= 0 {
            return Err(Error::validation("Quantity must be a positive number"));
        }
        if lines[..index]
            .iter()
            .any(|other| other.inventory_id == line.inventory_id)
        {
            return Err(Error::validation(format!(
                "Inventory item {} is listed more than once",
                line.inventory_id
            )));
        }
        total = total
            .checked_add(line.quantity)
            .ok_or_else(|| Error::validation("Requested quantity is too large"))?;
    }

    Ok(total)
}

/// Coordinates stock, borrow rows and notifications.
#[derive(Clone)]
pub struct BorrowService {
    db: DatabaseConnection,
    notifier: Arc<dyn Notifier>,
    policy: LoanPolicy,
}

impl BorrowService {
    #[must_use]
    pub fn new(db: DatabaseConnection, notifier: Arc<dyn Notifier>, policy: LoanPolicy) -> Self {
        Self {
            db,
            notifier,
            policy,
        }
    }

    #[must_use]
    pub const fn policy(&self) -> &LoanPolicy {
        &self.policy
    }

    #[must_use]
    pub const fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    fn notification_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.policy.notification_timeout_secs)
    }

    /// Records a borrow request and reserves its stock.
    ///
    /// Validation, item availability and the borrower/admin lookups happen before any
    /// write. The borrow, its `PENDING` lines, the reservations and the return-record
    /// placeholder are then written in one transaction. Losing a race for the last
    /// units surfaces as a conflict and rolls everything back.
    pub async fn create_borrow(&self, request: BorrowRequest) -> Result<BorrowOutcome> {
        let total_quantity = validate_lines(&request.lines)?;
        validate_loan_dates(request.date_borrow, request.date_return, &self.policy)?;

        let mut item_names = Vec::with_capacity(request.lines.len());
        for line in &request.lines {
            let item = inventory::get_inventory_by_id(&self.db, line.inventory_id)
                .await?
                .ok_or_else(|| Error::not_found("Inventory", line.inventory_id))?;
            if item.condition != InventoryCondition::Available {
                return Err(Error::NotAvailable {
                    condition: item.condition,
                });
            }
            if item.quantity < line.quantity {
                return Err(Error::InsufficientStock {
                    available: item.quantity,
                    requested: line.quantity,
                });
            }
            item_names.push(item.name);
        }

        let borrower = user::get_user_by_id(&self.db, request.user_id)
            .await?
            .ok_or_else(|| Error::not_found("User", request.user_id))?;
        let admin = user::get_user_by_id(&self.db, request.admin_id)
            .await?
            .ok_or_else(|| Error::not_found("User", request.admin_id))?;
        if !user::has_contact_number(&borrower) || !user::has_contact_number(&admin) {
            return Err(Error::validation(
                "User or admin details are missing a contact number",
            ));
        }

        let txn = self.db.begin().await?;
        let outcome = match self.write_borrow(&txn, &request, total_quantity).await {
            Ok(outcome) => {
                txn.commit().await?;
                outcome
            }
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    warn!("Rollback after failed borrow creation failed: {}", rollback_err);
                }
                return Err(e);
            }
        };

        info!(
            "Created borrow {} for user {} with {} line(s), {} unit(s)",
            outcome.borrow.id,
            borrower.id,
            outcome.details.len(),
            total_quantity
        );

        let timeout = self.notification_timeout();
        let item_name = item_names.join(", ");
        let payload = NotificationPayload {
            recipient_name: borrower.username.clone(),
            borrower_name: borrower.username.clone(),
            item_name,
            date_borrow: outcome.borrow.date_borrow,
            due_date: Some(outcome.return_record.date_return),
            late_days: None,
        };
        notify_best_effort(
            self.notifier.as_ref(),
            &borrower.number,
            NotificationKind::BorrowRequested,
            &payload,
            timeout,
        )
        .await;

        let admin_payload = NotificationPayload {
            recipient_name: admin.username.clone(),
            ..payload
        };
        notify_best_effort(
            self.notifier.as_ref(),
            &admin.number,
            NotificationKind::BorrowRequestReceived,
            &admin_payload,
            timeout,
        )
        .await;

        Ok(outcome)
    }

    async fn write_borrow(
        &self,
        txn: &DatabaseTransaction,
        request: &BorrowRequest,
        total_quantity: i32,
    ) -> Result<BorrowOutcome> {
        let now = Utc::now();

        let created = borrow::ActiveModel {
            quantity: Set(total_quantity),
            date_borrow: Set(request.date_borrow),
            date_return: Set(request.date_return),
            user_id: Set(request.user_id),
            admin_id: Set(request.admin_id),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(txn)
        .await?;

        let mut details = Vec::with_capacity(request.lines.len());
        for line in &request.lines {
            inventory::reserve(txn, line.inventory_id, line.quantity).await?;

            let detail = borrow_detail::ActiveModel {
                borrow_id: Set(created.id),
                inventory_id: Set(line.inventory_id),
                quantity: Set(line.quantity),
                status: Set(BorrowStatus::Pending),
                returned_at: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(txn)
            .await?;
            details.push(detail);
        }

        let due = late_fee::resolve_due_date(
            request.date_return,
            None,
            BorrowStatus::Pending,
            request.date_borrow,
            self.policy.default_loan_days,
        );
        let placeholder = return_record::ActiveModel {
            borrow_id: Set(created.id),
            quantity: Set(total_quantity),
            date_borrow: Set(request.date_borrow),
            date_return: Set(due),
            returned_at: Set(None),
            late_days: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(txn)
        .await?;

        Ok(BorrowOutcome {
            borrow: created,
            details,
            return_record: placeholder,
        })
    }

    /// Moves one borrow line to `target`.
    ///
    /// The actor must be an admin. Rejecting (when the policy restocks on reject) and
    /// returning put the line's units back on the shelf. Returning stamps the return
    /// time, `returned_at` or now, and stores the late days on the borrow's return record.
    pub async fn transition_borrow_detail(
        &self,
        detail_id: i64,
        target: BorrowStatus,
        actor_id: i64,
        returned_at: Option<DateTime<Utc>>,
    ) -> Result<TransitionOutcome> {
        let actor = user::get_user_by_id(&self.db, actor_id)
            .await?
            .ok_or_else(|| Error::not_found("User", actor_id))?;
        if actor.role != UserRole::Admin {
            return Err(Error::Forbidden {
                message: "You do not have permission to update borrow records.".to_string(),
            });
        }

        let detail = get_borrow_detail_by_id(&self.db, detail_id)
            .await?
            .ok_or_else(|| Error::not_found("BorrowDetail", detail_id))?;
        let parent = get_borrow_by_id(&self.db, detail.borrow_id)
            .await?
            .ok_or_else(|| Error::not_found("Borrow", detail.borrow_id))?;

        status::check_transition(detail.status, target, self.policy.allow_pending_return)?;

        let borrower = User::find_by_id(parent.user_id).one(&self.db).await?;
        let item = Inventory::find_by_id(detail.inventory_id).one(&self.db).await?;
        let record_due = ReturnRecord::find()
            .filter(return_record::Column::BorrowId.eq(parent.id))
            .order_by_asc(return_record::Column::Id)
            .one(&self.db)
            .await?
            .map(|r| r.date_return);

        let txn = self.db.begin().await?;
        let outcome = match self
            .write_transition(&txn, &detail, &parent, target, returned_at)
            .await
        {
            Ok(outcome) => {
                txn.commit().await?;
                outcome
            }
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    warn!("Rollback after failed transition failed: {}", rollback_err);
                }
                return Err(e);
            }
        };

        info!(
            "Borrow line {} moved from {} to {} by {}",
            detail_id, outcome.previous, target, actor.username
        );

        let kind = match target {
            BorrowStatus::Active => Some(NotificationKind::BorrowApproved),
            BorrowStatus::Rejected => Some(NotificationKind::BorrowRejected),
            BorrowStatus::Returned => Some(NotificationKind::ItemReturned),
            BorrowStatus::Pending => None,
        };
        match (kind, borrower, item) {
            (Some(kind), Some(borrower), Some(item)) => {
                let payload = NotificationPayload {
                    recipient_name: borrower.username.clone(),
                    borrower_name: borrower.username.clone(),
                    item_name: item.name,
                    date_borrow: parent.date_borrow,
                    due_date: Some(late_fee::resolve_due_date(
                        parent.date_return,
                        record_due,
                        detail.status,
                        parent.date_borrow,
                        self.policy.default_loan_days,
                    )),
                    late_days: outcome
                        .return_record
                        .as_ref()
                        .map(|r| i64::from(r.late_days)),
                };
                notify_best_effort(
                    self.notifier.as_ref(),
                    &borrower.number,
                    kind,
                    &payload,
                    self.notification_timeout(),
                )
                .await;
            }
            (Some(_), _, _) => {
                warn!("User or item details not found. Skipping notification for line {detail_id}.");
            }
            (None, _, _) => {}
        }

        Ok(outcome)
    }

    async fn write_transition(
        &self,
        txn: &DatabaseTransaction,
        detail: &borrow_detail::Model,
        parent: &borrow::Model,
        target: BorrowStatus,
        returned_at: Option<DateTime<Utc>>,
    ) -> Result<TransitionOutcome> {
        let now = Utc::now();
        let returned_at = (target == BorrowStatus::Returned).then(|| returned_at.unwrap_or(now));

        let mut update = BorrowDetail::update_many()
            .col_expr(borrow_detail::Column::Status, Expr::val(target).into())
            .col_expr(borrow_detail::Column::UpdatedAt, Expr::val(now).into());
        if let Some(at) = returned_at {
            update = update.col_expr(borrow_detail::Column::ReturnedAt, Expr::val(at).into());
        }
        let result = update
            .filter(borrow_detail::Column::Id.eq(detail.id))
            .filter(borrow_detail::Column::Status.eq(detail.status))
            .exec(txn)
            .await?;

        if result.rows_affected == 0 {
            // Someone else moved the line since it was read.
            let current = get_borrow_detail_by_id(txn, detail.id)
                .await?
                .ok_or_else(|| Error::not_found("BorrowDetail", detail.id))?;
            return Err(Error::InvalidTransition {
                current: current.status,
                requested: target,
            });
        }

        let released = if status::releases_stock(target, self.policy.restock_on_reject) {
            Some(inventory::release(txn, detail.inventory_id, detail.quantity).await?)
        } else {
            None
        };

        let record = match returned_at {
            Some(at) => Some(self.record_return(txn, detail, parent, at).await?),
            None => None,
        };

        let updated = get_borrow_detail_by_id(txn, detail.id)
            .await?
            .ok_or_else(|| Error::not_found("BorrowDetail", detail.id))?;

        Ok(TransitionOutcome {
            previous: detail.status,
            detail: updated,
            inventory: released,
            return_record: record,
        })
    }

    async fn record_return(
        &self,
        txn: &DatabaseTransaction,
        detail: &borrow_detail::Model,
        parent: &borrow::Model,
        returned_at: DateTime<Utc>,
    ) -> Result<return_record::Model> {
        let existing = ReturnRecord::find()
            .filter(return_record::Column::BorrowId.eq(parent.id))
            .order_by_asc(return_record::Column::Id)
            .one(txn)
            .await?;

        let due = late_fee::resolve_due_date(
            parent.date_return,
            existing.as_ref().map(|r| r.date_return),
            detail.status,
            parent.date_borrow,
            self.policy.default_loan_days,
        );
        let late_days = late_fee::compute_late_days(
            due.date_naive(),
            Some(returned_at.date_naive()),
            returned_at.date_naive(),
        );
        let late_days = late_fee::clamp_late_days(late_days);
        let now = Utc::now();

        let saved = match existing {
            Some(record) => {
                // With several lines the record keeps the worst lateness seen so far.
                let previous_late = if record.returned_at.is_some() {
                    record.late_days
                } else {
                    0
                };
                let mut active: return_record::ActiveModel = record.into();
                active.returned_at = Set(Some(returned_at));
                active.late_days = Set(previous_late.max(late_days));
                active.updated_at = Set(now);
                active.update(txn).await?
            }
            None => {
                return_record::ActiveModel {
                    borrow_id: Set(parent.id),
                    quantity: Set(detail.quantity),
                    date_borrow: Set(parent.date_borrow),
                    date_return: Set(due),
                    returned_at: Set(Some(returned_at)),
                    late_days: Set(late_days),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                }
                .insert(txn)
                .await?
            }
        };

        Ok(saved)
    }

    /// Moves every line of a borrow that can legally reach `target`.
    ///
    /// Lines already in a state that cannot move to `target` are skipped. If no line can
    /// move, the first line's status is reported back as an invalid transition.
    pub async fn transition_borrow(
        &self,
        borrow_id: i64,
        target: BorrowStatus,
        actor_id: i64,
    ) -> Result<Vec<TransitionOutcome>> {
        let details = get_details_for_borrow(&self.db, borrow_id).await?;
        let Some(first) = details.first() else {
            return Err(Error::not_found("Borrow", borrow_id));
        };
        let first_status = first.status;

        let mut outcomes = Vec::new();
        for detail in details.iter().filter(|d| {
            status::can_transition(d.status, target, self.policy.allow_pending_return)
        }) {
            outcomes.push(
                self.transition_borrow_detail(detail.id, target, actor_id, None)
                    .await?,
            );
        }

        if outcomes.is_empty() {
            return Err(Error::InvalidTransition {
                current: first_status,
                requested: target,
            });
        }
        Ok(outcomes)
    }
}

/// Finds a borrow by id.
pub async fn get_borrow_by_id<C>(db: &C, borrow_id: i64) -> Result<Option<borrow::Model>>
where
    C: ConnectionTrait,
{
    Borrow::find_by_id(borrow_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a borrow line by id.
pub async fn get_borrow_detail_by_id<C>(
    db: &C,
    detail_id: i64,
) -> Result<Option<borrow_detail::Model>>
where
    C: ConnectionTrait,
{
    BorrowDetail::find_by_id(detail_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves the lines of a borrow in creation order.
pub async fn get_details_for_borrow(
    db: &DatabaseConnection,
    borrow_id: i64,
) -> Result<Vec<borrow_detail::Model>> {
    BorrowDetail::find()
        .filter(borrow_detail::Column::BorrowId.eq(borrow_id))
        .order_by_asc(borrow_detail::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

async fn attach_names(
    db: &DatabaseConnection,
    rows: Vec<(borrow::Model, Vec<borrow_detail::Model>)>,
) -> Result<Vec<BorrowWithDetails>> {
    let item_names: HashMap<i64, String> = Inventory::find()
        .all(db)
        .await?
        .into_iter()
        .map(|item| (item.id, item.name))
        .collect();
    let user_names: HashMap<i64, String> = User::find()
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u.username))
        .collect();

    Ok(rows
        .into_iter()
        .map(|(borrow, details)| BorrowWithDetails {
            borrower_name: user_names.get(&borrow.user_id).cloned(),
            details: details
                .into_iter()
                .map(|detail| DetailWithItem {
                    item_name: item_names.get(&detail.inventory_id).cloned(),
                    detail,
                })
                .collect(),
            borrow,
        })
        .collect())
}

async fn load_details(
    db: &DatabaseConnection,
    borrows: Vec<borrow::Model>,
) -> Result<Vec<BorrowWithDetails>> {
    let ids: Vec<i64> = borrows.iter().map(|b| b.id).collect();
    let mut by_borrow: HashMap<i64, Vec<borrow_detail::Model>> = HashMap::new();
    if !ids.is_empty() {
        for detail in BorrowDetail::find()
            .filter(borrow_detail::Column::BorrowId.is_in(ids))
            .order_by_asc(borrow_detail::Column::Id)
            .all(db)
            .await?
        {
            by_borrow.entry(detail.borrow_id).or_default().push(detail);
        }
    }

    let rows = borrows
        .into_iter()
        .map(|b| {
            let details = by_borrow.remove(&b.id).unwrap_or_default();
            (b, details)
        })
        .collect();
    attach_names(db, rows).await
}

/// Retrieves every borrow with its lines, latest borrow date first.
pub async fn get_all_borrows(db: &DatabaseConnection) -> Result<Vec<BorrowWithDetails>> {
    let borrows = Borrow::find()
        .order_by_desc(borrow::Column::DateBorrow)
        .order_by_desc(borrow::Column::Id)
        .all(db)
        .await?;
    load_details(db, borrows).await
}

/// Retrieves a user's borrows with their lines, latest borrow date first.
pub async fn get_borrows_for_user(
    db: &DatabaseConnection,
    user_id: i64,
) -> Result<Vec<BorrowWithDetails>> {
    let borrows = Borrow::find()
        .filter(borrow::Column::UserId.eq(user_id))
        .order_by_desc(borrow::Column::DateBorrow)
        .order_by_desc(borrow::Column::Id)
        .all(db)
        .await?;
    load_details(db, borrows).await
}

/// Editable fields of a borrow
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BorrowPatch {
    /// New due date
    pub date_return: Option<DateTime<Utc>>,
}

impl BorrowPatch {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.date_return.is_none()
    }
}

/// Applies a patch to a borrow.
///
/// A new due date is validated like a fresh request. The return record's due-date
/// snapshot follows along while the items are still out.
pub async fn update_borrow(
    db: &DatabaseConnection,
    borrow_id: i64,
    patch: BorrowPatch,
    policy: &LoanPolicy,
) -> Result<borrow::Model> {
    let Some(date_return) = patch.date_return else {
        return Err(Error::validation("No fields to update"));
    };

    let existing = get_borrow_by_id(db, borrow_id)
        .await?
        .ok_or_else(|| Error::not_found("Borrow", borrow_id))?;
    validate_loan_dates(existing.date_borrow, Some(date_return), policy)?;

    let now = Utc::now();
    let txn = db.begin().await?;

    let mut active: borrow::ActiveModel = existing.into();
    active.date_return = Set(Some(date_return));
    active.updated_at = Set(now);
    let updated = active.update(&txn).await?;

    ReturnRecord::update_many()
        .col_expr(return_record::Column::DateReturn, Expr::val(date_return).into())
        .col_expr(return_record::Column::UpdatedAt, Expr::val(now).into())
        .filter(return_record::Column::BorrowId.eq(borrow_id))
        .filter(return_record::Column::ReturnedAt.is_null())
        .exec(&txn)
        .await?;

    txn.commit().await?;
    info!("Borrow {} due date changed to {}", borrow_id, date_return);
    Ok(updated)
}
