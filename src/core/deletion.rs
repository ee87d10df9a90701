//! Deletion with dependency checks.
//!
//! A user, an inventory item or a borrow that still has dependent rows is only removed
//! when the caller asks for a cascade. A cascade runs in one transaction and removes the
//! dependents first. Lines still holding stock (`PENDING` or `ACTIVE`) give their units
//! back before they disappear, so the shelf count stays whole.

use crate::{
    core::inventory,
    entities::{
        Borrow, BorrowDetail, BorrowStatus, Inventory, ReturnRecord, User, borrow,
        borrow_detail, return_record,
    },
    errors::{Error, Result},
};
use sea_orm::{
    Condition, DatabaseTransaction, PaginatorTrait, QuerySelect, TransactionTrait, prelude::*,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

/// Kinds of record that can be deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    User,
    Inventory,
    Borrow,
}

impl EntityKind {
    const fn name(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Inventory => "inventory",
            Self::Borrow => "borrow",
        }
    }

    const fn dependents(self) -> &'static str {
        match self {
            Self::User => "borrow record(s)",
            Self::Inventory | Self::Borrow => "borrow detail(s)",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a deletion removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeletionReport {
    pub borrows: u64,
    pub details: u64,
    pub return_records: u64,
    /// Units put back on the shelf from outstanding lines
    pub units_released: i64,
}

async fn ensure_exists(db: &DatabaseConnection, kind: EntityKind, id: i64) -> Result<()> {
    let found = match kind {
        EntityKind::User => User::find_by_id(id).count(db).await?,
        EntityKind::Inventory => Inventory::find_by_id(id).count(db).await?,
        EntityKind::Borrow => Borrow::find_by_id(id).count(db).await?,
    };
    if found == 0 {
        let entity = match kind {
            EntityKind::User => "User",
            EntityKind::Inventory => "Inventory",
            EntityKind::Borrow => "Borrow",
        };
        return Err(Error::not_found(entity, id));
    }
    Ok(())
}

/// Number of rows that block deleting `id` without a cascade.
pub async fn count_dependents(db: &DatabaseConnection, kind: EntityKind, id: i64) -> Result<u64> {
    let count = match kind {
        EntityKind::User => {
            Borrow::find()
                .filter(
                    Condition::any()
                        .add(borrow::Column::UserId.eq(id))
                        .add(borrow::Column::AdminId.eq(id)),
                )
                .count(db)
                .await?
        }
        EntityKind::Inventory => {
            BorrowDetail::find()
                .filter(borrow_detail::Column::InventoryId.eq(id))
                .count(db)
                .await?
        }
        EntityKind::Borrow => {
            BorrowDetail::find()
                .filter(borrow_detail::Column::BorrowId.eq(id))
                .count(db)
                .await?
        }
    };
    Ok(count)
}

/// Deletes a user, inventory item or borrow.
///
/// Without `cascade`, dependent rows make this fail with a dependency error naming
/// their count. With `cascade`, dependents go first and the whole removal commits or
/// rolls back as one.
pub async fn delete_entity(
    db: &DatabaseConnection,
    kind: EntityKind,
    id: i64,
    cascade: bool,
) -> Result<DeletionReport> {
    ensure_exists(db, kind, id).await?;

    let count = count_dependents(db, kind, id).await?;
    if count > 0 && !cascade {
        return Err(Error::Dependency {
            entity: kind.name(),
            count,
            dependents: kind.dependents(),
        });
    }

    let txn = db.begin().await?;
    let report = match delete_in(&txn, kind, id).await {
        Ok(report) => {
            txn.commit().await?;
            report
        }
        Err(e) => {
            if let Err(rollback_err) = txn.rollback().await {
                warn!("Rollback after failed deletion failed: {}", rollback_err);
            }
            return Err(e);
        }
    };

    info!(
        "Deleted {} {} ({} borrow(s), {} detail(s), {} return record(s), {} unit(s) restocked)",
        kind,
        id,
        report.borrows,
        report.details,
        report.return_records,
        report.units_released
    );
    Ok(report)
}

async fn delete_in(txn: &DatabaseTransaction, kind: EntityKind, id: i64) -> Result<DeletionReport> {
    let mut report = DeletionReport::default();

    match kind {
        EntityKind::User => {
            let borrow_ids: Vec<i64> = Borrow::find()
                .select_only()
                .column(borrow::Column::Id)
                .filter(
                    Condition::any()
                        .add(borrow::Column::UserId.eq(id))
                        .add(borrow::Column::AdminId.eq(id)),
                )
                .into_tuple()
                .all(txn)
                .await?;
            remove_borrows(txn, &borrow_ids, &mut report).await?;
            User::delete_by_id(id).exec(txn).await?;
        }
        EntityKind::Inventory => {
            // The item itself is going away, so its lines have nothing to restock.
            report.details = BorrowDetail::delete_many()
                .filter(borrow_detail::Column::InventoryId.eq(id))
                .exec(txn)
                .await?
                .rows_affected;
            Inventory::delete_by_id(id).exec(txn).await?;
        }
        EntityKind::Borrow => {
            remove_borrows(txn, &[id], &mut report).await?;
        }
    }

    Ok(report)
}

async fn remove_borrows(
    txn: &DatabaseTransaction,
    borrow_ids: &[i64],
    report: &mut DeletionReport,
) -> Result<()> {
    if borrow_ids.is_empty() {
        return Ok(());
    }

    let outstanding = BorrowDetail::find()
        .filter(borrow_detail::Column::BorrowId.is_in(borrow_ids.iter().copied()))
        .filter(
            borrow_detail::Column::Status.is_in([BorrowStatus::Pending, BorrowStatus::Active]),
        )
        .all(txn)
        .await?;
    for line in outstanding {
        inventory::release(txn, line.inventory_id, line.quantity).await?;
        report.units_released += i64::from(line.quantity);
    }

    report.details = BorrowDetail::delete_many()
        .filter(borrow_detail::Column::BorrowId.is_in(borrow_ids.iter().copied()))
        .exec(txn)
        .await?
        .rows_affected;
    report.return_records = ReturnRecord::delete_many()
        .filter(return_record::Column::BorrowId.is_in(borrow_ids.iter().copied()))
        .exec(txn)
        .await?
        .rows_affected;
    report.borrows = Borrow::delete_many()
        .filter(borrow::Column::Id.is_in(borrow_ids.iter().copied()))
        .exec(txn)
        .await?
        .rows_affected;

    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::borrow::{self, BorrowRequest};
    use crate::entities::UserRole;
    use crate::errors::ErrorKind;
    use crate::test_utils::*;
    use chrono::{Duration, Utc};
    use std::sync::Arc;

    async fn lend(
        db: &DatabaseConnection,
        user_id: i64,
        admin_id: i64,
        inventory_id: i64,
    ) -> Result<borrow::BorrowOutcome> {
        let start = Utc::now();
        test_service(db, Arc::new(RecordingNotifier::default()))
            .create_borrow(BorrowRequest::single(
                user_id,
                admin_id,
                inventory_id,
                1,
                start,
                Some(start + Duration::days(3)),
            ))
            .await
    }

    #[tokio::test]
    async fn test_refusal_names_dependents_then_cascade() -> Result<()> {
        let (db, borrower, admin) = setup_with_people().await?;
        let item = create_test_item(&db, "PRJ-001", 10).await?;
        let mut detail_ids = Vec::new();
        for _ in 0..3 {
            detail_ids.extend(lend(&db, borrower.id, admin.id, item.id).await?.detail_ids());
        }

        let refused = delete_entity(&db, EntityKind::Inventory, item.id, false).await;
        let err = refused.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Dependency);
        assert!(err.to_string().contains("3 related borrow detail(s)"));
        assert!(inventory::get_inventory_by_id(&db, item.id).await?.is_some());

        let report = delete_entity(&db, EntityKind::Inventory, item.id, true).await?;
        assert_eq!(report.details, 3);
        assert!(inventory::get_inventory_by_id(&db, item.id).await?.is_none());
        for detail_id in detail_ids {
            assert!(borrow::get_borrow_detail_by_id(&db, detail_id).await?.is_none());
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_without_dependents() -> Result<()> {
        let db = setup_test_db().await?;
        let item = create_test_item(&db, "PRJ-001", 1).await?;

        let report = delete_entity(&db, EntityKind::Inventory, item.id, false).await?;
        assert_eq!(report, DeletionReport::default());

        let again = delete_entity(&db, EntityKind::Inventory, item.id, false).await;
        assert!(matches!(again, Err(Error::NotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_borrow_cascade_restocks_outstanding_lines() -> Result<()> {
        let (db, borrower, admin) = setup_with_people().await?;
        let item = create_test_item(&db, "PRJ-001", 2).await?;
        let outcome = lend(&db, borrower.id, admin.id, item.id).await?;

        let refused = delete_entity(&db, EntityKind::Borrow, outcome.borrow_id(), false).await;
        assert!(matches!(
            refused,
            Err(Error::Dependency { count: 1, .. })
        ));

        let report = delete_entity(&db, EntityKind::Borrow, outcome.borrow_id(), true).await?;
        assert_eq!(report.borrows, 1);
        assert_eq!(report.details, 1);
        assert_eq!(report.return_records, 1);
        assert_eq!(report.units_released, 1);

        let restored = inventory::get_inventory_by_id(&db, item.id).await?.unwrap();
        assert_eq!(restored.quantity, 2);
        assert!(borrow::get_borrow_by_id(&db, outcome.borrow_id()).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_user_cascade_covers_admin_side() -> Result<()> {
        let (db, borrower, admin) = setup_with_people().await?;
        let other = create_test_user(&db, "budi", UserRole::Borrower).await?;
        let item = create_test_item(&db, "PRJ-001", 5).await?;
        lend(&db, borrower.id, admin.id, item.id).await?;
        lend(&db, other.id, admin.id, item.id).await?;

        let refused = delete_entity(&db, EntityKind::User, admin.id, false).await;
        assert!(matches!(
            refused,
            Err(Error::Dependency {
                entity: "user",
                count: 2,
                dependents: "borrow record(s)"
            })
        ));

        let report = delete_entity(&db, EntityKind::User, admin.id, true).await?;
        assert_eq!(report.borrows, 2);
        assert_eq!(report.units_released, 2);
        assert_eq!(count_dependents(&db, EntityKind::User, borrower.id).await?, 0);
        assert!(
            crate::core::user::get_user_by_id(&db, admin.id)
                .await?
                .is_none()
        );
        Ok(())
    }

    #[test]
    fn test_entity_kind_names() {
        assert_eq!(EntityKind::Inventory.to_string(), "inventory");
        assert_eq!(EntityKind::User.dependents(), "borrow record(s)");
    }
}
