//! Dashboard reporting.
//!
//! This module summarises the state of every borrow line: how many are out, back,
//! waiting or declined, which items are asked for most, and which requests still wait
//! for an admin. All functions are read-only and return structured data that an API
//! layer can serialize as-is.

use crate::{
    entities::{Borrow, BorrowDetail, BorrowStatus, Inventory, borrow_detail},
    errors::Result,
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, prelude::*};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Line counts per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    /// Lines currently `ACTIVE`
    pub borrowed: u64,
    pub returned: u64,
    pub pending: u64,
    pub rejected: u64,
}

impl StatusCounts {
    fn record(&mut self, status: BorrowStatus) {
        match status {
            BorrowStatus::Active => self.borrowed += 1,
            BorrowStatus::Returned => self.returned += 1,
            BorrowStatus::Pending => self.pending += 1,
            BorrowStatus::Rejected => self.rejected += 1,
        }
    }

    /// Total number of lines counted
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.borrowed + self.returned + self.pending + self.rejected
    }
}

/// How often an item appears on borrow lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemUsage {
    pub inventory_id: i64,
    pub item_name: String,
    /// Number of borrow lines referencing the item
    pub times_requested: u64,
    /// Units requested across those lines
    pub units_requested: i64,
}

/// A line still waiting for an admin decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingRequest {
    pub detail_id: i64,
    pub inventory_id: i64,
    pub item_name: String,
    pub quantity: i32,
    pub request_date: DateTime<Utc>,
}

/// Dashboard data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub counts: StatusCounts,
    /// Most requested items first
    pub popular_items: Vec<ItemUsage>,
    /// Pending lines keyed by borrower id
    pub pending_requests: BTreeMap<i64, Vec<PendingRequest>>,
}

const UNKNOWN_ITEM: &str = "Unknown Item";

/// Builds the dashboard summary.
///
/// # Arguments
/// * `db` - Database connection
/// * `popular_limit` - Maximum number of items in the popularity list
pub async fn generate_dashboard(
    db: &DatabaseConnection,
    popular_limit: usize,
) -> Result<DashboardSummary> {
    let details = BorrowDetail::find()
        .order_by_asc(borrow_detail::Column::Id)
        .all(db)
        .await?;
    if details.is_empty() {
        return Ok(DashboardSummary::default());
    }

    let item_names: HashMap<i64, String> = Inventory::find()
        .all(db)
        .await?
        .into_iter()
        .map(|item| (item.id, item.name))
        .collect();
    let borrows: HashMap<i64, (i64, DateTime<Utc>)> = Borrow::find()
        .all(db)
        .await?
        .into_iter()
        .map(|b| (b.id, (b.user_id, b.date_borrow)))
        .collect();
    let name_of = |inventory_id: i64| {
        item_names
            .get(&inventory_id)
            .cloned()
            .unwrap_or_else(|| UNKNOWN_ITEM.to_string())
    };

    let mut counts = StatusCounts::default();
    let mut usage: HashMap<i64, (u64, i64)> = HashMap::new();
    let mut pending_requests: BTreeMap<i64, Vec<PendingRequest>> = BTreeMap::new();

    for detail in &details {
        counts.record(detail.status);

        let entry = usage.entry(detail.inventory_id).or_default();
        entry.0 += 1;
        entry.1 += i64::from(detail.quantity);

        if detail.status == BorrowStatus::Pending {
            // Lines whose borrow is gone cannot be attributed to anyone.
            if let Some(&(user_id, request_date)) = borrows.get(&detail.borrow_id) {
                pending_requests
                    .entry(user_id)
                    .or_default()
                    .push(PendingRequest {
                        detail_id: detail.id,
                        inventory_id: detail.inventory_id,
                        item_name: name_of(detail.inventory_id),
                        quantity: detail.quantity,
                        request_date,
                    });
            }
        }
    }

    let mut popular_items: Vec<ItemUsage> = usage
        .into_iter()
        .map(|(inventory_id, (times_requested, units_requested))| ItemUsage {
            inventory_id,
            item_name: name_of(inventory_id),
            times_requested,
            units_requested,
        })
        .collect();
    popular_items.sort_by(|a, b| {
        b.times_requested
            .cmp(&a.times_requested)
            .then_with(|| b.units_requested.cmp(&a.units_requested))
            .then_with(|| a.inventory_id.cmp(&b.inventory_id))
    });
    popular_items.truncate(popular_limit);

    Ok(DashboardSummary {
        counts,
        popular_items,
        pending_requests,
    })
}
