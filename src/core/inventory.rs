//! Inventory ledger - Stock levels and condition for lendable items.
//!
//! This module owns every mutation of `inventories.quantity`. Reservations and releases
//! are single conditional `UPDATE` statements, so two borrows racing for the last unit
//! cannot both win: the loser's update matches no row and is reported as a conflict.
//! After any quantity change the condition is reconciled so that an item is
//! `Out of Stock` exactly when its quantity is zero.

use crate::{
    config::app::InventorySeed,
    entities::{Inventory, InventoryCondition, inventory},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, prelude::*, sea_query::Expr};
use serde::Deserialize;
use tracing::{debug, info};

/// Partial update of an inventory item. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InventoryPatch {
    pub name: Option<String>,
    pub code: Option<String>,
    pub quantity: Option<i32>,
    pub condition: Option<InventoryCondition>,
}

impl InventoryPatch {
    /// Whether the patch carries no field at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.code.is_none()
            && self.quantity.is_none()
            && self.condition.is_none()
    }
}

/// Outcome of reconciling a requested stock edit with the current row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockLevel {
    pub quantity: i32,
    pub condition: InventoryCondition,
    /// Whether the item crossed the out-of-stock boundary
    pub stamp: bool,
}

/// Applies an admin stock edit to the current quantity and condition.
///
/// Asking for `Out of Stock` with a non-zero quantity is rejected. A quantity of zero
/// forces `Out of Stock`; raising the quantity of an out-of-stock item makes it
/// `Available` again unless the edit names another condition.
pub fn reconcile_stock(
    current_quantity: i32,
    current_condition: InventoryCondition,
    requested_quantity: Option<i32>,
    requested_condition: Option<InventoryCondition>,
) -> Result<StockLevel> {
    let quantity = requested_quantity.unwrap_or(current_quantity);
    if quantity < 0 {
        return Err(Error::validation("Quantity cannot be negative"));
    }

    if requested_condition == Some(InventoryCondition::OutOfStock) && quantity != 0 {
        return Err(Error::validation(
            "Cannot set condition to Out of Stock while quantity is not zero",
        ));
    }

    let mut condition = requested_condition.unwrap_or(current_condition);
    if quantity == 0 {
        condition = InventoryCondition::OutOfStock;
    } else if condition == InventoryCondition::OutOfStock {
        condition = InventoryCondition::Available;
    }

    Ok(StockLevel {
        quantity,
        condition,
        stamp: (condition == InventoryCondition::OutOfStock)
            != (current_condition == InventoryCondition::OutOfStock),
    })
}

/// Retrieves all inventory items, newest first.
pub async fn get_all_inventory(db: &DatabaseConnection) -> Result<Vec<inventory::Model>> {
    Inventory::find()
        .order_by_desc(inventory::Column::CreatedAt)
        .order_by_desc(inventory::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds an inventory item by its unique ID.
pub async fn get_inventory_by_id<C>(db: &C, inventory_id: i64) -> Result<Option<inventory::Model>>
where
    C: ConnectionTrait,
{
    Inventory::find_by_id(inventory_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds an inventory item by its label code.
pub async fn get_inventory_by_code(
    db: &DatabaseConnection,
    code: &str,
) -> Result<Option<inventory::Model>> {
    Inventory::find()
        .filter(inventory::Column::Code.eq(code))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates a new inventory item.
///
/// The code must be unique. An item created with zero quantity starts out of stock.
pub async fn create_inventory(
    db: &DatabaseConnection,
    name: String,
    code: String,
    quantity: i32,
) -> Result<inventory::Model> {
    if name.trim().is_empty() {
        return Err(Error::validation("Inventory name cannot be empty"));
    }
    if code.trim().is_empty() {
        return Err(Error::validation("Inventory code cannot be empty"));
    }
    if quantity < 0 {
        return Err(Error::validation("Quantity cannot be negative"));
    }

    let code = code.trim().to_string();
    if get_inventory_by_code(db, &code).await?.is_some() {
        return Err(Error::AlreadyExists {
            entity: "Inventory",
            field: "code",
            value: code,
        });
    }

    let now = Utc::now();
    let condition = if quantity == 0 {
        InventoryCondition::OutOfStock
    } else {
        InventoryCondition::Available
    };

    let item = inventory::ActiveModel {
        name: Set(name.trim().to_string()),
        code: Set(code),
        quantity: Set(quantity),
        condition: Set(condition),
        last_stock_update: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!("Created inventory item {} ({})", item.id, item.code);
    Ok(item)
}

/// Applies an admin edit to an inventory item.
///
/// Stock changes go through [`reconcile_stock`], so the condition/quantity invariant
/// holds after every edit. Only the fields present in the patch are written.
pub async fn update_inventory(
    db: &DatabaseConnection,
    inventory_id: i64,
    patch: InventoryPatch,
) -> Result<inventory::Model> {
    if patch.is_empty() {
        return Err(Error::validation("No valid data provided for update"));
    }

    let existing = get_inventory_by_id(db, inventory_id)
        .await?
        .ok_or_else(|| Error::not_found("Inventory", inventory_id))?;

    write_inventory_patch(db, &existing, patch).await
}

/// Writes `patch` over the row `existing` was read from.
///
/// A stock edit is computed from `existing`, so it only applies while the stored quantity
/// and condition still match it. A borrow or return landing in between makes the update
/// match no row, which is reported as [`Error::StaleWrite`].
async fn write_inventory_patch(
    db: &DatabaseConnection,
    existing: &inventory::Model,
    patch: InventoryPatch,
) -> Result<inventory::Model> {
    let now = Utc::now();
    let mut changes = inventory::ActiveModel {
        updated_at: Set(now),
        ..Default::default()
    };

    if let Some(name) = patch.name {
        if name.trim().is_empty() {
            return Err(Error::validation("Inventory name cannot be empty"));
        }
        changes.name = Set(name.trim().to_string());
    }

    if let Some(code) = patch.code {
        let code = code.trim().to_string();
        if code.is_empty() {
            return Err(Error::validation("Inventory code cannot be empty"));
        }
        if code != existing.code && get_inventory_by_code(db, &code).await?.is_some() {
            return Err(Error::AlreadyExists {
                entity: "Inventory",
                field: "code",
                value: code,
            });
        }
        changes.code = Set(code);
    }

    let stock_edit = patch.quantity.is_some() || patch.condition.is_some();
    let mut update = Inventory::update_many().filter(inventory::Column::Id.eq(existing.id));

    if stock_edit {
        let level = reconcile_stock(
            existing.quantity,
            existing.condition,
            patch.quantity,
            patch.condition,
        )?;
        changes.quantity = Set(level.quantity);
        changes.condition = Set(level.condition);
        if level.stamp || patch.quantity.is_some() {
            changes.last_stock_update = Set(Some(now));
        }
        update = update
            .filter(inventory::Column::Quantity.eq(existing.quantity))
            .filter(inventory::Column::Condition.eq(existing.condition));
    }

    let result = update.set(changes).exec(db).await?;
    if result.rows_affected == 0 {
        if stock_edit {
            return Err(Error::StaleWrite {
                entity: "Inventory",
                id: existing.id,
            });
        }
        return Err(Error::not_found("Inventory", existing.id));
    }

    let updated = get_inventory_by_id(db, existing.id)
        .await?
        .ok_or_else(|| Error::not_found("Inventory", existing.id))?;
    info!(
        "Updated inventory item {}: quantity {}, condition {}",
        updated.id, updated.quantity, updated.condition
    );
    Ok(updated)
}

async fn mark_out_of_stock_if_empty<C>(db: &C, inventory_id: i64, now: DateTime<Utc>) -> Result<()>
where
    C: ConnectionTrait,
{
    Inventory::update_many()
        .set(inventory::ActiveModel {
            condition: Set(InventoryCondition::OutOfStock),
            last_stock_update: Set(Some(now)),
            ..Default::default()
        })
        .filter(inventory::Column::Id.eq(inventory_id))
        .filter(inventory::Column::Quantity.lte(0))
        .exec(db)
        .await?;
    Ok(())
}

/// Takes `quantity` units of an item off the shelf.
///
/// The decrement only applies while the item is `Available` and holds enough stock; the
/// check and the write are one statement. Reaching zero flips the item to
/// `Out of Stock`.
pub async fn reserve<C>(db: &C, inventory_id: i64, quantity: i32) -> Result<inventory::Model>
where
    C: ConnectionTrait,
{
    if quantity <= 0 {
        return Err(Error::validation("Quantity must be a positive number"));
    }

    let now = Utc::now();
    let result = Inventory::update_many()
        .col_expr(
            inventory::Column::Quantity,
            Expr::col(inventory::Column::Quantity).sub(quantity),
        )
        .col_expr(inventory::Column::UpdatedAt, Expr::val(now).into())
        .filter(inventory::Column::Id.eq(inventory_id))
        .filter(inventory::Column::Condition.eq(InventoryCondition::Available))
        .filter(inventory::Column::Quantity.gte(quantity))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        let item = get_inventory_by_id(db, inventory_id)
            .await?
            .ok_or_else(|| Error::not_found("Inventory", inventory_id))?;
        debug!(
            "Reservation of {} from item {} refused ({} in stock, {})",
            quantity, inventory_id, item.quantity, item.condition
        );
        if item.condition != InventoryCondition::Available {
            return Err(Error::NotAvailable {
                condition: item.condition,
            });
        }
        return Err(Error::InsufficientStock {
            available: item.quantity,
            requested: quantity,
        });
    }

    mark_out_of_stock_if_empty(db, inventory_id, now).await?;

    get_inventory_by_id(db, inventory_id)
        .await?
        .ok_or_else(|| Error::not_found("Inventory", inventory_id))
}

/// Puts `quantity` units of an item back on the shelf.
///
/// An item that was `Out of Stock` becomes `Available` again.
pub async fn release<C>(db: &C, inventory_id: i64, quantity: i32) -> Result<inventory::Model>
where
    C: ConnectionTrait,
{
    if quantity <= 0 {
        return Err(Error::validation("Quantity must be a positive number"));
    }

    let now = Utc::now();
    let result = Inventory::update_many()
        .col_expr(
            inventory::Column::Quantity,
            Expr::col(inventory::Column::Quantity).add(quantity),
        )
        .col_expr(inventory::Column::UpdatedAt, Expr::val(now).into())
        .filter(inventory::Column::Id.eq(inventory_id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::not_found("Inventory", inventory_id));
    }

    Inventory::update_many()
        .set(inventory::ActiveModel {
            condition: Set(InventoryCondition::Available),
            last_stock_update: Set(Some(now)),
            ..Default::default()
        })
        .filter(inventory::Column::Id.eq(inventory_id))
        .filter(inventory::Column::Condition.eq(InventoryCondition::OutOfStock))
        .filter(inventory::Column::Quantity.gt(0))
        .exec(db)
        .await?;

    get_inventory_by_id(db, inventory_id)
        .await?
        .ok_or_else(|| Error::not_found("Inventory", inventory_id))
}

/// Creates the configured seed items whose code is not in the database yet.
///
/// Returns how many items were created. Existing codes are skipped, never updated.
pub async fn seed_inventory(db: &DatabaseConnection, seeds: &[InventorySeed]) -> Result<usize> {
    info!(
        "Starting to seed inventory. Found {} items in configuration.",
        seeds.len()
    );

    let mut created = 0;
    for seed in seeds {
        if get_inventory_by_code(db, seed.code.trim()).await?.is_some() {
            debug!("Inventory code '{}' already exists. Skipping.", seed.code);
            continue;
        }
        create_inventory(db, seed.name.clone(), seed.code.clone(), seed.quantity).await?;
        created += 1;
    }

    info!("Seeded {} new inventory item(s)", created);
    Ok(created)
}
