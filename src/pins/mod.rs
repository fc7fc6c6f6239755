//! Pinning items within a container.
//!
//! Issues and pull requests of one container keep separate pin orders.
//! Pinned items hold the ranks `1..=n` with no gaps; `pin_order = 0` means
//! unpinned. Every function taking a `Transaction` must run inside the
//! storage mutation protocol so the rank shifts commit or roll back as one.

pub mod rank;

use rusqlite::{Connection, Transaction, params};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{MetaError, Result};
use crate::model::{EventType, Item, ItemKind};
use crate::storage::MutationContext;
use crate::storage::directory::{self, ITEM_COLUMNS, item_from_row};

pub use rank::RankDefect;

/// Pins allowed per (container, kind) unless configured otherwise.
pub const DEFAULT_MAX_PINNED: i64 = 3;

/// Capacity settings for pinning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinLimits {
    pub max_pinned: i64,
}

impl Default for PinLimits {
    fn default() -> Self {
        Self {
            max_pinned: DEFAULT_MAX_PINNED,
        }
    }
}

/// Pin state of an item after a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "rank", rename_all = "snake_case")]
pub enum PinState {
    Pinned(i64),
    Unpinned,
}

/// Pin an item at the end of its order. Returns `false` if already pinned.
///
/// # Errors
///
/// Returns `CapacityExceeded` when the (container, kind) is full, `NotFound`
/// for an unknown item, or a database error.
pub fn pin(
    tx: &Transaction<'_>,
    ctx: &mut MutationContext,
    item_id: i64,
    limits: PinLimits,
) -> Result<bool> {
    let item = directory::require_item(tx, item_id)?;
    if item.is_pinned() {
        debug!(item_id, rank = item.pin_order, "Item already pinned");
        return Ok(false);
    }

    let max = rank::max_rank(tx, item.container_id, item.kind)?;
    if max >= limits.max_pinned {
        return Err(MetaError::CapacityExceeded {
            container_id: item.container_id,
            kind: item.kind.to_string(),
            max: limits.max_pinned,
        });
    }

    let new_rank = max + 1;
    rank::set_rank(tx, item_id, new_rank)?;
    ctx.record_field_change(
        EventType::Pinned,
        item_id,
        None,
        Some(new_rank.to_string()),
        None,
    );
    info!(item_id, rank = new_rank, "Pinned item");
    Ok(true)
}

/// Unpin an item and close the gap. Returns `false` if it was not pinned.
///
/// # Errors
///
/// Returns `NotFound` for an unknown item, or a database error.
pub fn unpin(tx: &Transaction<'_>, ctx: &mut MutationContext, item_id: i64) -> Result<bool> {
    let item = directory::require_item(tx, item_id)?;
    if !item.is_pinned() {
        debug!(item_id, "Item not pinned");
        return Ok(false);
    }

    let shifted = rank::decrement_above(tx, item.container_id, item.kind, item.pin_order)?;
    rank::set_rank(tx, item_id, 0)?;
    ctx.record_field_change(
        EventType::Unpinned,
        item_id,
        Some(item.pin_order.to_string()),
        None,
        None,
    );
    info!(item_id, old_rank = item.pin_order, shifted, "Unpinned item");
    Ok(true)
}

/// Pin an unpinned item or unpin a pinned one.
///
/// # Errors
///
/// Same as [`pin`] and [`unpin`].
pub fn pin_or_unpin(
    tx: &Transaction<'_>,
    ctx: &mut MutationContext,
    item_id: i64,
    limits: PinLimits,
) -> Result<PinState> {
    let item = directory::require_item(tx, item_id)?;
    if item.is_pinned() {
        unpin(tx, ctx, item_id)?;
        return Ok(PinState::Unpinned);
    }
    pin(tx, ctx, item_id, limits)?;
    let pinned = directory::require_item(tx, item_id)?;
    Ok(PinState::Pinned(pinned.pin_order))
}

/// Move a pinned item to `position`, shifting the others.
///
/// Positions past the end are clamped to the last slot (the current pin
/// count), so ranks stay dense at `1..=count` with no gaps. Returns the final
/// rank, or 0 when the item is not pinned (nothing changes).
///
/// # Errors
///
/// Returns `InvalidPosition` for positions below 1, `NotFound` for an
/// unknown item, or a database error.
pub fn move_pin(tx: &Transaction<'_>, item_id: i64, position: i64) -> Result<i64> {
    let item = directory::require_item(tx, item_id)?;
    if !item.is_pinned() {
        debug!(item_id, "Ignoring move of unpinned item");
        return Ok(0);
    }
    if position < 1 {
        return Err(MetaError::InvalidPosition { position });
    }

    let max = rank::max_rank(tx, item.container_id, item.kind)?;
    let target = position.min(max);
    if target == item.pin_order {
        return Ok(target);
    }

    // Close the old slot, then open the new one. The item's own row may be
    // shifted too; set_rank overwrites it last.
    rank::decrement_above(tx, item.container_id, item.kind, item.pin_order)?;
    rank::increment_from(tx, item.container_id, item.kind, target)?;
    rank::set_rank(tx, item_id, target)?;

    info!(item_id, from = item.pin_order, to = target, "Moved pin");
    Ok(target)
}

/// Pinned items of a (container, kind), in rank order.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn pinned_items(conn: &Connection, container_id: i64, kind: ItemKind) -> Result<Vec<Item>> {
    let sql = format!(
        "SELECT {ITEM_COLUMNS} FROM items
         WHERE container_id = ? AND kind = ? AND pin_order > 0
         ORDER BY pin_order, id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let items = stmt
        .query_map(params![container_id, kind.as_str()], item_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(items)
}

/// Whether one more item of `kind` may be pinned in the container.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn is_new_pin_allowed(
    conn: &Connection,
    container_id: i64,
    kind: ItemKind,
    limits: PinLimits,
) -> Result<bool> {
    Ok(rank::max_rank(conn, container_id, kind)? < limits.max_pinned)
}
