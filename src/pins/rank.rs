//! Pin rank storage.
//!
//! Ranks live in `items.pin_order`. Within one (container, kind) the pinned
//! items hold exactly the ranks `1..=n`; the shift helpers here are the only
//! range updates, and callers run them inside one transaction.

use rusqlite::{Connection, params};
use serde::Serialize;
use std::fmt;

use crate::error::Result;
use crate::model::ItemKind;

/// Highest rank in use, 0 when nothing is pinned.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn max_rank(conn: &Connection, container_id: i64, kind: ItemKind) -> Result<i64> {
    let max: i64 = conn.query_row(
        "SELECT COALESCE(MAX(pin_order), 0) FROM items WHERE container_id = ? AND kind = ?",
        params![container_id, kind.as_str()],
        |row| row.get(0),
    )?;
    Ok(max)
}

/// Shift every rank above `rank` down by one.
///
/// # Errors
///
/// Returns an error if the database update fails.
pub fn decrement_above(
    conn: &Connection,
    container_id: i64,
    kind: ItemKind,
    rank: i64,
) -> Result<usize> {
    let rows = conn.execute(
        "UPDATE items SET pin_order = pin_order - 1
         WHERE container_id = ? AND kind = ? AND pin_order > ?",
        params![container_id, kind.as_str(), rank],
    )?;
    Ok(rows)
}

/// Shift every pinned rank at or above `rank` up by one.
///
/// # Errors
///
/// Returns an error if the database update fails.
pub fn increment_from(
    conn: &Connection,
    container_id: i64,
    kind: ItemKind,
    rank: i64,
) -> Result<usize> {
    let rows = conn.execute(
        "UPDATE items SET pin_order = pin_order + 1
         WHERE container_id = ? AND kind = ? AND pin_order >= ? AND pin_order > 0",
        params![container_id, kind.as_str(), rank],
    )?;
    Ok(rows)
}

/// Set the rank of one item.
///
/// # Errors
///
/// Returns an error if the database update fails.
pub fn set_rank(conn: &Connection, item_id: i64, rank: i64) -> Result<()> {
    conn.execute(
        "UPDATE items SET pin_order = ? WHERE id = ?",
        params![rank, item_id],
    )?;
    Ok(())
}

/// `(item_id, rank)` of every pinned item, in rank order.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn ranks(conn: &Connection, container_id: i64, kind: ItemKind) -> Result<Vec<(i64, i64)>> {
    let mut stmt = conn.prepare(
        "SELECT id, pin_order FROM items
         WHERE container_id = ? AND kind = ? AND pin_order > 0
         ORDER BY pin_order, id",
    )?;
    let rows = stmt
        .query_map(params![container_id, kind.as_str()], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// A break in the `1..=n` rank sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "defect", content = "rank", rename_all = "snake_case")]
pub enum RankDefect {
    /// No item holds this rank although higher ranks are in use.
    Missing(i64),
    /// More than one item holds this rank.
    Duplicate(i64),
}

impl fmt::Display for RankDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(rank) => write!(f, "rank {rank} is missing"),
            Self::Duplicate(rank) => write!(f, "rank {rank} is held by several items"),
        }
    }
}

/// Defects of a sorted rank sequence; empty when it is exactly `1..=n`.
#[must_use]
pub fn rank_defects(sorted_ranks: &[i64]) -> Vec<RankDefect> {
    let mut defects = Vec::new();
    let mut expected = 1;
    let mut previous = 0;
    for &rank in sorted_ranks {
        if rank == previous {
            if defects.last() != Some(&RankDefect::Duplicate(rank)) {
                defects.push(RankDefect::Duplicate(rank));
            }
            continue;
        }
        while expected < rank {
            defects.push(RankDefect::Missing(expected));
            expected += 1;
        }
        expected = rank + 1;
        previous = rank;
    }
    defects
}

/// Check the pin order of a (container, kind).
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn verify_dense(conn: &Connection, container_id: i64, kind: ItemKind) -> Result<Vec<RankDefect>> {
    let sorted: Vec<i64> = ranks(conn, container_id, kind)?
        .into_iter()
        .map(|(_, rank)| rank)
        .collect();
    Ok(rank_defects(&sorted))
}
