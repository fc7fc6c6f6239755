//! Explicit per-item watch records.
//!
//! A record is keyed by (user, item) and is not tied to the item's
//! lifecycle: rows for deleted items are harmless and cleaned up elsewhere.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::error::Result;
use crate::model::WatchState;
use crate::storage::parse_datetime;

const WATCH_COLUMNS: &str = "user_id, item_id, is_watching, created_at, updated_at";

fn watch_from_row(row: &Row<'_>) -> rusqlite::Result<WatchState> {
    let created_at: String = row.get(3)?;
    let updated_at: String = row.get(4)?;
    Ok(WatchState {
        user_id: row.get(0)?,
        item_id: row.get(1)?,
        is_watching: row.get(2)?,
        created_at: parse_datetime(&created_at),
        updated_at: parse_datetime(&updated_at),
    })
}

/// The explicit record of a user on an item, if any.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn get_item_watch(conn: &Connection, user_id: i64, item_id: i64) -> Result<Option<WatchState>> {
    let sql = format!("SELECT {WATCH_COLUMNS} FROM item_watches WHERE user_id = ? AND item_id = ?");
    Ok(conn
        .query_row(&sql, params![user_id, item_id], watch_from_row)
        .optional()?)
}

/// Insert or update the explicit record. `created_at` survives updates.
///
/// # Errors
///
/// Returns an error if the database write fails.
pub fn set_item_watch(
    conn: &Connection,
    user_id: i64,
    item_id: i64,
    watching: bool,
) -> Result<WatchState> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO item_watches (user_id, item_id, is_watching, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?4)
         ON CONFLICT(user_id, item_id) DO UPDATE SET
            is_watching = excluded.is_watching,
            updated_at = excluded.updated_at",
        params![user_id, item_id, watching, now],
    )?;
    let sql = format!("SELECT {WATCH_COLUMNS} FROM item_watches WHERE user_id = ? AND item_id = ?");
    Ok(conn.query_row(&sql, params![user_id, item_id], watch_from_row)?)
}

/// Delete the explicit record. Returns `false` if none existed.
///
/// # Errors
///
/// Returns an error if the database delete fails.
pub fn delete_item_watch(conn: &Connection, user_id: i64, item_id: i64) -> Result<bool> {
    let rows = conn.execute(
        "DELETE FROM item_watches WHERE user_id = ? AND item_id = ?",
        params![user_id, item_id],
    )?;
    Ok(rows > 0)
}

/// All explicit records on an item, sorted by user ID.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn item_watches(conn: &Connection, item_id: i64) -> Result<Vec<WatchState>> {
    let sql = format!("SELECT {WATCH_COLUMNS} FROM item_watches WHERE item_id = ? ORDER BY user_id");
    let mut stmt = conn.prepare(&sql)?;
    let watches = stmt
        .query_map([item_id], watch_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(watches)
}
