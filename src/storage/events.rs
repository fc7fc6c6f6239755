//! Audit event storage.
//!
//! Events are appended in the same transaction as the mutation that caused
//! them. Timeline rendering and notification delivery consume this table
//! downstream.

use chrono::Utc;
use rusqlite::{Connection, params};

use crate::error::Result;
use crate::model::{Event, EventType};
use crate::storage::parse_datetime;

/// Append an event row.
///
/// Call this with the transaction of the mutation that triggered the event;
/// `Transaction` derefs to `Connection`.
///
/// # Errors
///
/// Returns an error if the database insert fails.
pub fn insert_event(
    conn: &Connection,
    item_id: i64,
    event_type: &EventType,
    actor_id: i64,
    old_value: Option<&str>,
    new_value: Option<&str>,
    comment: Option<&str>,
) -> Result<i64> {
    conn.execute(
        r"
        INSERT INTO events (item_id, event_type, actor_id, old_value, new_value, comment, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ",
        params![
            item_id,
            event_type.as_str(),
            actor_id,
            old_value,
            new_value,
            comment,
            Utc::now().to_rfc3339(),
        ],
    )?;

    Ok(conn.last_insert_rowid())
}

/// Events for an item, newest first.
///
/// A `limit` of 0 returns every event.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn get_events(conn: &Connection, item_id: i64, limit: usize) -> Result<Vec<Event>> {
    let sql = if limit > 0 {
        format!(
            "SELECT id, item_id, event_type, actor_id, old_value, new_value, comment, created_at
             FROM events WHERE item_id = ? ORDER BY created_at DESC, id DESC LIMIT {limit}"
        )
    } else {
        "SELECT id, item_id, event_type, actor_id, old_value, new_value, comment, created_at
         FROM events WHERE item_id = ? ORDER BY created_at DESC, id DESC"
            .to_string()
    };

    let mut stmt = conn.prepare(&sql)?;
    let events = stmt
        .query_map([item_id], |row| {
            let event_type: String = row.get(2)?;
            let created_at: String = row.get(7)?;
            Ok(Event {
                id: row.get(0)?,
                item_id: row.get(1)?,
                event_type: EventType::parse(&event_type),
                actor_id: row.get(3)?,
                old_value: row.get(4)?,
                new_value: row.get(5)?,
                comment: row.get(6)?,
                created_at: parse_datetime(&created_at),
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(events)
}

/// Count events of one type for an item.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn count_events(conn: &Connection, item_id: i64, event_type: &EventType) -> Result<usize> {
    let count: i64 = conn.query_row(
        "SELECT count(*) FROM events WHERE item_id = ? AND event_type = ?",
        params![item_id, event_type.as_str()],
        |row| row.get(0),
    )?;
    Ok(usize::try_from(count).unwrap_or(0))
}
