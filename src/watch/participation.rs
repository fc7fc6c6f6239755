//! Participation derived from activity.

use rusqlite::{Connection, params};
use std::collections::BTreeSet;

use crate::error::Result;
use crate::model::{CommentKind, Item};

/// Users who participated in an item: its author plus everyone who posted
/// a conversation, code or review comment on it.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn participant_ids(conn: &Connection, item: &Item) -> Result<BTreeSet<i64>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT poster_id FROM comments
         WHERE item_id = ? AND kind IN (?, ?, ?)",
    )?;
    let mut ids = stmt
        .query_map(
            params![
                item.id,
                CommentKind::Comment.as_str(),
                CommentKind::Code.as_str(),
                CommentKind::Review.as_str()
            ],
            |row| row.get::<_, i64>(0),
        )?
        .collect::<std::result::Result<BTreeSet<_>, _>>()?;
    ids.insert(item.author_id);
    Ok(ids)
}

