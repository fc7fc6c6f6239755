//! Item/label link rows and label usage counters.

use rusqlite::{Connection, params};

use crate::error::Result;
use crate::model::Label;
use crate::storage::directory::{LABEL_COLUMNS, label_from_row};

/// Link a label to an item. Returns `false` if the link already existed.
///
/// # Errors
///
/// Returns an error if the database insert fails.
pub fn attach(conn: &Connection, item_id: i64, label_id: i64) -> Result<bool> {
    let rows = conn.execute(
        "INSERT OR IGNORE INTO item_labels (item_id, label_id) VALUES (?, ?)",
        params![item_id, label_id],
    )?;
    Ok(rows > 0)
}

/// Unlink a label from an item. Returns `false` if there was no link.
///
/// # Errors
///
/// Returns an error if the database delete fails.
pub fn detach(conn: &Connection, item_id: i64, label_id: i64) -> Result<bool> {
    let rows = conn.execute(
        "DELETE FROM item_labels WHERE item_id = ? AND label_id = ?",
        params![item_id, label_id],
    )?;
    Ok(rows > 0)
}

/// Labels linked to an item, sorted by ID.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn item_labels(conn: &Connection, item_id: i64) -> Result<Vec<Label>> {
    let columns = LABEL_COLUMNS
        .split(", ")
        .map(|c| format!("l.{c}"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT {columns} FROM labels l
         JOIN item_labels il ON il.label_id = l.id
         WHERE il.item_id = ?
         ORDER BY l.id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let labels = stmt
        .query_map([item_id], label_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(labels)
}

/// Recompute `num_issues` and `num_closed_issues` from the link table.
///
/// # Errors
///
/// Returns an error if the database update fails.
pub fn recount_label(conn: &Connection, label_id: i64) -> Result<()> {
    conn.execute(
        r"
        UPDATE labels SET
            num_issues = (
                SELECT count(*) FROM item_labels WHERE label_id = ?1
            ),
            num_closed_issues = (
                SELECT count(*) FROM item_labels il
                JOIN items i ON i.id = il.item_id
                WHERE il.label_id = ?1 AND i.is_closed = 1
            )
        WHERE id = ?1
        ",
        [label_id],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ItemKind, LabelOwner};
    use crate::storage::directory;
    use crate::storage::schema::apply_schema;

    #[test]
    fn attach_is_idempotent_and_counts() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        let user = directory::create_user(&conn, "u", false).unwrap();
        let repo = directory::create_container(&conn, user.id, "r").unwrap();
        let item = directory::create_item(&conn, repo.id, ItemKind::Issue, user.id, "t").unwrap();
        let label =
            directory::create_label(&conn, LabelOwner::Container(repo.id), "bug", None).unwrap();

        assert!(attach(&conn, item.id, label.id).unwrap());
        assert!(!attach(&conn, item.id, label.id).unwrap());
        recount_label(&conn, label.id).unwrap();
        assert_eq!(directory::require_label(&conn, label.id).unwrap().num_issues, 1);

        assert_eq!(item_labels(&conn, item.id).unwrap().len(), 1);
        assert!(detach(&conn, item.id, label.id).unwrap());
        assert!(!detach(&conn, item.id, label.id).unwrap());
        recount_label(&conn, label.id).unwrap();
        assert_eq!(directory::require_label(&conn, label.id).unwrap().num_issues, 0);
    }
}
