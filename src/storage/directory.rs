//! Row helpers for entities owned by external collaborators.
//!
//! Users, containers, items and activity comments are created and managed
//! elsewhere; the metadata core only needs identity and ownership lookups.
//! The `create_*` helpers exist so the CLI and tests can seed a workspace.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::collections::HashMap;

use crate::error::{MetaError, Result};
use crate::model::{
    Comment, CommentKind, Container, Item, ItemKind, Label, LabelOwner, LabelTarget, User,
    WatchMode,
};
use crate::storage::parse_datetime;
use crate::validation::{LabelValidator, NameValidator};

pub const USER_COLUMNS: &str = "id, name, is_active, prohibit_login, is_org";
pub const ITEM_COLUMNS: &str =
    "id, container_id, kind, author_id, title, is_closed, pin_order, created_at, updated_at";
pub const LABEL_COLUMNS: &str =
    "id, container_id, org_id, name, description, num_issues, num_closed_issues";

// ============================================================================
// Row mappers
// ============================================================================

pub(crate) fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        is_active: row.get(2)?,
        prohibit_login: row.get(3)?,
        is_org: row.get(4)?,
    })
}

pub(crate) fn item_from_row(row: &Row<'_>) -> rusqlite::Result<Item> {
    let kind: String = row.get(2)?;
    let created_at: String = row.get(7)?;
    let updated_at: String = row.get(8)?;
    Ok(Item {
        id: row.get(0)?,
        container_id: row.get(1)?,
        kind: kind.parse().unwrap_or_default(),
        author_id: row.get(3)?,
        title: row.get(4)?,
        is_closed: row.get(5)?,
        pin_order: row.get(6)?,
        created_at: parse_datetime(&created_at),
        updated_at: parse_datetime(&updated_at),
    })
}

pub(crate) fn label_from_row(row: &Row<'_>) -> rusqlite::Result<Label> {
    let container_id: Option<i64> = row.get(1)?;
    let org_id: Option<i64> = row.get(2)?;
    // The table CHECK guarantees exactly one owner column is set.
    let owner = container_id.map_or_else(
        || LabelOwner::Org(org_id.unwrap_or_default()),
        LabelOwner::Container,
    );
    let description: String = row.get(4)?;
    Ok(Label {
        id: row.get(0)?,
        owner,
        name: row.get(3)?,
        description: Some(description).filter(|d| !d.is_empty()),
        num_issues: row.get(5)?,
        num_closed_issues: row.get(6)?,
    })
}

// ============================================================================
// Users
// ============================================================================

/// Fetch a user by ID.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn get_user(conn: &Connection, id: i64) -> Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
    Ok(conn.query_row(&sql, [id], user_from_row).optional()?)
}

/// Fetch a user by ID, failing with `NotFound` if absent.
///
/// # Errors
///
/// Returns `NotFound` or a database error.
pub fn require_user(conn: &Connection, id: i64) -> Result<User> {
    get_user(conn, id)?.ok_or_else(|| MetaError::not_found("User", id))
}

/// Fetch a user by unique name.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn find_user_by_name(conn: &Connection, name: &str) -> Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE name = ?");
    Ok(conn.query_row(&sql, [name], user_from_row).optional()?)
}

/// Fetch several users. Unknown IDs are skipped; results are sorted by ID.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn get_users(conn: &Connection, ids: &[i64]) -> Result<Vec<User>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql =
        format!("SELECT {USER_COLUMNS} FROM users WHERE id IN ({placeholders}) ORDER BY id");
    let mut stmt = conn.prepare(&sql)?;
    let users = stmt
        .query_map(rusqlite::params_from_iter(ids.iter()), user_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(users)
}

/// Create a user or organization account.
///
/// # Errors
///
/// Returns a validation error for a bad name, or a database error (e.g. the
/// name is taken).
pub fn create_user(conn: &Connection, name: &str, is_org: bool) -> Result<User> {
    NameValidator::validate("name", name)?;
    conn.execute(
        "INSERT INTO users (name, is_org) VALUES (?, ?)",
        params![name, is_org],
    )?;
    require_user(conn, conn.last_insert_rowid())
}

/// Update the account status flags of a user.
///
/// # Errors
///
/// Returns `NotFound` if the user does not exist.
pub fn set_user_status(
    conn: &Connection,
    id: i64,
    is_active: bool,
    prohibit_login: bool,
) -> Result<()> {
    let rows = conn.execute(
        "UPDATE users SET is_active = ?, prohibit_login = ? WHERE id = ?",
        params![is_active, prohibit_login, id],
    )?;
    if rows == 0 {
        return Err(MetaError::not_found("User", id));
    }
    Ok(())
}

// ============================================================================
// Containers
// ============================================================================

/// Fetch a container by ID, failing with `NotFound` if absent.
///
/// # Errors
///
/// Returns `NotFound` or a database error.
pub fn require_container(conn: &Connection, id: i64) -> Result<Container> {
    conn.query_row(
        "SELECT id, owner_id, name FROM containers WHERE id = ?",
        [id],
        |row| {
            Ok(Container {
                id: row.get(0)?,
                owner_id: row.get(1)?,
                name: row.get(2)?,
            })
        },
    )
    .optional()?
    .ok_or_else(|| MetaError::not_found("Container", id))
}

/// Create a container owned by `owner_id`.
///
/// # Errors
///
/// Returns `NotFound` if the owner does not exist, or a database error.
pub fn create_container(conn: &Connection, owner_id: i64, name: &str) -> Result<Container> {
    NameValidator::validate("name", name)?;
    require_user(conn, owner_id)?;
    conn.execute(
        "INSERT INTO containers (owner_id, name) VALUES (?, ?)",
        params![owner_id, name],
    )?;
    require_container(conn, conn.last_insert_rowid())
}

// ============================================================================
// Items
// ============================================================================

/// Fetch an item by ID.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn get_item(conn: &Connection, id: i64) -> Result<Option<Item>> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?");
    Ok(conn.query_row(&sql, [id], item_from_row).optional()?)
}

/// Fetch an item by ID, failing with `NotFound` if absent.
///
/// # Errors
///
/// Returns `NotFound` or a database error.
pub fn require_item(conn: &Connection, id: i64) -> Result<Item> {
    get_item(conn, id)?.ok_or_else(|| MetaError::not_found("Item", id))
}

/// Create an unpinned item.
///
/// # Errors
///
/// Returns `NotFound` for an unknown container or author, or a database error.
pub fn create_item(
    conn: &Connection,
    container_id: i64,
    kind: ItemKind,
    author_id: i64,
    title: &str,
) -> Result<Item> {
    NameValidator::validate("title", title)?;
    require_container(conn, container_id)?;
    require_user(conn, author_id)?;
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO items (container_id, kind, author_id, title, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?)",
        params![container_id, kind.as_str(), author_id, title, now, now],
    )?;
    require_item(conn, conn.last_insert_rowid())
}

/// Open or close an item. Label counters of attached labels are refreshed.
///
/// # Errors
///
/// Returns `NotFound` if the item does not exist.
pub fn set_item_closed(conn: &Connection, id: i64, closed: bool) -> Result<()> {
    let rows = conn.execute(
        "UPDATE items SET is_closed = ?, updated_at = ? WHERE id = ?",
        params![closed, Utc::now().to_rfc3339(), id],
    )?;
    if rows == 0 {
        return Err(MetaError::not_found("Item", id));
    }
    let mut stmt = conn.prepare("SELECT label_id FROM item_labels WHERE item_id = ?")?;
    let label_ids = stmt
        .query_map([id], |row| row.get::<_, i64>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    for label_id in label_ids {
        crate::labels::association::recount_label(conn, label_id)?;
    }
    Ok(())
}

/// Resolve the label ownership target for an item.
///
/// # Errors
///
/// Returns `NotFound` if the item's container is missing.
pub fn label_target(conn: &Connection, item: &Item) -> Result<LabelTarget> {
    let container = require_container(conn, item.container_id)?;
    Ok(LabelTarget {
        container_id: container.id,
        owner_id: container.owner_id,
    })
}

// ============================================================================
// Labels
// ============================================================================

/// Fetch a label by ID, failing with `NotFound` if absent.
///
/// # Errors
///
/// Returns `NotFound` or a database error.
pub fn require_label(conn: &Connection, id: i64) -> Result<Label> {
    let sql = format!("SELECT {LABEL_COLUMNS} FROM labels WHERE id = ?");
    conn.query_row(&sql, [id], label_from_row)
        .optional()?
        .ok_or_else(|| MetaError::not_found("Label", id))
}

/// Fetch labels by ID, preserving the order of `ids` (including repeats).
///
/// Unknown IDs are skipped.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn get_labels_by_ids(conn: &Connection, ids: &[i64]) -> Result<Vec<Label>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!("SELECT {LABEL_COLUMNS} FROM labels WHERE id IN ({placeholders})");
    let mut stmt = conn.prepare(&sql)?;
    let found = stmt
        .query_map(rusqlite::params_from_iter(ids.iter()), label_from_row)?
        .map(|row| row.map(|label| (label.id, label)))
        .collect::<std::result::Result<HashMap<i64, Label>, rusqlite::Error>>()?;
    Ok(ids.iter().filter_map(|id| found.get(id).cloned()).collect())
}

/// Create a label owned by a container or an organization.
///
/// # Errors
///
/// Returns a validation error for a bad name, `NotFound` for an unknown
/// owner, or a database error.
pub fn create_label(
    conn: &Connection,
    owner: LabelOwner,
    name: &str,
    description: Option<&str>,
) -> Result<Label> {
    LabelValidator::validate(name)?;
    let (container_id, org_id) = match owner {
        LabelOwner::Container(id) => {
            require_container(conn, id)?;
            (Some(id), None)
        }
        LabelOwner::Org(id) => {
            let org = require_user(conn, id)?;
            if !org.is_org {
                return Err(MetaError::validation(
                    "owner",
                    format!("user {} is not an organization", org.name),
                ));
            }
            (None, Some(id))
        }
    };
    conn.execute(
        "INSERT INTO labels (container_id, org_id, name, description) VALUES (?, ?, ?, ?)",
        params![container_id, org_id, name, description.unwrap_or("")],
    )?;
    require_label(conn, conn.last_insert_rowid())
}

/// Labels usable in a container: its own plus those of its owning organization.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn available_labels(conn: &Connection, target: LabelTarget) -> Result<Vec<Label>> {
    let sql = format!(
        "SELECT {LABEL_COLUMNS} FROM labels WHERE container_id = ? OR org_id = ? ORDER BY name, id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let labels = stmt
        .query_map(params![target.container_id, target.owner_id], label_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(labels)
}

// ============================================================================
// Comments (activity)
// ============================================================================

/// Record an activity comment on an item.
///
/// # Errors
///
/// Returns `NotFound` for an unknown item or poster, or a database error.
pub fn add_comment(
    conn: &Connection,
    item_id: i64,
    poster_id: i64,
    kind: CommentKind,
    body: &str,
) -> Result<Comment> {
    require_item(conn, item_id)?;
    require_user(conn, poster_id)?;
    let now = Utc::now();
    conn.execute(
        "INSERT INTO comments (item_id, poster_id, kind, body, created_at) VALUES (?, ?, ?, ?, ?)",
        params![item_id, poster_id, kind.as_str(), body, now.to_rfc3339()],
    )?;
    Ok(Comment {
        id: conn.last_insert_rowid(),
        item_id,
        poster_id,
        kind,
        body: body.to_string(),
        created_at: now,
    })
}

// ============================================================================
// Container watches
// ============================================================================

/// Container watch mode for a user; `None` when no row exists.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn container_watch_mode(conn: &Connection, user_id: i64, container_id: i64) -> Result<WatchMode> {
    let mode: Option<String> = conn
        .query_row(
            "SELECT mode FROM container_watches WHERE user_id = ? AND container_id = ?",
            params![user_id, container_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(mode.and_then(|m| m.parse().ok()).unwrap_or_default())
}

/// Users whose container watch mode is an active watching mode.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn active_container_watcher_ids(conn: &Connection, container_id: i64) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare(
        "SELECT user_id FROM container_watches
         WHERE container_id = ? AND mode IN (?, ?)
         ORDER BY user_id",
    )?;
    let ids = stmt
        .query_map(
            params![
                container_id,
                WatchMode::Watching.as_str(),
                WatchMode::Auto.as_str()
            ],
            |row| row.get(0),
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(ids)
}

/// Set a user's container watch mode. `WatchMode::None` removes the row.
///
/// # Errors
///
/// Returns `NotFound` for an unknown user or container, or a database error.
pub fn set_container_watch(
    conn: &Connection,
    user_id: i64,
    container_id: i64,
    mode: WatchMode,
) -> Result<()> {
    require_user(conn, user_id)?;
    require_container(conn, container_id)?;
    if mode == WatchMode::None {
        conn.execute(
            "DELETE FROM container_watches WHERE user_id = ? AND container_id = ?",
            params![user_id, container_id],
        )?;
        return Ok(());
    }
    conn.execute(
        "INSERT INTO container_watches (user_id, container_id, mode, created_at)
         VALUES (?, ?, ?, ?)
         ON CONFLICT(user_id, container_id) DO UPDATE SET mode = excluded.mode",
        params![user_id, container_id, mode.as_str(), Utc::now().to_rfc3339()],
    )?;
    Ok(())
}
