//! Database schema definitions.

use rusqlite::{Connection, Result};

pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// The complete SQL schema for the tracker metadata database.
pub const SCHEMA_SQL: &str = r"
    -- Accounts (users and organizations)
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        is_active INTEGER NOT NULL DEFAULT 1,
        prohibit_login INTEGER NOT NULL DEFAULT 0,
        is_org INTEGER NOT NULL DEFAULT 0
    );

    -- Containers (repository-like owners of items)
    CREATE TABLE IF NOT EXISTS containers (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        UNIQUE (owner_id, name),
        FOREIGN KEY (owner_id) REFERENCES users(id)
    );

    -- Items (issues and pull requests)
    -- pin_order: 0 = unpinned, otherwise dense rank per (container_id, kind)
    CREATE TABLE IF NOT EXISTS items (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        container_id INTEGER NOT NULL,
        kind TEXT NOT NULL,
        author_id INTEGER NOT NULL,
        title TEXT NOT NULL,
        is_closed INTEGER NOT NULL DEFAULT 0,
        pin_order INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        CHECK (kind IN ('issue', 'pull_request')),
        CHECK (pin_order >= 0),
        FOREIGN KEY (container_id) REFERENCES containers(id) ON DELETE CASCADE
    );
    CREATE INDEX IF NOT EXISTS idx_items_container_kind ON items(container_id, kind);
    CREATE INDEX IF NOT EXISTS idx_items_pin ON items(container_id, kind, pin_order)
        WHERE pin_order > 0;

    -- Labels (owned by exactly one container or one organization)
    CREATE TABLE IF NOT EXISTS labels (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        container_id INTEGER,
        org_id INTEGER,
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        num_issues INTEGER NOT NULL DEFAULT 0,
        num_closed_issues INTEGER NOT NULL DEFAULT 0,
        CHECK ((container_id IS NULL) <> (org_id IS NULL))
    );
    CREATE INDEX IF NOT EXISTS idx_labels_container ON labels(container_id);
    CREATE INDEX IF NOT EXISTS idx_labels_org ON labels(org_id);

    -- Item <-> label associations
    CREATE TABLE IF NOT EXISTS item_labels (
        item_id INTEGER NOT NULL,
        label_id INTEGER NOT NULL,
        PRIMARY KEY (item_id, label_id),
        FOREIGN KEY (item_id) REFERENCES items(id) ON DELETE CASCADE,
        FOREIGN KEY (label_id) REFERENCES labels(id) ON DELETE CASCADE
    );
    CREATE INDEX IF NOT EXISTS idx_item_labels_label ON item_labels(label_id);

    -- Explicit per-item watch flags (no FK: rows outlive deleted items)
    CREATE TABLE IF NOT EXISTS item_watches (
        user_id INTEGER NOT NULL,
        item_id INTEGER NOT NULL,
        is_watching INTEGER NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        PRIMARY KEY (user_id, item_id)
    );
    CREATE INDEX IF NOT EXISTS idx_item_watches_item ON item_watches(item_id);

    -- Container-level watch modes
    CREATE TABLE IF NOT EXISTS container_watches (
        user_id INTEGER NOT NULL,
        container_id INTEGER NOT NULL,
        mode TEXT NOT NULL,
        created_at TEXT NOT NULL,
        PRIMARY KEY (user_id, container_id)
    );
    CREATE INDEX IF NOT EXISTS idx_container_watches_container ON container_watches(container_id);

    -- Activity (participation source)
    CREATE TABLE IF NOT EXISTS comments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        item_id INTEGER NOT NULL,
        poster_id INTEGER NOT NULL,
        kind TEXT NOT NULL,
        body TEXT NOT NULL DEFAULT '',
        created_at TEXT NOT NULL,
        FOREIGN KEY (item_id) REFERENCES items(id) ON DELETE CASCADE
    );
    CREATE INDEX IF NOT EXISTS idx_comments_item_kind ON comments(item_id, kind);

    -- Events (Audit)
    CREATE TABLE IF NOT EXISTS events (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        item_id INTEGER NOT NULL,
        event_type TEXT NOT NULL,
        actor_id INTEGER NOT NULL,
        old_value TEXT,
        new_value TEXT,
        comment TEXT,
        created_at TEXT NOT NULL,
        FOREIGN KEY (item_id) REFERENCES items(id) ON DELETE CASCADE
    );
    CREATE INDEX IF NOT EXISTS idx_events_item_id ON events(item_id);
    CREATE INDEX IF NOT EXISTS idx_events_event_type ON events(event_type);

    -- Config (Runtime)
    CREATE TABLE IF NOT EXISTS config (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    -- Metadata
    CREATE TABLE IF NOT EXISTS metadata (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );
";

/// Apply the schema to the database.
///
/// This uses `execute_batch` to run the entire DDL script.
/// It is idempotent because all statements use `IF NOT EXISTS`.
///
/// # Errors
///
/// Returns an error if the SQL execution fails or pragmas cannot be set.
pub fn apply_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    conn.execute(
        "INSERT OR IGNORE INTO metadata (key, value) VALUES ('schema_version', ?)",
        [CURRENT_SCHEMA_VERSION.to_string()],
    )?;

    // Set journal mode to WAL for concurrency
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // Enable foreign keys
    conn.pragma_update(None, "foreign_keys", "ON")?;

    Ok(())
}
