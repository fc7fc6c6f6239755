//! `SQLite` storage implementation.

use crate::access::require_writer;
use crate::error::Result;
use crate::labels::{self, LabelDiff, association};
use crate::model::{Event, EventType, Item, ItemKind, Label, User, WatchState};
use crate::pins::{self, PinLimits, PinState, RankDefect};
use crate::storage::events::{get_events, insert_event};
use crate::storage::schema::apply_schema;
use crate::watch::{self, SubscriptionReason};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Transaction};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// SQLite-based storage backend.
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Connection,
}

/// Context for a mutation operation, tracking side effects.
///
/// Events and label recounts are flushed by [`SqliteStorage::mutate`] inside
/// the same transaction, right before commit.
pub struct MutationContext {
    pub op_name: String,
    pub actor_id: i64,
    pub events: Vec<Event>,
    pub touched_labels: BTreeSet<i64>,
}

impl MutationContext {
    #[must_use]
    pub fn new(op_name: &str, actor_id: i64) -> Self {
        Self {
            op_name: op_name.to_string(),
            actor_id,
            events: Vec::new(),
            touched_labels: BTreeSet::new(),
        }
    }

    pub fn record_event(&mut self, event_type: EventType, item_id: i64, details: Option<String>) {
        self.record_field_change(event_type, item_id, None, None, details);
    }

    /// Record a field change event with old and new values.
    pub fn record_field_change(
        &mut self,
        event_type: EventType,
        item_id: i64,
        old_value: Option<String>,
        new_value: Option<String>,
        comment: Option<String>,
    ) {
        self.events.push(Event {
            id: 0, // Placeholder, DB assigns auto-inc ID
            item_id,
            event_type,
            actor_id: self.actor_id,
            old_value,
            new_value,
            comment,
            created_at: Utc::now(),
        });
    }

    /// Mark a label whose usage counters must be recomputed.
    pub fn touch_label(&mut self, label_id: i64) {
        self.touched_labels.insert(label_id);
    }
}

impl SqliteStorage {
    /// Open a new connection to the database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema application fails.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_timeout(path, None)
    }

    /// Open a new connection with an optional busy timeout (ms).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema application fails.
    pub fn open_with_timeout(path: &Path, lock_timeout_ms: Option<u64>) -> Result<Self> {
        let conn = Connection::open(path)?;
        if let Some(timeout) = lock_timeout_ms {
            conn.busy_timeout(Duration::from_millis(timeout))?;
        }
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Read access to the connection for lookups and collaborator helpers
    /// in [`crate::storage::directory`].
    #[must_use]
    pub const fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Execute a mutation inside one immediate transaction.
    ///
    /// Steps: run `f`, append the recorded events, recount touched labels,
    /// commit. Returning an error from `f` (or from any later step) drops the
    /// transaction, which rolls everything back.
    ///
    /// # Errors
    ///
    /// Returns an error if any step fails (e.g. database error, logic error).
    pub fn mutate<F, R>(&mut self, op: &str, actor_id: i64, f: F) -> Result<R>
    where
        F: FnOnce(&Transaction, &mut MutationContext) -> Result<R>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        let mut ctx = MutationContext::new(op, actor_id);

        let result = f(&tx, &mut ctx)?;

        for event in &ctx.events {
            insert_event(
                &tx,
                event.item_id,
                &event.event_type,
                event.actor_id,
                event.old_value.as_deref(),
                event.new_value.as_deref(),
                event.comment.as_deref(),
            )?;
        }

        for label_id in &ctx.touched_labels {
            association::recount_label(&tx, *label_id)?;
        }

        tx.commit()?;

        debug!(
            op = %ctx.op_name,
            actor_id,
            events = ctx.events.len(),
            recounted = ctx.touched_labels.len(),
            "Committed mutation"
        );

        Ok(result)
    }

    // ========================================================================
    // Labels
    // ========================================================================

    /// Replace the labels of an item with `label_ids`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown item, `PermissionDenied` if the
    /// actor may not write, or a database error. Invalid labels are skipped.
    pub fn replace_item_labels(
        &mut self,
        item_id: i64,
        label_ids: &[i64],
        actor_id: i64,
    ) -> Result<LabelDiff> {
        self.mutate("replace_item_labels", actor_id, |tx, ctx| {
            require_writer(tx, actor_id, item_id)?;
            labels::replace_item_labels(tx, ctx, item_id, label_ids)
        })
    }

    /// Add labels to an item, replacing attached labels of the same scope.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown item, `PermissionDenied` if the
    /// actor may not write, or a database error.
    pub fn add_item_labels(
        &mut self,
        item_id: i64,
        label_ids: &[i64],
        actor_id: i64,
    ) -> Result<LabelDiff> {
        self.mutate("add_item_labels", actor_id, |tx, ctx| {
            require_writer(tx, actor_id, item_id)?;
            labels::add_item_labels(tx, ctx, item_id, label_ids)
        })
    }

    /// Detach one label. Returns `false` if it was not attached.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown item or label, `PermissionDenied`,
    /// or a database error.
    pub fn remove_item_label(&mut self, item_id: i64, label_id: i64, actor_id: i64) -> Result<bool> {
        self.mutate("remove_item_label", actor_id, |tx, ctx| {
            require_writer(tx, actor_id, item_id)?;
            labels::remove_item_label(tx, ctx, item_id, label_id)
        })
    }

    /// Detach every label from an item.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown item, `PermissionDenied`, or a
    /// database error.
    pub fn clear_item_labels(&mut self, item_id: i64, actor_id: i64) -> Result<usize> {
        self.mutate("clear_item_labels", actor_id, |tx, ctx| {
            require_writer(tx, actor_id, item_id)?;
            labels::clear_item_labels(tx, ctx, item_id)
        })
    }

    /// Labels attached to an item, sorted by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn item_labels(&self, item_id: i64) -> Result<Vec<Label>> {
        association::item_labels(&self.conn, item_id)
    }

    // ========================================================================
    // Pins
    // ========================================================================

    /// Pin an item at the end of its (container, kind) order.
    ///
    /// Returns `false` if the item was already pinned.
    ///
    /// # Errors
    ///
    /// Returns `CapacityExceeded` when the limit is reached, `NotFound`,
    /// `PermissionDenied`, or a database error.
    pub fn pin_item(&mut self, item_id: i64, actor_id: i64, limits: PinLimits) -> Result<bool> {
        self.mutate("pin_item", actor_id, |tx, ctx| {
            require_writer(tx, actor_id, item_id)?;
            pins::pin(tx, ctx, item_id, limits)
        })
    }

    /// Unpin an item and close the gap it leaves.
    ///
    /// Returns `false` if the item was not pinned.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `PermissionDenied`, or a database error.
    pub fn unpin_item(&mut self, item_id: i64, actor_id: i64) -> Result<bool> {
        self.mutate("unpin_item", actor_id, |tx, ctx| {
            require_writer(tx, actor_id, item_id)?;
            pins::unpin(tx, ctx, item_id)
        })
    }

    /// Toggle the pin state of an item.
    ///
    /// # Errors
    ///
    /// Same as [`Self::pin_item`] and [`Self::unpin_item`].
    pub fn pin_or_unpin_item(
        &mut self,
        item_id: i64,
        actor_id: i64,
        limits: PinLimits,
    ) -> Result<PinState> {
        self.mutate("pin_or_unpin_item", actor_id, |tx, ctx| {
            require_writer(tx, actor_id, item_id)?;
            pins::pin_or_unpin(tx, ctx, item_id, limits)
        })
    }

    /// Move a pinned item to `position`. Returns the final rank (0 if the
    /// item is not pinned).
    ///
    /// # Errors
    ///
    /// Returns `InvalidPosition` for positions below 1, `NotFound`,
    /// `PermissionDenied`, or a database error.
    pub fn move_pin(&mut self, item_id: i64, position: i64, actor_id: i64) -> Result<i64> {
        self.mutate("move_pin", actor_id, |tx, _ctx| {
            require_writer(tx, actor_id, item_id)?;
            pins::move_pin(tx, item_id, position)
        })
    }

    /// Pinned items of a (container, kind) in rank order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn pinned_items(&self, container_id: i64, kind: ItemKind) -> Result<Vec<Item>> {
        pins::pinned_items(&self.conn, container_id, kind)
    }

    /// Rank defects of a (container, kind); empty when the order is dense.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn verify_pin_order(&self, container_id: i64, kind: ItemKind) -> Result<Vec<RankDefect>> {
        pins::rank::verify_dense(&self.conn, container_id, kind)
    }

    // ========================================================================
    // Watches and subscribers
    // ========================================================================

    /// Set the explicit watch flag of a user on an item.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown user or item, or a database error.
    pub fn watch_item(&mut self, user_id: i64, item_id: i64, watching: bool) -> Result<WatchState> {
        self.mutate("watch_item", user_id, |tx, _ctx| {
            watch::watch_item(tx, user_id, item_id, watching)
        })
    }

    /// Remove the explicit watch flag so implicit signals apply again.
    ///
    /// # Errors
    ///
    /// Returns an error if the database delete fails.
    pub fn unset_item_watch(&mut self, user_id: i64, item_id: i64) -> Result<bool> {
        self.mutate("unset_item_watch", user_id, |tx, _ctx| {
            watch::unset_item_watch(tx, user_id, item_id)
        })
    }

    /// Active accounts subscribed to an item, sorted by ID.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown item, or a database error.
    pub fn subscribers(&self, item_id: i64) -> Result<Vec<User>> {
        watch::subscribers(&self.conn, item_id)
    }

    /// Number of entries [`Self::subscribers`] would return.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown item, or a database error.
    pub fn count_subscribers(&self, item_id: i64) -> Result<usize> {
        watch::count_subscribers(&self.conn, item_id)
    }

    /// Whether one user is subscribed to an item.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown user or item, or a database error.
    pub fn is_subscribed(&self, user_id: i64, item_id: i64) -> Result<bool> {
        watch::is_subscribed(&self.conn, user_id, item_id)
    }

    /// Why a user is or is not subscribed to an item.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown user or item, or a database error.
    pub fn subscription_reason(&self, user_id: i64, item_id: i64) -> Result<SubscriptionReason> {
        watch::subscription_reason(&self.conn, user_id, item_id)
    }

    /// The explicit watch record of a user on an item, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn item_watch(&self, user_id: i64, item_id: i64) -> Result<Option<WatchState>> {
        watch::store::get_item_watch(&self.conn, user_id, item_id)
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Audit events of an item, newest first (0 = no limit).
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_events(&self, item_id: i64, limit: usize) -> Result<Vec<Event>> {
        get_events(&self.conn, item_id, limit)
    }

    // ========================================================================
    // Config
    // ========================================================================

    /// Fetch a config value.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_config(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM config WHERE key = ?", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Fetch all config values from the config table.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_all_config(&self) -> Result<HashMap<String, String>> {
        let mut stmt = self.conn.prepare("SELECT key, value FROM config")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;

        let mut map = HashMap::new();
        for row in rows {
            let (key, value) = row?;
            map.insert(key, value);
        }
        Ok(map)
    }

    /// Set a config value.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub fn set_config(&mut self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO config (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            rusqlite::params![key, value],
        )?;
        Ok(())
    }

    /// Delete a config value.
    ///
    /// Returns `true` if a value was deleted, `false` if the key didn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database delete fails.
    pub fn delete_config(&mut self, key: &str) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM config WHERE key = ?", rusqlite::params![key])?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MetaError;
    use crate::model::LabelOwner;
    use crate::storage::directory;

    struct Fixture {
        storage: SqliteStorage,
        actor: i64,
        item: i64,
        container: i64,
    }

    fn fixture() -> Fixture {
        let storage = SqliteStorage::open_memory().unwrap();
        let conn = storage.conn();
        let actor = directory::create_user(conn, "alice", false).unwrap();
        let repo = directory::create_container(conn, actor.id, "repo").unwrap();
        let item =
            directory::create_item(conn, repo.id, ItemKind::Issue, actor.id, "first").unwrap();
        Fixture {
            actor: actor.id,
            item: item.id,
            container: repo.id,
            storage,
        }
    }

    #[test]
    fn test_open_memory() {
        assert!(SqliteStorage::open_memory().is_ok());
    }

    #[test]
    fn test_transaction_rollback_on_error() {
        let mut fx = fixture();
        let item = fx.item;

        let result: Result<()> = fx.storage.mutate("test_fail", fx.actor, |tx, ctx| {
            tx.execute("UPDATE items SET pin_order = 1 WHERE id = ?", [item])?;
            ctx.record_event(EventType::Pinned, item, None);
            Err(MetaError::InvalidPosition { position: 0 })
        });
        assert!(result.is_err());

        let reloaded = directory::require_item(fx.storage.conn(), item).unwrap();
        assert_eq!(reloaded.pin_order, 0, "pin should be rolled back");
        assert!(fx.storage.get_events(item, 0).unwrap().is_empty());
    }

    #[test]
    fn test_mutate_recounts_touched_labels() {
        let mut fx = fixture();
        let label = directory::create_label(
            fx.storage.conn(),
            LabelOwner::Container(fx.container),
            "bug",
            None,
        )
        .unwrap();

        fx.storage
            .replace_item_labels(fx.item, &[label.id], fx.actor)
            .unwrap();
        let reloaded = directory::require_label(fx.storage.conn(), label.id).unwrap();
        assert_eq!(reloaded.num_issues, 1);
        assert_eq!(reloaded.num_closed_issues, 0);

        directory::set_item_closed(fx.storage.conn(), fx.item, true).unwrap();
        let reloaded = directory::require_label(fx.storage.conn(), label.id).unwrap();
        assert_eq!(reloaded.num_closed_issues, 1);
    }

    #[test]
    fn test_config_round_trip() {
        let mut fx = fixture();
        fx.storage.set_config("pins.max-per-container", "5").unwrap();
        assert_eq!(
            fx.storage.get_config("pins.max-per-container").unwrap().as_deref(),
            Some("5")
        );
        assert!(fx.storage.delete_config("pins.max-per-container").unwrap());
        assert!(!fx.storage.delete_config("pins.max-per-container").unwrap());
    }

    #[test]
    fn test_inactive_actor_cannot_pin() {
        let mut fx = fixture();
        directory::set_user_status(fx.storage.conn(), fx.actor, false, false).unwrap();
        let err = fx
            .storage
            .pin_item(fx.item, fx.actor, PinLimits::default())
            .unwrap_err();
        assert!(matches!(err, MetaError::PermissionDenied { .. }));
    }
}
