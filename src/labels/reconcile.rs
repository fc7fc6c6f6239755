//! Reconciling an item's labels against a desired set.
//!
//! [`reconcile`] is pure: it walks the current and desired labels in ID
//! order and decides what to attach and detach. The transactional functions
//! below load state through the caller's transaction, apply the diff, and
//! record one event per changed link.

use chrono::Utc;
use rusqlite::{Transaction, params};
use serde::Serialize;
use std::cmp::Ordering;
use tracing::{debug, info};

use super::association;
use super::scope::{apply_exclusive_scope, dedup_labels};
use crate::error::Result;
use crate::model::{EventType, Label, LabelTarget};
use crate::storage::MutationContext;
use crate::storage::directory;

/// Labels to attach and detach, each sorted by ID.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LabelDiff {
    pub to_add: Vec<Label>,
    pub to_remove: Vec<Label>,
}

impl LabelDiff {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    #[must_use]
    pub fn added_ids(&self) -> Vec<i64> {
        self.to_add.iter().map(|l| l.id).collect()
    }

    #[must_use]
    pub fn removed_ids(&self) -> Vec<i64> {
        self.to_remove.iter().map(|l| l.id).collect()
    }
}

/// Compute the changes that turn `current` into `desired` for `target`.
///
/// `desired` is deduplicated and reduced to one label per exclusive scope.
/// Desired labels that are not valid for `target` are dropped. A current
/// label that is no longer valid is removed even when it is still desired.
#[must_use]
pub fn reconcile(current: &[Label], desired: &[Label], target: LabelTarget) -> LabelDiff {
    let mut desired = apply_exclusive_scope(&dedup_labels(desired));
    let mut current = dedup_labels(current);
    desired.sort_by_key(|l| l.id);
    current.sort_by_key(|l| l.id);

    let mut diff = LabelDiff::default();
    let (mut d, mut c) = (0, 0);
    while d < desired.len() && c < current.len() {
        let want = &desired[d];
        let have = &current[c];
        match want.id.cmp(&have.id) {
            Ordering::Equal => {
                if !have.is_valid_for(target) {
                    diff.to_remove.push(have.clone());
                }
                d += 1;
                c += 1;
            }
            Ordering::Greater => {
                diff.to_remove.push(have.clone());
                c += 1;
            }
            Ordering::Less => {
                push_addition(&mut diff, want, target);
                d += 1;
            }
        }
    }
    for want in &desired[d..] {
        push_addition(&mut diff, want, target);
    }
    diff.to_remove.extend(current[c..].iter().cloned());
    diff
}

fn push_addition(diff: &mut LabelDiff, label: &Label, target: LabelTarget) {
    if label.is_valid_for(target) {
        diff.to_add.push(label.clone());
    } else {
        debug!(
            label_id = label.id,
            name = %label.name,
            container_id = target.container_id,
            "Skipping label owned outside the item's container"
        );
    }
}

/// Replace the labels of an item with `desired_ids`.
///
/// Unknown label IDs are ignored.
///
/// # Errors
///
/// Returns `NotFound` for an unknown item, or a database error.
pub fn replace_item_labels(
    tx: &Transaction<'_>,
    ctx: &mut MutationContext,
    item_id: i64,
    desired_ids: &[i64],
) -> Result<LabelDiff> {
    let item = directory::require_item(tx, item_id)?;
    let target = directory::label_target(tx, &item)?;
    let current = association::item_labels(tx, item_id)?;
    let desired = directory::get_labels_by_ids(tx, desired_ids)?;

    let diff = reconcile(&current, &desired, target);
    apply_diff(tx, ctx, item_id, &diff)?;
    Ok(diff)
}

/// Add labels to an item.
///
/// The new labels are reconciled after the current ones, so within a scope
/// the newly added label replaces the attached one.
///
/// # Errors
///
/// Returns `NotFound` for an unknown item, or a database error.
pub fn add_item_labels(
    tx: &Transaction<'_>,
    ctx: &mut MutationContext,
    item_id: i64,
    label_ids: &[i64],
) -> Result<LabelDiff> {
    let current = association::item_labels(tx, item_id)?;
    let mut desired: Vec<i64> = current.iter().map(|l| l.id).collect();
    desired.extend_from_slice(label_ids);
    replace_item_labels(tx, ctx, item_id, &desired)
}

/// Detach one label from an item. Returns `false` if it was not attached.
///
/// # Errors
///
/// Returns `NotFound` for an unknown item or label, or a database error.
pub fn remove_item_label(
    tx: &Transaction<'_>,
    ctx: &mut MutationContext,
    item_id: i64,
    label_id: i64,
) -> Result<bool> {
    directory::require_item(tx, item_id)?;
    let label = directory::require_label(tx, label_id)?;
    if !association::detach(tx, item_id, label_id)? {
        return Ok(false);
    }
    record_removal(ctx, item_id, &label);
    touch_item(tx, item_id)?;
    Ok(true)
}

/// Detach every label from an item. Returns how many were detached.
///
/// # Errors
///
/// Returns `NotFound` for an unknown item, or a database error.
pub fn clear_item_labels(
    tx: &Transaction<'_>,
    ctx: &mut MutationContext,
    item_id: i64,
) -> Result<usize> {
    directory::require_item(tx, item_id)?;
    let current = association::item_labels(tx, item_id)?;
    let mut removed = 0;
    for label in &current {
        if association::detach(tx, item_id, label.id)? {
            record_removal(ctx, item_id, label);
            removed += 1;
        }
    }
    if removed > 0 {
        touch_item(tx, item_id)?;
    }
    Ok(removed)
}

fn apply_diff(
    tx: &Transaction<'_>,
    ctx: &mut MutationContext,
    item_id: i64,
    diff: &LabelDiff,
) -> Result<()> {
    if diff.is_empty() {
        return Ok(());
    }

    // Removals first so an exclusive swap never has both labels linked.
    for label in &diff.to_remove {
        if association::detach(tx, item_id, label.id)? {
            record_removal(ctx, item_id, label);
        }
    }
    for label in &diff.to_add {
        if association::attach(tx, item_id, label.id)? {
            ctx.record_field_change(
                EventType::LabelAdded,
                item_id,
                None,
                Some(event_value(label)),
                None,
            );
            ctx.touch_label(label.id);
        }
    }
    touch_item(tx, item_id)?;

    info!(
        item_id,
        added = ?diff.added_ids(),
        removed = ?diff.removed_ids(),
        "Reconciled item labels"
    );
    Ok(())
}

fn record_removal(ctx: &mut MutationContext, item_id: i64, label: &Label) {
    ctx.record_field_change(
        EventType::LabelRemoved,
        item_id,
        Some(event_value(label)),
        None,
        None,
    );
    ctx.touch_label(label.id);
}

/// `"{id}:{name}"`; names alone are ambiguous between container and org labels.
fn event_value(label: &Label) -> String {
    format!("{}:{}", label.id, label.name)
}

fn touch_item(tx: &Transaction<'_>, item_id: i64) -> Result<()> {
    tx.execute(
        "UPDATE items SET updated_at = ? WHERE id = ?",
        params![Utc::now().to_rfc3339(), item_id],
    )?;
    Ok(())
}
