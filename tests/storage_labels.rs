//! Storage tests for label reconciliation.
//!
//! Covers replace/add/remove/clear, exclusive scopes, ownership validity,
//! usage counters and audit events.

mod common;

use common::fixtures::{World, label_ids};
use common::test_db;
use tracker_meta::error::MetaError;
use tracker_meta::model::EventType;
use tracker_meta::storage::directory as dir;
use tracker_meta::storage::events::count_events;

#[test]
fn replace_attaches_desired_labels() {
    let _log = common::test_log("replace_attaches_desired_labels");
    let mut storage = test_db();
    let world = World::new(&storage);
    let item = world.issue(&storage, "crash on start");
    let bug = world.label(&storage, "bug");
    let ui = world.label(&storage, "ui");

    let diff = storage
        .replace_item_labels(item.id, &[ui.id, bug.id], world.owner.id)
        .unwrap();

    assert_eq!(diff.added_ids(), vec![bug.id, ui.id]);
    assert!(diff.to_remove.is_empty());
    assert_eq!(
        label_ids(&storage.item_labels(item.id).unwrap()),
        vec![bug.id, ui.id]
    );
}

#[test]
fn replace_with_same_set_is_a_no_op() {
    let mut storage = test_db();
    let world = World::new(&storage);
    let item = world.issue(&storage, "t");
    let bug = world.label(&storage, "bug");

    storage
        .replace_item_labels(item.id, &[bug.id], world.owner.id)
        .unwrap();
    let events_before = storage.get_events(item.id, 0).unwrap().len();

    let diff = storage
        .replace_item_labels(item.id, &[bug.id, bug.id], world.owner.id)
        .unwrap();
    assert!(diff.is_empty());
    assert_eq!(storage.get_events(item.id, 0).unwrap().len(), events_before);
}

#[test]
fn exclusive_scope_keeps_last_specified() {
    let mut storage = test_db();
    let world = World::new(&storage);
    let item = world.issue(&storage, "t");
    let high = world.label(&storage, "priority/high");
    let low = world.label(&storage, "priority/low");
    let bug = world.label(&storage, "bug");

    storage
        .replace_item_labels(item.id, &[low.id, bug.id, high.id], world.owner.id)
        .unwrap();
    let mut expected = vec![high.id, bug.id];
    expected.sort_unstable();
    assert_eq!(label_ids(&storage.item_labels(item.id).unwrap()), expected);
}

#[test]
fn add_swaps_label_within_scope() {
    let mut storage = test_db();
    let world = World::new(&storage);
    let item = world.issue(&storage, "t");
    let high = world.label(&storage, "priority/high");
    let low = world.label(&storage, "priority/low");
    let bug = world.label(&storage, "bug");

    storage
        .replace_item_labels(item.id, &[high.id, bug.id], world.owner.id)
        .unwrap();
    let diff = storage
        .add_item_labels(item.id, &[low.id], world.owner.id)
        .unwrap();

    assert_eq!(diff.added_ids(), vec![low.id]);
    assert_eq!(diff.removed_ids(), vec![high.id]);
    let mut expected = vec![bug.id, low.id];
    expected.sort_unstable();
    assert_eq!(label_ids(&storage.item_labels(item.id).unwrap()), expected);
}

#[test]
fn nested_scopes_are_distinct() {
    let mut storage = test_db();
    let world = World::new(&storage);
    let item = world.issue(&storage, "t");
    let a = world.label(&storage, "area/ui/button");
    let b = world.label(&storage, "area/backend");

    // Scopes "area/ui" and "area" do not conflict.
    storage
        .replace_item_labels(item.id, &[a.id, b.id], world.owner.id)
        .unwrap();
    assert_eq!(storage.item_labels(item.id).unwrap().len(), 2);
}

#[test]
fn foreign_labels_are_skipped_silently() {
    let mut storage = test_db();
    let world = World::new(&storage);
    let item = world.issue(&storage, "t");
    let own = world.label(&storage, "bug");
    let foreign = world.foreign_label(&storage, "alien");

    let diff = storage
        .replace_item_labels(item.id, &[foreign.id, own.id, 9_999], world.owner.id)
        .unwrap();

    assert_eq!(diff.added_ids(), vec![own.id]);
    assert_eq!(
        label_ids(&storage.item_labels(item.id).unwrap()),
        vec![own.id]
    );
}

#[test]
fn org_labels_apply_to_org_containers() {
    let mut storage = test_db();
    let world = World::new(&storage);
    let item = world.issue(&storage, "t");
    let triage = world.org_label(&storage, "triage");

    storage
        .add_item_labels(item.id, &[triage.id], world.owner.id)
        .unwrap();
    assert_eq!(
        label_ids(&storage.item_labels(item.id).unwrap()),
        vec![triage.id]
    );
}

#[test]
fn stale_attachment_is_removed_on_reconcile() {
    let mut storage = test_db();
    let world = World::new(&storage);
    let item = world.issue(&storage, "t");
    let foreign = world.foreign_label(&storage, "moved");

    // Simulate a link that became invalid after a transfer.
    storage
        .conn()
        .execute(
            "INSERT INTO item_labels (item_id, label_id) VALUES (?, ?)",
            [item.id, foreign.id],
        )
        .unwrap();

    let diff = storage
        .replace_item_labels(item.id, &[foreign.id], world.owner.id)
        .unwrap();
    assert_eq!(diff.removed_ids(), vec![foreign.id]);
    assert!(storage.item_labels(item.id).unwrap().is_empty());
}

#[test]
fn remove_and_clear() {
    let mut storage = test_db();
    let world = World::new(&storage);
    let item = world.issue(&storage, "t");
    let bug = world.label(&storage, "bug");
    let ui = world.label(&storage, "ui");
    storage
        .replace_item_labels(item.id, &[bug.id, ui.id], world.owner.id)
        .unwrap();

    assert!(storage.remove_item_label(item.id, bug.id, world.owner.id).unwrap());
    assert!(!storage.remove_item_label(item.id, bug.id, world.owner.id).unwrap());
    assert_eq!(storage.clear_item_labels(item.id, world.owner.id).unwrap(), 1);
    assert_eq!(storage.clear_item_labels(item.id, world.owner.id).unwrap(), 0);
    assert!(storage.item_labels(item.id).unwrap().is_empty());
}

#[test]
fn counters_track_open_and_closed_items() {
    let mut storage = test_db();
    let world = World::new(&storage);
    let first = world.issue(&storage, "one");
    let second = world.issue(&storage, "two");
    let bug = world.label(&storage, "bug");

    storage
        .add_item_labels(first.id, &[bug.id], world.owner.id)
        .unwrap();
    storage
        .add_item_labels(second.id, &[bug.id], world.owner.id)
        .unwrap();
    dir::set_item_closed(storage.conn(), second.id, true).unwrap();

    let label = dir::require_label(storage.conn(), bug.id).unwrap();
    assert_eq!(label.num_issues, 2);
    assert_eq!(label.num_closed_issues, 1);
    assert_eq!(label.num_open_issues(), 1);

    storage
        .remove_item_label(second.id, bug.id, world.owner.id)
        .unwrap();
    let label = dir::require_label(storage.conn(), bug.id).unwrap();
    assert_eq!(label.num_issues, 1);
    assert_eq!(label.num_closed_issues, 0);
}

#[test]
fn events_recorded_per_link_change() {
    let mut storage = test_db();
    let world = World::new(&storage);
    let item = world.issue(&storage, "t");
    let high = world.label(&storage, "priority/high");
    let low = world.label(&storage, "priority/low");

    storage
        .replace_item_labels(item.id, &[high.id], world.owner.id)
        .unwrap();
    storage
        .replace_item_labels(item.id, &[low.id], world.owner.id)
        .unwrap();

    let conn = storage.conn();
    assert_eq!(count_events(conn, item.id, &EventType::LabelAdded).unwrap(), 2);
    assert_eq!(count_events(conn, item.id, &EventType::LabelRemoved).unwrap(), 1);
    let latest = storage.get_events(item.id, 1).unwrap();
    assert_eq!(latest[0].actor_id, world.owner.id);
}

#[test]
fn unknown_item_is_not_found() {
    let mut storage = test_db();
    let world = World::new(&storage);
    let err = storage
        .replace_item_labels(4_242, &[], world.owner.id)
        .unwrap_err();
    assert!(matches!(err, MetaError::NotFound { entity: "Item", .. }));
}

#[test]
fn organization_actor_is_denied() {
    let mut storage = test_db();
    let world = World::new(&storage);
    let item = world.issue(&storage, "t");
    let bug = world.label(&storage, "bug");

    let err = storage
        .add_item_labels(item.id, &[bug.id], world.org.id)
        .unwrap_err();
    assert!(matches!(err, MetaError::PermissionDenied { .. }));
    assert!(storage.item_labels(item.id).unwrap().is_empty());
}

#[test]
fn events_identify_labels_sharing_a_name() {
    let mut storage = test_db();
    let world = World::new(&storage);
    let item = world.issue(&storage, "t");
    let repo_bug = world.label(&storage, "bug");
    let org_bug = world.org_label(&storage, "bug");

    storage
        .replace_item_labels(item.id, &[repo_bug.id], world.owner.id)
        .unwrap();
    storage
        .replace_item_labels(item.id, &[org_bug.id], world.owner.id)
        .unwrap();

    let events = storage.get_events(item.id, 0).unwrap();
    let added: Vec<&str> = events
        .iter()
        .filter(|e| e.event_type == EventType::LabelAdded)
        .filter_map(|e| e.new_value.as_deref())
        .collect();
    let removed: Vec<&str> = events
        .iter()
        .filter(|e| e.event_type == EventType::LabelRemoved)
        .filter_map(|e| e.old_value.as_deref())
        .collect();

    let repo_value = format!("{}:bug", repo_bug.id);
    let org_value = format!("{}:bug", org_bug.id);
    assert_eq!(added.len(), 2);
    assert!(added.contains(&repo_value.as_str()));
    assert!(added.contains(&org_value.as_str()));
    assert_eq!(removed, vec![repo_value.as_str()]);
}
