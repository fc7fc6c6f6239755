//! Storage tests for pin ordering.

mod common;

use common::fixtures::{World, ranks};
use common::test_db;
use tracker_meta::error::MetaError;
use tracker_meta::model::{EventType, ItemKind};
use tracker_meta::pins::{self, PinLimits, PinState};
use tracker_meta::storage::directory as dir;
use tracker_meta::storage::events::count_events;

const LIMITS: PinLimits = PinLimits { max_pinned: 3 };

#[test]
fn pins_append_to_the_end() {
    let _log = common::test_log("pins_append_to_the_end");
    let mut storage = test_db();
    let world = World::new(&storage);
    let a = world.issue(&storage, "a");
    let b = world.issue(&storage, "b");

    assert!(storage.pin_item(a.id, world.owner.id, LIMITS).unwrap());
    assert!(storage.pin_item(b.id, world.owner.id, LIMITS).unwrap());
    assert!(!storage.pin_item(a.id, world.owner.id, LIMITS).unwrap());

    assert_eq!(ranks(&storage, &world, ItemKind::Issue), vec![(a.id, 1), (b.id, 2)]);
}

#[test]
fn capacity_is_enforced_per_kind() {
    let mut storage = test_db();
    let world = World::new(&storage);
    let issues: Vec<_> = (0..4).map(|i| world.issue(&storage, &format!("i{i}"))).collect();
    let pull = world.pull(&storage, "pr");

    for issue in &issues[..3] {
        storage.pin_item(issue.id, world.owner.id, LIMITS).unwrap();
    }
    let err = storage
        .pin_item(issues[3].id, world.owner.id, LIMITS)
        .unwrap_err();
    assert!(matches!(err, MetaError::CapacityExceeded { max: 3, .. }));
    assert!(!dir::require_item(storage.conn(), issues[3].id).unwrap().is_pinned());

    // Pull requests have their own order.
    assert!(storage.pin_item(pull.id, world.owner.id, LIMITS).unwrap());
    assert_eq!(ranks(&storage, &world, ItemKind::PullRequest), vec![(pull.id, 1)]);
    assert!(!pins::is_new_pin_allowed(storage.conn(), world.container, ItemKind::Issue, LIMITS).unwrap());
    assert!(pins::is_new_pin_allowed(storage.conn(), world.container, ItemKind::PullRequest, LIMITS).unwrap());
}

#[test]
fn zero_limit_disables_pinning() {
    let mut storage = test_db();
    let world = World::new(&storage);
    let a = world.issue(&storage, "a");
    let err = storage
        .pin_item(a.id, world.owner.id, PinLimits { max_pinned: 0 })
        .unwrap_err();
    assert!(matches!(err, MetaError::CapacityExceeded { .. }));
}

#[test]
fn unpin_closes_the_gap() {
    let mut storage = test_db();
    let world = World::new(&storage);
    let items: Vec<_> = (0..3).map(|i| world.issue(&storage, &format!("i{i}"))).collect();
    for item in &items {
        storage.pin_item(item.id, world.owner.id, LIMITS).unwrap();
    }

    assert!(storage.unpin_item(items[0].id, world.owner.id).unwrap());
    assert!(!storage.unpin_item(items[0].id, world.owner.id).unwrap());
    assert_eq!(
        ranks(&storage, &world, ItemKind::Issue),
        vec![(items[1].id, 1), (items[2].id, 2)]
    );
    assert!(storage
        .verify_pin_order(world.container, ItemKind::Issue)
        .unwrap()
        .is_empty());
}

#[test]
fn move_up_and_down() {
    let mut storage = test_db();
    let world = World::new(&storage);
    let limits = PinLimits { max_pinned: 5 };
    let items: Vec<_> = (0..4).map(|i| world.issue(&storage, &format!("i{i}"))).collect();
    for item in &items {
        storage.pin_item(item.id, world.owner.id, limits).unwrap();
    }
    let [a, b, c, d] = [items[0].id, items[1].id, items[2].id, items[3].id];

    // Move d to the front.
    assert_eq!(storage.move_pin(d, 1, world.owner.id).unwrap(), 1);
    assert_eq!(
        ranks(&storage, &world, ItemKind::Issue),
        vec![(d, 1), (a, 2), (b, 3), (c, 4)]
    );

    // Move d to the third slot.
    assert_eq!(storage.move_pin(d, 3, world.owner.id).unwrap(), 3);
    assert_eq!(
        ranks(&storage, &world, ItemKind::Issue),
        vec![(a, 1), (b, 2), (d, 3), (c, 4)]
    );
}

#[test]
fn move_past_end_clamps_to_last_slot() {
    let mut storage = test_db();
    let world = World::new(&storage);
    let items: Vec<_> = (0..3).map(|i| world.issue(&storage, &format!("i{i}"))).collect();
    for item in &items {
        storage.pin_item(item.id, world.owner.id, LIMITS).unwrap();
    }

    assert_eq!(storage.move_pin(items[0].id, 99, world.owner.id).unwrap(), 3);
    assert_eq!(
        ranks(&storage, &world, ItemKind::Issue),
        vec![(items[1].id, 1), (items[2].id, 2), (items[0].id, 3)]
    );
}

#[test]
fn move_to_same_position_changes_nothing() {
    let mut storage = test_db();
    let world = World::new(&storage);
    let a = world.issue(&storage, "a");
    let b = world.issue(&storage, "b");
    storage.pin_item(a.id, world.owner.id, LIMITS).unwrap();
    storage.pin_item(b.id, world.owner.id, LIMITS).unwrap();

    assert_eq!(storage.move_pin(b.id, 2, world.owner.id).unwrap(), 2);
    assert_eq!(ranks(&storage, &world, ItemKind::Issue), vec![(a.id, 1), (b.id, 2)]);
}

#[test]
fn move_rejects_non_positive_positions() {
    let mut storage = test_db();
    let world = World::new(&storage);
    let a = world.issue(&storage, "a");
    let b = world.issue(&storage, "b");
    storage.pin_item(a.id, world.owner.id, LIMITS).unwrap();
    storage.pin_item(b.id, world.owner.id, LIMITS).unwrap();

    for position in [0, -3] {
        let err = storage.move_pin(b.id, position, world.owner.id).unwrap_err();
        assert!(matches!(err, MetaError::InvalidPosition { .. }));
    }
    assert_eq!(ranks(&storage, &world, ItemKind::Issue), vec![(a.id, 1), (b.id, 2)]);
}

#[test]
fn move_of_unpinned_item_is_ignored() {
    let mut storage = test_db();
    let world = World::new(&storage);
    let a = world.issue(&storage, "a");
    assert_eq!(storage.move_pin(a.id, 1, world.owner.id).unwrap(), 0);
    assert_eq!(storage.move_pin(a.id, 0, world.owner.id).unwrap(), 0);
    assert!(ranks(&storage, &world, ItemKind::Issue).is_empty());
}

#[test]
fn toggle_round_trip() {
    let mut storage = test_db();
    let world = World::new(&storage);
    let a = world.issue(&storage, "a");

    assert_eq!(
        storage.pin_or_unpin_item(a.id, world.owner.id, LIMITS).unwrap(),
        PinState::Pinned(1)
    );
    assert_eq!(
        storage.pin_or_unpin_item(a.id, world.owner.id, LIMITS).unwrap(),
        PinState::Unpinned
    );
}

#[test]
fn pin_events_are_recorded_but_moves_are_not() {
    let mut storage = test_db();
    let world = World::new(&storage);
    let a = world.issue(&storage, "a");
    let b = world.issue(&storage, "b");
    storage.pin_item(a.id, world.owner.id, LIMITS).unwrap();
    storage.pin_item(b.id, world.owner.id, LIMITS).unwrap();
    storage.move_pin(b.id, 1, world.owner.id).unwrap();
    storage.unpin_item(b.id, world.owner.id).unwrap();

    let conn = storage.conn();
    assert_eq!(count_events(conn, b.id, &EventType::Pinned).unwrap(), 1);
    assert_eq!(count_events(conn, b.id, &EventType::Unpinned).unwrap(), 1);
    assert_eq!(storage.get_events(b.id, 0).unwrap().len(), 2);
}

#[test]
fn denied_actor_leaves_order_untouched() {
    let mut storage = test_db();
    let world = World::new(&storage);
    let a = world.issue(&storage, "a");
    let blocked = world.user(&storage, "blocked");
    dir::set_user_status(storage.conn(), blocked.id, true, true).unwrap();

    let err = storage.pin_item(a.id, blocked.id, LIMITS).unwrap_err();
    assert!(matches!(err, MetaError::PermissionDenied { .. }));
    assert!(ranks(&storage, &world, ItemKind::Issue).is_empty());
}
