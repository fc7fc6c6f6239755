#![allow(dead_code)]

use tracker_meta::model::{CommentKind, Item, ItemKind, Label, LabelOwner, User};
use tracker_meta::storage::SqliteStorage;
use tracker_meta::storage::directory as dir;

/// A person account, an organization, and one container owned by the org.
pub struct World {
    pub owner: User,
    pub org: User,
    pub container: i64,
    pub other_container: i64,
}

impl World {
    pub fn new(storage: &SqliteStorage) -> Self {
        let conn = storage.conn();
        let owner = dir::create_user(conn, "owner", false).expect("owner");
        let org = dir::create_user(conn, "acme", true).expect("org");
        let container = dir::create_container(conn, org.id, "tracker").expect("container");
        let other = dir::create_container(conn, owner.id, "elsewhere").expect("other container");
        Self {
            owner,
            org,
            container: container.id,
            other_container: other.id,
        }
    }

    pub fn user(&self, storage: &SqliteStorage, name: &str) -> User {
        dir::create_user(storage.conn(), name, false).expect("user")
    }

    pub fn issue(&self, storage: &SqliteStorage, title: &str) -> Item {
        self.item_of(storage, ItemKind::Issue, title)
    }

    pub fn pull(&self, storage: &SqliteStorage, title: &str) -> Item {
        self.item_of(storage, ItemKind::PullRequest, title)
    }

    pub fn item_of(&self, storage: &SqliteStorage, kind: ItemKind, title: &str) -> Item {
        dir::create_item(storage.conn(), self.container, kind, self.owner.id, title).expect("item")
    }

    pub fn authored_by(&self, storage: &SqliteStorage, author: &User, title: &str) -> Item {
        dir::create_item(storage.conn(), self.container, ItemKind::Issue, author.id, title)
            .expect("item")
    }

    pub fn label(&self, storage: &SqliteStorage, name: &str) -> Label {
        dir::create_label(storage.conn(), LabelOwner::Container(self.container), name, None)
            .expect("label")
    }

    pub fn org_label(&self, storage: &SqliteStorage, name: &str) -> Label {
        dir::create_label(storage.conn(), LabelOwner::Org(self.org.id), name, None)
            .expect("org label")
    }

    pub fn foreign_label(&self, storage: &SqliteStorage, name: &str) -> Label {
        dir::create_label(
            storage.conn(),
            LabelOwner::Container(self.other_container),
            name,
            None,
        )
        .expect("foreign label")
    }

    pub fn comment(&self, storage: &SqliteStorage, item: &Item, poster: &User, kind: CommentKind) {
        dir::add_comment(storage.conn(), item.id, poster.id, kind, "hello").expect("comment");
    }
}

pub fn label_ids(labels: &[Label]) -> Vec<i64> {
    labels.iter().map(|l| l.id).collect()
}

pub fn ranks(storage: &SqliteStorage, world: &World, kind: ItemKind) -> Vec<(i64, i64)> {
    storage
        .pinned_items(world.container, kind)
        .expect("pinned items")
        .into_iter()
        .map(|item| (item.id, item.pin_order))
        .collect()
}
