//! Subscription resolution.
//!
//! A user is subscribed to an item when an explicit record says so, or,
//! without a record, when any implicit signal applies: authorship,
//! participation, or an active container watch. An explicit opt-out wins
//! over every implicit signal. Organizations have no implicit signals; only
//! an explicit record subscribes one, and listings still leave them out.
//!
//! Listing and single-user checks go through [`WatchSignals::reason_for`],
//! so they cannot disagree.

use rusqlite::{Connection, Transaction};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{debug, trace};

use super::{participation, store};
use crate::error::Result;
use crate::model::{Item, User, WatchState};
use crate::storage::directory;

/// Why a user is or is not subscribed to an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "watching", rename_all = "snake_case")]
pub enum SubscriptionReason {
    /// An explicit record decides.
    Explicit(bool),
    /// Organization accounts get no implicit subscription.
    Organization,
    Author,
    Participant,
    ContainerWatch,
    /// No signal applies.
    None,
}

impl SubscriptionReason {
    #[must_use]
    pub const fn is_subscribed(&self) -> bool {
        match self {
            Self::Explicit(watching) => *watching,
            Self::Author | Self::Participant | Self::ContainerWatch => true,
            Self::Organization | Self::None => false,
        }
    }
}

impl fmt::Display for SubscriptionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Explicit(true) => write!(f, "explicitly watching"),
            Self::Explicit(false) => write!(f, "explicitly not watching"),
            Self::Organization => write!(f, "organization account"),
            Self::Author => write!(f, "author"),
            Self::Participant => write!(f, "participant"),
            Self::ContainerWatch => write!(f, "watching the container"),
            Self::None => write!(f, "not subscribed"),
        }
    }
}

/// Every watch signal of one item, loaded up front.
#[derive(Debug, Clone)]
pub struct WatchSignals {
    author_id: i64,
    explicit: BTreeMap<i64, bool>,
    participants: BTreeSet<i64>,
    container_watchers: BTreeSet<i64>,
}

impl WatchSignals {
    /// Load the signals of `item`.
    ///
    /// # Errors
    ///
    /// Returns an error if a database query fails.
    pub fn load(conn: &Connection, item: &Item) -> Result<Self> {
        let explicit = store::item_watches(conn, item.id)?
            .into_iter()
            .map(|w| (w.user_id, w.is_watching))
            .collect();
        let participants = participation::participant_ids(conn, item)?;
        let container_watchers =
            directory::active_container_watcher_ids(conn, item.container_id)?
                .into_iter()
                .collect();
        Ok(Self {
            author_id: item.author_id,
            explicit,
            participants,
            container_watchers,
        })
    }

    /// Resolve one account. An explicit record is authoritative for every
    /// account kind.
    #[must_use]
    pub fn reason_for(&self, user: &User) -> SubscriptionReason {
        if let Some(&watching) = self.explicit.get(&user.id) {
            return SubscriptionReason::Explicit(watching);
        }
        if user.is_org {
            return SubscriptionReason::Organization;
        }
        if user.id == self.author_id {
            SubscriptionReason::Author
        } else if self.participants.contains(&user.id) {
            SubscriptionReason::Participant
        } else if self.container_watchers.contains(&user.id) {
            SubscriptionReason::ContainerWatch
        } else {
            SubscriptionReason::None
        }
    }

    /// Every user ID that any signal mentions, opt-outs included.
    #[must_use]
    pub fn candidate_ids(&self) -> Vec<i64> {
        let mut ids: BTreeSet<i64> = self.explicit.keys().copied().collect();
        ids.extend(&self.participants);
        ids.extend(&self.container_watchers);
        ids.insert(self.author_id);
        ids.into_iter().collect()
    }
}

/// Active, listable accounts subscribed to an item, sorted by ID.
///
/// # Errors
///
/// Returns `NotFound` for an unknown item, or a database error.
pub fn subscribers(conn: &Connection, item_id: i64) -> Result<Vec<User>> {
    let item = directory::require_item(conn, item_id)?;
    let signals = WatchSignals::load(conn, &item)?;
    let candidates = directory::get_users(conn, &signals.candidate_ids())?;

    let subscribed: Vec<User> = candidates
        .into_iter()
        .filter(|user| {
            let reason = signals.reason_for(user);
            trace!(user_id = user.id, %reason, "Resolved candidate");
            user.can_be_listed() && reason.is_subscribed()
        })
        .collect();

    debug!(item_id, count = subscribed.len(), "Resolved subscribers");
    Ok(subscribed)
}

/// Number of accounts [`subscribers`] returns.
///
/// # Errors
///
/// Returns `NotFound` for an unknown item, or a database error.
pub fn count_subscribers(conn: &Connection, item_id: i64) -> Result<usize> {
    Ok(subscribers(conn, item_id)?.len())
}

/// Why `user_id` is or is not subscribed to `item_id`.
///
/// Account status does not matter here; inactive users are only filtered
/// from listings.
///
/// # Errors
///
/// Returns `NotFound` for an unknown user or item, or a database error.
pub fn subscription_reason(
    conn: &Connection,
    user_id: i64,
    item_id: i64,
) -> Result<SubscriptionReason> {
    let user = directory::require_user(conn, user_id)?;
    let item = directory::require_item(conn, item_id)?;
    Ok(WatchSignals::load(conn, &item)?.reason_for(&user))
}

/// Whether `user_id` is subscribed to `item_id`.
///
/// # Errors
///
/// Returns `NotFound` for an unknown user or item, or a database error.
pub fn is_subscribed(conn: &Connection, user_id: i64, item_id: i64) -> Result<bool> {
    Ok(subscription_reason(conn, user_id, item_id)?.is_subscribed())
}

/// Record an explicit watch or opt-out.
///
/// # Errors
///
/// Returns `NotFound` for an unknown user or item, or a database error.
pub fn watch_item(
    tx: &Transaction<'_>,
    user_id: i64,
    item_id: i64,
    watching: bool,
) -> Result<WatchState> {
    directory::require_user(tx, user_id)?;
    directory::require_item(tx, item_id)?;
    let state = store::set_item_watch(tx, user_id, item_id, watching)?;
    debug!(user_id, item_id, watching, "Set item watch");
    Ok(state)
}

/// Drop the explicit record so implicit signals apply again.
///
/// # Errors
///
/// Returns an error if the database delete fails.
pub fn unset_item_watch(tx: &Transaction<'_>, user_id: i64, item_id: i64) -> Result<bool> {
    let removed = store::delete_item_watch(tx, user_id, item_id)?;
    debug!(user_id, item_id, removed, "Unset item watch");
    Ok(removed)
}
