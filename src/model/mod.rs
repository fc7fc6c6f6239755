//! Core data types for `tracker_meta`.
//!
//! This module defines the rows the metadata core reads and writes:
//! - `User`, `Container`, `Item` - identities owned by external collaborators
//! - `Label` - container- or organization-owned labels
//! - `WatchState`, `WatchMode` - explicit and container-level watch signals
//! - `Comment` - activity used to derive participation
//! - `Event` - audit log entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::MetaError;

/// Kind of tracked item. Pin order is maintained per (container, kind).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    #[default]
    Issue,
    PullRequest,
}

impl ItemKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Issue => "issue",
            Self::PullRequest => "pull_request",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = MetaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "issue" | "issues" => Ok(Self::Issue),
            "pull_request" | "pull-request" | "pull" | "pr" => Ok(Self::PullRequest),
            other => Err(MetaError::validation(
                "kind",
                format!("unknown item kind '{other}' (expected issue or pull_request)"),
            )),
        }
    }
}

/// A user or organization account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub is_active: bool,
    pub prohibit_login: bool,
    #[serde(default)]
    pub is_org: bool,
}

impl User {
    /// Whether the account may receive subscriptions in listings.
    #[must_use]
    pub const fn can_be_listed(&self) -> bool {
        self.is_active && !self.prohibit_login && !self.is_org
    }
}

/// The repository-like entity owning items, labels and pin order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
}

/// An issue or pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    pub container_id: i64,
    pub kind: ItemKind,
    pub author_id: i64,
    pub title: String,
    #[serde(default)]
    pub is_closed: bool,
    /// 0 means unpinned; positive values are the dense rank.
    #[serde(default)]
    pub pin_order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    #[must_use]
    pub const fn is_pinned(&self) -> bool {
        self.pin_order > 0
    }
}

/// Who owns a label. A label never belongs to both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum LabelOwner {
    Container(i64),
    Org(i64),
}

/// The container an item lives in plus that container's owner, which is
/// everything needed to decide whether a label may be attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelTarget {
    pub container_id: i64,
    pub owner_id: i64,
}

/// A label that can be attached to items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub id: i64,
    pub owner: LabelOwner,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub num_issues: i64,
    #[serde(default)]
    pub num_closed_issues: i64,
}

impl Label {
    /// Exclusive scope of this label (see [`crate::labels::exclusive_scope`]).
    #[must_use]
    pub fn exclusive_scope(&self) -> &str {
        crate::labels::exclusive_scope(&self.name)
    }

    /// Whether the label may be attached to items of `target`.
    #[must_use]
    pub fn is_valid_for(&self, target: LabelTarget) -> bool {
        match self.owner {
            LabelOwner::Container(id) => id == target.container_id,
            LabelOwner::Org(id) => id == target.owner_id,
        }
    }

    #[must_use]
    pub const fn num_open_issues(&self) -> i64 {
        self.num_issues - self.num_closed_issues
    }
}

/// Container-level watch mode for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WatchMode {
    #[default]
    None,
    Watching,
    NotWatching,
    /// Set automatically when the user contributes to the container.
    Auto,
}

impl WatchMode {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Watching => "watching",
            Self::NotWatching => "not_watching",
            Self::Auto => "auto",
        }
    }

    /// Modes that subscribe the user to every item of the container.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Watching | Self::Auto)
    }
}

impl fmt::Display for WatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for WatchMode {
    type Err = MetaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "default" | "" => Ok(Self::None),
            "watching" | "watch" | "normal" => Ok(Self::Watching),
            "not_watching" | "not-watching" | "dont" | "ignore" => Ok(Self::NotWatching),
            "auto" => Ok(Self::Auto),
            other => Err(MetaError::validation(
                "mode",
                format!("unknown watch mode '{other}'"),
            )),
        }
    }
}

/// Explicit per-item watch record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchState {
    pub user_id: i64,
    pub item_id: i64,
    pub is_watching: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Kind of activity posted on an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CommentKind {
    /// Plain conversation comment.
    #[default]
    Comment,
    /// Comment on a line of code.
    Code,
    /// Review verdict on a pull request.
    Review,
    /// Anything else (references, status notes).
    Other,
}

impl CommentKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Comment => "comment",
            Self::Code => "code",
            Self::Review => "review",
            Self::Other => "other",
        }
    }

    /// Whether posting this kind makes the poster a participant.
    #[must_use]
    pub const fn is_participation(&self) -> bool {
        matches!(self, Self::Comment | Self::Code | Self::Review)
    }
}

impl FromStr for CommentKind {
    type Err = MetaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "comment" => Ok(Self::Comment),
            "code" => Ok(Self::Code),
            "review" => Ok(Self::Review),
            "other" => Ok(Self::Other),
            other => Err(MetaError::validation(
                "kind",
                format!("unknown comment kind '{other}'"),
            )),
        }
    }
}

/// Activity row on an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub item_id: i64,
    pub poster_id: i64,
    pub kind: CommentKind,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Audit event type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventType {
    LabelAdded,
    LabelRemoved,
    Pinned,
    Unpinned,
    Custom(String),
}

impl EventType {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::LabelAdded => "label_added",
            Self::LabelRemoved => "label_removed",
            Self::Pinned => "pinned",
            Self::Unpinned => "unpinned",
            Self::Custom(value) => value,
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "label_added" => Self::LabelAdded,
            "label_removed" => Self::LabelRemoved,
            "pinned" => Self::Pinned,
            "unpinned" => Self::Unpinned,
            _ => Self::Custom(value.to_string()),
        }
    }
}

impl Serialize for EventType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(Self::parse(&value))
    }
}

/// An audit trail entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub item_id: i64,
    pub event_type: EventType,
    pub actor_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_kind_round_trips_through_str() {
        assert_eq!("pr".parse::<ItemKind>().unwrap(), ItemKind::PullRequest);
        assert_eq!(ItemKind::PullRequest.to_string(), "pull_request");
        assert!("epic".parse::<ItemKind>().is_err());
    }

    #[test]
    fn label_validity_follows_owner() {
        let target = LabelTarget {
            container_id: 10,
            owner_id: 2,
        };
        let repo_label = Label {
            id: 1,
            owner: LabelOwner::Container(10),
            name: "bug".to_string(),
            description: None,
            num_issues: 0,
            num_closed_issues: 0,
        };
        let org_label = Label {
            owner: LabelOwner::Org(2),
            ..repo_label.clone()
        };
        let foreign = Label {
            owner: LabelOwner::Container(11),
            ..repo_label.clone()
        };
        assert!(repo_label.is_valid_for(target));
        assert!(org_label.is_valid_for(target));
        assert!(!foreign.is_valid_for(target));
    }

    #[test]
    fn watch_mode_activity() {
        assert!(WatchMode::Watching.is_active());
        assert!(WatchMode::Auto.is_active());
        assert!(!WatchMode::NotWatching.is_active());
        assert!(!WatchMode::None.is_active());
        assert_eq!("dont".parse::<WatchMode>().unwrap(), WatchMode::NotWatching);
    }

    #[test]
    fn only_conversation_kinds_count_as_participation() {
        assert!(CommentKind::Review.is_participation());
        assert!(!CommentKind::Other.is_participation());
    }

    #[test]
    fn event_type_custom_preserved() {
        let e = EventType::parse("renamed");
        assert_eq!(e, EventType::Custom("renamed".to_string()));
        assert_eq!(EventType::Pinned.as_str(), "pinned");
    }
}
