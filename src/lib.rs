//! `tracker_meta` - item metadata for an issue tracker.
//!
//! Three pieces of per-item metadata, stored in `SQLite`:
//! - labels, with exclusive scopes and container/organization ownership
//! - pin order, a dense rank per (container, item kind)
//! - watch state, resolved into subscriber lists
//!
//! Every mutation runs through [`storage::SqliteStorage::mutate`], which
//! wraps it in one immediate transaction together with its audit events.

pub mod access;
pub mod cli;
pub mod config;
pub mod error;
pub mod labels;
pub mod logging;
pub mod model;
pub mod pins;
pub mod storage;
pub mod validation;
pub mod watch;

pub use error::{ErrorCode, MetaError, Result, StructuredError};
pub use labels::LabelDiff;
pub use pins::{PinLimits, PinState};
pub use storage::SqliteStorage;
pub use watch::SubscriptionReason;
