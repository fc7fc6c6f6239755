//! Label attachment for items.
//!
//! - `scope` - exclusive-scope parsing and per-scope filtering
//! - `reconcile` - the set-difference walk and the transactional operations
//!   built on it
//! - `association` - raw link rows and usage counters

pub mod association;
pub mod reconcile;
pub mod scope;

pub use reconcile::{
    LabelDiff, add_item_labels, clear_item_labels, reconcile, remove_item_label,
    replace_item_labels,
};
pub use scope::{apply_exclusive_scope, dedup_labels, exclusive_scope};
